use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    state::AppState,
    users::{
        dto::{CreateUserRequest, MessageResponse, PublicUser},
        NewUser, StoreError,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/api", get(list_users))
        .route("/api/", get(list_users))
        .route("/api/get/:id", get(get_user))
        .route("/api/add", post(add_user))
        .route("/api/delete/:id", delete(delete_user))
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Json<Vec<PublicUser>> {
    let store = state.store.lock().await;
    Json(store.list().iter().map(PublicUser::from).collect())
}

#[instrument(skip(state, id))]
pub async fn get_user(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    let Path(id) = id.map_err(bad_id)?;
    let store = state.store.lock().await;
    let user = store.get(id).map_err(reject)?;
    Ok(Json(PublicUser::from(user)))
}

#[instrument(skip(state, payload))]
pub async fn add_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), (StatusCode, String)> {
    let Json(payload) = payload.map_err(|e| {
        warn!(error = %e, "rejected user payload");
        (StatusCode::BAD_REQUEST, "invalid JSON".to_string())
    })?;

    if payload.email.is_empty() || payload.password.is_empty() {
        warn!("missing email/password");
        return Err((
            StatusCode::BAD_REQUEST,
            "missing email/password".to_string(),
        ));
    }

    let email = payload.email.clone();
    let mut store = state.store.lock().await;
    let id = store
        .add(NewUser::new(payload.email, payload.password))
        .await
        .map_err(reject)?;

    info!(user_id = id, email = %email, "user added");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::with_id("user added", id)),
    ))
}

#[instrument(skip(state, id))]
pub async fn delete_user(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    let Path(id) = id.map_err(bad_id)?;
    let mut store = state.store.lock().await;
    store.delete(id).map_err(reject)?;

    info!(user_id = id, "user deleted");
    Ok(Json(MessageResponse::new("user deleted")))
}

fn bad_id(e: PathRejection) -> (StatusCode, String) {
    warn!(error = %e, "invalid user id");
    (StatusCode::BAD_REQUEST, "invalid user id".into())
}

fn reject(e: StoreError) -> (StatusCode, String) {
    match e {
        StoreError::NotFound { id } => {
            warn!(user_id = id, "user not found");
            (StatusCode::NOT_FOUND, e.to_string())
        }
        StoreError::DuplicateEmail | StoreError::InvalidEmail => {
            warn!(error = %e, "user rejected");
            (StatusCode::BAD_REQUEST, e.to_string())
        }
        StoreError::HashFailure(_)
        | StoreError::PersistenceFailure(_)
        | StoreError::IdsExhausted => {
            error!(error = %e, "store operation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".into(),
            )
        }
    }
}
