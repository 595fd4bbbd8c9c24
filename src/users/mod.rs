use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod email;
pub mod handlers;
pub mod password;
pub mod repo_types;
pub mod store;

pub use repo_types::{NewUser, User};
pub use store::{StoreError, UserStore};

pub fn router() -> Router<AppState> {
    handlers::user_routes()
}
