use std::collections::HashSet;

use crate::storage::RecordFile;
use crate::users::{
    email::EmailValidator,
    password::hash_password,
    repo_types::{NewUser, User},
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("user {id} not found")]
    NotFound { id: u64 },
    #[error("email already exists")]
    DuplicateEmail,
    #[error("invalid email")]
    InvalidEmail,
    #[error("failed to hash password: {0}")]
    HashFailure(String),
    #[error("failed to save users: {0}")]
    PersistenceFailure(String),
    #[error("no user ids left to assign")]
    IdsExhausted,
}

/// Owns the user collection and keeps it in step with its `RecordFile`.
///
/// Mutations are applied to memory first and then persisted; if persisting
/// fails the collection is put back as it was. Callers must serialize
/// access themselves.
pub struct UserStore {
    users: Vec<User>,
    next_id: Option<u64>, // None once u64::MAX has been handed out
    file: Box<dyn RecordFile>,
    email: EmailValidator,
}

impl UserStore {
    /// Loads the collection from `file`. Zero or duplicate ids and duplicate
    /// emails are rejected.
    pub fn open(file: Box<dyn RecordFile>, email: EmailValidator) -> anyhow::Result<Self> {
        let users = file.load()?;

        let mut ids = HashSet::new();
        let mut emails = HashSet::new();
        for user in &users {
            anyhow::ensure!(user.id != 0, "user id 0 is not allowed");
            anyhow::ensure!(ids.insert(user.id), "duplicate user id {}", user.id);
            anyhow::ensure!(
                emails.insert(user.email.as_str()),
                "duplicate email for user {}",
                user.id
            );
        }

        let next_id = match users.iter().map(|u| u.id).max() {
            Some(max) => max.checked_add(1),
            None => Some(1),
        };
        Ok(Self {
            users,
            next_id,
            file,
            email,
        })
    }

    pub fn get(&self, id: u64) -> Result<&User, StoreError> {
        self.users
            .iter()
            .find(|u| u.id == id)
            .ok_or(StoreError::NotFound { id })
    }

    pub fn list(&self) -> &[User] {
        &self.users
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Admits a new user and returns the id it was given.
    pub async fn add(&mut self, candidate: NewUser) -> Result<u64, StoreError> {
        if self.users.iter().any(|u| u.email == candidate.email) {
            return Err(StoreError::DuplicateEmail);
        }
        if !self.email.is_valid(&candidate.email).await {
            return Err(StoreError::InvalidEmail);
        }

        let id = self.next_id.ok_or(StoreError::IdsExhausted)?;
        let password_hash =
            hash_password(&candidate.password).map_err(|e| StoreError::HashFailure(e.to_string()))?;
        let user = User {
            id,
            email: candidate.email,
            password_hash,
        };

        self.commit(|users| users.push(user))?;
        self.next_id = id.checked_add(1);
        Ok(id)
    }

    pub fn delete(&mut self, id: u64) -> Result<(), StoreError> {
        let pos = self
            .users
            .iter()
            .position(|u| u.id == id)
            .ok_or(StoreError::NotFound { id })?;

        self.commit(|users| {
            users.remove(pos);
        })
    }

    /// Snapshot, mutate, persist; restores the snapshot if persisting fails.
    fn commit<F>(&mut self, mutate: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Vec<User>),
    {
        let snapshot = self.users.clone();
        mutate(&mut self.users);

        if let Err(e) = self.file.save(&self.users) {
            self.users = snapshot;
            return Err(StoreError::PersistenceFailure(format!("{e:#}")));
        }
        Ok(())
    }
}
