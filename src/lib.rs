//! JSON-file backed user record service.

pub mod app;
pub mod config;
pub mod state;
pub mod storage;
pub mod users;
