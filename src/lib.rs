//! Account registration, login and bearer-token identity resolution.

pub mod app;
pub mod auth;
pub mod config;
pub mod state;
