//! PickVault Backend Library
//!
//! This library exports the core modules for the PickVault backend server.

pub mod access;
pub mod app_state;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod sweeper;
