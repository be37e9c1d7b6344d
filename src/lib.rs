pub mod app;
pub mod auth;
pub mod claims;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod roles;
pub mod store;
