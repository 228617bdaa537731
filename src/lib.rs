//! Serves the process's merged configuration as key/value pairs over HTTP.

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod store;
