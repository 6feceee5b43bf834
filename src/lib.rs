pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod lists;
pub mod middleware;
pub mod models;
pub mod notifier;
pub mod routes;
pub mod store;
pub mod token;
