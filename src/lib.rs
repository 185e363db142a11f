pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod openapi;
pub mod remote;
pub mod state;
pub mod sync;
pub mod utils;
