pub mod filter;
pub mod index;
pub mod materialize;
pub mod retry;
pub mod service;
pub mod walker;
