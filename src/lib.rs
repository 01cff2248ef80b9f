pub mod config;
pub mod entities;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod models;
pub mod pagination;
pub mod pipeline;
pub mod prompts;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;
