//! Wordgap Server - web UI and HTTP API for the chunked speech assembler

pub mod api;
pub mod error;
pub mod settings;
pub mod state;

pub use api::{create_router, GenerateQuery, GenerateRequest, GenerateResponse};
pub use state::AppState;
