//! Shared types for ResellHub
//!
//! Error taxonomy, API response envelope and the marketplace domain models
//! (product, cart, order, review) used by the server and its clients.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCode};
