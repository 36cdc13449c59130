//! REST API module for the CareFinder service
//!
//! HTTP endpoints for facility lookup, desert analysis, retrieval-augmented
//! chat, natural-language queries and resource planning. Uses axum for
//! routing and schemars for request schemas.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routing;
pub mod services;
pub mod startup;
pub mod state;
pub mod types;
