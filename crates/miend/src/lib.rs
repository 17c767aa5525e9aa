//! miend — web front end for image analysis.
//!
//! Serves an upload page, forwards each uploaded image to the analysis
//! backend through the [`engine`], and renders the result as HTML or JSON.
//! Exposed as a library so integration tests and the binary share one
//! router.

pub mod app;
pub mod config;
pub mod engine;
pub mod error;
pub mod render;
pub mod routes;
pub mod state;
