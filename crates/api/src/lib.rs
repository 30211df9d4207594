//! HTTP surface for the engagement backend.
//!
//! Thin axum layer over the engines: handlers translate JSON requests into
//! engine calls and [`crate::error::AppError`] into consistent JSON error
//! responses. User identity comes from the `X-User-Id` header; session
//! authentication is handled upstream.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod router;
pub mod state;
