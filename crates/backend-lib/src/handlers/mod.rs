//! HTTP handlers.

pub mod account;
pub mod auth;

use crate::error::AppError;
use axum::Json;
use gamefinder_common::Ack;

/// `GET /api/health`
pub async fn health() -> Json<Ack> {
    Json(Ack::OK)
}

/// Unmatched paths under `/api`; the gate answers 401 first for anonymous callers
pub async fn not_found() -> AppError {
    AppError::NotFound("Route")
}
