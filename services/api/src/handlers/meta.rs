use crate::error::{ApiError, Envelope};
use axum::Json;
use interview_core::catalog::{self, ExperienceLevel, Role};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub async fn health_handler() -> Json<Envelope<HealthResponse>> {
    Envelope::ok(HealthResponse { status: "ok" })
}

#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub roles: &'static [Role],
    pub experience_levels: &'static [ExperienceLevel],
}

/// Roles and experience levels for the browser's selectors.
pub async fn catalog_handler() -> Json<Envelope<CatalogResponse>> {
    Envelope::ok(CatalogResponse {
        roles: &catalog::ROLES,
        experience_levels: &catalog::EXPERIENCE_LEVELS,
    })
}

pub async fn not_found() -> ApiError {
    ApiError::EndpointNotFound
}
