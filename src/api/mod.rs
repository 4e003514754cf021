pub mod admin;
pub mod artists;
pub mod auth;
pub mod catalog;
pub mod health;
pub mod lyrics;
pub mod metrics;
pub mod playlists;
pub mod profile;
pub mod rankings;
pub mod ratings;
pub mod swagger;

use crate::utils::AppError;
use actix_web::{error::InternalError, web, HttpResponse, ResponseError};

/// Logs a failed operation and renders the JSON error body.
pub(crate) fn failure(context: &str, error: AppError) -> HttpResponse {
    if error.is_server_error() {
        log::error!("❌ {} failed: {}", context, error);
    } else {
        log::warn!("⚠️  {} rejected: {}", context, error);
    }
    error.error_response()
}

/// Malformed JSON bodies get the same `{"success": false, "error": ...}` shape as every other error.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let response = AppError::InvalidRequest(format!("Invalid JSON body: {}", err)).error_response();
        InternalError::from_response(err, response).into()
    })
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        let response = AppError::InvalidRequest(format!("Invalid query string: {}", err)).error_response();
        InternalError::from_response(err, response).into()
    })
}

pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _req| {
        let response = AppError::InvalidRequest(format!("Invalid path parameter: {}", err)).error_response();
        InternalError::from_response(err, response).into()
    })
}
