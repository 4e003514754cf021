use actix_web::{web, HttpResponse};
use serde::Deserialize;
use crate::services::genius_service::GeniusClient;
use crate::utils::AppError;

use super::failure;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct LyricsQuery {
    /// Song title and/or artist
    pub q: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/lyrics/search",
    tag = "Lyrics",
    params(LyricsQuery),
    responses(
        (status = 200, description = "Songs with a lyrics page"),
        (status = 400, description = "Missing query"),
        (status = 502, description = "Lyrics provider unavailable")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn search(genius: web::Data<GeniusClient>, query: web::Query<LyricsQuery>) -> HttpResponse {
    let q = query.q.as_deref().map(str::trim).unwrap_or_default();
    log::info!("📜 GET /lyrics/search - q: {}", q);

    if q.is_empty() {
        return failure("Lyrics search", AppError::InvalidRequest("Query parameter 'q' is required".to_string()));
    }

    match genius.search(q).await {
        Ok(hits) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "count": hits.len(),
            "results": hits
        })),
        Err(e) => failure("Lyrics search", e),
    }
}

pub async fn song_credits(genius: web::Data<GeniusClient>, path: web::Path<u64>) -> HttpResponse {
    let song_id = path.into_inner();
    log::info!("📜 GET /lyrics/songs/{}", song_id);

    match genius.song_credits(song_id).await {
        Ok(credits) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "song": credits
        })),
        Err(e) => failure("Song credits lookup", e),
    }
}
