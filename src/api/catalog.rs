use actix_web::{web, HttpResponse};
use serde::Deserialize;
use crate::services::spotify_service::{self, AlbumSummary, SpotifyClient};
use crate::utils::AppError;

use super::failure;

const DEFAULT_SEARCH_LIMIT: u32 = 20;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct SearchQuery {
    /// Free-text album query
    pub q: Option<String>,
    /// 1..=50, defaults to 20
    pub limit: Option<u32>,
}

#[utoipa::path(
    get,
    path = "/api/v1/catalog/search",
    tag = "Catalog",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching albums", body = [AlbumSummary]),
        (status = 400, description = "Missing query"),
        (status = 502, description = "Catalog unavailable")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn search_albums(spotify: web::Data<SpotifyClient>, query: web::Query<SearchQuery>) -> HttpResponse {
    let q = query.q.as_deref().map(str::trim).unwrap_or_default();
    log::info!("🔍 GET /catalog/search - q: {}", q);

    if q.is_empty() {
        return failure("Album search", AppError::InvalidRequest("Query parameter 'q' is required".to_string()));
    }

    match spotify.search_albums(q, query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT)).await {
        Ok(albums) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "count": albums.len(),
            "albums": albums
        })),
        Err(e) => failure("Album search", e),
    }
}

pub async fn get_album(spotify: web::Data<SpotifyClient>, path: web::Path<String>) -> HttpResponse {
    let album_id = path.into_inner();
    log::info!("💿 GET /catalog/albums/{}", album_id);

    match spotify.get_album(&album_id).await {
        Ok(album) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "album": album
        })),
        Err(e) => failure("Album lookup", e),
    }
}

/// Accepts a bare id or a URL-encoded playlist link.
pub async fn get_playlist(spotify: web::Data<SpotifyClient>, path: web::Path<String>) -> HttpResponse {
    let raw = path.into_inner();
    let input = match urlencoding::decode(&raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.clone(),
    };
    log::info!("🎶 GET /catalog/playlists/{}", input);

    let playlist_id = match spotify_service::parse_playlist_id(&input) {
        Ok(id) => id,
        Err(e) => return failure("Playlist lookup", e),
    };

    match spotify.get_playlist(&playlist_id).await {
        Ok(playlist) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "playlist": playlist
        })),
        Err(e) => failure("Playlist lookup", e),
    }
}
