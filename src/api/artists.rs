use actix_web::{web, HttpResponse};
use crate::{
    database::MongoDB,
    middleware::auth::Claims,
    services::{artist_service, spotify_service::SpotifyClient},
};

use super::failure;

/// The user's rated albums grouped by artist, best average first.
#[utoipa::path(
    get,
    path = "/api/v1/artists",
    tag = "Ratings",
    responses(
        (status = 200, description = "Artist groups with catalog metadata when available")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_artists(
    db: web::Data<MongoDB>,
    spotify: web::Data<SpotifyClient>,
    user: web::ReqData<Claims>,
) -> HttpResponse {
    log::info!("🎤 GET /artists - {}", user.sub);

    match artist_service::aggregate_artists(&db, &spotify, &user.sub).await {
        Ok(artists) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "count": artists.len(),
            "artists": artists
        })),
        Err(e) => failure("Artist aggregation", e),
    }
}
