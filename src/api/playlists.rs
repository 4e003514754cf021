use actix_web::{web, HttpResponse};
use crate::{
    database::MongoDB,
    middleware::auth::Claims,
    models::{LinkPlaylistRequest, Playlist, PlaylistResponse},
    services::{playlist_service, spotify_service::SpotifyClient},
};

use super::failure;

fn playlist_list(playlists: Vec<Playlist>) -> HttpResponse {
    let playlists: Vec<PlaylistResponse> = playlists.into_iter().map(PlaylistResponse::from).collect();
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "count": playlists.len(),
        "playlists": playlists
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/playlists/predefined",
    tag = "Playlists",
    responses(
        (status = 200, description = "Admin-curated playlists")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_predefined(db: web::Data<MongoDB>) -> HttpResponse {
    log::info!("🎶 GET /playlists/predefined");

    match playlist_service::list_predefined(&db).await {
        Ok(playlists) => playlist_list(playlists),
        Err(e) => failure("Predefined playlist list", e),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/playlists",
    tag = "Playlists",
    responses(
        (status = 200, description = "Playlists linked by the user")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_mine(db: web::Data<MongoDB>, user: web::ReqData<Claims>) -> HttpResponse {
    log::info!("🎶 GET /playlists - {}", user.sub);

    match playlist_service::list_for_user(&db, &user.sub).await {
        Ok(playlists) => playlist_list(playlists),
        Err(e) => failure("Playlist list", e),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/playlists",
    tag = "Playlists",
    request_body = LinkPlaylistRequest,
    responses(
        (status = 201, description = "Playlist linked", body = PlaylistResponse),
        (status = 400, description = "Unrecognized playlist reference"),
        (status = 404, description = "Playlist not found in the catalog"),
        (status = 409, description = "Playlist already linked")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn link_playlist(
    db: web::Data<MongoDB>,
    spotify: web::Data<SpotifyClient>,
    user: web::ReqData<Claims>,
    request: web::Json<LinkPlaylistRequest>,
) -> HttpResponse {
    log::info!("🎶 POST /playlists - {} linking {}", user.sub, request.playlist);

    match playlist_service::link_playlist(&db, &spotify, &user.sub, &request.playlist).await {
        Ok(playlist) => HttpResponse::Created().json(serde_json::json!({
            "success": true,
            "playlist": PlaylistResponse::from(playlist)
        })),
        Err(e) => failure("Playlist link", e),
    }
}

/// Owners remove their own playlists; admins can remove any.
pub async fn delete_playlist(db: web::Data<MongoDB>, user: web::ReqData<Claims>, path: web::Path<String>) -> HttpResponse {
    let playlist_id = path.into_inner();
    log::info!("🗑️ DELETE /playlists/{} - {}", playlist_id, user.sub);

    match playlist_service::delete_playlist(&db, &user, &playlist_id).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "Playlist deleted"
        })),
        Err(e) => failure("Playlist deletion", e),
    }
}
