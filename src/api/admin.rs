use actix_web::{web, HttpResponse};
use serde::Deserialize;
use crate::{
    database::MongoDB,
    middleware::auth::Claims,
    models::{LinkPlaylistRequest, PlaylistResponse},
    services::{admin_service, playlist_service, spotify_service::SpotifyClient},
};

use super::failure;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct PageQuery {
    /// Starts at 1
    pub page: Option<u64>,
    /// 1..=100, defaults to 25
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SetAdminRequest {
    pub is_admin: bool,
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    tag = "Admin",
    params(PageQuery),
    responses(
        (status = 200, description = "Page of users, newest first"),
        (status = 403, description = "Admin access required")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_users(db: web::Data<MongoDB>, query: web::Query<PageQuery>) -> HttpResponse {
    log::info!("🛡️ GET /admin/users - page {:?}", query.page);

    match admin_service::list_users(&db, query.page, query.limit).await {
        Ok(page) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "users": page.users,
            "total": page.total,
            "page": page.page,
            "limit": page.limit
        })),
        Err(e) => failure("User list", e),
    }
}

pub async fn set_admin(
    db: web::Data<MongoDB>,
    admin: web::ReqData<Claims>,
    path: web::Path<String>,
    request: web::Json<SetAdminRequest>,
) -> HttpResponse {
    let target = path.into_inner();
    log::info!("🛡️ PUT /admin/users/{}/admin = {} by {}", target, request.is_admin, admin.sub);

    match admin_service::set_admin(&db, &admin.sub, &target, request.is_admin).await {
        Ok(user) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "user": user
        })),
        Err(e) => failure("Admin role change", e),
    }
}

pub async fn delete_user(db: web::Data<MongoDB>, admin: web::ReqData<Claims>, path: web::Path<String>) -> HttpResponse {
    let target = path.into_inner();
    log::info!("🛡️ DELETE /admin/users/{} by {}", target, admin.sub);

    match admin_service::delete_user(&db, &admin.sub, &target).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "User deleted"
        })),
        Err(e) => failure("User deletion", e),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/analytics",
    tag = "Admin",
    responses(
        (status = 200, description = "Totals, user growth, users by country and top albums"),
        (status = 403, description = "Admin access required")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn analytics(db: web::Data<MongoDB>) -> HttpResponse {
    log::info!("📊 GET /admin/analytics");

    match admin_service::analytics(&db).await {
        Ok(analytics) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "analytics": analytics
        })),
        Err(e) => failure("Analytics", e),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/playlists",
    tag = "Admin",
    request_body = LinkPlaylistRequest,
    responses(
        (status = 201, description = "Predefined playlist created", body = PlaylistResponse),
        (status = 409, description = "Playlist is already predefined")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_predefined_playlist(
    db: web::Data<MongoDB>,
    spotify: web::Data<SpotifyClient>,
    request: web::Json<LinkPlaylistRequest>,
) -> HttpResponse {
    log::info!("🛡️ POST /admin/playlists - {}", request.playlist);

    match playlist_service::create_predefined(&db, &spotify, &request.playlist).await {
        Ok(playlist) => HttpResponse::Created().json(serde_json::json!({
            "success": true,
            "playlist": PlaylistResponse::from(playlist)
        })),
        Err(e) => failure("Predefined playlist creation", e),
    }
}
