use actix_web::{http::header, web, HttpRequest, HttpResponse};
use crate::{
    database::MongoDB,
    middleware::auth::Claims,
    services::{auth_service, auth_service::UpdateProfileRequest, storage_service::ObjectStorage},
};

use super::failure;

#[utoipa::path(
    put,
    path = "/api/v1/profile",
    tag = "Profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated"),
        (status = 400, description = "Invalid field")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_profile(
    db: web::Data<MongoDB>,
    user: web::ReqData<Claims>,
    request: web::Json<UpdateProfileRequest>,
) -> HttpResponse {
    log::info!("✏️ PUT /profile - {}", user.sub);

    match auth_service::update_profile(&db, &user.sub, &request).await {
        Ok(info) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "user": info
        })),
        Err(e) => failure("Profile update", e),
    }
}

/// Raw image body; the `Content-Type` header picks the file extension.
#[utoipa::path(
    post,
    path = "/api/v1/profile/image",
    tag = "Profile",
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 200, description = "Image stored and profile updated"),
        (status = 400, description = "Empty, oversized or unsupported image"),
        (status = 502, description = "Storage upload failed")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn upload_image(
    req: HttpRequest,
    db: web::Data<MongoDB>,
    storage: web::Data<ObjectStorage>,
    user: web::ReqData<Claims>,
    body: web::Bytes,
) -> HttpResponse {
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    log::info!("🖼️ POST /profile/image - {} ({} bytes, {})", user.sub, body.len(), content_type);

    match auth_service::upload_profile_image(&db, &storage, &user.sub, body.to_vec(), content_type).await {
        Ok(info) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "user": info
        })),
        Err(e) => failure("Profile image upload", e),
    }
}
