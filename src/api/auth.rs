use actix_web::{web, HttpResponse};
use crate::{config::AppConfig, database::MongoDB, middleware::auth::Claims, services::auth_service};
use crate::services::auth_service::{
    AuthResponse, LoginRequest, RefreshTokenRequest, RegisterRequest, RegisterResponse, ResendOtpRequest,
    VerifyOtpRequest,
};
use crate::services::email_service::Mailer;

use super::failure;

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created, verification code sent", body = RegisterResponse),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Email already registered"),
        (status = 429, description = "Too many requests")
    )
)]
pub async fn register(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    mailer: web::Data<dyn Mailer>,
    request: web::Json<RegisterRequest>,
) -> HttpResponse {
    let email = request.email.as_deref().unwrap_or("N/A");
    log::info!("📝 POST /auth/register - email: {}", email);

    match auth_service::register(&db, &config, mailer.get_ref(), &request).await {
        Ok(response) => {
            log::info!("✅ Registration pending verification: {}", response.email);
            HttpResponse::Created().json(response)
        }
        Err(e) => failure("Registration", e),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/verify-otp",
    tag = "Auth",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Email verified, tokens issued", body = AuthResponse),
        (status = 400, description = "Wrong or expired code"),
        (status = 404, description = "Unknown email")
    )
)]
pub async fn verify_otp(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    request: web::Json<VerifyOtpRequest>,
) -> HttpResponse {
    log::info!("🔑 POST /auth/verify-otp - email: {}", request.email);

    match auth_service::verify_otp(&db, &config.jwt, &request).await {
        Ok(response) => {
            log::info!("✅ Email verified: {}", response.user.email);
            HttpResponse::Ok().json(response)
        }
        Err(e) => failure("OTP verification", e),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/resend-otp",
    tag = "Auth",
    request_body = ResendOtpRequest,
    responses(
        (status = 200, description = "New code sent", body = RegisterResponse),
        (status = 400, description = "Account already verified"),
        (status = 404, description = "Unknown email")
    )
)]
pub async fn resend_otp(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    mailer: web::Data<dyn Mailer>,
    request: web::Json<ResendOtpRequest>,
) -> HttpResponse {
    log::info!("📨 POST /auth/resend-otp - email: {}", request.email);

    match auth_service::resend_otp(&db, &config, mailer.get_ref(), &request).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => failure("OTP resend", e),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Email not verified")
    )
)]
pub async fn login(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    request: web::Json<LoginRequest>,
) -> HttpResponse {
    log::info!("🔐 POST /auth/login - email: {}", request.email);

    match auth_service::login(&db, &config.jwt, &request).await {
        Ok(response) => {
            log::info!("✅ Login successful: {}", response.user.omid);
            HttpResponse::Ok().json(response)
        }
        Err(e) => failure("Login", e),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    tag = "Auth",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "New token pair", body = AuthResponse),
        (status = 401, description = "Invalid or expired refresh token")
    )
)]
pub async fn refresh_token(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    request: web::Json<RefreshTokenRequest>,
) -> HttpResponse {
    log::info!("🔄 POST /auth/refresh");

    match auth_service::refresh_token(&db, &config.jwt, &request).await {
        Ok(response) => {
            log::info!("✅ Token refreshed for {}", response.user.omid);
            HttpResponse::Ok().json(response)
        }
        Err(e) => failure("Token refresh", e),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current user"),
        (status = 401, description = "Invalid or expired token")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_me(db: web::Data<MongoDB>, user: web::ReqData<Claims>) -> HttpResponse {
    log::info!("👤 GET /auth/me - {}", user.sub);

    match auth_service::get_current_user(&db, &user.sub).await {
        Ok(info) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "user": info
        })),
        Err(e) => failure("Current user lookup", e),
    }
}

/// Deletes the account along with its ratings, history, rankings and playlists.
#[utoipa::path(
    delete,
    path = "/api/v1/auth/delete-account",
    tag = "Auth",
    responses(
        (status = 200, description = "Account deleted"),
        (status = 401, description = "Invalid or expired token")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_account(db: web::Data<MongoDB>, user: web::ReqData<Claims>) -> HttpResponse {
    log::info!("🗑️ DELETE /auth/delete-account - {}", user.sub);

    match auth_service::delete_user_account(&db, &user.sub).await {
        Ok(()) => {
            log::info!("✅ Account deleted successfully: {}", user.sub);
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": "Account deleted successfully"
            }))
        }
        Err(e) => failure("Account deletion", e),
    }
}
