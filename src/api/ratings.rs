use actix_web::{web, HttpResponse};
use crate::{
    database::MongoDB,
    middleware::auth::Claims,
    models::{HistoryPoint, RatingResponse, SubmitRatingRequest, UpdateRatingRequest},
    services::rating_service,
};

use super::failure;

#[utoipa::path(
    post,
    path = "/api/v1/ratings",
    tag = "Ratings",
    responses(
        (status = 201, description = "Rating stored with its average"),
        (status = 400, description = "Missing field, unrated track or score outside 0..=10"),
        (status = 409, description = "Album already rated")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn submit_rating(
    db: web::Data<MongoDB>,
    user: web::ReqData<Claims>,
    request: web::Json<SubmitRatingRequest>,
) -> HttpResponse {
    log::info!("⭐ POST /ratings - user: {}, album: {}", user.sub, request.album_id);

    match rating_service::submit_rating(&db, &user.sub, &request).await {
        Ok(rating) => HttpResponse::Created().json(serde_json::json!({
            "success": true,
            "rating": RatingResponse::from(rating)
        })),
        Err(e) => failure("Rating submission", e),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/ratings",
    tag = "Ratings",
    responses(
        (status = 200, description = "The user's ratings, most recently edited first")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_ratings(db: web::Data<MongoDB>, user: web::ReqData<Claims>) -> HttpResponse {
    log::info!("⭐ GET /ratings - {}", user.sub);

    match rating_service::list_ratings(&db, &user.sub).await {
        Ok(ratings) => {
            let ratings: Vec<RatingResponse> = ratings.into_iter().map(RatingResponse::from).collect();
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "count": ratings.len(),
                "ratings": ratings
            }))
        }
        Err(e) => failure("Rating list", e),
    }
}

pub async fn get_rating(db: web::Data<MongoDB>, user: web::ReqData<Claims>, path: web::Path<String>) -> HttpResponse {
    let album_id = path.into_inner();
    log::info!("⭐ GET /ratings/{} - {}", album_id, user.sub);

    match rating_service::get_rating(&db, &user.sub, &album_id).await {
        Ok(rating) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "rating": RatingResponse::from(rating)
        })),
        Err(e) => failure("Rating lookup", e),
    }
}

pub async fn update_rating(
    db: web::Data<MongoDB>,
    user: web::ReqData<Claims>,
    path: web::Path<String>,
    request: web::Json<UpdateRatingRequest>,
) -> HttpResponse {
    let album_id = path.into_inner();
    log::info!("✏️ PUT /ratings/{} - {}", album_id, user.sub);

    match rating_service::update_rating(&db, &user.sub, &album_id, &request).await {
        Ok(rating) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "rating": RatingResponse::from(rating)
        })),
        Err(e) => failure("Rating update", e),
    }
}

pub async fn delete_rating(db: web::Data<MongoDB>, user: web::ReqData<Claims>, path: web::Path<String>) -> HttpResponse {
    let album_id = path.into_inner();
    log::info!("🗑️ DELETE /ratings/{} - {}", album_id, user.sub);

    match rating_service::delete_rating(&db, &user.sub, &album_id).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "Rating deleted"
        })),
        Err(e) => failure("Rating deletion", e),
    }
}

/// Averages over time, oldest first.
pub async fn rating_history(db: web::Data<MongoDB>, user: web::ReqData<Claims>, path: web::Path<String>) -> HttpResponse {
    let album_id = path.into_inner();
    log::info!("📈 GET /ratings/{}/history - {}", album_id, user.sub);

    match rating_service::get_history(&db, &user.sub, &album_id).await {
        Ok(entries) => {
            let history: Vec<HistoryPoint> = entries.into_iter().map(HistoryPoint::from).collect();
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "album_id": album_id,
                "history": history
            }))
        }
        Err(e) => failure("Rating history", e),
    }
}
