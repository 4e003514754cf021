use actix_web::{web, HttpResponse};
use crate::{
    database::MongoDB,
    middleware::auth::Claims,
    models::{RankingKind, RankingResponse, SubmitRankingRequest},
    services::ranking_service,
    utils::{AppError, AppResult},
};

use super::failure;

fn parse_kind(raw: &str) -> AppResult<RankingKind> {
    raw.parse::<RankingKind>().map_err(AppError::InvalidRequest)
}

#[utoipa::path(
    post,
    path = "/api/v1/rankings",
    tag = "Rankings",
    request_body = SubmitRankingRequest,
    responses(
        (status = 201, description = "Ranking snapshot stored", body = RankingResponse),
        (status = 400, description = "Empty, oversized or duplicated item list")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn submit_ranking(
    db: web::Data<MongoDB>,
    user: web::ReqData<Claims>,
    request: web::Json<SubmitRankingRequest>,
) -> HttpResponse {
    log::info!("🏆 POST /rankings - {} ({})", user.sub, request.list_type);

    match ranking_service::submit_ranking(&db, &user.sub, request.into_inner()).await {
        Ok(ranking) => HttpResponse::Created().json(serde_json::json!({
            "success": true,
            "ranking": RankingResponse::from(ranking)
        })),
        Err(e) => failure("Ranking submission", e),
    }
}

pub async fn latest_ranking(db: web::Data<MongoDB>, user: web::ReqData<Claims>, path: web::Path<String>) -> HttpResponse {
    log::info!("🏆 GET /rankings/{} - {}", path, user.sub);

    let kind = match parse_kind(&path) {
        Ok(kind) => kind,
        Err(e) => return failure("Ranking lookup", e),
    };

    match ranking_service::latest_ranking(&db, &user.sub, kind).await {
        Ok(ranking) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "ranking": RankingResponse::from(ranking)
        })),
        Err(e) => failure("Ranking lookup", e),
    }
}

pub async fn ranking_history(db: web::Data<MongoDB>, user: web::ReqData<Claims>, path: web::Path<String>) -> HttpResponse {
    log::info!("🏆 GET /rankings/{}/history - {}", path, user.sub);

    let kind = match parse_kind(&path) {
        Ok(kind) => kind,
        Err(e) => return failure("Ranking history", e),
    };

    match ranking_service::ranking_history(&db, &user.sub, kind).await {
        Ok(rankings) => {
            let rankings: Vec<RankingResponse> = rankings.into_iter().map(RankingResponse::from).collect();
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "count": rankings.len(),
                "rankings": rankings
            }))
        }
        Err(e) => failure("Ranking history", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_list_type_is_bad_request() {
        assert_eq!(parse_kind("albums").unwrap(), RankingKind::Albums);
        assert!(matches!(parse_kind("genres"), Err(AppError::InvalidRequest(_))));
    }
}
