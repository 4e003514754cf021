use crate::{config::AppConfig, services::auth_service, utils::AppError};
use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    web, Error, HttpMessage, ResponseError,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};

pub use crate::services::auth_service::Claims;

/// Verifies the bearer access token and stores its `Claims` in the request
/// extensions. `admin()` additionally requires the admin flag.
#[derive(Clone, Copy)]
pub struct AuthMiddleware {
    require_admin: bool,
}

impl AuthMiddleware {
    pub fn user() -> Self {
        Self { require_admin: false }
    }

    pub fn admin() -> Self {
        Self { require_admin: true }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service,
            require_admin: self.require_admin,
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
    require_admin: bool,
}

fn bearer_token(req: &ServiceRequest) -> Option<String> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

impl<S> AuthMiddlewareService<S> {
    fn authorize(&self, req: &ServiceRequest) -> Result<Claims, AppError> {
        let config = req
            .app_data::<web::Data<AppConfig>>()
            .ok_or_else(|| AppError::Internal("AppConfig is not registered".to_string()))?;

        let token = bearer_token(req)
            .ok_or_else(|| AppError::Unauthorized("Missing authorization token".to_string()))?;
        let claims = auth_service::verify_token(&token, &config.jwt)?;

        if self.require_admin && !claims.is_admin {
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }
        Ok(claims)
    }
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        match self.authorize(&req) {
            Ok(claims) => {
                req.extensions_mut().insert(claims);
                let fut = self.service.call(req);
                Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
            }
            Err(e) => {
                log::warn!("🔒 {} {} rejected: {}", req.method(), req.path(), e);
                let response = e.error_response();
                Box::pin(async move { Ok(req.into_response(response).map_into_right_body()) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{User, PROVIDER_CREDENTIALS};
    use actix_web::{http::StatusCode, test, App, HttpResponse};
    use mongodb::bson::DateTime as BsonDateTime;

    async fn whoami(claims: web::ReqData<Claims>) -> HttpResponse {
        HttpResponse::Ok().body(claims.sub.clone())
    }

    fn token(is_admin: bool) -> String {
        let user = User {
            id: None,
            omid: "K7M2P9Q4R1S8".to_string(),
            email: "listener@example.com".to_string(),
            password: None,
            name: "Listener".to_string(),
            image: None,
            provider: PROVIDER_CREDENTIALS.to_string(),
            is_admin,
            country: None,
            verified: true,
            verification_code: None,
            verification_expires: None,
            verification_attempts: 0,
            created_at: BsonDateTime::now(),
        };
        auth_service::issue_tokens(&user, &AppConfig::for_tests().jwt)
            .unwrap()
            .token
    }

    macro_rules! app {
        () => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(AppConfig::for_tests()))
                    .service(web::scope("/me").wrap(AuthMiddleware::user()).route("", web::get().to(whoami)))
                    .service(web::scope("/admin").wrap(AuthMiddleware::admin()).route("", web::get().to(whoami))),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_missing_token_is_unauthorized() {
        let app = app!();
        let res = test::call_service(&app, test::TestRequest::get().uri("/me").to_request()).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["success"], false);
    }

    #[actix_web::test]
    async fn test_garbage_token_is_unauthorized() {
        let app = app!();
        let req = test::TestRequest::get()
            .uri("/me")
            .insert_header((header::AUTHORIZATION, "Bearer not-a-jwt"))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_valid_token_reaches_handler() {
        let app = app!();
        let req = test::TestRequest::get()
            .uri("/me")
            .insert_header((header::AUTHORIZATION, format!("Bearer {}", token(false))))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(test::read_body(res).await, "K7M2P9Q4R1S8");
    }

    #[actix_web::test]
    async fn test_admin_scope_requires_admin_flag() {
        let app = app!();
        let req = test::TestRequest::get()
            .uri("/admin")
            .insert_header((header::AUTHORIZATION, format!("Bearer {}", token(false))))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::get()
            .uri("/admin")
            .insert_header((header::AUTHORIZATION, format!("Bearer {}", token(true))))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }
}
