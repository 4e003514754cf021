use crate::utils::{RateDecision, RateLimiter};
use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{self, HeaderName, HeaderValue},
    Error, HttpResponse,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::sync::Arc;

/// Per-client request cap. The limiter is shared, so every scope wrapped with
/// the same `RateLimit` draws from one budget per address.
///
/// Clients are keyed by the socket peer IP. `X-Forwarded-For`/`Forwarded` are
/// only honoured after `trust_forwarded(true)`, for deployments behind a proxy
/// that overwrites them.
#[derive(Clone)]
pub struct RateLimit {
    limiter: Arc<RateLimiter>,
    trust_forwarded: bool,
}

impl RateLimit {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self {
            limiter,
            trust_forwarded: false,
        }
    }

    pub fn trust_forwarded(mut self, trust: bool) -> Self {
        self.trust_forwarded = trust;
        self
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddleware {
            service,
            limiter: self.limiter.clone(),
            trust_forwarded: self.trust_forwarded,
        }))
    }
}

pub struct RateLimitMiddleware<S> {
    service: S,
    limiter: Arc<RateLimiter>,
    trust_forwarded: bool,
}

fn client_key(req: &ServiceRequest, trust_forwarded: bool) -> String {
    if trust_forwarded {
        if let Some(addr) = req.connection_info().realip_remote_addr() {
            return addr.to_string();
        }
    }
    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddleware<S>
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
        let key = client_key(&req, self.trust_forwarded);

        match self.limiter.check(&key) {
            RateDecision::Allowed { remaining } => {
                let fut = self.service.call(req);
                Box::pin(async move {
                    let mut res = fut.await?;
                    res.headers_mut().insert(
                        HeaderName::from_static("x-ratelimit-remaining"),
                        HeaderValue::from(remaining),
                    );
                    Ok(res.map_into_left_body())
                })
            }
            RateDecision::Limited { retry_after } => {
                let seconds = retry_after.as_secs_f64().ceil().max(1.0) as u64;
                log::warn!("🚦 Rate limit hit for {} on {}", key, req.path());

                let response = HttpResponse::TooManyRequests()
                    .insert_header((header::RETRY_AFTER, seconds.to_string()))
                    .json(serde_json::json!({
                        "success": false,
                        "error": format!("Too many requests. Try again in {} seconds", seconds)
                    }));
                Box::pin(async move { Ok(req.into_response(response).map_into_right_body()) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, web, App};
    use std::time::Duration;

    macro_rules! app {
        ($limit:expr) => {
            test::init_service(
                App::new().service(
                    web::scope("/auth")
                        .wrap($limit)
                        .route("/login", web::post().to(|| async { HttpResponse::Ok().finish() })),
                ),
            )
            .await
        };
    }

    fn login_from(peer: &str, forwarded_for: Option<&str>) -> test::TestRequest {
        let request = test::TestRequest::post()
            .uri("/auth/login")
            .peer_addr(peer.parse().unwrap());
        match forwarded_for {
            Some(value) => request.insert_header(("x-forwarded-for", value.to_string())),
            None => request,
        }
    }

    #[actix_web::test]
    async fn test_requests_over_the_limit_get_429() {
        let limiter = Arc::new(RateLimiter::new(2, Duration::from_secs(60)));
        let app = app!(RateLimit::new(limiter.clone()));

        let first = test::call_service(&app, login_from("10.0.0.7:5000", None).to_request()).await;
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(first.headers().get("x-ratelimit-remaining").unwrap(), "1");
        assert_eq!(test::call_service(&app, login_from("10.0.0.7:5001", None).to_request()).await.status(), StatusCode::OK);

        let limited = test::call_service(&app, login_from("10.0.0.7:5002", None).to_request()).await;
        assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(limited.headers().contains_key(header::RETRY_AFTER));

        let other_client = test::call_service(&app, login_from("10.0.0.8:5000", None).to_request()).await;
        assert_eq!(other_client.status(), StatusCode::OK);
        assert_eq!(limiter.tracked_clients(), 2);
    }

    #[actix_web::test]
    async fn test_forwarded_header_does_not_reset_budget() {
        let limiter = Arc::new(RateLimiter::new(2, Duration::from_secs(60)));
        let app = app!(RateLimit::new(limiter.clone()));

        let mut allowed = 0;
        for i in 0..20 {
            let forwarded = format!("1.1.1.{}", i);
            let res = test::call_service(&app, login_from("10.0.0.7:5000", Some(&forwarded)).to_request()).await;
            if res.status() == StatusCode::OK {
                allowed += 1;
            }
        }

        assert_eq!(allowed, 2);
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[actix_web::test]
    async fn test_trusted_proxy_keys_on_forwarded_client() {
        let limiter = Arc::new(RateLimiter::new(1, Duration::from_secs(60)));
        let app = app!(RateLimit::new(limiter.clone()).trust_forwarded(true));

        let first = test::call_service(&app, login_from("10.0.0.1:5000", Some("203.0.113.5")).to_request()).await;
        let second = test::call_service(&app, login_from("10.0.0.1:5000", Some("203.0.113.6")).to_request()).await;
        let repeat = test::call_service(&app, login_from("10.0.0.1:5000", Some("203.0.113.5")).to_request()).await;

        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(second.status(), StatusCode::OK);
        assert_eq!(repeat.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
