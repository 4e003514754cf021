pub mod auth;
pub mod metrics;
pub mod rate_limit;
pub mod security_headers;

pub use auth::AuthMiddleware;
pub use metrics::RequestMetrics;
pub use rate_limit::RateLimit;
pub use security_headers::SecurityHeaders;
