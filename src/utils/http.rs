use lazy_static::lazy_static;
use std::time::Duration;

lazy_static! {
    /// Shared outbound client (catalog, lyrics, storage). Reuses connections
    /// across requests; every call is bounded by the timeout below.
    pub static ref HTTP_CLIENT: reqwest::Client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .user_agent(concat!("musical-odyssey/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|e| {
            log::warn!("⚠️  Falling back to default HTTP client: {}", e);
            reqwest::Client::new()
        });
}

pub fn client() -> &'static reqwest::Client {
    &HTTP_CLIENT
}
