// Utility functions
pub mod error;
pub mod http;
pub mod ids;
pub mod rate_limiter;

pub use error::*;
pub use ids::*;
pub use rate_limiter::*;
