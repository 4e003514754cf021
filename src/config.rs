use crate::utils::AppError;
use std::env;
use std::str::FromStr;

/// One day.
pub const MAX_OTP_TTL_MINUTES: i64 = 24 * 60;

#[derive(Debug, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub access_ttl_hours: i64,
    pub refresh_ttl_days: i64,
}

#[derive(Debug, Clone)]
pub struct SpotifySettings {
    pub client_id: String,
    pub client_secret: String,
    pub accounts_url: String,
    pub api_url: String,
}

#[derive(Debug, Clone)]
pub struct GeniusSettings {
    pub access_token: String,
    pub api_url: String,
}

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub endpoint: String,
    pub bucket: String,
    pub token: String,
    pub public_url: String,
}

#[derive(Debug, Clone)]
pub struct RateLimitSettings {
    pub max_requests: u32,
    pub window_secs: u64,
    /// Key clients on `X-Forwarded-For`/`Forwarded` instead of the peer IP
    pub trust_proxy: bool,
}

/// Runtime configuration, read once at startup from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub cors_origins: Vec<String>,
    pub jwt: JwtSettings,
    pub spotify: SpotifySettings,
    pub genius: GeniusSettings,
    /// `None` when SMTP_HOST is unset; OTP mails are then only logged.
    pub smtp: Option<SmtpSettings>,
    pub storage: Option<StorageSettings>,
    pub otp_ttl_minutes: i64,
    pub rate_limit: RateLimitSettings,
    pub admin_email: Option<String>,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: FromStr>(key: &str, default: T) -> Result<T, AppError> {
    match optional_var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| AppError::ConfigError(format!("{} has an invalid value: {}", key, raw))),
        None => Ok(default),
    }
}

fn parse_bounded<T>(key: &str, default: T, min: T, max: T) -> Result<T, AppError>
where
    T: FromStr + PartialOrd + std::fmt::Display,
{
    let value = parse_var(key, default)?;
    if value < min || value > max {
        return Err(AppError::ConfigError(format!(
            "{} must be between {} and {}, got {}",
            key, min, max, value
        )));
    }
    Ok(value)
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let database_url = optional_var("DATABASE_URL")
            .ok_or_else(|| AppError::ConfigError("DATABASE_URL must be set".to_string()))?;

        let jwt_secret = optional_var("JWT_SECRET")
            .ok_or_else(|| AppError::ConfigError("JWT_SECRET must be set".to_string()))?;

        let cors_origins = var_or("CORS_ORIGINS", "http://localhost:3000")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let smtp = match optional_var("SMTP_HOST") {
            Some(host) => Some(SmtpSettings {
                host,
                port: parse_var("SMTP_PORT", 587u16)?,
                username: var_or("SMTP_USERNAME", ""),
                password: var_or("SMTP_PASSWORD", ""),
                from: var_or("SMTP_FROM", "Musical Odyssey <no-reply@musicalodyssey.app>"),
            }),
            None => None,
        };

        let storage = match (optional_var("STORAGE_ENDPOINT"), optional_var("STORAGE_TOKEN")) {
            (Some(endpoint), Some(token)) => {
                let bucket = var_or("STORAGE_BUCKET", "profile-images");
                let public_url = optional_var("STORAGE_PUBLIC_URL")
                    .unwrap_or_else(|| format!("{}/{}", endpoint.trim_end_matches('/'), bucket));
                Some(StorageSettings {
                    endpoint,
                    bucket,
                    token,
                    public_url,
                })
            }
            _ => None,
        };

        Ok(Self {
            host: var_or("HOST", "0.0.0.0"),
            port: parse_var("PORT", 3002u16)?,
            database_url,
            cors_origins,
            jwt: JwtSettings {
                secret: jwt_secret,
                issuer: var_or("JWT_ISSUER", "musical-odyssey"),
                audience: var_or("JWT_AUDIENCE", "musical-odyssey-web"),
                access_ttl_hours: parse_bounded("JWT_ACCESS_TTL_HOURS", 24i64, 1, 24 * 30)?,
                refresh_ttl_days: parse_bounded("JWT_REFRESH_TTL_DAYS", 30i64, 1, 365)?,
            },
            spotify: SpotifySettings {
                client_id: var_or("SPOTIFY_CLIENT_ID", ""),
                client_secret: var_or("SPOTIFY_CLIENT_SECRET", ""),
                accounts_url: var_or("SPOTIFY_ACCOUNTS_URL", "https://accounts.spotify.com"),
                api_url: var_or("SPOTIFY_API_URL", "https://api.spotify.com/v1"),
            },
            genius: GeniusSettings {
                access_token: var_or("GENIUS_ACCESS_TOKEN", ""),
                api_url: var_or("GENIUS_API_URL", "https://api.genius.com"),
            },
            smtp,
            storage,
            otp_ttl_minutes: parse_bounded("OTP_TTL_MINUTES", 10i64, 1, MAX_OTP_TTL_MINUTES)?,
            rate_limit: RateLimitSettings {
                max_requests: parse_bounded("RATE_LIMIT_MAX_REQUESTS", 10u32, 1, 10_000)?,
                window_secs: parse_bounded("RATE_LIMIT_WINDOW_SECS", 60u64, 1, 86_400)?,
                trust_proxy: parse_var("RATE_LIMIT_TRUST_PROXY", false)?,
            },
            admin_email: optional_var("ADMIN_EMAIL").map(|e| e.trim().to_lowercase()),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
impl AppConfig {
    /// Configuration for handler and middleware tests; never touches the environment.
    pub fn for_tests() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            database_url: "mongodb://localhost:27017/musical_odyssey_test".to_string(),
            cors_origins: vec!["http://localhost:3000".to_string()],
            jwt: JwtSettings {
                secret: "test-secret".to_string(),
                issuer: "musical-odyssey".to_string(),
                audience: "musical-odyssey-web".to_string(),
                access_ttl_hours: 1,
                refresh_ttl_days: 1,
            },
            spotify: SpotifySettings {
                client_id: String::new(),
                client_secret: String::new(),
                accounts_url: "http://127.0.0.1:9".to_string(),
                api_url: "http://127.0.0.1:9".to_string(),
            },
            genius: GeniusSettings {
                access_token: String::new(),
                api_url: "http://127.0.0.1:9".to_string(),
            },
            smtp: None,
            storage: None,
            otp_ttl_minutes: 10,
            rate_limit: RateLimitSettings {
                max_requests: 2,
                window_secs: 60,
                trust_proxy: false,
            },
            admin_email: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var_default_and_error() {
        assert_eq!(parse_var("MUSICAL_ODYSSEY_UNSET_TEST_VAR", 42u32).unwrap(), 42);

        env::set_var("MUSICAL_ODYSSEY_BAD_PORT_TEST_VAR", "not-a-number");
        let err = parse_var("MUSICAL_ODYSSEY_BAD_PORT_TEST_VAR", 1u16).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
        env::remove_var("MUSICAL_ODYSSEY_BAD_PORT_TEST_VAR");
    }

    #[test]
    fn test_parse_bounded_rejects_out_of_range() {
        assert_eq!(parse_bounded("MUSICAL_ODYSSEY_UNSET_TTL_VAR", 10i64, 1, MAX_OTP_TTL_MINUTES).unwrap(), 10);

        env::set_var("MUSICAL_ODYSSEY_HUGE_TTL_TEST_VAR", "9223372036854775807");
        let err = parse_bounded("MUSICAL_ODYSSEY_HUGE_TTL_TEST_VAR", 10i64, 1, MAX_OTP_TTL_MINUTES).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));

        env::set_var("MUSICAL_ODYSSEY_HUGE_TTL_TEST_VAR", "0");
        assert!(parse_bounded("MUSICAL_ODYSSEY_HUGE_TTL_TEST_VAR", 10i64, 1, MAX_OTP_TTL_MINUTES).is_err());
        env::remove_var("MUSICAL_ODYSSEY_HUGE_TTL_TEST_VAR");
    }

    #[test]
    fn test_missing_jwt_secret_is_a_config_error() {
        if env::var("DATABASE_URL").is_err() {
            env::set_var("DATABASE_URL", "mongodb://localhost:27017/musical_odyssey_test");
        }
        env::remove_var("JWT_SECRET");

        let err = AppConfig::from_env().unwrap_err();
        assert!(matches!(err, AppError::ConfigError(ref msg) if msg.contains("JWT_SECRET")));
    }

    #[test]
    fn test_bind_address() {
        let mut config = AppConfig::for_tests();
        config.port = 8080;
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
    }
}
