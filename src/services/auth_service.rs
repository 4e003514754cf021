use crate::{
    config::{AppConfig, JwtSettings, MAX_OTP_TTL_MINUTES},
    database::{self, MongoDB},
    models::{User, UserInfo, PROVIDER_CREDENTIALS},
    services::{email_service, email_service::Mailer, storage_service, storage_service::ObjectStorage},
    utils::{generate_omid, generate_otp, AppError, AppResult},
};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::{doc, DateTime as BsonDateTime, Document};
use mongodb::options::ReturnDocument;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MIN_PASSWORD_LENGTH: usize = 8;
/// bcrypt cost for OTP hashes, which expire within minutes.
const OTP_HASH_COST: u32 = 8;
/// Wrong codes tolerated before the pending OTP is discarded.
pub const MAX_OTP_ATTEMPTS: i32 = 5;

const TOKEN_ACCESS: &str = "access";
const TOKEN_REFRESH: &str = "refresh";

// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // omid
    pub email: String,
    pub name: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    pub token_type: String,
    pub iat: usize,
    pub exp: usize,
    pub jti: String,
    pub aud: String,
    pub iss: String,
}

// Request/Response structures
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ResendOtpRequest {
    pub email: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub country: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub refresh_token: String,
    pub user: UserInfo,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
    pub email: String,
    pub expires_in_minutes: i64,
}

// ==================== Tokens ====================

fn generate_token(user: &User, settings: &JwtSettings, token_type: &str) -> AppResult<String> {
    let now = Utc::now();
    let exp = if token_type == TOKEN_REFRESH {
        now + Duration::days(settings.refresh_ttl_days)
    } else {
        now + Duration::hours(settings.access_ttl_hours)
    };

    let claims = Claims {
        sub: user.omid.clone(),
        email: user.email.clone(),
        name: Some(user.name.clone()),
        is_admin: user.is_admin,
        token_type: token_type.to_string(),
        iat: now.timestamp() as usize,
        exp: exp.timestamp() as usize,
        jti: Uuid::new_v4().to_string(),
        aud: settings.audience.clone(),
        iss: settings.issuer.clone(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.secret.as_ref()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to generate token: {}", e)))
}

fn decode_token(token: &str, settings: &JwtSettings) -> AppResult<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[settings.audience.as_str()]);
    validation.set_issuer(&[settings.issuer.as_str()]);

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(settings.secret.as_ref()),
        &validation,
    )?;
    Ok(data.claims)
}

/// Verifies an access token (refresh tokens are rejected).
pub fn verify_token(token: &str, settings: &JwtSettings) -> AppResult<Claims> {
    let claims = decode_token(token, settings)?;
    if claims.token_type != TOKEN_ACCESS {
        return Err(AppError::Unauthorized("Refresh token cannot be used for API access".to_string()));
    }
    Ok(claims)
}

pub fn issue_tokens(user: &User, settings: &JwtSettings) -> AppResult<AuthResponse> {
    Ok(AuthResponse {
        success: true,
        token: generate_token(user, settings, TOKEN_ACCESS)?,
        refresh_token: generate_token(user, settings, TOKEN_REFRESH)?,
        user: UserInfo::from(user),
    })
}

// ==================== Validation helpers ====================

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && domain.contains('.')
                && !email.chars().any(char::is_whitespace)
                && !domain.contains('@')
        }
        None => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpCheck {
    Valid,
    Mismatch,
}

fn too_many_attempts() -> AppError {
    AppError::InvalidRequest("Too many incorrect codes. Request a new one".to_string())
}

/// Checks a submitted OTP against the user's pending code, expiry and attempt count.
pub fn check_otp(user: &User, code: &str, now: BsonDateTime) -> AppResult<OtpCheck> {
    if user.verified {
        return Err(AppError::InvalidRequest("Email is already verified".to_string()));
    }

    let (stored, expires) = match (&user.verification_code, &user.verification_expires) {
        (Some(stored), Some(expires)) => (stored, expires),
        _ => {
            return Err(AppError::InvalidRequest(
                "No verification code pending. Request a new one".to_string(),
            ))
        }
    };

    if user.verification_attempts >= MAX_OTP_ATTEMPTS {
        return Err(too_many_attempts());
    }

    if expires.timestamp_millis() < now.timestamp_millis() {
        return Err(AppError::InvalidRequest(
            "Verification code expired. Request a new one".to_string(),
        ));
    }

    if !verify(code.trim(), stored)? {
        return Ok(OtpCheck::Mismatch);
    }

    Ok(OtpCheck::Valid)
}

fn otp_expiry(ttl_minutes: i64) -> BsonDateTime {
    let ttl_millis = ttl_minutes.clamp(1, MAX_OTP_TTL_MINUTES) * 60_000;
    BsonDateTime::from_millis(Utc::now().timestamp_millis().saturating_add(ttl_millis))
}

/// Counts a wrong code; the pending OTP is dropped once the cap is reached.
async fn record_failed_otp(db: &MongoDB, omid: &str) -> AppResult<AppError> {
    let users = db.collection::<User>(database::USERS);
    let attempts = users
        .find_one_and_update(doc! { "omid": omid }, doc! { "$inc": { "verification_attempts": 1 } })
        .return_document(ReturnDocument::After)
        .await?
        .map(|user| user.verification_attempts)
        .unwrap_or(MAX_OTP_ATTEMPTS);

    if attempts < MAX_OTP_ATTEMPTS {
        return Ok(AppError::InvalidRequest("Invalid verification code".to_string()));
    }

    users
        .update_one(
            doc! { "omid": omid },
            doc! { "$unset": { "verification_code": "", "verification_expires": "" } },
        )
        .await?;
    log::warn!("🔒 OTP discarded after {} wrong codes for {}", attempts, omid);
    Ok(too_many_attempts())
}

async fn find_by_email(db: &MongoDB, email: &str) -> AppResult<Option<User>> {
    Ok(db
        .collection::<User>(database::USERS)
        .find_one(doc! { "email": email })
        .await?)
}

pub async fn find_by_omid(db: &MongoDB, omid: &str) -> AppResult<User> {
    db.collection::<User>(database::USERS)
        .find_one(doc! { "omid": omid })
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

async fn send_otp(mailer: &dyn Mailer, user: &User, code: &str, ttl_minutes: i64) -> AppResult<()> {
    let (subject, body) = email_service::otp_email(&user.name, code, ttl_minutes);
    mailer.send(&user.email, &subject, &body).await
}

// ==================== Operations ====================

/// Creates an unverified account and emails an OTP. No tokens until verified.
pub async fn register(
    db: &MongoDB,
    config: &AppConfig,
    mailer: &dyn Mailer,
    request: &RegisterRequest,
) -> AppResult<RegisterResponse> {
    let email = request
        .email
        .as_deref()
        .map(normalize_email)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::InvalidRequest("Email is required".to_string()))?;
    if !is_valid_email(&email) {
        return Err(AppError::InvalidRequest("Email address is malformed".to_string()));
    }

    let password = request
        .password
        .as_deref()
        .ok_or_else(|| AppError::InvalidRequest("Password is required".to_string()))?;
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::InvalidRequest(format!(
            "Password must have at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }

    let name = request
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::InvalidRequest("Name is required".to_string()))?
        .to_string();
    let country = request
        .country
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(String::from);

    let collection = db.collection::<User>(database::USERS);
    let existing = find_by_email(db, &email).await?;

    if matches!(&existing, Some(user) if user.verified) {
        return Err(AppError::Conflict("User already exists".to_string()));
    }

    let code = generate_otp();
    let code_hash = hash(&code, OTP_HASH_COST)?;
    let password_hash = hash(password, DEFAULT_COST)?;
    let expires = otp_expiry(config.otp_ttl_minutes);

    let user = match existing {
        // Unverified sign-up retried: refresh details and code, keep the OMID
        Some(mut user) => {
            collection
                .update_one(
                    doc! { "omid": &user.omid },
                    doc! { "$set": {
                        "password": &password_hash,
                        "name": &name,
                        "country": country.clone(),
                        "verification_code": &code_hash,
                        "verification_expires": expires,
                        "verification_attempts": 0,
                    }},
                )
                .await?;
            user.name = name;
            user.country = country;
            user
        }
        None => {
            let user = User {
                id: None,
                omid: generate_omid(),
                email: email.clone(),
                password: Some(password_hash),
                name,
                image: None,
                provider: PROVIDER_CREDENTIALS.to_string(),
                is_admin: false,
                country,
                verified: false,
                verification_code: Some(code_hash),
                verification_expires: Some(expires),
                verification_attempts: 0,
                created_at: BsonDateTime::now(),
            };
            collection.insert_one(&user).await.map_err(|e| {
                if database::is_duplicate_key(&e) {
                    AppError::Conflict("User already exists".to_string())
                } else {
                    AppError::from(e)
                }
            })?;
            log::info!("✅ User registered (pending verification): {} [{}]", email, user.omid);
            user
        }
    };

    send_otp(mailer, &user, &code, config.otp_ttl_minutes).await?;

    Ok(RegisterResponse {
        success: true,
        message: "Verification code sent".to_string(),
        email,
        expires_in_minutes: config.otp_ttl_minutes,
    })
}

pub async fn verify_otp(
    db: &MongoDB,
    settings: &JwtSettings,
    request: &VerifyOtpRequest,
) -> AppResult<AuthResponse> {
    let email = normalize_email(&request.email);
    let mut user = find_by_email(db, &email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if check_otp(&user, &request.code, BsonDateTime::now())? == OtpCheck::Mismatch {
        return Err(record_failed_otp(db, &user.omid).await?);
    }

    db.collection::<User>(database::USERS)
        .update_one(
            doc! { "omid": &user.omid },
            doc! {
                "$set": { "verified": true },
                "$unset": {
                    "verification_code": "",
                    "verification_expires": "",
                    "verification_attempts": "",
                },
            },
        )
        .await?;

    user.verified = true;
    user.verification_code = None;
    user.verification_expires = None;
    user.verification_attempts = 0;

    log::info!("✅ Email verified: {}", email);
    issue_tokens(&user, settings)
}

pub async fn resend_otp(
    db: &MongoDB,
    config: &AppConfig,
    mailer: &dyn Mailer,
    request: &ResendOtpRequest,
) -> AppResult<RegisterResponse> {
    let email = normalize_email(&request.email);
    let user = find_by_email(db, &email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if user.verified {
        return Err(AppError::InvalidRequest("Email is already verified".to_string()));
    }

    let code = generate_otp();
    let code_hash = hash(&code, OTP_HASH_COST)?;
    db.collection::<User>(database::USERS)
        .update_one(
            doc! { "omid": &user.omid },
            doc! { "$set": {
                "verification_code": code_hash,
                "verification_expires": otp_expiry(config.otp_ttl_minutes),
                "verification_attempts": 0,
            }},
        )
        .await?;

    send_otp(mailer, &user, &code, config.otp_ttl_minutes).await?;

    Ok(RegisterResponse {
        success: true,
        message: "Verification code sent".to_string(),
        email,
        expires_in_minutes: config.otp_ttl_minutes,
    })
}

pub async fn login(db: &MongoDB, settings: &JwtSettings, request: &LoginRequest) -> AppResult<AuthResponse> {
    let email = normalize_email(&request.email);
    let invalid = || AppError::Unauthorized("Invalid credentials".to_string());

    let user = find_by_email(db, &email).await?.ok_or_else(invalid)?;
    let stored_password = user.password.as_ref().ok_or_else(invalid)?;

    if !verify(&request.password, stored_password)? {
        return Err(invalid());
    }

    if !user.verified {
        return Err(AppError::Forbidden(
            "Email not verified. Check your inbox for the verification code".to_string(),
        ));
    }

    issue_tokens(&user, settings)
}

pub async fn refresh_token(
    db: &MongoDB,
    settings: &JwtSettings,
    request: &RefreshTokenRequest,
) -> AppResult<AuthResponse> {
    let claims = decode_token(&request.refresh_token, settings)?;
    if claims.token_type != TOKEN_REFRESH {
        return Err(AppError::Unauthorized("Not a refresh token".to_string()));
    }

    // Re-read the user so admin changes are reflected in the new token
    let user = find_by_omid(db, &claims.sub).await.map_err(|e| match e {
        AppError::NotFound(_) => AppError::Unauthorized("User no longer exists".to_string()),
        other => other,
    })?;

    issue_tokens(&user, settings)
}

pub async fn get_current_user(db: &MongoDB, omid: &str) -> AppResult<UserInfo> {
    Ok(UserInfo::from(find_by_omid(db, omid).await?))
}

pub async fn update_profile(db: &MongoDB, omid: &str, request: &UpdateProfileRequest) -> AppResult<UserInfo> {
    let mut set = Document::new();

    if let Some(name) = &request.name {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidRequest("Name cannot be empty".to_string()));
        }
        set.insert("name", name);
    }
    if let Some(country) = &request.country {
        set.insert("country", country.trim());
    }
    if let Some(image) = &request.image {
        set.insert("image", image.trim());
    }

    if set.is_empty() {
        return Err(AppError::InvalidRequest("Nothing to update".to_string()));
    }

    let result = db
        .collection::<User>(database::USERS)
        .update_one(doc! { "omid": omid }, doc! { "$set": set })
        .await?;
    if result.matched_count == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    get_current_user(db, omid).await
}

pub async fn upload_profile_image(
    db: &MongoDB,
    storage: &ObjectStorage,
    omid: &str,
    bytes: Vec<u8>,
    content_type: &str,
) -> AppResult<UserInfo> {
    if bytes.is_empty() {
        return Err(AppError::InvalidRequest("Image body is empty".to_string()));
    }
    if bytes.len() > storage_service::MAX_IMAGE_BYTES {
        return Err(AppError::InvalidRequest("Image exceeds 5 MiB".to_string()));
    }
    let extension = storage_service::image_extension(content_type)?;

    let key = format!("profiles/{}-{}.{}", omid, Uuid::new_v4().simple(), extension);
    let url = storage.put_object(&key, bytes, content_type).await?;

    update_profile(
        db,
        omid,
        &UpdateProfileRequest {
            name: None,
            country: None,
            image: Some(url),
        },
    )
    .await
}

/// Deletes the user and everything they own. Separate writes, no transaction.
pub async fn delete_user_account(db: &MongoDB, omid: &str) -> AppResult<()> {
    log::info!("🗑️ Deleting account for omid: {}", omid);

    let deleted = db
        .collection::<User>(database::USERS)
        .delete_one(doc! { "omid": omid })
        .await?;

    if deleted.deleted_count == 0 {
        return Err(AppError::NotFound(format!("User {} not found", omid)));
    }

    for (collection, field) in [
        (database::RATINGS, "user_id"),
        (database::RATING_HISTORY, "user_id"),
        (database::RANKINGS, "user_id"),
        (database::PLAYLISTS, "owner_id"),
    ] {
        let mut filter = Document::new();
        filter.insert(field, omid);
        let result = db
            .collection::<Document>(collection)
            .delete_many(filter)
            .await?;
        log::info!("✅ Deleted {} {} documents for {}", result.deleted_count, collection, omid);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> JwtSettings {
        AppConfig::for_tests().jwt
    }

    fn user() -> User {
        User {
            id: None,
            omid: "Q1W2E3R4T5Y6".to_string(),
            email: "listener@example.com".to_string(),
            password: None,
            name: "Listener".to_string(),
            image: None,
            provider: PROVIDER_CREDENTIALS.to_string(),
            is_admin: true,
            country: None,
            verified: false,
            verification_code: None,
            verification_expires: None,
            verification_attempts: 0,
            created_at: BsonDateTime::now(),
        }
    }

    #[test]
    fn test_access_token_roundtrip() {
        let tokens = issue_tokens(&user(), &settings()).unwrap();
        let claims = verify_token(&tokens.token, &settings()).unwrap();

        assert_eq!(claims.sub, "Q1W2E3R4T5Y6");
        assert_eq!(claims.email, "listener@example.com");
        assert!(claims.is_admin);
        assert_eq!(claims.token_type, TOKEN_ACCESS);
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let tokens = issue_tokens(&user(), &settings()).unwrap();
        assert!(verify_token(&tokens.refresh_token, &settings()).is_err());
        assert_eq!(decode_token(&tokens.refresh_token, &settings()).unwrap().token_type, TOKEN_REFRESH);
    }

    #[test]
    fn test_token_with_other_secret_is_rejected() {
        let tokens = issue_tokens(&user(), &settings()).unwrap();
        let mut other = settings();
        other.secret = "another-secret".to_string();
        assert!(matches!(verify_token(&tokens.token, &other), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_email_helpers() {
        assert_eq!(normalize_email("  Ana@Example.COM "), "ana@example.com");
        assert!(is_valid_email("ana@example.com"));
        assert!(!is_valid_email("ana@example"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("ana example@x.com"));
        assert!(!is_valid_email("ana@.com"));
    }

    #[test]
    fn test_check_otp() {
        let mut pending = user();
        pending.verification_code = Some(hash("123456", 4).unwrap());
        pending.verification_expires = Some(BsonDateTime::from_millis(10_000));

        let before = BsonDateTime::from_millis(5_000);
        let after = BsonDateTime::from_millis(10_001);

        assert_eq!(check_otp(&pending, "123456", before).unwrap(), OtpCheck::Valid);
        assert_eq!(check_otp(&pending, " 123456 ", before).unwrap(), OtpCheck::Valid);
        assert_eq!(check_otp(&pending, "654321", before).unwrap(), OtpCheck::Mismatch);
        assert!(check_otp(&pending, "123456", after).is_err());

        pending.verified = true;
        assert!(check_otp(&pending, "123456", before).is_err());
    }

    #[test]
    fn test_check_otp_locks_after_max_attempts() {
        let mut pending = user();
        pending.verification_code = Some(hash("123456", 4).unwrap());
        pending.verification_expires = Some(BsonDateTime::from_millis(10_000));
        let before = BsonDateTime::from_millis(5_000);

        pending.verification_attempts = MAX_OTP_ATTEMPTS - 1;
        assert_eq!(check_otp(&pending, "123456", before).unwrap(), OtpCheck::Valid);

        pending.verification_attempts = MAX_OTP_ATTEMPTS;
        let err = check_otp(&pending, "123456", before).unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(ref msg) if msg.starts_with("Too many")));
    }

    #[test]
    fn test_otp_expiry_is_bounded() {
        let now = Utc::now().timestamp_millis();
        let expires = otp_expiry(i64::MAX).timestamp_millis();
        assert!(expires <= now + MAX_OTP_TTL_MINUTES * 60_000 + 1_000);
        assert!(otp_expiry(10).timestamp_millis() > now);
    }

    #[test]
    fn test_check_otp_without_pending_code() {
        let err = check_otp(&user(), "123456", BsonDateTime::now()).unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }
}
