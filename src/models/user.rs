use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

use super::to_rfc3339;

pub const PROVIDER_CREDENTIALS: &str = "credentials";

/// Account stored in the `users` collection.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    /// Application identifier, exposed to clients and used as JWT subject
    pub omid: String,
    pub email: String,
    /// bcrypt hash
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub name: String,
    pub image: Option<String>,
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub is_admin: bool,
    pub country: Option<String>,
    #[serde(default)]
    pub verified: bool,
    /// bcrypt hash of the pending OTP
    pub verification_code: Option<String>,
    pub verification_expires: Option<BsonDateTime>,
    /// Wrong codes submitted against the pending OTP
    #[serde(default)]
    pub verification_attempts: i32,
    pub created_at: BsonDateTime,
}

fn default_provider() -> String {
    PROVIDER_CREDENTIALS.to_string()
}

/// Public view of a user; never carries secrets.
#[derive(Debug, Serialize, Clone, utoipa::ToSchema)]
pub struct UserInfo {
    pub omid: String,
    pub email: String,
    pub name: String,
    pub image: Option<String>,
    pub country: Option<String>,
    pub provider: String,
    pub is_admin: bool,
    pub verified: bool,
    pub created_at: String,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        UserInfo {
            omid: user.omid.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            image: user.image.clone(),
            country: user.country.clone(),
            provider: user.provider.clone(),
            is_admin: user.is_admin,
            verified: user.verified,
            created_at: to_rfc3339(&user.created_at),
        }
    }
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        UserInfo::from(&user)
    }
}

/// Daily snapshot of the registered-user count (`user_growth_history`).
#[derive(Debug, Serialize, Deserialize, Clone, utoipa::ToSchema)]
pub struct UserGrowthEntry {
    /// `YYYY-MM-DD`
    pub date: String,
    /// Users registered up to the end of `date`
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_info_omits_secrets() {
        let user = User {
            id: None,
            omid: "A1B2C3D4E5F6".to_string(),
            email: "listener@example.com".to_string(),
            password: Some("$2b$12$hash".to_string()),
            name: "Listener".to_string(),
            image: None,
            provider: PROVIDER_CREDENTIALS.to_string(),
            is_admin: false,
            country: Some("BR".to_string()),
            verified: true,
            verification_code: Some("$2b$12$otp".to_string()),
            verification_expires: None,
            verification_attempts: 0,
            created_at: BsonDateTime::from_millis(0),
        };

        let json = serde_json::to_value(UserInfo::from(&user)).unwrap();
        assert_eq!(json["omid"], "A1B2C3D4E5F6");
        assert_eq!(json["created_at"], "1970-01-01T00:00:00Z");
        assert!(json.get("password").is_none());
        assert!(json.get("verification_code").is_none());
    }

    #[test]
    fn test_legacy_document_defaults() {
        let doc = mongodb::bson::doc! {
            "omid": "ZZZZZZZZZZZZ",
            "email": "old@example.com",
            "name": "Old",
            "created_at": BsonDateTime::from_millis(1_000),
        };
        let user: User = mongodb::bson::from_document(doc).unwrap();

        assert_eq!(user.provider, PROVIDER_CREDENTIALS);
        assert!(!user.is_admin);
        assert!(!user.verified);
        assert!(user.password.is_none());
    }
}
