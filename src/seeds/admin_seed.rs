use crate::{config::AppConfig, database::{self, MongoDB}, services::auth_service};
use mongodb::bson::{doc, Document};

/// Grants the admin role to `ADMIN_EMAIL` if that account exists.
/// The account itself is created through normal registration.
pub async fn promote_configured_admin(db: &MongoDB, config: &AppConfig) {
    let Some(email) = config.admin_email.as_deref().map(auth_service::normalize_email) else {
        log::info!("👑 ADMIN_EMAIL not set, skipping admin seed");
        return;
    };

    let result = db
        .collection::<Document>(database::USERS)
        .update_one(doc! { "email": &email }, doc! { "$set": { "is_admin": true } })
        .await;

    match result {
        Ok(r) if r.matched_count == 0 => {
            log::warn!("⚠️  ADMIN_EMAIL {} has no account yet; it will be promoted on next startup", email)
        }
        Ok(r) if r.modified_count == 0 => log::info!("👑 {} is already an admin", email),
        Ok(_) => log::info!("👑 Promoted {} to admin", email),
        Err(e) => log::error!("❌ Failed to promote {}: {}", email, e),
    }
}
