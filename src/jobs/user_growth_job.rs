// ==================== USER GROWTH SNAPSHOT ====================
// Upserts today's cumulative user count into user_growth_history.
// Runs once at startup and then every hour; the upsert keeps one row per day.

use crate::{database::MongoDB, services::admin_service};
use chrono::Utc;
use tokio::time::{interval, Duration};

const CHECK_INTERVAL: Duration = Duration::from_secs(3600);

pub async fn start_user_growth_job(db: MongoDB) {
    log::info!("📅 Starting user growth job (runs every hour, one row per day)");

    tokio::spawn(async move {
        // The first tick fires immediately, covering the startup run
        let mut interval = interval(CHECK_INTERVAL);

        loop {
            interval.tick().await;
            record_today(&db).await;
        }
    });
}

async fn record_today(db: &MongoDB) {
    let today = Utc::now().date_naive();

    match admin_service::record_user_growth(db, today).await {
        Ok(entry) => log::debug!("📈 User growth {}: {} users", entry.date, entry.count),
        Err(e) => log::error!("❌ User growth snapshot failed for {}: {}", today, e),
    }
}
