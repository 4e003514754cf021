use crate::{
    database::{self, MongoDB},
    models::{User, UserGrowthEntry, UserInfo},
    services::{auth_service, rating_service::round_one_decimal},
    utils::{is_valid_omid, AppError, AppResult},
};
use chrono::NaiveDate;
use futures::stream::{StreamExt, TryStreamExt};
use mongodb::bson::{doc, DateTime as BsonDateTime, Document};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u64 = 25;
pub const MAX_PAGE_SIZE: u64 = 100;
pub const MAX_PAGE: u64 = 1_000_000;
const TOP_ALBUMS: i64 = 10;

#[derive(Debug, Serialize)]
pub struct UserPage {
    pub users: Vec<UserInfo>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

#[derive(Debug, Serialize, Default)]
pub struct Totals {
    pub users: u64,
    pub verified_users: u64,
    pub admins: u64,
    pub ratings: u64,
    pub playlists: u64,
    pub predefined_playlists: u64,
    pub rankings: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CountryCount {
    #[serde(rename = "_id")]
    pub country: Option<String>,
    pub count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TopAlbum {
    #[serde(rename = "_id")]
    pub album_id: String,
    pub album_name: Option<String>,
    pub artist_name: Option<String>,
    pub album_image: Option<String>,
    pub average: Option<f64>,
    pub ratings: i64,
}

#[derive(Debug, Serialize)]
pub struct Analytics {
    pub totals: Totals,
    pub user_growth: Vec<UserGrowthEntry>,
    pub users_by_country: Vec<CountryCount>,
    pub top_albums: Vec<TopAlbum>,
}

/// Page numbers start at 1.
pub fn page_bounds(page: Option<u64>, limit: Option<u64>) -> (u64, u64) {
    let page = page.unwrap_or(1).clamp(1, MAX_PAGE);
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    (page, limit)
}

pub fn page_skip(page: u64, limit: u64) -> u64 {
    page.saturating_sub(1).saturating_mul(limit)
}

pub async fn list_users(db: &MongoDB, page: Option<u64>, limit: Option<u64>) -> AppResult<UserPage> {
    let (page, limit) = page_bounds(page, limit);
    let collection = db.collection::<User>(database::USERS);

    let total = collection.count_documents(doc! {}).await?;
    let cursor = collection
        .find(doc! {})
        .sort(doc! { "created_at": -1 })
        .skip(page_skip(page, limit))
        .limit(limit as i64)
        .await?;
    let users: Vec<User> = cursor.try_collect().await?;

    Ok(UserPage {
        users: users.iter().map(UserInfo::from).collect(),
        total,
        page,
        limit,
    })
}

fn check_target(omid: &str) -> AppResult<()> {
    if !is_valid_omid(omid) {
        return Err(AppError::InvalidRequest(format!("Invalid OMID: {}", omid)));
    }
    Ok(())
}

pub async fn set_admin(db: &MongoDB, acting_omid: &str, target_omid: &str, is_admin: bool) -> AppResult<UserInfo> {
    check_target(target_omid)?;
    if acting_omid == target_omid && !is_admin {
        return Err(AppError::InvalidRequest("You cannot remove your own admin role".to_string()));
    }

    let result = db
        .collection::<User>(database::USERS)
        .update_one(doc! { "omid": target_omid }, doc! { "$set": { "is_admin": is_admin } })
        .await?;
    if result.matched_count == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    log::info!(
        "🛡️ {} {} admin role for {}",
        acting_omid,
        if is_admin { "granted" } else { "revoked" },
        target_omid
    );
    auth_service::get_current_user(db, target_omid).await
}

pub async fn delete_user(db: &MongoDB, acting_omid: &str, target_omid: &str) -> AppResult<()> {
    check_target(target_omid)?;
    if acting_omid == target_omid {
        return Err(AppError::InvalidRequest(
            "Use account deletion to remove your own account".to_string(),
        ));
    }
    auth_service::delete_user_account(db, target_omid).await
}

/// Exclusive upper bound (start of the next day, UTC) for users counted on `date`.
pub fn end_of_day(date: NaiveDate) -> BsonDateTime {
    let next = date.succ_opt().unwrap_or(date);
    let millis = next
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc().timestamp_millis())
        .unwrap_or_default();
    BsonDateTime::from_millis(millis)
}

/// Upserts the cumulative user count for `date`.
pub async fn record_user_growth(db: &MongoDB, date: NaiveDate) -> AppResult<UserGrowthEntry> {
    let count = db
        .collection::<User>(database::USERS)
        .count_documents(doc! { "created_at": { "$lt": end_of_day(date) } })
        .await?;

    let entry = UserGrowthEntry {
        date: date.format("%Y-%m-%d").to_string(),
        count: count as i64,
    };

    db.collection::<Document>(database::USER_GROWTH_HISTORY)
        .update_one(
            doc! { "date": &entry.date },
            doc! { "$set": { "count": entry.count, "updated_at": BsonDateTime::now() } },
        )
        .upsert(true)
        .await?;

    Ok(entry)
}

async fn aggregate_into<T: for<'de> Deserialize<'de>>(
    db: &MongoDB,
    collection: &str,
    pipeline: Vec<Document>,
) -> AppResult<Vec<T>> {
    let mut cursor = db.collection::<Document>(collection).aggregate(pipeline).await?;
    let mut rows = Vec::new();
    while let Some(result) = cursor.next().await {
        match mongodb::bson::from_document::<T>(result?) {
            Ok(row) => rows.push(row),
            Err(e) => log::warn!("⚠️  Skipping malformed aggregation row from {}: {}", collection, e),
        }
    }
    Ok(rows)
}

pub fn top_albums_pipeline() -> Vec<Document> {
    vec![
        doc! { "$match": { "average": { "$ne": null } } },
        doc! { "$group": {
            "_id": "$album_id",
            "album_name": { "$first": "$album_name" },
            "artist_name": { "$first": "$artist_name" },
            "album_image": { "$first": "$album_image" },
            "average": { "$avg": "$average" },
            "ratings": { "$sum": 1 },
        }},
        doc! { "$sort": { "average": -1, "ratings": -1, "_id": 1 } },
        doc! { "$limit": TOP_ALBUMS },
    ]
}

pub fn users_by_country_pipeline() -> Vec<Document> {
    vec![
        doc! { "$group": { "_id": "$country", "count": { "$sum": 1 } } },
        doc! { "$sort": { "count": -1, "_id": 1 } },
    ]
}

pub async fn analytics(db: &MongoDB) -> AppResult<Analytics> {
    let users = db.collection::<Document>(database::USERS);
    let playlists = db.collection::<Document>(database::PLAYLISTS);

    let totals = Totals {
        users: users.count_documents(doc! {}).await?,
        verified_users: users.count_documents(doc! { "verified": true }).await?,
        admins: users.count_documents(doc! { "is_admin": true }).await?,
        ratings: db.collection::<Document>(database::RATINGS).count_documents(doc! {}).await?,
        playlists: playlists.count_documents(doc! {}).await?,
        predefined_playlists: playlists.count_documents(doc! { "predefined": true }).await?,
        rankings: db.collection::<Document>(database::RANKINGS).count_documents(doc! {}).await?,
    };

    let user_growth: Vec<UserGrowthEntry> = db
        .collection::<UserGrowthEntry>(database::USER_GROWTH_HISTORY)
        .find(doc! {})
        .sort(doc! { "date": 1 })
        .await?
        .try_collect()
        .await?;

    let users_by_country = aggregate_into(db, database::USERS, users_by_country_pipeline()).await?;

    let mut top_albums: Vec<TopAlbum> = aggregate_into(db, database::RATINGS, top_albums_pipeline()).await?;
    for album in &mut top_albums {
        album.average = album.average.map(round_one_decimal);
    }

    Ok(Analytics {
        totals,
        user_growth,
        users_by_country,
        top_albums,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_bounds() {
        assert_eq!(page_bounds(None, None), (1, DEFAULT_PAGE_SIZE));
        assert_eq!(page_bounds(Some(0), Some(0)), (1, 1));
        assert_eq!(page_bounds(Some(3), Some(1_000)), (3, MAX_PAGE_SIZE));

        let (page, limit) = page_bounds(Some(u64::MAX), Some(100));
        assert_eq!(page, MAX_PAGE);
        assert_eq!(page_skip(page, limit), (MAX_PAGE - 1) * limit);
        assert_eq!(page_skip(u64::MAX, u64::MAX), u64::MAX);
        assert_eq!(page_skip(1, 50), 0);
    }

    #[test]
    fn test_check_target() {
        assert!(check_target("A1B2C3D4E5F6").is_ok());
        assert!(matches!(check_target("a1b2"), Err(AppError::InvalidRequest(_))));
    }

    #[test]
    fn test_end_of_day_is_next_midnight_utc() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 28).unwrap();
        let bound = end_of_day(date);
        assert_eq!(bound.try_to_rfc3339_string().unwrap(), "2024-02-29T00:00:00Z");
    }

    #[test]
    fn test_top_albums_pipeline_ignores_blank_averages() {
        let pipeline = top_albums_pipeline();
        let first = pipeline[0].get_document("$match").unwrap();
        assert!(first.get_document("average").unwrap().contains_key("$ne"));
        assert_eq!(pipeline.last().unwrap().get_i64("$limit").unwrap(), TOP_ALBUMS);
    }

    #[test]
    fn test_country_row_decodes_missing_country() {
        let row: CountryCount = mongodb::bson::from_document(doc! { "_id": null, "count": 4 }).unwrap();
        assert!(row.country.is_none());
        assert_eq!(row.count, 4);
    }
}
