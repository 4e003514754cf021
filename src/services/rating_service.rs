use crate::{
    database::{self, MongoDB},
    models::{Rating, RatingHistoryEntry, ScoreInput, SubmitRatingRequest, UpdateRatingRequest},
    utils::{AppError, AppResult},
};
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, DateTime as BsonDateTime};
use mongodb::options::ReturnDocument;
use std::collections::BTreeMap;

/// Mean of the non-blank scores, rounded to one decimal. `None` when every
/// entry is blank (or there are none).
pub fn compute_average(scores: &BTreeMap<String, Option<f64>>) -> Option<f64> {
    let valid: Vec<f64> = scores.values().filter_map(|s| *s).collect();
    if valid.is_empty() {
        return None;
    }

    let mean = valid.iter().sum::<f64>() / valid.len() as f64;
    Some(round_one_decimal(mean))
}

pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Validates every score. With `require_all`, blank entries are rejected too.
pub fn normalize_scores(
    input: &BTreeMap<String, ScoreInput>,
    require_all: bool,
) -> AppResult<BTreeMap<String, Option<f64>>> {
    if input.is_empty() {
        return Err(AppError::InvalidRequest("At least one track rating is required".to_string()));
    }

    let mut scores = BTreeMap::new();
    for (track_id, raw) in input {
        if track_id.trim().is_empty() {
            return Err(AppError::InvalidRequest("Track id cannot be empty".to_string()));
        }
        let score = raw.to_score(track_id)?;
        if require_all && score.is_none() {
            return Err(AppError::InvalidRequest("All tracks must be rated".to_string()));
        }
        scores.insert(track_id.clone(), score);
    }

    Ok(scores)
}

fn required(field: &str, value: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidRequest(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

async fn append_history(db: &MongoDB, user_id: &str, album_id: &str, average: Option<f64>, date: BsonDateTime) {
    let entry = RatingHistoryEntry {
        id: None,
        user_id: user_id.to_string(),
        album_id: album_id.to_string(),
        date,
        average,
    };

    // Independent of the rating write; a failure here leaves the rating in place
    if let Err(e) = db
        .collection::<RatingHistoryEntry>(database::RATING_HISTORY)
        .insert_one(&entry)
        .await
    {
        log::error!("❌ Failed to append rating history for {}/{}: {}", user_id, album_id, e);
    }
}

pub async fn submit_rating(db: &MongoDB, user_id: &str, request: &SubmitRatingRequest) -> AppResult<Rating> {
    let album_id = required("album_id", &request.album_id)?;
    let album_name = required("album_name", &request.album_name)?;
    let artist_name = required("artist_name", &request.artist_name)?;
    let scores = normalize_scores(&request.ratings, true)?;

    let collection = db.collection::<Rating>(database::RATINGS);

    if collection
        .find_one(doc! { "user_id": user_id, "album_id": &album_id })
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("Album already rated. Edit the existing rating".to_string()));
    }

    let now = BsonDateTime::now();
    let mut rating = Rating {
        id: None,
        user_id: user_id.to_string(),
        album_id,
        album_name,
        artist_name,
        artist_id: request.artist_id.clone().filter(|id| !id.trim().is_empty()),
        album_image: request.album_image.clone(),
        average: compute_average(&scores),
        ratings: scores,
        created_at: now,
        updated_at: now,
    };

    let inserted = collection.insert_one(&rating).await.map_err(|e| {
        if database::is_duplicate_key(&e) {
            AppError::Conflict("Album already rated. Edit the existing rating".to_string())
        } else {
            AppError::from(e)
        }
    })?;
    rating.id = inserted.inserted_id.as_object_id();

    append_history(db, user_id, &rating.album_id, rating.average, now).await;

    log::info!(
        "⭐ Rating saved: user {} album {} average {:?}",
        user_id, rating.album_id, rating.average
    );
    Ok(rating)
}

/// Replaces the whole score map; scores from the previous version do not carry over.
pub async fn update_rating(
    db: &MongoDB,
    user_id: &str,
    album_id: &str,
    request: &UpdateRatingRequest,
) -> AppResult<Rating> {
    let scores = normalize_scores(&request.ratings, false)?;
    let average = compute_average(&scores);
    let now = BsonDateTime::now();

    let updated = db
        .collection::<Rating>(database::RATINGS)
        .find_one_and_update(
            doc! { "user_id": user_id, "album_id": album_id },
            doc! { "$set": {
                "ratings": mongodb::bson::to_bson(&scores)?,
                "average": average,
                "updated_at": now,
            }},
        )
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::NotFound("Rating not found".to_string()))?;

    append_history(db, user_id, album_id, average, now).await;

    log::info!("⭐ Rating updated: user {} album {} average {:?}", user_id, album_id, average);
    Ok(updated)
}

pub async fn get_rating(db: &MongoDB, user_id: &str, album_id: &str) -> AppResult<Rating> {
    db.collection::<Rating>(database::RATINGS)
        .find_one(doc! { "user_id": user_id, "album_id": album_id })
        .await?
        .ok_or_else(|| AppError::NotFound("Rating not found".to_string()))
}

/// Most recently edited first.
pub async fn list_ratings(db: &MongoDB, user_id: &str) -> AppResult<Vec<Rating>> {
    let cursor = db
        .collection::<Rating>(database::RATINGS)
        .find(doc! { "user_id": user_id })
        .sort(doc! { "updated_at": -1 })
        .await?;

    Ok(cursor.try_collect().await?)
}

pub async fn delete_rating(db: &MongoDB, user_id: &str, album_id: &str) -> AppResult<()> {
    let result = db
        .collection::<Rating>(database::RATINGS)
        .delete_one(doc! { "user_id": user_id, "album_id": album_id })
        .await?;

    if result.deleted_count == 0 {
        return Err(AppError::NotFound("Rating not found".to_string()));
    }

    let history = db
        .collection::<RatingHistoryEntry>(database::RATING_HISTORY)
        .delete_many(doc! { "user_id": user_id, "album_id": album_id })
        .await?;
    log::info!("🗑️ Rating {} removed with {} history entries", album_id, history.deleted_count);

    Ok(())
}

/// Oldest first, ready for charting.
pub async fn get_history(db: &MongoDB, user_id: &str, album_id: &str) -> AppResult<Vec<RatingHistoryEntry>> {
    let cursor = db
        .collection::<RatingHistoryEntry>(database::RATING_HISTORY)
        .find(doc! { "user_id": user_id, "album_id": album_id })
        .sort(doc! { "date": 1 })
        .await?;

    Ok(cursor.try_collect().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(values: &[(&str, Option<f64>)]) -> BTreeMap<String, Option<f64>> {
        values.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn inputs(json: &str) -> BTreeMap<String, ScoreInput> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_average_is_mean_of_non_blank() {
        let s = scores(&[("a", Some(8.0)), ("b", Some(6.0)), ("c", None), ("d", Some(7.0))]);
        assert_eq!(compute_average(&s), Some(7.0));
    }

    #[test]
    fn test_average_rounds_to_one_decimal() {
        // 25 / 3 = 8.333...
        let s = scores(&[("a", Some(8.0)), ("b", Some(8.0)), ("c", Some(9.0))]);
        assert_eq!(compute_average(&s), Some(8.3));

        // 26 / 3 = 8.666...
        let s = scores(&[("a", Some(8.0)), ("b", Some(9.0)), ("c", Some(9.0))]);
        assert_eq!(compute_average(&s), Some(8.7));

        let s = scores(&[("a", Some(7.25)), ("b", Some(7.25))]);
        assert_eq!(compute_average(&s), Some(7.3));
    }

    #[test]
    fn test_average_all_blank_is_none() {
        assert_eq!(compute_average(&scores(&[("a", None), ("b", None)])), None);
        assert_eq!(compute_average(&BTreeMap::new()), None);
    }

    #[test]
    fn test_average_bounds() {
        assert_eq!(compute_average(&scores(&[("a", Some(0.0))])), Some(0.0));
        assert_eq!(compute_average(&scores(&[("a", Some(10.0)), ("b", Some(10.0))])), Some(10.0));
    }

    #[test]
    fn test_submit_requires_every_track() {
        let err = normalize_scores(&inputs(r#"{"t1": 7, "t2": ""}"#), true).unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(ref m) if m == "All tracks must be rated"));

        let ok = normalize_scores(&inputs(r#"{"t1": 7, "t2": "9"}"#), true).unwrap();
        assert_eq!(ok["t2"], Some(9.0));
    }

    #[test]
    fn test_update_allows_blanks() {
        let normalized = normalize_scores(&inputs(r#"{"t1": 7, "t2": null, "t3": ""}"#), false).unwrap();
        assert_eq!(normalized.len(), 3);
        assert_eq!(compute_average(&normalized), Some(7.0));
    }

    #[test]
    fn test_empty_or_invalid_maps_rejected() {
        assert!(normalize_scores(&BTreeMap::new(), false).is_err());
        assert!(normalize_scores(&inputs(r#"{"t1": 12}"#), false).is_err());
        assert!(normalize_scores(&inputs(r#"{" ": 5}"#), false).is_err());
    }

    #[test]
    fn test_edit_replaces_previous_scores() {
        let first = normalize_scores(&inputs(r#"{"t1": 2, "t2": 4}"#), true).unwrap();
        assert_eq!(compute_average(&first), Some(3.0));

        let edited = normalize_scores(&inputs(r#"{"t1": 9, "t2": ""}"#), false).unwrap();
        assert_eq!(compute_average(&edited), Some(9.0));
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_submit_then_update_overwrites() {
        dotenv::dotenv().ok();
        let uri = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "mongodb://localhost:27017/musical_odyssey_test".to_string());
        let db = MongoDB::new(&uri).await.unwrap();

        let user_id = crate::utils::generate_omid();
        let submit = SubmitRatingRequest {
            album_id: "test-album".to_string(),
            album_name: "Test Album".to_string(),
            artist_name: "Test Artist".to_string(),
            artist_id: None,
            album_image: None,
            ratings: inputs(r#"{"t1": 4, "t2": 6}"#),
        };
        let created = submit_rating(&db, &user_id, &submit).await.unwrap();
        assert_eq!(created.average, Some(5.0));

        let duplicate = submit_rating(&db, &user_id, &submit).await.unwrap_err();
        assert!(matches!(duplicate, AppError::Conflict(_)));

        let update = UpdateRatingRequest {
            ratings: inputs(r#"{"t1": 10, "t2": null}"#),
        };
        let updated = update_rating(&db, &user_id, "test-album", &update).await.unwrap();
        assert_eq!(updated.average, Some(10.0));
        assert_eq!(updated.ratings.get("t2"), Some(&None));

        let history = get_history(&db, &user_id, "test-album").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].average, Some(10.0));

        delete_rating(&db, &user_id, "test-album").await.unwrap();
        assert!(get_history(&db, &user_id, "test-album").await.unwrap().is_empty());
    }
}
