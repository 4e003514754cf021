use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::to_rfc3339;
use crate::utils::AppError;

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 10.0;

/// A user's per-track scores for one album (`ratings` collection).
/// Mutated in place on edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rating {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: String,
    pub album_id: String,
    pub album_name: String,
    pub artist_name: String,
    pub artist_id: Option<String>,
    pub album_image: Option<String>,
    /// Track id -> score; `None` marks a blank entry
    pub ratings: BTreeMap<String, Option<f64>>,
    pub average: Option<f64>,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

/// One point of the album's average over time (`rating_history`, append-only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingHistoryEntry {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: String,
    pub album_id: String,
    pub date: BsonDateTime,
    pub average: Option<f64>,
}

/// Score as sent by the client form: a number, a numeric string, an empty
/// string or null. Anything blank counts as "not rated".
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(untagged)]
pub enum ScoreInput {
    Number(f64),
    Text(String),
    Blank,
}

impl ScoreInput {
    pub fn to_score(&self, track_id: &str) -> Result<Option<f64>, AppError> {
        let value = match self {
            ScoreInput::Number(n) => Some(*n),
            ScoreInput::Text(s) if s.trim().is_empty() => None,
            ScoreInput::Text(s) => Some(s.trim().parse::<f64>().map_err(|_| {
                AppError::InvalidRequest(format!("Score for track {} is not a number", track_id))
            })?),
            ScoreInput::Blank => None,
        };

        match value {
            Some(v) if !v.is_finite() || !(MIN_SCORE..=MAX_SCORE).contains(&v) => {
                Err(AppError::InvalidRequest(format!(
                    "Score for track {} must be between {} and {}",
                    track_id, MIN_SCORE, MAX_SCORE
                )))
            }
            other => Ok(other),
        }
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SubmitRatingRequest {
    pub album_id: String,
    pub album_name: String,
    pub artist_name: String,
    pub artist_id: Option<String>,
    pub album_image: Option<String>,
    pub ratings: BTreeMap<String, ScoreInput>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRatingRequest {
    pub ratings: BTreeMap<String, ScoreInput>,
}

#[derive(Debug, Serialize)]
pub struct RatingResponse {
    pub id: String,
    pub album_id: String,
    pub album_name: String,
    pub artist_name: String,
    pub artist_id: Option<String>,
    pub album_image: Option<String>,
    pub ratings: BTreeMap<String, Option<f64>>,
    pub average: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Rating> for RatingResponse {
    fn from(rating: Rating) -> Self {
        RatingResponse {
            id: rating.id.map(|id| id.to_hex()).unwrap_or_default(),
            created_at: to_rfc3339(&rating.created_at),
            updated_at: to_rfc3339(&rating.updated_at),
            album_id: rating.album_id,
            album_name: rating.album_name,
            artist_name: rating.artist_name,
            artist_id: rating.artist_id,
            album_image: rating.album_image,
            ratings: rating.ratings,
            average: rating.average,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryPoint {
    pub date: String,
    pub timestamp: i64,
    pub average: Option<f64>,
}

impl From<RatingHistoryEntry> for HistoryPoint {
    fn from(entry: RatingHistoryEntry) -> Self {
        HistoryPoint {
            date: to_rfc3339(&entry.date),
            timestamp: entry.date.timestamp_millis(),
            average: entry.average,
        }
    }
}
