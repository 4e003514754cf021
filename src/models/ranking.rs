use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::to_rfc3339;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RankingKind {
    Albums,
    Tracks,
}

impl RankingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RankingKind::Albums => "albums",
            RankingKind::Tracks => "tracks",
        }
    }
}

impl fmt::Display for RankingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RankingKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "albums" => Ok(RankingKind::Albums),
            "tracks" => Ok(RankingKind::Tracks),
            other => Err(format!("Unknown ranking type: {}. Supported: albums, tracks", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RankedItem {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Drag-and-drop ordering submitted by a user. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ranking {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: String,
    pub list_type: RankingKind,
    /// Position 0 is the top of the list
    pub items: Vec<RankedItem>,
    pub created_at: BsonDateTime,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SubmitRankingRequest {
    pub list_type: RankingKind,
    pub items: Vec<RankedItem>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RankingResponse {
    pub id: String,
    pub list_type: RankingKind,
    pub items: Vec<RankedItem>,
    pub created_at: String,
}

impl From<Ranking> for RankingResponse {
    fn from(ranking: Ranking) -> Self {
        RankingResponse {
            id: ranking.id.map(|id| id.to_hex()).unwrap_or_default(),
            created_at: to_rfc3339(&ranking.created_at),
            list_type: ranking.list_type,
            items: ranking.items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranking_kind_parsing() {
        assert_eq!("albums".parse::<RankingKind>().unwrap(), RankingKind::Albums);
        assert_eq!("Tracks".parse::<RankingKind>().unwrap(), RankingKind::Tracks);
        assert!("artists".parse::<RankingKind>().is_err());
    }

    #[test]
    fn test_ranking_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&RankingKind::Albums).unwrap(), "\"albums\"");
        let kind: RankingKind = serde_json::from_str("\"tracks\"").unwrap();
        assert_eq!(kind, RankingKind::Tracks);
    }
}
