use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

use super::to_rfc3339;

/// Catalog playlist linked by a user, or curated by an admin (`predefined`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playlist {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub spotify_id: String,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub external_url: Option<String>,
    /// Absent for predefined playlists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub predefined: bool,
    pub created_at: BsonDateTime,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LinkPlaylistRequest {
    /// Playlist id, `spotify:playlist:` URI or open.spotify.com link
    pub playlist: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct PlaylistResponse {
    pub id: String,
    pub spotify_id: String,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub external_url: Option<String>,
    pub owner_id: Option<String>,
    pub predefined: bool,
    pub created_at: String,
}

impl From<Playlist> for PlaylistResponse {
    fn from(playlist: Playlist) -> Self {
        PlaylistResponse {
            id: playlist.id.map(|id| id.to_hex()).unwrap_or_default(),
            created_at: to_rfc3339(&playlist.created_at),
            spotify_id: playlist.spotify_id,
            name: playlist.name,
            description: playlist.description,
            image: playlist.image,
            external_url: playlist.external_url,
            owner_id: playlist.owner_id,
            predefined: playlist.predefined,
        }
    }
}
