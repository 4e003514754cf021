use serde::{Deserialize, Serialize};

use crate::config::GeniusSettings;
use crate::utils::{http, AppError, AppResult};

#[derive(Debug, Deserialize)]
struct GeniusEnvelope<T> {
    response: T,
}

#[derive(Debug, Deserialize)]
struct SearchPayload {
    #[serde(default)]
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "type")]
    kind: String,
    result: GeniusSong,
}

#[derive(Debug, Deserialize)]
struct GeniusArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GeniusSong {
    id: u64,
    title: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    song_art_image_thumbnail_url: Option<String>,
    #[serde(default)]
    primary_artist: Option<GeniusArtist>,
    #[serde(default)]
    release_date_for_display: Option<String>,
    #[serde(default)]
    album: Option<GeniusAlbum>,
    #[serde(default)]
    writer_artists: Vec<GeniusArtist>,
    #[serde(default)]
    producer_artists: Vec<GeniusArtist>,
    #[serde(default)]
    custom_performances: Vec<CustomPerformance>,
}

#[derive(Debug, Deserialize)]
struct GeniusAlbum {
    name: String,
}

#[derive(Debug, Deserialize)]
struct CustomPerformance {
    label: String,
    #[serde(default)]
    artists: Vec<GeniusArtist>,
}

#[derive(Debug, Deserialize)]
struct SongPayload {
    song: GeniusSong,
}

#[derive(Debug, Clone, Serialize)]
pub struct LyricsHit {
    pub id: u64,
    pub title: String,
    pub artist: Option<String>,
    /// Genius page holding the lyrics
    pub url: Option<String>,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreditRole {
    pub label: String,
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SongCredits {
    pub id: u64,
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub release_date: Option<String>,
    pub url: Option<String>,
    pub writers: Vec<String>,
    pub producers: Vec<String>,
    pub other_credits: Vec<CreditRole>,
}

fn names(artists: Vec<GeniusArtist>) -> Vec<String> {
    artists.into_iter().map(|a| a.name).collect()
}

impl From<GeniusSong> for LyricsHit {
    fn from(song: GeniusSong) -> Self {
        LyricsHit {
            id: song.id,
            title: song.title,
            artist: song.primary_artist.map(|a| a.name),
            url: song.url,
            thumbnail: song.song_art_image_thumbnail_url,
        }
    }
}

impl From<GeniusSong> for SongCredits {
    fn from(song: GeniusSong) -> Self {
        SongCredits {
            id: song.id,
            title: song.title,
            artist: song.primary_artist.map(|a| a.name),
            album: song.album.map(|a| a.name),
            release_date: song.release_date_for_display,
            url: song.url,
            writers: names(song.writer_artists),
            producers: names(song.producer_artists),
            other_credits: song
                .custom_performances
                .into_iter()
                .map(|p| CreditRole {
                    label: p.label,
                    names: names(p.artists),
                })
                .collect(),
        }
    }
}

/// Genius API client (lyrics pages and song credits). Bearer token auth.
pub struct GeniusClient {
    settings: GeniusSettings,
}

impl GeniusClient {
    pub fn new(settings: GeniusSettings) -> Self {
        Self { settings }
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str, query: &[(&str, &str)]) -> AppResult<T> {
        if self.settings.access_token.is_empty() {
            return Err(AppError::ConfigError("GENIUS_ACCESS_TOKEN not configured".to_string()));
        }

        let url = format!("{}{}", self.settings.api_url.trim_end_matches('/'), path);
        let response = http::client()
            .get(&url)
            .bearer_auth(&self.settings.access_token)
            .header("Accept", "application/json")
            .query(query)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound("Song not found on Genius".to_string()));
        }
        if !response.status().is_success() {
            return Err(AppError::ExternalError(format!("Genius API error: {}", response.status())));
        }

        let envelope: GeniusEnvelope<T> = response.json().await?;
        Ok(envelope.response)
    }

    pub async fn search(&self, query: &str) -> AppResult<Vec<LyricsHit>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidRequest("Search query is required".to_string()));
        }

        log::info!("📝 Genius search: '{}'", query);

        let payload: SearchPayload = self.get("/search", &[("q", query)]).await?;
        Ok(songs_from_hits(payload.hits))
    }

    pub async fn song_credits(&self, song_id: u64) -> AppResult<SongCredits> {
        log::info!("📝 Genius song credits: {}", song_id);

        let payload: SongPayload = self
            .get(&format!("/songs/{}", song_id), &[("text_format", "plain")])
            .await?;
        Ok(SongCredits::from(payload.song))
    }
}

fn songs_from_hits(hits: Vec<SearchHit>) -> Vec<LyricsHit> {
    hits.into_iter()
        .filter(|hit| hit.kind == "song")
        .map(|hit| LyricsHit::from(hit.result))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_keeps_only_songs() {
        let json = serde_json::json!({
            "response": {
                "hits": [
                    {"type": "song", "result": {
                        "id": 378195, "title": "Águas de Março",
                        "url": "https://genius.com/Elis-regina-aguas-de-marco-lyrics",
                        "song_art_image_thumbnail_url": "https://images.genius.com/thumb.jpg",
                        "primary_artist": {"id": 1, "name": "Elis Regina"}
                    }},
                    {"type": "album", "result": {"id": 9, "title": "Elis & Tom"}}
                ]
            }
        });

        let envelope: GeniusEnvelope<SearchPayload> = serde_json::from_value(json).unwrap();
        let hits = songs_from_hits(envelope.response.hits);

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].artist.as_deref(), Some("Elis Regina"));
        assert_eq!(hits[0].id, 378195);
    }

    #[test]
    fn test_song_credits_mapping() {
        let json = serde_json::json!({
            "id": 1,
            "title": "Song",
            "album": {"id": 2, "name": "Record"},
            "release_date_for_display": "March 1, 1974",
            "writer_artists": [{"id": 3, "name": "Tom Jobim"}],
            "producer_artists": [{"id": 4, "name": "Aloysio de Oliveira"}],
            "custom_performances": [
                {"label": "Arranger", "artists": [{"id": 5, "name": "César Camargo Mariano"}]}
            ]
        });

        let song: GeniusSong = serde_json::from_value(json).unwrap();
        let credits = SongCredits::from(song);

        assert_eq!(credits.album.as_deref(), Some("Record"));
        assert_eq!(credits.writers, vec!["Tom Jobim".to_string()]);
        assert_eq!(credits.producers, vec!["Aloysio de Oliveira".to_string()]);
        assert_eq!(credits.other_credits[0].label, "Arranger");
        assert!(credits.artist.is_none());
    }
}
