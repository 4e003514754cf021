use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::config::SpotifySettings;
use crate::utils::{http, AppError, AppResult};

/// Refresh the catalog token this long before Spotify says it expires.
const TOKEN_EXPIRY_MARGIN_SECS: u64 = 60;
const ARTISTS_BATCH_SIZE: usize = 50;
pub const MAX_SEARCH_LIMIT: u32 = 50;

// ==================== Spotify wire types ====================

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Debug, Deserialize)]
struct SpotifyImage {
    url: String,
}

#[derive(Debug, Default, Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SpotifyArtistRef {
    id: Option<String>,
    name: String,
}

#[derive(Debug, Deserialize)]
struct SpotifyAlbum {
    id: String,
    name: String,
    #[serde(default)]
    album_type: Option<String>,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    total_tracks: Option<u32>,
    #[serde(default)]
    images: Vec<SpotifyImage>,
    #[serde(default)]
    artists: Vec<SpotifyArtistRef>,
    #[serde(default)]
    external_urls: ExternalUrls,
    // Only present on the full album object
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    genres: Vec<String>,
    #[serde(default)]
    popularity: Option<u32>,
    #[serde(default)]
    tracks: Option<Paging<SpotifyTrack>>,
}

#[derive(Debug, Deserialize)]
struct Paging<T> {
    items: Vec<T>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SpotifyTrack {
    id: Option<String>,
    name: String,
    #[serde(default)]
    track_number: u32,
    #[serde(default = "default_disc")]
    disc_number: u32,
    #[serde(default)]
    duration_ms: u64,
    #[serde(default)]
    explicit: bool,
    #[serde(default)]
    preview_url: Option<String>,
    #[serde(default)]
    artists: Vec<SpotifyArtistRef>,
}

fn default_disc() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    albums: Option<Paging<SpotifyAlbum>>,
}

#[derive(Debug, Deserialize)]
struct SpotifyPlaylist {
    id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    images: Option<Vec<SpotifyImage>>,
    #[serde(default)]
    external_urls: ExternalUrls,
    #[serde(default)]
    owner: Option<PlaylistOwner>,
    #[serde(default)]
    tracks: Option<PlaylistTracksRef>,
}

#[derive(Debug, Deserialize)]
struct PlaylistOwner {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistTracksRef {
    total: u32,
}

#[derive(Debug, Deserialize)]
struct SpotifyArtist {
    id: String,
    name: String,
    #[serde(default)]
    genres: Vec<String>,
    #[serde(default)]
    popularity: Option<u32>,
    #[serde(default)]
    followers: Option<Followers>,
    #[serde(default)]
    images: Vec<SpotifyImage>,
}

#[derive(Debug, Deserialize)]
struct Followers {
    total: u64,
}

#[derive(Debug, Deserialize)]
struct ArtistsResponse {
    artists: Vec<Option<SpotifyArtist>>,
}

// ==================== API types ====================

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct ArtistRef {
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct AlbumSummary {
    pub id: String,
    pub name: String,
    pub album_type: Option<String>,
    pub artists: Vec<ArtistRef>,
    /// Artists joined with ", " as shown on album cards
    pub artist_name: String,
    pub release_date: Option<String>,
    pub total_tracks: Option<u32>,
    pub image: Option<String>,
    pub external_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackInfo {
    pub id: String,
    pub name: String,
    pub track_number: u32,
    pub disc_number: u32,
    pub duration_ms: u64,
    pub explicit: bool,
    pub preview_url: Option<String>,
    pub artists: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlbumDetails {
    #[serde(flatten)]
    pub summary: AlbumSummary,
    pub label: Option<String>,
    pub genres: Vec<String>,
    pub popularity: Option<u32>,
    pub tracks: Vec<TrackInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaylistInfo {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub external_url: Option<String>,
    pub owner_name: Option<String>,
    pub total_tracks: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtistInfo {
    pub id: String,
    pub name: String,
    pub image: Option<String>,
    pub genres: Vec<String>,
    pub popularity: Option<u32>,
    pub followers: Option<u64>,
}

impl From<SpotifyAlbum> for AlbumSummary {
    fn from(album: SpotifyAlbum) -> Self {
        let artist_name = album
            .artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        AlbumSummary {
            id: album.id,
            name: album.name,
            album_type: album.album_type,
            artists: album
                .artists
                .into_iter()
                .map(|a| ArtistRef { id: a.id, name: a.name })
                .collect(),
            artist_name,
            release_date: album.release_date,
            total_tracks: album.total_tracks,
            image: album.images.into_iter().next().map(|i| i.url),
            external_url: album.external_urls.spotify,
        }
    }
}

fn track_info(track: SpotifyTrack) -> Option<TrackInfo> {
    // Local files have no catalog id and cannot be rated
    let id = track.id?;
    Some(TrackInfo {
        id,
        name: track.name,
        track_number: track.track_number,
        disc_number: track.disc_number,
        duration_ms: track.duration_ms,
        explicit: track.explicit,
        preview_url: track.preview_url,
        artists: track.artists.into_iter().map(|a| a.name).collect(),
    })
}

impl From<SpotifyPlaylist> for PlaylistInfo {
    fn from(playlist: SpotifyPlaylist) -> Self {
        PlaylistInfo {
            id: playlist.id,
            name: playlist.name,
            description: playlist.description.filter(|d| !d.is_empty()),
            image: playlist
                .images
                .and_then(|images| images.into_iter().next())
                .map(|i| i.url),
            external_url: playlist.external_urls.spotify,
            owner_name: playlist.owner.and_then(|o| o.display_name),
            total_tracks: playlist.tracks.map(|t| t.total),
        }
    }
}

impl From<SpotifyArtist> for ArtistInfo {
    fn from(artist: SpotifyArtist) -> Self {
        ArtistInfo {
            id: artist.id,
            name: artist.name,
            image: artist.images.into_iter().next().map(|i| i.url),
            genres: artist.genres,
            popularity: artist.popularity,
            followers: artist.followers.map(|f| f.total),
        }
    }
}

/// Extracts a playlist id from a raw id, a `spotify:playlist:` URI or an
/// `open.spotify.com/playlist/...` link.
pub fn parse_playlist_id(input: &str) -> AppResult<String> {
    let trimmed = input.trim();

    let candidate = if let Some(rest) = trimmed.strip_prefix("spotify:playlist:") {
        rest
    } else if let Some(pos) = trimmed.find("/playlist/") {
        let rest = &trimmed[pos + "/playlist/".len()..];
        rest.split(['?', '/', '#']).next().unwrap_or("")
    } else {
        trimmed
    };

    if candidate.is_empty() || !candidate.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AppError::InvalidRequest(format!(
            "'{}' is not a valid Spotify playlist id or link",
            input
        )));
    }

    Ok(candidate.to_string())
}

// ==================== Client ====================

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Spotify Web API client using the client-credentials flow.
pub struct SpotifyClient {
    settings: SpotifySettings,
    token: RwLock<Option<CachedToken>>,
}

impl SpotifyClient {
    pub fn new(settings: SpotifySettings) -> Self {
        Self {
            settings,
            token: RwLock::new(None),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.settings.client_id.is_empty() && !self.settings.client_secret.is_empty()
    }

    async fn access_token(&self) -> AppResult<String> {
        if let Some(cached) = self.token.read().await.as_ref() {
            if cached.expires_at > Instant::now() {
                return Ok(cached.access_token.clone());
            }
        }

        let mut guard = self.token.write().await;
        // Another request may have refreshed while we waited for the lock
        if let Some(cached) = guard.as_ref() {
            if cached.expires_at > Instant::now() {
                return Ok(cached.access_token.clone());
            }
        }

        let fresh = self.request_token().await?;
        let access_token = fresh.access_token.clone();
        *guard = Some(fresh);
        Ok(access_token)
    }

    async fn request_token(&self) -> AppResult<CachedToken> {
        if !self.is_configured() {
            return Err(AppError::ConfigError(
                "SPOTIFY_CLIENT_ID / SPOTIFY_CLIENT_SECRET not configured".to_string(),
            ));
        }

        log::info!("🎧 Requesting Spotify access token");

        let credentials = base64::engine::general_purpose::STANDARD.encode(format!(
            "{}:{}",
            self.settings.client_id, self.settings.client_secret
        ));

        let response = http::client()
            .post(format!("{}/api/token", self.settings.accounts_url.trim_end_matches('/')))
            .header("Authorization", format!("Basic {}", credentials))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::ExternalError(format!(
                "Spotify token exchange failed: {}",
                response.status()
            )));
        }

        let token: TokenResponse = response.json().await?;
        let lifetime = token.expires_in.saturating_sub(TOKEN_EXPIRY_MARGIN_SECS);

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(lifetime),
        })
    }

    async fn invalidate_token(&self) {
        *self.token.write().await = None;
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> AppResult<T> {
        let token = self.access_token().await?;

        let response = http::client()
            .get(url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::BAD_REQUEST {
            return Err(AppError::NotFound("Resource not found in catalog".to_string()));
        }
        if status == reqwest::StatusCode::UNAUTHORIZED {
            self.invalidate_token().await;
            return Err(AppError::ExternalError("Spotify rejected the access token".to_string()));
        }
        if !status.is_success() {
            return Err(AppError::ExternalError(format!("Spotify API error: {}", status)));
        }

        Ok(response.json().await?)
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.settings.api_url.trim_end_matches('/'), path)
    }

    pub async fn search_albums(&self, query: &str, limit: u32) -> AppResult<Vec<AlbumSummary>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidRequest("Search query is required".to_string()));
        }
        let limit = limit.clamp(1, MAX_SEARCH_LIMIT);

        log::info!("🔍 Spotify album search: '{}' (limit {})", query, limit);

        let response: SearchResponse = self
            .get_json(
                &self.api_url("/search"),
                &[
                    ("q", query.to_string()),
                    ("type", "album".to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        Ok(response
            .albums
            .map(|page| page.items.into_iter().map(AlbumSummary::from).collect())
            .unwrap_or_default())
    }

    /// Full album including every track (follows track paging).
    pub async fn get_album(&self, album_id: &str) -> AppResult<AlbumDetails> {
        log::info!("💿 Fetching Spotify album {}", album_id);

        let mut album: SpotifyAlbum = self
            .get_json(&self.api_url(&format!("/albums/{}", urlencoding::encode(album_id))), &[])
            .await?;

        let mut tracks = Vec::new();
        let mut next = None;
        if let Some(page) = album.tracks.take() {
            tracks.extend(page.items.into_iter().filter_map(track_info));
            next = page.next;
        }
        while let Some(url) = next {
            let page: Paging<SpotifyTrack> = self.get_json(&url, &[]).await?;
            tracks.extend(page.items.into_iter().filter_map(track_info));
            next = page.next;
        }

        let label = album.label.take();
        let genres = std::mem::take(&mut album.genres);
        let popularity = album.popularity;

        Ok(AlbumDetails {
            summary: AlbumSummary::from(album),
            label,
            genres,
            popularity,
            tracks,
        })
    }

    pub async fn get_playlist(&self, playlist_id: &str) -> AppResult<PlaylistInfo> {
        log::info!("📃 Fetching Spotify playlist {}", playlist_id);

        let playlist: SpotifyPlaylist = self
            .get_json(
                &self.api_url(&format!("/playlists/{}", urlencoding::encode(playlist_id))),
                &[(
                    "fields",
                    "id,name,description,images,external_urls,owner(display_name),tracks(total)"
                        .to_string(),
                )],
            )
            .await?;

        Ok(PlaylistInfo::from(playlist))
    }

    pub async fn get_artists(&self, ids: &[String]) -> AppResult<Vec<ArtistInfo>> {
        let mut artists = Vec::with_capacity(ids.len());

        for chunk in ids.chunks(ARTISTS_BATCH_SIZE) {
            let response: ArtistsResponse = self
                .get_json(&self.api_url("/artists"), &[("ids", chunk.join(","))])
                .await?;
            artists.extend(response.artists.into_iter().flatten().map(ArtistInfo::from));
        }

        Ok(artists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_playlist_id_forms() {
        assert_eq!(parse_playlist_id("37i9dQZF1DXcBWIGoYBM5M").unwrap(), "37i9dQZF1DXcBWIGoYBM5M");
        assert_eq!(
            parse_playlist_id("spotify:playlist:37i9dQZF1DXcBWIGoYBM5M").unwrap(),
            "37i9dQZF1DXcBWIGoYBM5M"
        );
        assert_eq!(
            parse_playlist_id("https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M?si=abc123").unwrap(),
            "37i9dQZF1DXcBWIGoYBM5M"
        );
        assert_eq!(
            parse_playlist_id(" https://open.spotify.com/intl-pt/playlist/37i9dQZF1DX0XUsuxWHRQd ").unwrap(),
            "37i9dQZF1DX0XUsuxWHRQd"
        );
    }

    #[test]
    fn test_parse_playlist_id_rejects_garbage() {
        assert!(parse_playlist_id("").is_err());
        assert!(parse_playlist_id("https://open.spotify.com/playlist/").is_err());
        assert!(parse_playlist_id("not a playlist").is_err());
    }

    #[test]
    fn test_album_mapping() {
        let json = serde_json::json!({
            "id": "4aawyAB9vmqN3uQ7FjRGTy",
            "name": "Global Warming",
            "album_type": "album",
            "release_date": "2012-11-16",
            "total_tracks": 2,
            "images": [{"url": "https://i.scdn.co/image/large", "height": 640, "width": 640},
                       {"url": "https://i.scdn.co/image/small", "height": 64, "width": 64}],
            "artists": [{"id": "0TnOYISbd1XYRBk9myaseg", "name": "Pitbull"},
                        {"id": null, "name": "Guest"}],
            "external_urls": {"spotify": "https://open.spotify.com/album/4aawyAB9vmqN3uQ7FjRGTy"},
            "label": "Mr.305",
            "genres": [],
            "popularity": 57,
            "tracks": {
                "items": [
                    {"id": "t1", "name": "Global Warming", "track_number": 1, "disc_number": 1,
                     "duration_ms": 85400, "explicit": true, "artists": [{"id": "a", "name": "Pitbull"}]},
                    {"id": null, "name": "Local file", "track_number": 2}
                ],
                "next": null
            }
        });

        let mut album: SpotifyAlbum = serde_json::from_value(json).unwrap();
        let tracks: Vec<TrackInfo> = album
            .tracks
            .take()
            .unwrap()
            .items
            .into_iter()
            .filter_map(track_info)
            .collect();
        let summary = AlbumSummary::from(album);

        assert_eq!(summary.artist_name, "Pitbull, Guest");
        assert_eq!(summary.image.as_deref(), Some("https://i.scdn.co/image/large"));
        assert_eq!(summary.artists[0].id.as_deref(), Some("0TnOYISbd1XYRBk9myaseg"));
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].artists, vec!["Pitbull".to_string()]);
    }

    #[test]
    fn test_artists_response_skips_unknown_ids() {
        let json = serde_json::json!({
            "artists": [
                {"id": "x", "name": "Artist X", "genres": ["mpb"], "popularity": 60,
                 "followers": {"href": null, "total": 1200}, "images": [{"url": "img"}]},
                null
            ]
        });

        let response: ArtistsResponse = serde_json::from_value(json).unwrap();
        let artists: Vec<ArtistInfo> = response.artists.into_iter().flatten().map(ArtistInfo::from).collect();

        assert_eq!(artists.len(), 1);
        assert_eq!(artists[0].followers, Some(1200));
        assert_eq!(artists[0].image.as_deref(), Some("img"));
    }

    #[test]
    fn test_playlist_mapping_drops_empty_description() {
        let json = serde_json::json!({
            "id": "p1",
            "name": "Road trip",
            "description": "",
            "images": null,
            "external_urls": {"spotify": "https://open.spotify.com/playlist/p1"},
            "owner": {"display_name": "someone"},
            "tracks": {"total": 42}
        });

        let playlist: SpotifyPlaylist = serde_json::from_value(json).unwrap();
        let info = PlaylistInfo::from(playlist);

        assert!(info.description.is_none());
        assert!(info.image.is_none());
        assert_eq!(info.total_tracks, Some(42));
        assert_eq!(info.owner_name.as_deref(), Some("someone"));
    }

    #[tokio::test]
    async fn test_unconfigured_client_reports_config_error() {
        let client = SpotifyClient::new(crate::config::AppConfig::for_tests().spotify);
        let err = client.search_albums("radiohead", 10).await.unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }
}
