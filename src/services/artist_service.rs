use crate::{
    database::{self, MongoDB},
    services::{rating_service::round_one_decimal, spotify_service::ArtistInfo, spotify_service::SpotifyClient},
    utils::AppResult,
};
use futures::stream::StreamExt;
use mongodb::bson::{doc, Document};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtistAlbum {
    pub album_id: String,
    pub album_name: String,
    pub album_image: Option<String>,
    pub average: Option<f64>,
}

/// A user's ratings grouped under one artist name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtistGroup {
    #[serde(rename = "_id")]
    pub artist_name: String,
    pub artist_id: Option<String>,
    pub album_count: i64,
    /// Mean of the album averages (blank albums ignored)
    pub average: Option<f64>,
    pub albums: Vec<ArtistAlbum>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtistSummary {
    pub artist_name: String,
    pub artist_id: Option<String>,
    pub album_count: i64,
    pub average: Option<f64>,
    pub albums: Vec<ArtistAlbum>,
    pub image: Option<String>,
    pub genres: Vec<String>,
    pub popularity: Option<u32>,
    pub followers: Option<u64>,
}

pub fn artist_pipeline(user_id: &str) -> Vec<Document> {
    vec![
        doc! { "$match": { "user_id": user_id } },
        doc! { "$sort": { "updated_at": -1 } },
        doc! { "$group": {
            "_id": "$artist_name",
            "artist_id": { "$first": "$artist_id" },
            "album_count": { "$sum": 1 },
            "average": { "$avg": "$average" },
            "albums": { "$push": {
                "album_id": "$album_id",
                "album_name": "$album_name",
                "album_image": "$album_image",
                "average": "$average",
            }},
        }},
        doc! { "$sort": { "average": -1, "_id": 1 } },
    ]
}

/// Attaches catalog metadata to each group with a known artist id.
pub fn enrich(groups: Vec<ArtistGroup>, artists: Vec<ArtistInfo>) -> Vec<ArtistSummary> {
    let by_id: HashMap<String, ArtistInfo> = artists.into_iter().map(|a| (a.id.clone(), a)).collect();

    groups
        .into_iter()
        .map(|group| {
            let info = group.artist_id.as_ref().and_then(|id| by_id.get(id));
            ArtistSummary {
                image: info.and_then(|i| i.image.clone()),
                genres: info.map(|i| i.genres.clone()).unwrap_or_default(),
                popularity: info.and_then(|i| i.popularity),
                followers: info.and_then(|i| i.followers),
                artist_name: group.artist_name,
                artist_id: group.artist_id,
                album_count: group.album_count,
                average: group.average.map(round_one_decimal),
                albums: group.albums,
            }
        })
        .collect()
}

pub async fn aggregate_artists(db: &MongoDB, spotify: &SpotifyClient, user_id: &str) -> AppResult<Vec<ArtistSummary>> {
    let mut cursor = db
        .collection::<Document>(database::RATINGS)
        .aggregate(artist_pipeline(user_id))
        .await?;

    let mut groups = Vec::new();
    while let Some(result) = cursor.next().await {
        match mongodb::bson::from_document::<ArtistGroup>(result?) {
            Ok(group) => groups.push(group),
            Err(e) => log::warn!("⚠️  Skipping malformed artist group: {}", e),
        }
    }

    let mut ids: Vec<String> = groups.iter().filter_map(|g| g.artist_id.clone()).collect();
    ids.sort();
    ids.dedup();

    let artists = if ids.is_empty() {
        Vec::new()
    } else {
        match spotify.get_artists(&ids).await {
            Ok(artists) => artists,
            Err(e) => {
                log::warn!("⚠️  Artist enrichment failed, returning plain groups: {}", e);
                Vec::new()
            }
        }
    };

    Ok(enrich(groups, artists))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(name: &str, id: Option<&str>, average: Option<f64>) -> ArtistGroup {
        ArtistGroup {
            artist_name: name.to_string(),
            artist_id: id.map(String::from),
            album_count: 1,
            average,
            albums: vec![],
        }
    }

    #[test]
    fn test_pipeline_groups_by_artist_name() {
        let pipeline = artist_pipeline("USER00000001");

        assert_eq!(pipeline.len(), 4);
        assert_eq!(
            pipeline[0].get_document("$match").unwrap().get_str("user_id").unwrap(),
            "USER00000001"
        );
        let group = pipeline[2].get_document("$group").unwrap();
        assert_eq!(group.get_str("_id").unwrap(), "$artist_name");
        assert!(group.contains_key("albums"));
    }

    #[test]
    fn test_group_document_decodes() {
        let doc = doc! {
            "_id": "Caetano Veloso",
            "artist_id": "7HGNYPmbDrMkylWqeFCOIQ",
            "album_count": 2,
            "average": 8.25,
            "albums": [
                { "album_id": "a1", "album_name": "Transa", "album_image": null, "average": 9.0 },
                { "album_id": "a2", "album_name": "Cinema Transcendental", "average": 7.5 },
            ],
        };

        let group: ArtistGroup = mongodb::bson::from_document(doc).unwrap();
        assert_eq!(group.artist_name, "Caetano Veloso");
        assert_eq!(group.albums.len(), 2);
        assert!(group.albums[1].album_image.is_none());
    }

    #[test]
    fn test_enrich_matches_by_id_and_rounds() {
        let groups = vec![
            group("Gal Costa", Some("g1"), Some(8.25)),
            group("Unknown Band", None, None),
        ];
        let artists = vec![ArtistInfo {
            id: "g1".to_string(),
            name: "Gal Costa".to_string(),
            image: Some("img".to_string()),
            genres: vec!["mpb".to_string()],
            popularity: Some(55),
            followers: Some(900_000),
        }];

        let enriched = enrich(groups, artists);

        assert_eq!(enriched[0].image.as_deref(), Some("img"));
        assert_eq!(enriched[0].genres, vec!["mpb".to_string()]);
        assert_eq!(enriched[0].average, Some(8.3));
        assert!(enriched[1].image.is_none());
        assert!(enriched[1].average.is_none());
    }
}
