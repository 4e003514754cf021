use crate::{
    database::{self, MongoDB},
    middleware::auth::Claims,
    models::Playlist,
    services::spotify_service::{self, SpotifyClient},
    utils::{AppError, AppResult},
};
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, DateTime as BsonDateTime};

pub async fn list_predefined(db: &MongoDB) -> AppResult<Vec<Playlist>> {
    let cursor = db
        .collection::<Playlist>(database::PLAYLISTS)
        .find(doc! { "predefined": true })
        .sort(doc! { "created_at": -1 })
        .await?;
    Ok(cursor.try_collect().await?)
}

pub async fn list_for_user(db: &MongoDB, user_id: &str) -> AppResult<Vec<Playlist>> {
    let cursor = db
        .collection::<Playlist>(database::PLAYLISTS)
        .find(doc! { "owner_id": user_id })
        .sort(doc! { "created_at": -1 })
        .await?;
    Ok(cursor.try_collect().await?)
}

async fn build_playlist(
    spotify: &SpotifyClient,
    input: &str,
    owner_id: Option<String>,
) -> AppResult<Playlist> {
    let spotify_id = spotify_service::parse_playlist_id(input)?;
    let info = spotify.get_playlist(&spotify_id).await?;

    Ok(Playlist {
        id: None,
        spotify_id: info.id,
        name: info.name,
        description: info.description,
        image: info.image,
        external_url: info.external_url,
        predefined: owner_id.is_none(),
        owner_id,
        created_at: BsonDateTime::now(),
    })
}

async fn insert(db: &MongoDB, mut playlist: Playlist) -> AppResult<Playlist> {
    let result = db
        .collection::<Playlist>(database::PLAYLISTS)
        .insert_one(&playlist)
        .await?;
    playlist.id = result.inserted_id.as_object_id();
    Ok(playlist)
}

/// Links a catalog playlist to the user's account.
pub async fn link_playlist(db: &MongoDB, spotify: &SpotifyClient, user_id: &str, input: &str) -> AppResult<Playlist> {
    let playlist = build_playlist(spotify, input, Some(user_id.to_string())).await?;

    let exists = db
        .collection::<Playlist>(database::PLAYLISTS)
        .find_one(doc! { "owner_id": user_id, "spotify_id": &playlist.spotify_id })
        .await?;
    if exists.is_some() {
        return Err(AppError::Conflict("Playlist already linked".to_string()));
    }

    log::info!("🎶 User {} linked playlist {}", user_id, playlist.spotify_id);
    insert(db, playlist).await
}

/// Admin-curated playlist, visible to everyone, no owner.
pub async fn create_predefined(db: &MongoDB, spotify: &SpotifyClient, input: &str) -> AppResult<Playlist> {
    let playlist = build_playlist(spotify, input, None).await?;

    let exists = db
        .collection::<Playlist>(database::PLAYLISTS)
        .find_one(doc! { "predefined": true, "spotify_id": &playlist.spotify_id })
        .await?;
    if exists.is_some() {
        return Err(AppError::Conflict("Playlist is already predefined".to_string()));
    }

    log::info!("🎶 Predefined playlist created: {}", playlist.spotify_id);
    insert(db, playlist).await
}

pub fn can_delete(playlist: &Playlist, claims: &Claims) -> bool {
    claims.is_admin || playlist.owner_id.as_deref() == Some(claims.sub.as_str())
}

/// Owners delete their own playlists; admins delete any, predefined included.
pub async fn delete_playlist(db: &MongoDB, claims: &Claims, playlist_id: &str) -> AppResult<()> {
    let object_id = ObjectId::parse_str(playlist_id)
        .map_err(|_| AppError::InvalidRequest("Invalid playlist ID".to_string()))?;

    let collection = db.collection::<Playlist>(database::PLAYLISTS);
    let playlist = collection
        .find_one(doc! { "_id": object_id })
        .await?
        .ok_or_else(|| AppError::NotFound("Playlist not found".to_string()))?;

    if !can_delete(&playlist, claims) {
        return Err(AppError::Forbidden("You cannot delete this playlist".to_string()));
    }

    collection.delete_one(doc! { "_id": object_id }).await?;
    log::info!("🗑️ Playlist {} deleted by {}", playlist_id, claims.sub);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(sub: &str, is_admin: bool) -> Claims {
        Claims {
            sub: sub.to_string(),
            email: format!("{}@example.com", sub.to_lowercase()),
            name: None,
            is_admin,
            token_type: "access".to_string(),
            iat: 0,
            exp: 0,
            jti: String::new(),
            aud: String::new(),
            iss: String::new(),
        }
    }

    fn playlist(owner: Option<&str>) -> Playlist {
        Playlist {
            id: None,
            spotify_id: "p1".to_string(),
            name: "Mix".to_string(),
            description: None,
            image: None,
            external_url: None,
            owner_id: owner.map(String::from),
            predefined: owner.is_none(),
            created_at: BsonDateTime::now(),
        }
    }

    #[test]
    fn test_owner_can_delete() {
        assert!(can_delete(&playlist(Some("OWNER0000001")), &claims("OWNER0000001", false)));
    }

    #[test]
    fn test_other_user_cannot_delete() {
        assert!(!can_delete(&playlist(Some("OWNER0000001")), &claims("OTHER0000001", false)));
        assert!(!can_delete(&playlist(None), &claims("OTHER0000001", false)));
    }

    #[test]
    fn test_admin_can_delete_anything() {
        assert!(can_delete(&playlist(Some("OWNER0000001")), &claims("ADMIN0000001", true)));
        assert!(can_delete(&playlist(None), &claims("ADMIN0000001", true)));
    }
}
