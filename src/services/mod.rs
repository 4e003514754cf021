pub mod admin_service;
pub mod artist_service;
pub mod auth_service;
pub mod email_service;
pub mod genius_service;
pub mod playlist_service;
pub mod ranking_service;
pub mod rating_service;
pub mod spotify_service;
pub mod storage_service;
