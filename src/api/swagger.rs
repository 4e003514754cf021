use utoipa::OpenApi;
use utoipa::openapi::security::{SecurityScheme, HttpAuthScheme, HttpBuilder};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Musical Odyssey API",
        version = "1.0.0",
        description = "Album ratings, rankings and playlists backed by a music catalog.\n\n**Authentication:** everything under `/api/v1` except the auth endpoints requires a JWT Bearer access token. Auth endpoints are rate limited per client address.\n\n**Features:**\n- Email/password accounts with OTP verification\n- Album search and per-track ratings with averages and history\n- Artist aggregation, rankings and linked playlists\n- Lyrics search and song credits\n- Admin user management and analytics",
        contact(
            name = "Musical Odyssey Team",
            email = "support@musicalodyssey.app"
        )
    ),
    paths(
        // Auth endpoints
        crate::api::auth::register,
        crate::api::auth::verify_otp,
        crate::api::auth::resend_otp,
        crate::api::auth::login,
        crate::api::auth::refresh_token,
        crate::api::auth::get_me,
        crate::api::auth::delete_account,

        // Profile
        crate::api::profile::update_profile,
        crate::api::profile::upload_image,

        // Health & Metrics
        crate::api::health::health_check,
        crate::api::metrics::get_metrics,

        // Catalog & lyrics
        crate::api::catalog::search_albums,
        crate::api::lyrics::search,

        // Ratings
        crate::api::ratings::submit_rating,
        crate::api::ratings::list_ratings,
        crate::api::artists::list_artists,

        // Playlists & rankings
        crate::api::playlists::list_predefined,
        crate::api::playlists::list_mine,
        crate::api::playlists::link_playlist,
        crate::api::rankings::submit_ranking,

        // Admin
        crate::api::admin::list_users,
        crate::api::admin::analytics,
        crate::api::admin::create_predefined_playlist,
    ),
    components(
        schemas(
            // Auth
            crate::services::auth_service::LoginRequest,
            crate::services::auth_service::RegisterRequest,
            crate::services::auth_service::VerifyOtpRequest,
            crate::services::auth_service::ResendOtpRequest,
            crate::services::auth_service::RefreshTokenRequest,
            crate::services::auth_service::UpdateProfileRequest,
            crate::services::auth_service::AuthResponse,
            crate::services::auth_service::RegisterResponse,
            crate::models::UserInfo,
            crate::models::UserGrowthEntry,

            // Health & Metrics
            crate::api::health::HealthResponse,
            crate::api::metrics::MetricsResponse,

            // Catalog
            crate::services::spotify_service::AlbumSummary,
            crate::services::spotify_service::ArtistRef,

            // Playlists & rankings
            crate::models::LinkPlaylistRequest,
            crate::models::PlaylistResponse,
            crate::models::RankingKind,
            crate::models::RankedItem,
            crate::models::SubmitRankingRequest,
            crate::models::RankingResponse,

            // Admin
            crate::api::admin::SetAdminRequest,
        )
    ),
    tags(
        (name = "Auth", description = "Registration with email OTP, login and token refresh."),
        (name = "Profile", description = "Profile fields and profile image upload."),
        (name = "Health", description = "Health check and request counters."),
        (name = "Catalog", description = "Album and playlist lookups against the music catalog."),
        (name = "Lyrics", description = "Lyrics search and song credits."),
        (name = "Ratings", description = "Per-track album ratings, averages, history and artist aggregation."),
        (name = "Playlists", description = "Predefined and user-linked playlists."),
        (name = "Rankings", description = "Ordered album and track rankings with history."),
        (name = "Admin", description = "User management, analytics and predefined playlists. Admin token required."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Access token from /api/v1/auth/login or /verify-otp"))
                        .build()
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_document_lists_core_routes() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;

        assert!(paths.contains_key("/api/v1/auth/register"));
        assert!(paths.contains_key("/api/v1/ratings"));
        assert!(paths.contains_key("/api/v1/admin/analytics"));
        assert!(doc.components.unwrap().security_schemes.contains_key("bearer_auth"));
    }
}
