use crate::utils::AppError;
use mongodb::bson::{doc, Document};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, Database, IndexModel};

pub const USERS: &str = "users";
pub const PLAYLISTS: &str = "playlists";
pub const RATINGS: &str = "ratings";
pub const RATING_HISTORY: &str = "rating_history";
pub const USER_GROWTH_HISTORY: &str = "user_growth_history";
pub const RANKINGS: &str = "rankings";

const DEFAULT_DB_NAME: &str = "musical_odyssey";

#[derive(Clone)]
pub struct MongoDB {
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str) -> Result<Self, AppError> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(5);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));
        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));
        client_options.app_name = Some("musical-odyssey".to_string());

        let db_name = database_name_from_uri(uri);
        let client = Client::with_options(client_options)?;
        let db = client.database(&db_name);

        // Test connection
        db.list_collection_names().await?;

        let mongodb = Self { db };
        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    async fn ensure_indexes(&self) -> Result<(), AppError> {
        log::info!("🔧 Creating database indexes...");

        let unique = || IndexOptions::builder().unique(true).build();

        let indexes: Vec<(&str, Document, Option<IndexOptions>)> = vec![
            (USERS, doc! { "email": 1 }, Some(unique())),
            (USERS, doc! { "omid": 1 }, None),
            (RATINGS, doc! { "user_id": 1, "album_id": 1 }, Some(unique())),
            (RATINGS, doc! { "user_id": 1, "artist_name": 1 }, None),
            (RATING_HISTORY, doc! { "user_id": 1, "album_id": 1, "date": 1 }, None),
            (PLAYLISTS, doc! { "owner_id": 1 }, None),
            (PLAYLISTS, doc! { "predefined": 1 }, None),
            (RANKINGS, doc! { "user_id": 1, "list_type": 1, "created_at": -1 }, None),
            (USER_GROWTH_HISTORY, doc! { "date": 1 }, Some(unique())),
        ];

        for (collection_name, keys, options) in indexes {
            let description = format!("{}({:?})", collection_name, keys.keys().collect::<Vec<_>>());
            let model = IndexModel::builder().keys(keys).options(options).build();

            match self.collection::<Document>(collection_name).create_index(model).await {
                Ok(_) => log::info!("   ✅ Index ready: {}", description),
                Err(e) => log::warn!("   ⚠️  Could not create index {}: {}", description, e),
            }
        }

        log::info!("✅ Database indexes ready");
        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    pub async fn ping(&self) -> bool {
        self.db.run_command(doc! { "ping": 1 }).await.is_ok()
    }
}

/// True when the write was rejected by a unique index.
pub fn is_duplicate_key(error: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};

    match error.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => write_error.code == 11000,
        _ => false,
    }
}

/// Database name is the last path segment of the URI, without query string.
fn database_name_from_uri(uri: &str) -> String {
    let without_scheme = uri.split("://").nth(1).unwrap_or(uri);
    without_scheme
        .split_once('/')
        .map(|(_, rest)| rest.split('?').next().unwrap_or(""))
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_DB_NAME)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_name_from_uri() {
        assert_eq!(database_name_from_uri("mongodb://localhost:27017/odyssey"), "odyssey");
        assert_eq!(
            database_name_from_uri("mongodb+srv://u:p@cluster.example.net/odyssey?retryWrites=true"),
            "odyssey"
        );
        assert_eq!(database_name_from_uri("mongodb://localhost:27017"), DEFAULT_DB_NAME);
        assert_eq!(database_name_from_uri("mongodb://localhost:27017/?w=majority"), DEFAULT_DB_NAME);
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_mongodb_connection() {
        dotenv::dotenv().ok();
        let uri = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "mongodb://localhost:27017/musical_odyssey_test".to_string());

        let db = MongoDB::new(&uri).await;
        assert!(db.is_ok());
        assert!(db.unwrap().ping().await);
    }
}
