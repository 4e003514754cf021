use crate::{
    database::{self, MongoDB},
    models::{RankedItem, Ranking, RankingKind, SubmitRankingRequest},
    utils::{AppError, AppResult},
};
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, DateTime as BsonDateTime};
use std::collections::HashSet;

pub const MAX_RANKED_ITEMS: usize = 100;

pub fn validate_items(items: &[RankedItem]) -> AppResult<()> {
    if items.is_empty() {
        return Err(AppError::InvalidRequest("Ranking needs at least one item".to_string()));
    }
    if items.len() > MAX_RANKED_ITEMS {
        return Err(AppError::InvalidRequest(format!(
            "Ranking cannot have more than {} items",
            MAX_RANKED_ITEMS
        )));
    }

    let mut seen = HashSet::new();
    for item in items {
        if item.id.trim().is_empty() {
            return Err(AppError::InvalidRequest("Ranked item id cannot be empty".to_string()));
        }
        if !seen.insert(item.id.as_str()) {
            return Err(AppError::InvalidRequest(format!("Item {} appears twice", item.id)));
        }
    }
    Ok(())
}

/// Stores a new ranking snapshot; earlier ones are kept as history.
pub async fn submit_ranking(db: &MongoDB, user_id: &str, request: SubmitRankingRequest) -> AppResult<Ranking> {
    validate_items(&request.items)?;

    let mut ranking = Ranking {
        id: None,
        user_id: user_id.to_string(),
        list_type: request.list_type,
        items: request.items,
        created_at: BsonDateTime::now(),
    };

    let result = db
        .collection::<Ranking>(database::RANKINGS)
        .insert_one(&ranking)
        .await?;
    ranking.id = result.inserted_id.as_object_id();

    log::info!(
        "🏆 Ranking saved: user {} {} ({} items)",
        user_id,
        ranking.list_type,
        ranking.items.len()
    );
    Ok(ranking)
}

pub async fn latest_ranking(db: &MongoDB, user_id: &str, kind: RankingKind) -> AppResult<Ranking> {
    db.collection::<Ranking>(database::RANKINGS)
        .find_one(doc! { "user_id": user_id, "list_type": kind.as_str() })
        .sort(doc! { "created_at": -1 })
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No {} ranking yet", kind)))
}

/// Newest first.
pub async fn ranking_history(db: &MongoDB, user_id: &str, kind: RankingKind) -> AppResult<Vec<Ranking>> {
    let cursor = db
        .collection::<Ranking>(database::RANKINGS)
        .find(doc! { "user_id": user_id, "list_type": kind.as_str() })
        .sort(doc! { "created_at": -1 })
        .await?;
    Ok(cursor.try_collect().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str) -> RankedItem {
        RankedItem {
            id: id.to_string(),
            name: format!("Item {}", id),
            subtitle: None,
            image: None,
        }
    }

    #[test]
    fn test_validate_items() {
        assert!(validate_items(&[item("a"), item("b")]).is_ok());
        assert!(validate_items(&[]).is_err());
        assert!(validate_items(&[item("a"), item("a")]).is_err());
        assert!(validate_items(&[item(" ")]).is_err());
    }

    #[test]
    fn test_validate_items_limit() {
        let items: Vec<RankedItem> = (0..=MAX_RANKED_ITEMS).map(|i| item(&i.to_string())).collect();
        assert!(validate_items(&items).is_err());
        assert!(validate_items(&items[..MAX_RANKED_ITEMS]).is_ok());
    }
}
