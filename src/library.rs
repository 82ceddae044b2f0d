use futures::future::join_all;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::models::{EnrichedListItem, ListItem};
use crate::tmdb::TmdbClient;
use crate::trakt::TraktClient;

async fn enrich(tmdb: &TmdbClient, item: &ListItem) -> EnrichedListItem {
    let Some(tmdb_id) = item.tmdb_id else {
        return EnrichedListItem::placeholder(item);
    };

    match tmdb.item_details(tmdb_id, item.kind).await {
        Ok(details) => EnrichedListItem {
            id: details.id,
            kind: item.kind,
            title: details.title,
            poster_url: details.poster_url,
            backdrop_url: details.backdrop_url,
            overview: details.overview,
            year: details.year,
        },
        Err(e) => {
            warn!("No metadata for {} {}: {}", item.kind, tmdb_id, e);
            EnrichedListItem::placeholder(item)
        }
    }
}

/// Joins each list entry with its metadata, looked up concurrently.
/// Entries whose lookup fails are kept as placeholders.
pub async fn list_items_with_details(
    trakt: &TraktClient,
    tmdb: &TmdbClient,
    username: &str,
    list_id: &str,
) -> Result<Vec<EnrichedListItem>, ApiError> {
    let items = trakt.list_items(username, list_id).await?;
    Ok(enrich_all(tmdb, &items).await)
}

pub async fn enrich_all(tmdb: &TmdbClient, items: &[ListItem]) -> Vec<EnrichedListItem> {
    let enriched = join_all(items.iter().map(|item| enrich(tmdb, item))).await;
    info!("Enriched {} list items", enriched.len());
    enriched
}

/// Poster of the first item, if it has one.
pub fn list_cover(items: &[EnrichedListItem]) -> Option<&str> {
    items.first().and_then(|i| i.poster_url.as_deref())
}
