// Catalog maintenance commands behind the CLI
//
// Each handler returns a report; printing is left to main.

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;

use crate::db::{self, ItemSelector};
use crate::models::{CatalogItem, ContentHint, NewCatalogItem};
use crate::services::metadata::{EnrichOutcome, MetadataService};
use crate::services::poster_cache::{normalize_media_path, PosterCache};

/// Create an item from user fields and enrich it right away
pub async fn add_item(
    pool: &SqlitePool,
    service: &MetadataService,
    new_item: &NewCatalogItem,
    hint: Option<ContentHint>,
) -> Result<(CatalogItem, EnrichOutcome)> {
    let id = db::insert_item(pool, new_item).await?;
    let mut item = db::get_item(pool, id)
        .await?
        .with_context(|| format!("Catalog item {} vanished after insert", id))?;

    let outcome = service.update_item_with_hint(&mut item, true, hint).await;
    if matches!(outcome, EnrichOutcome::Updated { .. }) {
        db::save_item(pool, &item).await?;
    }

    Ok((item, outcome))
}

#[derive(Debug, Clone)]
pub struct UpdateOptions {
    pub all: bool,
    pub force: bool,
    pub id: Option<i64>,
    pub title: Option<String>,
    pub limit: i64,
    pub delete: bool,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            all: false,
            force: false,
            id: None,
            title: None,
            limit: 10,
            delete: false,
        }
    }
}

impl UpdateOptions {
    /// Deletion needs an explicit id or title and never runs over the whole catalog
    pub fn validate(&self) -> Result<()> {
        if self.delete {
            if self.all {
                anyhow::bail!("Refusing to delete all items. Provide --title or --id with --delete.");
            }
            if self.id.is_none() && self.title.is_none() {
                anyhow::bail!("When using --delete, you must provide --title or --id.");
            }
        }
        Ok(())
    }

    fn selector(&self) -> ItemSelector {
        match (&self.id, &self.title) {
            (Some(id), _) => ItemSelector::Id(*id),
            (None, Some(title)) => ItemSelector::TitleContains(title.clone()),
            (None, None) => ItemSelector::All,
        }
    }
}

/// Outcome of one item in a bulk run
#[derive(Debug, Clone, PartialEq)]
pub enum ItemResult {
    Updated,
    Skipped,
    NoMatch,
    Failed(String),
}

#[derive(Debug, Default)]
pub struct UpdateReport {
    pub items: Vec<(CatalogItem, ItemResult)>,
}

impl UpdateReport {
    pub fn count(&self, result: &ItemResult) -> usize {
        self.items
            .iter()
            .filter(|(_, r)| std::mem::discriminant(r) == std::mem::discriminant(result))
            .count()
    }
}

/// Items an update run targets. Without `--id`, `--title` or `--all`, the first
/// `limit` stale items are picked.
pub async fn select_items(
    pool: &SqlitePool,
    options: &UpdateOptions,
    refresh_days: i64,
) -> Result<Vec<CatalogItem>> {
    let selector = options.selector();
    let items = match &selector {
        ItemSelector::TitleContains(title) => db::find_by_title(pool, title).await?,
        other => db::list_items(pool, other, None).await?,
    };

    match selector {
        ItemSelector::Id(id) if items.is_empty() => {
            anyhow::bail!("Catalog item with ID {} not found", id)
        }
        ItemSelector::TitleContains(ref title) if items.is_empty() => {
            anyhow::bail!("No catalog items found matching title '{}'", title)
        }
        ItemSelector::All if !options.all => {
            let now = Utc::now();
            Ok(items
                .into_iter()
                .filter(|item| options.force || item.needs_metadata_refresh(refresh_days, now))
                .take(options.limit.max(0) as usize)
                .collect())
        }
        _ => Ok(items),
    }
}

/// Refresh every selected item independently; one failure never stops the run
pub async fn update_items(
    pool: &SqlitePool,
    service: &MetadataService,
    items: Vec<CatalogItem>,
    force: bool,
) -> UpdateReport {
    let mut report = UpdateReport::default();

    for mut item in items {
        let result = match service.update_item(&mut item, force).await {
            EnrichOutcome::Fresh => ItemResult::Skipped,
            EnrichOutcome::NoMatch => ItemResult::NoMatch,
            EnrichOutcome::Updated { .. } => match db::save_item(pool, &item).await {
                Ok(()) => ItemResult::Updated,
                Err(e) => {
                    tracing::error!("Failed to save metadata for '{}': {:#}", item.title, e);
                    ItemResult::Failed(format!("{:#}", e))
                }
            },
        };
        report.items.push((item, result));
    }

    tracing::info!(
        "Updated metadata for {} of {} items",
        report.count(&ItemResult::Updated),
        report.items.len()
    );
    report
}

pub async fn delete_selected(pool: &SqlitePool, items: &[CatalogItem]) -> Result<u64> {
    let ids: Vec<i64> = items.iter().map(|item| item.id).collect();
    db::delete_items(pool, &ids).await
}

/// Add and remove mood tags on one item. Removals apply after additions.
pub async fn edit_tags(pool: &SqlitePool, id: i64, add: &[String], remove: &[String]) -> Result<CatalogItem> {
    let mut item = db::get_item(pool, id)
        .await?
        .with_context(|| format!("Catalog item with ID {} not found", id))?;

    let mut changed = false;
    for tag in add.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        changed |= item.add_mood_tag(tag);
    }
    for tag in remove {
        changed |= item.remove_mood_tag(tag.trim());
    }

    if changed {
        db::save_item(pool, &item).await?;
    }
    Ok(item)
}

/// Use a hand-picked poster image for an item, downloading it unless already cached
pub async fn set_poster(pool: &SqlitePool, posters: &PosterCache, id: i64, url: &str) -> Result<CatalogItem> {
    let mut item = db::get_item(pool, id)
        .await?
        .with_context(|| format!("Catalog item with ID {} not found", id))?;

    let url = url.trim();
    if url.is_empty() {
        anyhow::bail!("Poster URL is required");
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        anyhow::bail!("URL must start with http:// or https://");
    }

    let path = posters
        .ensure_cached(url, &item.title)
        .await
        .with_context(|| format!("Failed to download poster from {}", url))?;

    item.metadata.poster_url = Some(url.to_string());
    item.metadata.cached_poster_path = Some(posters.relative_path(&path));
    db::save_item(pool, &item).await?;

    Ok(item)
}

/// (title, stored path) for items whose cached poster file is gone
pub async fn missing_posters(pool: &SqlitePool, posters: &PosterCache) -> Result<Vec<(String, String)>> {
    let mut missing = Vec::new();

    for item in db::list_items(pool, &ItemSelector::All, None).await? {
        let Some(stored) = item.metadata.cached_poster_path.as_deref() else {
            continue;
        };
        let relative = normalize_media_path(stored);
        if relative.is_empty() {
            continue;
        }

        let exists = tokio::fs::try_exists(posters.media_path(&relative))
            .await
            .unwrap_or(false);
        if !exists {
            missing.push((item.title.clone(), relative));
        }
    }

    Ok(missing)
}

#[derive(Debug, Default)]
pub struct FixReport {
    pub fixed: usize,
    pub not_found: Vec<String>,
}

/// Point `cached_poster_path` at posters that are already in the cache
pub async fn fix_posters(pool: &SqlitePool, posters: &PosterCache) -> Result<FixReport> {
    let mut report = FixReport::default();

    for mut item in db::list_items(pool, &ItemSelector::All, None).await? {
        let Some(url) = item.metadata.poster_url.clone() else {
            continue;
        };

        match posters.cached_path(&url, &item.title).await {
            Some(path) => {
                item.metadata.cached_poster_path = Some(posters.relative_path(&path));
                db::save_item(pool, &item).await?;
                report.fixed += 1;
            }
            None => report.not_found.push(item.title.clone()),
        }
    }

    Ok(report)
}
