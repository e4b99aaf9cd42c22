use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::BTreeSet;

use crate::models::{CatalogEntry, CatalogItem, NewCatalogItem, WatchStatus};

pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS catalog_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            director TEXT,
            release_year INTEGER,
            status TEXT NOT NULL DEFAULT 'want_to_watch',
            user_rating INTEGER CHECK (user_rating IS NULL OR user_rating BETWEEN 1 AND 10),
            user_notes TEXT NOT NULL DEFAULT '',
            -- JSON array of tags
            mood_tags TEXT NOT NULL DEFAULT '[]',
            -- Normalized metadata record as JSON, '{}' until first enrichment
            metadata_json TEXT NOT NULL DEFAULT '{}',
            last_updated TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create catalog_items table")?;

    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_catalog_items_title ON catalog_items(title COLLATE NOCASE)",
        "CREATE INDEX IF NOT EXISTS idx_catalog_items_last_updated ON catalog_items(last_updated)",
    ];

    for index_sql in indexes {
        if let Err(e) = sqlx::query(index_sql).execute(pool).await {
            tracing::warn!("Failed to create index: {} - {}", index_sql, e);
        }
    }

    tracing::debug!("Database schema created/verified");

    Ok(())
}

/// Which catalog items a query targets
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ItemSelector {
    #[default]
    All,
    Id(i64),
    /// Case-insensitive substring match on the title; `%` and `_` are literal
    TitleContains(String),
}

#[derive(Debug, sqlx::FromRow)]
struct CatalogRow {
    id: i64,
    title: String,
    director: Option<String>,
    release_year: Option<i32>,
    status: String,
    user_rating: Option<i32>,
    user_notes: String,
    mood_tags: String,
    metadata_json: String,
    last_updated: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<CatalogRow> for CatalogItem {
    type Error = anyhow::Error;

    fn try_from(row: CatalogRow) -> Result<Self> {
        let status = row
            .status
            .parse::<WatchStatus>()
            .with_context(|| format!("Invalid status on catalog item {}", row.id))?;

        let mood_tags: BTreeSet<String> = serde_json::from_str(&row.mood_tags)
            .with_context(|| format!("Invalid mood tags on catalog item {}", row.id))?;

        // A damaged metadata blob only costs a refresh
        let metadata: CatalogEntry = serde_json::from_str(&row.metadata_json).unwrap_or_else(|e| {
            tracing::warn!("Discarding unreadable metadata on catalog item {}: {}", row.id, e);
            CatalogEntry::default()
        });

        Ok(CatalogItem {
            id: row.id,
            title: row.title,
            director: row.director,
            release_year: row.release_year,
            status,
            user_rating: row.user_rating,
            user_notes: row.user_notes,
            mood_tags,
            metadata,
            last_updated: row.last_updated,
            created_at: row.created_at,
        })
    }
}

const SELECT_ITEMS: &str = r#"
    SELECT id, title, director, release_year, status, user_rating, user_notes,
           mood_tags, metadata_json, last_updated, created_at
    FROM catalog_items
"#;

/// Insert a new item with empty metadata, returning its id
pub async fn insert_item(pool: &SqlitePool, item: &NewCatalogItem) -> Result<i64> {
    let mood_tags = serde_json::to_string(&item.mood_tags)?;

    let result = sqlx::query(
        r#"
        INSERT INTO catalog_items
            (title, director, release_year, status, user_rating, user_notes, mood_tags, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&item.title)
    .bind(&item.director)
    .bind(item.release_year)
    .bind(item.status.as_str())
    .bind(item.user_rating)
    .bind(&item.user_notes)
    .bind(&mood_tags)
    .bind(Utc::now())
    .execute(pool)
    .await
    .with_context(|| format!("Failed to insert '{}'", item.title))?;

    Ok(result.last_insert_rowid())
}

pub async fn get_item(pool: &SqlitePool, id: i64) -> Result<Option<CatalogItem>> {
    let row: Option<CatalogRow> = sqlx::query_as(&format!("{} WHERE id = ?", SELECT_ITEMS))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.map(CatalogItem::try_from).transpose()
}

/// Items matching `selector` in insertion order, at most `limit` when given
pub async fn list_items(
    pool: &SqlitePool,
    selector: &ItemSelector,
    limit: Option<i64>,
) -> Result<Vec<CatalogItem>> {
    // SQLite treats a negative LIMIT as no limit
    let limit = limit.unwrap_or(-1);

    let rows: Vec<CatalogRow> = match selector {
        ItemSelector::All => {
            sqlx::query_as(&format!("{} ORDER BY id ASC LIMIT ?", SELECT_ITEMS))
                .bind(limit)
                .fetch_all(pool)
                .await?
        }
        ItemSelector::Id(id) => {
            sqlx::query_as(&format!("{} WHERE id = ? LIMIT ?", SELECT_ITEMS))
                .bind(id)
                .bind(limit)
                .fetch_all(pool)
                .await?
        }
        ItemSelector::TitleContains(fragment) => {
            sqlx::query_as(&format!(
                "{} WHERE instr(LOWER(title), LOWER(?)) > 0 ORDER BY id ASC LIMIT ?",
                SELECT_ITEMS
            ))
            .bind(fragment)
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
    };

    rows.into_iter().map(CatalogItem::try_from).collect()
}

pub async fn find_by_title(pool: &SqlitePool, fragment: &str) -> Result<Vec<CatalogItem>> {
    list_items(pool, &ItemSelector::TitleContains(fragment.to_string()), None).await
}

/// Persist user fields, mood tags, metadata and refresh timestamp of an existing item
pub async fn save_item(pool: &SqlitePool, item: &CatalogItem) -> Result<()> {
    let mood_tags = serde_json::to_string(&item.mood_tags)?;
    let metadata_json = serde_json::to_string(&item.metadata)?;

    let result = sqlx::query(
        r#"
        UPDATE catalog_items SET
            title = ?,
            director = ?,
            release_year = ?,
            status = ?,
            user_rating = ?,
            user_notes = ?,
            mood_tags = ?,
            metadata_json = ?,
            last_updated = ?
        WHERE id = ?
        "#,
    )
    .bind(&item.title)
    .bind(&item.director)
    .bind(item.release_year)
    .bind(item.status.as_str())
    .bind(item.user_rating)
    .bind(&item.user_notes)
    .bind(&mood_tags)
    .bind(&metadata_json)
    .bind(item.last_updated)
    .bind(item.id)
    .execute(pool)
    .await
    .with_context(|| format!("Failed to save catalog item {}", item.id))?;

    if result.rows_affected() == 0 {
        anyhow::bail!("Catalog item {} does not exist", item.id);
    }

    Ok(())
}

/// Delete items by id, returning how many rows went away
pub async fn delete_items(pool: &SqlitePool, ids: &[i64]) -> Result<u64> {
    let mut tx = pool.begin().await?;
    let mut deleted = 0;

    for id in ids {
        deleted += sqlx::query("DELETE FROM catalog_items WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
    }

    tx.commit().await?;
    Ok(deleted)
}
