use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod db;
mod models;
mod services;

use commands::{ItemResult, UpdateOptions};
use config::AppConfig;
use models::{CatalogItem, ContentHint, NewCatalogItem, WatchStatus};
use services::metadata::{EnrichOutcome, MetadataService};

#[derive(Parser)]
#[command(name = "filmshelf", about = "Personal movie and series catalog with TMDB/OMDb metadata")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add a title to the catalog and fetch its metadata
    Add {
        title: String,
        #[arg(long)]
        director: Option<String>,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long, value_enum, default_value = "want-to-watch")]
        status: StatusArg,
        #[arg(long, value_parser = clap::value_parser!(i32).range(1..=10))]
        rating: Option<i32>,
        #[arg(long, default_value = "")]
        notes: String,
        /// Narrow the search to one kind of title
        #[arg(long = "type", value_enum)]
        content_type: Option<ContentTypeArg>,
    },
    /// Refresh stale metadata, or delete matching items with --delete
    Update {
        /// Process every item instead of the first --limit stale ones
        #[arg(long)]
        all: bool,
        /// Refresh even when metadata is still fresh
        #[arg(long)]
        force: bool,
        #[arg(long)]
        id: Option<i64>,
        /// Case-insensitive title fragment
        #[arg(long)]
        title: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: i64,
        #[arg(long)]
        delete: bool,
    },
    /// Print an item with its metadata
    Show { id: i64 },
    /// Edit an item's mood tags
    Tag {
        id: i64,
        #[arg(long)]
        add: Vec<String>,
        #[arg(long)]
        remove: Vec<String>,
    },
    /// Use the image at an http(s) URL as an item's poster
    Poster { id: i64, url: String },
    /// List items whose cached poster file is missing
    MissingPosters,
    /// Re-link items to posters already present in the cache
    FixPosters,
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusArg {
    WantToWatch,
    Watching,
    Watched,
    Abandoned,
}

impl From<StatusArg> for WatchStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::WantToWatch => WatchStatus::WantToWatch,
            StatusArg::Watching => WatchStatus::Watching,
            StatusArg::Watched => WatchStatus::Watched,
            StatusArg::Abandoned => WatchStatus::Abandoned,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ContentTypeArg {
    Movie,
    Series,
    Documentary,
}

impl From<ContentTypeArg> for ContentHint {
    fn from(arg: ContentTypeArg) -> Self {
        match arg {
            ContentTypeArg::Movie => ContentHint::Movie,
            ContentTypeArg::Series => ContentHint::Series,
            ContentTypeArg::Documentary => ContentHint::Documentary,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "filmshelf=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = AppConfig::load();
    config.paths.ensure_dirs().await?;
    config.log_config();

    let pool = connect(&config.database_url()).await?;
    db::migrate(&pool).await?;

    let service = MetadataService::from_config(&config)?;

    match cli.command {
        Command::Add {
            title,
            director,
            year,
            status,
            rating,
            notes,
            content_type,
        } => {
            let new_item = NewCatalogItem {
                title,
                director,
                release_year: year,
                status: status.into(),
                user_rating: rating,
                user_notes: notes,
                ..Default::default()
            };
            let hint = content_type.map(ContentHint::from);
            let (item, outcome) = commands::add_item(&pool, &service, &new_item, hint).await?;

            println!("Added #{}: {}", item.id, item);
            match outcome {
                EnrichOutcome::Updated { provenance, .. } => {
                    println!("  Metadata from {}", provenance)
                }
                _ => println!("  No metadata found"),
            }
        }
        Command::Update {
            all,
            force,
            id,
            title,
            limit,
            delete,
        } => {
            let options = UpdateOptions {
                all,
                force,
                id,
                title,
                limit,
                delete,
            };
            run_update(&pool, &service, &options).await?;
        }
        Command::Show { id } => {
            let item = db::get_item(&pool, id)
                .await?
                .with_context(|| format!("Catalog item with ID {} not found", id))?;
            print_item(&item);
        }
        Command::Tag { id, add, remove } => {
            let item = commands::edit_tags(&pool, id, &add, &remove).await?;
            let tags: Vec<&str> = item.mood_tags.iter().map(String::as_str).collect();
            println!("{}: {}", item, tags.join(", "));
        }
        Command::Poster { id, url } => {
            let item = commands::set_poster(&pool, service.posters(), id, &url).await?;
            println!("Poster updated for {}: {}", item, item.poster_url());
        }
        Command::MissingPosters => {
            let missing = commands::missing_posters(&pool, service.posters()).await?;
            for (title, path) in &missing {
                println!("Missing poster for {}: {}", title, path);
            }
            println!("Total missing posters: {}", missing.len());
        }
        Command::FixPosters => {
            tracing::info!("Looking for cached posters in {}", service.posters().cache_dir().display());
            let report = commands::fix_posters(&pool, service.posters()).await?;
            for title in &report.not_found {
                tracing::warn!("No cached poster found for '{}'", title);
            }
            println!("Fixed {} poster paths", report.fixed);
        }
    }

    Ok(())
}

async fn connect(database_url: &str) -> Result<SqlitePool> {
    tracing::debug!("Database URL: {}", database_url);

    let connect_options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(connect_options)
        .await
        .context("Failed to open catalog database")?;

    Ok(pool)
}

async fn run_update(pool: &SqlitePool, service: &MetadataService, options: &UpdateOptions) -> Result<()> {
    options.validate()?;
    let items = commands::select_items(pool, options, service.refresh_days()).await?;

    if options.delete {
        for item in &items {
            println!("Deleting: {} (ID: {})", item, item.id);
        }
        let deleted = commands::delete_selected(pool, &items).await?;
        println!("Deleted {} item(s)", deleted);
        return Ok(());
    }

    let report = commands::update_items(pool, service, items, options.force).await;
    for (item, result) in &report.items {
        match result {
            ItemResult::Updated => println!("Updated: {}", item),
            ItemResult::Skipped => println!("Skipped (fresh): {}", item),
            ItemResult::NoMatch => println!("No metadata found: {}", item),
            ItemResult::Failed(e) => println!("Failed: {}: {}", item, e),
        }
    }

    println!(
        "Updated {}, skipped {}, unmatched {}, failed {}",
        report.count(&ItemResult::Updated),
        report.count(&ItemResult::Skipped),
        report.count(&ItemResult::NoMatch),
        report.count(&ItemResult::Failed(String::new())),
    );
    Ok(())
}

fn print_item(item: &CatalogItem) {
    println!("#{} {}", item.id, item);
    println!("  Status: {}", item.status.as_str());
    println!("  Added: {}", item.created_at.format("%Y-%m-%d"));
    let directors = item.metadata.crew_for("Director");
    if !directors.is_empty() {
        println!("  Directed by: {}", directors.join(", "));
    }
    if let Some(rating) = item.user_rating {
        println!("  Your rating: {}/10", rating);
    }
    println!("  Hype score: {:.1}", item.hype_score());
    if !item.imdb_rating().is_empty() {
        println!("  IMDb: {}", item.imdb_rating());
    }
    if !item.rt_rating().is_empty() {
        println!("  Rotten Tomatoes: {}", item.rt_rating());
    }
    if !item.genres().is_empty() {
        println!("  Genres: {}", item.genres().join(", "));
    }
    let cast: Vec<&str> = item.cast().iter().take(5).map(|c| c.name.as_str()).collect();
    if !cast.is_empty() {
        println!("  Starring: {}", cast.join(", "));
    }
    if let Some(trailer) = item.metadata.trailers.iter().find_map(|t| t.watch_url()) {
        println!("  Trailer: {}", trailer);
    }
    let poster = item.poster_url();
    if !poster.is_empty() {
        println!("  Poster: {}", poster);
    }
    if !item.mood_tags.is_empty() {
        let tags: Vec<&str> = item.mood_tags.iter().map(String::as_str).collect();
        println!("  Moods: {}", tags.join(", "));
    }
    println!("  Source: {}", item.metadata.provenance);
    if !item.synopsis().is_empty() {
        println!();
        println!("{}", item.synopsis());
    }
}
