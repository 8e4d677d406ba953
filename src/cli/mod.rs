//! Command-line interface for plarchive.
//!
//! Provides commands for archiving a playlist, inspecting an archive,
//! listing past runs and showing the resolved configuration.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use crate::adapters::YouTubeClient;
use crate::config::{self, ResolvedConfig};
use crate::core::{ArchiveReport, ArchiveRequest, Archiver};
use crate::domain::{normalize_status, Item, Status};
use crate::storage::{archive_key, StorageBackend};

/// plarchive - archive playlist contents and catch deletions over time
#[derive(Parser, Debug)]
#[command(name = "plarchive")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch a playlist and update its archive
    Archive {
        /// Playlist id or URL
        playlist: String,

        /// Archive under this title instead of the playlist's own
        #[arg(short = 't', long)]
        title: Option<String>,

        /// Fetch these video ids/URLs instead of listing the playlist
        #[arg(short = 'u', long = "video-url")]
        video_urls: Vec<String>,

        /// Reuse a listing cached within the last day
        #[arg(long)]
        use_cache: bool,

        /// Storage backend (defaults to the configured one)
        #[arg(short, long, value_enum)]
        backend: Option<BackendArg>,
    },

    /// List archived items
    Show {
        /// Playlist title the archive is stored under
        title: String,

        /// Only show items with this status
        #[arg(short, long)]
        status: Option<String>,

        /// Maximum number of items to show
        #[arg(short, long, default_value = "50")]
        limit: usize,

        /// Storage backend (defaults to the configured one)
        #[arg(short, long, value_enum)]
        backend: Option<BackendArg>,
    },

    /// List recent archive runs
    History {
        /// Maximum number of runs to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Show resolved configuration (debug)
    Config,
}

/// Storage backend for CLI (maps to StorageBackend)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum BackendArg {
    /// One JSON file per playlist
    Json,

    /// Shared SQLite database
    Sqlite,
}

impl From<BackendArg> for StorageBackend {
    fn from(b: BackendArg) -> Self {
        match b {
            BackendArg::Json => StorageBackend::Json,
            BackendArg::Sqlite => StorageBackend::Sqlite,
        }
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let cfg = config::load_config()?;

        match self.command {
            Commands::Archive {
                playlist,
                title,
                video_urls,
                use_cache,
                backend,
            } => {
                let request = ArchiveRequest {
                    playlist,
                    title,
                    item_urls: video_urls,
                };
                archive(&cfg, request, use_cache, backend, self.verbose).await
            }
            Commands::Show {
                title,
                status,
                limit,
                backend,
            } => show_archive(&cfg, &title, status, limit, backend).await,
            Commands::History { limit } => list_history(&cfg, limit).await,
            Commands::Config => show_config(&cfg),
        }
    }
}

/// Run one archive update
async fn archive(
    cfg: &ResolvedConfig,
    request: ArchiveRequest,
    use_cache: bool,
    backend: Option<BackendArg>,
    verbose: bool,
) -> Result<()> {
    let client = YouTubeClient::new(cfg.youtube_config()?);
    let archiver = Archiver::new(
        client,
        cfg.store_settings(backend.map(Into::into)),
        cfg.url_cache(),
        cfg.history(),
    )
    .with_cache(use_cache);

    let report = archiver.run(request).await?;
    print_report(&report, verbose);

    Ok(())
}

fn print_report(report: &ArchiveReport, verbose: bool) {
    let reconciliation = &report.reconciliation;

    println!("Playlist: {} ({})", report.playlist_title, report.playlist_id);
    println!("Archive:  {}", report.archive_location);
    println!(
        "Items:    {} ({} new)",
        reconciliation.merged.len(),
        reconciliation.added.len()
    );
    println!("Updates:\n{}", reconciliation.counts);

    if verbose {
        if !reconciliation.changes.is_empty() {
            println!("\nChanges:");
            for change in &reconciliation.changes {
                println!(
                    "  {:<14} {:<12} -> {:<12} {}",
                    change.id, change.from, change.to, change.title
                );
            }
        }
        if !reconciliation.added.is_empty() {
            println!("\nAdded:");
            for id in &reconciliation.added {
                let title = reconciliation
                    .merged
                    .get(id)
                    .map(|item| item.title.as_str())
                    .unwrap_or_default();
                println!("  {:<14} {}", id, title);
            }
        }
    }
}

/// List archived items
async fn show_archive(
    cfg: &ResolvedConfig,
    title: &str,
    status: Option<String>,
    limit: usize,
    backend: Option<BackendArg>,
) -> Result<()> {
    let store = cfg
        .store_settings(backend.map(Into::into))
        .open(&archive_key(title));
    let snapshot = store
        .load()
        .await
        .with_context(|| format!("Failed to load archive: {}", store.location()))?;

    if snapshot.is_empty() {
        println!("No archive found at {}", store.location());
        return Ok(());
    }

    let filter = status.as_deref().map(status_filter);
    let items: Vec<&Item> = snapshot
        .iter()
        .filter(|item| filter.as_ref().map_or(true, |s| &item.status == s))
        .collect();

    println!("{:<14} {:<12} {:<50}", "ID", "STATUS", "TITLE");
    println!("{}", "-".repeat(78));

    for item in items.iter().take(limit) {
        println!(
            "{:<14} {:<12} {:<50}",
            item.id,
            item.status.as_str(),
            truncate(&item.title, 50)
        );
    }

    println!("\nShowing {} of {} matching items", items.len().min(limit), items.len());
    println!("By status:");
    for (status, count) in snapshot.count_by_status() {
        println!("  {}: {}", status, count);
    }

    Ok(())
}

/// List recent archive runs
async fn list_history(cfg: &ResolvedConfig, limit: usize) -> Result<()> {
    let runs = cfg.history().recent(limit).await?;

    if runs.is_empty() {
        println!("No runs found");
        return Ok(());
    }

    println!(
        "{:<26} {:<30} {:>6} {:>5} {:>8} {:>8} {:>12}",
        "CHECKED", "PLAYLIST", "ITEMS", "NEW", "REMOVED", "PRIVATE", "UNAVAILABLE"
    );
    println!("{}", "-".repeat(101));

    for run in runs {
        println!(
            "{:<26} {:<30} {:>6} {:>5} {:>8} {:>8} {:>12}",
            run.checked_at.format("%Y-%m-%d %H:%M:%S UTC"),
            truncate(&run.playlist_title, 30),
            run.total_items,
            run.added,
            run.counts.removed,
            run.counts.private,
            run.counts.unavailable
        );
    }

    Ok(())
}

/// Show the resolved configuration (for debugging)
fn show_config(cfg: &ResolvedConfig) -> Result<()> {
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:     {}", cfg.home.display());
    println!("  Archives: {}", cfg.archives.display());
    println!("  Cache:    {}", cfg.cache_dir().display());
    println!("  History:  {}", cfg.history_path().display());
    println!();
    println!("API:");
    println!("  Base URL: {}", cfg.base_url);
    println!(
        "  Key:      {}",
        if cfg.api_key.is_some() {
            "from PLARCHIVE_API_KEY".to_string()
        } else {
            format!("from {}", cfg.key_file.display())
        }
    );
    println!();
    println!("Fetch:");
    println!("  Concurrency:  {}", cfg.fetch.concurrency);
    println!("  Page size:    {}", cfg.fetch.max_results);
    println!("  Max attempts: {}", cfg.fetch.retry.max_attempts);
    println!("  Cache max age: {}s", cfg.cache_max_age.as_secs());
    println!();
    println!("Storage:");
    println!("  Backend:      {}", cfg.backend);
    println!("  Upsert field: {}", cfg.upsert_field.column());

    Ok(())
}

/// Accept source vocabulary (`public`, `unlisted`) as well as archive statuses
fn status_filter(raw: &str) -> Status {
    normalize_status(raw.trim(), "")
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let head: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exactly ten", 11), "exactly ten");
        assert_eq!(truncate("ééééééé", 5), "éé...");
    }

    #[test]
    fn test_status_filter_understands_source_terms() {
        assert_eq!(status_filter("public"), Status::Available);
        assert_eq!(status_filter("unlisted"), Status::Available);
        assert_eq!(status_filter("private"), Status::Private);
        assert_eq!(status_filter(" removed "), Status::Removed);
        assert_eq!(status_filter("blocked"), Status::Raw("blocked".to_string()));
    }

    #[test]
    fn test_parse_archive_command() {
        let cli = Cli::try_parse_from([
            "plarchive",
            "archive",
            "https://www.youtube.com/playlist?list=PL123",
            "-t",
            "Favorites",
            "-u",
            "abc",
            "-u",
            "def",
            "--backend",
            "sqlite",
            "-v",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Commands::Archive {
                playlist,
                title,
                video_urls,
                use_cache,
                backend,
            } => {
                assert_eq!(playlist, "https://www.youtube.com/playlist?list=PL123");
                assert_eq!(title.as_deref(), Some("Favorites"));
                assert_eq!(video_urls, vec!["abc", "def"]);
                assert!(!use_cache);
                assert!(matches!(backend, Some(BackendArg::Sqlite)));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
