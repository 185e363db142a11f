use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use illust_sync::app::build_router;
use illust_sync::config::RetryConfig;
use illust_sync::db;
use illust_sync::remote::app_api::AppApiClient;
use illust_sync::remote::ListingKind;
use illust_sync::state::AppState;
use illust_sync::sync::filter::FilterConfig;
use illust_sync::sync::service::{SyncListing, SyncRequest, SyncService};

#[derive(Parser)]
#[command(name = "illust-sync", about = "Incremental illustration archive sync")]
struct Cli {
    /// Archive root; the database and image files live below it.
    #[arg(long, default_value = "archive")]
    output: PathBuf,

    #[command(flatten)]
    filter: FilterArgs,

    /// Item offset to resume an interrupted listing walk from.
    #[arg(long, default_value_t = 0)]
    offset: u32,

    /// Stop after this many listing pages.
    #[arg(long)]
    max_pages: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct FilterArgs {
    /// Download R-18 works too.
    #[arg(long)]
    allow_r18: bool,

    #[arg(long)]
    min_lewd_level: Option<i64>,

    #[arg(long)]
    max_lewd_level: Option<i64>,

    /// Reject works carrying this tag. Repeatable.
    #[arg(long = "filter-tag")]
    filter_tags: Vec<String>,

    /// Only accept works carrying every one of these tags. Repeatable.
    #[arg(long = "require-tag")]
    require_tags: Vec<String>,

    #[arg(long)]
    min_bookmarks: Option<i64>,

    #[arg(long)]
    max_bookmarks: Option<i64>,

    /// Reject works with more pages than this.
    #[arg(long)]
    max_filter_pages: Option<i64>,
}

impl FilterArgs {
    fn into_config(self) -> FilterConfig {
        FilterConfig {
            allow_r18: self.allow_r18,
            min_lewd_level: self.min_lewd_level,
            max_lewd_level: self.max_lewd_level,
            filter_tags: normalize(self.filter_tags),
            require_tags: normalize(self.require_tags),
            min_bookmarks: self.min_bookmarks,
            max_bookmarks: self.max_bookmarks,
            max_pages: self.max_filter_pages,
        }
    }
}

fn normalize(tags: Vec<String>) -> HashSet<String> {
    tags.into_iter().map(|t| t.to_lowercase()).collect()
}

#[derive(Subcommand)]
enum Command {
    /// Sync the authenticated user's bookmarks.
    Bookmarks,
    /// Sync new works from followed authors.
    Following,
    /// Sync one author's gallery.
    User { user_id: i64 },
    /// Sync works matching a tag search.
    Tag { tag: String },
    /// Serve the local viewer API over the archive.
    Serve {
        #[arg(long, default_value_t = 7830)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    std::fs::create_dir_all(&cli.output)?;
    let db_url = format!("sqlite:{}/illust.db", cli.output.display());
    let pool = db::init_db(&db_url).await?;

    match cli.command {
        Command::Serve { port } => {
            let state = AppState {
                pool,
                output_root: cli.output.clone(),
            };
            let app = build_router(state);

            let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
            tracing::info!("Listening on {}", listener.local_addr()?);
            axum::serve(listener, app).await?;
            Ok(())
        }
        command => {
            let kind = match command {
                Command::Bookmarks => ListingKind::Bookmarks,
                Command::Following => ListingKind::Following,
                Command::User { user_id } => ListingKind::UserGallery(user_id),
                Command::Tag { tag } => ListingKind::TagSearch(tag),
                Command::Serve { .. } => unreachable!(),
            };

            let source = Arc::new(AppApiClient::from_env()?);
            let service = SyncService::new(pool, source, RetryConfig::from_env());

            let cancel = service.cancellation_token();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Interrupt received, stopping after the current item");
                    cancel.cancel();
                }
            });

            let request = SyncRequest {
                listings: vec![SyncListing {
                    kind,
                    start_offset: cli.offset,
                }],
                filter: cli.filter.into_config(),
                output_root: cli.output.clone(),
                max_pages: cli.max_pages,
            };

            let reports = service.sync_all(&request).await;
            let mut failed = false;
            for report in &reports {
                println!(
                    "{}: {} downloaded, {} skipped, {} filtered, {} failed ({} pages)",
                    report.listing,
                    report.downloaded,
                    report.skipped_existing,
                    report.filtered,
                    report.failed,
                    report.pages
                );
                if report.quarantined > 0 {
                    println!("  {} malformed records dropped", report.quarantined);
                }
                if let Some(reason) = &report.aborted {
                    println!("  aborted: {} (resume with --offset {})", reason, report.next_offset);
                    failed = true;
                }
                if report.cancelled {
                    println!("  cancelled (resume with --offset {})", report.next_offset);
                }
            }

            if failed {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}
