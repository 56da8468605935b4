//! marketcache - tiered market-data cache for the token dashboard
//!
//! Serves dashboard data from a memory + file cache, fetching from Ave.ai and
//! DexScreener on a miss, and refreshes the shared categories on demand or on
//! a timer. Output is JSON on stdout; logs go to stderr.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use marketcache::cache::CacheCategory;
use marketcache::cli::{Cli, Command};
use marketcache::config::Settings;
use marketcache::error::ApiError;
use marketcache::refresh::{RefreshConfig, RefreshHandle, RefreshMessage};
use marketcache::response::ApiResponse;

/// Initialize the tracing subscriber for logging.
///
/// Log level is controlled by:
/// 1. `--debug` flag sets level to DEBUG
/// 2. `RUST_LOG` environment variable (if set)
/// 3. Default is INFO
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("marketcache=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("marketcache=info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Prints an envelope and maps its `success` flag to the exit code
fn respond<T: Serialize>(response: ApiResponse<T>) -> Result<ExitCode, Box<dyn std::error::Error>> {
    print_json(&response)?;
    Ok(if response.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    debug!("marketcache starting with args: {:?}", cli);

    let mut settings = Settings::from_env();
    if let Some(dir) = &cli.cache_dir {
        settings = settings.with_cache_dir(dir);
    }

    match cli.command {
        Command::Status => {
            let cache = settings.cache();
            // A fresh process has an empty memory tier; pull fresh files in first.
            for category in CacheCategory::ALL {
                cache.get::<Value>(category.as_str()).await;
            }
            print_json(&cache.status())?;
            Ok(ExitCode::SUCCESS)
        }

        Command::Get { key, stale } => {
            let cache = settings.cache();
            let now = cache.now_millis();

            let response = if stale {
                cache.get_entry::<Value>(&key).await.map(|entry| {
                    if entry.is_expired {
                        ApiResponse::stale(entry.data, "entry is older than its TTL", entry.cached_at, now)
                    } else {
                        ApiResponse::ok(entry.data, now)
                    }
                })
            } else {
                cache
                    .get::<Value>(&key)
                    .await
                    .map(|data| ApiResponse::ok(data, now))
            };

            respond(response.unwrap_or_else(|| {
                let err = ApiError::NotFound(format!("no cached entry for {}", key));
                ApiResponse::failure(&err, Value::Null, now)
            }))
        }

        Command::Refresh { category } => {
            let service = settings.service()?;
            let refresher = service.refresher();
            let now = service.cache().now_millis();

            match category {
                Some(category) => {
                    let outcome = json!({ "category": category });
                    match refresher.refresh_category(category.as_str()).await {
                        Ok(()) => respond(ApiResponse::ok(outcome, now)),
                        Err(e) => respond(ApiResponse::failure(&e, outcome, now)),
                    }
                }
                None => {
                    let summary = refresher.refresh_all().await;
                    let mut response = ApiResponse::ok(summary, now);
                    response.success = summary.succeeded > 0 || summary.total == 0;
                    respond(response)
                }
            }
        }

        Command::Watch { interval_secs } => {
            let service = settings.service()?;
            let config = RefreshConfig {
                interval: Duration::from_secs(interval_secs.max(1)),
                enabled: true,
            };
            info!("Refreshing every {:?}; press Ctrl-C to stop", config.interval);

            let mut handle = RefreshHandle::spawn(service.refresher().clone(), config);
            loop {
                tokio::select! {
                    message = handle.recv() => match message {
                        Some(RefreshMessage::RefreshStarted) => debug!("Refresh run started"),
                        Some(RefreshMessage::RefreshCompleted(summary)) => print_json(&summary)?,
                        None => break,
                    },
                    _ = tokio::signal::ctrl_c() => {
                        info!("Interrupted, stopping refresh loop");
                        break;
                    }
                }
            }
            handle.shutdown().await;
            Ok(ExitCode::SUCCESS)
        }

        Command::Home => respond(settings.service()?.home().await),
        Command::Boosts => respond(settings.service()?.token_boosts().await),
        Command::Topics => respond(settings.service()?.topics().await),
        Command::Tokens { topic } => respond(settings.service()?.tokens(&topic).await),
        Command::Details { address, chain } => {
            respond(settings.service()?.token_details(&address, &chain).await)
        }
        Command::Search { keyword, chain } => {
            respond(settings.service()?.search(&keyword, chain.as_deref()).await)
        }
        Command::Kline {
            address,
            chain,
            interval,
            limit,
            offset,
        } => respond(
            settings
                .service()?
                .kline(&address, &chain, &interval, limit, offset)
                .await,
        ),
        Command::Prices { ids } => respond(settings.service()?.prices(&ids).await),
    }
}
