use anyhow::Context;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trendy_core::{
    apply_request_filters, render_trend, EpisodeSet, RecordStore, RenderedTrend,
    RequestContext, Schema, TrendConfig, TrendRegistry,
};

/// Dashboard runner
///
/// Loads a record store, replays the drill-down filters carried by the request path,
/// evaluates every configured trend and prints the dashboard as JSON. Trends are
/// evaluated concurrently on the blocking pool and printed in selector order.
///
/// # Environment Variables
/// - `TRENDY_STORE`: record store JSON (required)
/// - `TRENDY_SELECTORS`: comma-separated trend selectors (required)
/// - `TRENDY_SCHEMA`: subrecord schema YAML (default: built-in schema)
/// - `TRENDY_CONFIG`: trend configuration YAML (default: built-in boundaries)
/// - `TRENDY_REQUEST_PATH`: request path with drill-down filters (default: "/")
///
/// # Returns
/// * `Ok(())` - If every trend was evaluated and printed
/// * `Err(anyhow::Error)` - If loading or any trend evaluation fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("trendy_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let store_path: PathBuf = std::env::var("TRENDY_STORE")
        .context("TRENDY_STORE must point at a record store JSON file")?
        .into();
    let selectors: Vec<String> = std::env::var("TRENDY_SELECTORS")
        .context("TRENDY_SELECTORS must list trend selectors")?
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    let request_path = std::env::var("TRENDY_REQUEST_PATH").unwrap_or_else(|_| "/".into());

    let schema = match std::env::var("TRENDY_SCHEMA") {
        Ok(path) => Schema::load(Path::new(&path))
            .with_context(|| format!("loading schema from {path}"))?,
        Err(_) => Schema::opal_default()?,
    };
    let config = match std::env::var("TRENDY_CONFIG") {
        Ok(path) => TrendConfig::load(Path::new(&path))
            .with_context(|| format!("loading trend configuration from {path}"))?,
        Err(_) => TrendConfig::default(),
    };

    let registry = Arc::new(TrendRegistry::builtin(Arc::new(schema), Arc::new(config))?);
    let request = RequestContext::new(request_path);

    let store = RecordStore::load(&store_path)
        .with_context(|| format!("loading record store from {}", store_path.display()))?;
    let all = EpisodeSet::all(Arc::new(store));

    let drill = apply_request_filters(&registry, &request, &all)?;
    tracing::info!(
        "++ Rendering {} trends over {} of {} episodes",
        selectors.len(),
        drill.episodes.count(),
        all.count()
    );

    let handles: Vec<_> = selectors
        .into_iter()
        .map(|token| {
            let registry = Arc::clone(&registry);
            let request = request.clone();
            let episodes = drill.episodes.clone();
            tokio::task::spawn_blocking(move || {
                render_trend(&registry, &request, &episodes, &token)
                    .with_context(|| format!("rendering trend {token}"))
            })
        })
        .collect();

    let mut trends: Vec<RenderedTrend> = Vec::with_capacity(handles.len());
    for handle in handles {
        trends.push(handle.await??);
    }

    let dashboard = serde_json::json!({
        "path": request.full_path(),
        "filters": drill.applied,
        "trends": trends,
    });
    println!("{}", serde_json::to_string_pretty(&dashboard)?);

    Ok(())
}
