use anyhow::{Context, Result};
use dashboard_service::{
    config::AppConfig,
    metrics_server,
    observability,
    pipeline::{DataContext, ViewOptions},
    server::{self, AppState},
    sources,
};
use std::{fs, sync::Arc, time::Instant};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    // Load configuration
    let cfg = AppConfig::load()?;

    // Start metrics server if configured
    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    // The workbook is read once; a load failure ends the process before the
    // server binds.
    let started = Instant::now();
    let dataset = sources::load_from_config(&cfg.dataset)
        .with_context(|| format!("failed to load dataset {}", cfg.dataset.path.display()))?;
    metrics::histogram!("dashboard_dataset_load_seconds").record(started.elapsed().as_secs_f64());

    let stylesheet = fs::read_to_string(&cfg.server.stylesheet)
        .with_context(|| format!("failed to read stylesheet {}", cfg.server.stylesheet.display()))?;

    let ctx = Arc::new(DataContext::new(dataset, &cfg.selection, &cfg.view));
    let state = AppState::new(ctx, stylesheet, ViewOptions::from_config(&cfg.view));

    server::serve(&cfg.server.bind_addr, state).await
}
