//! Serve reports over HTTP until interrupted

use anyhow::{Context, Result};
use std::sync::Arc;
use topo_core::ReportGenerator;
use topo_web::{ServerConfig, TopologyServer};
use tracing::info;

pub async fn serve_topology(generator: Arc<ReportGenerator>, config: ServerConfig) -> Result<()> {
    let bind_target = config.bind_target();
    info!(
        "Serving {} on http://{} (refresh {}s)",
        generator.config().config_path.display(),
        bind_target,
        config.refresh_secs
    );

    TopologyServer::new(config, generator)
        .serve()
        .await
        .with_context(|| format!("Topology server on {} failed", bind_target))
}
