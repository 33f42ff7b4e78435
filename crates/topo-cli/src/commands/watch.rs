//! Regenerate the JSON document on a fixed interval

use anyhow::Result;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use topo_core::ReportGenerator;
use tracing::{debug, info, warn};

/// Outcome counts of a watch loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchSummary {
    pub cycles: u64,
    pub failures: u64,
}

/// Poll until Ctrl-C
pub async fn watch_topology(generator: &ReportGenerator, output_file: &Path, interval: Duration) -> Result<()> {
    let summary = watch_until(generator, output_file, interval, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await;

    info!(
        "Stopped after {} cycles ({} failed)",
        summary.cycles, summary.failures
    );
    Ok(())
}

/// Run a cycle on every tick until `shutdown` resolves. A failed cycle is
/// logged and skipped; the previous output file stays in place.
pub async fn watch_until<F>(
    generator: &ReportGenerator,
    output_file: &Path,
    interval: Duration,
    shutdown: F,
) -> WatchSummary
where
    F: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    info!(
        "Writing {} every {:?}",
        output_file.display(),
        interval
    );

    let mut summary = WatchSummary::default();
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                summary.cycles += 1;
                match generator.generate_to_file(output_file).await {
                    Ok(report) => debug!(
                        "Cycle {}: {} slots, {} placeholders",
                        summary.cycles,
                        report.topology.cell_count(),
                        report.topology.placeholder_count()
                    ),
                    Err(e) => {
                        summary.failures += 1;
                        warn!(
                            "Skipping cycle {} ({}, retryable: {}): {}",
                            summary.cycles,
                            e.category(),
                            e.is_retryable(),
                            e
                        );
                    }
                }
            }
        }
    }
    summary
}
