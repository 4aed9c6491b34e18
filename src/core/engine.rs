use crate::core::Pipeline;
use crate::domain::model::RunSummary;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use std::time::Instant;

/// Drives a pipeline through extract, transform and load.
pub struct LinkEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> LinkEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let started = Instant::now();
        tracing::info!("Starting downlink planning");

        tracing::info!("Loading schedules...");
        let schedules = self.pipeline.extract().await?;
        self.monitor.log_stats("extract");

        tracing::info!("Resolving downlink plan...");
        let resolution = self.pipeline.transform(schedules).await?;
        tracing::info!(
            "Resolved {} downlink sessions ({} ms total)",
            resolution.downlink_sessions(),
            resolution.total_downlink_ms()
        );
        self.monitor.log_stats("transform");

        tracing::info!("Writing reports...");
        let summary = self.pipeline.load(resolution).await?;
        self.monitor.log_stats("load");

        self.monitor.log_final_stats();
        tracing::info!("Planning finished in {:.2?}", started.elapsed());
        Ok(summary)
    }
}
