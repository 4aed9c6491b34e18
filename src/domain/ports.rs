use crate::domain::model::{Resolution, RunSummary, SatelliteProfile, ScheduleSet};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// Names of the regular files directly inside `dir`, sorted.
    fn list_files(
        &self,
        dir: &str,
    ) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn connection_schedules_path(&self) -> &str;
    fn connection_file_prefix(&self) -> &str;
    fn flyby_schedules_path(&self) -> &str;
    fn flyby_file_prefix(&self) -> &str;
    fn date_time_format(&self) -> &str;
    fn statistics_date_time_format(&self) -> &str;
    fn results_path(&self) -> &str;
    fn statistics_path(&self) -> &str;
    fn time_step_ms(&self) -> i64;
    fn satellite_profile(&self, index: usize, name: &str) -> SatelliteProfile;
    /// Archive file name when outputs should be bundled after a run.
    fn archive_filename(&self) -> Option<&str>;
    fn archive_title(&self) -> &str;
    fn archive_entry_point(&self) -> &str;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<ScheduleSet>;
    async fn transform(&self, schedules: ScheduleSet) -> Result<Resolution>;
    async fn load(&self, resolution: Resolution) -> Result<RunSummary>;
}

/// Turns indexed schedules into a downlink plan.
pub trait Resolver {
    fn resolve(&self, schedules: ScheduleSet) -> Result<Resolution>;
}
