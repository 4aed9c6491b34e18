use crate::core::bundle::{ArchiveAssembler, Manifest};
use crate::core::report_parser::parse_access_report;
use crate::core::report_writer::{join, ReportWriter};
use crate::core::resolver::FifoResolver;
use crate::core::schedule::{build_schedule_set, flyby_totals};
use crate::core::{ConfigProvider, Pipeline, Resolver, Storage};
use crate::domain::model::{AccessRecord, Resolution, RunSummary, ScheduleSet};
use crate::utils::error::{Result, SatLinkError};
use std::collections::BTreeMap;
use std::path::Path;

pub const SUMMARY_FILE_NAME: &str = "RunSummary.json";

/// Indexed schedules plus each satellite's total recording time in seconds.
#[derive(Debug, Clone)]
pub struct ScheduleSurvey {
    pub schedules: ScheduleSet,
    pub recording_totals: BTreeMap<String, f64>,
}

pub struct SchedulePipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
}

impl<S: Storage, C: ConfigProvider> SchedulePipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    /// Reads and indexes both report directories without resolving.
    pub async fn survey(&self) -> Result<ScheduleSurvey> {
        let connections = self
            .read_reports(
                self.config.connection_schedules_path(),
                self.config.connection_file_prefix(),
            )
            .await?;
        let flybys = self
            .read_reports(
                self.config.flyby_schedules_path(),
                self.config.flyby_file_prefix(),
            )
            .await?;

        let schedules = build_schedule_set(&connections, &flybys, |index, name| {
            self.config.satellite_profile(index, name)
        })?;

        Ok(ScheduleSurvey {
            schedules,
            recording_totals: flyby_totals(&flybys),
        })
    }

    async fn read_reports(&self, dir: &str, prefix: &str) -> Result<Vec<AccessRecord>> {
        let names: Vec<String> = self
            .storage
            .list_files(dir)
            .await?
            .into_iter()
            .filter(|name| name.starts_with(prefix))
            .collect();

        if names.is_empty() {
            tracing::warn!("No reports starting with '{}' in {}", prefix, dir);
        }

        let mut records = Vec::new();
        for name in names {
            let path = join(dir, &name);
            tracing::debug!("Reading {}", path);
            let bytes = self.storage.read_file(&path).await?;
            let content = decode_report(bytes, &name)?;
            let parsed = parse_access_report(&content, &name, self.config.date_time_format())?;
            tracing::debug!("{}: {} access windows", name, parsed.len());
            records.extend(parsed);
        }
        Ok(records)
    }

    async fn write_archive(&self, files: &[(String, Vec<u8>)], filename: &str) -> Result<String> {
        let manifest = Manifest::new(
            self.config.archive_title(),
            env!("CARGO_PKG_VERSION"),
            self.config.archive_entry_point(),
        );
        let mut assembler = ArchiveAssembler::new(&manifest);
        let statistics_path = self.config.statistics_path();
        for (path, contents) in files {
            let name = archive_entry_name(path, statistics_path)?;
            if !assembler.add_entry(name.as_str(), contents.clone()) {
                tracing::warn!("{} is already in the archive, skipping {}", name, path);
            }
        }
        let entries = assembler.len();
        let bytes = assembler.finish()?;

        let archive_path = join(self.config.statistics_path(), filename);
        self.storage.write_file(&archive_path, &bytes).await?;
        tracing::info!("Bundled {} entries into {}", entries, archive_path);
        Ok(archive_path)
    }
}

/// Reports must be UTF-8; the error names the line holding the first bad byte.
fn decode_report(bytes: Vec<u8>, file: &str) -> Result<String> {
    String::from_utf8(bytes).map_err(|e| {
        let valid = &e.as_bytes()[..e.utf8_error().valid_up_to()];
        SatLinkError::ScheduleParseError {
            file: file.to_string(),
            line: valid.iter().filter(|&&b| b == b'\n').count() + 1,
            reason: format!("invalid UTF-8: {}", e.utf8_error()),
        }
    })
}

/// `statistics/<file>` for files written to the statistics directory,
/// `results/<file>` for everything else.
fn archive_entry_name(path: &str, statistics_path: &str) -> Result<String> {
    let path = Path::new(path);
    let file_name = path
        .file_name()
        .ok_or_else(|| SatLinkError::ArchiveError {
            message: format!("cannot bundle {}: no file name", path.display()),
        })?
        .to_string_lossy();
    let dir = if path.parent() == Some(Path::new(statistics_path)) {
        "statistics"
    } else {
        "results"
    };
    Ok(format!("{}/{}", dir, file_name))
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for SchedulePipeline<S, C> {
    async fn extract(&self) -> Result<ScheduleSet> {
        let survey = self.survey().await?;

        for (satellite, seconds) in &survey.recording_totals {
            tracing::debug!("{} records for {:.3} s", satellite, seconds);
        }
        tracing::info!(
            "Indexed {} stations, {} satellites, {} connection windows, {} shooting windows",
            survey.schedules.station_count(),
            survey.schedules.satellite_count(),
            survey.schedules.connections.len(),
            survey.schedules.shootings.len()
        );

        Ok(survey.schedules)
    }

    async fn transform(&self, schedules: ScheduleSet) -> Result<Resolution> {
        let resolver = FifoResolver::new(self.config.time_step_ms());
        resolver.resolve(schedules)
    }

    async fn load(&self, resolution: Resolution) -> Result<RunSummary> {
        let results_path = self.config.results_path();
        let statistics_path = self.config.statistics_path();

        let writer = ReportWriter::new(
            &resolution,
            self.config.date_time_format(),
            self.config.statistics_date_time_format(),
        );
        let mut written = Vec::new();
        for file in writer.render_all(results_path, statistics_path)? {
            self.storage.write_file(&file.path, &file.contents).await?;
            written.push((file.path, file.contents));
        }
        tracing::info!("Wrote {} report files", written.len());

        let archive_filename = self.config.archive_filename();
        let stations = resolution.schedules.station_count();
        let summary = RunSummary {
            epoch: resolution
                .schedules
                .epoch
                .format(self.config.statistics_date_time_format())
                .to_string(),
            stations,
            satellites: resolution.schedules.satellite_count(),
            connection_windows: resolution.schedules.connections.len(),
            shooting_windows: resolution.schedules.shootings.len(),
            downlink_sessions: resolution.downlink_sessions(),
            skipped_windows: resolution.skips.len(),
            total_downlink_ms: resolution.total_downlink_ms(),
            data_received_mb: (0..stations).map(|s| resolution.data_received_mb(s)).sum(),
            results_path: results_path.to_string(),
            statistics_path: statistics_path.to_string(),
            archive_path: archive_filename.map(|name| join(statistics_path, name)),
        };

        let summary_path = join(statistics_path, SUMMARY_FILE_NAME);
        let summary_json = serde_json::to_vec_pretty(&summary)?;
        self.storage.write_file(&summary_path, &summary_json).await?;
        written.push((summary_path, summary_json));

        if let Some(filename) = archive_filename {
            self.write_archive(&written, filename).await?;
        }

        Ok(summary)
    }
}
