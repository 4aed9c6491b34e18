use crate::domain::model::SatelliteProfile;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{Result, SatLinkError};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "satlink.toml";

const BUILTIN_CONFIG: &str = include_str!("default.toml");

pub const DEFAULT_TIME_STEP_MS: i64 = 10_000;
pub const DEFAULT_DATE_TIME_FORMAT: &str = "%-d %b %Y %H:%M:%S%.3f";
pub const DEFAULT_STATISTICS_DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";
pub const DEFAULT_CONNECTION_FILE_PREFIX: &str = "Facility-";
pub const DEFAULT_FLYBY_FILE_PREFIX: &str = "AreaTarget-Russia-To-";
pub const DEFAULT_FLEET_SPLIT: usize = 50;
pub const DEFAULT_ARCHIVE_TITLE: &str = "SatLink";
pub const DEFAULT_ENTRY_POINT: &str = "org.satlink.Main";

pub const PRIMARY_PROFILE: SatelliteProfile = SatelliteProfile {
    memory_capacity: 2_500_000,
    transmit_ratio: 4,
    bandwidth: 100.0,
};

pub const SECONDARY_PROFILE: SatelliteProfile = SatelliteProfile {
    memory_capacity: 1_250_000,
    transmit_ratio: 16,
    bandwidth: 25.0,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SatLinkConfig {
    pub input: InputConfig,
    pub resolver: Option<ResolverConfig>,
    pub output: OutputConfig,
    pub satellites: Option<SatellitesConfig>,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    pub connection_schedules_path: String,
    pub connection_file_prefix: Option<String>,
    pub flyby_schedules_path: String,
    pub flyby_file_prefix: Option<String>,
    pub date_time_format: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolverConfig {
    pub time_step_ms: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub results_path: String,
    pub statistics_path: String,
    pub statistics_date_time_format: Option<String>,
    pub archive: Option<ArchiveConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    pub enabled: bool,
    pub filename: String,
    pub title: Option<String>,
    pub entry_point: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SatellitesConfig {
    pub fleet_split: Option<usize>,
    pub primary: Option<SatelliteProfile>,
    pub secondary: Option<SatelliteProfile>,
    pub overrides: Option<Vec<ProfileOverride>>,
}

/// Profile for every satellite whose name starts with `prefix`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileOverride {
    pub prefix: String,
    pub memory_capacity: i64,
    pub transmit_ratio: i64,
    pub bandwidth: f64,
}

impl ProfileOverride {
    pub fn profile(&self) -> SatelliteProfile {
        SatelliteProfile {
            memory_capacity: self.memory_capacity,
            transmit_ratio: self.transmit_ratio,
            bandwidth: self.bandwidth,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

/// Where the active configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Explicit(PathBuf),
    Discovered(PathBuf),
    Builtin,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Explicit(path) => write!(f, "{}", path.display()),
            Self::Discovered(path) => write!(f, "{} (discovered)", path.display()),
            Self::Builtin => write!(f, "built-in defaults"),
        }
    }
}

impl SatLinkConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(SatLinkError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| SatLinkError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_CONFIG)
    }

    /// Resolves the configuration: an explicit path must load; otherwise a
    /// `satlink.toml` next to the executable, then in the working directory,
    /// then the built-in defaults. Unreadable discovered files are skipped.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, ConfigSource)> {
        if let Some(path) = explicit {
            let config = Self::from_file(path)?;
            return Ok((config, ConfigSource::Explicit(path.to_path_buf())));
        }

        let candidates: Vec<PathBuf> = [
            std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(|dir| dir.join(CONFIG_FILE_NAME))),
            std::env::current_dir()
                .ok()
                .map(|dir| dir.join(CONFIG_FILE_NAME)),
        ]
        .into_iter()
        .flatten()
        .collect();

        Self::load_from_candidates(&candidates)
    }

    /// First candidate that exists and loads; the built-in defaults otherwise.
    pub fn load_from_candidates(candidates: &[PathBuf]) -> Result<(Self, ConfigSource)> {
        for candidate in candidates {
            if !candidate.is_file() {
                continue;
            }
            tracing::info!("Configuration path: {}", candidate.display());
            match Self::from_file(candidate) {
                Ok(config) => return Ok((config, ConfigSource::Discovered(candidate.clone()))),
                Err(e) => tracing::warn!(
                    "Failed to read {}, trying next location: {}",
                    candidate.display(),
                    e
                ),
            }
        }

        Ok((Self::builtin()?, ConfigSource::Builtin))
    }

    /// Replaces `${VAR}` with the environment value; unknown variables are left as-is.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| SatLinkError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_path(
            "input.connection_schedules_path",
            &self.input.connection_schedules_path,
        )?;
        validation::validate_path("input.flyby_schedules_path", &self.input.flyby_schedules_path)?;
        validation::validate_datetime_format("input.date_time_format", self.date_time_format())?;

        validation::validate_positive_number("resolver.time_step_ms", self.time_step_ms(), 1)?;

        validation::validate_path("output.results_path", &self.output.results_path)?;
        validation::validate_path("output.statistics_path", &self.output.statistics_path)?;
        validation::validate_datetime_format(
            "output.statistics_date_time_format",
            self.statistics_date_time_format(),
        )?;

        if let Some(archive) = self.output.archive.as_ref().filter(|a| a.enabled) {
            validation::validate_file_extensions(
                "output.archive.filename",
                std::slice::from_ref(&archive.filename),
                &["zip", "jar"],
            )?;
            if let Some(title) = &archive.title {
                validation::validate_non_empty_string("output.archive.title", title)?;
            }
            if let Some(entry_point) = &archive.entry_point {
                validation::validate_non_empty_string("output.archive.entry_point", entry_point)?;
            }
        }

        let satellites = self.satellites.clone().unwrap_or_default();
        validate_profile("satellites.primary", &satellites.primary.unwrap_or(PRIMARY_PROFILE))?;
        validate_profile(
            "satellites.secondary",
            &satellites.secondary.unwrap_or(SECONDARY_PROFILE),
        )?;
        for (i, o) in satellites.overrides.iter().flatten().enumerate() {
            let field = format!("satellites.overrides[{}]", i);
            validation::validate_non_empty_string(&format!("{}.prefix", field), &o.prefix)?;
            validate_profile(&field, &o.profile())?;
        }

        Ok(())
    }

    pub fn date_time_format(&self) -> &str {
        self.input
            .date_time_format
            .as_deref()
            .unwrap_or(DEFAULT_DATE_TIME_FORMAT)
    }

    pub fn statistics_date_time_format(&self) -> &str {
        self.output
            .statistics_date_time_format
            .as_deref()
            .unwrap_or(DEFAULT_STATISTICS_DATE_TIME_FORMAT)
    }

    pub fn time_step_ms(&self) -> i64 {
        self.resolver
            .as_ref()
            .and_then(|r| r.time_step_ms)
            .unwrap_or(DEFAULT_TIME_STEP_MS)
    }

    pub fn set_time_step_ms(&mut self, step: i64) {
        self.resolver.get_or_insert_with(Default::default).time_step_ms = Some(step);
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    /// Turns on output bundling, keeping any configured archive settings.
    pub fn enable_archive(&mut self) {
        self.output
            .archive
            .get_or_insert_with(|| ArchiveConfig {
                enabled: true,
                filename: "satlink-results.zip".to_string(),
                title: None,
                entry_point: None,
            })
            .enabled = true;
    }
}

fn validate_profile(field: &str, profile: &SatelliteProfile) -> Result<()> {
    validation::validate_positive_number(
        &format!("{}.memory_capacity", field),
        profile.memory_capacity,
        1,
    )?;
    validation::validate_range(
        &format!("{}.transmit_ratio", field),
        profile.transmit_ratio,
        1,
        1_000_000,
    )?;
    if !(profile.bandwidth.is_finite() && profile.bandwidth > 0.0) {
        return Err(SatLinkError::InvalidConfigValueError {
            field: format!("{}.bandwidth", field),
            value: profile.bandwidth.to_string(),
            reason: "Bandwidth must be a positive number".to_string(),
        });
    }
    Ok(())
}

impl ConfigProvider for SatLinkConfig {
    fn connection_schedules_path(&self) -> &str {
        &self.input.connection_schedules_path
    }

    fn connection_file_prefix(&self) -> &str {
        self.input
            .connection_file_prefix
            .as_deref()
            .unwrap_or(DEFAULT_CONNECTION_FILE_PREFIX)
    }

    fn flyby_schedules_path(&self) -> &str {
        &self.input.flyby_schedules_path
    }

    fn flyby_file_prefix(&self) -> &str {
        self.input
            .flyby_file_prefix
            .as_deref()
            .unwrap_or(DEFAULT_FLYBY_FILE_PREFIX)
    }

    fn date_time_format(&self) -> &str {
        SatLinkConfig::date_time_format(self)
    }

    fn statistics_date_time_format(&self) -> &str {
        SatLinkConfig::statistics_date_time_format(self)
    }

    fn results_path(&self) -> &str {
        &self.output.results_path
    }

    fn statistics_path(&self) -> &str {
        &self.output.statistics_path
    }

    fn time_step_ms(&self) -> i64 {
        SatLinkConfig::time_step_ms(self)
    }

    fn satellite_profile(&self, index: usize, name: &str) -> SatelliteProfile {
        let Some(satellites) = &self.satellites else {
            return if index < DEFAULT_FLEET_SPLIT {
                PRIMARY_PROFILE
            } else {
                SECONDARY_PROFILE
            };
        };

        if let Some(o) = satellites
            .overrides
            .iter()
            .flatten()
            .find(|o| name.starts_with(&o.prefix))
        {
            return o.profile();
        }

        if index < satellites.fleet_split.unwrap_or(DEFAULT_FLEET_SPLIT) {
            satellites.primary.unwrap_or(PRIMARY_PROFILE)
        } else {
            satellites.secondary.unwrap_or(SECONDARY_PROFILE)
        }
    }

    fn archive_filename(&self) -> Option<&str> {
        self.output
            .archive
            .as_ref()
            .filter(|a| a.enabled)
            .map(|a| a.filename.as_str())
    }

    fn archive_title(&self) -> &str {
        self.output
            .archive
            .as_ref()
            .and_then(|a| a.title.as_deref())
            .unwrap_or(DEFAULT_ARCHIVE_TITLE)
    }

    fn archive_entry_point(&self) -> &str {
        self.output
            .archive
            .as_ref()
            .and_then(|a| a.entry_point.as_deref())
            .unwrap_or(DEFAULT_ENTRY_POINT)
    }
}

impl Validate for SatLinkConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
