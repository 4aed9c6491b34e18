use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Milliseconds relative to [`ScheduleSet::epoch`].
pub type Millis = i64;

/// One row of an access report: `from` could see `to` during `[start, stop]`.
///
/// Connection reports read station → satellite, flyby reports read
/// area target → satellite.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessRecord {
    pub from: String,
    pub to: String,
    pub access: u64,
    pub start: NaiveDateTime,
    pub stop: NaiveDateTime,
    pub duration_secs: f64,
}

/// Interval in which a station can receive from a satellite. Bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionWindow {
    pub station: usize,
    pub satellite: usize,
    pub start: Millis,
    pub stop: Millis,
}

impl ConnectionWindow {
    pub fn duration(&self) -> Millis {
        self.stop - self.start
    }
}

/// Interval in which a satellite is over the imaging area and records data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShootingWindow {
    pub satellite: usize,
    pub start: Millis,
    pub stop: Millis,
}

impl ShootingWindow {
    pub fn duration(&self) -> Millis {
        self.stop - self.start
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SatelliteProfile {
    /// On-board storage, expressed in milliseconds of recording.
    pub memory_capacity: Millis,
    /// Downlink milliseconds needed to free one millisecond of recording.
    pub transmit_ratio: i64,
    /// Downlink rate in MB/s.
    pub bandwidth: f64,
}

/// Both input schedules indexed against a shared epoch and name tables.
#[derive(Debug, Clone)]
pub struct ScheduleSet {
    pub epoch: NaiveDateTime,
    pub station_names: Vec<String>,
    pub satellite_names: Vec<String>,
    pub connections: Vec<ConnectionWindow>,
    pub shootings: Vec<ShootingWindow>,
    pub profiles: Vec<SatelliteProfile>,
}

impl ScheduleSet {
    pub fn station_count(&self) -> usize {
        self.station_names.len()
    }

    pub fn satellite_count(&self) -> usize {
        self.satellite_names.len()
    }

    pub fn timestamp(&self, offset: Millis) -> NaiveDateTime {
        self.epoch + chrono::TimeDelta::milliseconds(offset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Shooting,
    Downlink { station: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SatelliteTransaction {
    pub activity: Activity,
    pub start: Millis,
    pub stop: Millis,
}

impl SatelliteTransaction {
    pub fn shooting(start: Millis, stop: Millis) -> Self {
        Self {
            activity: Activity::Shooting,
            start,
            stop,
        }
    }

    pub fn downlink(station: usize, start: Millis, stop: Millis) -> Self {
        Self {
            activity: Activity::Downlink { station },
            start,
            stop,
        }
    }

    pub fn duration(&self) -> Millis {
        self.stop - self.start
    }

    pub fn station(&self) -> Option<usize> {
        match self.activity {
            Activity::Downlink { station } => Some(station),
            Activity::Shooting => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StationTransaction {
    pub satellite: usize,
    pub start: Millis,
    pub stop: Millis,
}

impl StationTransaction {
    pub fn duration(&self) -> Millis {
        self.stop - self.start
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkipType {
    StationBusy,
    SatelliteBusy,
    SatelliteMemoryEmpty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkipRecord {
    pub kind: SkipType,
    pub station: usize,
    pub satellite: usize,
    pub start: Millis,
    pub stop: Millis,
}

/// Output of a resolver run. Transactions are kept per station and per satellite.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub schedules: ScheduleSet,
    pub station_transactions: Vec<Vec<StationTransaction>>,
    pub satellite_transactions: Vec<Vec<SatelliteTransaction>>,
    pub skips: Vec<SkipRecord>,
}

impl Resolution {
    pub fn downlink_sessions(&self) -> usize {
        self.station_transactions.iter().map(Vec::len).sum()
    }

    pub fn total_downlink_ms(&self) -> Millis {
        self.station_transactions
            .iter()
            .flatten()
            .map(StationTransaction::duration)
            .sum()
    }

    /// MB received by the station with the given index.
    pub fn data_received_mb(&self, station: usize) -> f64 {
        self.station_transactions[station]
            .iter()
            .map(|t| t.duration() as f64 * 0.001 * self.schedules.profiles[t.satellite].bandwidth)
            .sum()
    }
}

/// Figures reported at the end of a run and stored as `RunSummary.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub epoch: String,
    pub stations: usize,
    pub satellites: usize,
    pub connection_windows: usize,
    pub shooting_windows: usize,
    pub downlink_sessions: usize,
    pub skipped_windows: usize,
    pub total_downlink_ms: Millis,
    pub data_received_mb: f64,
    pub results_path: String,
    pub statistics_path: String,
    pub archive_path: Option<String>,
}
