use crate::domain::model::{Millis, Resolution, SkipType};
use crate::utils::error::{Result, SatLinkError};
use crate::utils::validation::validate_datetime_format;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;

/// A rendered output file, addressed by its storage path.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFile {
    pub path: String,
    pub contents: Vec<u8>,
}

pub struct ReportWriter<'a> {
    resolution: &'a Resolution,
    date_time_format: &'a str,
    statistics_date_time_format: &'a str,
}

const STATION_STATS_HEADER: [&str; 4] =
    ["StationId", "ReceiveTime", "TimeLimit", "SatellitesNumber"];
const WINDOW_HEADER: [&str; 5] = [
    "StationId",
    "SatelliteId",
    "StartTime(UTC)",
    "StopTime(UTC)",
    "Duration(ms)",
];
const SHOOTING_HEADER: [&str; 4] = [
    "SatelliteId",
    "StartTime(UTC)",
    "StopTime(UTC)",
    "Duration(ms)",
];
const SATELLITE_TRANSACTION_HEADER: [&str; 9] = [
    "StationId",
    "SatelliteId",
    "StartTime(UTC)",
    "StopTime(UTC)",
    "Duration(ms)",
    "MemoryOnStart(ms)",
    "MemoryOnStop(ms)",
    "SentAmount(ms)",
    "IdleTime(ms)",
];
const SKIP_HEADER: [&str; 6] = [
    "SkipType",
    "StationId",
    "SatelliteId",
    "StartTime(UTC)",
    "StopTime(UTC)",
    "Duration(ms)",
];
const DATA_AMOUNT_HEADER: [&str; 2] = ["Station name", "Received amount(MB)"];

#[derive(Serialize)]
struct StationStatsRow {
    station_id: usize,
    receive_time: Millis,
    time_limit: Millis,
    satellites_number: usize,
}

#[derive(Serialize)]
struct WindowRow {
    station_id: usize,
    satellite_id: usize,
    start_time: String,
    stop_time: String,
    duration: Millis,
}

#[derive(Serialize)]
struct ShootingRow {
    satellite_id: usize,
    start_time: String,
    stop_time: String,
    duration: Millis,
}

#[derive(Serialize)]
struct SatelliteTransactionRow {
    station_id: Option<usize>,
    satellite_id: usize,
    start_time: String,
    stop_time: String,
    duration: Millis,
    memory_on_start: Millis,
    memory_on_stop: Millis,
    sent_amount: Millis,
    idle_time: Millis,
}

#[derive(Serialize)]
struct SkipRow {
    skip_type: SkipType,
    station_id: usize,
    satellite_id: usize,
    start_time: String,
    stop_time: String,
    duration: Millis,
}

#[derive(Serialize)]
struct DataAmountRow<'a> {
    station_name: &'a str,
    received: String,
}

impl<'a> ReportWriter<'a> {
    pub fn new(
        resolution: &'a Resolution,
        date_time_format: &'a str,
        statistics_date_time_format: &'a str,
    ) -> Self {
        Self {
            resolution,
            date_time_format,
            statistics_date_time_format,
        }
    }

    /// Renders station schedules under `results_path` and statistics under `statistics_path`.
    pub fn render_all(&self, results_path: &str, statistics_path: &str) -> Result<Vec<RenderedFile>> {
        validate_datetime_format("date_time_format", self.date_time_format)?;
        validate_datetime_format("statistics_date_time_format", self.statistics_date_time_format)?;

        let mut files = Vec::new();

        for (station, name) in self.resolution.schedules.station_names.iter().enumerate() {
            files.push(RenderedFile {
                path: join(results_path, &format!("{}-Schedule.txt", name)),
                contents: self.station_schedule(station).into_bytes(),
            });
        }

        let statistics = [
            ("StationStats.csv", self.station_stats()?),
            ("StationsSchedules.csv", self.stations_schedules()?),
            ("ShootingSchedules.csv", self.shooting_schedules()?),
            ("StationTransactions.csv", self.station_transactions()?),
            ("SatelliteTransactions.csv", self.satellite_transactions()?),
            ("SkipWindowStats.csv", self.skip_window_stats()?),
            ("StationDataAmountReceived.csv", self.station_data_amount()?),
        ];
        for (name, contents) in statistics {
            files.push(RenderedFile {
                path: join(statistics_path, name),
                contents,
            });
        }

        Ok(files)
    }

    pub fn station_schedule(&self, station: usize) -> String {
        let schedules = &self.resolution.schedules;
        let name = &schedules.station_names[station];

        let mut text = String::new();
        text.push_str(name);
        text.push('\n');
        text.push_str("-------------------------\n");
        text.push_str(
            "Start Time (UTCG) * Stop Time (UTCG) * Duration (sec) * Satname * Data (Mbytes)\n",
        );
        for t in &self.resolution.station_transactions[station] {
            let duration = t.duration() as f64 * 0.001;
            let data = schedules.profiles[t.satellite].bandwidth * duration;
            text.push_str(&format!(
                "{:>30}{:>30}{:>30.3}{:>30}{:>30.3}\n",
                self.main_time(t.start),
                self.main_time(t.stop),
                duration,
                schedules.satellite_names[t.satellite],
                data
            ));
        }
        text
    }

    fn station_stats(&self) -> Result<Vec<u8>> {
        let limits = self.receive_time_limits();
        let rows = self
            .resolution
            .station_transactions
            .iter()
            .enumerate()
            .map(|(station, log)| StationStatsRow {
                station_id: station,
                receive_time: log.iter().map(|t| t.duration()).sum(),
                time_limit: limits[station],
                satellites_number: log.iter().map(|t| t.satellite).collect::<HashSet<_>>().len(),
            });
        write_csv(&STATION_STATS_HEADER, rows)
    }

    /// Total time each station has any satellite in view, overlapping windows counted once.
    pub fn receive_time_limits(&self) -> Vec<Millis> {
        let schedules = &self.resolution.schedules;
        let mut per_station: Vec<Vec<(Millis, Millis)>> = vec![Vec::new(); schedules.station_count()];
        for w in &schedules.connections {
            per_station[w.station].push((w.start, w.stop));
        }

        per_station
            .into_iter()
            .map(|mut windows| {
                windows.sort_unstable();
                let mut total = 0;
                let mut current: Option<(Millis, Millis)> = None;
                for (start, stop) in windows {
                    current = match current {
                        Some((s, e)) if start <= e => Some((s, e.max(stop))),
                        Some((s, e)) => {
                            total += e - s;
                            Some((start, stop))
                        }
                        None => Some((start, stop)),
                    };
                }
                if let Some((s, e)) = current {
                    total += e - s;
                }
                total
            })
            .collect()
    }

    fn stations_schedules(&self) -> Result<Vec<u8>> {
        let rows = self.resolution.schedules.connections.iter().map(|w| WindowRow {
            station_id: w.station,
            satellite_id: w.satellite,
            start_time: self.stats_time(w.start),
            stop_time: self.stats_time(w.stop),
            duration: w.duration(),
        });
        write_csv(&WINDOW_HEADER, rows)
    }

    fn shooting_schedules(&self) -> Result<Vec<u8>> {
        let rows = self.resolution.schedules.shootings.iter().map(|s| ShootingRow {
            satellite_id: s.satellite,
            start_time: self.stats_time(s.start),
            stop_time: self.stats_time(s.stop),
            duration: s.duration(),
        });
        write_csv(&SHOOTING_HEADER, rows)
    }

    fn station_transactions(&self) -> Result<Vec<u8>> {
        let rows = self
            .resolution
            .station_transactions
            .iter()
            .enumerate()
            .flat_map(|(station, log)| {
                log.iter().map(move |t| WindowRow {
                    station_id: station,
                    satellite_id: t.satellite,
                    start_time: self.stats_time(t.start),
                    stop_time: self.stats_time(t.stop),
                    duration: t.duration(),
                })
            });
        write_csv(&WINDOW_HEADER, rows)
    }

    /// Replays each satellite's log, tracking stored data and recording lost to a full memory.
    fn satellite_transactions(&self) -> Result<Vec<u8>> {
        let mut rows = Vec::new();
        for (satellite, log) in self.resolution.satellite_transactions.iter().enumerate() {
            let profile = self.resolution.schedules.profiles[satellite];
            let mut memory_on_stop: Millis = 0;
            for t in log {
                let memory_on_start = memory_on_stop;
                let sent_amount = match t.station() {
                    Some(_) => t.duration() / profile.transmit_ratio,
                    None => 0,
                };
                memory_on_stop = match t.station() {
                    Some(_) => memory_on_stop - sent_amount,
                    None => memory_on_stop + t.duration(),
                }
                .max(0);

                let mut idle_time = 0;
                if memory_on_stop > profile.memory_capacity {
                    idle_time = memory_on_stop - profile.memory_capacity;
                    memory_on_stop = profile.memory_capacity;
                }

                rows.push(SatelliteTransactionRow {
                    station_id: t.station(),
                    satellite_id: satellite,
                    start_time: self.stats_time(t.start),
                    stop_time: self.stats_time(t.stop),
                    duration: t.duration(),
                    memory_on_start,
                    memory_on_stop,
                    sent_amount,
                    idle_time,
                });
            }
        }
        write_csv(&SATELLITE_TRANSACTION_HEADER, rows)
    }

    fn skip_window_stats(&self) -> Result<Vec<u8>> {
        let rows = self.resolution.skips.iter().map(|s| SkipRow {
            skip_type: s.kind,
            station_id: s.station,
            satellite_id: s.satellite,
            start_time: self.stats_time(s.start),
            stop_time: self.stats_time(s.stop),
            duration: s.stop - s.start,
        });
        write_csv(&SKIP_HEADER, rows)
    }

    fn station_data_amount(&self) -> Result<Vec<u8>> {
        let rows = self
            .resolution
            .schedules
            .station_names
            .iter()
            .enumerate()
            .map(|(station, name)| DataAmountRow {
                station_name: name,
                received: format!("{:.3}", self.resolution.data_received_mb(station)),
            });
        write_csv(&DATA_AMOUNT_HEADER, rows)
    }

    fn main_time(&self, offset: Millis) -> String {
        self.resolution
            .schedules
            .timestamp(offset)
            .format(self.date_time_format)
            .to_string()
    }

    fn stats_time(&self, offset: Millis) -> String {
        self.resolution
            .schedules
            .timestamp(offset)
            .format(self.statistics_date_time_format)
            .to_string()
    }
}

fn write_csv<R, I>(header: &[&str], rows: I) -> Result<Vec<u8>>
where
    R: Serialize,
    I: IntoIterator<Item = R>,
{
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(header)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| SatLinkError::IoError(e.into_error()))
}

pub(crate) fn join(dir: &str, name: &str) -> String {
    Path::new(dir).join(name).to_string_lossy().into_owned()
}
