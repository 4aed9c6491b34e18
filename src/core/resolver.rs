use crate::core::integrity;
use crate::domain::model::{
    ConnectionWindow, Millis, Resolution, SatelliteProfile, SatelliteTransaction, ScheduleSet,
    SkipRecord, SkipType, StationTransaction,
};
use crate::domain::ports::Resolver;
use crate::utils::error::Result;

/// Greedy first-come-first-served planner.
///
/// Connection windows are cut into slices of at most `time_step` and taken in
/// start order. Each slice is granted to its station/satellite pair from the
/// moment both are free, for as long as the satellite has recorded data to
/// send. A satellite stops recording while it transmits.
#[derive(Debug, Clone)]
pub struct FifoResolver {
    time_step: Millis,
}

impl FifoResolver {
    pub fn new(time_step: Millis) -> Self {
        Self { time_step }
    }
}

impl Resolver for FifoResolver {
    fn resolve(&self, mut schedules: ScheduleSet) -> Result<Resolution> {
        integrity::check_input_doubles(&schedules)?;

        sort_connections(&mut schedules.connections);
        schedules.shootings.sort_by_key(|s| (s.satellite, s.start));

        let slices = quantize(&schedules.connections, self.time_step);
        tracing::debug!(
            "Quantized {} connection windows into {} slices (step {} ms)",
            schedules.connections.len(),
            slices.len(),
            self.time_step
        );

        let mut satellite_transactions = init_satellite_transactions(&schedules);
        let mut station_transactions: Vec<Vec<StationTransaction>> =
            vec![Vec::new(); schedules.station_count()];
        let mut skips = Vec::new();

        for slice in &slices {
            let station_log = &mut station_transactions[slice.station];
            let satellite_log = &mut satellite_transactions[slice.satellite];

            let station_time = station_free_at(station_log, slice.start);
            let satellite_time = satellite_free_at(satellite_log, slice.start);
            let current = slice.start.max(station_time).max(satellite_time);

            if slice.stop <= current {
                if slice.stop <= station_time {
                    skips.push(skip(SkipType::StationBusy, slice));
                }
                if slice.stop <= satellite_time {
                    skips.push(skip(SkipType::SatelliteBusy, slice));
                }
                continue;
            }

            let profile = schedules.profiles[slice.satellite];
            let backlog = memory_usage(satellite_log, current, &profile) * profile.transmit_ratio;
            let length = (slice.stop - current).min(backlog);
            if length <= 0 {
                skips.push(skip(SkipType::SatelliteMemoryEmpty, slice));
                continue;
            }

            let stop = current + length;
            station_log.push(StationTransaction {
                satellite: slice.satellite,
                start: current,
                stop,
            });
            add_satellite_downlink(satellite_log, slice.station, current, stop);
        }

        let resolution = Resolution {
            schedules,
            station_transactions,
            satellite_transactions,
            skips,
        };

        integrity::verify(&resolution)?;

        tracing::info!(
            "Planned {} downlink sessions, skipped {} slices",
            resolution.downlink_sessions(),
            resolution.skips.len()
        );
        Ok(resolution)
    }
}

pub(crate) fn sort_connections(windows: &mut [ConnectionWindow]) {
    windows.sort_by_key(|w| (w.start, w.stop));
}

/// Cuts windows of `2 * step` or more into `step`-long slices. The last slice
/// absorbs the remainder, so it is between `step` and `2 * step` long.
pub(crate) fn quantize(windows: &[ConnectionWindow], step: Millis) -> Vec<ConnectionWindow> {
    if step <= 0 {
        return windows.to_vec();
    }

    let mut slices = Vec::with_capacity(windows.len());
    for window in windows {
        let mut duration = window.duration();
        if duration < 2 * step {
            slices.push(*window);
            continue;
        }

        let mut start = window.start;
        while duration > 2 * step {
            slices.push(ConnectionWindow {
                start,
                stop: start + step - 1,
                ..*window
            });
            start += step;
            duration -= step;
        }
        slices.push(ConnectionWindow { start, ..*window });
    }

    sort_connections(&mut slices);
    slices
}

fn init_satellite_transactions(schedules: &ScheduleSet) -> Vec<Vec<SatelliteTransaction>> {
    let mut transactions = vec![Vec::new(); schedules.satellite_count()];
    for shooting in &schedules.shootings {
        transactions[shooting.satellite]
            .push(SatelliteTransaction::shooting(shooting.start, shooting.stop));
    }
    transactions
}

fn station_free_at(log: &[StationTransaction], earliest: Millis) -> Millis {
    log.last().map_or(earliest, |t| t.stop + 1)
}

fn satellite_free_at(log: &[SatelliteTransaction], earliest: Millis) -> Millis {
    log.iter()
        .rev()
        .find(|t| t.station().is_some())
        .map_or(earliest, |t| t.stop + 1)
}

/// Recorded-but-unsent data at `current`, in milliseconds of recording.
///
/// Recording is clamped to the memory capacity; each downlink millisecond
/// frees `1 / transmit_ratio` of a recording millisecond.
pub(crate) fn memory_usage(
    log: &[SatelliteTransaction],
    current: Millis,
    profile: &SatelliteProfile,
) -> Millis {
    let mut used = 0;
    for t in log {
        if t.start >= current {
            break;
        }
        let elapsed = if t.stop < current {
            t.duration()
        } else {
            current - t.start
        };
        match t.station() {
            None => used = (used + elapsed).min(profile.memory_capacity),
            Some(_) => used -= elapsed / profile.transmit_ratio,
        }
    }
    used
}

/// Inserts a downlink, carving any overlapping activity out of `[start, stop]`.
pub(crate) fn add_satellite_downlink(
    log: &mut Vec<SatelliteTransaction>,
    station: usize,
    start: Millis,
    stop: Millis,
) {
    let mut kept = Vec::with_capacity(log.len() + 2);
    for t in log.drain(..) {
        if t.stop < start || t.start > stop {
            kept.push(t);
            continue;
        }
        if t.start < start {
            kept.push(SatelliteTransaction {
                stop: start - 1,
                ..t
            });
        }
        if t.stop > stop {
            kept.push(SatelliteTransaction {
                start: stop + 1,
                ..t
            });
        }
    }

    let at = kept.partition_point(|t| t.start < start);
    kept.insert(at, SatelliteTransaction::downlink(station, start, stop));
    *log = kept;
}

fn skip(kind: SkipType, slice: &ConnectionWindow) -> SkipRecord {
    SkipRecord {
        kind,
        station: slice.station,
        satellite: slice.satellite,
        start: slice.start,
        stop: slice.stop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Activity, ShootingWindow};
    use crate::utils::error::SatLinkError;
    use chrono::NaiveDate;

    fn window(station: usize, satellite: usize, start: Millis, stop: Millis) -> ConnectionWindow {
        ConnectionWindow {
            station,
            satellite,
            start,
            stop,
        }
    }

    fn shooting(satellite: usize, start: Millis, stop: Millis) -> ShootingWindow {
        ShootingWindow {
            satellite,
            start,
            stop,
        }
    }

    fn profile(memory_capacity: Millis, transmit_ratio: i64) -> SatelliteProfile {
        SatelliteProfile {
            memory_capacity,
            transmit_ratio,
            bandwidth: 10.0,
        }
    }

    fn schedule_set(
        stations: usize,
        profiles: Vec<SatelliteProfile>,
        connections: Vec<ConnectionWindow>,
        shootings: Vec<ShootingWindow>,
    ) -> ScheduleSet {
        ScheduleSet {
            epoch: NaiveDate::from_ymd_opt(2027, 6, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            station_names: (0..stations).map(|i| format!("Station{}", i)).collect(),
            satellite_names: (0..profiles.len()).map(|i| format!("Sat_{}", i)).collect(),
            connections,
            shootings,
            profiles,
        }
    }

    #[test]
    fn test_quantize_keeps_short_windows() {
        let windows = vec![window(0, 0, 0, 15), window(0, 0, 100, 120)];
        let slices = quantize(&windows, 10);
        assert_eq!(slices, windows);
    }

    #[test]
    fn test_quantize_splits_long_windows() {
        let slices = quantize(&[window(1, 2, 0, 45)], 10);
        assert_eq!(
            slices,
            vec![
                window(1, 2, 0, 9),
                window(1, 2, 10, 19),
                window(1, 2, 20, 29),
                window(1, 2, 30, 45),
            ]
        );
    }

    #[test]
    fn test_quantize_sorts_slices_across_windows() {
        let slices = quantize(&[window(0, 0, 0, 30), window(1, 1, 5, 8)], 10);
        let starts: Vec<Millis> = slices.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![0, 5, 10]);
        assert_eq!(slices[2], window(0, 0, 10, 30));
    }

    #[test]
    fn test_memory_usage_counts_partial_and_clamps() {
        let log = vec![
            SatelliteTransaction::shooting(0, 99),
            SatelliteTransaction::downlink(0, 200, 239),
        ];
        assert_eq!(memory_usage(&log, 50, &profile(1_000, 4)), 50);
        assert_eq!(memory_usage(&log, 300, &profile(1_000, 4)), 99 - 39 / 4);
        assert_eq!(memory_usage(&log, 300, &profile(60, 4)), 60 - 9);
        assert_eq!(memory_usage(&log, 0, &profile(1_000, 4)), 0);
    }

    #[test]
    fn test_downlink_splits_spanning_shooting() {
        let mut log = vec![SatelliteTransaction::shooting(0, 100)];
        add_satellite_downlink(&mut log, 3, 40, 60);
        assert_eq!(
            log,
            vec![
                SatelliteTransaction::shooting(0, 39),
                SatelliteTransaction::downlink(3, 40, 60),
                SatelliteTransaction::shooting(61, 100),
            ]
        );
    }

    #[test]
    fn test_downlink_trims_and_removes_overlaps() {
        let mut log = vec![
            SatelliteTransaction::shooting(0, 45),
            SatelliteTransaction::shooting(50, 55),
            SatelliteTransaction::shooting(58, 90),
            SatelliteTransaction::shooting(200, 300),
        ];
        add_satellite_downlink(&mut log, 0, 40, 60);
        assert_eq!(
            log,
            vec![
                SatelliteTransaction::shooting(0, 39),
                SatelliteTransaction::downlink(0, 40, 60),
                SatelliteTransaction::shooting(61, 90),
                SatelliteTransaction::shooting(200, 300),
            ]
        );
    }

    #[test]
    fn test_downlink_limited_by_recorded_data() {
        let set = schedule_set(
            1,
            vec![profile(1_000_000, 4)],
            vec![window(0, 0, 1_000, 4_999)],
            vec![shooting(0, 0, 399)],
        );

        let resolution = FifoResolver::new(100_000).resolve(set).unwrap();

        assert_eq!(
            resolution.station_transactions[0],
            vec![StationTransaction {
                satellite: 0,
                start: 1_000,
                stop: 1_000 + 399 * 4,
            }]
        );
        assert!(resolution.skips.is_empty());
    }

    #[test]
    fn test_station_busy_and_memory_empty_skips() {
        let set = schedule_set(
            1,
            vec![profile(1_000_000, 1), profile(1_000_000, 1), profile(1_000_000, 1)],
            vec![
                window(0, 0, 2_000, 2_999),
                window(0, 1, 2_000, 2_999),
                window(0, 2, 5_000, 5_999),
            ],
            vec![shooting(0, 0, 999), shooting(1, 0, 999)],
        );

        let resolution = FifoResolver::new(100_000).resolve(set).unwrap();

        assert_eq!(resolution.downlink_sessions(), 1);
        assert_eq!(resolution.station_transactions[0][0].satellite, 0);
        let kinds: Vec<SkipType> = resolution.skips.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![SkipType::StationBusy, SkipType::SatelliteMemoryEmpty]
        );
        assert_eq!(resolution.skips[0].satellite, 1);
        assert_eq!(resolution.skips[1].satellite, 2);
    }

    #[test]
    fn test_satellite_busy_when_seen_by_two_stations() {
        let set = schedule_set(
            2,
            vec![profile(1_000_000, 1)],
            vec![window(0, 0, 1_000, 1_999), window(1, 0, 1_000, 1_999)],
            vec![shooting(0, 0, 4_999)],
        );

        let resolution = FifoResolver::new(100_000).resolve(set).unwrap();

        assert_eq!(resolution.station_transactions[0].len(), 1);
        assert!(resolution.station_transactions[1].is_empty());
        assert_eq!(resolution.skips.len(), 1);
        assert_eq!(resolution.skips[0].kind, SkipType::SatelliteBusy);
        assert_eq!(resolution.skips[0].station, 1);
    }

    #[test]
    fn test_recording_pauses_during_downlink() {
        let set = schedule_set(
            1,
            vec![profile(1_000_000, 1)],
            vec![window(0, 0, 1_000, 1_999)],
            vec![shooting(0, 0, 9_999)],
        );

        let resolution = FifoResolver::new(100_000).resolve(set).unwrap();

        let log = &resolution.satellite_transactions[0];
        assert_eq!(log.len(), 3);
        assert_eq!(log[0], SatelliteTransaction::shooting(0, 999));
        assert_eq!(log[1].activity, Activity::Downlink { station: 0 });
        assert_eq!((log[1].start, log[1].stop), (1_000, 1_999));
        assert_eq!(log[2], SatelliteTransaction::shooting(2_000, 9_999));
    }

    #[test]
    fn test_station_hands_over_when_first_satellite_drains() {
        let set = schedule_set(
            1,
            vec![profile(1_000_000, 1), profile(1_000_000, 1)],
            vec![window(0, 0, 10_000, 13_999), window(0, 1, 10_000, 13_999)],
            vec![shooting(0, 0, 1_499), shooting(1, 0, 4_999)],
        );

        let resolution = FifoResolver::new(1_000).resolve(set).unwrap();

        let plan: Vec<(usize, Millis, Millis)> = resolution.station_transactions[0]
            .iter()
            .map(|t| (t.satellite, t.start, t.stop))
            .collect();
        assert_eq!(
            plan,
            vec![
                (0, 10_000, 10_999),
                (0, 11_000, 11_500),
                (1, 11_501, 11_999),
                (1, 12_000, 13_999),
            ]
        );
        let kinds: Vec<SkipType> = resolution.skips.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![SkipType::StationBusy, SkipType::SatelliteMemoryEmpty]
        );
    }

    #[test]
    fn test_duplicate_connection_windows_are_rejected() {
        let set = schedule_set(
            1,
            vec![profile(1_000, 1)],
            vec![window(0, 0, 10, 20), window(0, 0, 10, 20)],
            vec![],
        );

        let err = FifoResolver::new(1_000).resolve(set).unwrap_err();
        assert!(matches!(err, SatLinkError::IntegrityError { .. }));
    }
}
