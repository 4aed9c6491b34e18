//! Consistency checks between a resolved plan and the schedules it came from.

use crate::domain::model::{Millis, Resolution, ScheduleSet};
use crate::utils::error::{Result, SatLinkError};
use std::collections::{HashMap, HashSet};

fn fail(message: String) -> SatLinkError {
    tracing::error!("{}", message);
    SatLinkError::IntegrityError { message }
}

pub fn check_input_doubles(schedules: &ScheduleSet) -> Result<()> {
    let mut seen = HashSet::with_capacity(schedules.connections.len());
    for window in &schedules.connections {
        if !seen.insert(window) {
            return Err(fail(format!(
                "Found doubles in input schedule: station {}, satellite {}, window {}..{}",
                schedules.station_names[window.station],
                schedules.satellite_names[window.satellite],
                window.start,
                window.stop
            )));
        }
    }
    Ok(())
}

/// Runs every post-resolution check; the first violation aborts.
pub fn verify(resolution: &Resolution) -> Result<()> {
    check_station_transactions(resolution)?;
    check_continuity(
        "station",
        resolution
            .station_transactions
            .iter()
            .map(|log| log.iter().map(|t| (t.start, t.stop)).collect()),
    )?;
    check_continuity(
        "satellite",
        resolution
            .satellite_transactions
            .iter()
            .map(|log| log.iter().map(|t| (t.start, t.stop)).collect()),
    )?;
    check_shooting_transactions(resolution)?;
    check_satellite_transactions(resolution)?;
    Ok(())
}

fn check_station_transactions(resolution: &Resolution) -> Result<()> {
    let mut windows: HashMap<(usize, usize), Vec<(Millis, Millis)>> = HashMap::new();
    for w in &resolution.schedules.connections {
        windows
            .entry((w.station, w.satellite))
            .or_default()
            .push((w.start, w.stop));
    }

    for (station, log) in resolution.station_transactions.iter().enumerate() {
        for t in log {
            let covered = windows
                .get(&(station, t.satellite))
                .is_some_and(|ws| ws.iter().any(|&(s, e)| s <= t.start && e >= t.stop));
            if !covered {
                return Err(fail(format!(
                    "Transaction mismatched schedule: station {}, satellite {}, {}..{}",
                    station, t.satellite, t.start, t.stop
                )));
            }
        }
    }
    Ok(())
}

fn check_continuity<I>(owner: &str, logs: I) -> Result<()>
where
    I: Iterator<Item = Vec<(Millis, Millis)>>,
{
    for (index, log) in logs.enumerate() {
        let mut last_stop: Option<Millis> = None;
        for (start, stop) in log {
            if stop < start || last_stop.is_some_and(|last| last >= start) {
                return Err(fail(format!(
                    "Continuity check failed for {} {} at {}..{}",
                    owner, index, start, stop
                )));
            }
            last_stop = Some(stop);
        }
    }
    Ok(())
}

fn check_shooting_transactions(resolution: &Resolution) -> Result<()> {
    let mut flybys: HashMap<usize, Vec<(Millis, Millis)>> = HashMap::new();
    for s in &resolution.schedules.shootings {
        flybys.entry(s.satellite).or_default().push((s.start, s.stop));
    }

    for (satellite, log) in resolution.satellite_transactions.iter().enumerate() {
        for t in log.iter().filter(|t| t.station().is_none()) {
            let covered = flybys
                .get(&satellite)
                .is_some_and(|ws| ws.iter().any(|&(s, e)| s <= t.start && e >= t.stop));
            if !covered {
                return Err(fail(format!(
                    "Shooting mismatched schedule: satellite {}, {}..{}",
                    satellite, t.start, t.stop
                )));
            }
        }
    }
    Ok(())
}

fn check_satellite_transactions(resolution: &Resolution) -> Result<()> {
    let station_side: HashSet<(usize, usize, Millis, Millis)> = resolution
        .station_transactions
        .iter()
        .enumerate()
        .flat_map(|(station, log)| {
            log.iter()
                .map(move |t| (station, t.satellite, t.start, t.stop))
        })
        .collect();

    for (satellite, log) in resolution.satellite_transactions.iter().enumerate() {
        for t in log {
            let Some(station) = t.station() else {
                continue;
            };
            if !station_side.contains(&(station, satellite, t.start, t.stop)) {
                return Err(fail(format!(
                    "StationId: {}, SatelliteId: {}, StartTime: {}, StopTime: {}",
                    station, satellite, t.start, t.stop
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{
        ConnectionWindow, SatelliteProfile, SatelliteTransaction, ShootingWindow,
        StationTransaction,
    };
    use chrono::NaiveDate;

    fn resolution() -> Resolution {
        let schedules = ScheduleSet {
            epoch: NaiveDate::from_ymd_opt(2027, 6, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            station_names: vec!["Anadyr".to_string()],
            satellite_names: vec!["Sat_A".to_string()],
            connections: vec![ConnectionWindow {
                station: 0,
                satellite: 0,
                start: 0,
                stop: 1_000,
            }],
            shootings: vec![ShootingWindow {
                satellite: 0,
                start: 0,
                stop: 2_000,
            }],
            profiles: vec![SatelliteProfile {
                memory_capacity: 10_000,
                transmit_ratio: 1,
                bandwidth: 1.0,
            }],
        };
        Resolution {
            schedules,
            station_transactions: vec![vec![StationTransaction {
                satellite: 0,
                start: 100,
                stop: 200,
            }]],
            satellite_transactions: vec![vec![
                SatelliteTransaction::shooting(0, 99),
                SatelliteTransaction::downlink(0, 100, 200),
                SatelliteTransaction::shooting(201, 2_000),
            ]],
            skips: vec![],
        }
    }

    #[test]
    fn test_consistent_plan_passes() {
        assert!(verify(&resolution()).is_ok());
    }

    #[test]
    fn test_transaction_outside_window_fails() {
        let mut r = resolution();
        r.station_transactions[0][0].stop = 1_500;
        r.satellite_transactions[0][1].stop = 1_500;
        r.satellite_transactions[0][2].start = 1_501;
        assert!(matches!(verify(&r), Err(SatLinkError::IntegrityError { .. })));
    }

    #[test]
    fn test_overlap_fails_continuity() {
        let mut r = resolution();
        r.satellite_transactions[0][0].stop = 150;
        let err = verify(&r).unwrap_err();
        assert!(err.to_string().contains("Continuity"));
    }

    #[test]
    fn test_transaction_starting_at_epoch_is_continuous() {
        let mut r = resolution();
        r.station_transactions[0][0].start = 0;
        r.satellite_transactions[0] = vec![
            SatelliteTransaction::downlink(0, 0, 200),
            SatelliteTransaction::shooting(201, 2_000),
        ];
        assert!(verify(&r).is_ok());
    }

    #[test]
    fn test_unmatched_downlink_fails() {
        let mut r = resolution();
        r.satellite_transactions[0][1].stop = 190;
        assert!(matches!(verify(&r), Err(SatLinkError::IntegrityError { .. })));
    }

    #[test]
    fn test_shooting_outside_flyby_fails() {
        let mut r = resolution();
        r.satellite_transactions[0][2].stop = 2_500;
        let err = verify(&r).unwrap_err();
        assert!(err.to_string().contains("Shooting mismatched"));
    }
}
