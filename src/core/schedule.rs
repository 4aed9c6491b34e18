use crate::domain::model::{
    AccessRecord, ConnectionWindow, Millis, SatelliteProfile, ScheduleSet, ShootingWindow,
};
use crate::utils::error::{Result, SatLinkError};
use chrono::{NaiveDateTime, NaiveTime};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Indexes parsed reports into a [`ScheduleSet`].
///
/// The epoch is midnight of the earliest connection start. Station and
/// satellite names are sorted, and a name's index is its position. Flyby
/// windows reuse the connection satellite index; satellites that never see
/// a station cannot downlink and are dropped.
pub fn build_schedule_set<F>(
    connections: &[AccessRecord],
    flybys: &[AccessRecord],
    profile_for: F,
) -> Result<ScheduleSet>
where
    F: Fn(usize, &str) -> SatelliteProfile,
{
    let earliest = connections
        .iter()
        .map(|r| r.start)
        .min()
        .ok_or_else(|| SatLinkError::NoScheduleDataError {
            message: "connection schedules contain no access windows".to_string(),
        })?;
    let epoch = earliest.date().and_time(NaiveTime::MIN);

    let station_names: Vec<String> = connections
        .iter()
        .map(|r| r.from.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let satellite_names: Vec<String> = connections
        .iter()
        .map(|r| r.to.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let station_index = index_of(&station_names);
    let satellite_index = index_of(&satellite_names);

    let connection_windows = connections
        .iter()
        .map(|r| ConnectionWindow {
            station: station_index[r.from.as_str()],
            satellite: satellite_index[r.to.as_str()],
            start: offset(epoch, r.start),
            stop: offset(epoch, r.stop),
        })
        .collect();

    let mut dropped: BTreeMap<&str, usize> = BTreeMap::new();
    let mut shootings = Vec::with_capacity(flybys.len());
    for r in flybys {
        match satellite_index.get(r.to.as_str()) {
            Some(&satellite) => shootings.push(ShootingWindow {
                satellite,
                start: offset(epoch, r.start),
                stop: offset(epoch, r.stop),
            }),
            None => *dropped.entry(r.to.as_str()).or_default() += 1,
        }
    }
    for (name, count) in &dropped {
        tracing::warn!(
            "Satellite {} has {} flyby windows but no station contact, ignoring",
            name,
            count
        );
    }

    let profiles = satellite_names
        .iter()
        .enumerate()
        .map(|(i, name)| profile_for(i, name))
        .collect();

    Ok(ScheduleSet {
        epoch,
        station_names,
        satellite_names,
        connections: connection_windows,
        shootings,
        profiles,
    })
}

/// Total recording time per satellite in seconds, keyed by satellite name.
pub fn flyby_totals(flybys: &[AccessRecord]) -> BTreeMap<String, f64> {
    let mut totals = BTreeMap::new();
    for r in flybys {
        *totals.entry(r.to.clone()).or_insert(0.0) += r.duration_secs;
    }
    totals
}

fn index_of(names: &[String]) -> HashMap<&str, usize> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| (name.as_str(), i))
        .collect()
}

fn offset(epoch: NaiveDateTime, at: NaiveDateTime) -> Millis {
    (at - epoch).num_milliseconds()
}
