//! Reader for STK-style access reports.
//!
//! A report holds one or more blocks:
//!
//! ```text
//! Anadyr1-To-KinoSat_110101
//! -------------------------
//!                   Access        Start Time (UTCG)           Stop Time (UTCG)        Duration (sec)
//!                   ------    ------------------------    ------------------------    --------------
//!                        1     1 Jun 2027 00:03:20.000     1 Jun 2027 00:08:40.000           320.000
//! ```
//!
//! Rows are fixed width; a blank line closes the block.

use crate::domain::model::AccessRecord;
use crate::utils::error::{Result, SatLinkError};
use chrono::NaiveDateTime;

const HEADER_MARKER: &str = "-----";
const HEADER_SEPARATOR: &str = "-To-";

const ACCESS_COLUMN: (usize, usize) = (0, 24);
const START_COLUMN: (usize, usize) = (28, 52);
const STOP_COLUMN: (usize, usize) = (56, 80);
const DURATION_COLUMN: (usize, usize) = (85, 98);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    SearchBlockStart,
    SearchDataStart,
    ParsingData,
}

impl ParserState {
    fn next(self) -> Self {
        match self {
            Self::SearchBlockStart => Self::SearchDataStart,
            Self::SearchDataStart => Self::ParsingData,
            Self::ParsingData => Self::SearchBlockStart,
        }
    }
}

/// Parses every block of a report. `file` only labels errors.
pub fn parse_access_report(
    content: &str,
    file: &str,
    date_time_format: &str,
) -> Result<Vec<AccessRecord>> {
    let mut records = Vec::new();
    let mut state = ParserState::SearchBlockStart;
    let mut prev_line: Option<&str> = None;
    let mut endpoints: Option<(String, String)> = None;

    for (index, line) in content.lines().enumerate() {
        match state {
            ParserState::SearchBlockStart => {
                if line.starts_with(HEADER_MARKER) {
                    if let Some(header) = prev_line.filter(|l| l.contains(HEADER_SEPARATOR)) {
                        endpoints = Some(split_header(header));
                        state = state.next();
                    }
                }
            }
            ParserState::SearchDataStart => {
                if line.trim().starts_with(HEADER_MARKER) {
                    state = state.next();
                }
            }
            ParserState::ParsingData => {
                if line.trim().is_empty() {
                    state = state.next();
                } else if let Some((from, to)) = &endpoints {
                    let record = parse_row(line, from, to, date_time_format).map_err(|reason| {
                        SatLinkError::ScheduleParseError {
                            file: file.to_string(),
                            line: index + 1,
                            reason,
                        }
                    })?;
                    records.push(record);
                }
            }
        }
        prev_line = Some(line);
    }

    Ok(records)
}

fn split_header(header: &str) -> (String, String) {
    let header = header.trim();
    match header.split_once(HEADER_SEPARATOR) {
        Some((from, to)) => (from.trim().to_string(), to.trim().to_string()),
        None => (header.to_string(), String::new()),
    }
}

fn column<'a>(line: &'a str, (start, end): (usize, usize), name: &str) -> std::result::Result<&'a str, String> {
    if start > line.len() {
        return Err(format!("row too short for {} column", name));
    }
    let end = end.min(line.len());
    let value = line
        .get(start..end)
        .map(str::trim)
        .ok_or_else(|| format!("non-ASCII data in fixed-width row at {} column", name))?;
    if value.is_empty() {
        return Err(format!("{} column is empty", name));
    }
    Ok(value)
}

fn parse_row(
    line: &str,
    from: &str,
    to: &str,
    date_time_format: &str,
) -> std::result::Result<AccessRecord, String> {
    let access = column(line, ACCESS_COLUMN, "access")?
        .parse::<u64>()
        .map_err(|e| format!("invalid access number: {}", e))?;
    let start = parse_timestamp(column(line, START_COLUMN, "start time")?, date_time_format)?;
    let stop = parse_timestamp(column(line, STOP_COLUMN, "stop time")?, date_time_format)?;
    let duration_secs = column(line, DURATION_COLUMN, "duration")?
        .parse::<f64>()
        .map_err(|e| format!("invalid duration: {}", e))?;

    if stop < start {
        return Err(format!("stop time {} precedes start time {}", stop, start));
    }

    Ok(AccessRecord {
        from: from.to_string(),
        to: to.to_string(),
        access,
        start,
        stop,
        duration_secs,
    })
}

fn parse_timestamp(value: &str, format: &str) -> std::result::Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(value, format)
        .map_err(|e| format!("invalid timestamp '{}': {}", value, e))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const FORMAT: &str = "%-d %b %Y %H:%M:%S%.3f";

    pub(crate) fn row(access: u64, start: &str, stop: &str, duration: f64) -> String {
        format!(
            "{:>24}    {:>24}    {:>24}     {:>13.3}",
            access, start, stop, duration
        )
    }

    pub(crate) fn block(header: &str, rows: &[String]) -> String {
        let mut text = String::new();
        text.push_str(header);
        text.push('\n');
        text.push_str(&"-".repeat(header.len()));
        text.push('\n');
        text.push_str(
            "                  Access        Start Time (UTCG)           Stop Time (UTCG)        Duration (sec)\n",
        );
        text.push_str(
            "                  ------    ------------------------    ------------------------    --------------\n",
        );
        for r in rows {
            text.push_str(r);
            text.push('\n');
        }
        text.push('\n');
        text
    }

    #[test]
    fn test_row_layout_matches_columns() {
        let line = row(1, "1 Jun 2027 00:03:20.000", "1 Jun 2027 00:08:40.000", 320.0);
        assert_eq!(line.len(), 98);
        assert_eq!(line[0..24].trim(), "1");
        assert_eq!(line[28..52].trim(), "1 Jun 2027 00:03:20.000");
        assert_eq!(line[56..80].trim(), "1 Jun 2027 00:08:40.000");
        assert_eq!(line[85..98].trim(), "320.000");
    }

    #[test]
    fn test_parse_single_block() {
        let report = format!(
            "Facility-Anadyr1 access report\n\n{}",
            block(
                "Anadyr1-To-KinoSat_110101",
                &[
                    row(1, "1 Jun 2027 00:03:20.000", "1 Jun 2027 00:08:40.000", 320.0),
                    row(2, "1 Jun 2027 10:00:00.500", "1 Jun 2027 10:05:00.500", 300.0),
                ],
            )
        );

        let records = parse_access_report(&report, "Facility-Anadyr1.txt", FORMAT).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].from, "Anadyr1");
        assert_eq!(records[0].to, "KinoSat_110101");
        assert_eq!(records[0].access, 1);
        assert_eq!(
            records[0].start,
            NaiveDateTime::parse_from_str("2027-06-01 00:03:20", "%Y-%m-%d %H:%M:%S").unwrap()
        );
        assert_eq!(records[1].duration_secs, 300.0);
        assert_eq!(records[1].stop.and_utc().timestamp_subsec_millis(), 500);
    }

    #[test]
    fn test_parse_multiple_blocks_and_trailing_summary() {
        let mut report = block(
            "Anadyr1-To-KinoSat_110101",
            &[row(1, "1 Jun 2027 00:03:20.000", "1 Jun 2027 00:08:40.000", 320.0)],
        );
        report.push_str("Global Statistics\n-----------------\nMin Duration    1   320.000\n\n");
        report.push_str(&block(
            "Anadyr1-To-ZorkiySat_110201",
            &[
                row(1, "2 Jun 2027 01:00:00.000", "2 Jun 2027 01:01:00.000", 60.0),
                row(2, "2 Jun 2027 02:00:00.000", "2 Jun 2027 02:02:00.000", 120.0),
            ],
        ));

        let records = parse_access_report(&report, "Facility-Anadyr1.txt", FORMAT).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].to, "KinoSat_110101");
        assert_eq!(records[1].to, "ZorkiySat_110201");
        assert_eq!(records[2].access, 2);
    }

    #[test]
    fn test_block_without_trailing_blank_line() {
        let report = format!(
            "Russia-To-KinoSat_110101\n------------------------\n    header\n    ------\n{}",
            row(7, "1 Jun 2027 00:00:00.000", "1 Jun 2027 00:01:00.000", 60.0)
        );
        let records = parse_access_report(&report, "AreaTarget-Russia-To-KinoSat.txt", FORMAT).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].from, "Russia");
        assert_eq!(records[0].access, 7);
    }

    #[test]
    fn test_dashes_without_header_are_ignored() {
        let report = "Report\n----------\nnothing here\n";
        let records = parse_access_report(report, "x.txt", FORMAT).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_malformed_row_reports_line() {
        let mut report = block(
            "Anadyr1-To-KinoSat_110101",
            &[row(1, "1 Jun 2027 00:03:20.000", "1 Jun 2027 00:08:40.000", 320.0)],
        );
        report = report.replacen("1 Jun 2027 00:08:40.000", "31 Foo 2027 00:08:40.000", 1);

        let err = parse_access_report(&report, "Facility-Anadyr1.txt", FORMAT).unwrap_err();
        match err {
            SatLinkError::ScheduleParseError { file, line, reason } => {
                assert_eq!(file, "Facility-Anadyr1.txt");
                assert_eq!(line, 5);
                assert!(reason.contains("invalid timestamp"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_short_row_is_rejected() {
        let report = "A-To-B\n------\n  hdr\n  ------\n       1    1 Jun 2027\n";
        assert!(parse_access_report(report, "short.txt", FORMAT).is_err());
    }

    #[test]
    fn test_multibyte_character_across_column_is_reported() {
        let mut line = row(1, "1 Jun 2027 00:00:00.000", "1 Jun 2027 00:01:00.000", 60.0);
        line.replace_range(23..24, "é");
        let report = block("Anadyr1-To-KinoSat_110101", &[line]);

        match parse_access_report(&report, "Facility-Anadyr1.txt", FORMAT).unwrap_err() {
            SatLinkError::ScheduleParseError { line, reason, .. } => {
                assert_eq!(line, 5);
                assert!(reason.contains("non-ASCII"), "{}", reason);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
