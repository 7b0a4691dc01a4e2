//! Indexer job definitions and lifecycle.

use serde::{Deserialize, Serialize};

use super::name::ResourceName;

/// Shortest interval the search service accepts for scheduled runs.
const MIN_INTERVAL_MINUTES: u64 = 5;
/// Longest interval the search service accepts for scheduled runs.
const MAX_INTERVAL_MINUTES: u64 = 24 * 60;

/// Errors that can occur when parsing an [`IndexerSchedule`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("interval '{0}' is not an ISO-8601 duration like PT2H or P1D")]
    Malformed(String),
    #[error("interval must be between 5 minutes and 1 day (got {0} minutes)")]
    OutOfRange(u64),
}

/// Recurring run schedule for an indexer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexerSchedule {
    /// ISO-8601 duration, e.g. `PT2H`.
    pub interval: String,
}

impl IndexerSchedule {
    /// Parse an ISO-8601 duration made of days, hours and minutes.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError`] if the duration is malformed or outside
    /// 5 minutes..=1 day.
    pub fn parse(interval: &str) -> Result<Self, ScheduleError> {
        let minutes = parse_duration_minutes(interval)
            .ok_or_else(|| ScheduleError::Malformed(interval.to_string()))?;
        if !(MIN_INTERVAL_MINUTES..=MAX_INTERVAL_MINUTES).contains(&minutes) {
            return Err(ScheduleError::OutOfRange(minutes));
        }
        Ok(Self {
            interval: interval.to_string(),
        })
    }
}

fn parse_duration_minutes(s: &str) -> Option<u64> {
    let rest = s.strip_prefix('P')?;
    let (date_part, time_part) = match rest.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (rest, None),
    };

    let mut total = 0u64;
    let mut matched = false;

    if !date_part.is_empty() {
        let days: u64 = date_part.strip_suffix('D')?.parse().ok()?;
        total = total.checked_add(days.checked_mul(24 * 60)?)?;
        matched = true;
    }

    if let Some(time) = time_part {
        let mut number = String::new();
        let mut any = false;
        for c in time.chars() {
            if c.is_ascii_digit() {
                number.push(c);
                continue;
            }
            let value: u64 = number.parse().ok()?;
            number.clear();
            let factor = match c {
                'H' => 60,
                'M' => 1,
                _ => return None,
            };
            total = total.checked_add(value.checked_mul(factor)?)?;
            any = true;
        }
        if !number.is_empty() || !any {
            return None;
        }
        matched = true;
    }

    matched.then_some(total)
}

/// A named indexer binding a data source to a target index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexerDefinition {
    pub name: ResourceName,
    pub data_source_name: ResourceName,
    pub target_index_name: ResourceName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<IndexerSchedule>,
}

/// Lifecycle of an indexer as seen by whoever tracks it.
///
/// ```text
/// Undefined -> Created -> Running -> Idle -> Running -> ...
/// ```
///
/// `Running -> Idle` happens when the remote run finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IndexerStatus {
    #[default]
    Undefined,
    Created,
    Running,
    Idle,
}

impl IndexerStatus {
    /// Whether a run may be triggered from this state.
    #[must_use]
    pub const fn can_run(self) -> bool {
        matches!(self, Self::Created | Self::Idle)
    }

    /// State after a definition upsert. A running job keeps running.
    #[must_use]
    pub const fn after_upsert(self) -> Self {
        match self {
            Self::Running => Self::Running,
            Self::Idle => Self::Idle,
            Self::Undefined | Self::Created => Self::Created,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_parse_valid() {
        assert!(IndexerSchedule::parse("PT5M").is_ok());
        assert!(IndexerSchedule::parse("PT2H").is_ok());
        assert!(IndexerSchedule::parse("PT1H30M").is_ok());
        assert!(IndexerSchedule::parse("P1D").is_ok());
    }

    #[test]
    fn test_schedule_parse_malformed() {
        for bad in ["", "2H", "PT", "P", "PTH", "PT5S", "PT5", "P1DT"] {
            assert!(
                matches!(IndexerSchedule::parse(bad), Err(ScheduleError::Malformed(_))),
                "{bad} should be malformed"
            );
        }
    }

    #[test]
    fn test_schedule_parse_out_of_range() {
        assert_eq!(
            IndexerSchedule::parse("PT4M"),
            Err(ScheduleError::OutOfRange(4))
        );
        assert_eq!(
            IndexerSchedule::parse("P2D"),
            Err(ScheduleError::OutOfRange(2880))
        );
    }

    #[test]
    fn test_status_can_run() {
        assert!(!IndexerStatus::Undefined.can_run());
        assert!(IndexerStatus::Created.can_run());
        assert!(!IndexerStatus::Running.can_run());
        assert!(IndexerStatus::Idle.can_run());
    }

    #[test]
    fn test_status_after_upsert() {
        assert_eq!(
            IndexerStatus::Undefined.after_upsert(),
            IndexerStatus::Created
        );
        assert_eq!(IndexerStatus::Running.after_upsert(), IndexerStatus::Running);
        assert_eq!(IndexerStatus::Idle.after_upsert(), IndexerStatus::Idle);
    }

    #[test]
    fn test_definition_wire_shape() {
        let def = IndexerDefinition {
            name: ResourceName::parse("my-indexer-01").unwrap(),
            data_source_name: ResourceName::parse("ds-01").unwrap(),
            target_index_name: ResourceName::parse("docs-01").unwrap(),
            schedule: None,
        };
        let json = serde_json::to_value(&def).unwrap();
        assert_eq!(json["dataSourceName"], "ds-01");
        assert_eq!(json["targetIndexName"], "docs-01");
        assert!(json.get("schedule").is_none());
    }
}
