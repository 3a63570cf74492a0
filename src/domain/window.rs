// Time window resolution for history queries
use chrono::{
    DateTime, Days, Duration, Local, LocalResult, NaiveDate, NaiveTime, SecondsFormat, TimeZone,
    Utc,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimePreset {
    #[default]
    Today,
    Yesterday,
    Week,
}

impl TimePreset {
    /// Parses the wire form of a preset. Unknown values are handed back to
    /// the caller so the fallback can be logged where it happens.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "today" => Some(TimePreset::Today),
            "yesterday" => Some(TimePreset::Yesterday),
            "week" => Some(TimePreset::Week),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimePreset::Today => "today",
            TimePreset::Yesterday => "yesterday",
            TimePreset::Week => "week",
        }
    }
}

/// Query bounds in UTC. `start` never exceeds `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        // Clamp rather than hand a reversed interval to the backend.
        if start > end {
            Self { start: end, end }
        } else {
            Self { start, end }
        }
    }

    /// Resolves a preset against the current wall clock. Day boundaries
    /// follow the server's local calendar; the returned bounds are UTC.
    pub fn resolve(preset: TimePreset) -> Self {
        Self::resolve_at(preset, Local::now())
    }

    pub fn resolve_at(preset: TimePreset, now: DateTime<Local>) -> Self {
        match preset {
            TimePreset::Today => {
                let start = local_midnight(now.date_naive());
                Self::new(start.with_timezone(&Utc), now.with_timezone(&Utc))
            }
            TimePreset::Yesterday => {
                let day = now
                    .date_naive()
                    .checked_sub_days(Days::new(1))
                    .unwrap_or_else(|| now.date_naive());
                let start = local_midnight(day);
                let end = start + Duration::days(1) - Duration::milliseconds(1);
                Self::new(start.with_timezone(&Utc), end.with_timezone(&Utc))
            }
            TimePreset::Week => {
                let end = now.with_timezone(&Utc);
                Self::new(end - Duration::days(7), end)
            }
        }
    }

    /// ISO-8601 bound with millisecond precision, as the backend expects.
    pub fn start_iso(&self) -> String {
        self.start.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn end_iso(&self) -> String {
        self.end.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

fn local_midnight(day: NaiveDate) -> DateTime<Local> {
    match day.and_time(NaiveTime::MIN).and_local_timezone(Local) {
        LocalResult::Single(midnight) => midnight,
        LocalResult::Ambiguous(earliest, _) => earliest,
        // Midnight does not exist on this day in the local zone. Read it
        // as UTC so the window stays usable.
        LocalResult::None => Local.from_utc_datetime(&day.and_time(NaiveTime::MIN)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn afternoon() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap()
    }

    #[test]
    fn test_today_spans_local_midnight_to_now() {
        let now = afternoon();
        let window = TimeWindow::resolve_at(TimePreset::Today, now);
        let midnight = Local.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap();
        assert_eq!(window.start, midnight.with_timezone(&Utc));
        assert_eq!(window.end, now.with_timezone(&Utc));
        assert!(window.start <= window.end);
    }

    #[test]
    fn test_yesterday_is_one_full_day() {
        let window = TimeWindow::resolve_at(TimePreset::Yesterday, afternoon());
        let start = Local.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap();
        assert_eq!(window.start, start.with_timezone(&Utc));
        assert_eq!(
            window.end,
            window.start + Duration::days(1) - Duration::milliseconds(1)
        );
        // The window closes before the current day begins.
        let today_midnight = Local.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap();
        assert!(window.end < today_midnight.with_timezone(&Utc));
    }

    #[test]
    fn test_week_reaches_back_seven_days() {
        let now = afternoon();
        let window = TimeWindow::resolve_at(TimePreset::Week, now);
        assert_eq!(window.end, now.with_timezone(&Utc));
        assert_eq!(window.end - window.start, Duration::days(7));
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(TimePreset::parse("Today"), Some(TimePreset::Today));
        assert_eq!(TimePreset::parse("WEEK"), Some(TimePreset::Week));
        assert_eq!(TimePreset::parse("yesterday"), Some(TimePreset::Yesterday));
        assert_eq!(TimePreset::parse("last_month"), None);
    }

    #[test]
    fn test_new_clamps_reversed_bounds() {
        let later = Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();
        let earlier = later - Duration::hours(1);
        let window = TimeWindow::new(later, earlier);
        assert_eq!(window.start, window.end);
    }

    #[test]
    fn test_iso_bounds_use_millisecond_utc() {
        let start = Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap();
        let window = TimeWindow::new(start, start + Duration::minutes(5));
        assert_eq!(window.start_iso(), "2024-03-05T10:00:00.000Z");
        assert_eq!(window.end_iso(), "2024-03-05T10:05:00.000Z");
    }
}
