//! Time entries and their representation as issue comments.
//!
//! When a timer stops, ghtt records the elapsed span as a comment on the
//! tracked issue. The comment has a human-readable first line followed by a
//! fenced JSON block holding a [`TimerInfo`], which is what [`EntryFormatter`]
//! implementations read back when listing entries.
//!
//! ````text
//! 🕙 @octocat ▪ 01:30 ▪ 01-05-2024 ▪ 09:00 ▪ 10:30
//! ```json
//! { "type": "TimerInfo", "version": 1, ... }
//! ```
//! ````

use chrono::{DateTime, FixedOffset, Offset, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Value of [`TimerInfo::kind`] for time entries.
pub const TIMER_INFO_TYPE: &str = "TimerInfo";

/// Current version of the [`TimerInfo`] payload.
pub const TIMER_INFO_VERSION: u32 = 1;

const TIMER_INFO_EMOJI: &str = "🕙";
const SEPARATOR: &str = " ▪ ";
const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

/// A finalized span of work on an issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeEntry {
    /// Login of the user who did the work.
    pub user: String,
    /// Start of the span.
    pub begin: DateTime<Utc>,
    /// End of the span.
    pub end: DateTime<Utc>,
}

impl TimeEntry {
    /// Creates an entry, truncating both ends to whole minutes.
    #[must_use]
    pub fn new(user: impl Into<String>, begin: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            user: user.into(),
            begin: truncate_to_minute(begin),
            end: truncate_to_minute(end),
        }
    }

    /// Returns the length of the span; negative spans count as zero.
    #[must_use]
    pub fn duration(&self) -> chrono::TimeDelta {
        (self.end - self.begin).max(chrono::TimeDelta::zero())
    }
}

fn truncate_to_minute(at: DateTime<Utc>) -> DateTime<Utc> {
    at.with_second(0)
        .and_then(|at| at.with_nanosecond(0))
        .unwrap_or(at)
}

/// The machine-readable payload embedded in a time entry comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerInfo {
    /// Payload discriminator, always [`TIMER_INFO_TYPE`].
    #[serde(rename = "type")]
    pub kind: String,
    /// Payload version.
    pub version: u32,
    /// When the entry was recorded.
    pub date: DateTime<Utc>,
    /// Login of the user who did the work.
    pub user: String,
    /// Start of the span.
    pub begin: DateTime<Utc>,
    /// End of the span.
    pub end: DateTime<Utc>,
}

impl TimerInfo {
    /// Builds the payload for an entry recorded at `recorded_at`.
    #[must_use]
    pub fn new(entry: &TimeEntry, recorded_at: DateTime<Utc>) -> Self {
        Self {
            kind: TIMER_INFO_TYPE.to_string(),
            version: TIMER_INFO_VERSION,
            date: recorded_at,
            user: entry.user.clone(),
            begin: entry.begin,
            end: entry.end,
        }
    }

    /// Returns the time entry this payload describes.
    #[must_use]
    pub fn entry(&self) -> TimeEntry {
        TimeEntry {
            user: self.user.clone(),
            begin: self.begin,
            end: self.end,
        }
    }
}

/// Turns time entries into comment text and back.
pub trait EntryFormatter: Send + Sync {
    /// Renders an entry as comment text.
    fn render(&self, entry: &TimeEntry, recorded_at: DateTime<Utc>) -> String;

    /// Extracts an entry from comment text, if it holds one.
    fn parse(&self, text: &str) -> Option<TimeEntry>;
}

/// The default comment format: a summary line and a fenced JSON payload.
///
/// Times on the summary line are shown in the formatter's offset; the JSON
/// payload always carries UTC timestamps.
#[derive(Debug, Clone, Copy)]
pub struct MarkdownEntryFormatter {
    offset: FixedOffset,
}

impl Default for MarkdownEntryFormatter {
    fn default() -> Self {
        Self::with_offset(Utc.fix())
    }
}

impl MarkdownEntryFormatter {
    /// Creates a formatter showing times in the given offset.
    #[must_use]
    pub fn with_offset(offset: FixedOffset) -> Self {
        Self { offset }
    }

    fn summary(&self, entry: &TimeEntry) -> String {
        let begin = entry.begin.with_timezone(&self.offset);
        let end = entry.end.with_timezone(&self.offset);
        let minutes = entry.duration().num_minutes();

        let fields = [
            format!("@{}", entry.user),
            format!("{:02}:{:02}", minutes / 60, minutes % 60),
            begin.format("%d-%m-%Y").to_string(),
            begin.format("%H:%M").to_string(),
            end.format("%H:%M").to_string(),
        ];
        format!("{TIMER_INFO_EMOJI} {}", fields.join(SEPARATOR))
    }
}

impl EntryFormatter for MarkdownEntryFormatter {
    fn render(&self, entry: &TimeEntry, recorded_at: DateTime<Utc>) -> String {
        let info = TimerInfo::new(entry, recorded_at);
        // TimerInfo has only plain fields, serialization cannot fail.
        let json = serde_json::to_string_pretty(&info).unwrap_or_default();
        format!("{}\n{JSON_FENCE}\n{json}\n{FENCE}", self.summary(entry))
    }

    fn parse(&self, text: &str) -> Option<TimeEntry> {
        parse_timer_info(text).map(|info| info.entry())
    }
}

/// Extracts the [`TimerInfo`] payload from comment text.
///
/// Returns `None` when the text has no fenced JSON block, when the block is
/// not valid JSON, or when it holds another payload type.
#[must_use]
pub fn parse_timer_info(text: &str) -> Option<TimerInfo> {
    let start = text.find(JSON_FENCE)? + JSON_FENCE.len();
    let len = text[start..].find(FENCE)?;
    let info: TimerInfo = serde_json::from_str(text[start..start + len].trim()).ok()?;
    (info.kind == TIMER_INFO_TYPE).then_some(info)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, minute, second).unwrap()
    }

    #[test]
    fn new_truncates_to_minutes() {
        let entry = TimeEntry::new("octo", at(9, 0, 42), at(10, 30, 59));
        assert_eq!(entry.begin, at(9, 0, 0));
        assert_eq!(entry.end, at(10, 30, 0));
        assert_eq!(entry.duration().num_minutes(), 90);
    }

    #[test]
    fn negative_duration_counts_as_zero() {
        let entry = TimeEntry::new("octo", at(10, 0, 0), at(9, 0, 0));
        assert_eq!(entry.duration(), chrono::TimeDelta::zero());
    }

    #[test]
    fn render_comment() {
        let entry = TimeEntry::new("octo", at(9, 0, 0), at(10, 30, 0));
        let text = MarkdownEntryFormatter::default().render(&entry, at(10, 31, 0));

        insta::assert_snapshot!(text, @r#"
        🕙 @octo ▪ 01:30 ▪ 01-05-2024 ▪ 09:00 ▪ 10:30
        ```json
        {
          "type": "TimerInfo",
          "version": 1,
          "date": "2024-05-01T10:31:00Z",
          "user": "octo",
          "begin": "2024-05-01T09:00:00Z",
          "end": "2024-05-01T10:30:00Z"
        }
        ```
        "#);
    }

    #[test]
    fn render_uses_formatter_offset_for_summary() {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let entry = TimeEntry::new("octo", at(23, 0, 0), at(23, 45, 0));
        let text = MarkdownEntryFormatter::with_offset(offset).render(&entry, at(23, 46, 0));

        let summary = text.lines().next().unwrap();
        assert_eq!(summary, "🕙 @octo ▪ 00:45 ▪ 02-05-2024 ▪ 01:00 ▪ 01:45");
        assert!(text.contains("\"begin\": \"2024-05-01T23:00:00Z\""));
    }

    #[test]
    fn parse_reads_back_rendered_entry() {
        let formatter = MarkdownEntryFormatter::default();
        let entry = TimeEntry::new("octo", at(9, 0, 0), at(10, 30, 0));
        let text = formatter.render(&entry, at(11, 0, 0));
        assert_eq!(formatter.parse(&text), Some(entry));
    }

    #[test]
    fn parse_accepts_browser_timestamps() {
        let text = "🕙 something\n```json\n{\"type\":\"TimerInfo\",\"version\":1,\
                    \"date\":\"2024-05-01T10:31:12.345Z\",\"user\":\"octo\",\
                    \"begin\":\"2024-05-01T09:00:00.000Z\",\"end\":\"2024-05-01T10:30:00.000Z\"}\n```";
        let info = parse_timer_info(text).unwrap();
        assert_eq!(info.user, "octo");
        assert_eq!(info.begin, at(9, 0, 0));
    }

    #[test]
    fn parse_ignores_other_comments() {
        let formatter = MarkdownEntryFormatter::default();
        assert!(formatter.parse("just a regular comment").is_none());
        assert!(formatter.parse("```json\nnot json\n```").is_none());
        assert!(formatter.parse("```json\n{\"type\": \"TimerInfo\"").is_none());

        let other_type = "```json\n{\"type\":\"Other\",\"version\":1,\"date\":\"2024-05-01T10:31:00Z\",\
                          \"user\":\"u\",\"begin\":\"2024-05-01T10:31:00Z\",\"end\":\"2024-05-01T10:31:00Z\"}\n```";
        assert!(formatter.parse(other_type).is_none());
    }
}
