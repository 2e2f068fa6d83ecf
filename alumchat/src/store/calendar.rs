//! Calendar-day grouping for conversation display.
//!
//! Pure functions: the reference "today" is always injected so the
//! Today/Yesterday labels are deterministic under test. The same labeling
//! rule is used for roster preview timestamps.

use chrono::{DateTime, Local, NaiveDate};

use super::Message;

/// One day's worth of messages, in original order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayGroup {
    /// Local calendar date of this bucket.
    pub date: NaiveDate,
    /// Display label ("Today", "Yesterday", weekday, or full date).
    pub label: String,
    /// Messages of this day, preserving log order.
    pub messages: Vec<Message>,
}

/// Partitions an ordered message sequence into day buckets.
///
/// Dates come from each message's timestamp converted to the local
/// timezone; within-bucket order is the input order. A message whose
/// timestamp does not parse stays with the preceding bucket (or today's,
/// if it is the first) so grouping never reorders or drops messages.
#[must_use]
pub fn group_by_calendar_day(messages: &[Message], today: NaiveDate) -> Vec<DayGroup> {
    let mut groups: Vec<DayGroup> = Vec::new();
    for message in messages {
        let date = parse_local_date(&message.timestamp)
            .unwrap_or_else(|| groups.last().map_or(today, |group| group.date));
        match groups.last_mut() {
            Some(group) if group.date == date => group.messages.push(message.clone()),
            _ => groups.push(DayGroup {
                date,
                label: day_label(date, today),
                messages: vec![message.clone()],
            }),
        }
    }
    groups
}

/// Display label for a calendar date relative to `today`:
/// "Today", "Yesterday", the weekday name within the past week, and the
/// full date beyond that (or for dates in the future).
#[must_use]
pub fn day_label(date: NaiveDate, today: NaiveDate) -> String {
    let days_ago = (today - date).num_days();
    match days_ago {
        0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        2..=6 => date.format("%A").to_string(),
        _ => date.format("%B %-d, %Y").to_string(),
    }
}

fn parse_local_date(timestamp: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(timestamp)
        .ok()
        .map(|dt| dt.with_timezone(&Local).date_naive())
}
