//! iCalendar export of a reservation, plus ISO week to calendar date conversion.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use uuid::Uuid;

const LINE_LIMIT: usize = 75;
const PRODID: &str = "-//Axis Booking//Reservations//EN";

/// Monday of ISO `week` in `year`.
///
/// Week 1 is the week holding the year's first Thursday; later weeks are whole
/// multiples of seven days after it, so week 53 resolves even in 52-week years.
pub fn iso_week_monday(year: i32, week: i32) -> Option<NaiveDate> {
    let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let weekday = i64::from(jan1.weekday().num_days_from_monday());
    let thursday_offset = (3 - weekday).rem_euclid(7);
    let first_thursday = jan1 + Duration::days(thursday_offset);
    let first_monday = first_thursday - Duration::days(3);
    first_monday.checked_add_signed(Duration::weeks(i64::from(week) - 1))
}

/// Monday and Sunday (both inclusive) of the ISO week.
pub fn iso_week_range(year: i32, week: i32) -> Option<(NaiveDate, NaiveDate)> {
    let monday = iso_week_monday(year, week)?;
    Some((monday, monday + Duration::days(6)))
}

/// Everything needed to render one reservation as a calendar event.
#[derive(Debug, Clone)]
pub struct CalendarEvent<'a> {
    pub reservation_id: Uuid,
    pub axis_name: &'a str,
    pub owner_email: &'a str,
    pub year: i32,
    pub week: i32,
}

/// Renders a `VCALENDAR` with a single all-day event spanning the reservation week.
///
/// Returns `None` when the week cannot be placed on the calendar.
pub fn to_calendar_file(event: &CalendarEvent<'_>, stamp: DateTime<Utc>) -> Option<String> {
    let (monday, sunday) = iso_week_range(event.year, event.week)?;
    let end_exclusive = sunday + Duration::days(1);

    let lines = [
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:{PRODID}"),
        "CALSCALE:GREGORIAN".to_string(),
        "METHOD:PUBLISH".to_string(),
        "BEGIN:VEVENT".to_string(),
        format!("UID:booking-{}@axis-booking", event.reservation_id),
        format!("DTSTAMP:{}", stamp.format("%Y%m%dT%H%M%SZ")),
        format!("DTSTART;VALUE=DATE:{}", monday.format("%Y%m%d")),
        format!("DTEND;VALUE=DATE:{}", end_exclusive.format("%Y%m%d")),
        format!("SUMMARY:{}", escape_text(&format!("Reservation - {}", event.axis_name))),
        format!(
            "DESCRIPTION:{}",
            escape_text(&format!(
                "Reservation of axis {} for ISO week {} of {}",
                event.axis_name, event.week, event.year
            ))
        ),
        format!("LOCATION:{}", escape_text(event.axis_name)),
        format!("ORGANIZER:mailto:{}", event.owner_email),
        "END:VEVENT".to_string(),
        "END:VCALENDAR".to_string(),
    ];

    let mut out = String::new();
    for line in &lines {
        out.push_str(&fold_line(line));
        out.push_str("\r\n");
    }
    Some(out)
}

/// Attachment name for the download, e.g. `reservation_Diourbel_-_Touba_10_2025.ics`.
pub fn download_filename(axis_name: &str, week: i32, year: i32) -> String {
    let safe: String = axis_name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("reservation_{safe}_{week}_{year}.ics")
}

/// RFC 5545 TEXT escaping.
fn escape_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            ';' => escaped.push_str("\\;"),
            ',' => escaped.push_str("\\,"),
            '\n' => escaped.push_str("\\n"),
            '\r' => {}
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Folds a content line at 75 octets without splitting UTF-8 sequences.
fn fold_line(line: &str) -> String {
    if line.len() <= LINE_LIMIT {
        return line.to_string();
    }

    let mut folded = String::with_capacity(line.len() + line.len() / LINE_LIMIT * 3);
    let mut width = 0;
    for c in line.chars() {
        let len = c.len_utf8();
        if width + len > LINE_LIMIT {
            folded.push_str("\r\n ");
            // The leading space counts towards the continuation line.
            width = 1;
        }
        folded.push(c);
        width += len;
    }
    folded
}
