use chrono::{DateTime, Utc};

use crate::domain::value_objects::masterclasses::Masterclass;

/// Renders a single-event ICS document for the invite attachment. Mail
/// clients surface it as an "add to calendar" action.
pub fn masterclass_invite(
    masterclass: &Masterclass,
    organizer_name: &str,
    organizer_email: &str,
    attendee_name: &str,
    attendee_email: &str,
) -> String {
    let mut description = masterclass
        .description
        .clone()
        .unwrap_or_else(|| "Live masterclass session".to_string());
    if let Some(link) = &masterclass.meeting_link {
        description.push_str("\n\nJoin Meeting: ");
        description.push_str(link);
    }

    let location = masterclass
        .meeting_link
        .clone()
        .or_else(|| masterclass.location.clone())
        .unwrap_or_else(|| "Online".to_string());

    let lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        "PRODID:-//masterclass-invites//EN".to_string(),
        "METHOD:REQUEST".to_string(),
        "BEGIN:VEVENT".to_string(),
        format!("UID:masterclass-{}@invites", masterclass.id),
        format!("DTSTAMP:{}", ics_timestamp(Utc::now())),
        format!("DTSTART:{}", ics_timestamp(masterclass.start_time)),
        format!("DTEND:{}", ics_timestamp(masterclass.end_time)),
        format!("SUMMARY:{}", escape_text(&masterclass.title)),
        format!("DESCRIPTION:{}", escape_text(&description)),
        format!("LOCATION:{}", escape_text(&location)),
        format!(
            "ORGANIZER;CN={}:mailto:{}",
            escape_text(organizer_name),
            organizer_email
        ),
        format!(
            "ATTENDEE;CN={};PARTSTAT=ACCEPTED:mailto:{}",
            escape_text(attendee_name),
            attendee_email
        ),
        "END:VEVENT".to_string(),
        "END:VCALENDAR".to_string(),
    ];

    // ICS requires CRLF line endings.
    lines.join("\r\n")
}

fn ics_timestamp(instant: DateTime<Utc>) -> String {
    instant.format("%Y%m%dT%H%M%SZ").to_string()
}

// Commas, semicolons and newlines are structural in ICS text values.
fn escape_text(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace(',', "\\,")
        .replace(';', "\\;")
        .replace('\n', "\\n")
}
