use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub const STATUS_TO_BE_CALLED: &str = "To Be Called";
pub const STATUS_ATTENDED: &str = "Attended";
pub const STATUS_PARTIALLY_ATTENDED: &str = "Partially Attended";
pub const STATUS_FLUNKED: &str = "Flunked";

pub const ATTENDED_STATUSES: [&str; 2] = [STATUS_ATTENDED, STATUS_PARTIALLY_ATTENDED];

/// Options a followup session gets when it is created without an explicit list.
pub const DEFAULT_STATUS_OPTIONS: [&str; 7] = [
    "Available",
    "Will Try",
    "Not Available",
    "Didn't Pick",
    STATUS_ATTENDED,
    STATUS_FLUNKED,
    STATUS_PARTIALLY_ATTENDED,
];

pub fn is_attended(status: &str) -> bool {
    ATTENDED_STATUSES.contains(&status)
}

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn format_datetime(dt: NaiveDateTime) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

/// Accepts `YYYY-MM-DD HH:MM[:SS[.f]]` (space or `T` separated) or a bare date (midnight).
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let t = raw.trim();
    for fmt in [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ] {
        if let Ok(v) = NaiveDateTime::parse_from_str(t, fmt) {
            return Some(v);
        }
    }
    parse_date(t).and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Trimmed value, or `None` when absent or blank.
pub fn non_blank(v: Option<&str>) -> Option<String> {
    v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutreachProject {
    pub id: String,
    pub name: String,
    pub start_date: String,
    pub end_date: Option<String>,
    pub participants: Vec<Participant>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub first_name: String,
    pub last_name: Option<String>,
    pub student_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub mentor: Option<String>,
    pub outreach_project: Option<String>,
    pub last_session: Option<String>,
    pub last_call_made_at: Option<String>,
    pub last_attended_session: Option<String>,
    pub last_session_attended_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStack {
    pub id: String,
    pub name: String,
    pub outreach_project: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSlot {
    pub id: String,
    pub name: String,
    pub session_stack: Option<String>,
    pub date_and_time: String,
    pub speaker: Option<String>,
    pub outreach_project: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowupSession {
    pub id: String,
    pub name: String,
    pub session_stack: Option<String>,
    pub deadline: String,
    pub status_options: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowupRecord {
    pub id: String,
    pub student: String,
    pub followup_session: String,
    /// Effective stack: the session's stack, else the chosen slot's stack.
    pub session_stack: Option<String>,
    pub assigned_to: Option<String>,
    pub session_slot: Option<String>,
    pub call_status: Option<String>,
    pub remarks: Option<String>,
    pub last_contacted: Option<String>,
    pub created_at: String,
    pub modified_at: String,
}
