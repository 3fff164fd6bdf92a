use chrono::NaiveDateTime;
use rusqlite::{Connection, ToSql};
use serde::Serialize;

use crate::model::{format_datetime, is_attended, FollowupRecord};

/// A student summary field that could not be refreshed after a record save.
/// The save itself stands; the warning travels back to the caller and into the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropagationWarning {
    pub student: String,
    pub field: &'static str,
    pub message: String,
}

fn stamp(
    conn: &Connection,
    student: &str,
    field: &'static str,
    sql: &str,
    values: &[&dyn ToSql],
) -> Option<PropagationWarning> {
    let message = match conn.execute(sql, values) {
        Ok(0) => "student not found".to_string(),
        Ok(_) => return None,
        Err(e) => e.to_string(),
    };
    tracing::warn!(student, field, error = %message, "student summary update failed");
    Some(PropagationWarning {
        student: student.to_string(),
        field,
        message,
    })
}

/// Refreshes the denormalized call/attendance fields on the record's student.
/// Runs after the record is committed and never fails the save.
pub fn propagate_summary(
    conn: &Connection,
    record: &FollowupRecord,
    now: NaiveDateTime,
) -> Vec<PropagationWarning> {
    let stamp_at = format_datetime(now);
    let student = record.student.as_str();
    let mut warnings = Vec::new();

    warnings.extend(stamp(
        conn,
        student,
        "last_call_made_at",
        "UPDATE students SET last_call_made_at = ? WHERE id = ?",
        &[&stamp_at, &student],
    ));

    if !record.call_status.as_deref().is_some_and(is_attended) {
        return warnings;
    }
    let Some(stack) = record.session_stack.as_deref() else {
        tracing::debug!(
            record = %record.id,
            "attended record has no session stack; attendance summary left unchanged"
        );
        return warnings;
    };

    // last_session tracks attendance only; assigning or logging other outcomes leaves it.
    warnings.extend(stamp(
        conn,
        student,
        "last_session",
        "UPDATE students SET last_session = ? WHERE id = ?",
        &[&stack, &student],
    ));
    warnings.extend(stamp(
        conn,
        student,
        "last_attended_session",
        "UPDATE students
         SET last_attended_session = ?, last_session_attended_at = ?
         WHERE id = ?",
        &[&stack, &stamp_at, &student],
    ));

    warnings
}
