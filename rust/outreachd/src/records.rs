use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::context::RequestContext;
use crate::error::{OutreachError, Result};
use crate::model::{non_blank, FollowupRecord};
use crate::propagate::{propagate_summary, PropagationWarning};
use crate::validate::{validate_record, RecordDraft};

pub const DEFAULT_LIST_LIMIT: u32 = 200;
pub const MAX_LIST_LIMIT: u32 = 1000;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordInput {
    #[serde(default)]
    pub record_id: Option<String>,
    #[serde(default)]
    pub student: Option<String>,
    #[serde(default)]
    pub followup_session: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    /// For the three fields below, an absent key keeps the stored value on edit
    /// and an explicit `null` or blank value clears it.
    #[serde(default, deserialize_with = "present")]
    pub session_slot: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub call_status: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub remarks: Option<Option<String>>,
}

fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOutcome {
    pub record: FollowupRecord,
    pub warnings: Vec<PropagationWarning>,
}

/// Fields a volunteer may change through a single-field update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordField {
    CallStatus,
    Remarks,
    /// The chosen slot.
    PreferredSessionSlot,
}

impl RecordField {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordField::CallStatus => "call_status",
            RecordField::Remarks => "remarks",
            RecordField::PreferredSessionSlot => "preferred_session_slot",
        }
    }

    fn apply(self, record: &mut FollowupRecord, value: Option<String>) {
        match self {
            RecordField::CallStatus => record.call_status = value,
            RecordField::Remarks => record.remarks = value,
            RecordField::PreferredSessionSlot => record.session_slot = value,
        }
    }
}

impl FromStr for RecordField {
    type Err = OutreachError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "call_status" => Ok(RecordField::CallStatus),
            "remarks" => Ok(RecordField::Remarks),
            "preferred_session_slot" => Ok(RecordField::PreferredSessionSlot),
            other => Err(OutreachError::validation(format!(
                "Field not allowed to update: {}",
                other
            ))),
        }
    }
}

const RECORD_COLUMNS: &str = "id, student_id, followup_session_id, session_stack_id, assigned_to,
    session_slot_id, call_status, remarks, last_contacted, created_at, modified_at";

fn record_from_row(r: &Row<'_>) -> rusqlite::Result<FollowupRecord> {
    Ok(FollowupRecord {
        id: r.get(0)?,
        student: r.get(1)?,
        followup_session: r.get(2)?,
        session_stack: r.get(3)?,
        assigned_to: r.get(4)?,
        session_slot: r.get(5)?,
        call_status: r.get(6)?,
        remarks: r.get(7)?,
        last_contacted: r.get(8)?,
        created_at: r.get(9)?,
        modified_at: r.get(10)?,
    })
}

pub fn find_record(conn: &Connection, record_id: &str) -> Result<Option<FollowupRecord>> {
    let sql = format!("SELECT {} FROM followup_records WHERE id = ?", RECORD_COLUMNS);
    Ok(conn.query_row(&sql, [record_id], record_from_row).optional()?)
}

pub fn record_exists_for(
    conn: &Connection,
    student: &str,
    followup_session: &str,
) -> Result<bool> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM followup_records
             WHERE student_id = ? AND followup_session_id = ? LIMIT 1",
            (student, followup_session),
            |r| r.get::<_, i64>(0),
        )
        .optional()?
        .is_some())
}

/// Field values for a record that does not exist yet.
#[derive(Debug, Clone)]
pub(crate) struct NewRecord {
    pub student: String,
    pub followup_session: String,
    pub assigned_to: Option<String>,
    pub session_slot: Option<String>,
    pub call_status: Option<String>,
    pub remarks: Option<String>,
}

/// Validates and inserts a new record. Callers own the dedupe check and the
/// post-commit summary propagation.
pub(crate) fn insert_record(
    conn: &Connection,
    ctx: &RequestContext,
    new: NewRecord,
) -> Result<FollowupRecord> {
    let validated = validate_record(
        conn,
        &RecordDraft {
            student: &new.student,
            followup_session: &new.followup_session,
            session_slot: new.session_slot.as_deref(),
            call_status: new.call_status.as_deref(),
        },
        ctx.now,
    )?;
    let now = ctx.now_str();
    let record = FollowupRecord {
        id: Uuid::new_v4().to_string(),
        student: new.student,
        followup_session: new.followup_session,
        session_stack: validated.effective_stack(),
        assigned_to: new.assigned_to,
        session_slot: new.session_slot,
        call_status: new.call_status,
        remarks: new.remarks,
        last_contacted: None,
        created_at: now.clone(),
        modified_at: now,
    };
    conn.execute(
        "INSERT INTO followup_records(
           id, student_id, followup_session_id, session_stack_id, assigned_to,
           session_slot_id, call_status, remarks, last_contacted, created_at, modified_at
         ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &record.id,
            &record.student,
            &record.followup_session,
            &record.session_stack,
            &record.assigned_to,
            &record.session_slot,
            &record.call_status,
            &record.remarks,
            &record.last_contacted,
            &record.created_at,
            &record.modified_at,
        ),
    )?;
    Ok(record)
}

fn update_existing(
    conn: &Connection,
    ctx: &RequestContext,
    record: &mut FollowupRecord,
) -> Result<()> {
    let validated = validate_record(
        conn,
        &RecordDraft {
            student: &record.student,
            followup_session: &record.followup_session,
            session_slot: record.session_slot.as_deref(),
            call_status: record.call_status.as_deref(),
        },
        ctx.now,
    )?;
    record.session_stack = validated.effective_stack();
    record.modified_at = ctx.now_str();
    conn.execute(
        "UPDATE followup_records SET
           session_stack_id = ?, assigned_to = ?, session_slot_id = ?, call_status = ?,
           remarks = ?, last_contacted = ?, modified_at = ?
         WHERE id = ?",
        (
            &record.session_stack,
            &record.assigned_to,
            &record.session_slot,
            &record.call_status,
            &record.remarks,
            &record.last_contacted,
            &record.modified_at,
            &record.id,
        ),
    )?;
    Ok(())
}

fn denied() -> OutreachError {
    OutreachError::PermissionDenied("You are not permitted to update this record.".to_string())
}

/// Creates a record, or edits the record named by `record_id`, then refreshes
/// the student's summary fields.
pub fn save_record(
    conn: &Connection,
    ctx: &RequestContext,
    input: &RecordInput,
) -> Result<SaveOutcome> {
    let student = non_blank(input.student.as_deref());
    let followup_session = non_blank(input.followup_session.as_deref());
    let assigned_to = non_blank(input.assigned_to.as_deref());
    let session_slot = input.session_slot.as_ref().map(|v| non_blank(v.as_deref()));
    let call_status = input.call_status.as_ref().map(|v| non_blank(v.as_deref()));
    let remarks = input
        .remarks
        .as_ref()
        .map(|v| v.clone().filter(|r| !r.trim().is_empty()));

    let record = match non_blank(input.record_id.as_deref()) {
        None => {
            let student = student.ok_or_else(|| OutreachError::bad_params("missing student"))?;
            let followup_session = followup_session
                .ok_or_else(|| OutreachError::bad_params("missing followupSession"))?;
            if record_exists_for(conn, &student, &followup_session)? {
                return Err(OutreachError::validation(format!(
                    "Followup Record already exists for Student {} in Followup Session {}.",
                    student, followup_session
                )));
            }
            insert_record(
                conn,
                ctx,
                NewRecord {
                    student,
                    followup_session,
                    assigned_to,
                    session_slot: session_slot.flatten(),
                    call_status: call_status.flatten(),
                    remarks: remarks.flatten(),
                },
            )?
        }
        Some(record_id) => {
            let mut record = find_record(conn, &record_id)?
                .ok_or_else(|| OutreachError::not_found("Followup Record not found"))?;
            if !ctx.can_edit_assigned(record.assigned_to.as_deref()) {
                return Err(denied());
            }
            if student.as_deref().is_some_and(|s| s != record.student)
                || followup_session
                    .as_deref()
                    .is_some_and(|s| s != record.followup_session)
            {
                return Err(OutreachError::validation(
                    "Student and Followup Session of an existing record cannot be changed.",
                ));
            }
            if let Some(assignee) = assigned_to {
                if Some(assignee.as_str()) != record.assigned_to.as_deref()
                    && !ctx.is_coordinator()
                {
                    return Err(denied());
                }
                record.assigned_to = Some(assignee);
            }
            if let Some(slot) = session_slot {
                record.session_slot = slot;
            }
            if let Some(status) = call_status {
                record.call_status = status;
            }
            if let Some(remarks) = remarks {
                record.remarks = remarks;
            }
            update_existing(conn, ctx, &mut record)?;
            record
        }
    };

    let warnings = propagate_summary(conn, &record, ctx.now);
    Ok(SaveOutcome { record, warnings })
}

/// Sets one enumerated field on a record and stamps `last_contacted`.
pub fn update_record_field(
    conn: &Connection,
    ctx: &RequestContext,
    record_id: &str,
    field: RecordField,
    value: Option<String>,
) -> Result<SaveOutcome> {
    let mut record = find_record(conn, record_id)?
        .ok_or_else(|| OutreachError::not_found("Followup Record not found"))?;
    if !ctx.can_edit_assigned(record.assigned_to.as_deref()) {
        return Err(denied());
    }

    let value = match field {
        RecordField::Remarks => value.filter(|v| !v.trim().is_empty()),
        _ => non_blank(value.as_deref()),
    };
    field.apply(&mut record, value);
    record.last_contacted = Some(ctx.now_str());
    update_existing(conn, ctx, &mut record)?;

    let warnings = propagate_summary(conn, &record, ctx.now);
    Ok(SaveOutcome { record, warnings })
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordQuery {
    #[serde(default)]
    pub volunteer: Option<String>,
    #[serde(default)]
    pub followup_session: Option<String>,
    #[serde(default)]
    pub session_stack: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub start: Option<u32>,
}

/// One row of the volunteer call list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordRow {
    pub record_name: String,
    pub student: String,
    pub student_name: Option<String>,
    pub phone: Option<String>,
    pub followup_session: String,
    pub session_stack: Option<String>,
    pub session_slot: Option<String>,
    pub session_slot_label: String,
    pub assigned_to: Option<String>,
    pub call_status: Option<String>,
    pub remarks: Option<String>,
    pub last_contacted: Option<String>,
    pub last_updated: String,
}

/// Lists records, most recently modified first. A caller who is not a coordinator
/// and gives no volunteer filter sees only the records assigned to them.
pub fn list_records(
    conn: &Connection,
    ctx: &RequestContext,
    query: &RecordQuery,
) -> Result<Vec<RecordRow>> {
    let volunteer = non_blank(query.volunteer.as_deref()).or_else(|| {
        if ctx.is_coordinator() {
            None
        } else {
            Some(ctx.user.clone())
        }
    });
    let limit = query
        .limit
        .filter(|l| *l > 0)
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .min(MAX_LIST_LIMIT);
    let start = query.start.unwrap_or(0);

    let mut stmt = conn.prepare(
        "SELECT fr.id, fr.student_id, s.student_name, s.phone, fr.followup_session_id,
                fr.session_stack_id, fr.session_slot_id, sl.name, sl.date_and_time,
                fr.assigned_to, fr.call_status, fr.remarks, fr.last_contacted, fr.modified_at
         FROM followup_records fr
         LEFT JOIN students s ON s.id = fr.student_id
         LEFT JOIN session_slots sl ON sl.id = fr.session_slot_id
         WHERE (?1 IS NULL OR fr.assigned_to = ?1)
           AND (?2 IS NULL OR fr.followup_session_id = ?2)
           AND (?3 IS NULL OR fr.session_stack_id = ?3)
           AND (?4 IS NULL OR fr.call_status = ?4)
         ORDER BY fr.modified_at DESC, fr.id
         LIMIT ?5 OFFSET ?6",
    )?;
    let rows = stmt
        .query_map(
            (
                volunteer,
                non_blank(query.followup_session.as_deref()),
                non_blank(query.session_stack.as_deref()),
                non_blank(query.status.as_deref()),
                limit as i64,
                start as i64,
            ),
            |r| {
                let slot_name: Option<String> = r.get(7)?;
                let slot_time: Option<String> = r.get(8)?;
                Ok(RecordRow {
                    record_name: r.get(0)?,
                    student: r.get(1)?,
                    student_name: r.get(2)?,
                    phone: r.get(3)?,
                    followup_session: r.get(4)?,
                    session_stack: r.get(5)?,
                    session_slot: r.get(6)?,
                    session_slot_label: match (slot_name, slot_time) {
                        (Some(name), Some(time)) => format!("{} — {}", name, time),
                        _ => String::new(),
                    },
                    assigned_to: r.get(9)?,
                    call_status: r.get(10)?,
                    remarks: r.get(11)?,
                    last_contacted: r.get(12)?,
                    last_updated: r.get(13)?,
                })
            },
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
