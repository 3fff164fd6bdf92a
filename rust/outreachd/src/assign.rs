use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::Serialize;

use crate::context::RequestContext;
use crate::error::{OutreachError, Result};
use crate::model::STATUS_TO_BE_CALLED;
use crate::propagate::{propagate_summary, PropagationWarning};
use crate::records::{insert_record, record_exists_for, NewRecord};
use crate::{sessions, students};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignOutcome {
    pub created: Vec<String>,
    pub count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<PropagationWarning>,
}

/// Creates one "To Be Called" record per student for the session, skipping
/// students that already have one. The existence checks and inserts share one
/// immediate transaction, so concurrent calls cannot both insert the same pair.
pub fn assign_students(
    conn: &Connection,
    ctx: &RequestContext,
    student_ids: &[String],
    followup_session: &str,
    volunteer: &str,
) -> Result<AssignOutcome> {
    let volunteer = volunteer.trim();
    if volunteer.is_empty() {
        return Err(OutreachError::bad_params("missing volunteer"));
    }
    let session = sessions::resolve_session(conn, followup_session)?;

    let mut wanted: Vec<&str> = Vec::with_capacity(student_ids.len());
    for id in student_ids.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        if !wanted.contains(&id) {
            wanted.push(id);
        }
    }

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let mut created = Vec::new();
    for student in &wanted {
        if !students::student_exists(&tx, student)? {
            return Err(OutreachError::not_found(format!(
                "Student {} not found.",
                student
            )));
        }
        if record_exists_for(&tx, student, &session.id)? {
            continue;
        }
        let record = insert_record(
            &tx,
            ctx,
            NewRecord {
                student: student.to_string(),
                followup_session: session.id.clone(),
                assigned_to: Some(volunteer.to_string()),
                session_slot: None,
                call_status: Some(STATUS_TO_BE_CALLED.to_string()),
                remarks: None,
            },
        )?;
        created.push(record);
    }
    tx.commit()?;

    tracing::info!(
        session = %session.id,
        volunteer,
        requested = wanted.len(),
        created = created.len(),
        "students assigned to followup session"
    );

    let mut warnings = Vec::new();
    for record in &created {
        warnings.extend(propagate_summary(conn, record, ctx.now));
    }

    let created: Vec<String> = created.into_iter().map(|r| r.id).collect();
    Ok(AssignOutcome {
        count: created.len(),
        created,
        warnings,
    })
}
