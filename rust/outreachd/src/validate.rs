use chrono::NaiveDateTime;
use rusqlite::Connection;

use crate::error::{OutreachError, Result};
use crate::model::{parse_datetime, FollowupSession, SessionSlot};
use crate::{sessions, students};

/// The fields of a followup record that cross-entity validation looks at.
#[derive(Debug, Clone, Copy)]
pub struct RecordDraft<'a> {
    pub student: &'a str,
    pub followup_session: &'a str,
    pub session_slot: Option<&'a str>,
    pub call_status: Option<&'a str>,
}

/// Entities loaded while validating, reused by the caller to persist the record.
#[derive(Debug, Clone)]
pub struct Validated {
    pub session: FollowupSession,
    pub slot: Option<SessionSlot>,
}

impl Validated {
    /// The session's stack wins; the slot's stack is the fallback.
    pub fn effective_stack(&self) -> Option<String> {
        self.session
            .session_stack
            .clone()
            .or_else(|| self.slot.as_ref().and_then(|s| s.session_stack.clone()))
    }
}

pub fn check_slot_in_future(slot: &SessionSlot, now: NaiveDateTime) -> Result<()> {
    let when = parse_datetime(&slot.date_and_time).ok_or_else(|| {
        OutreachError::validation(format!(
            "Session Slot {} has an unreadable date/time.",
            slot.id
        ))
    })?;
    if when <= now {
        return Err(OutreachError::validation(
            "Cannot select a Session Slot whose time is already in the past.",
        ));
    }
    Ok(())
}

pub fn check_stack_consistency(slot: &SessionSlot, session: &FollowupSession) -> Result<()> {
    match (&slot.session_stack, &session.session_stack) {
        (Some(slot_stack), Some(session_stack)) if slot_stack != session_stack => {
            Err(OutreachError::validation(
                "Selected Session Slot does not belong to this Followup Session's Session Stack.",
            ))
        }
        _ => Ok(()),
    }
}

pub fn check_status_allowed(status: &str, session: &FollowupSession) -> Result<()> {
    if session.status_options.is_empty() || session.status_options.iter().any(|o| o == status) {
        return Ok(());
    }
    Err(OutreachError::validation(format!(
        "Call Status {} is not one of the options configured for Followup Session {}.",
        status, session.name
    )))
}

/// Runs before every followup record write. Nothing is persisted on error.
pub fn validate_record(
    conn: &Connection,
    draft: &RecordDraft<'_>,
    now: NaiveDateTime,
) -> Result<Validated> {
    if !students::student_exists(conn, draft.student)? {
        return Err(OutreachError::not_found(format!(
            "Student {} not found.",
            draft.student
        )));
    }
    let session = sessions::find_session(conn, draft.followup_session)?.ok_or_else(|| {
        OutreachError::not_found(format!(
            "Followup Session {} not found.",
            draft.followup_session
        ))
    })?;

    let slot = match draft.session_slot {
        Some(slot_id) => {
            let slot = sessions::find_slot(conn, slot_id)?.ok_or_else(|| {
                OutreachError::not_found(format!("Session Slot {} not found.", slot_id))
            })?;
            check_slot_in_future(&slot, now)?;
            check_stack_consistency(&slot, &session)?;
            Some(slot)
        }
        None => None,
    };

    if let Some(status) = draft.call_status.filter(|s| !s.is_empty()) {
        check_status_allowed(status, &session)?;
    }

    Ok(Validated { session, slot })
}
