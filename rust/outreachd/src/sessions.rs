//! Session stacks, the slots scheduled inside them, and the followup sessions
//! volunteers call students about.

use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::RequestContext;
use crate::error::{OutreachError, Result};
use crate::model::{
    format_datetime, non_blank, parse_datetime, FollowupSession, SessionSlot, SessionStack,
    DEFAULT_STATUS_OPTIONS, STATUS_TO_BE_CALLED,
};
use crate::projects;

pub fn create_stack(
    conn: &Connection,
    name: &str,
    outreach_project: Option<&str>,
) -> Result<SessionStack> {
    let name = name.trim();
    if name.is_empty() {
        return Err(OutreachError::bad_params("name must not be empty"));
    }
    let project = non_blank(outreach_project);
    projects::require_project(conn, project.as_deref())?;

    let taken = conn
        .query_row("SELECT 1 FROM session_stacks WHERE name = ?", [name], |r| {
            r.get::<_, i64>(0)
        })
        .optional()?
        .is_some();
    if taken {
        return Err(OutreachError::validation(format!(
            "Session Stack {} already exists.",
            name
        )));
    }

    let stack = SessionStack {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        outreach_project: project,
    };
    conn.execute(
        "INSERT INTO session_stacks(id, name, outreach_project_id) VALUES(?, ?, ?)",
        (&stack.id, &stack.name, &stack.outreach_project),
    )?;
    Ok(stack)
}

pub fn list_stacks(conn: &Connection) -> Result<Vec<SessionStack>> {
    let mut stmt =
        conn.prepare("SELECT id, name, outreach_project_id FROM session_stacks ORDER BY name")?;
    let stacks = stmt
        .query_map([], |r| {
            Ok(SessionStack {
                id: r.get(0)?,
                name: r.get(1)?,
                outreach_project: r.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(stacks)
}

pub fn stack_name(conn: &Connection, stack_id: &str) -> Result<Option<String>> {
    Ok(conn
        .query_row(
            "SELECT name FROM session_stacks WHERE id = ?",
            [stack_id],
            |r| r.get(0),
        )
        .optional()?)
}

fn require_stack(conn: &Connection, stack_id: Option<&str>) -> Result<()> {
    if let Some(id) = stack_id {
        if stack_name(conn, id)?.is_none() {
            return Err(OutreachError::not_found(format!(
                "Session Stack {} not found.",
                id
            )));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSlot {
    pub name: String,
    #[serde(default)]
    pub session_stack: Option<String>,
    pub date_and_time: String,
    #[serde(default)]
    pub speaker: Option<String>,
    #[serde(default)]
    pub outreach_project: Option<String>,
}

pub fn create_slot(conn: &Connection, input: &NewSlot) -> Result<SessionSlot> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(OutreachError::bad_params("name must not be empty"));
    }
    let when = parse_datetime(&input.date_and_time).ok_or_else(|| {
        OutreachError::bad_params("dateAndTime must be YYYY-MM-DD HH:MM[:SS]")
    })?;
    let stack = non_blank(input.session_stack.as_deref());
    let project = non_blank(input.outreach_project.as_deref());
    require_stack(conn, stack.as_deref())?;
    projects::require_project(conn, project.as_deref())?;

    let slot = SessionSlot {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        session_stack: stack,
        date_and_time: format_datetime(when),
        speaker: non_blank(input.speaker.as_deref()),
        outreach_project: project,
    };
    conn.execute(
        "INSERT INTO session_slots(
           id, name, session_stack_id, date_and_time, speaker, outreach_project_id
         ) VALUES(?, ?, ?, ?, ?, ?)",
        (
            &slot.id,
            &slot.name,
            &slot.session_stack,
            &slot.date_and_time,
            &slot.speaker,
            &slot.outreach_project,
        ),
    )?;
    Ok(slot)
}

fn slot_from_row(r: &Row<'_>) -> rusqlite::Result<SessionSlot> {
    Ok(SessionSlot {
        id: r.get(0)?,
        name: r.get(1)?,
        session_stack: r.get(2)?,
        date_and_time: r.get(3)?,
        speaker: r.get(4)?,
        outreach_project: r.get(5)?,
    })
}

pub fn find_slot(conn: &Connection, slot_id: &str) -> Result<Option<SessionSlot>> {
    Ok(conn
        .query_row(
            "SELECT id, name, session_stack_id, date_and_time, speaker, outreach_project_id
             FROM session_slots
             WHERE id = ?",
            [slot_id],
            slot_from_row,
        )
        .optional()?)
}

/// Dropdown entry for a selectable slot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotOption {
    pub name: String,
    pub value: String,
    pub label: String,
    pub date_and_time: String,
}

/// Future slots of a stack, soonest first.
pub fn slots_for_stack(
    conn: &Connection,
    ctx: &RequestContext,
    stack_id: &str,
) -> Result<Vec<SlotOption>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, session_stack_id, date_and_time, speaker, outreach_project_id
         FROM session_slots
         WHERE session_stack_id = ? AND date_and_time > ?
         ORDER BY date_and_time ASC, name",
    )?;
    let slots = stmt
        .query_map((stack_id, ctx.now_str()), slot_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(slots
        .into_iter()
        .map(|s| SlotOption {
            label: format!("{} — {}", s.name, s.date_and_time),
            name: s.id.clone(),
            value: s.id,
            date_and_time: s.date_and_time,
        })
        .collect())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFollowupSession {
    pub name: String,
    #[serde(default)]
    pub session_stack: Option<String>,
    pub deadline: String,
    /// `None` selects the default option list; an explicit empty list is rejected.
    #[serde(default)]
    pub status_options: Option<Vec<String>>,
}

/// Trims, drops blanks and duplicates, and puts the initial status first.
pub fn normalize_status_options(raw: Option<&[String]>) -> Result<Vec<String>> {
    let labels: Vec<String> = match raw {
        None => DEFAULT_STATUS_OPTIONS.iter().map(|s| s.to_string()).collect(),
        Some(list) => list
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    };
    if labels.is_empty() {
        return Err(OutreachError::validation(
            "At least one status option is required.",
        ));
    }
    let mut out = vec![STATUS_TO_BE_CALLED.to_string()];
    for label in labels {
        if !out.contains(&label) {
            out.push(label);
        }
    }
    Ok(out)
}

pub fn create_session(
    conn: &Connection,
    ctx: &RequestContext,
    input: &NewFollowupSession,
) -> Result<FollowupSession> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(OutreachError::bad_params("name must not be empty"));
    }
    let deadline = parse_datetime(&input.deadline)
        .ok_or_else(|| OutreachError::bad_params("deadline must be YYYY-MM-DD HH:MM[:SS]"))?;
    if deadline.date() < ctx.now.date() {
        return Err(OutreachError::validation("Deadline cannot be in the past."));
    }
    let stack = non_blank(input.session_stack.as_deref());
    require_stack(conn, stack.as_deref())?;
    let status_options = normalize_status_options(input.status_options.as_deref())?;

    let session = FollowupSession {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        session_stack: stack,
        deadline: format_datetime(deadline),
        status_options,
    };

    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO followup_sessions(id, name, session_stack_id, deadline, created_at)
         VALUES(?, ?, ?, ?, ?)",
        (
            &session.id,
            &session.name,
            &session.session_stack,
            &session.deadline,
            ctx.now_str(),
        ),
    )?;
    for (i, label) in session.status_options.iter().enumerate() {
        tx.execute(
            "INSERT INTO followup_session_status_options(session_id, sort_order, option_label)
             VALUES(?, ?, ?)",
            (&session.id, i as i64, label),
        )?;
    }
    tx.commit()?;
    Ok(session)
}

fn load_status_options(conn: &Connection, session_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT option_label FROM followup_session_status_options
         WHERE session_id = ?
         ORDER BY sort_order",
    )?;
    let labels = stmt
        .query_map([session_id], |r| r.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(labels)
}

fn find_session_by(conn: &Connection, column: &str, key: &str) -> Result<Option<FollowupSession>> {
    let sql = format!(
        "SELECT id, name, session_stack_id, deadline FROM followup_sessions
         WHERE {} = ?
         ORDER BY deadline DESC
         LIMIT 1",
        column
    );
    let found = conn
        .query_row(&sql, [key], |r| {
            Ok(FollowupSession {
                id: r.get(0)?,
                name: r.get(1)?,
                session_stack: r.get(2)?,
                deadline: r.get(3)?,
                status_options: Vec::new(),
            })
        })
        .optional()?;
    match found {
        Some(mut session) => {
            session.status_options = load_status_options(conn, &session.id)?;
            Ok(Some(session))
        }
        None => Ok(None),
    }
}

pub fn find_session(conn: &Connection, session_id: &str) -> Result<Option<FollowupSession>> {
    find_session_by(conn, "id", session_id)
}

/// Resolves a session from an id or from a dropdown label
/// (`"<name> — <stack> (Deadline: ...)"`): the text before the dash is tried as an
/// id, then as a session name.
pub fn resolve_session(conn: &Connection, key: &str) -> Result<FollowupSession> {
    let head = key.split('—').next().unwrap_or(key).trim();
    if head.is_empty() {
        return Err(OutreachError::bad_params("missing followupSession"));
    }
    if let Some(session) = find_session_by(conn, "id", head)? {
        return Ok(session);
    }
    if let Some(session) = find_session_by(conn, "name", head)? {
        return Ok(session);
    }
    Err(OutreachError::not_found(format!(
        "Invalid Followup Session selected: {}",
        head
    )))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOption {
    pub label: String,
    pub value: String,
    pub session_stack: Option<String>,
    pub deadline: String,
}

/// Sessions whose deadline has not passed, nearest deadline first.
pub fn active_sessions(conn: &Connection, ctx: &RequestContext) -> Result<Vec<SessionOption>> {
    let mut stmt = conn.prepare(
        "SELECT fs.id, fs.name, fs.session_stack_id, st.name, fs.deadline
         FROM followup_sessions fs
         LEFT JOIN session_stacks st ON st.id = fs.session_stack_id
         WHERE fs.deadline > ?
         ORDER BY fs.deadline ASC, fs.name",
    )?;
    let rows = stmt
        .query_map([ctx.now_str()], |r| {
            let id: String = r.get(0)?;
            let name: String = r.get(1)?;
            let stack_id: Option<String> = r.get(2)?;
            let stack_name: Option<String> = r.get(3)?;
            let deadline: String = r.get(4)?;
            Ok(SessionOption {
                label: format!(
                    "{} — {} (Deadline: {})",
                    name,
                    stack_name.as_deref().unwrap_or("No Stack"),
                    deadline
                ),
                value: id,
                session_stack: stack_id,
                deadline,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
