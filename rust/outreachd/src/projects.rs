use rusqlite::{Connection, OptionalExtension};
use serde::Deserialize;
use std::collections::HashSet;
use uuid::Uuid;

use crate::context::RequestContext;
use crate::error::{OutreachError, Result};
use crate::model::{parse_date, OutreachProject, Participant, DATE_FORMAT};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub name: String,
    pub start_date: String,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub participants: Vec<Participant>,
}

/// Participant phones must be unique within one project. Blank phones are ignored.
pub fn check_participant_phones(participants: &[Participant]) -> Result<()> {
    let mut seen = HashSet::new();
    for p in participants {
        let phone = p.phone.trim();
        if phone.is_empty() {
            continue;
        }
        if !seen.insert(phone) {
            return Err(OutreachError::validation(
                "Duplicate phone found in project participants",
            ));
        }
    }
    Ok(())
}

pub fn create_project(
    conn: &Connection,
    ctx: &RequestContext,
    input: &NewProject,
) -> Result<OutreachProject> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(OutreachError::bad_params("name must not be empty"));
    }
    let start = parse_date(&input.start_date)
        .ok_or_else(|| OutreachError::bad_params("startDate must be YYYY-MM-DD"))?;
    let end = match input.end_date.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            parse_date(raw)
                .ok_or_else(|| OutreachError::bad_params("endDate must be YYYY-MM-DD"))?,
        ),
    };
    if let Some(end) = end {
        if end < start {
            return Err(OutreachError::validation(
                "End date cannot be before start date.",
            ));
        }
    }
    check_participant_phones(&input.participants)?;

    let project = OutreachProject {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        start_date: start.format(DATE_FORMAT).to_string(),
        end_date: end.map(|d| d.format(DATE_FORMAT).to_string()),
        participants: input
            .participants
            .iter()
            .map(|p| Participant {
                name: p.name.trim().to_string(),
                phone: p.phone.trim().to_string(),
            })
            .collect(),
    };

    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO outreach_projects(id, name, start_date, end_date, created_at)
         VALUES(?, ?, ?, ?, ?)",
        (
            &project.id,
            &project.name,
            &project.start_date,
            &project.end_date,
            ctx.now_str(),
        ),
    )?;
    for (i, p) in project.participants.iter().enumerate() {
        tx.execute(
            "INSERT INTO project_participants(project_id, sort_order, participant_name, phone)
             VALUES(?, ?, ?, ?)",
            (&project.id, i as i64, &p.name, &p.phone),
        )?;
    }
    tx.commit()?;

    Ok(project)
}

pub fn project_exists(conn: &Connection, project_id: &str) -> Result<bool> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM outreach_projects WHERE id = ?",
            [project_id],
            |r| r.get::<_, i64>(0),
        )
        .optional()?
        .is_some())
}

pub fn require_project(conn: &Connection, project_id: Option<&str>) -> Result<()> {
    if let Some(id) = project_id {
        if !project_exists(conn, id)? {
            return Err(OutreachError::not_found(format!(
                "Outreach Project {} not found.",
                id
            )));
        }
    }
    Ok(())
}

pub fn list_projects(conn: &Connection) -> Result<Vec<OutreachProject>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, start_date, end_date
         FROM outreach_projects
         ORDER BY start_date DESC, name",
    )?;
    let mut projects = stmt
        .query_map([], |r| {
            Ok(OutreachProject {
                id: r.get(0)?,
                name: r.get(1)?,
                start_date: r.get(2)?,
                end_date: r.get(3)?,
                participants: Vec::new(),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut part_stmt = conn.prepare(
        "SELECT participant_name, phone
         FROM project_participants
         WHERE project_id = ?
         ORDER BY sort_order",
    )?;
    for project in projects.iter_mut() {
        project.participants = part_stmt
            .query_map([&project.id], |r| {
                Ok(Participant {
                    name: r.get(0)?,
                    phone: r.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
    }
    Ok(projects)
}
