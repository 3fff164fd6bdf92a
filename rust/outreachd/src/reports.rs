use rusqlite::{params_from_iter, types::Value, Connection};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::Result;
use crate::model::{STATUS_ATTENDED, STATUS_FLUNKED, STATUS_PARTIALLY_ATTENDED};
use crate::sessions;

pub const DEFAULT_REPORT_LIMIT: u32 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportColumn {
    pub fieldname: String,
    pub label: String,
    pub fieldtype: &'static str,
    pub width: u32,
}

impl ReportColumn {
    fn new(
        fieldname: impl Into<String>,
        label: impl Into<String>,
        fieldtype: &'static str,
        width: u32,
    ) -> Self {
        Self {
            fieldname: fieldname.into(),
            label: label.into(),
            fieldtype,
            width,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportTable {
    pub columns: Vec<ReportColumn>,
    pub data: Vec<serde_json::Value>,
}

fn limit_or_default(limit: Option<u32>) -> i64 {
    i64::from(limit.unwrap_or(DEFAULT_REPORT_LIMIT))
}

pub fn stack_column(stack_id: &str) -> String {
    format!("stack_{}", stack_id)
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotSummaryFilters {
    pub outreach_project: Option<String>,
    pub session_stack: Option<String>,
    pub limit: Option<u32>,
}

/// One row per slot, newest first, with attended/flunked counts over the
/// records that chose it. Slots nobody chose still appear with zeros.
pub fn slot_attendance_summary(
    conn: &Connection,
    filters: &SlotSummaryFilters,
) -> Result<ReportTable> {
    let columns = vec![
        ReportColumn::new("slot", "Slot", "Link", 220),
        ReportColumn::new("slotName", "Slot Name", "Data", 180),
        ReportColumn::new("datetime", "Date/Time", "Datetime", 170),
        ReportColumn::new("sessionStack", "Stack", "Link", 200),
        ReportColumn::new("attended", "Attended", "Int", 100),
        ReportColumn::new("flunked", "Flunked", "Int", 100),
    ];

    let mut stmt = conn.prepare(
        "SELECT ss.id, ss.name, ss.date_and_time, ss.session_stack_id,
                COALESCE(SUM(CASE WHEN fr.call_status IN (?1, ?2) THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN fr.call_status = ?3 THEN 1 ELSE 0 END), 0)
         FROM session_slots ss
         LEFT JOIN followup_records fr ON fr.session_slot_id = ss.id
         WHERE (?4 IS NULL OR ss.outreach_project_id = ?4)
           AND (?5 IS NULL OR ss.session_stack_id = ?5)
         GROUP BY ss.id
         ORDER BY ss.date_and_time DESC, ss.name
         LIMIT ?6",
    )?;
    let data = stmt
        .query_map(
            rusqlite::params![
                STATUS_ATTENDED,
                STATUS_PARTIALLY_ATTENDED,
                STATUS_FLUNKED,
                filters.outreach_project,
                filters.session_stack,
                limit_or_default(filters.limit),
            ],
            |r| {
                let slot: String = r.get(0)?;
                let name: String = r.get(1)?;
                let when: String = r.get(2)?;
                let stack: Option<String> = r.get(3)?;
                let attended: i64 = r.get(4)?;
                let flunked: i64 = r.get(5)?;
                Ok(json!({
                    "slot": slot,
                    "slotName": name,
                    "datetime": when,
                    "sessionStack": stack,
                    "attended": attended,
                    "flunked": flunked,
                }))
            },
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(ReportTable { columns, data })
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MentorMatrixFilters {
    pub outreach_project: Option<String>,
    pub session_stack: Option<String>,
    pub limit: Option<u32>,
}

/// Mentor x stack matrix of distinct students with an attended record.
pub fn stack_attendance_by_mentor(
    conn: &Connection,
    filters: &MentorMatrixFilters,
) -> Result<ReportTable> {
    let mut stmt = conn.prepare(
        "SELECT s.mentor, fr.session_stack_id, st.name, COUNT(DISTINCT s.id)
         FROM followup_records fr
         JOIN students s ON s.id = fr.student_id
         JOIN session_stacks st ON st.id = fr.session_stack_id
         WHERE fr.call_status IN (?1, ?2)
           AND (?3 IS NULL OR s.outreach_project_id = ?3)
           AND (?4 IS NULL OR fr.session_stack_id = ?4)
         GROUP BY s.mentor, fr.session_stack_id
         ORDER BY st.name, fr.session_stack_id",
    )?;
    let cells = stmt
        .query_map(
            rusqlite::params![
                STATUS_ATTENDED,
                STATUS_PARTIALLY_ATTENDED,
                filters.outreach_project,
                filters.session_stack,
            ],
            |r| {
                Ok((
                    r.get::<_, Option<String>>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, i64>(3)?,
                ))
            },
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut columns = vec![ReportColumn::new("mentor", "Mentor", "Link", 200)];
    let mut stack_order: Vec<String> = Vec::new();
    // mentor -> stack -> distinct attended students
    let mut matrix: BTreeMap<Option<String>, HashMap<String, i64>> = BTreeMap::new();
    for (mentor, stack_id, stack_label, count) in cells {
        if !stack_order.contains(&stack_id) {
            columns.push(ReportColumn::new(stack_column(&stack_id), stack_label, "Int", 120));
            stack_order.push(stack_id.clone());
        }
        matrix.entry(mentor).or_default().insert(stack_id, count);
    }
    columns.push(ReportColumn::new("total", "Total", "Int", 100));

    let mut rows: Vec<(Option<String>, i64, serde_json::Value)> = matrix
        .into_iter()
        .map(|(mentor, by_stack)| {
            let mut row = serde_json::Map::new();
            row.insert("mentor".into(), json!(mentor));
            let mut total = 0;
            for stack_id in &stack_order {
                let n = by_stack.get(stack_id).copied().unwrap_or(0);
                total += n;
                row.insert(stack_column(stack_id), json!(n));
            }
            row.insert("total".into(), json!(total));
            (mentor, total, serde_json::Value::Object(row))
        })
        .collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let limit = filters.limit.unwrap_or(DEFAULT_REPORT_LIMIT) as usize;
    let data = rows.into_iter().take(limit).map(|(_, _, row)| row).collect();
    Ok(ReportTable { columns, data })
}

/// Stacks may arrive as a JSON list or a comma-separated string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StackSelection {
    List(Vec<String>),
    Csv(String),
}

impl Default for StackSelection {
    fn default() -> Self {
        StackSelection::List(Vec::new())
    }
}

impl StackSelection {
    pub fn ids(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            StackSelection::List(items) => items.iter().map(String::as_str).collect(),
            StackSelection::Csv(joined) => joined.split(',').collect(),
        };
        let mut out: Vec<String> = Vec::new();
        for id in raw.into_iter().map(str::trim).filter(|s| !s.is_empty()) {
            if !out.iter().any(|o| o == id) {
                out.push(id.to_string());
            }
        }
        out
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentPivotFilters {
    #[serde(default)]
    pub session_stacks: StackSelection,
    pub outreach_project: Option<String>,
    pub limit: Option<u32>,
}

/// Students x requested stacks, "P" where the student has an attended record
/// whose effective stack is that column's stack.
pub fn student_attendance(conn: &Connection, filters: &StudentPivotFilters) -> Result<ReportTable> {
    let mut columns = vec![
        ReportColumn::new("student", "Student", "Link", 180),
        ReportColumn::new("studentName", "Student Name", "Data", 200),
    ];
    let stacks = filters.session_stacks.ids();
    if stacks.is_empty() {
        return Ok(ReportTable {
            columns,
            data: Vec::new(),
        });
    }
    for stack_id in &stacks {
        let label = sessions::stack_name(conn, stack_id)?.unwrap_or_else(|| stack_id.clone());
        columns.push(ReportColumn::new(stack_column(stack_id), label, "Data", 70));
    }

    let mut stmt = conn.prepare(
        "SELECT id, student_name
         FROM students
         WHERE (?1 IS NULL OR outreach_project_id = ?1)
         ORDER BY student_name, id
         LIMIT ?2",
    )?;
    let students = stmt
        .query_map(
            rusqlite::params![filters.outreach_project, limit_or_default(filters.limit)],
            |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)),
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let placeholders = vec!["?"; stacks.len()].join(", ");
    let sql = format!(
        "SELECT DISTINCT student_id, session_stack_id
         FROM followup_records
         WHERE call_status IN (?, ?)
           AND session_stack_id IN ({})",
        placeholders
    );
    let mut bind: Vec<Value> = vec![
        Value::Text(STATUS_ATTENDED.to_string()),
        Value::Text(STATUS_PARTIALLY_ATTENDED.to_string()),
    ];
    bind.extend(stacks.iter().cloned().map(Value::Text));
    let mut stmt = conn.prepare(&sql)?;
    let present: HashSet<(String, String)> = stmt
        .query_map(params_from_iter(bind), |r| Ok((r.get(0)?, r.get(1)?)))?
        .collect::<std::result::Result<_, _>>()?;

    let data = students
        .into_iter()
        .map(|(id, name)| {
            let mut row = serde_json::Map::new();
            for stack_id in &stacks {
                let mark = if present.contains(&(id.clone(), stack_id.clone())) {
                    "P"
                } else {
                    ""
                };
                row.insert(stack_column(stack_id), json!(mark));
            }
            row.insert("student".into(), json!(id));
            row.insert("studentName".into(), json!(name));
            serde_json::Value::Object(row)
        })
        .collect();

    Ok(ReportTable { columns, data })
}
