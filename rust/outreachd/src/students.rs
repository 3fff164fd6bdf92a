use rusqlite::{Connection, OptionalExtension, Row};
use serde::Deserialize;
use uuid::Uuid;

use crate::context::RequestContext;
use crate::error::{OutreachError, Result};
use crate::model::{non_blank, Student};
use crate::projects;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStudent {
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub mentor: Option<String>,
    #[serde(default)]
    pub outreach_project: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentFilter {
    #[serde(default)]
    pub outreach_project: Option<String>,
    #[serde(default)]
    pub mentor: Option<String>,
}

const STUDENT_COLUMNS: &str = "id, first_name, last_name, student_name, email, phone, mentor,
    outreach_project_id, last_session, last_call_made_at, last_attended_session,
    last_session_attended_at";

fn student_from_row(r: &Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        id: r.get(0)?,
        first_name: r.get(1)?,
        last_name: r.get(2)?,
        student_name: r.get(3)?,
        email: r.get(4)?,
        phone: r.get(5)?,
        mentor: r.get(6)?,
        outreach_project: r.get(7)?,
        last_session: r.get(8)?,
        last_call_made_at: r.get(9)?,
        last_attended_session: r.get(10)?,
        last_session_attended_at: r.get(11)?,
    })
}

/// Phone must be unique among the students of one project.
pub fn check_unique_phone(
    conn: &Connection,
    phone: Option<&str>,
    project_id: Option<&str>,
    exclude_student: Option<&str>,
) -> Result<()> {
    let (Some(phone), Some(project_id)) = (phone, project_id) else {
        return Ok(());
    };
    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM students
             WHERE phone = ? AND outreach_project_id = ? AND id != COALESCE(?, '')
             LIMIT 1",
            (phone, project_id, exclude_student),
            |r| r.get(0),
        )
        .optional()?;
    if existing.is_some() {
        return Err(OutreachError::validation(format!(
            "Phone {} already exists for another student in project {}",
            phone, project_id
        )));
    }
    Ok(())
}

pub fn create_student(
    conn: &Connection,
    ctx: &RequestContext,
    input: &NewStudent,
) -> Result<Student> {
    let first_name = input.first_name.trim();
    if first_name.is_empty() {
        return Err(OutreachError::bad_params("firstName must not be empty"));
    }
    let last_name = non_blank(input.last_name.as_deref());
    let phone = non_blank(input.phone.as_deref());
    let project = non_blank(input.outreach_project.as_deref());

    projects::require_project(conn, project.as_deref())?;
    check_unique_phone(conn, phone.as_deref(), project.as_deref(), None)?;

    let student_name = match &last_name {
        Some(last) => format!("{} {}", first_name, last),
        None => first_name.to_string(),
    };
    let student = Student {
        id: Uuid::new_v4().to_string(),
        first_name: first_name.to_string(),
        last_name,
        student_name,
        email: non_blank(input.email.as_deref()),
        phone,
        mentor: non_blank(input.mentor.as_deref()),
        outreach_project: project,
        last_session: None,
        last_call_made_at: None,
        last_attended_session: None,
        last_session_attended_at: None,
    };

    conn.execute(
        "INSERT INTO students(
           id, first_name, last_name, student_name, email, phone, mentor,
           outreach_project_id, created_at
         ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &student.id,
            &student.first_name,
            &student.last_name,
            &student.student_name,
            &student.email,
            &student.phone,
            &student.mentor,
            &student.outreach_project,
            ctx.now_str(),
        ),
    )?;
    Ok(student)
}

pub fn find_student(conn: &Connection, student_id: &str) -> Result<Option<Student>> {
    let sql = format!("SELECT {} FROM students WHERE id = ?", STUDENT_COLUMNS);
    Ok(conn
        .query_row(&sql, [student_id], student_from_row)
        .optional()?)
}

pub fn get_student(conn: &Connection, student_id: &str) -> Result<Student> {
    find_student(conn, student_id)?
        .ok_or_else(|| OutreachError::not_found(format!("Student {} not found.", student_id)))
}

pub fn student_exists(conn: &Connection, student_id: &str) -> Result<bool> {
    Ok(conn
        .query_row("SELECT 1 FROM students WHERE id = ?", [student_id], |r| {
            r.get::<_, i64>(0)
        })
        .optional()?
        .is_some())
}

pub fn list_students(conn: &Connection, filter: &StudentFilter) -> Result<Vec<Student>> {
    let sql = format!(
        "SELECT {} FROM students
         WHERE (?1 IS NULL OR outreach_project_id = ?1)
           AND (?2 IS NULL OR mentor = ?2)
         ORDER BY student_name, id",
        STUDENT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let students = stmt
        .query_map(
            (
                non_blank(filter.outreach_project.as_deref()),
                non_blank(filter.mentor.as_deref()),
            ),
            student_from_row,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(students)
}
