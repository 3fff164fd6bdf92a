use rusqlite::Connection;
use std::path::Path;

pub const DB_FILE_NAME: &str = "outreach.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

#[cfg(test)]
pub fn open_in_memory() -> Connection {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    init_schema(&conn).expect("init schema");
    conn
}

fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS outreach_projects(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            start_date TEXT NOT NULL,
            end_date TEXT,
            created_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS project_participants(
            project_id TEXT NOT NULL,
            sort_order INTEGER NOT NULL,
            participant_name TEXT NOT NULL,
            phone TEXT NOT NULL,
            PRIMARY KEY(project_id, sort_order),
            FOREIGN KEY(project_id) REFERENCES outreach_projects(id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            first_name TEXT NOT NULL,
            last_name TEXT,
            student_name TEXT NOT NULL,
            email TEXT,
            phone TEXT,
            mentor TEXT,
            outreach_project_id TEXT,
            last_session TEXT,
            last_call_made_at TEXT,
            last_attended_session TEXT,
            last_session_attended_at TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY(outreach_project_id) REFERENCES outreach_projects(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_project_phone
         ON students(outreach_project_id, phone)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_mentor ON students(mentor)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS session_stacks(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            outreach_project_id TEXT,
            FOREIGN KEY(outreach_project_id) REFERENCES outreach_projects(id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS session_slots(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            session_stack_id TEXT,
            date_and_time TEXT NOT NULL,
            speaker TEXT,
            outreach_project_id TEXT,
            FOREIGN KEY(session_stack_id) REFERENCES session_stacks(id),
            FOREIGN KEY(outreach_project_id) REFERENCES outreach_projects(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_session_slots_stack_time
         ON session_slots(session_stack_id, date_and_time)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_session_slots_project
         ON session_slots(outreach_project_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS followup_sessions(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            session_stack_id TEXT,
            deadline TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(session_stack_id) REFERENCES session_stacks(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_followup_sessions_deadline ON followup_sessions(deadline)",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS followup_session_status_options(
            session_id TEXT NOT NULL,
            sort_order INTEGER NOT NULL,
            option_label TEXT NOT NULL,
            PRIMARY KEY(session_id, sort_order),
            FOREIGN KEY(session_id) REFERENCES followup_sessions(id)
        )",
        [],
    )?;

    // No UNIQUE on (student_id, followup_session_id); assignment dedupes
    // inside an immediate transaction.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS followup_records(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            followup_session_id TEXT NOT NULL,
            session_stack_id TEXT,
            assigned_to TEXT,
            session_slot_id TEXT,
            call_status TEXT,
            remarks TEXT,
            last_contacted TEXT,
            created_at TEXT NOT NULL,
            modified_at TEXT NOT NULL,
            FOREIGN KEY(student_id) REFERENCES students(id),
            FOREIGN KEY(followup_session_id) REFERENCES followup_sessions(id),
            FOREIGN KEY(session_stack_id) REFERENCES session_stacks(id),
            FOREIGN KEY(session_slot_id) REFERENCES session_slots(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_followup_records_student_session
         ON followup_records(student_id, followup_session_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_followup_records_assigned ON followup_records(assigned_to)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_followup_records_slot ON followup_records(session_slot_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_followup_records_stack
         ON followup_records(session_stack_id)",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_db_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = open_db(dir.path()).expect("first open");
        first
            .execute(
                "INSERT INTO session_stacks(id, name) VALUES('st-1', 'Batch1')",
                [],
            )
            .expect("insert stack");
        drop(first);

        let again = open_db(dir.path()).expect("second open");
        let count: i64 = again
            .query_row("SELECT COUNT(*) FROM session_stacks", [], |r| r.get(0))
            .expect("count");
        assert_eq!(count, 1);
        assert!(dir.path().join(DB_FILE_NAME).is_file());
    }
}
