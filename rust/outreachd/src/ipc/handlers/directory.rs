use crate::context::RequestContext;
use crate::ipc::helpers::{
    get_optional_str, get_required_str, parse_params, to_value, with_workspace, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::projects::{self, NewProject};
use crate::sessions::{self, NewFollowupSession, NewSlot};
use crate::students::{self, NewStudent, StudentFilter};
use rusqlite::Connection;
use serde_json::{json, Value};

fn projects_create(
    conn: &Connection,
    ctx: &RequestContext,
    params: &Value,
) -> Result<Value, HandlerErr> {
    let input: NewProject = parse_params(params)?;
    let project = projects::create_project(conn, ctx, &input)?;
    Ok(json!({ "project": to_value(&project)? }))
}

fn projects_list(
    conn: &Connection,
    _ctx: &RequestContext,
    _params: &Value,
) -> Result<Value, HandlerErr> {
    let projects = projects::list_projects(conn)?;
    Ok(json!({ "projects": to_value(&projects)? }))
}

fn students_create(
    conn: &Connection,
    ctx: &RequestContext,
    params: &Value,
) -> Result<Value, HandlerErr> {
    let input: NewStudent = parse_params(params)?;
    let student = students::create_student(conn, ctx, &input)?;
    Ok(json!({ "student": to_value(&student)? }))
}

fn students_get(
    conn: &Connection,
    _ctx: &RequestContext,
    params: &Value,
) -> Result<Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let student = students::get_student(conn, &student_id)?;
    Ok(json!({ "student": to_value(&student)? }))
}

fn students_list(
    conn: &Connection,
    _ctx: &RequestContext,
    params: &Value,
) -> Result<Value, HandlerErr> {
    let filter: StudentFilter = parse_params(params)?;
    let students = students::list_students(conn, &filter)?;
    Ok(json!({ "students": to_value(&students)? }))
}

fn stacks_create(
    conn: &Connection,
    _ctx: &RequestContext,
    params: &Value,
) -> Result<Value, HandlerErr> {
    let name = get_required_str(params, "name")?;
    let project = get_optional_str(params, "outreachProject");
    let stack = sessions::create_stack(conn, &name, project.as_deref())?;
    Ok(json!({ "stack": to_value(&stack)? }))
}

fn stacks_list(
    conn: &Connection,
    _ctx: &RequestContext,
    _params: &Value,
) -> Result<Value, HandlerErr> {
    let stacks = sessions::list_stacks(conn)?;
    Ok(json!({ "stacks": to_value(&stacks)? }))
}

fn slots_create(
    conn: &Connection,
    _ctx: &RequestContext,
    params: &Value,
) -> Result<Value, HandlerErr> {
    let input: NewSlot = parse_params(params)?;
    let slot = sessions::create_slot(conn, &input)?;
    Ok(json!({ "slot": to_value(&slot)? }))
}

fn slots_for_stack(
    conn: &Connection,
    ctx: &RequestContext,
    params: &Value,
) -> Result<Value, HandlerErr> {
    let Some(stack) = get_optional_str(params, "stack") else {
        return Ok(json!([]));
    };
    let slots = sessions::slots_for_stack(conn, ctx, &stack)?;
    to_value(&slots)
}

fn sessions_create(
    conn: &Connection,
    ctx: &RequestContext,
    params: &Value,
) -> Result<Value, HandlerErr> {
    let input: NewFollowupSession = parse_params(params)?;
    let session = sessions::create_session(conn, ctx, &input)?;
    Ok(json!({ "session": to_value(&session)? }))
}

fn sessions_active(
    conn: &Connection,
    ctx: &RequestContext,
    _params: &Value,
) -> Result<Value, HandlerErr> {
    let sessions = sessions::active_sessions(conn, ctx)?;
    to_value(&sessions)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let body = match req.method.as_str() {
        "projects.create" => projects_create,
        "projects.list" => projects_list,
        "students.create" => students_create,
        "students.get" => students_get,
        "students.list" => students_list,
        "stacks.create" => stacks_create,
        "stacks.list" => stacks_list,
        "slots.create" => slots_create,
        "slots.forStack" => slots_for_stack,
        "sessions.create" => sessions_create,
        "sessions.active" => sessions_active,
        _ => return None,
    };
    Some(with_workspace(state, req, body))
}
