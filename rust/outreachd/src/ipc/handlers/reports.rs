use crate::context::RequestContext;
use crate::ipc::helpers::{parse_params, to_value, with_workspace, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::reports::{self, MentorMatrixFilters, SlotSummaryFilters, StudentPivotFilters};
use rusqlite::Connection;
use serde_json::Value;

/// Filters may be sent at the top level of params or nested under `filters`.
fn filters_of(params: &Value) -> &Value {
    params.get("filters").unwrap_or(params)
}

fn slot_attendance_summary(
    conn: &Connection,
    _ctx: &RequestContext,
    params: &Value,
) -> Result<Value, HandlerErr> {
    let filters: SlotSummaryFilters = parse_params(filters_of(params))?;
    to_value(&reports::slot_attendance_summary(conn, &filters)?)
}

fn stack_attendance_by_mentor(
    conn: &Connection,
    _ctx: &RequestContext,
    params: &Value,
) -> Result<Value, HandlerErr> {
    let filters: MentorMatrixFilters = parse_params(filters_of(params))?;
    to_value(&reports::stack_attendance_by_mentor(conn, &filters)?)
}

fn student_attendance(
    conn: &Connection,
    _ctx: &RequestContext,
    params: &Value,
) -> Result<Value, HandlerErr> {
    let filters: StudentPivotFilters = parse_params(filters_of(params))?;
    to_value(&reports::student_attendance(conn, &filters)?)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let body = match req.method.as_str() {
        "reports.slotAttendanceSummary" => slot_attendance_summary,
        "reports.stackAttendanceByMentor" => stack_attendance_by_mentor,
        "reports.studentAttendance" => student_attendance,
        _ => return None,
    };
    Some(with_workspace(state, req, body))
}
