use crate::assign;
use crate::context::RequestContext;
use crate::ipc::helpers::{get_required_str, parse_params, to_value, with_workspace, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::records::{self, RecordField, RecordInput, RecordQuery};
use rusqlite::Connection;
use serde_json::{json, Value};

/// `students` may be a JSON list of ids or a single id.
fn student_ids(params: &Value) -> Result<Vec<String>, HandlerErr> {
    match params.get("students") {
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| HandlerErr::bad_params("students must be a list of ids"))
            })
            .collect(),
        Some(Value::String(one)) => Ok(vec![one.clone()]),
        Some(Value::Null) | None => Err(HandlerErr::bad_params("missing students")),
        Some(_) => Err(HandlerErr::bad_params("students must be a list of ids")),
    }
}

fn followup_assign(
    conn: &Connection,
    ctx: &RequestContext,
    params: &Value,
) -> Result<Value, HandlerErr> {
    let students = student_ids(params)?;
    let session = get_required_str(params, "followupSession")?;
    let volunteer = get_required_str(params, "volunteer")?;
    let outcome = assign::assign_students(conn, ctx, &students, &session, &volunteer)?;
    to_value(&outcome)
}

fn records_save(
    conn: &Connection,
    ctx: &RequestContext,
    params: &Value,
) -> Result<Value, HandlerErr> {
    let input: RecordInput = parse_params(params)?;
    let outcome = records::save_record(conn, ctx, &input)?;
    to_value(&outcome)
}

fn records_list(
    conn: &Connection,
    ctx: &RequestContext,
    params: &Value,
) -> Result<Value, HandlerErr> {
    let query: RecordQuery = parse_params(params)?;
    let rows = records::list_records(conn, ctx, &query)?;
    Ok(json!({
        "count": rows.len(),
        "records": to_value(&rows)?,
    }))
}

fn records_update(
    conn: &Connection,
    ctx: &RequestContext,
    params: &Value,
) -> Result<Value, HandlerErr> {
    let record_id = get_required_str(params, "recordName")?;
    let field_name = get_required_str(params, "field")?;
    let field: RecordField = field_name.parse()?;
    let value = match params.get("value") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    };

    let outcome = records::update_record_field(conn, ctx, &record_id, field, value)?;
    let value = match field {
        RecordField::CallStatus => json!(outcome.record.call_status),
        RecordField::Remarks => json!(outcome.record.remarks),
        RecordField::PreferredSessionSlot => json!(outcome.record.session_slot),
    };
    Ok(json!({
        "status": "ok",
        "record": outcome.record.id,
        "field": field.as_str(),
        "value": value,
        "warnings": to_value(&outcome.warnings)?,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let body = match req.method.as_str() {
        "followup.assign" => followup_assign,
        "followup.records.save" => records_save,
        "followup.records.list" => records_list,
        "followup.records.update" => records_update,
        _ => return None,
    };
    Some(with_workspace(state, req, body))
}
