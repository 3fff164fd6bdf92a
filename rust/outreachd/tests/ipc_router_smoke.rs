mod test_support;

use serde_json::json;
use std::io::{BufRead, Write};
use test_support::{
    coordinator, request, request_err, request_ok, spawn_sidecar, spawn_sidecar_with, temp_dir,
};

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("outreach-router-smoke");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let lead = coordinator();

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}), &lead);
    assert!(health.get("version").and_then(|v| v.as_str()).is_some());
    assert_eq!(health.get("workspacePath"), Some(&serde_json::Value::Null));

    let (code, _) = request_err(&mut stdin, &mut reader, "2", "stacks.list", json!({}), &lead);
    assert_eq!(code, "no_workspace");

    request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "workspace.select",
        json!({ "path": workspace.path().to_string_lossy() }),
        &lead,
    );

    let methods = [
        "projects.create",
        "projects.list",
        "students.create",
        "students.get",
        "students.list",
        "stacks.create",
        "stacks.list",
        "slots.create",
        "slots.forStack",
        "sessions.create",
        "sessions.active",
        "followup.assign",
        "followup.records.save",
        "followup.records.list",
        "followup.records.update",
        "reports.slotAttendanceSummary",
        "reports.stackAttendanceByMentor",
        "reports.studentAttendance",
    ];
    for (i, method) in methods.iter().enumerate() {
        let resp = request(&mut stdin, &mut reader, &format!("m{}", i), method, json!({}), &lead);
        let code = resp.pointer("/error/code").and_then(|v| v.as_str());
        assert_ne!(code, Some("not_implemented"), "{} is not routed", method);
        assert_ne!(code, Some("no_workspace"), "{} did not see the workspace", method);
    }

    let (code, message) = request_err(
        &mut stdin,
        &mut reader,
        "x",
        "classes.list",
        json!({}),
        &lead,
    );
    assert_eq!(code, "not_implemented");
    assert!(message.contains("classes.list"));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn malformed_lines_get_bad_json_and_the_loop_continues() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    writeln!(stdin, "{{ not json").expect("write garbage");
    stdin.flush().expect("flush");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse");
    assert_eq!(value.get("ok").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(value.pointer("/error/code").and_then(|v| v.as_str()), Some("bad_json"));

    request_ok(&mut stdin, &mut reader, "after", "health", json!({}), &serde_json::Value::Null);

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn workspace_flag_opens_database_at_startup() {
    let workspace = temp_dir("outreach-startup-ws");
    let path = workspace.path().to_string_lossy().to_string();
    let (mut child, mut stdin, mut reader) =
        spawn_sidecar_with(&["--workspace", &path, "--log", "off"]);

    let health = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "health",
        json!({}),
        &serde_json::Value::Null,
    );
    assert_eq!(health.get("workspacePath").and_then(|v| v.as_str()), Some(path.as_str()));
    request_ok(&mut stdin, &mut reader, "2", "stacks.list", json!({}), &serde_json::Value::Null);
    assert!(workspace.path().join("outreach.sqlite3").is_file());

    drop(stdin);
    let _ = child.wait();
}
