#![allow(dead_code)]

use chrono::{Duration, Local};
use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

pub const COORDINATOR: &str = "lead@x.com";

pub fn temp_dir(prefix: &str) -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .expect("create temp dir")
}

pub fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    spawn_sidecar_with(&[])
}

pub fn spawn_sidecar_with(args: &[&str]) -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_outreachd");
    let mut child = Command::new(exe)
        .args(args)
        .env_remove("OUTREACHD_WORKSPACE")
        .env_remove("OUTREACHD_COORDINATOR_ROLES")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn outreachd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

pub fn coordinator() -> serde_json::Value {
    json!({ "user": COORDINATOR, "roles": ["Outreach Coordinator"] })
}

pub fn volunteer(user: &str) -> serde_json::Value {
    json!({ "user": user, "roles": ["Volunteer"] })
}

/// `YYYY-MM-DD HH:MM:SS`, offset from the local wall clock.
pub fn local_time_in(offset: Duration) -> String {
    (Local::now().naive_local() + offset)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

pub fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
    caller: &serde_json::Value,
) -> serde_json::Value {
    let mut payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    if !caller.is_null() {
        payload["caller"] = caller.clone();
    }
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

pub fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
    caller: &serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params, caller);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or(serde_json::Value::Null)
}

/// Returns the error code of a request expected to fail.
pub fn request_err(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
    caller: &serde_json::Value,
) -> (String, String) {
    let value = request(stdin, reader, id, method, params, caller);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(false),
        "{} unexpectedly succeeded: {}",
        method,
        value
    );
    let error = value.get("error").cloned().unwrap_or_default();
    (
        error
            .get("code")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string(),
        error
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string(),
    )
}

pub fn str_at<'a>(v: &'a serde_json::Value, pointer: &str) -> &'a str {
    v.pointer(pointer)
        .and_then(|x| x.as_str())
        .unwrap_or_else(|| panic!("missing string at {} in {}", pointer, v))
}

/// Opens a fresh workspace holding one stack, one future session on it and
/// two students. Returns (stack, session, [students]).
pub fn seed_workspace(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    workspace: &std::path::Path,
) -> (String, String, Vec<String>) {
    let lead = coordinator();
    request_ok(
        stdin,
        reader,
        "seed-ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
        &lead,
    );
    let stack = request_ok(
        stdin,
        reader,
        "seed-stack",
        "stacks.create",
        json!({ "name": "Batch1" }),
        &lead,
    );
    let stack = str_at(&stack, "/stack/id").to_string();
    let session = request_ok(
        stdin,
        reader,
        "seed-session",
        "sessions.create",
        json!({
            "name": "SESS1",
            "sessionStack": stack,
            "deadline": local_time_in(Duration::days(5)),
            "statusOptions": ["Available", "Attended", "Partially Attended", "Flunked"],
        }),
        &lead,
    );
    let session = str_at(&session, "/session/id").to_string();
    let students = ["Arjun", "Meera"]
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let created = request_ok(
                stdin,
                reader,
                &format!("seed-student-{}", i),
                "students.create",
                json!({ "firstName": name, "mentor": "mentor-a@x.com" }),
                &lead,
            );
            str_at(&created, "/student/id").to_string()
        })
        .collect();
    (stack, session, students)
}
