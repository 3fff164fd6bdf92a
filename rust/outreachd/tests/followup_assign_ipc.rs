mod test_support;

use serde_json::json;
use test_support::{
    coordinator, request_err, request_ok, seed_workspace, spawn_sidecar, str_at, temp_dir,
};

#[test]
fn assigning_twice_creates_each_pair_once() {
    let workspace = temp_dir("outreach-assign-twice");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let (stack, session, students) = seed_workspace(&mut stdin, &mut reader, workspace.path());
    let lead = coordinator();

    let first = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "followup.assign",
        json!({ "students": students, "followupSession": session, "volunteer": "vol@x.com" }),
        &lead,
    );
    assert_eq!(first.get("count").and_then(|v| v.as_u64()), Some(2));
    assert_eq!(first.get("created").and_then(|v| v.as_array()).map(|a| a.len()), Some(2));

    let second = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "followup.assign",
        json!({ "students": students, "followupSession": session, "volunteer": "vol@x.com" }),
        &lead,
    );
    assert_eq!(second.get("count").and_then(|v| v.as_u64()), Some(0));

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "followup.records.list",
        json!({ "followupSession": session }),
        &lead,
    );
    assert_eq!(listed.get("count").and_then(|v| v.as_u64()), Some(2));
    let records = listed.get("records").and_then(|v| v.as_array()).expect("records");
    for r in records {
        assert_eq!(r.get("callStatus").and_then(|v| v.as_str()), Some("To Be Called"));
        assert_eq!(r.get("assignedTo").and_then(|v| v.as_str()), Some("vol@x.com"));
        assert_eq!(r.get("sessionStack").and_then(|v| v.as_str()), Some(stack.as_str()));
    }

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn session_can_be_given_by_dropdown_label() {
    let workspace = temp_dir("outreach-assign-label");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let (_stack, _session, students) = seed_workspace(&mut stdin, &mut reader, workspace.path());
    let lead = coordinator();

    let active = request_ok(&mut stdin, &mut reader, "1", "sessions.active", json!({}), &lead);
    let label = str_at(&active, "/0/label").to_string();
    assert!(label.starts_with("SESS1 — Batch1 (Deadline: "), "label was {}", label);

    let out = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "followup.assign",
        json!({ "students": [students[0]], "followupSession": label, "volunteer": "vol@x.com" }),
        &lead,
    );
    assert_eq!(out.get("count").and_then(|v| v.as_u64()), Some(1));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn bad_assignments_are_rejected_without_side_effects() {
    let workspace = temp_dir("outreach-assign-bad");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let (_stack, session, students) = seed_workspace(&mut stdin, &mut reader, workspace.path());
    let lead = coordinator();

    let (code, message) = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "followup.assign",
        json!({ "students": students, "followupSession": "Nope", "volunteer": "vol@x.com" }),
        &lead,
    );
    assert_eq!(code, "not_found");
    assert!(message.contains("Invalid Followup Session"));

    let (code, _) = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "followup.assign",
        json!({
            "students": [students[0], "ghost"],
            "followupSession": session,
            "volunteer": "vol@x.com",
        }),
        &lead,
    );
    assert_eq!(code, "not_found");

    let (code, _) = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "followup.assign",
        json!({ "students": students, "followupSession": session }),
        &lead,
    );
    assert_eq!(code, "bad_params");

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "followup.records.list",
        json!({}),
        &lead,
    );
    assert_eq!(listed.get("count").and_then(|v| v.as_u64()), Some(0));

    drop(stdin);
    let _ = child.wait();
}
