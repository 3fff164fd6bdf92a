mod test_support;

use chrono::Duration;
use serde_json::json;
use test_support::{
    coordinator, local_time_in, request_err, request_ok, seed_workspace, spawn_sidecar,
    spawn_sidecar_with, str_at, temp_dir, volunteer,
};

#[test]
fn slot_validation_and_attendance_propagation() {
    let workspace = temp_dir("outreach-records-validate");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let (stack, session, students) = seed_workspace(&mut stdin, &mut reader, workspace.path());
    let lead = coordinator();

    let other = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "stacks.create",
        json!({ "name": "Batch2" }),
        &lead,
    );
    let other = str_at(&other, "/stack/id").to_string();
    let mut slot = |id: &str, stack: &str, offset: Duration| {
        let created = request_ok(
            &mut stdin,
            &mut reader,
            id,
            "slots.create",
            json!({ "name": id, "sessionStack": stack, "dateAndTime": local_time_in(offset) }),
            &lead,
        );
        str_at(&created, "/slot/id").to_string()
    };
    let future = slot("T-future", &stack, Duration::days(2));
    let past = slot("T-past", &stack, -Duration::days(2));
    let elsewhere = slot("T-batch2", &other, Duration::days(2));

    let options = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "slots.forStack",
        json!({ "stack": stack }),
        &lead,
    );
    let values: Vec<_> = options
        .as_array()
        .expect("options")
        .iter()
        .filter_map(|o| o.get("value").and_then(|v| v.as_str()))
        .collect();
    assert_eq!(values, vec![future.as_str()]);

    let (code, message) = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "followup.records.save",
        json!({ "student": students[0], "followupSession": session, "sessionSlot": past }),
        &lead,
    );
    assert_eq!(code, "validation_failed");
    assert_eq!(message, "Cannot select a Session Slot whose time is already in the past.");

    let (code, message) = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "followup.records.save",
        json!({ "student": students[0], "followupSession": session, "sessionSlot": elsewhere }),
        &lead,
    );
    assert_eq!(code, "validation_failed");
    assert!(message.contains("does not belong"));

    let (code, _) = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "followup.records.save",
        json!({ "student": students[0], "followupSession": session, "callStatus": "Wrong Number" }),
        &lead,
    );
    assert_eq!(code, "validation_failed");

    let saved = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "followup.records.save",
        json!({
            "student": students[0],
            "followupSession": session,
            "sessionSlot": future,
            "callStatus": "Attended",
            "assignedTo": "vol@x.com",
        }),
        &lead,
    );
    assert_eq!(str_at(&saved, "/record/sessionStack"), stack);
    assert_eq!(saved.get("warnings").and_then(|v| v.as_array()).map(|w| w.len()), Some(0));

    let student = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "students.get",
        json!({ "studentId": students[0] }),
        &lead,
    );
    assert_eq!(str_at(&student, "/student/lastAttendedSession"), stack);
    assert_eq!(str_at(&student, "/student/lastSession"), stack);
    assert!(student.pointer("/student/lastSessionAttendedAt").and_then(|v| v.as_str()).is_some());
    assert!(student.pointer("/student/lastCallMadeAt").and_then(|v| v.as_str()).is_some());

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn volunteers_see_and_edit_only_their_own_records() {
    let workspace = temp_dir("outreach-records-permissions");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let (_stack, session, students) = seed_workspace(&mut stdin, &mut reader, workspace.path());
    let lead = coordinator();
    let alice = volunteer("alice@x.com");
    let bob = volunteer("bob@x.com");

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "followup.assign",
        json!({
            "students": [students[0]],
            "followupSession": session,
            "volunteer": "alice@x.com",
        }),
        &lead,
    );
    request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "followup.assign",
        json!({ "students": [students[1]], "followupSession": session, "volunteer": "bob@x.com" }),
        &lead,
    );

    let mine = request_ok(&mut stdin, &mut reader, "3", "followup.records.list", json!({}), &alice);
    assert_eq!(mine.get("count").and_then(|v| v.as_u64()), Some(1));
    let record = str_at(&mine, "/records/0/recordName").to_string();
    assert_eq!(str_at(&mine, "/records/0/student"), students[0]);

    let everything = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "followup.records.list",
        json!({}),
        &lead,
    );
    assert_eq!(everything.get("count").and_then(|v| v.as_u64()), Some(2));

    let updated = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "followup.records.update",
        json!({ "recordName": record, "field": "call_status", "value": "Available" }),
        &alice,
    );
    assert_eq!(updated.get("status").and_then(|v| v.as_str()), Some("ok"));
    assert_eq!(updated.get("field").and_then(|v| v.as_str()), Some("call_status"));
    assert_eq!(updated.get("value").and_then(|v| v.as_str()), Some("Available"));

    let (code, _) = request_err(
        &mut stdin,
        &mut reader,
        "6",
        "followup.records.update",
        json!({ "recordName": record, "field": "remarks", "value": "not mine" }),
        &bob,
    );
    assert_eq!(code, "permission_denied");

    let (code, message) = request_err(
        &mut stdin,
        &mut reader,
        "7",
        "followup.records.update",
        json!({ "recordName": record, "field": "assigned_to", "value": "alice@x.com" }),
        &alice,
    );
    assert_eq!(code, "validation_failed");
    assert_eq!(message, "Field not allowed to update: assigned_to");

    let (code, _) = request_err(
        &mut stdin,
        &mut reader,
        "8",
        "followup.records.save",
        json!({ "recordId": record, "callStatus": "Attended" }),
        &serde_json::Value::Null,
    );
    assert_eq!(code, "permission_denied");

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "followup.records.list",
        json!({ "volunteer": "alice@x.com" }),
        &lead,
    );
    assert!(listed.pointer("/records/0/lastContacted").and_then(|v| v.as_str()).is_some());

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn coordinator_roles_come_from_configuration() {
    let workspace = temp_dir("outreach-records-roles");
    let (mut child, mut stdin, mut reader) = spawn_sidecar_with(&["--coordinator-role", "Captain"]);
    let (_stack, session, students) = seed_workspace(&mut stdin, &mut reader, workspace.path());
    let captain = json!({ "user": "cap@x.com", "roles": ["Captain"] });
    let old_lead = coordinator();

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "followup.assign",
        json!({ "students": students, "followupSession": session, "volunteer": "vol@x.com" }),
        &captain,
    );
    let as_captain = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "followup.records.list",
        json!({}),
        &captain,
    );
    assert_eq!(as_captain.get("count").and_then(|v| v.as_u64()), Some(2));

    let as_default_role = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "followup.records.list",
        json!({}),
        &old_lead,
    );
    assert_eq!(as_default_role.get("count").and_then(|v| v.as_u64()), Some(0));

    drop(stdin);
    let _ = child.wait();
}
