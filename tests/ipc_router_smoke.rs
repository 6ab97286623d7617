mod test_support;

use serde_json::json;
use std::io::{BufRead, Write};
use test_support::{request, request_err, request_ok, spawn_sidecar, temp_dir};

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("lpassist-router-smoke");
    let bundle_out = workspace.join("smoke-backup.zip");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let calls: Vec<(&str, serde_json::Value)> = vec![
        ("health", json!({})),
        ("workspace.select", json!({ "path": workspace.to_string_lossy() })),
        ("setup.get", json!({})),
        ("catalog.info", json!({})),
        ("catalog.diagnoses.list", json!({})),
        ("catalog.barriers.list", json!({ "diagnosisId": "dyslexia" })),
        ("catalog.barriers.open", json!({ "barrierId": "reading-fluency" })),
        ("catalog.options", json!({})),
        ("adjustments.resolve", json!({ "barrierId": "reading-fluency" })),
        ("adjustments.library", json!({})),
        ("adjustments.get", json!({ "adjustment": "reading-fluency__0" })),
        (
            "comments.render",
            json!({ "adjustment": "reading-fluency__0", "studentName": "Ava" }),
        ),
        ("plans.render", json!({ "adjustment": "reading-fluency__0" })),
        ("plans.renderBarrier", json!({ "barrierId": "reading-fluency" })),
        ("roster.get", json!({})),
        ("roster.setEnabled", json!({ "enabled": true })),
        ("roster.setTeacherName", json!({ "teacherName": "Ms Lee" })),
        ("roster.students.add", json!({ "name": "Ava" })),
        ("roster.assignments.list", json!({ "student": "Ava" })),
        (
            "roster.assignments.saveBarrier",
            json!({ "student": "Ava", "barrierId": "reading-fluency" }),
        ),
        (
            "roster.assignments.saveAdjustment",
            json!({ "student": "Ava", "key": "adj:reading-fluency:0" }),
        ),
        (
            "roster.assignments.remove",
            json!({ "student": "Ava", "key": "barrier:reading-fluency" }),
        ),
        ("roster.exportBrowserState", json!({})),
        ("roster.importBrowserState", json!({ "state": {} })),
        ("roster.students.remove", json!({ "name": "Ava" })),
        (
            "backup.exportWorkspaceBundle",
            json!({ "outPath": bundle_out.to_string_lossy() }),
        ),
    ];

    for (i, (method, params)) in calls.into_iter().enumerate() {
        let _ = request_ok(&mut stdin, &mut reader, &(i + 1).to_string(), method, params);
    }

    let code = request_err(&mut stdin, &mut reader, "100", "grades.compute", json!({}));
    assert_eq!(code, "not_implemented");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn malformed_json_gets_bad_json_and_the_loop_continues() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    writeln!(stdin, "{{not json").expect("write garbage");
    stdin.flush().expect("flush");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read response");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("response json");
    assert_eq!(value.get("ok").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(
        value.pointer("/error/code").and_then(|v| v.as_str()),
        Some("bad_json")
    );

    let health = request(&mut stdin, &mut reader, "2", "health", json!({}));
    assert_eq!(health.get("ok").and_then(|v| v.as_bool()), Some(true));
    assert!(health
        .pointer("/result/catalog/fingerprint")
        .and_then(|v| v.as_str())
        .map(|s| s.len() == 64)
        .unwrap_or(false));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn missing_params_default_to_empty_object() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    writeln!(stdin, "{}", json!({ "id": "1", "method": "comments.render" })).expect("write");
    stdin.flush().expect("flush");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read response");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("response json");
    assert_eq!(
        value.pointer("/error/code").and_then(|v| v.as_str()),
        Some("missing_input")
    );

    drop(stdin);
    let _ = child.wait();
}
