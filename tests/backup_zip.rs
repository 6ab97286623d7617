mod test_support;

use lpassistd::backup;
use serde_json::json;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use test_support::{request_err, request_ok, spawn_sidecar, temp_dir};

fn write_bundle(path: &Path, manifest: serde_json::Value, db: &[u8]) {
    let f = File::create(path).expect("create bundle");
    let mut zip = zip::ZipWriter::new(f);
    let opts = zip::write::FileOptions::default();
    zip.start_file("manifest.json", opts).expect("manifest entry");
    zip.write_all(manifest.to_string().as_bytes())
        .expect("write manifest");
    zip.start_file("db/lpassist.sqlite3", opts).expect("db entry");
    zip.write_all(db).expect("write db");
    zip.finish().expect("finish zip");
}

#[test]
fn zip_export_and_import_roundtrip() {
    let workspace = temp_dir("lpassist-backup-src");
    let workspace2 = temp_dir("lpassist-backup-dst");
    let out_dir = temp_dir("lpassist-backup-out");

    let db_src = workspace.join("lpassist.sqlite3");
    let bytes = b"sqlite-test-payload";
    std::fs::write(&db_src, bytes).expect("write source db");

    let bundle_path = out_dir.join("workspace.lpassist.zip");
    let export = backup::export_workspace_bundle(&workspace, &bundle_path).expect("export bundle");
    assert_eq!(export.bundle_format, backup::BUNDLE_FORMAT_V1);
    assert_eq!(export.entry_count, 2);
    assert_eq!(export.db_sha256.len(), 64);

    let f = File::open(&bundle_path).expect("open bundle");
    let mut archive = zip::ZipArchive::new(f).expect("open zip archive");
    let mut manifest = String::new();
    archive
        .by_name("manifest.json")
        .expect("manifest entry")
        .read_to_string(&mut manifest)
        .expect("read manifest");
    let manifest: serde_json::Value = serde_json::from_str(&manifest).expect("manifest json");
    assert_eq!(
        manifest.get("format").and_then(|v| v.as_str()),
        Some(backup::BUNDLE_FORMAT_V1)
    );
    assert_eq!(
        manifest.get("bundleId").and_then(|v| v.as_str()),
        Some(export.bundle_id.as_str())
    );
    assert_eq!(
        manifest.get("dbSha256").and_then(|v| v.as_str()),
        Some(export.db_sha256.as_str())
    );
    let exported_at = manifest
        .get("exportedAt")
        .and_then(|v| v.as_str())
        .expect("exportedAt");
    assert!(chrono::DateTime::parse_from_rfc3339(exported_at).is_ok());
    archive
        .by_name("db/lpassist.sqlite3")
        .expect("database entry in bundle");

    let import = backup::import_workspace_bundle(&bundle_path, &workspace2).expect("import bundle");
    assert_eq!(import.bundle_format_detected, backup::BUNDLE_FORMAT_V1);
    assert_eq!(import.bundle_id.as_deref(), Some(export.bundle_id.as_str()));

    let restored = std::fs::read(workspace2.join("lpassist.sqlite3")).expect("read restored db");
    assert_eq!(restored, bytes);
    assert!(!workspace2.join("lpassist.sqlite3.importing").exists());

    let _ = std::fs::remove_dir_all(workspace);
    let _ = std::fs::remove_dir_all(workspace2);
    let _ = std::fs::remove_dir_all(out_dir);
}

#[test]
fn checksum_mismatch_leaves_existing_database_alone() {
    let workspace = temp_dir("lpassist-backup-tamper");
    let out_dir = temp_dir("lpassist-backup-tamper-out");
    let existing = workspace.join("lpassist.sqlite3");
    std::fs::write(&existing, b"keep-me").expect("write existing db");

    let bundle_path = out_dir.join("tampered.zip");
    write_bundle(
        &bundle_path,
        json!({
            "format": backup::BUNDLE_FORMAT_V1,
            "dbSha256": "00".repeat(32)
        }),
        b"replacement",
    );

    let e = backup::import_workspace_bundle(&bundle_path, &workspace).expect_err("tampered");
    assert!(e.to_string().contains("checksum"), "{e}");
    assert_eq!(std::fs::read(&existing).expect("read db"), b"keep-me");

    let _ = std::fs::remove_dir_all(workspace);
    let _ = std::fs::remove_dir_all(out_dir);
}

#[test]
fn bare_sqlite_file_imports_as_legacy() {
    let src_dir = temp_dir("lpassist-backup-legacy-src");
    let workspace = temp_dir("lpassist-backup-legacy-dst");
    let src = src_dir.join("old.sqlite3");
    std::fs::write(&src, b"SQLite format 3\0payload").expect("write legacy file");

    let import = backup::import_workspace_bundle(&src, &workspace).expect("import legacy");
    assert_eq!(import.bundle_format_detected, backup::LEGACY_SQLITE_FORMAT);
    assert!(import.bundle_id.is_none());
    assert_eq!(
        std::fs::read(workspace.join("lpassist.sqlite3")).expect("read db"),
        b"SQLite format 3\0payload"
    );

    let _ = std::fs::remove_dir_all(src_dir);
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn manifest_without_checksum_is_rejected() {
    let workspace = temp_dir("lpassist-backup-nosum");
    let out_dir = temp_dir("lpassist-backup-nosum-out");
    let existing = workspace.join("lpassist.sqlite3");
    std::fs::write(&existing, b"keep-me").expect("write existing db");

    let bundle_path = out_dir.join("nosum.zip");
    write_bundle(
        &bundle_path,
        json!({ "format": backup::BUNDLE_FORMAT_V1 }),
        b"SQLite format 3\0replacement",
    );

    let e = backup::import_workspace_bundle(&bundle_path, &workspace).expect_err("no checksum");
    assert!(e.to_string().contains("dbSha256"), "{e}");
    assert_eq!(std::fs::read(&existing).expect("read db"), b"keep-me");

    let _ = std::fs::remove_dir_all(workspace);
    let _ = std::fs::remove_dir_all(out_dir);
}

#[test]
fn non_sqlite_file_is_not_imported() {
    let src_dir = temp_dir("lpassist-backup-text-src");
    let workspace = temp_dir("lpassist-backup-text-dst");
    let existing = workspace.join("lpassist.sqlite3");
    std::fs::write(&existing, b"keep-me").expect("write existing db");
    let src = src_dir.join("notes.txt");
    std::fs::write(&src, b"this is just a text file, not a database").expect("write notes");

    let e = backup::import_workspace_bundle(&src, &workspace).expect_err("text file");
    assert!(e.to_string().contains("not a workspace bundle"), "{e}");
    assert_eq!(std::fs::read(&existing).expect("read db"), b"keep-me");
    assert!(!workspace.join("lpassist.sqlite3.importing").exists());

    let _ = std::fs::remove_dir_all(src_dir);
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn failed_import_keeps_serving_the_open_workspace() {
    let workspace = temp_dir("lpassist-backup-ipc-ws");
    let src_dir = temp_dir("lpassist-backup-ipc-src");
    let notes = src_dir.join("notes.txt");
    std::fs::write(&notes, b"this is just a text file").expect("write notes");
    // Right header, unusable body: passes the sniff but cannot be opened.
    let broken = src_dir.join("broken.sqlite3");
    std::fs::write(&broken, b"SQLite format 3\0not really a database").expect("write broken");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "roster.students.add",
        json!({ "name": "Ava" }),
    );

    let code = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "backup.importWorkspaceBundle",
        json!({ "inPath": notes.to_string_lossy() }),
    );
    assert_eq!(code, "io_failed");

    let roster = request_ok(&mut stdin, &mut reader, "4", "roster.get", json!({}));
    assert_eq!(roster.pointer("/roster/students"), Some(&json!(["Ava"])));
    let db = std::fs::read(workspace.join("lpassist.sqlite3")).expect("read db");
    assert!(db.starts_with(b"SQLite format 3\0"));

    let code = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "backup.importWorkspaceBundle",
        json!({ "inPath": broken.to_string_lossy() }),
    );
    assert_eq!(code, "db_open_failed");

    // The replaced file cannot be reopened either, so nothing stays half-selected.
    let health = request_ok(&mut stdin, &mut reader, "6", "health", json!({}));
    assert_eq!(health.get("workspacePath"), Some(&serde_json::Value::Null));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
    let _ = std::fs::remove_dir_all(src_dir);
}
