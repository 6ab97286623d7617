use crate::error::AssistError;
use crate::ipc::error::{err, ok};
use crate::ipc::handlers::setup;
use crate::ipc::helpers::{assist_err, param_nonblank, param_str};
use crate::ipc::types::{AppState, Request};
use crate::resolve::{find_adjustment, roster_key, AdjustmentRef};
use crate::roster::{Roster, SavedAdjustment};
use serde_json::json;

fn roster_json(roster: &Roster) -> serde_json::Value {
    json!({
        "enabled": roster.enabled,
        "teacherName": roster.teacher_name,
        "students": roster.sorted_students()
    })
}

/// Roster about to be changed and saved back; unreadable storage refuses the
/// change instead of saving over it.
fn roster_for_update(state: &AppState, req: &Request) -> Result<Roster, serde_json::Value> {
    state
        .load_roster_for_update()
        .map_err(|e| assist_err(&req.id, &e))
}

/// Loads the roster and checks that `params.student` is on it.
fn rostered_student<'r>(
    state: &AppState,
    req: &'r Request,
    for_update: bool,
) -> Result<(Roster, &'r str), serde_json::Value> {
    let Some(student) = param_nonblank(req, "student") else {
        return Err(err(&req.id, "bad_params", "missing student", None));
    };
    let roster = if for_update {
        roster_for_update(state, req)?
    } else {
        state.load_roster()
    };
    if !roster.has_student(student) {
        return Err(err(
            &req.id,
            "not_found",
            "student not on roster",
            Some(json!({ "student": student })),
        ));
    }
    Ok((roster, student))
}

fn handle_roster_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let roster = state.load_roster();
    ok(&req.id, json!({ "roster": roster_json(&roster) }))
}

fn handle_roster_set_enabled(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(enabled) = req.params.get("enabled").and_then(|v| v.as_bool()) else {
        return err(&req.id, "bad_params", "enabled must be a boolean", None);
    };
    let mut roster = match roster_for_update(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    roster.enabled = enabled;
    let persisted = state.save_roster(&roster);
    ok(&req.id, json!({ "enabled": enabled, "persisted": persisted }))
}

fn handle_roster_set_teacher_name(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(name) = param_str(req, "teacherName") else {
        return err(&req.id, "bad_params", "teacherName must be a string", None);
    };
    let mut roster = match roster_for_update(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    roster.teacher_name = name.trim().to_string();
    let persisted = state.save_roster(&roster);
    ok(
        &req.id,
        json!({ "teacherName": roster.teacher_name, "persisted": persisted }),
    )
}

fn handle_students_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(name) = param_str(req, "name") else {
        return err(&req.id, "bad_params", "name must be a string", None);
    };
    let mut roster = match roster_for_update(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let added = roster.add_student(name);
    let persisted = if added { state.save_roster(&roster) } else { true };
    ok(
        &req.id,
        json!({
            "added": added,
            "students": roster.sorted_students(),
            "persisted": persisted
        }),
    )
}

fn handle_students_remove(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(name) = param_nonblank(req, "name") else {
        return err(&req.id, "bad_params", "missing name", None);
    };
    let mut roster = match roster_for_update(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let removed = roster.remove_student(name);
    let persisted = if removed { state.save_roster(&roster) } else { true };
    ok(
        &req.id,
        json!({
            "removed": removed,
            "students": roster.sorted_students(),
            "persisted": persisted
        }),
    )
}

fn handle_assignments_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (roster, student) = match rostered_student(state, req, false) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let items = roster.saved_items(&state.catalog, student);
    ok(&req.id, json!({ "student": student, "items": items }))
}

fn handle_assignments_save_barrier(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (mut roster, student) = match rostered_student(state, req, true) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(barrier_id) = param_nonblank(req, "barrierId") else {
        return err(&req.id, "bad_params", "missing barrierId", None);
    };
    if state.catalog.barrier(barrier_id).is_none() {
        return err(
            &req.id,
            "not_found",
            "unknown barrier",
            Some(json!({ "barrierId": barrier_id })),
        );
    }
    let saved = roster.save_barrier(student, barrier_id);
    let persisted = if saved { state.save_roster(&roster) } else { true };
    ok(&req.id, json!({ "saved": saved, "persisted": persisted }))
}

fn handle_assignments_save_adjustment(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (mut roster, student) = match rostered_student(state, req, true) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(raw_key) = param_nonblank(req, "key") else {
        return err(&req.id, "bad_params", "missing key", None);
    };
    let Some(adj_ref) = AdjustmentRef::parse(raw_key) else {
        return assist_err(&req.id, &AssistError::UnknownAdjustment(raw_key.to_string()));
    };

    let cap = setup::generic_cap(state);
    let resolved = find_adjustment(&state.catalog, cap, &adj_ref);
    let given = |k: &str| param_str(req, k).map(str::to_string);

    let Some(title) = given("title")
        .filter(|t| !t.trim().is_empty())
        .or_else(|| resolved.as_ref().map(|a| a.title.clone()))
    else {
        return assist_err(&req.id, &AssistError::UnknownAdjustment(raw_key.to_string()));
    };

    let adj = SavedAdjustment {
        key: roster_key(adj_ref.barrier_id(), adj_ref.index()),
        title,
        barrier_id: adj_ref.barrier_id().to_string(),
        note_text: given("noteText")
            .or_else(|| resolved.as_ref().map(|a| a.text.clone()))
            .unwrap_or_default(),
        plan_text: given("planText").unwrap_or_default(),
    };
    let key = adj.key.clone();
    roster.save_adjustment(student, adj);
    let persisted = state.save_roster(&roster);
    ok(&req.id, json!({ "key": key, "persisted": persisted }))
}

fn handle_assignments_remove(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (mut roster, student) = match rostered_student(state, req, true) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(key) = param_nonblank(req, "key") else {
        return err(&req.id, "bad_params", "missing key", None);
    };
    let removed = roster.remove_item(student, key);
    let persisted = if removed { state.save_roster(&roster) } else { true };
    ok(&req.id, json!({ "removed": removed, "persisted": persisted }))
}

fn handle_import_browser_state(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(raw) = req.params.get("state") else {
        return err(&req.id, "bad_params", "missing state", None);
    };
    let roster = Roster::from_browser_state(raw);
    let persisted = state.save_roster(&roster);
    tracing::info!(students = roster.students.len(), "roster imported from browser state");
    ok(
        &req.id,
        json!({
            "roster": roster_json(&roster),
            "persisted": persisted
        }),
    )
}

fn handle_export_browser_state(state: &mut AppState, req: &Request) -> serde_json::Value {
    let roster = state.load_roster();
    ok(&req.id, json!({ "state": roster.to_browser_state() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "roster.get" => Some(handle_roster_get(state, req)),
        "roster.setEnabled" => Some(handle_roster_set_enabled(state, req)),
        "roster.setTeacherName" => Some(handle_roster_set_teacher_name(state, req)),
        "roster.students.add" => Some(handle_students_add(state, req)),
        "roster.students.remove" => Some(handle_students_remove(state, req)),
        "roster.assignments.list" => Some(handle_assignments_list(state, req)),
        "roster.assignments.saveBarrier" => Some(handle_assignments_save_barrier(state, req)),
        "roster.assignments.saveAdjustment" => {
            Some(handle_assignments_save_adjustment(state, req))
        }
        "roster.assignments.remove" => Some(handle_assignments_remove(state, req)),
        "roster.importBrowserState" => Some(handle_import_browser_state(state, req)),
        "roster.exportBrowserState" => Some(handle_export_browser_state(state, req)),
        _ => None,
    }
}
