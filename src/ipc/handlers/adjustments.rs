use crate::catalog::{AdjustmentTemplate, Catalog};
use crate::error::AssistError;
use crate::ipc::error::{err, ok};
use crate::ipc::handlers::setup;
use crate::ipc::helpers::{assist_err, param_nonblank};
use crate::ipc::types::{AppState, Request};
use crate::resolve::{
    barrier_options, build_library, find_adjustment, resolve_adjustments, AdjustmentRef,
    ResolvedAdjustment,
};
use crate::roster::{Roster, SavedAdjustment};
use serde_json::{json, Value};

/// The rostered student whose saved list replaces the catalog, if any.
pub fn roster_student<'a>(roster: &Roster, student: Option<&'a str>) -> Option<&'a str> {
    student.filter(|s| roster.enabled && roster.has_student(s))
}

fn saved_as_resolved(catalog: &Catalog, cap: usize, saved: &SavedAdjustment) -> ResolvedAdjustment {
    let parsed = AdjustmentRef::parse(&saved.key);
    let catalog_text = parsed
        .as_ref()
        .and_then(|r| find_adjustment(catalog, cap, r))
        .map(|a| a.text)
        .unwrap_or_default();
    let barrier_id = saved.barrier_id().to_string();
    let barrier_label = catalog
        .barrier(&barrier_id)
        .map(|b| b.display_label().to_string())
        .unwrap_or_default();
    ResolvedAdjustment {
        id: saved.key.clone(),
        key: saved.key.clone(),
        index: parsed.map(|r| r.index()).unwrap_or(0),
        title: saved.title.clone(),
        text: if saved.note_text.is_empty() {
            catalog_text
        } else {
            saved.note_text.clone()
        },
        barrier_id,
        barrier_label,
    }
}

/// Adjustment named by `params.adjustment`: an inline `{title, text}` object,
/// a library id, or a roster key. `Ok(None)` means nothing was selected.
///
/// Roster keys resolve against the student's saved list when the roster is
/// enabled and `student` is on it, preferring the saved note text.
pub fn selected_adjustment(
    state: &AppState,
    roster: &Roster,
    student: Option<&str>,
    raw: Option<&Value>,
) -> Result<Option<AdjustmentTemplate>, AssistError> {
    let raw_ref = match raw {
        None | Some(Value::Null) => return Ok(None),
        Some(v @ Value::Object(_)) => {
            let inline: AdjustmentTemplate = serde_json::from_value(v.clone())
                .map_err(|_| AssistError::UnknownAdjustment("inline adjustment".into()))?;
            return Ok(Some(inline).filter(|t| !t.text.trim().is_empty()));
        }
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => s.trim(),
        Some(other) => return Err(AssistError::UnknownAdjustment(other.to_string())),
    };

    let parsed = AdjustmentRef::parse(raw_ref)
        .ok_or_else(|| AssistError::UnknownAdjustment(raw_ref.to_string()))?;
    let cap = setup::generic_cap(state);

    if let (AdjustmentRef::RosterKey { .. }, Some(student)) =
        (&parsed, roster_student(roster, student))
    {
        let saved = roster
            .assigned_adjustments(student, None)
            .into_iter()
            .find(|a| a.key == raw_ref)
            .ok_or_else(|| AssistError::UnknownAdjustment(raw_ref.to_string()))?;
        let resolved = saved_as_resolved(&state.catalog, cap, saved);
        if resolved.text.is_empty() {
            return Err(AssistError::UnknownAdjustment(raw_ref.to_string()));
        }
        return Ok(Some(resolved.template()));
    }

    find_adjustment(&state.catalog, cap, &parsed)
        .map(|a| Some(a.template()))
        .ok_or_else(|| AssistError::UnknownAdjustment(raw_ref.to_string()))
}

fn options_json(list: &[ResolvedAdjustment]) -> Vec<Value> {
    barrier_options(list)
        .into_iter()
        .map(|(id, label)| json!({ "id": id, "label": label }))
        .collect()
}

fn handle_adjustments_resolve(state: &mut AppState, req: &Request) -> Value {
    let Some(barrier_id) = param_nonblank(req, "barrierId") else {
        return err(&req.id, "bad_params", "missing barrierId", None);
    };
    let cap = setup::generic_cap(state);
    let adjustments = resolve_adjustments(&state.catalog, barrier_id, cap);
    ok(
        &req.id,
        json!({
            "barrierId": barrier_id,
            "known": state.catalog.barrier(barrier_id).is_some(),
            "adjustments": adjustments
        }),
    )
}

fn handle_adjustments_library(state: &mut AppState, req: &Request) -> Value {
    let barrier_filter = param_nonblank(req, "barrierId");
    let cap = setup::generic_cap(state);
    let roster = state.load_roster();

    let (source, all) = match roster_student(&roster, param_nonblank(req, "student")) {
        Some(student) => (
            "roster",
            roster
                .assigned_adjustments(student, None)
                .into_iter()
                .map(|saved| saved_as_resolved(&state.catalog, cap, saved))
                .collect::<Vec<_>>(),
        ),
        None => ("catalog", build_library(&state.catalog, cap, None)),
    };

    let barriers = options_json(&all);
    let adjustments: Vec<ResolvedAdjustment> = match barrier_filter {
        Some(f) => all.into_iter().filter(|a| a.barrier_id == f).collect(),
        None => all,
    };
    ok(
        &req.id,
        json!({
            "source": source,
            "count": adjustments.len(),
            "adjustments": adjustments,
            "barriers": barriers
        }),
    )
}

fn handle_adjustments_get(state: &mut AppState, req: &Request) -> Value {
    let roster = state.load_roster();
    let student = param_nonblank(req, "student");
    match selected_adjustment(state, &roster, student, req.params.get("adjustment")) {
        Ok(Some(tpl)) => ok(&req.id, json!({ "adjustment": tpl })),
        Ok(None) => assist_err(&req.id, &AssistError::MissingInput("adjustment")),
        Err(e) => assist_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "adjustments.resolve" => Some(handle_adjustments_resolve(state, req)),
        "adjustments.library" => Some(handle_adjustments_library(state, req)),
        "adjustments.get" => Some(handle_adjustments_get(state, req)),
        _ => None,
    }
}
