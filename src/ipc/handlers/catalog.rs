use crate::catalog::{Barrier, ALL_DIAGNOSES};
use crate::ipc::error::{err, ok};
use crate::ipc::handlers::setup;
use crate::ipc::helpers::{param_nonblank, param_str};
use crate::ipc::types::{AppState, Request};
use crate::render::{DURATION_OPTIONS, FREQUENCY_OPTIONS, RESPONSIBLE_OPTIONS};
use crate::resolve::resolve_adjustments;
use serde_json::json;

fn barrier_json(b: &Barrier) -> serde_json::Value {
    json!({
        "id": b.id,
        "label": b.label,
        "diagnosisIds": b.diagnosis_ids,
        "description": b.description
    })
}

fn handle_catalog_info(state: &mut AppState, req: &Request) -> serde_json::Value {
    let issues = state.catalog.validate();
    ok(
        &req.id,
        json!({
            "fingerprint": state.catalog.fingerprint(),
            "diagnosisCount": state.catalog.diagnoses.len(),
            "barrierCount": state.catalog.barriers.len(),
            "issues": issues
        }),
    )
}

fn handle_diagnoses_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let include_all = req
        .params
        .get("includeAll")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let diagnoses: Vec<serde_json::Value> = state
        .catalog
        .diagnoses
        .iter()
        .filter(|d| include_all || d.id != ALL_DIAGNOSES)
        .map(|d| json!({ "id": d.id, "label": d.label }))
        .collect();
    ok(&req.id, json!({ "diagnoses": diagnoses }))
}

fn handle_barriers_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Some(v) = req.params.get("diagnosisId") {
        if !v.is_null() && !v.is_string() {
            return err(&req.id, "bad_params", "diagnosisId must be a string", None);
        }
    }
    let barriers: Vec<serde_json::Value> = state
        .catalog
        .filter_barriers(param_str(req, "diagnosisId"), param_str(req, "query"))
        .into_iter()
        .map(barrier_json)
        .collect();
    ok(
        &req.id,
        json!({
            "count": barriers.len(),
            "barriers": barriers
        }),
    )
}

fn handle_barriers_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(barrier_id) = param_nonblank(req, "barrierId") else {
        return err(&req.id, "bad_params", "missing barrierId", None);
    };
    let cap = setup::generic_cap(state);
    let barrier = state.catalog.barrier(barrier_id).map(barrier_json);
    let adjustments = resolve_adjustments(&state.catalog, barrier_id, cap);
    ok(
        &req.id,
        json!({
            "barrier": barrier,
            "adjustments": adjustments
        }),
    )
}

fn handle_catalog_options(state: &mut AppState, req: &Request) -> serde_json::Value {
    let defaults = setup::plan_defaults(state);
    let engagement: Vec<serde_json::Value> = state
        .catalog
        .engagement_descriptors
        .iter()
        .map(|(key, text)| json!({ "key": key, "text": text }))
        .collect();
    let outcomes: Vec<serde_json::Value> = state
        .catalog
        .outcome_descriptors
        .iter()
        .map(|(key, text)| json!({ "key": key, "text": text }))
        .collect();
    ok(
        &req.id,
        json!({
            "engagementLevels": engagement,
            "outcomeKinds": outcomes,
            "frequencies": FREQUENCY_OPTIONS,
            "responsible": RESPONSIBLE_OPTIONS,
            "durations": DURATION_OPTIONS,
            "defaults": {
                "frequency": defaults.frequency,
                "responsible": defaults.responsible,
                "duration": defaults.duration
            }
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "catalog.info" => Some(handle_catalog_info(state, req)),
        "catalog.diagnoses.list" => Some(handle_diagnoses_list(state, req)),
        "catalog.barriers.list" => Some(handle_barriers_list(state, req)),
        "catalog.barriers.open" => Some(handle_barriers_open(state, req)),
        "catalog.options" => Some(handle_catalog_options(state, req)),
        _ => None,
    }
}
