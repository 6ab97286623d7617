use crate::error::AssistError;
use crate::ipc::error::{err, ok};
use crate::ipc::handlers::adjustments::selected_adjustment;
use crate::ipc::handlers::setup::{self, PlanDefaults};
use crate::ipc::helpers::{assist_err, param_nonblank};
use crate::ipc::types::{AppState, Request};
use crate::render::{render_plan, PlanParams};
use crate::resolve::resolve_adjustments;
use serde_json::json;

/// Absent selections take the workspace defaults; an explicit empty string
/// stays empty and drops its sentence.
fn with_defaults(mut params: PlanParams, defaults: &PlanDefaults) -> PlanParams {
    params.responsible.get_or_insert_with(|| defaults.responsible.clone());
    params.frequency.get_or_insert_with(|| defaults.frequency.clone());
    params.duration.get_or_insert_with(|| defaults.duration.clone());
    params
}

fn parse_plan_params(state: &AppState, req: &Request) -> Result<PlanParams, String> {
    let params = if req.params.is_null() {
        PlanParams::default()
    } else {
        serde_json::from_value::<PlanParams>(req.params.clone()).map_err(|e| e.to_string())?
    };
    Ok(with_defaults(params, &setup::plan_defaults(state)))
}

fn handle_plans_render(state: &mut AppState, req: &Request) -> serde_json::Value {
    let params = match parse_plan_params(state, req) {
        Ok(p) => p,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    let roster = state.load_roster();
    let student = params.student_name.as_deref().map(str::trim);
    let selected = match selected_adjustment(state, &roster, student, req.params.get("adjustment"))
    {
        Ok(Some(s)) => s,
        Ok(None) => return assist_err(&req.id, &AssistError::MissingInput("adjustment")),
        Err(e) => return assist_err(&req.id, &e),
    };

    let placeholder = setup::plan_defaults(state).student_placeholder;
    ok(
        &req.id,
        json!({
            "title": selected.title,
            "planText": render_plan(&selected.text, &params, &placeholder)
        }),
    )
}

fn handle_plans_render_barrier(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(barrier_id) = param_nonblank(req, "barrierId") else {
        return err(&req.id, "bad_params", "missing barrierId", None);
    };
    let params = match parse_plan_params(state, req) {
        Ok(p) => p,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    let defaults = setup::plan_defaults(state);
    let cap = setup::generic_cap(state);

    let plans: Vec<serde_json::Value> = resolve_adjustments(&state.catalog, barrier_id, cap)
        .into_iter()
        .map(|a| {
            json!({
                "id": a.id,
                "key": a.key,
                "title": a.title,
                "noteText": a.text,
                "planText": render_plan(&a.text, &params, &defaults.student_placeholder)
            })
        })
        .collect();

    ok(
        &req.id,
        json!({
            "barrierId": barrier_id,
            "barrierLabel": state.catalog.barrier(barrier_id).map(|b| b.display_label()),
            "plans": plans
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "plans.render" => Some(handle_plans_render(state, req)),
        "plans.renderBarrier" => Some(handle_plans_render_barrier(state, req)),
        _ => None,
    }
}
