use crate::error::AssistError;
use crate::ipc::error::{err, ok};
use crate::ipc::handlers::adjustments::selected_adjustment;
use crate::ipc::helpers::assist_err;
use crate::ipc::types::{AppState, Request};
use crate::render::{render_comment, CommentParams};
use serde_json::json;

fn blank(v: Option<&str>) -> bool {
    v.map(|s| s.trim().is_empty()).unwrap_or(true)
}

fn handle_comments_render(state: &mut AppState, req: &Request) -> serde_json::Value {
    let parsed = if req.params.is_null() {
        Ok(CommentParams::default())
    } else {
        serde_json::from_value::<CommentParams>(req.params.clone())
    };
    let mut params = match parsed {
        Ok(p) => p,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    if blank(params.student_name.as_deref()) {
        return assist_err(&req.id, &AssistError::MissingInput("studentName"));
    }

    let roster = state.load_roster();
    let student = params.student_name.as_deref().map(str::trim);
    let selected = match selected_adjustment(state, &roster, student, req.params.get("adjustment"))
    {
        Ok(s) => s,
        Err(e) => return assist_err(&req.id, &e),
    };

    // The roster's teacher name stands in when the request carries none.
    if blank(params.teacher_name.as_deref()) && roster.enabled && !roster.teacher_name.is_empty() {
        params.teacher_name = Some(roster.teacher_name.clone());
    }

    let rendered = render_comment(
        &state.catalog,
        selected.as_ref().map(|t| t.text.as_str()),
        &params,
    );
    match rendered {
        Ok(comment) => ok(
            &req.id,
            json!({
                "comment": comment,
                "title": selected.map(|t| t.title)
            }),
        ),
        Err(e) => assist_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "comments.render" => Some(handle_comments_render(state, req)),
        _ => None,
    }
}
