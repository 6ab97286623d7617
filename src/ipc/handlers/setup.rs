use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::render::{
    DEFAULT_DURATION, DEFAULT_FREQUENCY, DEFAULT_PLAN_STUDENT, DEFAULT_RESPONSIBLE,
    DURATION_OPTIONS, FREQUENCY_OPTIONS, RESPONSIBLE_OPTIONS,
};
use crate::resolve::DEFAULT_GENERIC_CAP;
use serde_json::{json, Map, Value};

#[derive(Clone, Copy)]
enum SetupSection {
    Resolver,
    Plans,
}

impl SetupSection {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "resolver" => Some(Self::Resolver),
            "plans" => Some(Self::Plans),
            _ => None,
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Resolver => "setup.resolver",
            Self::Plans => "setup.plans",
        }
    }
}

fn default_section(section: SetupSection) -> Value {
    match section {
        SetupSection::Resolver => json!({
            "maxGenericSuggestions": DEFAULT_GENERIC_CAP
        }),
        SetupSection::Plans => json!({
            "defaultResponsible": DEFAULT_RESPONSIBLE,
            "defaultFrequency": DEFAULT_FREQUENCY,
            "defaultDuration": DEFAULT_DURATION,
            "studentPlaceholder": DEFAULT_PLAN_STUDENT
        }),
    }
}

fn as_object_mut(value: &mut Value) -> Result<&mut Map<String, Value>, String> {
    value
        .as_object_mut()
        .ok_or_else(|| "internal setup object must be a JSON object".to_string())
}

fn parse_i64_range(v: &Value, key: &str, min: i64, max: i64) -> Result<i64, String> {
    let n = v
        .as_i64()
        .ok_or_else(|| format!("{} must be integer", key))?;
    if !(min..=max).contains(&n) {
        return Err(format!("{} must be in {}..={}", key, min, max));
    }
    Ok(n)
}

fn parse_string_max(v: &Value, key: &str, max_len: usize) -> Result<String, String> {
    let s = v.as_str().ok_or_else(|| format!("{} must be string", key))?;
    let s = s.trim();
    if s.len() > max_len {
        return Err(format!("{} length must be <= {}", key, max_len));
    }
    Ok(s.to_string())
}

fn parse_choice(v: &Value, key: &str, choices: &[&str]) -> Result<String, String> {
    let s = parse_string_max(v, key, 64)?;
    choices
        .iter()
        .find(|c| c.eq_ignore_ascii_case(&s))
        .map(|c| c.to_string())
        .ok_or_else(|| format!("{} must be one of: {}", key, choices.join(", ")))
}

fn merge_section_patch(
    section: SetupSection,
    current: &mut Value,
    patch: &Map<String, Value>,
) -> Result<(), String> {
    let obj = as_object_mut(current)?;
    for (k, v) in patch {
        match section {
            SetupSection::Resolver => match k.as_str() {
                "maxGenericSuggestions" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 1, 20)?));
                }
                _ => return Err(format!("unknown resolver field: {}", k)),
            },
            SetupSection::Plans => match k.as_str() {
                "defaultResponsible" => {
                    obj.insert(
                        k.clone(),
                        Value::String(parse_choice(v, k, RESPONSIBLE_OPTIONS)?),
                    );
                }
                "defaultFrequency" => {
                    obj.insert(
                        k.clone(),
                        Value::String(parse_choice(v, k, FREQUENCY_OPTIONS)?),
                    );
                }
                "defaultDuration" => {
                    obj.insert(k.clone(), Value::String(parse_choice(v, k, DURATION_OPTIONS)?));
                }
                "studentPlaceholder" => {
                    let s = parse_string_max(v, k, 40)?;
                    if s.is_empty() {
                        return Err(format!("{} must not be empty", k));
                    }
                    obj.insert(k.clone(), Value::String(s));
                }
                _ => return Err(format!("unknown plans field: {}", k)),
            },
        }
    }
    Ok(())
}

/// Current values for `section`; defaults when no workspace is open.
fn load_section(state: &AppState, section: SetupSection) -> anyhow::Result<Value> {
    let mut current = default_section(section);
    let Some(conn) = state.db.as_ref() else {
        return Ok(current);
    };
    if let Some(saved) = db::settings_get_json(conn, section.key())? {
        if let Some(saved_obj) = saved.as_object() {
            // Best-effort apply: malformed historical values should not block setup UI.
            let _ = merge_section_patch(section, &mut current, saved_obj);
        }
    }
    Ok(current)
}

fn section_or_default(state: &AppState, section: SetupSection) -> Value {
    load_section(state, section).unwrap_or_else(|e| {
        tracing::warn!("setup section {} unreadable: {e}", section.key());
        default_section(section)
    })
}

/// Generic-fallback cap currently in effect.
pub fn generic_cap(state: &AppState) -> usize {
    section_or_default(state, SetupSection::Resolver)
        .get("maxGenericSuggestions")
        .and_then(|v| v.as_u64())
        .map(|n| n as usize)
        .unwrap_or(DEFAULT_GENERIC_CAP)
}

#[derive(Debug, Clone)]
pub struct PlanDefaults {
    pub responsible: String,
    pub frequency: String,
    pub duration: String,
    pub student_placeholder: String,
}

pub fn plan_defaults(state: &AppState) -> PlanDefaults {
    let section = section_or_default(state, SetupSection::Plans);
    let get = |key: &str, fallback: &str| {
        section
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or(fallback)
            .to_string()
    };
    PlanDefaults {
        responsible: get("defaultResponsible", DEFAULT_RESPONSIBLE),
        frequency: get("defaultFrequency", DEFAULT_FREQUENCY),
        duration: get("defaultDuration", DEFAULT_DURATION),
        student_placeholder: get("studentPlaceholder", DEFAULT_PLAN_STUDENT),
    }
}

fn handle_setup_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let resolver = match load_section(state, SetupSection::Resolver) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let plans = match load_section(state, SetupSection::Plans) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    ok(
        &req.id,
        json!({
            "resolver": resolver,
            "plans": plans
        }),
    )
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    if state.db.is_none() {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    }
    let Some(section_raw) = req.params.get("section").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing section", None);
    };
    let Some(section) = SetupSection::parse(section_raw) else {
        return err(&req.id, "bad_params", "unknown section", None);
    };
    let Some(patch_obj) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };

    let mut current = match load_section(state, section) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if let Err(msg) = merge_section_patch(section, &mut current, patch_obj) {
        return err(&req.id, "bad_params", msg, None);
    }
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    if let Err(e) = db::settings_set_json(conn, section.key(), &current) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    ok(
        &req.id,
        json!({ "ok": true, "section": section_raw, "values": current }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "setup.get" => Some(handle_setup_get(state, req)),
        "setup.update" => Some(handle_setup_update(state, req)),
        _ => None,
    }
}
