use crate::error::AssistError;
use crate::ipc::error::err;
use crate::ipc::types::Request;

pub fn param_str<'a>(req: &'a Request, key: &str) -> Option<&'a str> {
    req.params.get(key).and_then(|v| v.as_str())
}

/// Trimmed string param; `None` when absent, not a string, or blank.
pub fn param_nonblank<'a>(req: &'a Request, key: &str) -> Option<&'a str> {
    param_str(req, key).map(str::trim).filter(|s| !s.is_empty())
}

pub fn assist_err(id: &str, e: &AssistError) -> serde_json::Value {
    err(id, e.code(), e.to_string(), None)
}
