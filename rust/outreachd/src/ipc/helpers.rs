use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::context::RequestContext;
use crate::error::OutreachError;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn bad_params(message: impl Into<String>) -> Self {
        Self {
            code: "bad_params",
            message: message.into(),
            details: None,
        }
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<OutreachError> for HandlerErr {
    fn from(e: OutreachError) -> Self {
        if let OutreachError::Db(db) = &e {
            tracing::error!(error = %db, "database query failed");
        }
        Self {
            code: e.code(),
            message: e.to_string(),
            details: None,
        }
    }
}

/// Runs a handler body against the open workspace with the caller's context.
pub fn with_workspace<F>(state: &AppState, req: &Request, body: F) -> serde_json::Value
where
    F: FnOnce(
        &Connection,
        &RequestContext,
        &serde_json::Value,
    ) -> Result<serde_json::Value, HandlerErr>,
{
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let ctx = state.context(req);
    match body(conn, &ctx, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn get_optional_str(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Deserializes the whole params object; `null` params read as `{}`.
pub fn parse_params<T: DeserializeOwned>(params: &serde_json::Value) -> Result<T, HandlerErr> {
    let raw = if params.is_null() {
        json!({})
    } else {
        params.clone()
    };
    serde_json::from_value(raw)
        .map_err(|e| HandlerErr::bad_params(format!("invalid params: {}", e)))
}

pub fn to_value<T: serde::Serialize>(v: &T) -> Result<serde_json::Value, HandlerErr> {
    serde_json::to_value(v).map_err(|e| HandlerErr {
        code: "internal",
        message: e.to_string(),
        details: None,
    })
}
