use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

use crate::context::{RequestContext, GUEST_USER};

/// Identity the caller vouches for. Authentication happens upstream.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Caller {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
    #[serde(default)]
    pub caller: Caller,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub coordinator_roles: Vec<String>,
}

impl AppState {
    pub fn new(coordinator_roles: Vec<String>) -> Self {
        Self {
            workspace: None,
            db: None,
            coordinator_roles,
        }
    }

    /// Request context stamped with the local wall clock.
    pub fn context(&self, req: &Request) -> RequestContext {
        let user = req
            .caller
            .user
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(GUEST_USER);
        RequestContext::new(
            user,
            req.caller.roles.clone(),
            chrono::Local::now().naive_local(),
            &self.coordinator_roles,
        )
    }
}
