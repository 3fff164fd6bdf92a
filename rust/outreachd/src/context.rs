use chrono::NaiveDateTime;

use crate::model::format_datetime;

pub const GUEST_USER: &str = "Guest";

/// Who is calling and when. Built once per request and handed to every operation.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user: String,
    pub roles: Vec<String>,
    pub now: NaiveDateTime,
    coordinator: bool,
}

impl RequestContext {
    pub fn new(
        user: impl Into<String>,
        roles: Vec<String>,
        now: NaiveDateTime,
        coordinator_roles: &[String],
    ) -> Self {
        let coordinator = roles.iter().any(|r| coordinator_roles.contains(r));
        Self {
            user: user.into(),
            roles,
            now,
            coordinator,
        }
    }

    pub fn is_coordinator(&self) -> bool {
        self.coordinator
    }

    pub fn now_str(&self) -> String {
        format_datetime(self.now)
    }

    /// Coordinators may touch any record; everyone else only records assigned to them.
    pub fn can_edit_assigned(&self, assigned_to: Option<&str>) -> bool {
        self.coordinator || assigned_to == Some(self.user.as_str())
    }
}

#[cfg(test)]
pub fn test_context(user: &str, coordinator: bool, now: NaiveDateTime) -> RequestContext {
    let roles = if coordinator {
        vec!["Outreach Coordinator".to_string()]
    } else {
        vec!["Volunteer".to_string()]
    };
    RequestContext::new(user, roles, now, &["Outreach Coordinator".to_string()])
}
