// Authenticated user session and permission tags
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const VIEW_DASHBOARD: &str = "view_dashboard";
pub const VIEW_CUSTOMER: &str = "view_customer";
pub const VIEW_REVIEWS: &str = "view_reviews";
pub const VIEW_ML: &str = "view_ml";
pub const VIEW_INVENTORY: &str = "view_inventory";
pub const VIEW_SETTINGS: &str = "view_settings";
pub const EXPORT_REPORTS: &str = "export_reports";
pub const MANAGE_USERS: &str = "manage_users";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: u64,
    pub username: String,
    pub name: String,
    pub role: String,
}

impl Session {
    pub fn new(id: u64, username: String, name: String, role: String) -> Self {
        Self {
            id,
            username,
            name,
            role,
        }
    }

    /// Synthetic identity used when demo login is enabled and the backend
    /// cannot confirm the credentials
    pub fn demo(username: &str) -> Self {
        Self::new(1, username.to_string(), "Usuario Demo".to_string(), "admin".to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet(BTreeSet<String>);

impl PermissionSet {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(tags.into_iter().map(Into::into).collect())
    }

    pub fn demo() -> Self {
        Self::new([
            VIEW_DASHBOARD,
            VIEW_CUSTOMER,
            VIEW_REVIEWS,
            VIEW_ML,
            VIEW_INVENTORY,
            VIEW_SETTINGS,
            EXPORT_REPORTS,
            MANAGE_USERS,
        ])
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}
