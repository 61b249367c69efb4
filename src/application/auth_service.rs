// Session bootstrap, login/logout and permission gating
use crate::application::analytics_api::{AnalyticsApi, ApiError};
use crate::application::key_value_store::{KeyValueStore, KEY_USER};
use crate::domain::page::Page;
use crate::domain::session::{PermissionSet, Session};
use std::sync::Arc;
use tokio::sync::RwLock;

pub const NO_PERMISSION_TOOLTIP: &str = "No tiene permiso para acceder a esta sección";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Por favor ingrese usuario y contraseña")]
    MissingFields,
    #[error("Credenciales incorrectas")]
    InvalidCredentials,
    #[error("Error de conexión")]
    Unreachable(#[source] ApiError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub session: Session,
    /// Set when the backend was unreachable and the demo identity was used
    pub demo: bool,
}

impl LoginOutcome {
    pub fn welcome(&self) -> String {
        if self.demo {
            "Bienvenido, Modo Demo".to_string()
        } else {
            format!("Bienvenido, {}", self.session.name)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavItem {
    pub page: Page,
    pub enabled: bool,
    pub tooltip: Option<&'static str>,
}

#[derive(Debug, Default)]
struct AuthState {
    session: Option<Session>,
    permissions: PermissionSet,
}

#[derive(Clone)]
pub struct AuthService {
    api: Arc<dyn AnalyticsApi>,
    store: Arc<dyn KeyValueStore>,
    offline_demo: bool,
    state: Arc<RwLock<AuthState>>,
}

impl AuthService {
    pub fn new(api: Arc<dyn AnalyticsApi>, store: Arc<dyn KeyValueStore>, offline_demo: bool) -> Self {
        Self {
            api,
            store,
            offline_demo,
            state: Arc::new(RwLock::new(AuthState::default())),
        }
    }

    /// Restores the persisted session. Malformed data is cleared and treated
    /// as no session.
    pub async fn check_session(&self) -> Option<Session> {
        let raw = self.store.get(KEY_USER).await?;
        let session = match serde_json::from_str::<Session>(&raw) {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!("Discarding malformed persisted session: {}", e);
                if let Err(e) = self.store.remove(KEY_USER).await {
                    tracing::error!("Failed to clear persisted session: {}", e);
                }
                return None;
            }
        };

        self.state.write().await.session = Some(session.clone());
        self.refresh_permissions().await;
        tracing::info!("Restored session for {}", session.username);
        Some(session)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingFields);
        }

        let outcome = match self.api.login(username, password).await {
            Ok(response) => match (response.success, response.user) {
                (true, Some(session)) => LoginOutcome {
                    session,
                    demo: false,
                },
                _ => return Err(AuthError::InvalidCredentials),
            },
            Err(e) if self.offline_demo => {
                tracing::warn!("Login backend unavailable, using demo identity: {}", e);
                LoginOutcome {
                    session: Session::demo(username),
                    demo: true,
                }
            }
            Err(e) => {
                tracing::warn!("Login backend unavailable: {}", e);
                return Err(AuthError::Unreachable(e));
            }
        };

        self.establish(&outcome.session).await;
        tracing::info!("User {} logged in", outcome.session.username);
        Ok(outcome)
    }

    async fn establish(&self, session: &Session) {
        {
            let mut state = self.state.write().await;
            state.session = Some(session.clone());
            state.permissions = PermissionSet::default();
        }
        match serde_json::to_string(session) {
            Ok(raw) => {
                if let Err(e) = self.store.set(KEY_USER, &raw).await {
                    tracing::error!("Failed to persist session: {}", e);
                }
            }
            Err(e) => tracing::error!("Failed to serialize session: {}", e),
        }
        self.refresh_permissions().await;
    }

    pub async fn logout(&self) {
        let previous = {
            let mut state = self.state.write().await;
            state.permissions = PermissionSet::default();
            state.session.take()
        };
        if let Err(e) = self.store.remove(KEY_USER).await {
            tracing::error!("Failed to clear persisted session: {}", e);
        }
        if let Some(session) = previous {
            tracing::info!("User {} logged out", session.username);
        }
    }

    /// Re-fetches the permission set of the current user
    pub async fn refresh_permissions(&self) -> PermissionSet {
        let Some(user_id) = self.state.read().await.session.as_ref().map(|s| s.id) else {
            return PermissionSet::default();
        };

        let permissions = match self.api.permissions(user_id).await {
            Ok(tags) => PermissionSet::new(tags),
            Err(e) if self.offline_demo => {
                tracing::warn!("Permission lookup failed, granting demo permissions: {}", e);
                PermissionSet::demo()
            }
            Err(e) => {
                tracing::warn!("Permission lookup failed: {}", e);
                PermissionSet::default()
            }
        };

        let mut state = self.state.write().await;
        // Session may have changed while the request was in flight
        if state.session.as_ref().map(|s| s.id) == Some(user_id) {
            state.permissions = permissions.clone();
        }
        permissions
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.session.is_some()
    }

    pub async fn current_user(&self) -> Option<Session> {
        self.state.read().await.session.clone()
    }

    pub async fn permissions(&self) -> PermissionSet {
        self.state.read().await.permissions.clone()
    }

    pub async fn has_permission(&self, tag: &str) -> bool {
        self.state.read().await.permissions.contains(tag)
    }

    /// Sidebar entries with their enabled state for the current permissions
    pub async fn nav_items(&self) -> Vec<NavItem> {
        let permissions = self.permissions().await;
        nav_items_for(&permissions)
    }
}

pub fn nav_items_for(permissions: &PermissionSet) -> Vec<NavItem> {
    Page::ALL
        .into_iter()
        .map(|page| {
            let enabled = permissions.contains(&page.permission());
            NavItem {
                page,
                enabled,
                tooltip: (!enabled).then_some(NO_PERMISSION_TOOLTIP),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::analytics_api::testing::StubApi;
    use crate::infrastructure::file_store::MemoryStore;
    use serde_json::json;

    fn service(api: StubApi, store: Arc<MemoryStore>, demo: bool) -> AuthService {
        AuthService::new(Arc::new(api), store, demo)
    }

    #[tokio::test]
    async fn test_login_fails_open_in_demo_mode() {
        let store = Arc::new(MemoryStore::new());
        let auth = service(StubApi::new(), store.clone(), true);

        let outcome = auth.login("alice", "x").await.unwrap();
        assert!(outcome.demo);
        assert_eq!(outcome.welcome(), "Bienvenido, Modo Demo");
        assert!(auth.is_authenticated().await);
        assert_eq!(
            auth.current_user().await,
            Some(Session::new(1, "alice".into(), "Usuario Demo".into(), "admin".into()))
        );
        assert!(auth.has_permission("view_inventory").await);
        assert!(store.get(KEY_USER).await.is_some());
    }

    #[tokio::test]
    async fn test_login_unreachable_without_demo_mode() {
        let auth = service(StubApi::new(), Arc::new(MemoryStore::new()), false);
        let err = auth.login("alice", "x").await.unwrap_err();
        assert!(matches!(err, AuthError::Unreachable(_)));
        assert_eq!(err.to_string(), "Error de conexión");
        assert!(!auth.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_login_rejected_credentials() {
        let api = StubApi::new().with("/api/users/login", json!({ "success": false }));
        let auth = service(api, Arc::new(MemoryStore::new()), true);
        let err = auth.login("alice", "bad").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert!(!auth.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_login_success_fetches_permissions() {
        let api = StubApi::new()
            .with(
                "/api/users/login",
                json!({ "success": true, "user": { "id": 9, "username": "ana", "name": "Ana", "role": "analyst" } }),
            )
            .with("/api/users/permissions?user_id=9", json!({ "permissions": ["view_dashboard"] }));
        let auth = service(api, Arc::new(MemoryStore::new()), false);

        let outcome = auth.login("ana", "secret").await.unwrap();
        assert_eq!(outcome.welcome(), "Bienvenido, Ana");
        assert!(auth.has_permission("view_dashboard").await);
        assert!(!auth.has_permission("view_inventory").await);
    }

    #[tokio::test]
    async fn test_missing_fields() {
        let auth = service(StubApi::new(), Arc::new(MemoryStore::new()), true);
        assert!(matches!(auth.login("", "x").await, Err(AuthError::MissingFields)));
    }

    #[tokio::test]
    async fn test_malformed_session_is_cleared() {
        let store = Arc::new(MemoryStore::new());
        store.set(KEY_USER, "{not json").await.unwrap();
        let auth = service(StubApi::new(), store.clone(), false);

        assert!(auth.check_session().await.is_none());
        assert!(!auth.is_authenticated().await);
        assert!(store.get(KEY_USER).await.is_none());
    }

    #[tokio::test]
    async fn test_restored_session_and_logout() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(KEY_USER, r#"{"id":3,"username":"leo","name":"Leo","role":"viewer"}"#)
            .await
            .unwrap();
        let api = StubApi::new().with("/api/users/permissions?user_id=3", json!({ "permissions": [] }));
        let auth = service(api, store.clone(), false);

        let session = auth.check_session().await.unwrap();
        assert_eq!(session.username, "leo");
        auth.logout().await;
        assert!(!auth.is_authenticated().await);
        assert!(auth.permissions().await.is_empty());
        assert!(store.get(KEY_USER).await.is_none());
    }

    #[test]
    fn test_nav_items_gated_by_permission() {
        let items = nav_items_for(&PermissionSet::new(["view_dashboard", "view_customer"]));
        let inventory = items.iter().find(|i| i.page == Page::Inventory).unwrap();
        assert!(!inventory.enabled);
        assert_eq!(inventory.tooltip, Some(NO_PERMISSION_TOOLTIP));
        let dashboard = items.iter().find(|i| i.page == Page::Dashboard).unwrap();
        assert!(dashboard.enabled);
        assert_eq!(dashboard.tooltip, None);
    }
}
