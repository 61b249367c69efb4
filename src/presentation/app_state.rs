// Application state for HTTP handlers
use crate::application::app_shell::AppShell;

pub struct AppState {
    pub shell: AppShell,
}
