// Application layer - Ports, section controllers and the app shell
pub mod analytics_api;
pub mod app_shell;
pub mod auth_service;
pub mod chart_registry;
pub mod debounce;
pub mod key_value_store;
pub mod notifications;
pub mod section;
pub mod sections;
