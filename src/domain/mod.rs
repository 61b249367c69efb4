// Domain layer - Plain data shared by every section of the dashboard
pub mod analytics;
pub mod chart;
pub mod components;
pub mod date_range;
pub mod format;
pub mod page;
pub mod session;
pub mod theme;
pub mod view;
