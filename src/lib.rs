// Storefront analytics dashboard: domain model, sections, adapters and HTTP surface
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
