// Section controllers, one per dashboard tab
pub mod customer;
pub mod dashboard;
pub mod inventory;
pub mod ml;
pub mod reviews;
pub mod settings;
