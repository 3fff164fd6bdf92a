pub mod core;
pub mod directory;
pub mod followup;
pub mod reports;
