pub mod auth;
pub mod health;
pub mod insights;
pub mod tasks;
