//! Built-in models

pub mod history;
pub mod user;

pub use history::history_resource;
pub use user::{User, user_resource};
