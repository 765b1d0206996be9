pub mod admin;
pub mod classify;
pub mod donations;
