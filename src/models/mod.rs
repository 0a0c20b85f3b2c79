pub mod date_entry;
pub mod user;
