pub mod ai;
pub mod auth;
pub mod dates;
pub mod health;
pub mod users;

#[cfg(test)]
mod tests;
