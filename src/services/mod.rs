pub mod analysis;
pub mod dates;
pub mod identity;
pub mod insights;
pub mod mailer;
