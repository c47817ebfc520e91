pub mod handlers;
pub mod reviews;
