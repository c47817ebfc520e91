pub mod application;
pub mod company;
pub mod job;
pub mod preferences;
pub mod profile;
pub mod user;
