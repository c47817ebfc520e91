// Signup wizard: basics -> job_preferences -> skills -> location -> complete.

pub mod handlers;
pub mod wizard;
