// Application tracker ("My Applications"): apply to a job, update status and
// notes, list with filters and per-status counts.

pub mod handlers;
pub mod tracker;
