// Job listings: search, detail, admin create + feed import, autocomplete and
// per-user recommendations.

pub mod autocomplete;
pub mod handlers;
pub mod matching;
pub mod scrape;
pub mod search;
