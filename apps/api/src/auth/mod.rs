// Authentication: password accounts, OAuth sign-in, JWT issuance and the
// request middleware that resolves a bearer token into an `AuthUser`.

pub mod handlers;
pub mod jwt;
pub mod middleware;
pub mod oauth;
pub mod password;
