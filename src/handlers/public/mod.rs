// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Registration and login issue the credentials every other route needs,
// so they cannot sit behind the bearer middleware. Root and health are
// informational only.

pub mod auth;
pub mod system;
