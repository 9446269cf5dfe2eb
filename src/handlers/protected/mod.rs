// handlers/protected/mod.rs - Protected handlers (bearer token required)
//
// Every handler here runs behind jwt_auth_middleware and receives the
// resolved caller as `Extension<AuthUser>`. Reads are filtered to the
// caller's family; lookups by id go through `AuthUser::owned` first, and
// mutations then call `AuthUser::require_accepted`.

pub mod family;
pub mod grocery;
pub mod meals;
pub mod recipes;
pub mod tasks;
pub mod thoughts;
pub mod utils;
pub mod whoami;

use serde::Serialize;

/// Body returned by every DELETE handler
#[derive(Debug, Serialize)]
pub struct Deleted {
    pub message: String,
}

impl Deleted {
    pub fn new(what: &str) -> Self {
        Self {
            message: format!("{} deleted", what),
        }
    }
}
