// Handler tiers:
//   public    - no authentication (/, /health, /register, /login)
//   protected - bearer token required, caller injected by jwt_auth_middleware

pub mod protected;
pub mod public;
pub mod utils;
