// handlers/public/auth/mod.rs - Account creation and token acquisition

pub mod login;
pub mod register;

pub use login::login;
pub use register::register;
