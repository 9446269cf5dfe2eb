pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

pub use manager::{open_store, DatabaseError};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::{Store, StoreResult};
