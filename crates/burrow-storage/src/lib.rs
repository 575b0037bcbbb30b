//! Record store backends.

pub mod memory;
pub mod mysql;

pub use burrow_core::{RecordStore, StorageError};
pub use memory::InMemoryRecordStore;
pub use mysql::MySqlRecordStore;
