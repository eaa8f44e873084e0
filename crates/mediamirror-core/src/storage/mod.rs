pub mod lock;
pub mod models;
pub mod store;

pub use lock::MirrorLock;
pub use store::{RecordStore, Table, Tables};
