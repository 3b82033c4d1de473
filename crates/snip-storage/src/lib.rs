pub mod factory;
pub mod file;
pub mod index;
pub mod memory;
pub mod postgres;

pub use factory::{Storage, StorageSettings};
pub use file::FileRepository;
pub use index::BaseIndex;
pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;
pub use snip_core::error::{ErrorKind, Result, StorageError};
pub use snip_core::{Repository, StorageType, Token, UrlRecord};
