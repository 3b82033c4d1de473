pub mod random;
pub mod seq;

pub use random::RandomGenerator;
pub use seq::SeqGenerator;

use snip_core::Token;

/// Trait for generating short tokens.
///
/// Implementations are pure generators that don't interact with storage.
/// Uniqueness is not guaranteed here; the storage layer reports the rare
/// collision and the shortener retries with a fresh token.
pub trait Generator: Send + Sync + 'static {
    fn generate(&self) -> Token;
}
