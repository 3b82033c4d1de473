use crate::Generator;
use snip_core::Token;
use std::sync::atomic::{AtomicU64, Ordering};
use typed_builder::TypedBuilder;

/// Prefix followed by a zero-padded counter: `sn000000`, `sn000001`, ...
///
/// Deterministic, so tests can pre-seed the exact tokens it will produce.
#[derive(Debug, TypedBuilder)]
pub struct SeqGenerator {
    #[builder(setter(into))]
    prefix: String,
    #[builder(default = AtomicU64::new(0), setter(transform = |next: u64| AtomicU64::new(next)))]
    next: AtomicU64,
    #[builder(default = 6)]
    width: usize,
}

impl SeqGenerator {
    /// The token the next call to `generate` will return.
    pub fn peek(&self) -> Token {
        self.format(self.next.load(Ordering::Relaxed))
    }

    fn format(&self, n: u64) -> Token {
        Token::new_unchecked(format!("{}{:0width$}", self.prefix, n, width = self.width))
    }
}

impl Generator for SeqGenerator {
    fn generate(&self) -> Token {
        self.format(self.next.fetch_add(1, Ordering::Relaxed))
    }
}
