use crate::Generator;
use rand::distributions::Alphanumeric;
use rand::Rng;
use snip_core::Token;
use typed_builder::TypedBuilder;

/// Random token generator over the 62-character alphanumeric alphabet.
///
/// Each token has a length drawn uniformly from `[min_length, max_length)`
/// and characters drawn uniformly from `[A-Za-z0-9]`. The thread-local PRNG
/// keeps concurrent callers from contending on shared state.
#[derive(Debug, Clone, TypedBuilder)]
pub struct RandomGenerator {
    #[builder(default = 6)]
    min_length: usize,
    #[builder(default = 10)]
    max_length: usize,
}

impl RandomGenerator {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }
}

impl Default for RandomGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator for RandomGenerator {
    fn generate(&self) -> Token {
        let mut rng = rand::thread_rng();
        let length = if self.max_length > self.min_length {
            rng.gen_range(self.min_length..self.max_length)
        } else {
            self.min_length
        };
        let token: String = (&mut rng)
            .sample_iter(&Alphanumeric)
            .take(length)
            .map(char::from)
            .collect();
        Token::new_unchecked(token)
    }
}
