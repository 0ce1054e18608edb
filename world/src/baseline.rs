//! Deterministic starting values for cells that were never modified.

use geotoken_core::{CellIndex, GameConfig, Luck, TokenValue};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};

/// Default [`Luck`] source: SHA-256 of the key seeds a ChaCha8 stream whose
/// first draw is the result.
///
/// Both primitives have fixed output for a given input, so values stay stable
/// across runs, platforms and releases.
#[derive(Clone, Copy, Debug, Default)]
pub struct SeededLuck;

impl Luck for SeededLuck {
    fn luck(&self, key: &str) -> f64 {
        let digest = Sha256::digest(key.as_bytes());
        let mut seed = [0_u8; 32];
        seed.copy_from_slice(&digest);
        ChaCha8Rng::from_seed(seed).gen::<f64>()
    }
}

/// Decides which cells start with a token.
#[derive(Debug)]
pub struct BaselineGenerator {
    namespace: String,
    spawn_probability: f64,
    starting_value: TokenValue,
    luck: Box<dyn Luck>,
}

impl BaselineGenerator {
    /// Creates a generator using the configured namespace, probability and value.
    #[must_use]
    pub fn new(config: &GameConfig, luck: Box<dyn Luck>) -> Self {
        Self {
            namespace: config.namespace.clone(),
            spawn_probability: config.spawn_probability,
            starting_value: config.starting_value,
            luck,
        }
    }

    /// Key passed to the luck source for `cell`, `"{namespace}:{row},{col}"`.
    #[must_use]
    pub fn luck_key(&self, cell: CellIndex) -> String {
        format!("{}:{cell}", self.namespace)
    }

    /// Baseline value of `cell`. Pure; may be called any number of times.
    #[must_use]
    pub fn generate(&self, cell: CellIndex) -> Option<TokenValue> {
        let draw = self.luck.luck(&self.luck_key(cell));
        (draw < self.spawn_probability).then_some(self.starting_value)
    }
}
