use hmac::{Hmac, Mac};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

// Random sources for the spin engine. Not cryptographically fair; the engine
// only needs uniform floats in [0,1) and a seam for deterministic tests.

pub type HmacSha256 = Hmac<Sha256>;

pub trait RandomSource {
    /// Uniform float in [0, 1). Every call yields a fresh value.
    fn next_f64(&mut self) -> f64;
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn next_f64(&mut self) -> f64 {
        (**self).next_f64()
    }
}

/// Maps successive big-endian 4-byte chunks to floats in [0,1).
pub fn derive_floats(bytes: &[u8]) -> Vec<f64> {
    bytes
        .chunks_exact(4)
        .map(|chunk| {
            let v = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            (v as f64) / (u32::MAX as f64 + 1.0)
        })
        .collect()
}

/// General-purpose source backed by `StdRng`.
pub struct ThreadRandom(StdRng);

impl ThreadRandom {
    pub fn from_entropy() -> Self {
        Self(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl RandomSource for ThreadRandom {
    fn next_f64(&mut self) -> f64 {
        self.0.gen::<f64>()
    }
}

/// Reproducible stream: HMAC-SHA256(seed, "label:nonce:block") expanded block
/// by block. Used by the simulator and for replaying a recorded spin.
pub struct SeededRandom {
    seed: String,
    label: String,
    nonce: u64,
    block: u64,
    buffer: Vec<f64>,
}

impl SeededRandom {
    pub fn new(seed: impl Into<String>, label: impl Into<String>, nonce: u64) -> Self {
        Self {
            seed: seed.into(),
            label: label.into(),
            nonce,
            block: 0,
            buffer: Vec::new(),
        }
    }

    /// Hex SHA-256 of the seed, publishable before the stream is used.
    pub fn commitment(&self) -> String {
        hex::encode(Sha256::digest(self.seed.as_bytes()))
    }

    fn refill(&mut self) {
        let mut mac = HmacSha256::new_from_slice(self.seed.as_bytes()).expect("HMAC key");
        let msg = format!("{}:{}:{}", self.label, self.nonce, self.block);
        mac.update(msg.as_bytes());
        let bytes = mac.finalize().into_bytes();
        self.block += 1;
        let mut floats = derive_floats(&bytes);
        floats.reverse();
        self.buffer = floats;
    }
}

impl RandomSource for SeededRandom {
    fn next_f64(&mut self) -> f64 {
        if self.buffer.is_empty() {
            self.refill();
        }
        self.buffer.pop().unwrap_or(0.0)
    }
}

/// Replays a fixed list of values, cycling when exhausted.
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    values: Vec<f64>,
    cursor: usize,
}

impl ScriptedRandom {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values, cursor: 0 }
    }

    /// How many values have been consumed so far.
    pub fn consumed(&self) -> usize {
        self.cursor
    }
}

impl RandomSource for ScriptedRandom {
    fn next_f64(&mut self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let v = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        v
    }
}
