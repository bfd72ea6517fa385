// agent-world/src/fractal.rs

use crate::{WorldError, WorldResult};
use ledger_crypto::digest;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// URI scheme of a signature descriptor
pub const DESCRIPTOR_PREFIX: &str = "frsig://";

/// Seeds are kept to 31 bits
pub const SEED_MASK: u64 = 0x7FFF_FFFF;

const DEFAULT_SIZE: u32 = 256;
const DEFAULT_ITERS: u32 = 64;
const SUMMARY_CHARS: usize = 120;

/// Deterministic fractal parameters derived from a seed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FractalSignature {
    pub seed: u32,
    pub size: u32,
    pub iters: u32,
    pub c_re: f64,
    pub c_im: f64,
    pub zoom: f64,
    pub ox: f64,
    pub oy: f64,
}

impl FractalSignature {
    pub fn new(seed: u64) -> Self {
        Self::with_dimensions(seed, DEFAULT_SIZE, DEFAULT_ITERS)
    }

    /// Parameters drawn from an RNG seeded with the masked seed
    pub fn with_dimensions(seed: u64, size: u32, iters: u32) -> Self {
        let seed = (seed & SEED_MASK) as u32;
        let mut rng = StdRng::seed_from_u64(u64::from(seed));
        Self {
            seed,
            size,
            iters,
            c_re: (rng.gen::<f64>() - 0.5) * 1.5,
            c_im: (rng.gen::<f64>() - 0.5) * 1.5,
            zoom: 1.0 + rng.gen::<f64>() * 2.0,
            ox: (rng.gen::<f64>() - 0.5) * 1.2,
            oy: (rng.gen::<f64>() - 0.5) * 1.2,
        }
    }

    /// `frsig://seed:size:iters:c_re:c_im:zoom:ox:oy`
    pub fn descriptor(&self) -> String {
        format!(
            "{}{}:{}:{}:{:.6}:{:.6}:{:.6}:{:.6}:{:.6}",
            DESCRIPTOR_PREFIX,
            self.seed,
            self.size,
            self.iters,
            self.c_re,
            self.c_im,
            self.zoom,
            self.ox,
            self.oy
        )
    }

    pub fn from_descriptor(desc: &str) -> WorldResult<Self> {
        let body = desc
            .strip_prefix(DESCRIPTOR_PREFIX)
            .ok_or_else(|| WorldError::BadDescriptor(format!("missing {DESCRIPTOR_PREFIX} prefix")))?;

        let parts: Vec<&str> = body.split(':').collect();
        if parts.len() < 8 {
            return Err(WorldError::BadDescriptor(format!(
                "expected 8 fields, got {}",
                parts.len()
            )));
        }

        let int = |s: &str| -> WorldResult<u64> {
            s.parse()
                .map_err(|_| WorldError::BadDescriptor(format!("not an integer: {s}")))
        };
        let float = |s: &str| -> WorldResult<f64> {
            s.parse()
                .map_err(|_| WorldError::BadDescriptor(format!("not a number: {s}")))
        };

        let size = u32::try_from(int(parts[1])?)
            .map_err(|_| WorldError::BadDescriptor("size out of range".into()))?;
        let iters = u32::try_from(int(parts[2])?)
            .map_err(|_| WorldError::BadDescriptor("iters out of range".into()))?;

        let mut signature = Self::with_dimensions(int(parts[0])?, size, iters);
        signature.c_re = float(parts[3])?;
        signature.c_im = float(parts[4])?;
        signature.zoom = float(parts[5])?;
        signature.ox = float(parts[6])?;
        signature.oy = float(parts[7])?;
        Ok(signature)
    }
}

/// Text turned into a signature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedText {
    pub seed: u32,
    pub descriptor: String,
    pub summary: String,
}

/// 31-bit seed from the first 16 hex chars of the text's SHA-256
pub fn seed_from_text(text: &str) -> u32 {
    let hex = digest(text).to_hex();
    let head = u64::from_str_radix(&hex[..16], 16).unwrap_or(0);
    (head & SEED_MASK) as u32
}

pub fn encode_text(text: &str) -> EncodedText {
    let seed = seed_from_text(text);
    EncodedText {
        seed,
        descriptor: FractalSignature::new(u64::from(seed)).descriptor(),
        summary: text.chars().take(SUMMARY_CHARS).collect(),
    }
}

/// Deterministic hybrid seed for two parents
pub fn mix_seeds(a: u32, b: u32, mix: f64) -> u32 {
    let (a, b) = (u64::from(a), u64::from(b));
    let m = (a ^ ((b << 16) | (b >> 15))) & SEED_MASK;
    let bias = (mix * 1_000_003.0) as i64 as u64;
    let m = bias
        .wrapping_add(m.wrapping_mul(1_664_525).wrapping_add(1_013_904_223))
        & SEED_MASK;
    m as u32
}
