//! Deterministic value masker
//!
//! `mask(value, context)` replaces a value with a realistic fictitious one. The
//! same value under the same context always produces the same result, across
//! runs and restarts, because every derived choice is seeded from a fixed FNV-1a
//! hash of the value and its context.
//!
//! Type is preserved: text stays text, UUIDs become v4 UUIDs, integers and
//! floats stay in the same power-of-ten band, timestamps shift by a bounded
//! offset and `Null` passes through.
//!
//! # Examples
//!
//! ```
//! use replica::anonymization::masker::DeterministicMasker;
//! use replica::domain::ColumnValue;
//!
//! let masker = DeterministicMasker::default();
//! let price = masker.mask(&ColumnValue::Float(150.0), "rentals.base_price");
//! match price {
//!     ColumnValue::Float(m) => assert!((100.0..1000.0).contains(&m)),
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```

use crate::domain::ColumnValue;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regex::Regex;
use std::sync::OnceLock;
use uuid::{Builder, Uuid};

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

const CONTEXT_SEPARATOR: u8 = 0x1f;
const SALT_SEPARATOR: u8 = 0x1e;

fn v4_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$")
            .expect("static UUID pattern is valid")
    })
}

/// FNV-1a 64-bit hash (stable across platforms and releases)
pub fn fnv1a64(bytes: &[u8]) -> u64 {
    let mut h = FNV_OFFSET;
    for &b in bytes {
        h ^= b as u64;
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

/// True when the string has the v4 UUID shape
/// `xxxxxxxx-xxxx-4xxx-[89ab]xxx-xxxxxxxxxxxx`
pub fn is_uuid(value: &str) -> bool {
    v4_pattern().is_match(value)
}

/// True for any hyphenated 36-character UUID, whatever its version
fn is_uuid_like(value: &str) -> bool {
    value.len() == 36 && Uuid::try_parse(value).is_ok()
}

/// Deterministic, context-keyed value masker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeterministicMasker {
    /// Maximum shift applied to timestamps, in days, in either direction
    timestamp_window_days: i64,
}

impl Default for DeterministicMasker {
    fn default() -> Self {
        Self {
            timestamp_window_days: 30,
        }
    }
}

impl DeterministicMasker {
    /// Creates a masker with a custom timestamp shift window
    pub fn with_timestamp_window(days: u32) -> Self {
        Self {
            timestamp_window_days: i64::from(days),
        }
    }

    /// Masks a value under a context such as `"table.column"`
    pub fn mask(&self, value: &ColumnValue, context: &str) -> ColumnValue {
        self.mask_salted(value, context, 0)
    }

    /// Masks a value with an additional salt
    ///
    /// Salt 0 is identical to [`mask`](Self::mask). Non-zero salts are used by
    /// the mapping store to step away from a collision.
    pub fn mask_salted(&self, value: &ColumnValue, context: &str, salt: u32) -> ColumnValue {
        // Canonical keys lowercase UUID-shaped text, so `Text` and `Uuid`
        // carriers of one identifier hash identically
        let Some(key) = value.canonical_key() else {
            return ColumnValue::Null;
        };
        let seed = seed_for(&key, context, salt);

        match value {
            ColumnValue::Null => ColumnValue::Null,
            ColumnValue::Bool(_) => ColumnValue::Bool(seed & 1 == 1),
            ColumnValue::Integer(i) => ColumnValue::Integer(mask_integer(*i, seed)),
            ColumnValue::Float(f) => ColumnValue::Float(mask_float(*f, seed)),
            ColumnValue::Uuid(_) => ColumnValue::Uuid(masked_uuid(seed)),
            ColumnValue::Text(s) => ColumnValue::Text(mask_text(s, seed)),
            ColumnValue::Timestamp(ts) => {
                ColumnValue::Timestamp(self.shift_timestamp(*ts, seed))
            }
        }
    }

    fn shift_timestamp(&self, ts: DateTime<Utc>, seed: u64) -> DateTime<Utc> {
        let window = self.timestamp_window_days * 86_400;
        if window == 0 {
            return ts;
        }
        let span = (2 * window + 1) as u64;
        let offset = (seed % span) as i64 - window;
        ts.checked_add_signed(Duration::seconds(offset))
            .unwrap_or(ts)
    }
}

/// Masks a value with the default masker
pub fn mask(value: &ColumnValue, context: &str) -> ColumnValue {
    DeterministicMasker::default().mask(value, context)
}

fn seed_for(key: &str, context: &str, salt: u32) -> u64 {
    let mut bytes = Vec::with_capacity(key.len() + context.len() + 6);
    bytes.extend_from_slice(key.as_bytes());
    bytes.push(CONTEXT_SEPARATOR);
    bytes.extend_from_slice(context.as_bytes());
    if salt > 0 {
        bytes.push(SALT_SEPARATOR);
        bytes.extend_from_slice(&salt.to_le_bytes());
    }
    fnv1a64(&bytes)
}

fn masked_uuid(seed: u64) -> Uuid {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut bytes = [0u8; 16];
    rng.fill(&mut bytes[..]);
    Builder::from_random_bytes(bytes).into_uuid()
}

/// Rounds of re-seeding before a text value may mask to itself
const TEXT_RESEED_ROUNDS: usize = 8;

fn mask_text(value: &str, seed: u64) -> String {
    if is_uuid_like(value) {
        return masked_uuid(seed).hyphenated().to_string();
    }

    // Text without letters or digits has nothing to replace and stays as is
    let mut seed = seed;
    let mut masked = scramble_text(value, seed);
    for _ in 0..TEXT_RESEED_ROUNDS {
        if masked != value {
            break;
        }
        seed = fnv1a64(&seed.to_le_bytes());
        masked = scramble_text(value, seed);
    }
    masked
}

fn scramble_text(value: &str, seed: u64) -> String {
    let mut rng = StdRng::seed_from_u64(seed);
    value
        .chars()
        .map(|c| {
            if c.is_ascii_uppercase() {
                rng.gen_range(b'A'..=b'Z') as char
            } else if c.is_ascii_lowercase() || (c.is_alphabetic() && !c.is_ascii()) {
                rng.gen_range(b'a'..=b'z') as char
            } else if c.is_ascii_digit() {
                rng.gen_range(b'0'..=b'9') as char
            } else {
                c
            }
        })
        .collect()
}

/// Inclusive magnitude range of the power-of-ten band holding a non-zero value
fn magnitude_band(value: i64) -> Option<(u128, u128)> {
    if value == 0 {
        return None;
    }
    let magnitude = u128::from(value.unsigned_abs());
    let mut low: u128 = 1;
    while low * 10 <= magnitude {
        low *= 10;
    }
    // Largest representable magnitude for the sign
    let bound: u128 = if value > 0 {
        i64::MAX as u128
    } else {
        i64::MAX as u128 + 1
    };
    Some((low, (low * 10 - 1).min(bound)))
}

/// Signed inclusive range of integers sharing a value's band and sign
///
/// Returns `None` for zero, which masks to itself.
pub fn integer_band(value: i64) -> Option<(i64, i64)> {
    let (low, high) = magnitude_band(value)?;
    if value > 0 {
        Some((low as i64, high as i64))
    } else {
        Some(((-(high as i128)) as i64, (-(low as i128)) as i64))
    }
}

/// Maps a non-zero integer into the same power-of-ten band with the same sign,
/// never onto itself
fn mask_integer(value: i64, seed: u64) -> i64 {
    let Some((low, high)) = magnitude_band(value) else {
        return 0;
    };
    let magnitude = u128::from(value.unsigned_abs());
    let span = high - low + 1;
    let mut masked = low + u128::from(seed) % span;
    if masked == magnitude {
        masked = if masked == high { low } else { masked + 1 };
    }

    if value > 0 {
        masked as i64
    } else {
        (-(masked as i128)) as i64
    }
}

/// Maps a non-zero finite float into the same power-of-ten band with the same sign
fn mask_float(value: f64, seed: u64) -> f64 {
    if value == 0.0 || !value.is_finite() {
        return value;
    }
    let sign = value.signum();
    let magnitude = value.abs();

    let mut low = 10f64.powi(magnitude.log10().floor() as i32);
    if low > magnitude {
        low /= 10.0;
    }
    if low * 10.0 <= magnitude {
        low *= 10.0;
    }
    let high = low * 10.0;

    let fraction = (seed >> 11) as f64 / (1u64 << 53) as f64;
    let mut masked = low + fraction * (high - low);
    if low >= 1.0 {
        masked = (masked * 100.0).floor() / 100.0;
    }
    if !(low..high).contains(&masked) {
        masked = low;
    }
    sign * masked
}
