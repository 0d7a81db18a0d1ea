//! Cryptographically strong word sources for the pool.
//!
//! The pool is generic over any `RngCore + CryptoRng`. In normal
//! operation that is the operating system generator; for reproducible
//! offline renders a ChaCha20 stream keyed from a passphrase is used
//! instead.

use rand_chacha::ChaCha20Rng;
use rand_core::{OsRng, RngCore, SeedableRng};
use thiserror::Error;

/// Key-derivation context for passphrase-keyed sources.
const PASSPHRASE_CONTEXT: &str = "focus-noise 2024 passphrase entropy source v1";

/// Errors raised while bringing up an entropy source.
#[derive(Debug, Error)]
pub enum EntropyError {
    /// The strong source could not produce output.
    #[error("cryptographically strong source unavailable: {0}")]
    SourceUnavailable(String),
}

/// Returns the OS generator after checking that it can produce output.
///
/// A failure here is fatal at startup: without a strong source there is
/// no pool.
pub fn os_source() -> Result<OsRng, EntropyError> {
    let mut probe = [0u8; 4];
    OsRng
        .try_fill_bytes(&mut probe)
        .map_err(|e| EntropyError::SourceUnavailable(e.to_string()))?;
    Ok(OsRng)
}

/// Deterministic ChaCha20 source keyed from a passphrase via BLAKE3.
///
/// Intended for reproducible renders and tests, not for secrecy.
pub fn passphrase_source(passphrase: &str) -> ChaCha20Rng {
    let key = blake3::derive_key(PASSPHRASE_CONTEXT, passphrase.as_bytes());
    ChaCha20Rng::from_seed(key)
}
