//! Short random tokens used to disambiguate resource names.
//!
//! All draws go through one process-wide generator seeded from the wall clock
//! the first time it is touched. The generator sits behind a mutex so tasks
//! running on different worker threads can draw concurrently.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

/// Alphabet used for tokens: `[a-zA-Z0-9]`.
pub const TOKEN_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

static SHARED_RNG: OnceLock<Mutex<StdRng>> = OnceLock::new();

fn shared_rng() -> &'static Mutex<StdRng> {
    SHARED_RNG.get_or_init(|| {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        Mutex::new(StdRng::seed_from_u64(seed))
    })
}

/// Run `f` with exclusive access to the process-wide generator.
pub fn with_shared_rng<T>(f: impl FnOnce(&mut StdRng) -> T) -> T {
    // A poisoned lock only means another draw panicked; the generator state is still usable.
    let mut guard = match shared_rng().lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    f(&mut guard)
}

/// Generate `length` characters drawn uniformly from [`TOKEN_ALPHABET`].
pub fn generate_token(length: usize) -> String {
    with_shared_rng(|rng| generate_token_with(rng, length))
}

/// Same as [`generate_token`] but with a caller-supplied generator.
pub fn generate_token_with<R: Rng + ?Sized>(rng: &mut R, length: usize) -> String {
    (0..length)
        .map(|_| TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())] as char)
        .collect()
}
