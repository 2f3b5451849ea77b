// uniform sampling used by measurement. the engine owns its generator,
// nothing here touches global state.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Probability mass above which an outcome is treated as certain and no
/// random number is drawn.
pub const CERTAINTY: f64 = 1.0 - 1e-12;

/// Generator from an explicit seed, or from entropy when `seed` is `None`.
pub fn rng_from_seed(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => ChaCha8Rng::from_entropy(),
    }
}

/// Independent stream `stream` of the generator seeded with `seed`, used for
/// per-shot engines.
pub fn shot_rng(seed: u64, stream: u64) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(stream);
    rng
}

/// Draws an outcome index from the distribution `probs`.
///
/// When a single outcome already carries (almost) all of the mass it is
/// returned without consuming randomness. Outcomes of zero probability are
/// never returned.
pub fn sample_outcome<R: Rng + ?Sized>(probs: &[f64], rng: &mut R) -> usize {
    if let Some(k) = probs.iter().position(|&p| p >= CERTAINTY) {
        return k;
    }
    let total: f64 = probs.iter().sum();
    let r: f64 = rng.gen::<f64>() * total;
    let mut acc = 0.0;
    let mut last_nonzero = 0;
    for (k, &p) in probs.iter().enumerate() {
        if p <= 0.0 {
            continue;
        }
        last_nonzero = k;
        acc += p;
        if r < acc {
            return k;
        }
    }
    // rounding left r at or above the accumulated mass
    last_nonzero
}
