mod advanced;
mod basic;

use rand::Rng;

pub use advanced::{AdvancedAttempt, AdvancedState, AncestorDraw, gain_exp, resolve_advanced_attempt};
pub use basic::{BasicAttempt, BasicState, resolve_basic_attempt};

#[inline]
pub(crate) fn roll<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.gen_range(0.0..1.0)
}

/// Index selected by `roll` in `[0, 1)` over cumulative `weights`.
///
/// Rounding can leave the cumulative sum a hair under 1; such rolls land on
/// the last entry.
pub(crate) fn pick_weighted<I>(weights: I, roll: f64) -> usize
where
    I: IntoIterator<Item = f64>,
{
    let mut cumulative = 0.0;
    let mut last = 0;
    for (index, weight) in weights.into_iter().enumerate() {
        cumulative += weight;
        if roll < cumulative {
            return index;
        }
        last = index;
    }
    last
}
