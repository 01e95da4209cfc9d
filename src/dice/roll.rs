//! Uniform dice rolls.

use rand::Rng;

/// Roll `rolls` dice, each uniform in `[min, max]`.
///
/// Returns an empty vector when `min > max`.
pub fn roll_the_dice<R: Rng>(rng: &mut R, rolls: usize, min: u32, max: u32) -> Vec<u32> {
    if min > max {
        return Vec::new();
    }
    (0..rolls).map(|_| rng.gen_range(min..=max)).collect()
}
