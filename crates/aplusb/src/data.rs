use rand::{distributions::Standard, rngs::StdRng, Rng, SeedableRng};

/// Two independent arrays of `n` floats in `[0, 1)`, reproducible from `seed`.
pub fn generate(n: usize, seed: u64) -> (Vec<f32>, Vec<f32>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let a = (&mut rng).sample_iter(Standard).take(n).collect();
    let b = (&mut rng).sample_iter(Standard).take(n).collect();
    (a, b)
}
