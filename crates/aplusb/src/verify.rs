use crate::error::BenchError;

/// Checks `c[i] == a[i] + b[i]` bit-for-bit in single precision.
pub fn verify(a: &[f32], b: &[f32], c: &[f32]) -> Result<(), BenchError> {
    if a.len() != b.len() || a.len() != c.len() {
        return Err(BenchError::Config(format!(
            "verification needs equal lengths, got {}/{}/{}",
            a.len(),
            b.len(),
            c.len()
        )));
    }

    match a.iter().zip(b).zip(c).position(|((x, y), z)| *z != x + y) {
        None => Ok(()),
        Some(index) => Err(BenchError::Verification {
            index,
            expected: a[index] + b[index],
            actual: c[index],
        }),
    }
}
