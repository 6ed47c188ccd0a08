//! This is the vector module
//! Provide the deterministic text-to-vector generator and basic vector math

/// Number of components in every generated vector
pub const DIMENSION: usize = 16;

/// A dense vector of components in [-1, 1]
pub type Vector = Vec<f64>;

/// Rolling 32-bit hash
/// hash = hash * 31 + c for every UTF-16 code unit c, wrapping on overflow
pub fn hash_text(text: &str) -> i32 {
    text.encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

/// Maps a text to a pseudo-random vector of `DIMENSION` components.
///
/// The text is trimmed and lower-cased first, so `" Hello "`, `"hello"` and
/// `"HELLO"` share a vector. Blank input yields the zero vector.
///
/// Each component is derived from `sin(hash + i)`: the fractional part of
/// `sin(hash + i) * 10000` is scaled into [-1, 1] and rounded to 4 decimals.
///
/// # Examples
///
/// ```
/// use vecviz::vector::{generate, DIMENSION};
///
/// let v = generate("A sunny day at the beach");
/// assert_eq!(v.len(), DIMENSION);
/// assert_eq!(v, generate("  a SUNNY day at the beach "));
///
/// assert!(generate("   ").iter().all(|x| *x == 0.0));
/// ```
pub fn generate(text: &str) -> Vector {
    let normalized = text.trim().to_lowercase();
    if normalized.is_empty() {
        return vec![0.0; DIMENSION];
    }

    let seed = f64::from(hash_text(&normalized));

    (0..DIMENSION)
        .map(|i| {
            let x = (seed + i as f64).sin() * 10000.0;
            round4((x - x.floor()) * 2.0 - 1.0)
        })
        .collect()
}

/// Rounds through the decimal representation so the result is the
/// closest double to the 4-digit decimal string.
fn round4(value: f64) -> f64 {
    format!("{value:.4}").parse().unwrap_or(value)
}

/// Dot Product
/// dot_prod = sum(a[i] * b[i]) over the shorter of the two slices
pub fn dot_product(left: &[f64], right: &[f64]) -> f64 {
    left.iter()
        .zip(right.iter())
        .map(|(x, y)| x * y)
        .sum()
}

/// Euclidean norm
/// ||v|| = sqrt(sum(v[i]^2))
pub fn magnitude(vector: &[f64]) -> f64 {
    vector.iter()
        .map(|x| x * x)
        .sum::<f64>()
        .sqrt()
}
