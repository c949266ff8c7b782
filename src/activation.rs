//! Activation function for hidden and output nodes.
//!
//! NEAT networks here use a single steepened logistic curve. The steeper slope
//! makes the function close to linear over roughly [-0.5, 0.5], which suits
//! weights bounded to [-1, 1].

/// Slope applied to the logistic input.
pub const SIGMOID_SLOPE: f32 = 4.9;

/// Inputs are clamped to `[-SIGMOID_CLAMP, SIGMOID_CLAMP]` before
/// exponentiation to avoid overflow.
pub const SIGMOID_CLAMP: f32 = 60.0;

/// Steepened logistic: `f(x) = 1 / (1 + e^(-4.9x))`.
///
/// Infinite inputs saturate to 0 or 1; NaN propagates.
#[inline]
#[must_use]
pub fn steepened_sigmoid(x: f32) -> f32 {
    let clamped = x.clamp(-SIGMOID_CLAMP, SIGMOID_CLAMP);
    1.0 / (1.0 + (-SIGMOID_SLOPE * clamped).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_midpoint() {
        assert!((steepened_sigmoid(0.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_known_value() {
        // 1 / (1 + e^-4.9)
        assert!((steepened_sigmoid(1.0) - 0.992_609).abs() < 1e-5);
    }

    #[test]
    fn test_saturation() {
        assert!(steepened_sigmoid(1_000.0) > 0.999_999);
        assert!(steepened_sigmoid(-1_000.0) < 1e-6);
        assert!((steepened_sigmoid(f32::INFINITY) - 1.0).abs() < 1e-6);
        assert!(steepened_sigmoid(f32::NEG_INFINITY).abs() < 1e-6);
    }

    #[test]
    fn test_nan_propagates() {
        assert!(steepened_sigmoid(f32::NAN).is_nan());
    }

    #[test]
    fn test_monotonic() {
        let mut prev = steepened_sigmoid(-2.0);
        for i in -19..=20 {
            let y = steepened_sigmoid(i as f32 * 0.1);
            assert!(y >= prev);
            prev = y;
        }
    }
}
