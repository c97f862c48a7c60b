//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float,
{
    target_range.0
        + ((value - source_range.0) * (target_range.1 - target_range.0)
            / (source_range.1 - source_range.0))
}

/// Linearly interpolate `value` in a table of monotonically increasing `xs` and matching `ys`.
///
/// Values outside the table give NaN rather than being clamped or extrapolated. An empty or
/// mismatched table also gives NaN.
pub fn lin_interp<T>(xs: &[T], ys: &[T], value: T) -> T
where
    T: Float,
{
    if xs.is_empty() || xs.len() != ys.len() || value.is_nan() {
        return T::nan();
    }

    let last = xs.len() - 1;
    if value < xs[0] || value > xs[last] {
        return T::nan();
    }

    for i in 0..last {
        if value <= xs[i + 1] {
            let span = xs[i + 1] - xs[i];
            if span <= T::zero() {
                return ys[i + 1];
            }
            return lin_map((xs[i], xs[i + 1]), (ys[i], ys[i + 1]), value);
        }
    }

    ys[last]
}

/// Clamp a value into the inclusive range `[min, max]`.
pub fn clamp<T>(value: T, min: T, max: T) -> T
where
    T: Float,
{
    value.max(min).min(max)
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// `num_traits::Float` has no `rem_euclid`, so this follows the std implementation.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float,
{
    let r = lhs % rhs;
    if r < T::zero() {
        r + rhs.abs()
    } else {
        r
    }
}

/// Wrap an angle in degrees into the range (-180, 180].
pub fn wrap_deg_180<T>(angle_deg: T) -> T
where
    T: Float,
{
    let full = deg(360.0);
    let half = deg(180.0);

    let wrapped = rem_euclid(angle_deg + half, full) - half;
    if wrapped <= -half {
        wrapped + full
    } else {
        wrapped
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Constant in the generic float type. Every `Float` can represent these small constants.
fn deg<T: Float>(v: f64) -> T {
    T::from(v).unwrap_or_else(T::nan)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_wrap_deg_180() {
        assert_eq!(wrap_deg_180(0f64), 0f64);
        assert_eq!(wrap_deg_180(180f64), 180f64);
        assert_eq!(wrap_deg_180(-180f64), 180f64);
        assert_eq!(wrap_deg_180(190f64), -170f64);
        assert_eq!(wrap_deg_180(-190f64), 170f64);
        assert_eq!(wrap_deg_180(720f64 + 45f64), 45f64);
    }

    #[test]
    fn test_lin_interp() {
        let xs = [0f64, 10f64, 20f64];
        let ys = [0f64, 100f64, 150f64];

        assert_eq!(lin_interp(&xs, &ys, 5f64), 50f64);
        assert_eq!(lin_interp(&xs, &ys, 15f64), 125f64);
        assert_eq!(lin_interp(&xs, &ys, 20f64), 150f64);
        assert!(lin_interp(&xs, &ys, -0.1f64).is_nan());
        assert!(lin_interp(&xs, &ys, 20.1f64).is_nan());
        assert!(lin_interp(&xs, &ys[..2], 1f64).is_nan());
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(5f64, 0f64, 1f64), 1f64);
        assert_eq!(clamp(-5f64, 0f64, 1f64), 0f64);
        assert_eq!(clamp(0.5f64, 0f64, 1f64), 0.5f64);
    }
}
