use num_traits::Float;
use single_utilities::traits::FloatOps;
use std::cmp::Ordering;

/// Convert an `f64` constant into `T`, yielding NaN if it cannot be represented.
pub(crate) fn cast<T: FloatOps>(value: f64) -> T {
    T::from(value).unwrap_or_else(<T as Float>::nan)
}

/// Arithmetic mean of a slice, `None` when the slice is empty.
pub fn mean<T>(values: &[T]) -> Option<T>
where
    T: FloatOps,
{
    if values.is_empty() {
        return None;
    }

    let mut sum = T::zero();
    for &value in values {
        sum += value;
    }
    Some(sum / cast::<T>(values.len() as f64))
}

/// Percentile `q` (in `[0, 100]`) of a slice, interpolating linearly between the two
/// closest order statistics. Returns `None` for an empty slice.
pub fn percentile<T>(values: &[T], q: f64) -> Option<T>
where
    T: FloatOps,
{
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    percentile_sorted(&sorted, q)
}

/// Same as [`percentile`] for input that is already sorted ascending.
pub fn percentile_sorted<T>(sorted: &[T], q: f64) -> Option<T>
where
    T: FloatOps,
{
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    if n == 1 {
        return Some(sorted[0]);
    }

    let position = q.clamp(0.0, 100.0) / 100.0 * (n - 1) as f64;
    let lo = position.floor() as usize;
    let hi = position.ceil() as usize;

    if lo == hi {
        Some(sorted[lo])
    } else {
        let weight = cast::<T>(position - lo as f64);
        Some(sorted[lo] + (sorted[hi] - sorted[lo]) * weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_mean() {
        assert_eq!(mean::<f64>(&[]), None);
        assert_abs_diff_eq!(mean(&[1.0, 2.0, 3.0, 6.0]).unwrap(), 3.0);
    }

    #[test]
    fn test_percentile_matches_linear_interpolation() {
        let values = vec![4.0, 1.0, 3.0, 2.0, 5.0];
        assert_abs_diff_eq!(percentile(&values, 0.0).unwrap(), 1.0);
        assert_abs_diff_eq!(percentile(&values, 50.0).unwrap(), 3.0);
        assert_abs_diff_eq!(percentile(&values, 100.0).unwrap(), 5.0);
        // position 0.99 * 4 = 3.96 -> 4 + 0.96 * (5 - 4)
        assert_abs_diff_eq!(percentile(&values, 99.0).unwrap(), 4.96, epsilon = 1e-12);
        assert_abs_diff_eq!(percentile(&values, 2.5).unwrap(), 1.1, epsilon = 1e-12);
    }

    #[test]
    fn test_percentile_edge_cases() {
        assert_eq!(percentile::<f64>(&[], 50.0), None);
        assert_abs_diff_eq!(percentile(&[7.5f32], 99.0).unwrap(), 7.5);
    }
}
