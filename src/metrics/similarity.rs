//! Distance-based similarity summaries for cell embeddings.
//!
//! Embeddings are dense `N × D` matrices with one row per cell. Distances are plain Euclidean
//! distances between rows, computed in parallel over rows.

use ndarray::{Array2, ArrayView1, ArrayView2};
use num_traits::Float;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use single_utilities::traits::FloatOpsTS;

use crate::metrics::utils::cast;

#[inline]
fn euclidean<T>(a: ArrayView1<T>, b: ArrayView1<T>) -> T
where
    T: FloatOpsTS,
{
    let mut acc = T::zero();
    for (&u, &v) in a.iter().zip(b.iter()) {
        let diff = u - v;
        acc += diff * diff;
    }
    Float::sqrt(acc)
}

/// Full symmetric matrix of Euclidean distances between the rows of `embedding`.
///
/// The diagonal is exactly zero.
pub fn pairwise_euclidean_distances<T>(embedding: ArrayView2<T>) -> Array2<T>
where
    T: FloatOpsTS,
{
    let n = embedding.nrows();

    let rows: Vec<Vec<T>> = (0..n)
        .into_par_iter()
        .map(|i| {
            (0..n)
                .map(|j| {
                    if i == j {
                        T::zero()
                    } else {
                        euclidean(embedding.row(i), embedding.row(j))
                    }
                })
                .collect()
        })
        .collect();

    Array2::from_shape_fn((n, n), |(i, j)| rows[i][j])
}

/// Average pairwise Euclidean similarity among the rows of `embedding`.
///
/// Defined as `(2 - d̄) / 2`, where `d̄` is the mean distance over the strict upper triangle
/// of the distance matrix (each unordered pair counted once, self-distances excluded). For
/// unit-norm embeddings distances lie in `[0, 2]`, so the result lies in `[0, 1]`.
///
/// # Returns
///
/// The similarity, or NaN when fewer than two rows are given.
pub fn average_pairwise_euclidean_similarity<T>(embedding: ArrayView2<T>) -> T
where
    T: FloatOpsTS,
{
    let n = embedding.nrows();
    if n < 2 {
        return <T as Float>::nan();
    }

    let total = (0..n)
        .into_par_iter()
        .map(|i| {
            let mut row_sum = T::zero();
            for j in (i + 1)..n {
                row_sum += euclidean(embedding.row(i), embedding.row(j));
            }
            row_sum
        })
        .reduce(T::zero, |a, b| a + b);

    let n_pairs = cast::<T>((n * (n - 1) / 2) as f64);
    let two = cast::<T>(2.0);
    (two - total / n_pairs) / two
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_distance_matrix_is_symmetric() {
        let x = array![[0.0, 0.0], [3.0, 4.0], [6.0, 8.0]];
        let d = pairwise_euclidean_distances(x.view());

        assert_eq!(d.dim(), (3, 3));
        assert_abs_diff_eq!(d[[0, 1]], 5.0);
        assert_abs_diff_eq!(d[[0, 2]], 10.0);
        assert_abs_diff_eq!(d[[1, 2]], 5.0);
        for i in 0..3 {
            assert_eq!(d[[i, i]], 0.0);
            for j in 0..3 {
                assert_eq!(d[[i, j]], d[[j, i]]);
            }
        }
    }

    #[test]
    fn test_orthogonal_unit_vectors() {
        let x = array![[1.0, 0.0], [0.0, 1.0]];
        let s = average_pairwise_euclidean_similarity(x.view());
        assert_abs_diff_eq!(s, (2.0 - 2.0f64.sqrt()) / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_bounds_for_unit_vectors() {
        let identical = array![[0.6, 0.8], [0.6, 0.8], [0.6, 0.8]];
        assert_abs_diff_eq!(average_pairwise_euclidean_similarity(identical.view()), 1.0);

        let opposite = array![[1.0, 0.0], [-1.0, 0.0]];
        assert_abs_diff_eq!(average_pairwise_euclidean_similarity(opposite.view()), 0.0);
    }

    #[test]
    fn test_fewer_than_two_rows_is_nan() {
        let single = array![[1.0f32, 2.0, 3.0]];
        assert!(average_pairwise_euclidean_similarity(single.view()).is_nan());

        let empty = Array2::<f64>::zeros((0, 4));
        assert!(average_pairwise_euclidean_similarity(empty.view()).is_nan());
    }
}
