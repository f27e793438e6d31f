//! Removal of the dominant shared direction from sentence embeddings.
//!
//! Sentence vectors share a common component that carries no patient-specific
//! signal. The first principal direction of the uncentred matrix is estimated
//! by seeded power iteration on `XᵀX`, projected out of every row, and each
//! column is then rescaled by its maximum absolute value.

use ndarray::{Array1, Array2, Axis};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};

use crate::embedding::PatientEmbeddingMatrix;
use crate::types::DenoiseConfig;

/// Projects out the first principal direction and rescales columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddingDenoiser {
    config: DenoiseConfig,
}

impl EmbeddingDenoiser {
    /// Creates a denoiser.
    pub fn new(config: DenoiseConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &DenoiseConfig {
        &self.config
    }

    /// Unit-norm estimate of the first right singular vector of `matrix`.
    ///
    /// Deterministic for a given seed. Returns a zero vector when the matrix
    /// is all zeros or has no columns.
    pub fn first_principal_direction(&self, matrix: &Array2<f64>) -> Array1<f64> {
        let dimension = matrix.ncols();
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let mut direction: Array1<f64> = (0..dimension)
            .map(|_| -> f64 { StandardNormal.sample(&mut rng) })
            .collect();

        if !normalize(&mut direction) {
            return Array1::zeros(dimension);
        }

        for _ in 0..self.config.iterations {
            let projected = matrix.dot(&direction);
            let mut next = matrix.t().dot(&projected);
            if !normalize(&mut next) {
                return Array1::zeros(dimension);
            }
            direction = next;
        }
        direction
    }

    /// Replaces every row `v` with `v - (v·u)u`.
    pub fn remove_component(matrix: &mut Array2<f64>, direction: &Array1<f64>) {
        let coefficients = matrix.dot(direction);
        for (mut row, coefficient) in matrix.axis_iter_mut(Axis(0)).zip(coefficients.iter()) {
            row.scaled_add(-coefficient, direction);
        }
    }

    /// Divides each column by its maximum absolute value.
    ///
    /// All-zero columns are left unchanged.
    pub fn rescale_columns(matrix: &mut Array2<f64>) {
        for mut column in matrix.axis_iter_mut(Axis(1)) {
            let max = column.iter().fold(0.0f64, |m, v| m.max(v.abs()));
            if max > 0.0 {
                column.mapv_inplace(|v| v / max);
            }
        }
    }

    /// Denoises a patient embedding matrix in place.
    pub fn denoise(&self, embeddings: &mut PatientEmbeddingMatrix) {
        let matrix = embeddings.matrix_mut();
        if matrix.is_empty() {
            return;
        }
        let direction = self.first_principal_direction(matrix);
        Self::remove_component(matrix, &direction);
        Self::rescale_columns(matrix);
        tracing::info!(
            rows = matrix.nrows(),
            columns = matrix.ncols(),
            "Removed first principal component"
        );
    }
}

/// Scales to unit norm; returns false for a zero or non-finite norm.
fn normalize(vector: &mut Array1<f64>) -> bool {
    let norm = vector.dot(vector).sqrt();
    if norm > 0.0 && norm.is_finite() {
        *vector /= norm;
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn sample() -> Array2<f64> {
        array![
            [3.0, 0.2, 1.0],
            [4.0, -0.1, 0.5],
            [5.0, 0.0, -0.5],
            [-2.0, 0.3, 0.0]
        ]
    }

    #[test]
    fn test_direction_follows_dominant_axis() {
        let denoiser = EmbeddingDenoiser::default();
        let u = denoiser.first_principal_direction(&sample());
        assert_abs_diff_eq!(u.dot(&u), 1.0, epsilon = 1e-9);
        assert!(u[0].abs() > 0.95);
    }

    #[test]
    fn test_direction_is_deterministic() {
        let denoiser = EmbeddingDenoiser::new(DenoiseConfig { iterations: 10, seed: 7 });
        let a = denoiser.first_principal_direction(&sample());
        let b = denoiser.first_principal_direction(&sample());
        assert_eq!(a, b);
    }

    #[test]
    fn test_removal_is_idempotent() {
        let denoiser = EmbeddingDenoiser::default();
        let mut matrix = sample();
        let u = denoiser.first_principal_direction(&matrix);

        EmbeddingDenoiser::remove_component(&mut matrix, &u);
        for row in matrix.axis_iter(Axis(0)) {
            assert_abs_diff_eq!(row.dot(&u), 0.0, epsilon = 1e-9);
        }

        let once = matrix.clone();
        EmbeddingDenoiser::remove_component(&mut matrix, &u);
        for (a, b) in once.iter().zip(matrix.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_zero_column_left_unscaled() {
        let mut matrix = array![[2.0, 0.0], [-4.0, 0.0]];
        EmbeddingDenoiser::rescale_columns(&mut matrix);
        assert_eq!(matrix, array![[0.5, 0.0], [-1.0, 0.0]]);
    }

    #[test]
    fn test_all_zero_matrix_stays_zero() {
        let mut embeddings =
            PatientEmbeddingMatrix::new(Array2::zeros((2, 3)), vec!["a".into(), "b".into()])
                .unwrap();
        let denoiser = EmbeddingDenoiser::default();
        assert!(denoiser
            .first_principal_direction(embeddings.matrix())
            .iter()
            .all(|v| *v == 0.0));

        denoiser.denoise(&mut embeddings);
        assert!(embeddings.matrix().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_denoised_columns_bounded() {
        let mut embeddings = PatientEmbeddingMatrix::new(
            sample(),
            vec!["a".into(), "a".into(), "b".into(), "c".into()],
        )
        .unwrap();
        EmbeddingDenoiser::default().denoise(&mut embeddings);

        for column in embeddings.matrix().axis_iter(Axis(1)) {
            let max = column.iter().fold(0.0f64, |m, v| m.max(v.abs()));
            assert!(max <= 1.0 + 1e-12);
            assert!(column.iter().all(|v| v.is_finite()));
        }
    }
}
