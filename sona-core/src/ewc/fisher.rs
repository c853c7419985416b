//! Diagonal Fisher information matrix.

use crate::error::{Error, Result};

/// Diagonal Fisher information estimate over embedding dimensions.
///
/// One instance exists per pattern store. The diagonal approximation keeps
/// importance-weighted similarity O(D) instead of O(D²), which is all the
/// memory-preservation use case needs.
///
/// Invariant: after every `update` and `decay`,
/// `importance[i] == running_sum[i] / max(1, update_count)`.
#[derive(Debug, Clone, PartialEq)]
pub struct FisherMatrix {
    dimension: usize,
    importance: Vec<f32>,
    running_sum: Vec<f32>,
    update_count: u32,
}

impl FisherMatrix {
    /// Create a zeroed matrix for `dimension` embedding dimensions.
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            importance: vec![0.0; dimension],
            running_sum: vec![0.0; dimension],
            update_count: 0,
        }
    }

    /// Accumulate one squared gradient into the running sums.
    pub fn update(&mut self, gradient: &[f32]) -> Result<()> {
        if gradient.len() != self.dimension {
            return Err(Error::InvalidInput(format!(
                "gradient dimension {} does not match matrix dimension {}",
                gradient.len(),
                self.dimension
            )));
        }

        for (sum, g) in self.running_sum.iter_mut().zip(gradient) {
            *sum += g * g;
        }
        self.update_count = self.update_count.saturating_add(1);
        self.refresh_importance();
        Ok(())
    }

    /// Decay the running sums by `factor` in (0, 1].
    pub fn decay(&mut self, factor: f32) -> Result<()> {
        if factor <= 0.0 || factor > 1.0 {
            return Err(Error::InvalidInput(format!(
                "decay factor must be in (0, 1], got {factor}"
            )));
        }

        for sum in &mut self.running_sum {
            *sum *= factor;
        }
        self.refresh_importance();
        Ok(())
    }

    fn refresh_importance(&mut self) {
        let denominator = self.update_count.max(1) as f32;
        for (imp, sum) in self.importance.iter_mut().zip(&self.running_sum) {
            *imp = sum / denominator;
        }
    }

    /// Read-only snapshot of the per-dimension importance.
    #[must_use]
    pub fn importance_vector(&self) -> &[f32] {
        &self.importance
    }

    /// Number of `update` calls accumulated so far.
    #[must_use]
    pub fn update_count(&self) -> u32 {
        self.update_count
    }

    /// Matrix dimension.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Reset to the zeroed state.
    pub fn reset(&mut self) {
        self.importance.iter_mut().for_each(|v| *v = 0.0);
        self.running_sum.iter_mut().for_each(|v| *v = 0.0);
        self.update_count = 0;
    }

    /// Expected serialized size for a given dimension.
    #[must_use]
    pub fn serialized_len(dimension: usize) -> usize {
        4 + 8 * dimension
    }

    /// Serialize as: 4-byte LE update count, D LE f32 importance values,
    /// D LE f32 running sums.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::serialized_len(self.dimension));
        bytes.extend_from_slice(&self.update_count.to_le_bytes());
        for value in &self.importance {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        for value in &self.running_sum {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes
    }

    /// Replace this matrix with the deserialized `bytes`.
    ///
    /// A buffer whose length is not exactly `4 + 8·D` is rejected with
    /// [`Error::CorruptMatrix`]; the matrix is left reset in that case so
    /// the caller can continue with a clean estimate.
    pub fn load(&mut self, bytes: &[u8]) -> Result<()> {
        let expected = Self::serialized_len(self.dimension);
        if bytes.len() != expected {
            self.reset();
            return Err(Error::CorruptMatrix {
                expected,
                actual: bytes.len(),
            });
        }

        let mut count_buf = [0u8; 4];
        count_buf.copy_from_slice(&bytes[0..4]);
        self.update_count = u32::from_le_bytes(count_buf);

        let read_f32 = |offset: usize| {
            let mut buf = [0u8; 4];
            buf.copy_from_slice(&bytes[offset..offset + 4]);
            f32::from_le_bytes(buf)
        };

        for i in 0..self.dimension {
            self.importance[i] = read_f32(4 + i * 4);
        }
        let sums_base = 4 + self.dimension * 4;
        for i in 0..self.dimension {
            self.running_sum[i] = read_f32(sums_base + i * 4);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_update_accumulates_squared_gradient() {
        let mut matrix = FisherMatrix::new(3);
        matrix.update(&[1.0, -2.0, 0.5]).unwrap();

        assert_eq!(matrix.update_count(), 1);
        let importance = matrix.importance_vector();
        assert!((importance[0] - 1.0).abs() < 1e-6);
        assert!((importance[1] - 4.0).abs() < 1e-6);
        assert!((importance[2] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_importance_is_running_mean() {
        let mut matrix = FisherMatrix::new(1);
        matrix.update(&[2.0]).unwrap();
        matrix.update(&[0.0]).unwrap();

        // (4 + 0) / 2
        assert!((matrix.importance_vector()[0] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_decay_scales_sums_not_count() {
        let mut matrix = FisherMatrix::new(2);
        matrix.update(&[2.0, 2.0]).unwrap();
        matrix.decay(0.5).unwrap();

        assert_eq!(matrix.update_count(), 1);
        assert!((matrix.importance_vector()[0] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_decay_rejects_out_of_range() {
        let mut matrix = FisherMatrix::new(2);
        assert!(matrix.decay(0.0).is_err());
        assert!(matrix.decay(1.5).is_err());
        assert!(matrix.decay(1.0).is_ok());
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let mut matrix = FisherMatrix::new(4);
        assert!(matrix.update(&[1.0, 2.0]).is_err());
        assert_eq!(matrix.update_count(), 0);
    }

    #[test]
    fn test_serialized_layout() {
        let matrix = FisherMatrix::new(384);
        assert_eq!(matrix.serialize().len(), 4 + 8 * 384);
    }

    #[test]
    fn test_load_wrong_length_resets() {
        let mut matrix = FisherMatrix::new(2);
        matrix.update(&[1.0, 1.0]).unwrap();

        let err = matrix.load(&[0u8; 7]).unwrap_err();
        assert!(matches!(
            err,
            Error::CorruptMatrix {
                expected: 20,
                actual: 7
            }
        ));
        assert_eq!(matrix.update_count(), 0);
        assert!(matrix.importance_vector().iter().all(|v| *v == 0.0));
    }

    proptest! {
        #[test]
        fn prop_serialize_round_trip(
            gradients in prop::collection::vec(
                prop::collection::vec(-10.0f32..10.0, 8),
                0..12,
            )
        ) {
            let mut matrix = FisherMatrix::new(8);
            for gradient in &gradients {
                matrix.update(gradient).unwrap();
            }

            let bytes = matrix.serialize();
            let mut restored = FisherMatrix::new(8);
            restored.load(&bytes).unwrap();
            prop_assert_eq!(&matrix, &restored);
        }

        #[test]
        fn prop_wrong_length_fails_cleanly(len in 0usize..200) {
            prop_assume!(len != FisherMatrix::serialized_len(8));
            let mut matrix = FisherMatrix::new(8);
            let buffer = vec![0u8; len];
            prop_assert!(matrix.load(&buffer).is_err());
            prop_assert_eq!(matrix.update_count(), 0);
        }
    }
}
