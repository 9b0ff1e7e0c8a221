//! Savitzky-Golay smoothing.

use crate::{InvalidArgument, TerrainError};
use dashmap::DashMap;
use log::debug;
use nalgebra::DMatrix;
use std::sync::Arc;

/// Savitzky-Golay filter with a shared coefficient cache.
///
/// Coefficients only depend on `(window, order)`, so they are
/// computed once per pair and reused across every series.
#[derive(Debug, Default)]
pub struct SavitzkyGolay {
    coefficients: DashMap<(usize, usize), Arc<[f64]>>,
}

impl SavitzkyGolay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the smoothing (zeroth derivative) convolution
    /// coefficients for an odd `window` and polynomial `order`.
    pub fn coefficients(&self, window: usize, order: usize) -> Result<Arc<[f64]>, TerrainError> {
        if window % 2 == 0 {
            return Err(InvalidArgument::EvenWindow(window).into());
        }
        if order >= window {
            return Err(InvalidArgument::OrderTooHigh { window, order }.into());
        }
        self.coefficients
            .entry((window, order))
            .or_try_insert_with(|| least_squares_row(window, order))
            .map(|r| Arc::clone(&r))
    }

    /// Returns `data` smoothed with a `window` wide, `order` degree
    /// local polynomial fit.
    ///
    /// Samples beyond either end of `data` repeat the edge value.
    pub fn smooth(&self, data: &[f64], window: usize, order: usize) -> Result<Vec<f64>, TerrainError> {
        let coefficients = self.coefficients(window, order)?;
        if data.is_empty() {
            return Ok(Vec::new());
        }
        let half = window / 2;
        let last = data.len() - 1;
        Ok((0..data.len())
            .map(|i| {
                coefficients
                    .iter()
                    .enumerate()
                    .map(|(j, c)| {
                        let idx = (i + j).saturating_sub(half).min(last);
                        c * data[idx]
                    })
                    .sum()
            })
            .collect())
    }
}

/// First row of `(VᵀV)⁻¹Vᵀ` for the window's Vandermonde matrix `V`.
fn least_squares_row(window: usize, order: usize) -> Result<Arc<[f64]>, TerrainError> {
    let now = std::time::Instant::now();
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
    let vandermonde = DMatrix::<f64>::from_fn(window, order + 1, |r, c| {
        (r as f64 - (window / 2) as f64).powi(c as i32)
    });
    let vt = vandermonde.transpose();
    let normal = &vt * &vandermonde;
    let inverse = normal
        .try_inverse()
        .ok_or(TerrainError::Singular { window, order })?;
    let projection = inverse * vt;
    let row: Vec<f64> = projection.row(0).iter().copied().collect();
    debug!(
        "savgol coefficients; window: {}, order: {}, exec: {:?}",
        window,
        order,
        now.elapsed()
    );
    Ok(row.into())
}
