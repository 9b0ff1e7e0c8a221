//! Shape preserving piecewise cubic Hermite interpolation.

use crate::{InvalidArgument, TerrainError};

/// Monotone cubic interpolant over strictly increasing nodes.
///
/// Tangents follow Fritsch-Butland: zero at local extrema (or where
/// either neighbouring secant is flat), otherwise a weighted harmonic
/// mean of the neighbouring secants. This never overshoots the data.
#[derive(Debug, Clone)]
pub struct Pchip {
    xs: Vec<f64>,
    ys: Vec<f64>,
    tangents: Vec<f64>,
}

impl Pchip {
    pub fn new(xs: Vec<f64>, ys: Vec<f64>) -> Result<Self, TerrainError> {
        if xs.len() != ys.len() {
            return Err(InvalidArgument::Interpolation("mismatched node lengths").into());
        }
        if xs.len() < 2 {
            return Err(InvalidArgument::Interpolation("at least two nodes are required").into());
        }
        if xs.iter().chain(&ys).any(|v| !v.is_finite()) {
            return Err(InvalidArgument::Interpolation("non-finite node").into());
        }
        if xs.windows(2).any(|w| w[1] <= w[0]) {
            return Err(InvalidArgument::Interpolation("nodes are not strictly increasing").into());
        }

        let secants: Vec<f64> = xs
            .windows(2)
            .zip(ys.windows(2))
            .map(|(x, y)| (y[1] - y[0]) / (x[1] - x[0]))
            .collect();

        let n = xs.len();
        let mut tangents = vec![0.0; n];
        tangents[0] = secants[0];
        tangents[n - 1] = secants[n - 2];
        for i in 1..n - 1 {
            let (d_lo, d_hi) = (secants[i - 1], secants[i]);
            if d_lo * d_hi <= 0.0 {
                continue;
            }
            let (h_lo, h_hi) = (xs[i] - xs[i - 1], xs[i + 1] - xs[i]);
            let w1 = 2.0 * h_hi + h_lo;
            let w2 = h_hi + 2.0 * h_lo;
            tangents[i] = (w1 + w2) / (w1 / d_lo + w2 / d_hi);
        }

        Ok(Self { xs, ys, tangents })
    }

    /// Evaluates the interpolant at `x`.
    ///
    /// Queries outside the node range are evaluated on the nearest
    /// end segment.
    pub fn interpolate(&self, x: f64) -> f64 {
        let n = self.xs.len();
        let seg = self.xs.partition_point(|&node| node <= x).clamp(1, n - 1) - 1;

        let (x0, x1) = (self.xs[seg], self.xs[seg + 1]);
        let (y0, y1) = (self.ys[seg], self.ys[seg + 1]);
        let (m0, m1) = (self.tangents[seg], self.tangents[seg + 1]);

        let h = x1 - x0;
        let t = (x - x0) / h;
        let t2 = t * t;
        let t3 = t2 * t;

        let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
        let h10 = t3 - 2.0 * t2 + t;
        let h01 = -2.0 * t3 + 3.0 * t2;
        let h11 = t3 - t2;

        h00 * y0 + h10 * h * m0 + h01 * y1 + h11 * h * m1
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }
}
