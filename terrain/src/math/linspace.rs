use num_traits::{AsPrimitive, Float};

/// Returns `n` evenly spaced values over `[y_start, y_end]`.
///
/// The last value is exactly `y_end`. `n == 1` yields only
/// `y_start`, `n == 0` yields nothing.
pub fn linspace<T>(y_start: T, y_end: T, n: usize) -> impl Iterator<Item = T>
where
    T: Float + 'static,
    usize: AsPrimitive<T>,
{
    let last = n.saturating_sub(1);
    let dy = if last == 0 {
        T::zero()
    } else {
        (y_end - y_start) / last.as_()
    };
    (0..n).map(move |x| {
        if x == last && last > 0 {
            y_end
        } else {
            y_start + x.as_() * dy
        }
    })
}

#[cfg(test)]
mod tests {
    use super::linspace;
    use approx::assert_relative_eq;

    #[test]
    fn test_linspace() {
        let values: Vec<f64> = linspace(0.0, 1.0, 5).collect();
        assert_eq!(values, vec![0.0, 0.25, 0.5, 0.75, 1.0]);

        let values: Vec<f64> = linspace(0.0, 1234.567, 400).collect();
        assert_eq!(values.len(), 400);
        assert_eq!(values[0], 0.0);
        assert_eq!(values[399], 1234.567);
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
        assert_relative_eq!(values[1] - values[0], 1234.567 / 399.0, epsilon = 1e-9);
    }

    #[test]
    fn test_linspace_degenerate() {
        assert_eq!(linspace(3.0_f32, 7.0, 1).collect::<Vec<_>>(), vec![3.0]);
        assert_eq!(linspace(3.0_f32, 7.0, 0).count(), 0);
    }
}
