use crate::error::{LinkError, Result};
use crate::runs::expand_runs;
use crate::{CALIBRATION_RUNS, POSTAMBLE_BITS};
use num_complex::Complex64;

/// Number of leading runs consumed by calibration.
pub const PREAMBLE_RUN_COUNT: usize = CALIBRATION_RUNS.len();

/// Roots with an imaginary part below this are treated as real.
const IMAG_TOLERANCE: f64 = 1e-9;

/// Upper bound on credible bits-per-run when inverting the gap model.
const MAX_RUN_BITS: f64 = 200.0;

/// The literal synchronization preamble: the bit expansion of the
/// calibration ladder. The transmitter prepends exactly these bits and
/// the calibrator fits its timing models from their observed durations,
/// so both ends must derive the pattern from `CALIBRATION_RUNS`.
pub fn sync_preamble() -> Vec<bool> {
    expand_runs(&CALIBRATION_RUNS)
}

/// The literal synchronization postamble (a single all-ones run).
pub fn sync_postamble() -> Vec<bool> {
    vec![true; POSTAMBLE_BITS]
}

/// Timing models fitted once per recording from the calibration preamble.
///
/// Carrier-on durations grow linearly with the number of bits a run
/// encodes; carrier-off durations do not, and get a degree-2 polynomial
/// fitted by least squares through the nine ladder points.
#[derive(Debug, Clone)]
pub struct TimingModel {
    on_intercept: f64,
    on_slope: f64,
    // duration(value) = c0 + c1·value + c2·value², ascending order
    off_coeffs: [f64; 3],
}

impl TimingModel {
    /// Fit both models from the first `PREAMBLE_RUN_COUNT` runs.
    pub fn fit(runs: &[usize]) -> Result<Self> {
        if runs.len() < PREAMBLE_RUN_COUNT {
            return Err(LinkError::InsufficientPreamble(runs.len()));
        }

        // On model: average the six single-bit runs and the five two-bit
        // runs, then solve intercept + slope·v = d exactly for v = 1, 2.
        let d1 = [0, 2, 4, 6, 8, 10]
            .iter()
            .map(|&k: &usize| runs[k] as f64)
            .sum::<f64>()
            / 6.0;
        let d2 = [12, 14, 16, 18, 20]
            .iter()
            .map(|&k: &usize| runs[k] as f64)
            .sum::<f64>()
            / 5.0;
        let on_slope = d2 - d1;
        let on_intercept = d1 - on_slope;

        // Off model: the two single-bit gaps average into one point, the
        // remaining ladder gaps contribute one point each.
        let mut points = Vec::with_capacity(9);
        points.push((1.0, (runs[1] as f64 + runs[3] as f64) / 2.0));
        for (k, value) in [
            (5, 2.0),
            (7, 3.0),
            (9, 4.0),
            (11, 5.0),
            (13, 10.0),
            (15, 20.0),
            (17, 50.0),
            (19, 100.0),
        ] {
            points.push((value, runs[k] as f64));
        }
        let off_coeffs = polyfit2(&points);

        Ok(Self {
            on_intercept,
            on_slope,
            off_coeffs,
        })
    }

    /// Estimated bit count of a carrier-on run, before rounding.
    pub fn on_estimate(&self, duration: usize) -> f64 {
        (duration as f64 - self.on_intercept) / self.on_slope
    }

    /// Estimated bit count of a carrier-off run, by inverting the gap
    /// polynomial at the observed duration. `None` when no real root
    /// lies in (0, `MAX_RUN_BITS`) — gaps too short for the model.
    pub fn off_estimate(&self, duration: usize) -> Option<f64> {
        let [c0, c1, c2] = self.off_coeffs;
        quadratic_roots(c2, c1, c0 - duration as f64)
            .into_iter()
            .filter(|r| r.im.abs() < IMAG_TOLERANCE)
            .map(|r| r.re)
            .find(|&x| x > 0.0 && x < MAX_RUN_BITS)
    }
}

/// Least-squares fit of y = c0 + c1·x + c2·x² through the given (x, y)
/// points, via the normal equations of the Vandermonde system.
fn polyfit2(points: &[(f64, f64)]) -> [f64; 3] {
    let mut s = [0.0f64; 5]; // sums of x^0 .. x^4
    let mut t = [0.0f64; 3]; // sums of y·x^0 .. y·x^2
    for &(x, y) in points {
        let mut xp = 1.0;
        for k in 0..5 {
            s[k] += xp;
            if k < 3 {
                t[k] += y * xp;
            }
            xp *= x;
        }
    }
    solve3([
        [s[0], s[1], s[2], t[0]],
        [s[1], s[2], s[3], t[1]],
        [s[2], s[3], s[4], t[2]],
    ])
}

/// Gaussian elimination with partial pivoting on a 3×4 augmented system.
fn solve3(mut a: [[f64; 4]; 3]) -> [f64; 3] {
    for col in 0..3 {
        let mut max_row = col;
        for row in (col + 1)..3 {
            if a[row][col].abs() > a[max_row][col].abs() {
                max_row = row;
            }
        }
        a.swap(col, max_row);

        let pivot = a[col][col];
        if pivot.abs() < 1e-30 {
            continue;
        }
        for row in (col + 1)..3 {
            let factor = a[row][col] / pivot;
            for j in col..4 {
                a[row][j] -= factor * a[col][j];
            }
        }
    }

    let mut x = [0.0; 3];
    for i in (0..3).rev() {
        let mut sum = a[i][3];
        for j in (i + 1)..3 {
            sum -= a[i][j] * x[j];
        }
        if a[i][i].abs() > 1e-30 {
            x[i] = sum / a[i][i];
        }
    }
    x
}

/// Roots of a·x² + b·x + c, degenerating to the linear solution when the
/// leading coefficient vanishes.
fn quadratic_roots(a: f64, b: f64, c: f64) -> Vec<Complex64> {
    if a.abs() < 1e-30 {
        if b.abs() < 1e-30 {
            return Vec::new();
        }
        return vec![Complex64::new(-c / b, 0.0)];
    }
    let disc = Complex64::new(b * b - 4.0 * a * c, 0.0).sqrt();
    let nb = Complex64::new(-b, 0.0);
    vec![(nb + disc) / (2.0 * a), (nb - disc) / (2.0 * a)]
}

#[cfg(test)]
mod tests {
    use super::*;

    // Synthetic per-run timing: linear for carrier-on, quadratic for
    // carrier-off, integer sample counts throughout.
    fn on_duration(bits: usize) -> usize {
        20 + 30 * bits
    }

    fn off_duration(bits: usize) -> usize {
        30 + 24 * bits + 2 * bits * bits
    }

    fn preamble_durations() -> Vec<usize> {
        CALIBRATION_RUNS
            .iter()
            .enumerate()
            .map(|(k, &bits)| {
                if k % 2 == 0 {
                    on_duration(bits)
                } else {
                    off_duration(bits)
                }
            })
            .collect()
    }

    #[test]
    fn test_sync_preamble_matches_ladder() {
        let bits = sync_preamble();
        assert_eq!(bits.len(), CALIBRATION_RUNS.iter().sum::<usize>());
        assert!(bits[0]);
        // Spot-check the head: 1 0 1 0 1 00 1 000 ...
        let head: Vec<bool> = "101010010001000010000011"
            .chars()
            .map(|c| c == '1')
            .collect();
        assert_eq!(&bits[..head.len()], &head[..]);
    }

    #[test]
    fn test_sync_postamble_is_all_ones() {
        let bits = sync_postamble();
        assert_eq!(bits.len(), POSTAMBLE_BITS);
        assert!(bits.iter().all(|&b| b));
    }

    #[test]
    fn test_on_model_reproduces_calibration_values() {
        let model = TimingModel::fit(&preamble_durations()).unwrap();
        assert_eq!(model.on_estimate(on_duration(1)).round() as i64, 1);
        assert_eq!(model.on_estimate(on_duration(2)).round() as i64, 2);
        assert_eq!(model.on_estimate(on_duration(30)).round() as i64, 30);
    }

    #[test]
    fn test_off_model_reproduces_every_ladder_point() {
        let model = TimingModel::fit(&preamble_durations()).unwrap();
        for value in [1, 2, 3, 4, 5, 10, 20, 50, 100] {
            let estimate = model.off_estimate(off_duration(value)).unwrap();
            assert_eq!(estimate.round() as i64, value as i64, "ladder value {value}");
        }
    }

    #[test]
    fn test_near_zero_gap_has_no_valid_root() {
        // Shorter than any gap the model can produce: both quadratic
        // roots fall outside (0, MAX_RUN_BITS).
        let model = TimingModel::fit(&preamble_durations()).unwrap();
        assert!(model.off_estimate(0).is_none());
        assert!(model.off_estimate(5).is_none());
    }

    #[test]
    fn test_short_run_sequence_rejected() {
        let runs = preamble_durations();
        assert!(matches!(
            TimingModel::fit(&runs[..PREAMBLE_RUN_COUNT - 1]),
            Err(LinkError::InsufficientPreamble(_))
        ));
    }

    #[test]
    fn test_polyfit2_recovers_exact_quadratic() {
        let points: Vec<(f64, f64)> = (1..=9)
            .map(|k| {
                let x = k as f64;
                (x, 4.0 + 3.0 * x + 0.5 * x * x)
            })
            .collect();
        let [c0, c1, c2] = polyfit2(&points);
        assert!((c0 - 4.0).abs() < 1e-6);
        assert!((c1 - 3.0).abs() < 1e-6);
        assert!((c2 - 0.5).abs() < 1e-6);
    }
}
