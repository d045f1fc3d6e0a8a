use crate::error::{LinkError, Result};

/// Threshold an I/Q recording into per-sample carrier levels.
///
/// The envelope magnitude is compared against its mean over the whole
/// buffer, and the resulting 0/1 sequence is trimmed so that index 0 is
/// the first sample after the first rising edge (guaranteed on). Fails
/// with `NoCarrierDetected` when the recording never transitions off→on.
pub fn detect_carrier(i: &[f64], q: &[f64]) -> Result<Vec<u8>> {
    let n = i.len().min(q.len());
    if n == 0 {
        return Err(LinkError::NoCarrierDetected);
    }

    let magnitude: Vec<f64> = (0..n).map(|k| (i[k] * i[k] + q[k] * q[k]).sqrt()).collect();
    let threshold = magnitude.iter().sum::<f64>() / n as f64;
    let levels: Vec<u8> = magnitude.iter().map(|&m| u8::from(m > threshold)).collect();

    let start = levels
        .windows(2)
        .position(|w| w[0] == 0 && w[1] == 1)
        .ok_or(LinkError::NoCarrierDetected)?
        + 1;

    Ok(levels[start..].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iq(amplitudes: &[f64]) -> (Vec<f64>, Vec<f64>) {
        (amplitudes.to_vec(), vec![0.0; amplitudes.len()])
    }

    #[test]
    fn test_trims_to_first_rising_edge() {
        let (i, q) = iq(&[0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0]);
        let levels = detect_carrier(&i, &q).unwrap();
        assert_eq!(levels, vec![1, 1, 0, 1]);
    }

    #[test]
    fn test_threshold_is_global_mean() {
        // Mean magnitude is 0.5; only the 0.9 samples sit above it.
        let (i, q) = iq(&[0.1, 0.9, 0.1, 0.9]);
        let levels = detect_carrier(&i, &q).unwrap();
        assert_eq!(levels, vec![1, 0, 1]);
    }

    #[test]
    fn test_silence_has_no_carrier() {
        let (i, q) = iq(&[0.0; 64]);
        assert!(matches!(
            detect_carrier(&i, &q),
            Err(LinkError::NoCarrierDetected)
        ));
    }

    #[test]
    fn test_constant_carrier_has_no_rising_edge() {
        // A flat envelope never crosses its own mean, so no edge exists.
        let (i, q) = iq(&[1.0; 64]);
        assert!(matches!(
            detect_carrier(&i, &q),
            Err(LinkError::NoCarrierDetected)
        ));
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(
            detect_carrier(&[], &[]),
            Err(LinkError::NoCarrierDetected)
        ));
    }
}
