use crate::calibration::TimingModel;
use crate::envelope::detect_carrier;
use crate::error::Result;
use crate::runs::{expand_runs, run_lengths};
use log::debug;

/// Map every run to the number of identical bits it encodes.
///
/// Even indices are carrier-on runs decoded through the linear model, odd
/// indices carrier-off runs decoded by inverting the gap polynomial. A
/// run always encodes at least one bit: estimates that round to zero or
/// below are clamped, and a gap too short for the polynomial to invert
/// also counts as one bit. Root-finding failures never escape this
/// function.
pub fn decode_runs(runs: &[usize], model: &TimingModel) -> Vec<usize> {
    runs.iter()
        .enumerate()
        .map(|(k, &duration)| {
            let estimate = if k % 2 == 0 {
                model.on_estimate(duration)
            } else {
                model.off_estimate(duration).unwrap_or(1.0)
            };
            (estimate.round() as i64).max(1) as usize
        })
        .collect()
}

/// Demodulate a complete I/Q recording into the transmitted bitstring.
///
/// The output includes the literal synchronization head and tail; use
/// `payload::strip_sync` to remove them before TLV decoding.
pub fn demodulate(i: &[f64], q: &[f64]) -> Result<Vec<bool>> {
    let levels = detect_carrier(i, q)?;
    let runs = run_lengths(&levels);
    debug!(
        "carrier trimmed to {} samples, {} runs",
        levels.len(),
        runs.len()
    );

    let model = TimingModel::fit(&runs)?;
    let decoded = decode_runs(&runs, &model);
    let bits = expand_runs(&decoded);
    debug!("recovered {} bits", bits.len());
    Ok(bits)
}
