//! Telemetry file-delivery link over on-off keying
//!
//! Demodulates a recorded I/Q envelope stream into a bitstring and
//! reassembles the CFDP-style payload carried in its TLV framing.

pub mod adapters;
pub mod bits;
pub mod calibration;
pub mod decoder;
pub mod envelope;
pub mod error;
pub mod payload;
pub mod runs;
pub mod tlv;

pub use decoder::demodulate;
pub use error::{LinkError, Result};
pub use payload::{strip_sync, Payload};
pub use tlv::{FieldValue, SinkConfig, Tag};

// Calibration ladder shared by the payload assembler and the timing
// calibrator. Even indices are carrier-on runs, odd indices carrier-off
// runs; each value is the number of identical bits the run encodes. The
// literal synchronization preamble is the bit expansion of this sequence.
pub const CALIBRATION_RUNS: [usize; 21] = [
    1, 1, 1, 1, 1, 2, 1, 3, 1, 4, 1, 5, 2, 10, 2, 20, 2, 50, 2, 100, 2,
];

/// Length of the all-ones synchronization postamble.
pub const POSTAMBLE_BITS: usize = 30;
