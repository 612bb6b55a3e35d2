//! Position estimation algorithms

pub mod trilateration;
pub mod fingerprinting;

pub use trilateration::{RssiTrilateration, SolverOutcome};
pub use fingerprinting::{Fingerprint, FingerprintMatch, FingerprintingDatabase, RssiStatistics};
