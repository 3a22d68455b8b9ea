//! Size normalization module
//!
//! Turns human-readable sizes such as `"1.5 GB"` into a canonical byte
//! count, one concurrent task per record.

mod converter;
mod units;

pub use converter::{ConversionSummary, SizedRecord, UnitConverter};
pub use units::{parse_size, ByteUnit, UnitBase, UnitScale};

#[cfg(test)]
mod tests;
