//! Parallel size conversion

use super::units::{parse_size, UnitBase, UnitScale};
use tokio::task::JoinSet;
use tracing::{debug, error};

/// A record carrying a human-readable size to normalize
pub trait SizedRecord: Send + Sync {
    /// The raw size text, e.g. `"512 MB"`
    fn size_text(&self) -> &str;

    /// Store the canonical byte count
    fn set_size_bytes(&mut self, bytes: f64);

    /// Name used to identify the record in logs
    fn label(&self) -> String;
}

/// Outcome counts for one conversion batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionSummary {
    /// Records that received a byte count
    pub converted: usize,
    /// Records left unset
    pub failed: usize,
}

/// Normalizes record sizes under a fixed unit scale
#[derive(Debug, Clone, Copy, Default)]
pub struct UnitConverter {
    scale: UnitScale,
}

impl UnitConverter {
    /// Create a converter for `base`
    pub fn new(base: UnitBase) -> Self {
        Self {
            scale: UnitScale::new(base),
        }
    }

    /// The scale in use
    pub fn scale(&self) -> UnitScale {
        self.scale
    }

    /// Convert every record, one task each, returning once all have finished.
    ///
    /// A record that fails to parse is logged and left untouched; the rest
    /// of the batch still completes.
    pub async fn convert<R: SizedRecord>(&self, records: &mut [R]) -> ConversionSummary {
        let mut tasks = JoinSet::new();
        for (index, record) in records.iter().enumerate() {
            let text = record.size_text().to_owned();
            let scale = self.scale;
            tasks.spawn(async move { (index, parse_size(&text, &scale)) });
        }

        let mut summary = ConversionSummary::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Ok(bytes))) => {
                    let record = &mut records[index];
                    debug!(record = %record.label(), size = record.size_text(), bytes, "Converted size");
                    record.set_size_bytes(bytes);
                    summary.converted += 1;
                }
                Ok((index, Err(e))) => {
                    error!(record = %records[index].label(), error = %e, "Failed to convert size");
                    summary.failed += 1;
                }
                Err(e) => {
                    error!(error = %e, "Size conversion task did not complete");
                    summary.failed += 1;
                }
            }
        }
        summary
    }
}
