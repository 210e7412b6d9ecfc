//! Error taxonomy
//!
//! Only structural failures and loading problems are errors. Unknown catalog
//! keys are recovered by the simulation (skip + log), and invalid state
//! transitions are no-ops guarded by query functions.

use thiserror::Error;

/// Errors surfaced by the simulation core
#[derive(Debug, Error)]
pub enum SimError {
    /// A stat catalog lookup named an identifier that does not exist
    #[error("unknown {kind} id `{key}` in stat catalog")]
    UnknownCatalogKey { kind: &'static str, key: String },

    /// The floor generator could not build a connected floor within its retry cap
    #[error("floor {floor} could not be generated after {attempts} attempts")]
    FloorGeneration { floor: u32, attempts: u32 },

    /// Catalog data failed to parse
    #[error("invalid catalog data: {0}")]
    Catalog(#[source] serde_json::Error),

    /// Settings data failed to parse
    #[error("invalid settings: {0}")]
    Settings(#[source] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;

impl SimError {
    /// Configuration errors are recoverable locally; everything else is fatal
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SimError::UnknownCatalogKey { .. })
    }
}
