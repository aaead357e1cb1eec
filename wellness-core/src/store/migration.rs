//! Schema version gate, run once when a store opens.
//!
//! There is no automatic upgrade path. A document written with any other
//! schema version is refused and the store does not open.

use crate::error::MigrationError;
use serde::Deserialize;
use tracing::{error, info};

/// Schema version written by this build.
pub const SCHEMA_VERSION: u32 = 1;

/// Outcome of a successful check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaStatus {
    /// No document yet; the version is stamped on first write.
    Fresh,
    /// Document matches this build.
    Current,
}

/// Compares the persisted schema version against the expected one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationGuard {
    expected: u32,
}

impl MigrationGuard {
    pub fn new() -> Self {
        Self {
            expected: SCHEMA_VERSION,
        }
    }

    pub fn expecting(expected: u32) -> Self {
        Self { expected }
    }

    pub fn expected(&self) -> u32 {
        self.expected
    }

    /// Read only the version header of `document`.
    pub fn peek_version(document: &[u8]) -> Result<u32, MigrationError> {
        // Parse just enough to get the version
        #[derive(Deserialize)]
        struct Partial {
            schema_version: u32,
        }

        let partial: Partial = serde_json::from_slice(document).map_err(MigrationError::Unreadable)?;
        Ok(partial.schema_version)
    }

    pub fn check(&self, document: Option<&[u8]>) -> Result<SchemaStatus, MigrationError> {
        let Some(document) = document else {
            info!(version = self.expected, "no stored document, starting fresh schema");
            return Ok(SchemaStatus::Fresh);
        };

        let found = Self::peek_version(document)?;
        if found != self.expected {
            error!(expected = self.expected, found, "refusing to open store with incompatible schema");
            return Err(MigrationError::Incompatible {
                expected: self.expected,
                found,
            });
        }
        Ok(SchemaStatus::Current)
    }
}

impl Default for MigrationGuard {
    fn default() -> Self {
        Self::new()
    }
}
