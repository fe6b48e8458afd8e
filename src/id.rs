//! Entry ID Generation
//!
//! Identifiers are 128-bit random values rendered as 32 lowercase hex
//! characters. Generation never consults the store, so it is safe to call
//! outside of any transaction.

use uuid::Uuid;

/// Source of identifiers for new entries
pub trait IdGenerator: Send + Sync {
    /// Produce a fresh identifier
    fn next_id(&self) -> String;
}

/// Random (v4 UUID) identifier generator
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> String {
        generate_id()
    }
}

/// Generate a new unique identifier
pub fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}
