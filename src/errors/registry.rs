//! Errors for processor registration and instantiation.

use thiserror::Error;

/// Errors raised by the processor registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A factory is already bound to this name
    #[error("Processor '{name}' is already registered")]
    Duplicate { name: String },

    /// No factory is bound to this name
    #[error("Unknown processor '{name}'")]
    Unknown { name: String },
}
