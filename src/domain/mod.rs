//! Domain layer for Userscript Guard
//!
//! CDD Principle: Domain Model - Pure business logic for anchor validation
//! - Contains violations, skipped rules and the validation report aggregate
//! - Independent of file systems, terminals and configuration formats

pub mod violations;

// Re-export main domain types for convenience
pub use violations::*;
