// Public modules
pub mod board;
pub mod defaults;
pub mod error;
pub mod field;
pub mod paths;
pub mod sexpr;

// Internal modules - not part of public API
pub(crate) mod local_files;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
pub use field::{execute, RenameOutcome, RenameRequest};
