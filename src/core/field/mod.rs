//! Rename or copy a named field across every component on a board.
//!
//! The operation is host-agnostic: a board host implements the traits in
//! [`capability`] and the pass dispatches on what each component reports.

pub mod capability;
mod inventory;
mod rename;
mod request;

pub use capability::{Board, Component, FieldList, MutationError, MutationResult, PropertyStore};
pub use inventory::{inventory, FieldUsage};
pub use rename::{execute, ComponentReport, RenameOutcome, Strategy};
pub use request::{names_match, normalize_name, RenameRequest};
