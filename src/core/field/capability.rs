//! Capability traits a board host implements.
//!
//! A component exposes its metadata through a property mapping, a named field
//! list, both, or neither. Absence is reported through `Option` rather than by
//! probing, and optional operations return `MutationError::Unsupported` when a
//! host cannot perform them.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationError {
    /// The host cannot perform this operation; try the next strategy.
    Unsupported,
    /// The host supports the operation but it failed.
    Failed(String),
}

impl fmt::Display for MutationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationError::Unsupported => write!(f, "operation not supported by this board"),
            MutationError::Failed(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for MutationError {}

pub type MutationResult = std::result::Result<(), MutationError>;

/// Key/value metadata. Keys are unique as stored (case-sensitive).
pub trait PropertyStore {
    /// All entries in stored order.
    fn entries(&self) -> Vec<(String, String)>;

    /// Create or overwrite `key`.
    fn set(&mut self, key: &str, value: &str) -> MutationResult;

    fn clear(&mut self, key: &str) -> MutationResult;
}

/// Ordered named text fields.
pub trait FieldList {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn name(&self, index: usize) -> Option<String>;

    fn text(&self, index: usize) -> Option<String>;

    fn rename(&mut self, index: usize, new_name: &str) -> MutationResult;

    /// Insert a copy of field `index` named `new_name`.
    fn duplicate_as(&mut self, _index: usize, _new_name: &str) -> MutationResult {
        Err(MutationError::Unsupported)
    }
}

/// One placed part on a board.
pub trait Component {
    /// Reference designator, used only for reporting.
    fn reference(&self) -> Option<String> {
        None
    }

    fn properties(&mut self) -> Option<&mut dyn PropertyStore>;

    fn fields(&mut self) -> Option<&mut dyn FieldList>;
}

impl<C: Component + ?Sized> Component for &mut C {
    fn reference(&self) -> Option<String> {
        (**self).reference()
    }

    fn properties(&mut self) -> Option<&mut dyn PropertyStore> {
        (**self).properties()
    }

    fn fields(&mut self) -> Option<&mut dyn FieldList> {
        (**self).fields()
    }
}

/// The host-owned collection the operation walks.
pub trait Board {
    /// Every component in board order.
    fn components(&mut self) -> Vec<Box<dyn Component + '_>>;

    /// Tell the host its cached view of the board is stale.
    fn refresh(&mut self) {}
}
