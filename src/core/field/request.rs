use serde::Serialize;

use crate::error::{Error, Result};
use crate::utils::validation;

/// Trim and case-fold a field name for comparison.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Case-fold equality: `" Part Number "` matches `"PART NUMBER"`.
pub fn names_match(a: &str, b: &str) -> bool {
    normalize_name(a) == normalize_name(b)
}

/// A validated rename/copy request.
///
/// Names are stored trimmed; `new_name` is written exactly as given (after
/// trimming), while `old_name` is only ever used for case-fold matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameRequest {
    old_name: String,
    new_name: String,
    copy_instead: bool,
}

impl RenameRequest {
    pub fn new(old_name: &str, new_name: &str, copy_instead: bool) -> Result<Self> {
        let old_name = validation::require_non_empty(old_name, "from", "Please fill both field names")?;
        let new_name = validation::require_non_empty(new_name, "to", "Please fill both field names")?;

        if names_match(old_name, new_name) {
            return Err(Error::validation_invalid_argument(
                "to",
                "Old and new field names are identical",
                Some(new_name.to_string()),
                None,
            ));
        }

        Ok(Self {
            old_name: old_name.to_string(),
            new_name: new_name.to_string(),
            copy_instead,
        })
    }

    pub fn old_name(&self) -> &str {
        &self.old_name
    }

    pub fn new_name(&self) -> &str {
        &self.new_name
    }

    pub fn copy_instead(&self) -> bool {
        self.copy_instead
    }

    pub(crate) fn matches(&self, candidate: &str) -> bool {
        names_match(candidate, &self.old_name)
    }
}
