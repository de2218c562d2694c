//! The rename/copy pass over every component of a board.
//!
//! Per component, in board order:
//! 1. Property mapping: first key matching the old name (case-fold) is written
//!    under the new name; the old key is cleared unless copying. A property
//!    match skips the field list.
//! 2. Field list: first field matching the old name. Copying prefers a new
//!    property entry, then a duplicated field. Renaming prefers an in-place
//!    rename, then a new property entry (the old field stays).
//!
//! Every matched component counts once as found and once as modified, whatever
//! strategy ended up applying.

use serde::Serialize;

use super::capability::{Board, Component, MutationError, MutationResult};
use super::request::RenameRequest;

/// What happened to one matched component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Property written under the new name and the old key cleared.
    PropertyMoved,
    /// Property written under the new name, old key still present.
    PropertyCopied,
    FieldRenamed,
    FieldCopiedToProperty,
    FieldDuplicated,
    /// Rename in place unavailable: new property written, old field kept.
    FieldFallbackProperty,
    /// No strategy could be applied.
    Unchanged,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentReport {
    /// Position in board order.
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// The stored spelling of the matched key or field name.
    pub matched_name: String,
    pub strategy: Strategy,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameOutcome {
    pub modified_count: usize,
    pub found_count: usize,
    pub components: Vec<ComponentReport>,
}

impl RenameOutcome {
    pub fn failure_count(&self) -> usize {
        self.components.iter().map(|c| c.failures.len()).sum()
    }

    /// Components matched but left exactly as they were.
    pub fn unchanged_count(&self) -> usize {
        self.components
            .iter()
            .filter(|c| c.strategy == Strategy::Unchanged)
            .count()
    }

    /// One-line result notification for the user.
    pub fn summary(&self, request: &RenameRequest) -> String {
        let verb = if request.copy_instead() {
            "Copied"
        } else {
            "Renamed"
        };
        format!(
            "{} {} occurrence(s) of '{}' → '{}'. Modified footprints: {}.",
            verb,
            self.found_count,
            request.old_name(),
            request.new_name(),
            self.modified_count
        )
    }
}

/// Run the pass over `board`, then signal `refresh` once.
pub fn execute<B: Board + ?Sized>(board: &mut B, request: &RenameRequest) -> RenameOutcome {
    let mut outcome = RenameOutcome::default();

    {
        let mut components = board.components();
        for (index, component) in components.iter_mut().enumerate() {
            let Some(report) = process_component(index, component.as_mut(), request) else {
                continue;
            };

            for failure in &report.failures {
                crate::log_status!(
                    "rename",
                    "{}: {}",
                    report.reference.as_deref().unwrap_or("<unnamed>"),
                    failure
                );
            }

            outcome.found_count += 1;
            outcome.modified_count += 1;
            outcome.components.push(report);
        }
    }

    board.refresh();
    outcome
}

fn process_component(
    index: usize,
    component: &mut dyn Component,
    request: &RenameRequest,
) -> Option<ComponentReport> {
    let reference = component.reference();
    let mut failures = Vec::new();

    if let Some(store) = component.properties() {
        let matched = store
            .entries()
            .into_iter()
            .find(|(key, _)| request.matches(key));

        if let Some((key, value)) = matched {
            let strategy = if !attempt(store.set(request.new_name(), &value), &mut failures) {
                Strategy::Unchanged
            } else if request.copy_instead() || !attempt(store.clear(&key), &mut failures) {
                Strategy::PropertyCopied
            } else {
                Strategy::PropertyMoved
            };

            return Some(ComponentReport {
                index,
                reference,
                matched_name: key,
                strategy,
                failures,
            });
        }
    }

    let (position, matched_name, text) = {
        let fields = component.fields()?;
        let (position, name) = (0..fields.len()).find_map(|i| {
            let name = fields.name(i)?;
            request.matches(&name).then_some((i, name))
        })?;
        let text = fields.text(position).unwrap_or_default();
        (position, name, text)
    };

    let strategy = if request.copy_instead() {
        copy_field(component, position, &text, request, &mut failures)
    } else {
        rename_field(component, position, &text, request, &mut failures)
    };

    Some(ComponentReport {
        index,
        reference,
        matched_name,
        strategy,
        failures,
    })
}

fn copy_field(
    component: &mut dyn Component,
    position: usize,
    text: &str,
    request: &RenameRequest,
    failures: &mut Vec<String>,
) -> Strategy {
    if let Some(store) = component.properties() {
        if attempt(store.set(request.new_name(), text), failures) {
            return Strategy::FieldCopiedToProperty;
        }
    }

    if let Some(fields) = component.fields() {
        if attempt(fields.duplicate_as(position, request.new_name()), failures) {
            return Strategy::FieldDuplicated;
        }
    }

    Strategy::Unchanged
}

fn rename_field(
    component: &mut dyn Component,
    position: usize,
    text: &str,
    request: &RenameRequest,
    failures: &mut Vec<String>,
) -> Strategy {
    if let Some(fields) = component.fields() {
        if attempt(fields.rename(position, request.new_name()), failures) {
            return Strategy::FieldRenamed;
        }
    }

    if let Some(store) = component.properties() {
        if attempt(store.set(request.new_name(), text), failures) {
            return Strategy::FieldFallbackProperty;
        }
    }

    Strategy::Unchanged
}

/// `true` on success. Unsupported is silent; failures are recorded and the
/// caller moves on to its next strategy.
fn attempt(result: MutationResult, failures: &mut Vec<String>) -> bool {
    match result {
        Ok(()) => true,
        Err(MutationError::Unsupported) => false,
        Err(MutationError::Failed(message)) => {
            failures.push(message);
            false
        }
    }
}
