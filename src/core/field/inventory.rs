use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

use super::capability::Board;
use super::request::normalize_name;

/// One distinct field name (case-fold) and where it occurs on a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldUsage {
    /// First spelling seen in board order.
    pub name: String,
    /// Components carrying the name in either representation.
    pub components: usize,
    pub in_properties: usize,
    pub in_fields: usize,
    /// Other spellings that fold to the same name.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<String>,
}

/// List every field/property name on the board, in first-seen order.
pub fn inventory<B: Board + ?Sized>(board: &mut B) -> Vec<FieldUsage> {
    let mut usages: Vec<FieldUsage> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for mut component in board.components() {
        let mut seen_here: BTreeSet<usize> = BTreeSet::new();
        let mut names: Vec<(String, bool)> = Vec::new();

        if let Some(store) = component.properties() {
            names.extend(store.entries().into_iter().map(|(key, _)| (key, true)));
        }
        if let Some(fields) = component.fields() {
            names.extend((0..fields.len()).filter_map(|i| fields.name(i)).map(|n| (n, false)));
        }

        for (name, is_property) in names {
            let key = normalize_name(&name);
            if key.is_empty() {
                continue;
            }

            let slot = *index.entry(key).or_insert_with(|| {
                usages.push(FieldUsage {
                    name: name.clone(),
                    components: 0,
                    in_properties: 0,
                    in_fields: 0,
                    variants: Vec::new(),
                });
                usages.len() - 1
            });

            let usage = &mut usages[slot];
            if is_property {
                usage.in_properties += 1;
            } else {
                usage.in_fields += 1;
            }
            if usage.name != name && !usage.variants.contains(&name) {
                usage.variants.push(name);
            }
            if seen_here.insert(slot) {
                usage.components += 1;
            }
        }
    }

    usages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::snapshot::{FieldEntry, SnapshotBoard, SnapshotComponent};

    #[test]
    fn groups_by_case_fold_and_counts_components_once() {
        let mut both = SnapshotComponent::with_properties(&[("MPN", "A")]);
        both.fields = Some(vec![FieldEntry::new("mpn", "B")]);

        let mut board = SnapshotBoard::new(vec![
            both,
            SnapshotComponent::with_fields(&[("Reference", "R2"), ("MPN ", "C")]),
            SnapshotComponent::with_properties(&[("Tolerance", "1%")]),
        ]);

        let usages = inventory(&mut board);

        assert_eq!(usages.len(), 3);
        assert_eq!(
            usages[0],
            FieldUsage {
                name: "MPN".to_string(),
                components: 2,
                in_properties: 1,
                in_fields: 2,
                variants: vec!["mpn".to_string(), "MPN ".to_string()],
            }
        );
        assert_eq!(usages[1].name, "Reference");
        assert_eq!(usages[2].name, "Tolerance");
    }

    #[test]
    fn empty_board_has_no_fields() {
        let mut board = SnapshotBoard::new(Vec::new());
        assert!(inventory(&mut board).is_empty());
    }
}
