//! `.kicad_pcb` board host.
//!
//! KiCad stores footprint metadata in two layouts depending on the file
//! version:
//!
//! - **legacy** (KiCad 6/7): plain `(property "key" "value")` children form a
//!   property mapping; `fp_text reference` / `fp_text value` are fixed fields
//!   that cannot be renamed or duplicated.
//! - **fields** (KiCad 8+, version 20230620 and later): every
//!   `(property "Name" "Text" (at ..) (layer ..) ...)` child is a positioned
//!   field; there is no separate property mapping.
//!
//! Edits go through the lossless tree in [`crate::sexpr`], so everything the
//! rename pass does not touch is written back byte-for-byte.

use crate::error::{Error, Result};
use crate::field::{
    names_match, Board, Component, FieldList, MutationError, MutationResult, PropertyStore,
};
use crate::sexpr::{self, Atom, Document, Item, List, Node};

use super::FormatPreference;

/// First board file version that stores footprint properties as fields.
pub const FIELDS_FORMAT_VERSION: u64 = 20230620;

/// Fields KiCad requires on every footprint; their names are fixed.
const MANDATORY_FIELDS: &[&str] = &["Reference", "Value", "Footprint", "Datasheet", "Description"];

/// Children that precede the property block in legacy footprints.
const LEGACY_HEADER: &[&str] = &[
    "layer", "locked", "placed", "tedit", "tstamp", "uuid", "at", "descr", "tags",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KicadFormat {
    Legacy,
    Fields,
}

impl KicadFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            KicadFormat::Legacy => "legacy",
            KicadFormat::Fields => "fields",
        }
    }
}

/// Cached per-footprint facts, rebuilt on refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FootprintSummary {
    pub library_id: String,
    pub reference: Option<String>,
}

#[derive(Debug, Clone)]
pub struct KicadBoard {
    document: Document,
    version: Option<u64>,
    format: KicadFormat,
    footprints: Vec<FootprintSummary>,
}

impl KicadBoard {
    /// Parse board text. `source` names the file in error details.
    pub fn parse(content: &str, source: &str, preference: FormatPreference) -> Result<Self> {
        let document = sexpr::parse(content).map_err(|e| {
            Error::board_parse_failed(source, e.message.clone(), Some((e.line, e.column)))
        })?;

        if document.root.head() != Some("kicad_pcb") {
            return Err(Error::board_parse_failed(
                source,
                "root list is not (kicad_pcb ...)",
                None,
            ));
        }

        let version = document
            .root
            .find("version")
            .and_then(|v| v.atom(1))
            .and_then(|a| a.text().parse::<u64>().ok());

        let format = match preference {
            FormatPreference::Legacy => KicadFormat::Legacy,
            FormatPreference::Fields => KicadFormat::Fields,
            FormatPreference::Auto => match version {
                Some(v) if v >= FIELDS_FORMAT_VERSION => KicadFormat::Fields,
                _ => KicadFormat::Legacy,
            },
        };

        let mut board = Self {
            document,
            version,
            format,
            footprints: Vec::new(),
        };
        board.rebuild_index();
        Ok(board)
    }

    pub fn version(&self) -> Option<u64> {
        self.version
    }

    pub fn format(&self) -> KicadFormat {
        self.format
    }

    pub fn footprints(&self) -> &[FootprintSummary] {
        &self.footprints
    }

    pub fn render(&self) -> String {
        self.document.to_string()
    }

    fn rebuild_index(&mut self) {
        let format = self.format;
        self.footprints = self
            .document
            .root
            .lists()
            .filter(|l| is_footprint(l))
            .map(|l| FootprintSummary {
                library_id: l.atom(1).map(|a| a.text().to_string()).unwrap_or_default(),
                reference: reference_of(l, format),
            })
            .collect();
    }
}

impl Board for KicadBoard {
    fn components(&mut self) -> Vec<Box<dyn Component + '_>> {
        let format = self.format;
        self.document
            .root
            .lists_mut()
            .filter(|l| is_footprint(l))
            .map(|list| Box::new(Footprint { list, format }) as Box<dyn Component + '_>)
            .collect()
    }

    fn refresh(&mut self) {
        self.rebuild_index();
    }
}

fn is_footprint(list: &List) -> bool {
    // KiCad 5 boards call footprints `module`.
    matches!(list.head(), Some("footprint") | Some("module"))
}

fn reference_of(list: &List, format: KicadFormat) -> Option<String> {
    match format {
        KicadFormat::Legacy => list
            .lists()
            .find(|l| l.head() == Some("fp_text") && l.atom(1).map(Atom::text) == Some("reference"))
            .and_then(|l| l.atom(2))
            .map(|a| a.text().to_string()),
        KicadFormat::Fields => list
            .lists()
            .find(|l| l.head() == Some("property") && l.atom(1).map(Atom::text) == Some("Reference"))
            .and_then(|l| l.atom(2))
            .map(|a| a.text().to_string()),
    }
}

/// One footprint, viewed through the rename capabilities of its format.
struct Footprint<'a> {
    list: &'a mut List,
    format: KicadFormat,
}

impl Footprint<'_> {
    fn child(&self, slot: usize) -> Option<&List> {
        self.list.items.get(slot).and_then(Item::as_list)
    }

    fn child_mut(&mut self, slot: usize) -> Option<&mut List> {
        self.list.items.get_mut(slot).and_then(Item::as_list_mut)
    }

    /// Item positions of `(property ...)` children.
    fn property_slots(&self) -> Vec<usize> {
        self.list.positions("property")
    }

    /// Item positions of whatever this format treats as named fields.
    fn field_slots(&self) -> Vec<usize> {
        match self.format {
            KicadFormat::Fields => self.property_slots(),
            KicadFormat::Legacy => self
                .list
                .positions("fp_text")
                .into_iter()
                .filter(|&slot| legacy_field_name(self.child(slot)).is_some())
                .collect(),
        }
    }

    fn field_name(&self, slot: usize) -> Option<String> {
        match self.format {
            KicadFormat::Fields => self.child(slot)?.atom(1).map(|a| a.text().to_string()),
            KicadFormat::Legacy => legacy_field_name(self.child(slot)).map(str::to_string),
        }
    }

    /// KiCad keys fields by name, so a second field with a mandatory or
    /// existing name shadows the first on load.
    fn name_taken(&self, name: &str) -> bool {
        MANDATORY_FIELDS.iter().any(|m| names_match(m, name))
            || self
                .field_slots()
                .into_iter()
                .filter_map(|slot| self.field_name(slot))
                .any(|existing| names_match(&existing, name))
    }

    /// Where a new legacy property goes: after the last property, else after
    /// the footprint header.
    fn legacy_insert_slot(&self) -> usize {
        if let Some(last) = self.property_slots().last() {
            return last + 1;
        }
        self.list
            .items
            .iter()
            .rposition(|item| {
                item.as_list()
                    .and_then(List::head)
                    .is_some_and(|head| LEGACY_HEADER.contains(&head))
            })
            .map(|slot| slot + 1)
            .unwrap_or_else(|| self.list.items.len().min(2))
    }
}

fn legacy_field_name(list: Option<&List>) -> Option<&'static str> {
    match list?.atom(1)?.text() {
        "reference" => Some("Reference"),
        "value" => Some("Value"),
        _ => None,
    }
}

impl Component for Footprint<'_> {
    fn reference(&self) -> Option<String> {
        reference_of(self.list, self.format)
    }

    fn properties(&mut self) -> Option<&mut dyn PropertyStore> {
        match self.format {
            KicadFormat::Legacy => Some(self),
            KicadFormat::Fields => None,
        }
    }

    fn fields(&mut self) -> Option<&mut dyn FieldList> {
        Some(self)
    }
}

impl PropertyStore for Footprint<'_> {
    fn entries(&self) -> Vec<(String, String)> {
        self.property_slots()
            .into_iter()
            .filter_map(|slot| {
                let list = self.child(slot)?;
                let key = list.atom(1)?.text().to_string();
                let value = list.atom(2).map(|a| a.text().to_string()).unwrap_or_default();
                Some((key, value))
            })
            .collect()
    }

    fn set(&mut self, key: &str, value: &str) -> MutationResult {
        let existing = self
            .property_slots()
            .into_iter()
            .find(|&slot| self.child(slot).and_then(|l| l.atom(1)).map(Atom::text) == Some(key));

        if let Some(slot) = existing {
            let list = self
                .child_mut(slot)
                .ok_or_else(|| MutationError::Failed(format!("property '{}' vanished", key)))?;
            match list.atom_mut(2) {
                Some(atom) => atom.set_text(value),
                None => list
                    .items
                    .push(Item::new(" ", Node::Atom(Atom::quoted(value)))),
            }
            return Ok(());
        }

        let slot = self.legacy_insert_slot();
        let indent = self.list.child_indent();
        let node = List::from_atoms(vec![
            Atom::bare("property"),
            Atom::quoted(key),
            Atom::quoted(value),
        ]);
        self.list.items.insert(slot, Item::new(indent, Node::List(node)));
        Ok(())
    }

    fn clear(&mut self, key: &str) -> MutationResult {
        let slots: Vec<usize> = self
            .property_slots()
            .into_iter()
            .filter(|&slot| self.child(slot).and_then(|l| l.atom(1)).map(Atom::text) == Some(key))
            .collect();

        for slot in slots.into_iter().rev() {
            self.list.items.remove(slot);
        }
        Ok(())
    }
}

impl FieldList for Footprint<'_> {
    fn len(&self) -> usize {
        self.field_slots().len()
    }

    fn name(&self, index: usize) -> Option<String> {
        let slot = *self.field_slots().get(index)?;
        self.field_name(slot)
    }

    fn text(&self, index: usize) -> Option<String> {
        let slot = *self.field_slots().get(index)?;
        self.child(slot)?.atom(2).map(|a| a.text().to_string())
    }

    fn rename(&mut self, index: usize, new_name: &str) -> MutationResult {
        if self.format == KicadFormat::Legacy {
            return Err(MutationError::Unsupported);
        }

        let slot = *self
            .field_slots()
            .get(index)
            .ok_or_else(|| MutationError::Failed(format!("no field at index {}", index)))?;

        let current = self.field_name(slot).unwrap_or_default();
        if MANDATORY_FIELDS.contains(&current.as_str()) || self.name_taken(new_name) {
            return Err(MutationError::Unsupported);
        }

        let atom = self
            .child_mut(slot)
            .and_then(|l| l.atom_mut(1))
            .ok_or_else(|| MutationError::Failed(format!("field '{}' has no name", current)))?;
        atom.set_text(new_name);
        Ok(())
    }

    fn duplicate_as(&mut self, index: usize, new_name: &str) -> MutationResult {
        if self.format == KicadFormat::Legacy {
            return Err(MutationError::Unsupported);
        }

        let slot = *self
            .field_slots()
            .get(index)
            .ok_or_else(|| MutationError::Failed(format!("no field at index {}", index)))?;
        if self.name_taken(new_name) {
            return Err(MutationError::Unsupported);
        }

        let mut copy = self.list.items[slot].clone();
        let list = copy
            .as_list_mut()
            .ok_or_else(|| MutationError::Failed("field is not a list".to_string()))?;
        // KiCad assigns a fresh uuid on load; a copied one would collide.
        list.items
            .retain(|item| item.as_list().and_then(List::head) != Some("uuid"));
        match list.atom_mut(1) {
            Some(atom) => atom.set_text(new_name),
            None => return Err(MutationError::Failed("field has no name".to_string())),
        }

        self.list.items.insert(slot + 1, copy);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{execute, RenameRequest, Strategy};

    const LEGACY: &str = r#"(kicad_pcb (version 20221018) (generator pcbnew)
  (general
    (thickness 1.6)
  )
  (footprint "Resistor_SMD:R_0603_1608Metric" (layer "F.Cu")
    (tstamp 5c7a1c0e-0000-0000-0000-000000000001)
    (at 100 50)
    (property "PART NUMBER" "ABC123")
    (property "Sheetfile" "main.kicad_sch")
    (attr smd)
    (fp_text reference "R1" (at 0 -1.43) (layer "F.SilkS")
      (effects (font (size 1 1) (thickness 0.15)))
    )
    (fp_text value "10k" (at 0 1.43) (layer "F.Fab")
      (effects (font (size 1 1) (thickness 0.15)))
    )
  )
  (footprint "Capacitor_SMD:C_0603_1608Metric" (layer "F.Cu")
    (tstamp 5c7a1c0e-0000-0000-0000-000000000002)
    (at 110 50)
    (attr smd)
    (fp_text reference "C1" (at 0 -1.43) (layer "F.SilkS"))
    (fp_text value "100n" (at 0 1.43) (layer "F.Fab"))
  )
)
"#;

    const FIELDS: &str = r#"(kicad_pcb
	(version 20240108)
	(generator "pcbnew")
	(footprint "Resistor_SMD:R_0603_1608Metric"
		(layer "F.Cu")
		(uuid "7f0e1c2a-0000-0000-0000-000000000001")
		(at 100 50)
		(property "Reference" "R1"
			(at 0 -1.43 0)
			(layer "F.SilkS")
			(uuid "7f0e1c2a-0000-0000-0000-0000000000a1")
		)
		(property "Value" "10k"
			(at 0 1.43 0)
			(layer "F.Fab")
			(uuid "7f0e1c2a-0000-0000-0000-0000000000a2")
		)
		(property "Part Number" "XYZ999"
			(at 0 0 0)
			(layer "F.Fab")
			(hide yes)
			(uuid "7f0e1c2a-0000-0000-0000-0000000000a3")
		)
	)
)
"#;

    fn parse(content: &str) -> KicadBoard {
        KicadBoard::parse(content, "test.kicad_pcb", FormatPreference::Auto).unwrap()
    }

    #[test]
    fn detects_format_from_version() {
        let legacy = parse(LEGACY);
        assert_eq!(legacy.version(), Some(20221018));
        assert_eq!(legacy.format(), KicadFormat::Legacy);

        let fields = parse(FIELDS);
        assert_eq!(fields.format(), KicadFormat::Fields);
    }

    #[test]
    fn preference_overrides_detection() {
        let board = KicadBoard::parse(LEGACY, "x", FormatPreference::Fields).unwrap();
        assert_eq!(board.format(), KicadFormat::Fields);
    }

    #[test]
    fn untouched_board_renders_identically() {
        assert_eq!(parse(LEGACY).render(), LEGACY);
        assert_eq!(parse(FIELDS).render(), FIELDS);
    }

    #[test]
    fn index_lists_footprints_with_references() {
        let board = parse(LEGACY);
        let refs: Vec<_> = board
            .footprints()
            .iter()
            .map(|f| f.reference.as_deref())
            .collect();
        assert_eq!(refs, vec![Some("R1"), Some("C1")]);
        assert_eq!(board.footprints()[1].library_id, "Capacitor_SMD:C_0603_1608Metric");
    }

    #[test]
    fn rejects_non_board_documents() {
        let err = KicadBoard::parse("(kicad_sch (version 1))", "a.kicad_sch", FormatPreference::Auto)
            .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::BoardParseFailed);

        let err = KicadBoard::parse("(kicad_pcb", "a.kicad_pcb", FormatPreference::Auto).unwrap_err();
        assert_eq!(err.details["line"], 1);
    }

    #[test]
    fn legacy_property_rename_moves_entry_under_new_key() {
        let mut board = parse(LEGACY);
        let request = RenameRequest::new("part number", "MPN", false).unwrap();

        let outcome = execute(&mut board, &request);

        assert_eq!(outcome.found_count, 1);
        assert_eq!(outcome.components[0].strategy, Strategy::PropertyMoved);
        assert_eq!(outcome.components[0].reference.as_deref(), Some("R1"));

        let expected = LEGACY.replace(
            "    (property \"PART NUMBER\" \"ABC123\")\n    (property \"Sheetfile\" \"main.kicad_sch\")\n",
            "    (property \"Sheetfile\" \"main.kicad_sch\")\n    (property \"MPN\" \"ABC123\")\n",
        );
        assert_eq!(board.render(), expected);
    }

    #[test]
    fn legacy_copy_keeps_original_property() {
        let mut board = parse(LEGACY);
        let request = RenameRequest::new("PART NUMBER", "MPN", true).unwrap();

        execute(&mut board, &request);

        let rendered = board.render();
        assert!(rendered.contains("(property \"PART NUMBER\" \"ABC123\")"));
        assert!(rendered.contains("\n    (property \"MPN\" \"ABC123\")\n    (attr smd)"));
    }

    #[test]
    fn legacy_value_field_falls_back_to_property() {
        let mut board = parse(LEGACY);
        let request = RenameRequest::new("value", "Resistance", false).unwrap();

        let outcome = execute(&mut board, &request);

        assert_eq!(outcome.found_count, 2);
        assert!(outcome
            .components
            .iter()
            .all(|c| c.strategy == Strategy::FieldFallbackProperty));

        let rendered = board.render();
        assert!(rendered.contains("(fp_text value \"10k\""));
        assert!(rendered.contains("(property \"Resistance\" \"10k\")"));
        // C1 had no properties: the new one lands after the header.
        assert!(rendered.contains("(at 110 50)\n    (property \"Resistance\" \"100n\")\n    (attr smd)"));
    }

    #[test]
    fn fields_rename_changes_only_the_name() {
        let mut board = parse(FIELDS);
        let request = RenameRequest::new("PART NUMBER", "MPN", false).unwrap();

        let outcome = execute(&mut board, &request);

        assert_eq!(outcome.components[0].strategy, Strategy::FieldRenamed);
        assert_eq!(outcome.components[0].matched_name, "Part Number");
        assert_eq!(
            board.render(),
            FIELDS.replace("(property \"Part Number\"", "(property \"MPN\"")
        );
    }

    #[test]
    fn fields_copy_duplicates_without_uuid() {
        let mut board = parse(FIELDS);
        let request = RenameRequest::new("Part Number", "MPN", true).unwrap();

        let outcome = execute(&mut board, &request);

        assert_eq!(outcome.components[0].strategy, Strategy::FieldDuplicated);
        let rendered = board.render();
        let duplicate = "\t\t(property \"MPN\" \"XYZ999\"\n\t\t\t(at 0 0 0)\n\t\t\t(layer \"F.Fab\")\n\t\t\t(hide yes)\n\t\t)";
        assert!(rendered.contains(duplicate), "{rendered}");
        assert!(rendered.contains("(property \"Part Number\" \"XYZ999\""));
    }

    #[test]
    fn fields_mandatory_names_are_not_renamed() {
        let mut board = parse(FIELDS);
        let request = RenameRequest::new("Value", "Resistance", false).unwrap();

        let outcome = execute(&mut board, &request);

        assert_eq!(outcome.found_count, 1);
        assert_eq!(outcome.components[0].strategy, Strategy::Unchanged);
        assert_eq!(board.render(), FIELDS);
    }

    #[test]
    fn fields_rename_onto_mandatory_name_is_refused() {
        let mut board = parse(FIELDS);
        let request = RenameRequest::new("Part Number", "value", false).unwrap();

        let outcome = execute(&mut board, &request);

        assert_eq!(outcome.found_count, 1);
        assert_eq!(outcome.components[0].strategy, Strategy::Unchanged);
        assert_eq!(board.render(), FIELDS);
    }

    #[test]
    fn fields_copy_onto_existing_name_is_refused() {
        let board_text = FIELDS.replace(
            "\t)\n)\n",
            "\t\t(property \"MPN\" \"OLD\"\n\t\t\t(at 0 0 0)\n\t\t)\n\t)\n)\n",
        );
        let mut board = parse(&board_text);
        assert_eq!(board.render(), board_text);

        let request = RenameRequest::new("Part Number", "mpn", true).unwrap();
        let outcome = execute(&mut board, &request);

        assert_eq!(outcome.components[0].strategy, Strategy::Unchanged);
        assert_eq!(board.render().matches("(property \"MPN\"").count(), 1);
        assert!(!board.render().contains("(property \"mpn\""));
    }

    #[test]
    fn refresh_rebuilds_the_index() {
        let mut board = parse(FIELDS);
        let request = RenameRequest::new("Reference", "Designator", true).unwrap();

        execute(&mut board, &request);

        assert_eq!(board.footprints().len(), 1);
        assert_eq!(board.footprints()[0].reference.as_deref(), Some("R1"));
    }
}
