//! JSON board snapshots.
//!
//! A snapshot lists components with an optional property mapping and an
//! optional field list. A missing `properties` or `fields` key means the
//! component does not expose that representation at all, which makes every
//! capability combination expressible without a CAD host.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::field::{Board, Component, FieldList, MutationError, MutationResult, PropertyStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyEntry {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldEntry {
    pub name: String,
    #[serde(default)]
    pub text: String,
}

impl FieldEntry {
    pub fn new(name: &str, text: &str) -> Self {
        Self {
            name: name.to_string(),
            text: text.to_string(),
        }
    }
}

/// Optional field-list operations this component supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    #[serde(default = "supported")]
    pub rename_field: bool,
    #[serde(default = "supported")]
    pub duplicate_field: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            rename_field: true,
            duplicate_field: true,
        }
    }
}

fn supported() -> bool {
    true
}

fn is_default_capabilities(caps: &Capabilities) -> bool {
    *caps == Capabilities::default()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotComponent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Vec<PropertyEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldEntry>>,
    #[serde(default, skip_serializing_if = "is_default_capabilities")]
    pub capabilities: Capabilities,
}

impl SnapshotComponent {
    /// A component exposing only a property mapping.
    pub fn with_properties(pairs: &[(&str, &str)]) -> Self {
        Self {
            properties: Some(
                pairs
                    .iter()
                    .map(|(k, v)| PropertyEntry {
                        key: k.to_string(),
                        value: v.to_string(),
                    })
                    .collect(),
            ),
            ..Self::default()
        }
    }

    /// A component exposing only a field list.
    pub fn with_fields(pairs: &[(&str, &str)]) -> Self {
        Self {
            fields: Some(pairs.iter().map(|(n, t)| FieldEntry::new(n, t)).collect()),
            ..Self::default()
        }
    }

    pub fn with_reference(mut self, reference: &str) -> Self {
        self.reference = Some(reference.to_string());
        self
    }

    pub fn property_pairs(&self) -> Vec<(&str, &str)> {
        self.properties
            .iter()
            .flatten()
            .map(|p| (p.key.as_str(), p.value.as_str()))
            .collect()
    }

    pub fn field_pairs(&self) -> Vec<(&str, &str)> {
        self.fields
            .iter()
            .flatten()
            .map(|f| (f.name.as_str(), f.text.as_str()))
            .collect()
    }
}

struct Properties<'a>(&'a mut Vec<PropertyEntry>);

impl PropertyStore for Properties<'_> {
    fn entries(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|p| (p.key.clone(), p.value.clone()))
            .collect()
    }

    fn set(&mut self, key: &str, value: &str) -> MutationResult {
        match self.0.iter_mut().find(|p| p.key == key) {
            Some(existing) => existing.value = value.to_string(),
            None => self.0.push(PropertyEntry {
                key: key.to_string(),
                value: value.to_string(),
            }),
        }
        Ok(())
    }

    fn clear(&mut self, key: &str) -> MutationResult {
        self.0.retain(|p| p.key != key);
        Ok(())
    }
}

struct Fields<'a> {
    entries: &'a mut Vec<FieldEntry>,
    capabilities: Capabilities,
}

impl FieldList for Fields<'_> {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn name(&self, index: usize) -> Option<String> {
        self.entries.get(index).map(|f| f.name.clone())
    }

    fn text(&self, index: usize) -> Option<String> {
        self.entries.get(index).map(|f| f.text.clone())
    }

    fn rename(&mut self, index: usize, new_name: &str) -> MutationResult {
        if !self.capabilities.rename_field {
            return Err(MutationError::Unsupported);
        }
        let field = self
            .entries
            .get_mut(index)
            .ok_or_else(|| MutationError::Failed(format!("no field at index {}", index)))?;
        field.name = new_name.to_string();
        Ok(())
    }

    fn duplicate_as(&mut self, index: usize, new_name: &str) -> MutationResult {
        if !self.capabilities.duplicate_field {
            return Err(MutationError::Unsupported);
        }
        let text = self
            .entries
            .get(index)
            .map(|f| f.text.clone())
            .ok_or_else(|| MutationError::Failed(format!("no field at index {}", index)))?;
        self.entries.insert(index + 1, FieldEntry::new(new_name, &text));
        Ok(())
    }
}

/// Borrowed view handed to the rename pass; owns the adapters so the
/// component can lend them out as trait objects.
struct SnapshotView<'a> {
    reference: Option<String>,
    properties: Option<Properties<'a>>,
    fields: Option<Fields<'a>>,
}

impl Component for SnapshotView<'_> {
    fn reference(&self) -> Option<String> {
        self.reference.clone()
    }

    fn properties(&mut self) -> Option<&mut dyn PropertyStore> {
        self.properties
            .as_mut()
            .map(|p| p as &mut dyn PropertyStore)
    }

    fn fields(&mut self) -> Option<&mut dyn FieldList> {
        self.fields.as_mut().map(|f| f as &mut dyn FieldList)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotBoard {
    pub components: Vec<SnapshotComponent>,
    /// Set once the rename pass signals a refresh; never serialized.
    #[serde(skip)]
    pub refreshed: bool,
}

impl SnapshotBoard {
    pub fn new(components: Vec<SnapshotComponent>) -> Self {
        Self {
            components,
            refreshed: false,
        }
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| Error::validation_invalid_json(e, Some("parse board snapshot".to_string())))
    }

    pub fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self).map_err(|e| {
            Error::internal_json(e.to_string(), Some("serialize board snapshot".to_string()))
        })?;
        json.push('\n');
        Ok(json)
    }
}

impl Board for SnapshotBoard {
    fn components(&mut self) -> Vec<Box<dyn Component + '_>> {
        self.components
            .iter_mut()
            .map(|c| {
                let view = SnapshotView {
                    reference: c.reference.clone(),
                    properties: c.properties.as_mut().map(Properties),
                    fields: c.fields.as_mut().map(|entries| Fields {
                        entries,
                        capabilities: c.capabilities,
                    }),
                };
                Box::new(view) as Box<dyn Component + '_>
            })
            .collect()
    }

    fn refresh(&mut self) {
        self.refreshed = true;
    }
}
