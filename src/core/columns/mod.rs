//! Column reconciliation
//!
//! Maps the headers a source file actually carries onto the canonical field
//! catalogue, resolving historical synonyms. The result is an immutable
//! [`ColumnMapping`] built once per job and passed to every later stage.

pub mod fields;

use std::collections::HashMap;

use crate::domain::{IngestError, Result};
pub use fields::{destination_columns, Field, FieldKind, FieldSpec, FIELDS, FIELD_COUNT, KEY_FIELDS};

/// How one canonical field is found in the file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnBinding {
    pub field: Field,
    /// Header used in the file (canonical or synonym)
    pub header: String,
    /// Position of that header in each raw row
    pub index: usize,
}

/// Synonym substituted for an absent canonical header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub field: Field,
    pub synonym: String,
}

/// Per-job mapping from canonical fields to source columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    slots: Vec<Option<usize>>,
    bindings: Vec<ColumnBinding>,
    substitutions: Vec<Substitution>,
    absent_optional: Vec<Field>,
}

impl ColumnMapping {
    /// Reconciles `headers` against the field catalogue
    ///
    /// Headers match case-insensitively after trimming. A required field with
    /// neither its canonical header nor a synonym fails the whole mapping
    /// with [`IngestError::MissingFields`] naming every such field.
    pub fn reconcile(headers: &[String]) -> Result<Self> {
        let mut positions: HashMap<String, usize> = HashMap::with_capacity(headers.len());
        for (i, header) in headers.iter().enumerate() {
            positions.entry(normalize(header)).or_insert(i);
        }

        let mut slots = vec![None; FIELD_COUNT];
        let mut bindings = Vec::new();
        let mut substitutions = Vec::new();
        let mut absent_optional = Vec::new();
        let mut missing = Vec::new();

        for spec in FIELDS.iter() {
            let found = positions
                .get(spec.canonical)
                .map(|&i| (i, None))
                .or_else(|| {
                    spec.field.synonyms().iter().find_map(|synonym| {
                        positions.get(*synonym).map(|&i| (i, Some(*synonym)))
                    })
                });

            match found {
                Some((index, synonym)) => {
                    if let Some(synonym) = synonym {
                        substitutions.push(Substitution {
                            field: spec.field,
                            synonym: synonym.to_string(),
                        });
                    }
                    slots[spec.field as usize] = Some(index);
                    bindings.push(ColumnBinding {
                        field: spec.field,
                        header: headers[index].trim().to_string(),
                        index,
                    });
                }
                None if spec.required => missing.push(spec.canonical.to_string()),
                None => absent_optional.push(spec.field),
            }
        }

        if !missing.is_empty() {
            return Err(IngestError::MissingFields(missing));
        }

        Ok(Self {
            slots,
            bindings,
            substitutions,
            absent_optional,
        })
    }

    /// Position of `field` in raw rows, `None` if the file lacks it
    pub fn index_of(&self, field: Field) -> Option<usize> {
        self.slots[field as usize]
    }

    pub fn bindings(&self) -> &[ColumnBinding] {
        &self.bindings
    }

    pub fn substitutions(&self) -> &[Substitution] {
        &self.substitutions
    }

    pub fn absent_optional(&self) -> &[Field] {
        &self.absent_optional
    }

    /// Headers that must be present, with synonyms in place of their canonical names
    pub fn required_headers(&self) -> Vec<&str> {
        self.bindings
            .iter()
            .filter(|b| b.field.is_required())
            .map(|b| b.header.as_str())
            .collect()
    }

    /// (source header, destination column) pairs for bound fields
    pub fn column_pairs(&self) -> Vec<(&str, &'static str)> {
        self.bindings
            .iter()
            .map(|b| (b.header.as_str(), b.field.column()))
            .collect()
    }

    /// Ledger warnings describing how the file deviates from the canonical layout
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings: Vec<String> = self
            .substitutions
            .iter()
            .map(|s| {
                format!(
                    "Field {} not found in data file, using synonym {}",
                    s.field.canonical(),
                    s.synonym
                )
            })
            .collect();

        if !self.absent_optional.is_empty() {
            let names: Vec<_> = self.absent_optional.iter().map(|f| f.canonical()).collect();
            warnings.push(format!(
                "Optional field(s) not found in data file, filled with defaults: {}",
                names.join(", ")
            ));
        }
        warnings
    }
}

fn normalize(header: &str) -> String {
    header.trim().trim_start_matches('\u{feff}').to_uppercase()
}
