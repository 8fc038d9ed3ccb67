//! CSV row mapping for bulk imports
//!
//! Rows arrive already split into `{header: value}` objects. Each field is
//! looked up under its French spreadsheet header first, then under the JSON
//! field name. Blank values count as absent.

use lumen_common::models::{DesignerPatch, LuminairePatch};
use serde::Deserialize;
use serde_json::{Map, Value};

/// One uploaded CSV row
pub type CsvRow = Map<String, Value>;

/// Which table an upload targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportKind {
    Luminaires,
    Designers,
}

impl std::str::FromStr for ImportKind {
    type Err = lumen_common::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "luminaires" => Ok(ImportKind::Luminaires),
            "designers" => Ok(ImportKind::Designers),
            other => Err(lumen_common::Error::InvalidInput(format!(
                "Unknown import type: {}",
                other
            ))),
        }
    }
}

/// `(French header, field name)` for every importable luminaire column
pub const LUMINAIRE_COLUMNS: &[(&str, &str)] = &[
    ("Nom luminaire", "name"),
    ("Artiste / Dates", "artist"),
    ("Spécialité", "specialty"),
    ("Collaboration / Œuvre", "collaboration"),
    ("Année", "year"),
    ("Signé", "signed"),
    ("Nom du fichier", "filename"),
    ("Dimensions", "dimensions"),
    ("Estimation", "estimation"),
    ("Matériaux", "materials"),
    ("Description", "description"),
    ("Lien internet", "url"),
];

pub const DESIGNER_COLUMNS: &[(&str, &str)] = &[
    ("Nom", "name"),
    ("imagedesigner", "imageFile"),
    ("Description", "description"),
    ("Collaboration", "collaboration"),
];

/// Cell text, numbers stringified, blanks dropped
fn cell(row: &CsvRow, key: &str) -> Option<String> {
    let text = match row.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn field(row: &CsvRow, columns: &[(&str, &str)], name: &str) -> Option<String> {
    columns
        .iter()
        .filter(|(_, field_name)| *field_name == name)
        .find_map(|(header, field_name)| cell(row, header).or_else(|| cell(row, field_name)))
}

/// Map a spreadsheet row to a luminaire patch
///
/// Returns `None` when the row has no name.
pub fn luminaire_from_row(row: &CsvRow) -> Option<LuminairePatch> {
    let get = |name: &str| field(row, LUMINAIRE_COLUMNS, name);

    Some(LuminairePatch {
        name: Some(get("name")?),
        artist: get("artist"),
        year: get("year"),
        specialty: get("specialty"),
        collaboration: get("collaboration"),
        signed: get("signed"),
        image_url: None,
        filename: get("filename"),
        dimensions: get("dimensions"),
        estimation: get("estimation"),
        materials: get("materials"),
        description: get("description"),
        url: get("url"),
    })
}

/// Map a spreadsheet row to a designer patch
///
/// Returns `None` when the row has no name.
pub fn designer_from_row(row: &CsvRow) -> Option<DesignerPatch> {
    let get = |name: &str| field(row, DESIGNER_COLUMNS, name);

    Some(DesignerPatch {
        name: Some(get("name")?),
        image_file: get("imageFile"),
        image_url: None,
        description: get("description"),
        collaboration: get("collaboration"),
    })
}
