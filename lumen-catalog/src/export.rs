//! CSV export of the catalog

use lumen_common::Luminaire;

pub const EXPORT_HEADERS: &[&str] = &[
    "ID",
    "Nom du luminaire",
    "Artiste / Dates",
    "Année",
    "Spécialité",
    "Collaboration / Œuvre",
    "Signé",
    "URL Image",
    "Nom du fichier",
    "Dimensions",
    "Estimation",
    "Matériaux",
    "Description",
    "Lien internet",
];

/// Quote a value, doubling embedded quotes
fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn export_row(l: &Luminaire) -> Vec<&str> {
    fn opt(v: &Option<String>) -> &str {
        v.as_deref().unwrap_or_default()
    }
    vec![
        l.id.as_str(),
        l.name.as_str(),
        opt(&l.artist),
        opt(&l.year),
        opt(&l.specialty),
        opt(&l.collaboration),
        opt(&l.signed),
        opt(&l.image_url),
        opt(&l.filename),
        opt(&l.dimensions),
        opt(&l.estimation),
        opt(&l.materials),
        opt(&l.description),
        opt(&l.url),
    ]
}

/// Render luminaires as CSV, one header line then one line per luminaire
///
/// Every value is quoted so embedded commas and newlines survive.
pub fn render_csv(luminaires: &[Luminaire]) -> String {
    let mut lines = Vec::with_capacity(luminaires.len() + 1);
    lines.push(EXPORT_HEADERS.iter().map(|h| quote(h)).collect::<Vec<_>>().join(","));
    for l in luminaires {
        lines.push(export_row(l).into_iter().map(quote).collect::<Vec<_>>().join(","));
    }
    lines.join("\n")
}
