//! Timeline periods
//!
//! Periods may overlap (Art Nouveau sits across the turn of the century), so
//! one luminaire can appear under several periods. Years that do not parse
//! to a number are treated as 0 and fall outside every period.

use lumen_common::year::year_or_zero;
use lumen_common::Luminaire;
use serde::Serialize;
use std::collections::HashMap;

/// A named span of years, bounds inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub name: &'static str,
    pub start: i64,
    pub end: i64,
    pub default_description: &'static str,
}

impl Period {
    pub fn contains(&self, year: i64) -> bool {
        (self.start..=self.end).contains(&year)
    }
}

pub const PERIODS: &[Period] = &[
    Period {
        name: "Moyen-Age",
        start: 1000,
        end: 1499,
        default_description: "Candles and oil lamps shaped by monastic craft.",
    },
    Period {
        name: "XVIe siècle",
        start: 1500,
        end: 1599,
        default_description: "Renaissance chandeliers in bronze and wrought iron.",
    },
    Period {
        name: "XVIIe siècle",
        start: 1600,
        end: 1699,
        default_description: "Baroque girandoles and the first crystal pendants.",
    },
    Period {
        name: "XVIIIe siècle",
        start: 1700,
        end: 1799,
        default_description: "Rococo sconces, gilt bronze and Argand burners.",
    },
    Period {
        name: "XIXe siècle",
        start: 1800,
        end: 1899,
        default_description: "Gas lighting, then the arrival of the electric bulb.",
    },
    Period {
        name: "Art Nouveau",
        start: 1890,
        end: 1910,
        default_description: "Organic forms and cameo glass from the Nancy school.",
    },
    Period {
        name: "Art Déco",
        start: 1920,
        end: 1940,
        default_description: "Geometric lines, chrome and pressed glass.",
    },
    Period {
        name: "1940 - 1949",
        start: 1940,
        end: 1949,
        default_description: "Wartime scarcity and the first adjustable task lamps.",
    },
    Period {
        name: "1950 - 1959",
        start: 1950,
        end: 1959,
        default_description: "Post-war modernism and articulated arms.",
    },
    Period {
        name: "1960 - 1969",
        start: 1960,
        end: 1969,
        default_description: "Pop shapes, plastics and space-age globes.",
    },
    Period {
        name: "1970 - 1979",
        start: 1970,
        end: 1979,
        default_description: "Halogen, smoked glass and radical design.",
    },
    Period {
        name: "1980 - 1989",
        start: 1980,
        end: 1989,
        default_description: "Memphis colour and high-tech minimalism.",
    },
    Period {
        name: "1990 - 1999",
        start: 1990,
        end: 1999,
        default_description: "Low-voltage systems and designer editions.",
    },
    Period {
        name: "Contemporain",
        start: 2000,
        end: 2025,
        default_description: "LED lighting and eco-design.",
    },
];

/// A period with its luminaires, as served by the timeline endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelinePeriod {
    pub name: String,
    pub start: i64,
    pub end: i64,
    pub description: String,
    pub luminaires: Vec<Luminaire>,
}

/// Group luminaires into periods
///
/// Periods come out ordered by start year; luminaires within a period are
/// newest first. Stored descriptions override the defaults.
pub fn build_timeline(luminaires: &[Luminaire], descriptions: &HashMap<String, String>) -> Vec<TimelinePeriod> {
    let mut periods: Vec<&Period> = PERIODS.iter().collect();
    periods.sort_by_key(|p| p.start);

    periods
        .into_iter()
        .map(|period| {
            let mut members: Vec<(i64, &Luminaire)> = luminaires
                .iter()
                .map(|l| (year_or_zero(l.year.as_deref().unwrap_or_default()), l))
                .filter(|(year, _)| period.contains(*year))
                .collect();
            members.sort_by(|a, b| b.0.cmp(&a.0));

            TimelinePeriod {
                name: period.name.to_string(),
                start: period.start,
                end: period.end,
                description: descriptions
                    .get(period.name)
                    .filter(|d| !d.is_empty())
                    .cloned()
                    .unwrap_or_else(|| period.default_description.to_string()),
                luminaires: members.into_iter().map(|(_, l)| l.clone()).collect(),
            }
        })
        .collect()
}
