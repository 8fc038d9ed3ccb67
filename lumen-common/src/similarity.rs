//! Similar-luminaire ranking
//!
//! Two ways of answering "which luminaires look like this one":
//!
//! - **Scored** (canonical): every candidate gets a score from attribute
//!   matches, zero scores are dropped, the rest are sorted by score
//!   descending and capped.
//! - **Coarse**: an unscored OR filter (same artist, same specialty, year
//!   within ±10, collaboration overlap) returning the first matches in
//!   candidate order. Any candidate with a positive score also passes the
//!   coarse filter, so it doubles as a pre-filter before scoring.
//!
//! All string comparisons ignore case. Neither mode mutates its inputs.

use serde::Serialize;

use crate::models::Luminaire;
use crate::year::{known_year, parse_leading_int};

/// Number of similar items returned when the caller does not say otherwise
pub const DEFAULT_LIMIT: usize = 6;

/// Maximum year distance for the proximity rule and the coarse window
pub const YEAR_WINDOW: i64 = 10;

pub const ARTIST_POINTS: u32 = 3;
pub const SPECIALTY_POINTS: u32 = 2;
pub const YEAR_POINTS: u32 = 1;
pub const COLLABORATION_POINTS: u32 = 1;

/// Attributes the ranker compares
///
/// Absent attributes are reported as the empty string.
pub trait SimilarityFields {
    fn id(&self) -> &str;
    fn artist(&self) -> &str;
    fn specialty(&self) -> &str;
    fn year(&self) -> &str;
    fn collaboration(&self) -> &str;
}

impl SimilarityFields for Luminaire {
    fn id(&self) -> &str {
        &self.id
    }

    fn artist(&self) -> &str {
        self.artist.as_deref().unwrap_or_default()
    }

    fn specialty(&self) -> &str {
        self.specialty.as_deref().unwrap_or_default()
    }

    fn year(&self) -> &str {
        self.year.as_deref().unwrap_or_default()
    }

    fn collaboration(&self) -> &str {
        self.collaboration.as_deref().unwrap_or_default()
    }
}

/// Which similarity behavior to apply
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SimilarityMode {
    #[default]
    Scored,
    Coarse,
}

impl std::str::FromStr for SimilarityMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "scored" => Ok(SimilarityMode::Scored),
            "coarse" => Ok(SimilarityMode::Coarse),
            other => Err(crate::Error::InvalidInput(format!(
                "Unknown similarity mode: {}",
                other
            ))),
        }
    }
}

/// A candidate with its similarity score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Ranked<'a, T> {
    #[serde(rename = "luminaire")]
    pub item: &'a T,
    pub score: u32,
}

/// A similar candidate as returned by [`find_similar`]
///
/// `score` is `None` in coarse mode, which does not score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Similar<'a, T> {
    #[serde(rename = "luminaire")]
    pub item: &'a T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
}

/// Pre-lowercased target attributes, computed once per ranking
struct Probe {
    id: String,
    artist: String,
    specialty: String,
    collaboration: String,
    year: i64,
}

impl Probe {
    fn new<T: SimilarityFields>(target: &T) -> Self {
        Self {
            id: target.id().to_string(),
            artist: target.artist().to_lowercase(),
            specialty: target.specialty().to_lowercase(),
            collaboration: target.collaboration().to_lowercase(),
            year: known_year(target.year()).unwrap_or(0),
        }
    }

    fn same_artist<T: SimilarityFields>(&self, candidate: &T) -> bool {
        !self.artist.is_empty() && candidate.artist().to_lowercase() == self.artist
    }

    fn same_specialty<T: SimilarityFields>(&self, candidate: &T) -> bool {
        !self.specialty.is_empty() && candidate.specialty().to_lowercase() == self.specialty
    }

    fn shares_collaboration<T: SimilarityFields>(&self, candidate: &T) -> bool {
        let theirs = candidate.collaboration();
        !self.collaboration.is_empty()
            && !theirs.is_empty()
            && theirs.to_lowercase().contains(&self.collaboration)
    }

    fn score<T: SimilarityFields>(&self, candidate: &T) -> u32 {
        let mut score = 0;

        if self.same_artist(candidate) {
            score += ARTIST_POINTS;
        }
        if self.same_specialty(candidate) {
            score += SPECIALTY_POINTS;
        }

        let their_year = known_year(candidate.year()).unwrap_or(0);
        if self.year > 0 && their_year > 0 && (self.year - their_year).abs() <= YEAR_WINDOW {
            score += YEAR_POINTS;
        }

        if self.shares_collaboration(candidate) {
            score += COLLABORATION_POINTS;
        }

        score
    }
}

/// Score one candidate against a target
///
/// Does not apply identifier exclusion.
pub fn score<T: SimilarityFields>(target: &T, candidate: &T) -> u32 {
    Probe::new(target).score(candidate)
}

/// Rank candidates by similarity to `target`
///
/// Candidates sharing the target's identifier are skipped, zero scores are
/// dropped, and the survivors are sorted by score descending. Equal scores
/// keep their order from `candidates`. At most `limit` entries are returned.
///
/// # Examples
///
/// ```
/// use lumen_common::{rank, Luminaire};
///
/// let mut target = Luminaire::new("1", "Lampe");
/// target.artist = Some("Gallé".into());
///
/// let mut other = Luminaire::new("2", "Vase lumineux");
/// other.artist = Some("GALLÉ".into());
///
/// let candidates = vec![target.clone(), other];
/// let ranked = rank(&target, &candidates, 6);
/// assert_eq!(ranked.len(), 1);
/// assert_eq!(ranked[0].item.id, "2");
/// assert_eq!(ranked[0].score, 3);
/// ```
pub fn rank<'a, T: SimilarityFields>(target: &T, candidates: &'a [T], limit: usize) -> Vec<Ranked<'a, T>> {
    if limit == 0 {
        return Vec::new();
    }

    let probe = Probe::new(target);
    let mut ranked: Vec<Ranked<'a, T>> = candidates
        .iter()
        .filter(|candidate| candidate.id() != probe.id)
        .map(|item| Ranked {
            item,
            score: probe.score(item),
        })
        .filter(|ranked| ranked.score > 0)
        .collect();

    // sort_by is stable: ties stay in candidate order
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked.truncate(limit);
    ranked
}

/// Inclusive year window around a target year
///
/// Bounds are kept both numerically and in the stringified form stored
/// queries are expressed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearWindow {
    pub min: i64,
    pub max: i64,
}

impl YearWindow {
    /// Window of ±[`YEAR_WINDOW`] around `year`, clamped to the `i64` range
    pub fn around(year: i64) -> Self {
        Self {
            min: year.saturating_sub(YEAR_WINDOW),
            max: year.saturating_add(YEAR_WINDOW),
        }
    }

    /// Window around a free-text year, if it starts with a number
    pub fn for_year_text(text: &str) -> Option<Self> {
        parse_leading_int(text).map(Self::around)
    }

    /// Stringified `(min, max)` bounds
    pub fn bounds(&self) -> (String, String) {
        (self.min.to_string(), self.max.to_string())
    }

    pub fn contains(&self, year: i64) -> bool {
        (self.min..=self.max).contains(&year)
    }
}

/// The coarse OR filter built from a target
///
/// Each present target attribute contributes one clause. With no clauses at
/// all the filter accepts every candidate except the target itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoarseFilter {
    pub exclude_id: String,
    pub artist: Option<String>,
    pub specialty: Option<String>,
    pub years: Option<YearWindow>,
    pub collaboration: Option<String>,
}

impl CoarseFilter {
    pub fn for_target<T: SimilarityFields>(target: &T) -> Self {
        let lowered = |s: &str| (!s.is_empty()).then(|| s.to_lowercase());

        Self {
            exclude_id: target.id().to_string(),
            artist: lowered(target.artist()),
            specialty: lowered(target.specialty()),
            years: YearWindow::for_year_text(target.year()),
            collaboration: lowered(target.collaboration()),
        }
    }

    /// No OR clause at all
    pub fn is_unconstrained(&self) -> bool {
        self.artist.is_none()
            && self.specialty.is_none()
            && self.years.is_none()
            && self.collaboration.is_none()
    }

    pub fn matches<T: SimilarityFields>(&self, candidate: &T) -> bool {
        if candidate.id() == self.exclude_id {
            return false;
        }
        if self.is_unconstrained() {
            return true;
        }

        let eq = |wanted: &Option<String>, actual: &str| {
            wanted.as_deref().is_some_and(|w| actual.to_lowercase() == w)
        };

        eq(&self.artist, candidate.artist())
            || eq(&self.specialty, candidate.specialty())
            || self.years.as_ref().is_some_and(|window| {
                parse_leading_int(candidate.year()).is_some_and(|year| window.contains(year))
            })
            || self.collaboration.as_deref().is_some_and(|needle| {
                candidate.collaboration().to_lowercase().contains(needle)
            })
    }
}

/// First `limit` candidates passing the coarse OR filter, in input order
pub fn coarse_filter<'a, T: SimilarityFields>(target: &T, candidates: &'a [T], limit: usize) -> Vec<&'a T> {
    let filter = CoarseFilter::for_target(target);
    candidates
        .iter()
        .filter(|candidate| filter.matches(*candidate))
        .take(limit)
        .collect()
}

/// Similar candidates under the requested mode
pub fn find_similar<'a, T: SimilarityFields>(
    mode: SimilarityMode,
    target: &T,
    candidates: &'a [T],
    limit: usize,
) -> Vec<Similar<'a, T>> {
    match mode {
        SimilarityMode::Scored => rank(target, candidates, limit)
            .into_iter()
            .map(|ranked| Similar {
                item: ranked.item,
                score: Some(ranked.score),
            })
            .collect(),
        SimilarityMode::Coarse => coarse_filter(target, candidates, limit)
            .into_iter()
            .map(|item| Similar { item, score: None })
            .collect(),
    }
}
