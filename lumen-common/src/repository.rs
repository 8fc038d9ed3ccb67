//! Read access to a catalog snapshot
//!
//! Callers of the similarity ranker load the candidate pool through an
//! [`ItemSource`] rather than from shared global state.

use crate::models::Luminaire;
use crate::similarity::{find_similar, Similar, SimilarityMode};

/// A readable collection of luminaires
pub trait ItemSource {
    /// Every luminaire, in storage order
    fn list(&self) -> &[Luminaire];

    /// Luminaire by identifier
    fn get(&self, id: &str) -> Option<&Luminaire> {
        self.list().iter().find(|item| item.id == id)
    }
}

/// In-memory snapshot of the catalog
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    items: Vec<Luminaire>,
}

impl MemoryCatalog {
    pub fn new(items: Vec<Luminaire>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Replace one luminaire in place, returning false if the id is unknown
    pub fn replace(&mut self, item: Luminaire) -> bool {
        match self.items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => {
                *existing = item;
                true
            }
            None => false,
        }
    }
}

impl ItemSource for MemoryCatalog {
    fn list(&self) -> &[Luminaire] {
        &self.items
    }
}

impl From<Vec<Luminaire>> for MemoryCatalog {
    fn from(items: Vec<Luminaire>) -> Self {
        Self::new(items)
    }
}

/// Similar luminaires for the item with identifier `id`
///
/// Returns `None` when `id` is not in the source.
pub fn similar_to<'a, S: ItemSource>(
    source: &'a S,
    id: &str,
    mode: SimilarityMode,
    limit: usize,
) -> Option<Vec<Similar<'a, Luminaire>>> {
    let target = source.get(id)?;
    Some(find_similar(mode, target, source.list(), limit))
}
