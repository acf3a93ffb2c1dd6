//! Match policies: turn a query embedding into a gallery label decision.

use crate::gallery::Gallery;
use crate::types::{Embedding, GalleryEntry};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default maximum Euclidean distance for two faces to count as the same identity.
pub const DEFAULT_TOLERANCE: f32 = 0.6;

/// A gallery entry within tolerance of a query.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'g> {
    /// Position of the entry in gallery insertion order.
    pub index: usize,
    pub entry: &'g GalleryEntry,
    pub distance: f32,
}

impl<'g> Candidate<'g> {
    pub fn label(&self) -> &'g str {
        &self.entry.label
    }
}

/// Strategy for comparing a query embedding against the gallery.
///
/// A candidate is any entry with `distance <= tolerance` and the same
/// dimensionality as the query. Implementations must not mutate anything.
pub trait Matcher {
    fn find<'g>(&self, query: &Embedding, gallery: &'g Gallery, tolerance: f32)
        -> Option<Candidate<'g>>;
}

fn candidates<'q, 'g: 'q>(
    query: &'q Embedding,
    gallery: &'g Gallery,
    tolerance: f32,
) -> impl Iterator<Item = Candidate<'g>> + 'q {
    gallery
        .entries()
        .iter()
        .enumerate()
        .filter(move |(_, entry)| entry.embedding.dim() == query.dim())
        .filter_map(move |(index, entry)| {
            let distance = query.euclidean_distance(&entry.embedding);
            (distance <= tolerance).then_some(Candidate {
                index,
                entry,
                distance,
            })
        })
}

/// First entry within tolerance, in gallery insertion order.
///
/// Stops at the first candidate: a closer entry later in the gallery never
/// wins, even when it carries a different label.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstMatch;

impl Matcher for FirstMatch {
    fn find<'g>(
        &self,
        query: &Embedding,
        gallery: &'g Gallery,
        tolerance: f32,
    ) -> Option<Candidate<'g>> {
        candidates(query, gallery, tolerance).next()
    }
}

/// Closest entry within tolerance. Exact ties go to the earlier entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct Nearest;

impl Matcher for Nearest {
    fn find<'g>(
        &self,
        query: &Embedding,
        gallery: &'g Gallery,
        tolerance: f32,
    ) -> Option<Candidate<'g>> {
        candidates(query, gallery, tolerance).fold(None, |best, c| match best {
            Some(b) if b.distance <= c.distance => Some(b),
            _ => Some(c),
        })
    }
}

/// Configurable selection between the match policies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    #[default]
    First,
    Nearest,
}

impl Matcher for MatchPolicy {
    fn find<'g>(
        &self,
        query: &Embedding,
        gallery: &'g Gallery,
        tolerance: f32,
    ) -> Option<Candidate<'g>> {
        match self {
            MatchPolicy::First => FirstMatch.find(query, gallery, tolerance),
            MatchPolicy::Nearest => Nearest.find(query, gallery, tolerance),
        }
    }
}

impl FromStr for MatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(MatchPolicy::First),
            "nearest" => Ok(MatchPolicy::Nearest),
            other => Err(format!("unknown match policy {other:?} (expected first|nearest)")),
        }
    }
}

impl fmt::Display for MatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MatchPolicy::First => "first",
            MatchPolicy::Nearest => "nearest",
        })
    }
}

/// Label of the first gallery entry within `tolerance` of `query`.
pub fn match_label<'g>(query: &Embedding, gallery: &'g Gallery, tolerance: f32) -> Option<&'g str> {
    FirstMatch.find(query, gallery, tolerance).map(|c| c.label())
}
