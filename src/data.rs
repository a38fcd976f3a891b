//! The interaction table and the transformations applied to it:
//! binarization, sparsity filtering, and dense index remapping.
use std::collections::HashMap;

use super::{ItemId, ItemIdx, PreprocessingError, UserId, UserIdx};

/// A single rating event read from the raw input file.
///
/// Raw identifiers are opaque and non-contiguous; any extra input
/// columns (timestamps in particular) are ignored at deserialization
/// time. A record is immutable once read.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Interaction {
    #[serde(rename = "userId")]
    user_id: UserId,
    #[serde(rename = "movieId")]
    item_id: ItemId,
    rating: f32,
}

impl Interaction {
    /// Build a new interaction.
    pub fn new(user_id: UserId, item_id: ItemId, rating: f32) -> Self {
        Interaction {
            user_id,
            item_id,
            rating,
        }
    }

    /// The raw user identifier.
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// The raw item identifier.
    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    /// The rating value.
    pub fn rating(&self) -> f32 {
        self.rating
    }
}

/// An in-memory table of interactions.
///
/// Row order is preserved by every transformation, making the whole
/// pipeline deterministic given a fixed input order and seed.
#[derive(Clone, Debug, Default)]
pub struct Interactions {
    interactions: Vec<Interaction>,
}

impl Interactions {
    /// Return the underlying records.
    pub fn data(&self) -> &[Interaction] {
        &self.interactions
    }

    /// Number of interactions in the table.
    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    /// True if the table holds no interactions.
    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }

    /// Return a new table containing the interactions satisfying `func`,
    /// in their original order.
    pub fn filter<F: Fn(&Interaction) -> bool>(&self, func: F) -> Self {
        Interactions {
            interactions: self
                .interactions
                .iter()
                .filter(|x| func(x))
                .cloned()
                .collect(),
        }
    }

    /// Retain only interactions whose rating is strictly greater than
    /// `threshold`, turning graded ratings into an implicit positive
    /// signal. Retained rows are unchanged.
    pub fn binarize(&self, threshold: f32) -> Self {
        self.filter(|x| x.rating() > threshold)
    }

    /// Number of interactions attributed to each user.
    pub fn user_counts(&self) -> HashMap<UserId, usize> {
        count_by(&self.interactions, |x| x.user_id())
    }

    /// Number of interactions attributed to each item.
    pub fn item_counts(&self) -> HashMap<ItemId, usize> {
        count_by(&self.interactions, |x| x.item_id())
    }
}

impl From<Vec<Interaction>> for Interactions {
    fn from(interactions: Vec<Interaction>) -> Self {
        Interactions {
            interactions,
        }
    }
}

fn count_by<F: Fn(&Interaction) -> u64>(
    interactions: &[Interaction],
    key: F,
) -> HashMap<u64, usize> {
    let mut counts = HashMap::new();

    for interaction in interactions {
        *counts.entry(key(interaction)).or_insert(0) += 1;
    }

    counts
}

/// Drop interactions belonging to sparse items and users.
///
/// Items with fewer than `min_item_count` interactions are dropped
/// first (when the threshold is positive), then users with fewer than
/// `min_user_count` interactions, with counts recomputed on the table
/// as of each step. Because item filtering runs before user filtering,
/// a small fraction of items can end up below `min_item_count` again
/// once sparse users are gone; the final counts returned here are the
/// ones recomputed on the fully filtered table.
pub fn filter_triplets(
    interactions: Interactions,
    min_user_count: usize,
    min_item_count: usize,
) -> (Interactions, HashMap<UserId, usize>, HashMap<ItemId, usize>) {
    let mut interactions = interactions;

    if min_item_count > 0 {
        let item_counts = interactions.item_counts();
        interactions = interactions.filter(|x| item_counts[&x.item_id()] >= min_item_count);
    }

    if min_user_count > 0 {
        let user_counts = interactions.user_counts();
        interactions = interactions.filter(|x| user_counts[&x.user_id()] >= min_user_count);
    }

    let user_counts = interactions.user_counts();
    let item_counts = interactions.item_counts();

    (interactions, user_counts, item_counts)
}

/// Assign dense indices to `ids` in iteration order.
///
/// Callers pass sequences that are already deduplicated: the permuted
/// retained-user sequence, or the first-appearance item sequence of the
/// training partition.
pub fn index_map<I: IntoIterator<Item = u64>>(ids: I) -> HashMap<u64, usize> {
    ids.into_iter().enumerate().map(|(idx, id)| (id, idx)).collect()
}

/// An interaction with raw identifiers replaced by dense indices.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct IndexedInteraction {
    uid: UserIdx,
    sid: ItemIdx,
}

impl IndexedInteraction {
    /// The dense user index.
    pub fn uid(&self) -> UserIdx {
        self.uid
    }

    /// The dense item index.
    pub fn sid(&self) -> ItemIdx {
        self.sid
    }
}

/// Replace raw identifiers with their dense indices, preserving row
/// order.
///
/// Every identifier in the table must be present in the relevant map;
/// a missing entry means an upstream filtering invariant was violated
/// and aborts the run.
pub fn remap(
    interactions: &Interactions,
    user_index: &HashMap<UserId, UserIdx>,
    item_index: &HashMap<ItemId, ItemIdx>,
) -> Result<Vec<IndexedInteraction>, PreprocessingError> {
    interactions
        .data()
        .iter()
        .map(|x| {
            let uid = *user_index
                .get(&x.user_id())
                .ok_or_else(|| PreprocessingError::UnknownUser(x.user_id()))?;
            let sid = *item_index
                .get(&x.item_id())
                .ok_or_else(|| PreprocessingError::UnknownItem(x.item_id()))?;

            Ok(IndexedInteraction {
                uid,
                sid,
            })
        })
        .collect()
}
