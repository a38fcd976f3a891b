#![deny(missing_docs)]
//! # recprep
//!
//! `recprep` turns raw explicit-feedback rating logs into the flat
//! train/validation/test files consumed by implicit-feedback recommender
//! models. Ratings are binarized by a threshold, sparse users and items
//! are filtered out, users are partitioned into train/validation/test
//! groups, each held-out user's interactions are re-split into a fold-in
//! and a held-out portion, and raw identifiers are remapped to dense
//! integer indices before everything is written out.
//!
//! ## Example
//! Given a directory containing a `ratings.csv` file, the whole pipeline
//! runs in one call:
//!
//! ```no_run
//! # extern crate recprep;
//! use recprep::preprocessing::Preprocessor;
//!
//! let summary = Preprocessor::new("/data/ml-20m", 3.5)
//!     .num_heldout_users(10_000)
//!     .seed(98765)
//!     .process()
//!     .unwrap();
//!
//! println!(
//!     "{} interactions from {} users and {} items",
//!     summary.num_interactions, summary.num_users, summary.num_items
//! );
//! ```
//!
//! The run is deterministic: the same input file and seed produce
//! byte-identical output files.
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;

extern crate csv;
extern crate itertools;
extern crate rand;
extern crate serde;

#[cfg(test)]
extern crate tempfile;

pub mod data;
pub mod preprocessing;
pub mod split;

/// Alias for raw user identifiers as they appear in the input file.
pub type UserId = u64;
/// Alias for raw item identifiers as they appear in the input file.
pub type ItemId = u64;
/// Alias for dense user indices assigned during preprocessing.
pub type UserIdx = usize;
/// Alias for dense item indices assigned during preprocessing.
pub type ItemIdx = usize;

/// Preprocessing error types.
#[derive(Debug, Fail)]
pub enum PreprocessingError {
    /// Too few users survived filtering to carve out the requested
    /// validation and test groups.
    #[fail(
        display = "cannot hold out 2 x {} users out of {} retained users",
        requested, retained
    )]
    NotEnoughUsers {
        /// Number of users requested for each held-out group.
        requested: usize,
        /// Number of users that survived filtering.
        retained: usize,
    },
    /// A user identifier was missing from the user index.
    #[fail(display = "user id {} missing from the user index", _0)]
    UnknownUser(UserId),
    /// An item identifier was missing from the item index.
    #[fail(display = "item id {} missing from the item index", _0)]
    UnknownItem(ItemId),
}
