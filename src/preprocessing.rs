//! The end-to-end preparation pipeline: load, binarize, filter,
//! partition users, split held-out interactions, remap identifiers,
//! and persist the results.
use std::collections::HashSet;
use std::fs::{create_dir_all, remove_dir_all, rename, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use csv;
use failure;
use itertools::Itertools;

use data::{filter_triplets, index_map, remap, Interaction, Interactions, IndexedInteraction};
use split::{seeded_rng, split_fold, split_users};
use {ItemId, UserId};

/// Summary statistics of a finished preprocessing run.
#[derive(Clone, Debug)]
pub struct Summary {
    /// Interactions surviving binarization and filtering.
    pub num_interactions: usize,
    /// Users retained after filtering.
    pub num_users: usize,
    /// Items retained after filtering.
    pub num_items: usize,
    /// Fraction of the user-item matrix with an observed interaction.
    pub sparsity: f64,
}

/// Configuration and entry point for the preparation pipeline.
///
/// Reads `<data_dir>/ratings.csv` and writes the processed files to
/// `<data_dir>/processed/`. All parameters other than the data
/// directory and the rating threshold default to the reference sizing
/// and can be overridden through the builder methods.
#[derive(Clone, Debug)]
pub struct Preprocessor {
    data_dir: PathBuf,
    rating_threshold: f32,
    min_user_interactions: usize,
    min_item_interactions: usize,
    min_heldout_interactions: usize,
    num_heldout_users: usize,
    heldout_proportion: f32,
    seed: u64,
}

impl Preprocessor {
    /// Build a new preprocessor rooted at `data_dir`.
    pub fn new<P: Into<PathBuf>>(data_dir: P, rating_threshold: f32) -> Self {
        Preprocessor {
            data_dir: data_dir.into(),
            rating_threshold,
            min_user_interactions: 5,
            min_item_interactions: 0,
            min_heldout_interactions: 5,
            num_heldout_users: 10_000,
            heldout_proportion: 0.2,
            seed: 98_765,
        }
    }

    /// Set the minimum number of interactions a user must have to be
    /// retained.
    pub fn min_user_interactions(mut self, min_user_interactions: usize) -> Self {
        self.min_user_interactions = min_user_interactions;
        self
    }

    /// Set the minimum number of interactions an item must have to be
    /// retained.
    pub fn min_item_interactions(mut self, min_item_interactions: usize) -> Self {
        self.min_item_interactions = min_item_interactions;
        self
    }

    /// Set the minimum number of interactions a held-out user must have
    /// before part of them is moved to the held-out portion.
    pub fn min_heldout_interactions(mut self, min_heldout_interactions: usize) -> Self {
        self.min_heldout_interactions = min_heldout_interactions;
        self
    }

    /// Set the number of users held out for each of the validation and
    /// test groups.
    pub fn num_heldout_users(mut self, num_heldout_users: usize) -> Self {
        self.num_heldout_users = num_heldout_users;
        self
    }

    /// Set the proportion of a held-out user's interactions moved to
    /// the held-out portion.
    pub fn heldout_proportion(mut self, heldout_proportion: f32) -> Self {
        self.heldout_proportion = heldout_proportion;
        self
    }

    /// Set the random seed governing the user permutation and the
    /// fold-in/held-out draws.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn load(&self) -> Result<Interactions, failure::Error> {
        let mut reader = csv::Reader::from_path(self.data_dir.join("ratings.csv"))?;
        let interactions: Vec<Interaction> =
            reader.deserialize().collect::<Result<Vec<_>, _>>()?;

        Ok(Interactions::from(interactions))
    }

    /// Run the full pipeline and return its summary statistics.
    ///
    /// Output files are staged in `<data_dir>/processed.incomplete/`
    /// and renamed to `<data_dir>/processed/` only once every file has
    /// been written, so a failed run never leaves a partially-written
    /// output directory behind.
    pub fn process(&self) -> Result<Summary, failure::Error> {
        let raw = self.load()?;
        let binarized = raw.binarize(self.rating_threshold);

        let (interactions, user_counts, item_counts) = filter_triplets(
            binarized,
            self.min_user_interactions,
            self.min_item_interactions,
        );

        let sparsity = interactions.len() as f64
            / (user_counts.len() as f64 * item_counts.len() as f64);

        info!(
            "After filtering, there are {} interactions from {} users and {} items (sparsity: {:.3}%)",
            interactions.len(),
            user_counts.len(),
            item_counts.len(),
            100.0 * sparsity
        );

        // Canonical ascending order before the seeded permutation keeps
        // the permutation a pure function of the retained user set.
        let mut user_ids: Vec<UserId> = user_counts.keys().cloned().collect();
        user_ids.sort();

        let user_split =
            split_users(user_ids, self.num_heldout_users, &mut seeded_rng(self.seed))?;

        let train_users: HashSet<UserId> = user_split.train().iter().cloned().collect();
        let train_interactions = interactions.filter(|x| train_users.contains(&x.user_id()));

        // Items unseen during training are excluded everywhere: the
        // item index covers the training partition only.
        let train_items: Vec<ItemId> = train_interactions
            .data()
            .iter()
            .map(|x| x.item_id())
            .unique()
            .collect();

        let item_index = index_map(train_items.iter().cloned());
        let user_index = index_map(user_split.all().iter().cloned());

        let item_set: HashSet<ItemId> = train_items.iter().cloned().collect();

        let validation_users: HashSet<UserId> =
            user_split.validation().iter().cloned().collect();
        let validation_interactions = interactions
            .filter(|x| validation_users.contains(&x.user_id()) && item_set.contains(&x.item_id()));

        let test_users: HashSet<UserId> = user_split.test().iter().cloned().collect();
        let test_interactions = interactions
            .filter(|x| test_users.contains(&x.user_id()) && item_set.contains(&x.item_id()));

        let (validation_fold_in, validation_held_out) = split_fold(
            &validation_interactions,
            self.heldout_proportion,
            self.min_heldout_interactions,
            &mut seeded_rng(self.seed),
        );
        let (test_fold_in, test_held_out) = split_fold(
            &test_interactions,
            self.heldout_proportion,
            self.min_heldout_interactions,
            &mut seeded_rng(self.seed),
        );

        let staging_dir = self.data_dir.join("processed.incomplete");
        let output_dir = self.data_dir.join("processed");

        if staging_dir.exists() {
            remove_dir_all(&staging_dir)?;
        }
        create_dir_all(&staging_dir)?;

        write_item_ids(&staging_dir.join("unique_sid.txt"), &train_items)?;
        write_interactions(
            &staging_dir.join("train.csv"),
            &remap(&train_interactions, &user_index, &item_index)?,
        )?;
        write_interactions(
            &staging_dir.join("validation_tr.csv"),
            &remap(&validation_fold_in, &user_index, &item_index)?,
        )?;
        write_interactions(
            &staging_dir.join("validation_te.csv"),
            &remap(&validation_held_out, &user_index, &item_index)?,
        )?;
        write_interactions(
            &staging_dir.join("test_tr.csv"),
            &remap(&test_fold_in, &user_index, &item_index)?,
        )?;
        write_interactions(
            &staging_dir.join("test_te.csv"),
            &remap(&test_held_out, &user_index, &item_index)?,
        )?;

        if output_dir.exists() {
            remove_dir_all(&output_dir)?;
        }
        rename(&staging_dir, &output_dir)?;

        Ok(Summary {
            num_interactions: interactions.len(),
            num_users: user_counts.len(),
            num_items: item_counts.len(),
            sparsity,
        })
    }
}

fn write_item_ids(path: &Path, item_ids: &[ItemId]) -> Result<(), failure::Error> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    for item_id in item_ids {
        writeln!(writer, "{}", item_id)?;
    }
    writer.flush()?;

    Ok(())
}

fn write_interactions(
    path: &Path,
    interactions: &[IndexedInteraction],
) -> Result<(), failure::Error> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;

    writer.write_record(&["uid", "sid"])?;
    for interaction in interactions {
        writer.serialize(interaction)?;
    }
    writer.flush()?;

    Ok(())
}
