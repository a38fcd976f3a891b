//! Deterministic user partitioning and per-user fold-in/held-out
//! splitting.
use itertools::Itertools;
use rand::seq::sample_indices;
use rand::{Rng, SeedableRng, XorShiftRng};

use data::Interactions;
use {PreprocessingError, UserId};

/// Build the deterministic generator used by the split operations.
///
/// Each logical split operation gets its own generator, constructed
/// locally from the configured seed: streams are never shared between
/// operations, so individual stages stay reproducible in isolation.
pub fn seeded_rng(seed: u64) -> XorShiftRng {
    let mut seed_bytes = [0; 16];
    seed_bytes[..8].copy_from_slice(&seed.to_le_bytes());
    seed_bytes[8..].copy_from_slice(&seed.wrapping_mul(0x9E37_79B9_7F4A_7C15).to_le_bytes());

    XorShiftRng::from_seed(seed_bytes)
}

/// Retained users permuted and partitioned into train, validation and
/// test groups.
///
/// The groups are pairwise disjoint and together cover the whole
/// permuted sequence: train takes all but the last `2 * n_heldout`
/// users, validation the next `n_heldout`, test the final `n_heldout`.
#[derive(Clone, Debug)]
pub struct UserSplit {
    users: Vec<UserId>,
    n_heldout: usize,
}

impl UserSplit {
    /// All retained users, in permutation order.
    pub fn all(&self) -> &[UserId] {
        &self.users
    }

    /// The training users.
    pub fn train(&self) -> &[UserId] {
        &self.users[..self.users.len() - 2 * self.n_heldout]
    }

    /// The validation users.
    pub fn validation(&self) -> &[UserId] {
        let num_users = self.users.len();

        &self.users[(num_users - 2 * self.n_heldout)..(num_users - self.n_heldout)]
    }

    /// The test users.
    pub fn test(&self) -> &[UserId] {
        &self.users[(self.users.len() - self.n_heldout)..]
    }
}

/// Permute `users` with `rng`, then partition the permuted sequence
/// into train, validation and test groups of `n_heldout` users each
/// for validation and test.
///
/// Fails when fewer than `2 * n_heldout + 1` users are supplied; the
/// caller is responsible for running on data of sufficient scale.
pub fn split_users<R: Rng>(
    mut users: Vec<UserId>,
    n_heldout: usize,
    rng: &mut R,
) -> Result<UserSplit, PreprocessingError> {
    if users.len() <= 2 * n_heldout {
        return Err(PreprocessingError::NotEnoughUsers {
            requested: n_heldout,
            retained: users.len(),
        });
    }

    rng.shuffle(&mut users);

    Ok(UserSplit {
        users,
        n_heldout,
    })
}

/// Split each user's interactions into a fold-in and a held-out
/// portion.
///
/// Users are visited in ascending raw-identifier order, with original
/// row order preserved inside each group, so the single random stream
/// is consumed in a well-defined order and the output is reproducible.
/// For a user with at least `min_interactions` rows,
/// `floor(heldout_proportion * n)` rows are drawn without replacement
/// into the held-out table; smaller users contribute all their rows to
/// the fold-in table.
pub fn split_fold<R: Rng>(
    interactions: &Interactions,
    heldout_proportion: f32,
    min_interactions: usize,
    rng: &mut R,
) -> (Interactions, Interactions) {
    let data = interactions.data();

    let mut order: Vec<usize> = (0..data.len()).collect();
    order.sort_by_key(|&idx| data[idx].user_id());

    let mut fold_in = Vec::new();
    let mut held_out = Vec::new();

    let groups = order.into_iter().group_by(|&idx| data[idx].user_id());

    for (processed, (_, group)) in (&groups).into_iter().enumerate() {
        let rows: Vec<usize> = group.collect();

        if rows.len() >= min_interactions {
            let num_heldout = (heldout_proportion * rows.len() as f32) as usize;

            let mut is_heldout = vec![false; rows.len()];
            for drawn in sample_indices(rng, rows.len(), num_heldout) {
                is_heldout[drawn] = true;
            }

            for (&row, &heldout) in rows.iter().zip(&is_heldout) {
                if heldout {
                    held_out.push(data[row].clone());
                } else {
                    fold_in.push(data[row].clone());
                }
            }
        } else {
            fold_in.extend(rows.iter().map(|&row| data[row].clone()));
        }

        if processed % 1000 == 0 {
            info!("{} users sampled", processed);
        }
    }

    (Interactions::from(fold_in), Interactions::from(held_out))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use data::Interaction;

    fn interactions_for(rows: &[(u64, u64)]) -> Interactions {
        Interactions::from(
            rows.iter()
                .map(|&(user_id, item_id)| Interaction::new(user_id, item_id, 5.0))
                .collect::<Vec<_>>(),
        )
    }

    fn pairs(interactions: &Interactions) -> Vec<(u64, u64)> {
        interactions
            .data()
            .iter()
            .map(|x| (x.user_id(), x.item_id()))
            .collect()
    }

    #[test]
    fn split_users_is_disjoint_and_exhaustive() {
        let users: Vec<u64> = (0..100).collect();

        let split = split_users(users.clone(), 10, &mut seeded_rng(98765)).unwrap();

        assert_eq!(split.train().len(), 80);
        assert_eq!(split.validation().len(), 10);
        assert_eq!(split.test().len(), 10);

        let mut recovered: Vec<u64> = split
            .train()
            .iter()
            .chain(split.validation())
            .chain(split.test())
            .cloned()
            .collect();
        recovered.sort();

        assert_eq!(recovered, users);
    }

    #[test]
    fn split_users_is_deterministic() {
        let users: Vec<u64> = (0..500).collect();

        let first = split_users(users.clone(), 50, &mut seeded_rng(98765)).unwrap();
        let second = split_users(users.clone(), 50, &mut seeded_rng(98765)).unwrap();
        let other_seed = split_users(users, 50, &mut seeded_rng(42)).unwrap();

        assert_eq!(first.all(), second.all());
        assert_ne!(first.all(), other_seed.all());
    }

    #[test]
    fn split_users_rejects_too_few_users() {
        let users: Vec<u64> = (0..20).collect();

        match split_users(users, 10, &mut seeded_rng(98765)) {
            Err(PreprocessingError::NotEnoughUsers {
                requested: 10,
                retained: 20,
            }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn split_fold_holds_out_the_configured_proportion() {
        // Twelve interactions: floor(0.2 * 12) = 2 held out.
        let rows: Vec<(u64, u64)> = (0..12).map(|item_id| (1, item_id)).collect();
        let interactions = interactions_for(&rows);

        let (fold_in, held_out) =
            split_fold(&interactions, 0.2, 5, &mut seeded_rng(98765));

        assert_eq!(held_out.len(), 2);
        assert_eq!(fold_in.len(), 10);
    }

    #[test]
    fn split_fold_conserves_interactions_per_user() {
        let mut rows = Vec::new();
        for user_id in 0..20 {
            for item_id in 0..(5 + user_id % 7) {
                rows.push((user_id, item_id));
            }
        }
        let interactions = interactions_for(&rows);

        let (fold_in, held_out) =
            split_fold(&interactions, 0.2, 5, &mut seeded_rng(98765));

        assert_eq!(fold_in.len() + held_out.len(), interactions.len());

        let mut recombined: Vec<(u64, u64)> = pairs(&fold_in);
        recombined.extend(pairs(&held_out));
        recombined.sort();

        let mut expected = rows.clone();
        expected.sort();

        assert_eq!(recombined, expected);

        let totals = interactions.user_counts();
        let mut split_totals: HashMap<u64, usize> = HashMap::new();
        for (user_id, _) in recombined {
            *split_totals.entry(user_id).or_insert(0) += 1;
        }

        assert_eq!(totals, split_totals);
    }

    #[test]
    fn split_fold_keeps_small_users_in_fold_in() {
        let interactions =
            interactions_for(&[(1, 10), (1, 11), (1, 12), (1, 13), (2, 10), (2, 11)]);

        let (fold_in, held_out) =
            split_fold(&interactions, 0.2, 5, &mut seeded_rng(98765));

        assert_eq!(fold_in.len(), 6);
        assert!(held_out.is_empty());
    }

    #[test]
    fn split_fold_is_deterministic() {
        let mut rows = Vec::new();
        for user_id in 0..50 {
            for item_id in 0..10 {
                rows.push((user_id, item_id));
            }
        }
        let interactions = interactions_for(&rows);

        let (first_tr, first_te) = split_fold(&interactions, 0.2, 5, &mut seeded_rng(98765));
        let (second_tr, second_te) = split_fold(&interactions, 0.2, 5, &mut seeded_rng(98765));

        assert_eq!(pairs(&first_tr), pairs(&second_tr));
        assert_eq!(pairs(&first_te), pairs(&second_te));
    }

    #[test]
    fn split_fold_visits_users_in_ascending_order() {
        let interactions = interactions_for(&[
            (3, 10),
            (1, 10),
            (2, 10),
            (1, 11),
            (3, 11),
            (2, 11),
        ]);

        let (fold_in, _) = split_fold(&interactions, 0.2, 5, &mut seeded_rng(98765));

        let user_ids: Vec<u64> = fold_in.data().iter().map(|x| x.user_id()).collect();
        assert_eq!(user_ids, vec![1, 1, 2, 2, 3, 3]);
    }
}
