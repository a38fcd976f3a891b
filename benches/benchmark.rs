#[macro_use]
extern crate criterion;

extern crate recprep;

use criterion::Criterion;

use recprep::data::{filter_triplets, Interaction, Interactions};
use recprep::split::{seeded_rng, split_fold};

fn synthetic_interactions(num_users: u64, interactions_per_user: u64) -> Interactions {
    let interactions: Vec<Interaction> = (0..num_users)
        .flat_map(|user_id| {
            (0..interactions_per_user).map(move |offset| {
                Interaction::new(user_id, (user_id * 7 + offset) % 500, 5.0)
            })
        })
        .collect();

    Interactions::from(interactions)
}

fn bench_filter_triplets(c: &mut Criterion) {
    c.bench_function("filter_triplets", |b| {
        let interactions = synthetic_interactions(1_000, 10);

        b.iter(|| filter_triplets(interactions.clone(), 5, 5))
    });
}

fn bench_split_fold(c: &mut Criterion) {
    c.bench_function("split_fold", |b| {
        let interactions = synthetic_interactions(1_000, 10);

        b.iter(|| split_fold(&interactions, 0.2, 5, &mut seeded_rng(98765)))
    });
}

criterion_group!(benches, bench_filter_triplets, bench_split_fold);
criterion_main!(benches);
