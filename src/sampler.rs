//! Reproducible sampling primitives.
//!
//! Two operations are exposed:
//! - seeded shuffle-then-slice over the rows of a collection;
//! - subset selection over a set of grouping keys.
//!
//! Seeded draws feed [`DeterministicRng`] (SplitMix64) into `rand`'s slice
//! shuffle and index sampling, so a given seed always yields the same order.

use rand::seq::{SliceRandom, index};
use rand::{Rng, RngCore};
use std::collections::BTreeSet;
use tracing::debug;

use crate::constants::sampler::SPLITMIX_GAMMA;
use crate::data::RecordCollection;
use crate::errors::CorpusError;
use crate::types::GroupKey;

#[derive(Debug, Clone)]
/// Small deterministic RNG used for reproducible corpus sampling.
pub struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    /// Create a generator from an explicit seed.
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64_internal(&mut self) -> u64 {
        let mut z = self.state.wrapping_add(SPLITMIX_GAMMA);
        self.state = z;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        z ^ (z >> 31)
    }
}

impl RngCore for DeterministicRng {
    fn next_u32(&mut self) -> u32 {
        self.next_u64_internal() as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.next_u64_internal()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        let mut offset = 0;
        while offset < dest.len() {
            let value = self.next_u64_internal();
            let bytes = value.to_le_bytes();
            let remaining = dest.len() - offset;
            let copy_len = remaining.min(bytes.len());
            dest[offset..offset + copy_len].copy_from_slice(&bytes[..copy_len]);
            offset += copy_len;
        }
    }
}

/// Full seeded permutation of `0..len`.
pub fn seeded_permutation(len: usize, seed: u64) -> Vec<usize> {
    let mut order: Vec<usize> = (0..len).collect();
    order.shuffle(&mut DeterministicRng::new(seed));
    order
}

/// Reorder every row of `collection` with a seeded permutation.
pub fn shuffle(collection: RecordCollection, seed: u64) -> Result<RecordCollection, CorpusError> {
    let order = seeded_permutation(collection.len(), seed);
    collection.select(&order)
}

/// Permute `collection` with `seed`, then keep the permuted range `[start, end)`.
///
/// `[0, k)` and `[k, len)` taken with the same seed are disjoint and together
/// cover the input.
pub fn shuffle_then_slice(
    collection: RecordCollection,
    seed: u64,
    start: usize,
    end: usize,
) -> Result<RecordCollection, CorpusError> {
    if start > end || end > collection.len() {
        return Err(CorpusError::Configuration(format!(
            "slice {start}..{end} exceeds '{}' ({} rows)",
            collection.name(),
            collection.len()
        )));
    }
    debug!(
        "[corpora:sampler] shuffle-then-slice collection='{}' seed={} range={}..{} of {}",
        collection.name(),
        seed,
        start,
        end,
        collection.len()
    );
    let order = seeded_permutation(collection.len(), seed);
    collection.select(&order[start..end])
}

/// Seed discipline for key-subset draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeySeed {
    /// Reproducible draw from an explicit seed.
    Fixed(u64),
    /// Draw from thread-local entropy; differs between runs.
    Unseeded,
}

/// Draw `count` distinct keys uniformly without replacement using `seed`.
///
/// Keys are taken in sorted order before the draw, so the result depends only
/// on the key set and the seed.
pub fn seeded_key_subset(
    keys: &BTreeSet<GroupKey>,
    seed: u64,
    count: usize,
) -> Result<BTreeSet<GroupKey>, CorpusError> {
    draw_keys(keys, count, &mut DeterministicRng::new(seed))
}

/// Draw `count` distinct keys with the given seed discipline.
pub fn sample_key_subset(
    keys: &BTreeSet<GroupKey>,
    seed: KeySeed,
    count: usize,
) -> Result<BTreeSet<GroupKey>, CorpusError> {
    match seed {
        KeySeed::Fixed(seed) => seeded_key_subset(keys, seed, count),
        KeySeed::Unseeded => draw_keys(keys, count, &mut rand::rng()),
    }
}

fn draw_keys<R: Rng + ?Sized>(
    keys: &BTreeSet<GroupKey>,
    count: usize,
    rng: &mut R,
) -> Result<BTreeSet<GroupKey>, CorpusError> {
    if count > keys.len() {
        return Err(CorpusError::Configuration(format!(
            "cannot draw {count} keys from a domain of {}",
            keys.len()
        )));
    }
    let pool: Vec<&GroupKey> = keys.iter().collect();
    Ok(index::sample(rng, pool.len(), count)
        .into_iter()
        .map(|idx| pool[idx].clone())
        .collect())
}
