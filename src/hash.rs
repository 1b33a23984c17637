use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

fn stable_hash_with(f: impl FnOnce(&mut DefaultHasher)) -> u64 {
    let mut hasher = DefaultHasher::new();
    f(&mut hasher);
    hasher.finish()
}

/// Hash `(partition label, ordered keys)` groups into one membership value.
pub fn membership_fingerprint<'a, I>(partitions: I) -> u64
where
    I: IntoIterator<Item = (&'a str, Vec<String>)>,
{
    stable_hash_with(|hasher| {
        for (label, keys) in partitions {
            label.hash(hasher);
            keys.len().hash(hasher);
            for key in &keys {
                key.hash(hasher);
            }
        }
    })
}
