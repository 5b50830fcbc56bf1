use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, MutexGuard, PoisonError};

const STRIPES: usize = 64;

/// In-process mutual exclusion per artifact key, striped over a fixed set of mutexes
/// picked by key hash. Saves and loads of the same key are serialized; unrelated keys
/// only contend when they share a stripe.
#[derive(Debug)]
pub struct KeyLocks {
    stripes: Vec<Mutex<()>>,
}

impl Default for KeyLocks {
    fn default() -> Self {
        Self {
            stripes: (0..STRIPES).map(|_| Mutex::new(())).collect(),
        }
    }
}

impl KeyLocks {
    /// Blocks until `key` is free. A poisoned stripe is still usable: it only guards
    /// file access, not in-memory state.
    pub fn lock(&self, key: &str) -> MutexGuard<'_, ()> {
        self.stripes[self.stripe(key)]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn stripe(&self, key: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % self.stripes.len() as u64) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_key_maps_to_the_same_stripe() {
        let locks = KeyLocks::default();
        assert_eq!(
            locks.stripe("model_1_food.json"),
            locks.stripe("model_1_food.json")
        );
    }

    #[test]
    fn held_key_blocks_other_holders() {
        let locks = KeyLocks::default();
        let guard = locks.lock("model_1_food.json");
        std::thread::scope(|s| {
            s.spawn(|| {
                let stripe = &locks.stripes[locks.stripe("model_1_food.json")];
                assert!(stripe.try_lock().is_err());
            });
        });
        drop(guard);
        assert!(locks.stripes[locks.stripe("model_1_food.json")].try_lock().is_ok());
    }

    #[test]
    fn many_keys_share_a_fixed_set_of_stripes() {
        let locks = KeyLocks::default();
        for i in 0..10_000 {
            let key = format!("model_{i}_food.json");
            assert!(locks.stripe(&key) < STRIPES);
            drop(locks.lock(&key));
        }
        assert_eq!(locks.stripes.len(), STRIPES);
    }
}
