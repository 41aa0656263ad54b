//! Owner map
//!
//! Deterministic mapping from a transaction hash to the ordered set of
//! mintette indices responsible for it. The selection rule is part of the
//! protocol and must be identical on the bank and every mintette.

use crate::constants::OWNER_FANOUT;
use crate::MintetteId;
use rscoin_crypto::{hash_value, Hash};

/// Ordered owner set for `tx_hash` in a roster of `n_mintettes`.
///
/// Draws indices from `SHA-256(tx_hash, counter) mod n`, skipping
/// collisions, until the fan-out target is met. Non-empty whenever the
/// roster is.
pub fn owners(n_mintettes: usize, tx_hash: &Hash) -> Vec<MintetteId> {
    if n_mintettes == 0 {
        return Vec::new();
    }

    let target = OWNER_FANOUT.min(n_mintettes);
    let mut selected = Vec::with_capacity(target);
    let mut counter: u64 = 0;

    while selected.len() < target {
        let digest = hash_value(&(tx_hash, counter));
        let raw = u64::from_le_bytes(
            digest.as_bytes()[..8]
                .try_into()
                .expect("digest is at least 8 bytes"),
        );
        let index = (raw % n_mintettes as u64) as MintetteId;

        if !selected.contains(&index) {
            selected.push(index);
        }
        counter += 1;
    }

    selected
}

pub fn is_owner(n_mintettes: usize, tx_hash: &Hash, id: MintetteId) -> bool {
    owners(n_mintettes, tx_hash).contains(&id)
}

/// Votes required for a strict majority of `owner_count` owners.
pub fn majority(owner_count: usize) -> usize {
    owner_count / 2 + 1
}
