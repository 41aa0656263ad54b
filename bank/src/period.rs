//! Bank period engine
//!
//! Closes a period: validates every mintette's reply, merges their local
//! blocks by strict owner majority, mints the emission, publishes the next
//! higher-level block and redistributes UTXO slices to mintettes whose
//! ownership assignments changed.

use crate::error::{BankError, Result};
use crate::storage::BankState;
use rscoin_core::{
    check_action_log, check_lblock, emission_hash, majority, owners, ActionLogEntry,
    ActionLogItem, AddrId, Address, Coin, HBlock, MintetteId, NewPeriodData, NewPeriodPayload,
    PeriodId, PeriodResult, Transaction, Utxo, EVICTION_THRESHOLD, PERIOD_EMISSION,
};
use rscoin_crypto::{Hash, KeyPair};
use std::collections::{BTreeMap, BTreeSet};

/// Close the current period from the polled results (`None` = unreachable
/// or corrupt) and produce one announcement per mintette of the new roster.
pub fn start_new_period(
    state: &mut BankState,
    keypair: &KeyPair,
    results: Vec<Option<PeriodResult>>,
) -> Result<Vec<NewPeriodData>> {
    if results.len() != state.mintettes.len() {
        return Err(BankError::InconsistentResponse);
    }

    // Validate each reply; any failure drops that mintette's entire result.
    let mut accepted: Vec<Option<PeriodResult>> = Vec::with_capacity(results.len());
    let mut new_heads: Vec<Option<Hash>> = Vec::with_capacity(results.len());
    for (id, result) in results.into_iter().enumerate() {
        let validated = result.and_then(|result| match check_result(state, id, &result) {
            Ok(head) => Some((result, head)),
            Err(e) => {
                log::warn!("dropping period result from mintette {}: {}", id, e);
                None
            }
        });
        match validated {
            Some((result, head)) => {
                accepted.push(Some(result));
                new_heads.push(Some(head));
            }
            None => {
                accepted.push(None);
                new_heads.push(None);
            }
        }
    }

    let accepted_ids: Vec<MintetteId> = accepted
        .iter()
        .enumerate()
        .filter_map(|(id, r)| r.as_ref().map(|_| id))
        .collect();

    let closing_period = state.period_id;
    let emission = allocate_coins(
        state,
        Address(keypair.public_key()),
        closing_period,
        &accepted_ids,
    )?;
    let survivors = merge_transactions(state, &accepted);

    // Merge pending registrations first so the new block carries the live map.
    let pending = std::mem::take(&mut state.pending_addresses);
    state.addresses.extend(pending);

    let mut block_transactions = vec![emission];
    block_transactions.extend(survivors);
    let new_block = HBlock::create(
        keypair,
        state.last_hblock().hash(),
        block_transactions,
        state.addresses.clone(),
    );

    let changed = update_mintettes(state, keypair, &accepted, &new_heads);

    for tx in &new_block.transactions {
        for addr_id in &tx.inputs {
            state.utxo.remove(addr_id);
        }
        for (addr_id, address) in tx.output_addr_ids() {
            state.utxo.insert(addr_id, address);
        }
    }

    state.period_id += 1;
    state.blocks.insert(0, new_block.clone());
    state.emission_hashes.insert(0, emission_hash(closing_period));

    let payloads = form_payload(state, &changed);

    let npds = (0..state.mintettes.len())
        .map(|id| NewPeriodData {
            period_id: state.period_id,
            mintettes: state.mintettes.clone(),
            last_hblock: new_block.clone(),
            payload: payloads.get(&id).map(|utxo| NewPeriodPayload {
                mintette_id: id,
                utxo: utxo.clone(),
                addresses: state.addresses.clone(),
            }),
            dpk: state.dpk.clone(),
        })
        .collect();

    log::info!(
        "period {} closed: {} of {} results accepted, block carries {} transactions",
        closing_period,
        accepted_ids.len(),
        accepted.len(),
        new_block.transactions.len()
    );

    Ok(npds)
}

/// Announcements that put the whole current roster to work on the current
/// period, each with its full UTXO slice. Used at startup, before any
/// period has been closed on this roster.
pub fn bootstrap_announcements(state: &BankState) -> Vec<NewPeriodData> {
    let all_ids: Vec<MintetteId> = (0..state.mintettes.len()).collect();
    let payloads = form_payload(state, &all_ids);

    all_ids
        .into_iter()
        .map(|id| NewPeriodData {
            period_id: state.period_id,
            mintettes: state.mintettes.clone(),
            last_hblock: state.last_hblock().clone(),
            payload: payloads.get(&id).map(|utxo| NewPeriodPayload {
                mintette_id: id,
                utxo: utxo.clone(),
                addresses: state.addresses.clone(),
            }),
            dpk: state.dpk.clone(),
        })
        .collect()
}

/// Accept a period result iff it is for the expected period, its action log
/// chains from the stored head, and every local block checks out against
/// its epoch slice of the log.
fn check_result(state: &BankState, id: MintetteId, result: &PeriodResult) -> Result<Hash> {
    if result.period_id != state.period_id {
        return Err(BankError::BadPeriodResult(id));
    }

    let prior_head = state
        .log_heads
        .get(id)
        .copied()
        .ok_or_else(|| BankError::UnknownMintette(id.to_string()))?;
    let new_head = check_action_log(&prior_head, &result.action_log)
        .map_err(|_| BankError::BadPeriodResult(id))?;

    // One epoch slice per close entry, in order.
    let mut slices: Vec<&[ActionLogItem]> = Vec::new();
    let mut start = 0usize;
    for (i, item) in result.action_log.iter().enumerate() {
        if matches!(item.entry, ActionLogEntry::CloseEpoch { .. }) {
            slices.push(&result.action_log[start..=i]);
            start = i + 1;
        }
    }
    if slices.len() != result.lblocks.len() {
        return Err(BankError::BadPeriodResult(id));
    }

    let key = state.mintette_key(id)?;
    let prev_hblock = state.last_hblock().hash();
    for (slice, block) in slices.iter().zip(&result.lblocks) {
        check_lblock(key, &prev_hblock, slice, block)
            .map_err(|_| BankError::BadPeriodResult(id))?;
    }

    Ok(new_head)
}

/// The synthetic emission transaction: half the period emission to the
/// bank plus the integer remainder, the other half split evenly across the
/// accepted mintettes, ordered by their global id.
fn allocate_coins(
    state: &BankState,
    bank_address: Address,
    period_id: PeriodId,
    accepted: &[MintetteId],
) -> Result<Transaction> {
    let share = if accepted.is_empty() {
        0
    } else {
        (PERIOD_EMISSION / 2) / accepted.len() as u64
    };
    let bank_reward = PERIOD_EMISSION - share * accepted.len() as u64;

    let mut outputs = vec![(bank_address, Coin::from_units(bank_reward))];
    for &id in accepted {
        outputs.push((Address(*state.mintette_key(id)?), Coin::from_units(share)));
    }

    Ok(Transaction {
        inputs: vec![AddrId {
            tx_hash: emission_hash(period_id),
            index: 0,
            value: Coin::from_units(PERIOD_EMISSION),
        }],
        outputs,
    })
}

/// A transaction survives iff a strict majority of its owners committed it.
/// Survivors come out in canonical order, by transaction hash.
fn merge_transactions(state: &BankState, accepted: &[Option<PeriodResult>]) -> Vec<Transaction> {
    let n = state.mintettes.len();

    let mut tx_map: BTreeMap<Hash, (Transaction, BTreeSet<MintetteId>)> = BTreeMap::new();
    for (id, result) in accepted.iter().enumerate() {
        let Some(result) = result else { continue };
        for block in &result.lblocks {
            for tx in &block.transactions {
                tx_map
                    .entry(tx.hash())
                    .or_insert_with(|| (tx.clone(), BTreeSet::new()))
                    .1
                    .insert(id);
            }
        }
    }

    tx_map
        .into_iter()
        .filter(|(tx_hash, (_, committers))| {
            let owner_set = owners(n, tx_hash);
            let votes = owner_set
                .iter()
                .filter(|owner| committers.contains(*owner))
                .count();
            votes >= majority(owner_set.len())
        })
        .map(|(_, (tx, _))| tx)
        .collect()
}

/// Penalize silent mintettes, evict repeat offenders, admit the pending
/// ones, and re-sign the delegation keys. Returns the ids whose ownership
/// assignments changed.
fn update_mintettes(
    state: &mut BankState,
    keypair: &KeyPair,
    accepted: &[Option<PeriodResult>],
    new_heads: &[Option<Hash>],
) -> Vec<MintetteId> {
    let old_mintettes = state.mintettes.clone();
    let old_keys = state.mintette_keys.clone();

    let mut mintettes = Vec::new();
    let mut keys = Vec::new();
    let mut counts = Vec::new();
    let mut heads = Vec::new();

    for id in 0..old_mintettes.len() {
        let failures = if accepted[id].is_some() {
            0
        } else {
            state.failure_counts[id] + 1
        };
        if failures >= EVICTION_THRESHOLD {
            log::info!(
                "evicting mintette {} after {} consecutive failures",
                old_mintettes[id],
                failures
            );
            continue;
        }
        mintettes.push(old_mintettes[id].clone());
        keys.push(old_keys[id]);
        counts.push(failures);
        heads.push(new_heads[id].unwrap_or(state.log_heads[id]));
    }

    for (mintette, key) in std::mem::take(&mut state.pending_mintettes) {
        log::info!("admitting mintette {}", mintette);
        mintettes.push(mintette);
        keys.push(key);
        counts.push(0);
        heads.push(Hash::zero());
    }

    // Owner sets depend on the roster size, so any resize moves everyone.
    let changed: Vec<MintetteId> = if mintettes == old_mintettes && keys == old_keys {
        Vec::new()
    } else if mintettes.len() != old_mintettes.len() {
        (0..mintettes.len()).collect()
    } else {
        (0..mintettes.len())
            .filter(|&id| mintettes[id] != old_mintettes[id] || keys[id] != old_keys[id])
            .collect()
    };

    state.mintettes = mintettes;
    state.mintette_keys = keys;
    state.failure_counts = counts;
    state.log_heads = heads;
    state.dpk = state
        .mintette_keys
        .iter()
        .map(|pk| (*pk, keypair.sign_value(pk)))
        .collect();

    changed
}

/// Restrict the global UTXO to what each changed mintette now owns.
fn form_payload(state: &BankState, changed: &[MintetteId]) -> BTreeMap<MintetteId, Utxo> {
    let n = state.mintettes.len();

    let mut payloads: BTreeMap<MintetteId, Utxo> =
        changed.iter().map(|&id| (id, Utxo::new())).collect();
    for (addr_id, address) in &state.utxo {
        for owner in owners(n, &addr_id.tx_hash) {
            if let Some(slice) = payloads.get_mut(&owner) {
                slice.insert(*addr_id, *address);
            }
        }
    }
    payloads
}
