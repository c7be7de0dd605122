//! Scheduling of providers across the three queues.

use std::collections::BTreeMap;

use primitive_types::U256;
use tracing::debug;

use super::ProviderQueue;
use crate::domain::{Address, ProviderId, ProviderSlot, QueueKind};
use crate::error::{Result, SwapError};
use crate::repository::Repository;
use crate::storage::{decode_u256, encode_u256, Namespace, StorageKey};

/// A provider picked by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledProvider {
    /// Provider id.
    pub id: ProviderId,
    /// Where it was scheduled from.
    pub slot: ProviderSlot,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct OwedEntry {
    owed: U256,
    reserved: U256,
    dirty: bool,
}

/// Owns the normal, priority and removal queues, the BTC-owed ledger of
/// removed providers and the initial provider.
///
/// Precedence when scheduling: removal, then priority, then normal, then
/// the initial provider.
#[derive(Debug, Clone)]
pub struct ProviderManager {
    token: Address,
    strict_minimum: U256,
    normal: ProviderQueue,
    priority: ProviderQueue,
    removal: ProviderQueue,
    initial_provider: Option<ProviderId>,
    owed: BTreeMap<ProviderId, OwedEntry>,
}

impl ProviderManager {
    /// Loads the queues of `token`.
    ///
    /// `strict_minimum` is the satoshi value under which a removal-queue
    /// debt is dust.
    ///
    /// # Errors
    ///
    /// Propagates decoding errors.
    pub fn load(
        repo: &Repository<'_>,
        initial_provider: Option<ProviderId>,
        strict_minimum: u64,
    ) -> Result<Self> {
        let token = repo.token();
        Ok(Self {
            token,
            strict_minimum: U256::from(strict_minimum),
            normal: ProviderQueue::load(repo, &token, QueueKind::Normal)?,
            priority: ProviderQueue::load(repo, &token, QueueKind::Priority)?,
            removal: ProviderQueue::load(repo, &token, QueueKind::Removal)?,
            initial_provider,
            owed: BTreeMap::new(),
        })
    }

    /// The queue of `kind`.
    #[must_use]
    pub const fn queue(&self, kind: QueueKind) -> &ProviderQueue {
        match kind {
            QueueKind::Normal => &self.normal,
            QueueKind::Priority => &self.priority,
            QueueKind::Removal => &self.removal,
        }
    }

    fn queue_mut(&mut self, kind: QueueKind) -> &mut ProviderQueue {
        match kind {
            QueueKind::Normal => &mut self.normal,
            QueueKind::Priority => &mut self.priority,
            QueueKind::Removal => &mut self.removal,
        }
    }

    /// The initial liquidity provider, once the pool exists.
    #[must_use]
    pub const fn initial_provider(&self) -> Option<ProviderId> {
        self.initial_provider
    }

    /// Records the initial liquidity provider.
    pub fn set_initial_provider(&mut self, id: ProviderId) {
        self.initial_provider = Some(id);
    }

    /// Resolves a reservation slot to the provider occupying it.
    ///
    /// Returns `None` for an emptied queue slot.
    #[must_use]
    pub fn resolve(&self, repo: &Repository<'_>, slot: ProviderSlot) -> Option<ProviderId> {
        match slot {
            ProviderSlot::InitialProvider => self.initial_provider,
            ProviderSlot::Queued { kind, index } => self.queue(kind).get(repo, index),
        }
    }

    /// Appends `id` to the queue of `kind` and records the slot on the
    /// provider.
    ///
    /// # Errors
    ///
    /// Propagates queue and repository errors.
    pub fn add_to_queue(
        &mut self,
        repo: &mut Repository<'_>,
        id: ProviderId,
        kind: QueueKind,
    ) -> Result<ProviderSlot> {
        let index = self.queue_mut(kind).push(repo, id)?;
        let slot = ProviderSlot::queued(kind, index);
        repo.provider(id)?.set_slot(Some(slot));
        debug!(provider = %id, %slot, "provider queued");
        Ok(slot)
    }

    /// Forces every queue to be cleaned from its first slot.
    pub fn reset_starting_indexes(&mut self) {
        for kind in QueueKind::ALL {
            self.queue_mut(kind).reset_starting_index();
        }
    }

    /// Advances each queue's watermark past empty and dead slots.
    ///
    /// Liveness: active for the normal and priority queues, pending
    /// removal for the removal queue.
    ///
    /// # Errors
    ///
    /// Propagates repository errors.
    pub fn clean_up_queues(&mut self, repo: &mut Repository<'_>) -> Result<()> {
        self.normal
            .clean_up(repo, |repo, id| Ok(repo.provider(id)?.is_active()))?;
        self.priority
            .clean_up(repo, |repo, id| Ok(repo.provider(id)?.is_active()))?;
        self.removal
            .clean_up(repo, |repo, id| Ok(repo.provider(id)?.is_pending_removal()))?;
        Ok(())
    }

    /// Picks the next provider able to back a reservation.
    ///
    /// Each queue is scanned from this call's cursor. A returned provider
    /// moves the cursor past it, so one call never returns a queued
    /// provider twice. The initial provider is returned whenever it is
    /// active; the caller stops once it has nothing spare.
    ///
    /// # Errors
    ///
    /// [`SwapError::Invariant`] when a queue holds a provider it must not:
    /// a priority entry without the priority flag, a normal entry with it,
    /// a non-LP or dust-debt entry in the removal queue.
    pub fn next_provider_with_liquidity(
        &mut self,
        repo: &mut Repository<'_>,
    ) -> Result<Option<ScheduledProvider>> {
        if let Some(found) = self.next_from_removal_queue(repo)? {
            return Ok(Some(found));
        }
        for kind in [QueueKind::Priority, QueueKind::Normal] {
            if let Some(found) = self.next_from_listing_queue(repo, kind)? {
                return Ok(Some(found));
            }
        }
        if let Some(id) = self.initial_provider {
            if repo.provider(id)?.is_active() {
                return Ok(Some(ScheduledProvider {
                    id,
                    slot: ProviderSlot::InitialProvider,
                }));
            }
        }
        Ok(None)
    }

    fn next_from_listing_queue(
        &mut self,
        repo: &mut Repository<'_>,
        kind: QueueKind,
    ) -> Result<Option<ScheduledProvider>> {
        let queue = self.queue_mut(kind);
        let mut index = queue.cursor().max(queue.starting_index());
        while index < queue.len() {
            let Some(id) = queue.get(repo, index) else {
                index += 1;
                continue;
            };
            let provider = repo.provider(id)?;
            if !provider.is_active() {
                index += 1;
                continue;
            }
            match (kind, provider.is_priority()) {
                (QueueKind::Priority, false) => {
                    return Err(SwapError::Invariant(
                        "priority queue entry without priority flag",
                    ))
                }
                (QueueKind::Normal, true) => {
                    return Err(SwapError::Invariant(
                        "normal queue entry with priority flag",
                    ))
                }
                _ => {}
            }
            if provider.available()? > 0 {
                queue.advance_cursor(index + 1);
                return Ok(Some(ScheduledProvider {
                    id,
                    slot: ProviderSlot::queued(kind, index),
                }));
            }
            queue.note_exhausted(index);
            index += 1;
        }
        queue.advance_cursor(index);
        Ok(None)
    }

    fn next_from_removal_queue(
        &mut self,
        repo: &mut Repository<'_>,
    ) -> Result<Option<ScheduledProvider>> {
        let mut index = self.removal.cursor().max(self.removal.starting_index());
        while index < self.removal.len() {
            let Some(id) = self.removal.get(repo, index) else {
                index += 1;
                continue;
            };
            let provider = repo.provider(id)?;
            if !provider.is_pending_removal() {
                index += 1;
                continue;
            }
            if !provider.is_lp() {
                return Err(SwapError::Invariant("non-LP provider in removal queue"));
            }
            let entry = self.owed_entry(repo, id);
            if entry.owed < self.strict_minimum {
                return Err(SwapError::Invariant(
                    "removal queue provider owed less than the minimum",
                ));
            }
            let left = entry
                .owed
                .checked_sub(entry.reserved)
                .ok_or(SwapError::Invariant("BTC owed below BTC owed reserved"))?;
            if left > self.strict_minimum {
                self.removal.advance_cursor(index + 1);
                return Ok(Some(ScheduledProvider {
                    id,
                    slot: ProviderSlot::queued(QueueKind::Removal, index),
                }));
            }
            self.removal.note_exhausted(index);
            index += 1;
        }
        self.removal.advance_cursor(index);
        Ok(None)
    }

    /// Marks a scheduled provider as passed over without a leg, so its
    /// queue's watermark stays at or below it.
    pub fn note_skipped(&mut self, slot: ProviderSlot) {
        if let ProviderSlot::Queued { kind, index } = slot {
            self.queue_mut(kind).note_exhausted(index);
        }
    }

    /// Takes a non-initial provider out of its queue and zeroes it.
    ///
    /// With `burn`, liquidity still listed is forfeited and returned so the
    /// caller can account for it; without, the provider must hold none.
    ///
    /// # Errors
    ///
    /// [`SwapError::Invariant`] for the initial provider, a provider with
    /// reserved tokens, or unreturned liquidity without `burn`.
    pub fn reset_provider(
        &mut self,
        repo: &mut Repository<'_>,
        id: ProviderId,
        burn: bool,
    ) -> Result<u128> {
        if self.initial_provider == Some(id) {
            return Err(SwapError::Invariant("initial provider cannot be reset"));
        }
        let provider = repo.provider(id)?;
        if provider.reserved() > 0 {
            return Err(SwapError::Invariant("resetting a provider with reserved tokens"));
        }
        if !burn && provider.liquidity() > 0 {
            return Err(SwapError::Invariant("resetting a provider with unreturned liquidity"));
        }
        let slot = provider.slot();
        let remaining = provider.reset();
        if let Some(ProviderSlot::Queued { kind, index }) = slot {
            let queue = self.queue_mut(kind);
            if queue.get(repo, index) == Some(id) {
                queue.clear(repo, index);
            }
        }
        debug!(provider = %id, burned = remaining, "provider reset");
        Ok(remaining)
    }

    /// Drops a removal-queue provider whose remaining debt is dust and
    /// clears its ledger entries.
    ///
    /// # Errors
    ///
    /// Propagates repository errors.
    pub fn evict_from_removal_queue(&mut self, repo: &mut Repository<'_>, id: ProviderId) -> Result<()> {
        let provider = repo.provider(id)?;
        let slot = provider.slot();
        provider.reset();
        if let Some(ProviderSlot::Queued {
            kind: QueueKind::Removal,
            index,
        }) = slot
        {
            if self.removal.get(repo, index) == Some(id) {
                self.removal.clear(repo, index);
            }
        }
        self.set_btc_owed(repo, id, U256::zero());
        self.set_btc_owed_reserved(repo, id, U256::zero());
        debug!(provider = %id, "provider evicted from removal queue");
        Ok(())
    }

    // -- BTC owed ledger ------------------------------------------------------

    fn owed_key(&self, namespace: Namespace, id: ProviderId) -> StorageKey {
        StorageKey::for_token(namespace, &self.token, &id.to_bytes())
    }

    fn owed_entry(&mut self, repo: &Repository<'_>, id: ProviderId) -> OwedEntry {
        if let Some(entry) = self.owed.get(&id) {
            return *entry;
        }
        let entry = OwedEntry {
            owed: decode_u256(&repo.get(&self.owed_key(Namespace::BtcOwed, id))),
            reserved: decode_u256(&repo.get(&self.owed_key(Namespace::BtcOwedReserved, id))),
            dirty: false,
        };
        self.owed.insert(id, entry);
        entry
    }

    /// Satoshis owed to a removed provider.
    pub fn btc_owed(&mut self, repo: &Repository<'_>, id: ProviderId) -> U256 {
        self.owed_entry(repo, id).owed
    }

    /// Satoshis owed to a removed provider that live reservations will pay.
    pub fn btc_owed_reserved(&mut self, repo: &Repository<'_>, id: ProviderId) -> U256 {
        self.owed_entry(repo, id).reserved
    }

    /// Replaces the satoshis owed.
    pub fn set_btc_owed(&mut self, repo: &Repository<'_>, id: ProviderId, value: U256) {
        let mut entry = self.owed_entry(repo, id);
        entry.owed = value;
        entry.dirty = true;
        self.owed.insert(id, entry);
    }

    /// Replaces the satoshis owed but reserved.
    pub fn set_btc_owed_reserved(&mut self, repo: &Repository<'_>, id: ProviderId, value: U256) {
        let mut entry = self.owed_entry(repo, id);
        entry.reserved = value;
        entry.dirty = true;
        self.owed.insert(id, entry);
    }

    /// Persists queue metadata and modified ledger entries.
    ///
    /// # Errors
    ///
    /// Propagates packing errors.
    pub fn save(&mut self, repo: &mut Repository<'_>) -> Result<()> {
        for kind in QueueKind::ALL {
            self.queue_mut(kind).save(repo)?;
        }
        for (id, entry) in &self.owed {
            if entry.dirty {
                repo.set(self.owed_key(Namespace::BtcOwed, *id), encode_u256(entry.owed));
                repo.set(
                    self.owed_key(Namespace::BtcOwedReserved, *id),
                    encode_u256(entry.reserved),
                );
            }
        }
        Ok(())
    }
}
