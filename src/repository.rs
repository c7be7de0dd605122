//! Request-scoped cache of providers and reservations.
//!
//! A [`Repository`] lives for exactly one call. The first reference to a
//! provider or reservation loads it from storage; later references within
//! the call observe the same mutable instance. [`Repository::flush`] writes
//! every cached record into the call's [`StorageTransaction`], and
//! [`Repository::into_writes`] hands the buffered writes to the caller,
//! which applies them only if the call succeeded.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::domain::{Address, ProviderId, ReservationId};
use crate::error::Result;
use crate::provider::Provider;
use crate::reservation::Reservation;
use crate::storage::{StorageKey, StorageTransaction};
use crate::traits::{KeyValueStore, Word};

/// Per-call view of one token's records.
pub struct Repository<'a> {
    token: Address,
    store: StorageTransaction<'a>,
    providers: BTreeMap<ProviderId, Provider>,
    reservations: BTreeMap<ReservationId, Reservation>,
}

impl<'a> Repository<'a> {
    /// Opens a repository for `token` over `base`.
    #[must_use]
    pub fn new(base: &'a dyn KeyValueStore, token: Address) -> Self {
        Self {
            token,
            store: StorageTransaction::new(base),
            providers: BTreeMap::new(),
            reservations: BTreeMap::new(),
        }
    }

    /// Token the repository is scoped to.
    #[must_use]
    pub const fn token(&self) -> Address {
        self.token
    }

    /// The call's write overlay, for engine state outside the caches.
    pub fn store(&mut self) -> &mut dyn KeyValueStore {
        &mut self.store
    }

    /// Read-only access to the call's write overlay.
    #[must_use]
    pub fn store_ref(&self) -> &dyn KeyValueStore {
        &self.store
    }

    /// The provider with `id`, loading it on first reference.
    ///
    /// # Errors
    ///
    /// Propagates decoding errors of the stored record.
    pub fn provider(&mut self, id: ProviderId) -> Result<&mut Provider> {
        match self.providers.entry(id) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let provider = Provider::load(&self.store, &self.token, id)?;
                Ok(entry.insert(provider))
            }
        }
    }

    /// The provider owned by `owner`, stamping the owner on first use.
    ///
    /// # Errors
    ///
    /// Propagates decoding errors of the stored record.
    pub fn provider_for_owner(&mut self, owner: &Address) -> Result<&mut Provider> {
        let id = ProviderId::derive(owner, &self.token);
        let provider = self.provider(id)?;
        if provider.owner().is_zero() {
            provider.set_owner(*owner);
        }
        Ok(provider)
    }

    /// The reservation with `id`, loading it on first reference.
    ///
    /// # Errors
    ///
    /// Propagates decoding errors of the stored record.
    pub fn reservation(&mut self, id: ReservationId) -> Result<&mut Reservation> {
        match self.reservations.entry(id) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let reservation = Reservation::load(&self.store, &self.token, id)?;
                Ok(entry.insert(reservation))
            }
        }
    }

    /// The reservation held by `buyer`.
    ///
    /// # Errors
    ///
    /// Propagates decoding errors of the stored record.
    pub fn reservation_for_buyer(&mut self, buyer: &Address) -> Result<&mut Reservation> {
        let id = ReservationId::derive(&self.token, buyer);
        self.reservation(id)
    }

    /// Reads a raw word.
    #[must_use]
    pub fn get(&self, key: &StorageKey) -> Word {
        self.store.get(key)
    }

    /// Writes a raw word.
    pub fn set(&mut self, key: StorageKey, value: Word) {
        self.store.set(key, value);
    }

    /// Writes every cached record into the overlay.
    ///
    /// # Errors
    ///
    /// Propagates encoding errors, e.g. a reserved amount wider than its
    /// packed field.
    pub fn flush(&mut self) -> Result<()> {
        for provider in self.providers.values() {
            provider.save(&mut self.store, &self.token)?;
        }
        for reservation in self.reservations.values() {
            reservation.save(&mut self.store, &self.token)?;
        }
        Ok(())
    }

    /// Consumes the repository, returning the buffered writes.
    #[must_use]
    pub fn into_writes(self) -> BTreeMap<StorageKey, Word> {
        self.store.into_writes()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::storage::{apply_writes, MemoryStore};

    fn token() -> Address {
        Address::from_bytes([9u8; 32])
    }

    #[test]
    fn repeated_references_share_one_instance() {
        let base = MemoryStore::new();
        let mut repo = Repository::new(&base, token());
        let owner = Address::from_bytes([1u8; 32]);
        let Ok(provider) = repo.provider_for_owner(&owner) else {
            panic!("expected Ok");
        };
        let id = provider.id();
        let Ok(()) = provider.add_liquidity(10) else {
            panic!("expected Ok");
        };
        let Ok(again) = repo.provider(id) else {
            panic!("expected Ok");
        };
        assert_eq!(again.liquidity(), 10);
        assert_eq!(again.owner(), owner);
    }

    #[test]
    fn nothing_persists_without_flush_and_apply() {
        let mut base = MemoryStore::new();
        let owner = Address::from_bytes([1u8; 32]);
        {
            let mut repo = Repository::new(&base, token());
            let Ok(provider) = repo.provider_for_owner(&owner) else {
                panic!("expected Ok");
            };
            provider.activate(false);
        }
        assert!(base.is_empty());

        let writes = {
            let mut repo = Repository::new(&base, token());
            let Ok(provider) = repo.provider_for_owner(&owner) else {
                panic!("expected Ok");
            };
            provider.activate(false);
            let Ok(()) = repo.flush() else {
                panic!("expected Ok");
            };
            repo.into_writes()
        };
        apply_writes(&mut base, writes);

        let mut repo = Repository::new(&base, token());
        let Ok(provider) = repo.provider_for_owner(&owner) else {
            panic!("expected Ok");
        };
        assert!(provider.is_active());
    }

    #[test]
    fn reservation_for_buyer_is_keyed_by_token() {
        let base = MemoryStore::new();
        let mut repo = Repository::new(&base, token());
        let buyer = Address::from_bytes([4u8; 32]);
        let Ok(reservation) = repo.reservation_for_buyer(&buyer) else {
            panic!("expected Ok");
        };
        assert_eq!(reservation.id(), ReservationId::derive(&token(), &buyer));
        assert!(!reservation.has_legs());
    }
}
