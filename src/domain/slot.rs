//! Queue kinds and provider slots.

use core::fmt;

/// The three provider queues, in scheduling precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QueueKind {
    /// Providers who listed tokens without paying the priority tax.
    Normal,
    /// Providers who paid the priority tax.
    Priority,
    /// Former LPs still owed BTC.
    Removal,
}

impl QueueKind {
    /// All kinds in persisted order.
    pub const ALL: [Self; 3] = [Self::Normal, Self::Priority, Self::Removal];

    /// Wire tag used in packed reservation legs.
    #[must_use]
    pub const fn tag(&self) -> u8 {
        match self {
            Self::Normal => 0,
            Self::Priority => 1,
            Self::Removal => 2,
        }
    }

    /// Decodes a wire tag.
    #[must_use]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Normal),
            1 => Some(Self::Priority),
            2 => Some(Self::Removal),
            _ => None,
        }
    }
}

impl fmt::Display for QueueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Normal => "normal",
            Self::Priority => "priority",
            Self::Removal => "removal",
        };
        f.write_str(name)
    }
}

/// Where a provider is scheduled from.
///
/// The initial liquidity provider lives outside every queue; it is scanned
/// last and is never evicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderSlot {
    /// Index `index` of queue `kind`.
    Queued {
        /// Queue holding the provider.
        kind: QueueKind,
        /// Position inside that queue.
        index: u64,
    },
    /// The pool's initial liquidity provider.
    InitialProvider,
}

impl ProviderSlot {
    /// Index written on the wire for the initial provider.
    pub const INITIAL_PROVIDER_INDEX: u64 = u64::MAX;

    /// Builds a queued slot.
    #[must_use]
    pub const fn queued(kind: QueueKind, index: u64) -> Self {
        Self::Queued { kind, index }
    }

    /// Queue kind for reservation bookkeeping; the initial provider trades
    /// as a normal provider.
    #[must_use]
    pub const fn kind(&self) -> QueueKind {
        match self {
            Self::Queued { kind, .. } => *kind,
            Self::InitialProvider => QueueKind::Normal,
        }
    }

    /// Wire index: the queue position, or [`Self::INITIAL_PROVIDER_INDEX`].
    #[must_use]
    pub const fn wire_index(&self) -> u64 {
        match self {
            Self::Queued { index, .. } => *index,
            Self::InitialProvider => Self::INITIAL_PROVIDER_INDEX,
        }
    }

    /// Rebuilds a slot from its wire `(index, kind)` pair.
    #[must_use]
    pub const fn from_wire(index: u64, kind: QueueKind) -> Self {
        if index == Self::INITIAL_PROVIDER_INDEX {
            Self::InitialProvider
        } else {
            Self::Queued { kind, index }
        }
    }

    /// Returns `true` for the initial provider.
    #[must_use]
    pub const fn is_initial(&self) -> bool {
        matches!(self, Self::InitialProvider)
    }
}

impl fmt::Display for ProviderSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued { kind, index } => write!(f, "{kind}#{index}"),
            Self::InitialProvider => f.write_str("initial"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip() {
        for kind in QueueKind::ALL {
            assert_eq!(QueueKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(QueueKind::from_tag(9), None);
    }

    #[test]
    fn initial_provider_wire_index() {
        let slot = ProviderSlot::InitialProvider;
        assert_eq!(slot.wire_index(), u64::MAX);
        assert_eq!(
            ProviderSlot::from_wire(u64::MAX, QueueKind::Priority),
            ProviderSlot::InitialProvider
        );
        assert_eq!(slot.kind(), QueueKind::Normal);
    }

    #[test]
    fn queued_wire_round_trip() {
        let slot = ProviderSlot::queued(QueueKind::Removal, 42);
        assert_eq!(
            ProviderSlot::from_wire(slot.wire_index(), slot.kind()),
            slot
        );
        assert!(!slot.is_initial());
    }

    #[test]
    fn display() {
        assert_eq!(ProviderSlot::queued(QueueKind::Priority, 3).to_string(), "priority#3");
        assert_eq!(ProviderSlot::InitialProvider.to_string(), "initial");
    }
}
