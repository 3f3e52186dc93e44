//! Type-safe numeric identifier wrappers.
//!
//! Observations carry two identities on the wire: an `OBJECTID` that is
//! reissued every time an asset moves (each update is a new observation)
//! and a `TRACKID` that stays fixed for the asset's lifetime. Socket
//! sessions get a [`ConnectionId`] from the connection hub. Keeping them
//! as distinct newtypes stops them being mixed up at compile time.

use serde::{Deserialize, Serialize};

/// Generates a transparent newtype wrapper around an unsigned integer.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident($inner:ty)
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl $name {
            /// Return the inner integer value.
            pub const fn into_inner(self) -> $inner {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$inner> for $name {
            fn from(id: $inner) -> Self {
                Self(id)
            }
        }

        impl From<$name> for $inner {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Per-observation identity (`OBJECTID`). Never zero.
    ObjectId(u32)
}

define_id! {
    /// Stable per-asset identity (`TRACKID`), equal to the asset's slot index.
    TrackId(u32)
}

define_id! {
    /// Identity of one `WebSocket` session inside the connection hub.
    ConnectionId(u64)
}

/// Largest value the [`ObjectIdCounter`] will emit before wrapping to 1.
///
/// Clients treat `OBJECTID` as a non-zero unsigned 32-bit value, so the
/// counter stays strictly below `u32::MAX` and never emits zero.
pub const MAX_OBJECT_ID: u32 = u32::MAX - 1;

/// Monotonic `OBJECTID` source.
///
/// Emits `1, 2, ..., MAX_OBJECT_ID` and then wraps back to `1`. Zero is
/// reserved as "unset" and is never returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectIdCounter {
    next: u32,
}

impl ObjectIdCounter {
    /// Create a counter whose first id is `1`.
    pub const fn new() -> Self {
        Self { next: 1 }
    }

    /// Create a counter whose first id is `first`.
    ///
    /// Values outside `1..=MAX_OBJECT_ID` are clamped to `1`.
    pub const fn starting_at(first: u32) -> Self {
        let next = if first == 0 || first > MAX_OBJECT_ID {
            1
        } else {
            first
        };
        Self { next }
    }

    /// Return the next identifier and advance the counter.
    pub const fn next_id(&mut self) -> ObjectId {
        let id = self.next;
        self.next = if id >= MAX_OBJECT_ID {
            1
        } else {
            id.saturating_add(1)
        };
        ObjectId(id)
    }

    /// Peek at the identifier the next call to [`next_id`](Self::next_id) returns.
    pub const fn peek(&self) -> ObjectId {
        ObjectId(self.next)
    }
}

impl Default for ObjectIdCounter {
    fn default() -> Self {
        Self::new()
    }
}
