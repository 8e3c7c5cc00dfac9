//! Entity identities.
//!
//! Each entity kind has its own counter starting at 1; identities are never
//! reused within one timeline. `u32::MAX` is never handed out: a counter that
//! reaches it is exhausted and further inserts fail.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            /// First identity handed out by a fresh counter.
            pub const FIRST: Self = Self(1);

            pub fn get(self) -> u32 {
                self.0
            }

            /// The identity after this one, or `None` once the counter is exhausted.
            pub(crate) fn checked_next(self) -> Option<Self> {
                self.0.checked_add(1).map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u32> for $name {
            fn from(v: u32) -> Self {
                Self(v)
            }
        }
    };
}

entity_id!(
    /// Identity of a track. Clips and text layers may reference track ids
    /// that do not exist (yet).
    TrackId
);
entity_id!(
    /// Identity of a media clip.
    ClipId
);
entity_id!(
    /// Identity of a text layer.
    LayerId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_next_stops_at_max() {
        assert_eq!(TrackId::FIRST.checked_next(), Some(TrackId(2)));
        assert_eq!(ClipId(u32::MAX - 1).checked_next(), Some(ClipId(u32::MAX)));
        assert_eq!(LayerId(u32::MAX).checked_next(), None);
    }
}
