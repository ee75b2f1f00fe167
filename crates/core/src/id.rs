//! Opaque identifiers for tenants, users and groups.
//!
//! Ids are minted by the realm and only ever compared, ordered, printed into
//! claims (`sub`) or carried through serde. They are never parsed back from
//! text inside the mapper.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! typed_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Mint a fresh time-ordered (v7) id.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0.hyphenated(), f)
            }
        }
    };
}

typed_id! {
    /// Realm boundary: groups and subjects never resolve across tenants.
    TenantId
}

typed_id! {
    /// Token subject, written as the `sub` claim.
    UserId
}

typed_id! {
    GroupId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_bare_uuid_string() {
        let id = UserId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));

        let back: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn fresh_ids_are_distinct() {
        let ids: std::collections::BTreeSet<_> = (0..64).map(|_| GroupId::new()).collect();
        assert_eq!(ids.len(), 64);
    }

    #[test]
    fn display_is_hyphenated_lowercase() {
        let shown = TenantId::new().to_string();
        assert_eq!(shown.len(), 36);
        assert_eq!(shown.matches('-').count(), 4);
        assert_eq!(shown, shown.to_ascii_lowercase());
    }
}
