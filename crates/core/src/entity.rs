//! Entity trait: identity that survives renames and moves.

/// Entity marker + minimal interface.
///
/// Groups and users are entities: a group keeps its id when it is renamed or
/// moved under another parent, which is why group *paths* are only ever
/// resolved at evaluation time.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
