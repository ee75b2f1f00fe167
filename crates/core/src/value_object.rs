//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. Parsed mapper
/// configuration and group paths are value objects: two rules configured with
/// the same six options behave identically, whatever mapper instance holds them.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct Location(String);
///
/// impl ValueObject for Location {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
