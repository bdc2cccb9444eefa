//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Users and club events are both stored as ordered sequences; lookups go
/// through their identifiers rather than positions.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

/// First entity in `items` carrying `id`.
pub fn find<'a, T: Entity>(items: &'a [T], id: &T::Id) -> Option<&'a T> {
    items.iter().find(|item| item.id() == id)
}

/// Mutable variant of [`find`].
pub fn find_mut<'a, T: Entity>(items: &'a mut [T], id: &T::Id) -> Option<&'a mut T> {
    items.iter_mut().find(|item| item.id() == id)
}
