//! Component identity keys.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identity of a requested or provided component type.
///
/// Keys are built from a [`TypeId`] and therefore work for concrete types
/// (`Database`), trait objects (`dyn Repository`) and wrapper shapes
/// (`Provider<Database>`) alike. Equality, ordering and hashing consider the
/// `TypeId` only; the type name is carried for diagnostics.
///
/// # Examples
///
/// ```rust
/// use ferrous_wire::Key;
///
/// trait Repository: Send + Sync {}
///
/// let a = Key::of::<String>();
/// let b = Key::of::<String>();
/// assert_eq!(a, b);
/// assert_eq!(a.display_name(), "alloc::string::String");
/// assert_ne!(Key::of::<dyn Repository>(), a);
/// ```
#[derive(Clone, Copy)]
pub struct Key {
    id: TypeId,
    name: &'static str,
}

impl Key {
    /// Key for the type `T`.
    #[inline(always)]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Key {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The underlying type id.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Human-readable type name, as reported by `std::any::type_name`.
    pub fn display_name(&self) -> &'static str {
        self.name
    }

    /// True for the reserved identities that are never resolved from the
    /// graph: the ambient [`Context`](crate::Context) and the owning
    /// [`Container`](crate::Container).
    pub fn is_reserved(&self) -> bool {
        *self == context_key() || *self == container_key()
    }
}

impl PartialEq for Key {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Key {}

impl Hash for Key {
    #[inline(always)]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self.name)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Identity of constructors that produce no value (startup hooks).
#[doc(hidden)]
pub struct NilReturn;

#[inline(always)]
pub fn key_of_type<T: ?Sized + 'static>() -> Key {
    Key::of::<T>()
}

pub(crate) fn context_key() -> Key {
    Key::of::<crate::Context>()
}

pub(crate) fn container_key() -> Key {
    Key::of::<crate::Container>()
}

pub(crate) fn nil_key() -> Key {
    Key::of::<NilReturn>()
}
