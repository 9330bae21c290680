//! Dependency keys
//!
//! A [`Key`] names a dependency: a plain Rust type, a parameterized composite
//! (base key plus ordered argument keys), or an opaque string literal.
//! Keys compare and hash structurally, so the same logical dependency always
//! lands on the same registration no matter how it was spelled.

use crate::{Container, DiError, Result};
use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Shape of a [`Key`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    /// A plain type, identified by its `TypeId`
    Type,
    /// A base key applied to ordered argument keys, e.g. `Storage<i32>`
    Generic,
    /// An exact string identifier
    Literal,
}

#[derive(Clone)]
enum Repr {
    Type { id: TypeId, name: &'static str },
    Generic { base: Arc<Key>, args: Arc<[Key]> },
    Literal(Arc<str>),
}

/// Normalized, hashable identifier of a dependency.
///
/// # Examples
///
/// ```rust
/// use keyed_injector::Key;
///
/// struct Storage;
///
/// let ints = Key::generic(Key::of::<Storage>(), [Key::of::<i32>()]);
/// let strings = Key::generic(Key::of::<Storage>(), [Key::of::<String>()]);
/// assert_ne!(ints, strings);
///
/// assert_eq!(Key::from("first_q"), Key::literal("first_q"));
/// ```
#[derive(Clone)]
pub struct Key(Repr);

impl Key {
    /// Key for the plain type `T`
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self(Repr::Type {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        })
    }

    /// Key for an exact string identifier
    #[inline]
    pub fn literal(value: impl Into<Arc<str>>) -> Self {
        Self(Repr::Literal(value.into()))
    }

    /// Composite key: `base` parameterized by `args`, in order.
    ///
    /// Argument order is significant. Use [`Key::normalize`] (done by the
    /// builder on every registration) to reject composites without arguments.
    pub fn generic<I, A>(base: impl Into<Key>, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Key>,
    {
        Self(Repr::Generic {
            base: Arc::new(base.into()),
            args: args.into_iter().map(Into::into).collect(),
        })
    }

    /// The well-known key under which every container injects itself
    #[inline]
    pub fn container() -> Self {
        Self::of::<Container>()
    }

    /// Whether this is the self-injection key
    #[inline]
    pub fn is_container(&self) -> bool {
        matches!(self.0, Repr::Type { id, .. } if id == TypeId::of::<Container>())
    }

    /// Shape of the key
    pub fn kind(&self) -> KeyKind {
        match &self.0 {
            Repr::Type { .. } => KeyKind::Type,
            Repr::Generic { .. } => KeyKind::Generic,
            Repr::Literal(_) => KeyKind::Literal,
        }
    }

    /// `TypeId` of a plain-type key
    pub fn type_id(&self) -> Option<TypeId> {
        match &self.0 {
            Repr::Type { id, .. } => Some(*id),
            _ => None,
        }
    }

    /// The string of a literal key
    pub fn as_literal(&self) -> Option<&str> {
        match &self.0 {
            Repr::Literal(value) => Some(&**value),
            _ => None,
        }
    }

    /// Base of a generic key
    pub fn base(&self) -> Option<&Key> {
        match &self.0 {
            Repr::Generic { base, .. } => Some(&**base),
            _ => None,
        }
    }

    /// Ordered arguments of a generic key (empty for other kinds)
    pub fn args(&self) -> &[Key] {
        match &self.0 {
            Repr::Generic { args, .. } => &args[..],
            _ => &[],
        }
    }

    /// Validate the key into its canonical form.
    ///
    /// Plain types and non-empty literals are already canonical. Generic keys
    /// need a non-generic base and at least one argument; arguments are
    /// normalized recursively.
    pub fn normalize(self) -> Result<Key> {
        let rejected = match &self.0 {
            Repr::Literal(value) if value.is_empty() => Some("string keys must not be empty"),
            Repr::Generic { args, .. } if args.is_empty() => Some("specify generic parameters"),
            Repr::Generic { base, .. } if base.kind() == KeyKind::Generic => {
                Some("generic base must be a plain type or a string name")
            }
            _ => None,
        };
        if let Some(reason) = rejected {
            return Err(DiError::InvalidKey { key: self, reason });
        }

        match self.0 {
            Repr::Generic { base, args } => {
                let base = Arc::new(Key::clone(&base).normalize()?);
                let args = args
                    .iter()
                    .cloned()
                    .map(Key::normalize)
                    .collect::<Result<Arc<[Key]>>>()?;
                Ok(Key(Repr::Generic { base, args }))
            }
            repr => Ok(Key(repr)),
        }
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Repr::Type { id: a, .. }, Repr::Type { id: b, .. }) => a == b,
            (
                Repr::Generic { base: a, args: x },
                Repr::Generic { base: b, args: y },
            ) => a == b && x == y,
            (Repr::Literal(a), Repr::Literal(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Key {}

// Kept in line with PartialEq: type names never take part
impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        match &self.0 {
            Repr::Type { id, .. } => id.hash(state),
            Repr::Generic { base, args } => {
                base.hash(state);
                args.hash(state);
            }
            Repr::Literal(value) => value.hash(state),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Repr::Type { name, .. } => f.write_str(name),
            Repr::Literal(value) => write!(f, "{value:?}"),
            Repr::Generic { base, args } => {
                write!(f, "{base}<")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(">")
            }
        }
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({self})")
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::literal(value)
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::literal(value)
    }
}

impl From<&Key> for Key {
    fn from(value: &Key) -> Self {
        value.clone()
    }
}
