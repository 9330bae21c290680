//! Registrations and explicit arguments
//!
//! A [`Registration`] is the immutable record the builder stores per key:
//! factory, lifetime and the explicit keyword arguments that take precedence
//! over the factory's declared parameter keys.

use crate::{DiError, Factory, Injectable, Instance, Key, Lifetime, Result};
use std::any::Any;
use std::borrow::Cow;
use std::sync::Arc;

/// Marker meaning "inject whatever is registered under this key".
///
/// Only meaningful as an explicit argument value.
///
/// ```rust
/// use keyed_injector::{kwargs, Dependency};
///
/// let args = kwargs! { queue => Dependency::on("first_q") };
/// assert!(args.get("queue").is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dependency(Key);

impl Dependency {
    #[inline]
    pub fn on(key: impl Into<Key>) -> Self {
        Self(key.into())
    }

    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self(Key::of::<T>())
    }

    pub fn key(&self) -> &Key {
        &self.0
    }
}

/// Explicit argument value for one parameter
#[derive(Clone)]
pub enum Argument {
    /// Passed to the factory as-is
    Value(Instance),
    /// Resolved from the container on every construction
    Dependency(Key),
}

impl std::fmt::Debug for Argument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Argument::Value(_) => f.write_str("Value(..)"),
            Argument::Dependency(key) => f.debug_tuple("Dependency").field(key).finish(),
        }
    }
}

/// Ordered explicit arguments, by parameter name.
#[derive(Debug, Clone, Default)]
pub struct Kwargs {
    entries: Vec<(Cow<'static, str>, Argument)>,
}

impl Kwargs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an argument; a [`Dependency`] value becomes a marker, anything
    /// else a constant.
    pub fn arg<T: Injectable>(self, name: impl Into<Cow<'static, str>>, value: T) -> Self {
        let argument = match (&value as &dyn Any).downcast_ref::<Dependency>() {
            Some(dependency) => Argument::Dependency(dependency.key().clone()),
            None => Argument::Value(Arc::new(value)),
        };
        self.with(name, argument)
    }

    /// Add a constant, even if it happens to be a `Dependency`
    pub fn value<T: Injectable>(self, name: impl Into<Cow<'static, str>>, value: T) -> Self {
        self.with(name, Argument::Value(Arc::new(value)))
    }

    /// Add a dependency marker
    pub fn dependency(self, name: impl Into<Cow<'static, str>>, key: impl Into<Key>) -> Self {
        self.with(name, Argument::Dependency(key.into()))
    }

    /// Add an argument, replacing an earlier one with the same name
    pub fn with(mut self, name: impl Into<Cow<'static, str>>, argument: Argument) -> Self {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = argument,
            None => self.entries.push((name, argument)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Argument> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, argument)| argument)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Argument)> + '_ {
        self.entries.iter().map(|(n, a)| (n.as_ref(), a))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Build [`Kwargs`] from `name => value` pairs.
///
/// Values go through [`Kwargs::arg`], so `Dependency::on(..)` values become
/// markers.
///
/// ```rust
/// use keyed_injector::{kwargs, Argument, Dependency};
///
/// let args = kwargs! { x => 1i32, y => Dependency::on("y") };
/// assert!(matches!(args.get("x"), Some(Argument::Value(_))));
/// assert!(matches!(args.get("y"), Some(Argument::Dependency(_))));
/// ```
#[macro_export]
macro_rules! kwargs {
    () => {
        $crate::Kwargs::new()
    };
    ($($name:ident => $value:expr),+ $(,)?) => {
        $crate::Kwargs::new()$(.arg(stringify!($name), $value))+
    };
}

/// A dependency edge of a registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge<'a> {
    /// Parameter that creates the edge
    pub param: &'a str,
    /// Key the parameter is resolved through
    pub target: &'a Key,
    /// Whether absence of `target` is tolerated (defaulted parameters)
    pub optional: bool,
}

/// Immutable record of one registered key.
#[derive(Clone)]
pub struct Registration {
    key: Key,
    factory: Factory,
    lifetime: Lifetime,
    kwargs: Kwargs,
}

impl Registration {
    /// Validate and create a registration.
    ///
    /// Normalizes `key` and every dependency marker, refuses the reserved
    /// container key, and rejects explicit arguments the factory does not
    /// declare.
    pub fn new(
        key: impl Into<Key>,
        factory: Factory,
        lifetime: Lifetime,
        kwargs: Kwargs,
    ) -> Result<Self> {
        let key = key.into().normalize()?;
        if key.is_container() {
            return Err(DiError::InvalidKey {
                key,
                reason: "reserved for the container itself",
            });
        }

        let mut checked = Kwargs::new();
        for (name, argument) in kwargs.entries {
            if factory.param_named(&name).is_none() {
                return Err(DiError::UnknownArgument {
                    key,
                    name: name.into_owned(),
                });
            }
            let argument = match argument {
                Argument::Dependency(target) => Argument::Dependency(target.normalize()?),
                value => value,
            };
            checked.entries.push((name, argument));
        }

        Ok(Self {
            key,
            factory,
            lifetime,
            kwargs: checked,
        })
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn factory(&self) -> &Factory {
        &self.factory
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    pub fn kwargs(&self) -> &Kwargs {
        &self.kwargs
    }

    /// Dependency edges in parameter declaration order.
    ///
    /// Constants contribute nothing. Explicit markers are always required;
    /// otherwise a parameter is optional exactly when it has a default.
    pub fn dependencies(&self) -> impl Iterator<Item = Edge<'_>> + '_ {
        self.factory
            .params()
            .iter()
            .filter_map(|param| match self.kwargs.get(param.name()) {
                Some(Argument::Value(_)) => None,
                Some(Argument::Dependency(target)) => Some(Edge {
                    param: param.name(),
                    target,
                    optional: false,
                }),
                None => Some(Edge {
                    param: param.name(),
                    target: param.key(),
                    optional: param.has_default(),
                }),
            })
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("key", &self.key)
            .field("lifetime", &self.lifetime)
            .field("factory", &self.factory)
            .field("kwargs", &self.kwargs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct A;

    fn factory() -> Factory {
        Factory::from_fn(|| A)
            .param::<i32>("x")
            .param::<String>("y")
            .param_or("z", 0u8)
    }

    #[test]
    fn test_arg_detects_dependency_marker() {
        let kwargs = Kwargs::new()
            .arg("x", 1i32)
            .arg("y", Dependency::on("y"))
            .value("z", Dependency::on("ignored"));

        assert!(matches!(kwargs.get("x"), Some(Argument::Value(_))));
        assert!(matches!(
            kwargs.get("y"),
            Some(Argument::Dependency(key)) if key == &Key::literal("y")
        ));
        assert!(matches!(kwargs.get("z"), Some(Argument::Value(_))));
    }

    #[test]
    fn test_kwargs_macro_replaces_duplicates() {
        let kwargs = kwargs! { x => 1i32, x => 2i32 };
        assert_eq!(kwargs.len(), 1);
    }

    #[test]
    fn test_unknown_argument_rejected() {
        let err = Registration::new(
            Key::of::<A>(),
            factory(),
            Lifetime::Singleton,
            kwargs! { x => 1i32, w => 1i32 },
        )
        .unwrap_err();

        assert!(matches!(err, DiError::UnknownArgument { ref name, .. } if name == "w"));
    }

    #[test]
    fn test_container_key_is_reserved() {
        let err = Registration::new(
            Key::container(),
            factory(),
            Lifetime::Singleton,
            Kwargs::new(),
        )
        .unwrap_err();
        assert!(matches!(err, DiError::InvalidKey { .. }));
    }

    #[test]
    fn test_dependencies() {
        let registration = Registration::new(
            "a",
            factory(),
            Lifetime::Transient,
            kwargs! { x => 1i32, z => Dependency::on("zed") },
        )
        .unwrap();

        let edges: Vec<Edge<'_>> = registration.dependencies().collect();
        assert_eq!(edges.len(), 2);

        assert_eq!(edges[0].param, "y");
        assert_eq!(edges[0].target, &Key::of::<String>());
        assert!(!edges[0].optional);

        // explicit marker wins over the parameter's default
        assert_eq!(edges[1].target, &Key::literal("zed"));
        assert!(!edges[1].optional);
    }
}
