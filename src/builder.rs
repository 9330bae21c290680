//! Container builder
//!
//! Registrations accumulate in a [`ContainerBuilder`] and are validated as a
//! whole by [`ContainerBuilder::build`], which consumes the builder.

use crate::storage::{Registry, RegistryView};
use crate::{Container, Factory, Inject, Key, Kwargs, Lifetime, Registration, Result};
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, warn};

/// Collects registrations, then validates them into a [`Container`].
///
/// Registering a key twice replaces the earlier registration; the key keeps
/// its original position in registration order.
///
/// # Examples
///
/// ```rust
/// use keyed_injector::{ContainerBuilder, Factory, Key};
///
/// struct Config { name: &'static str }
///
/// let mut builder = ContainerBuilder::new();
/// builder
///     .singleton(Key::of::<Config>(), Factory::from_fn(|| Config { name: "app" }))?
///     .register("request_id", Factory::from_fn(|| 7u64))?;
///
/// assert_eq!(builder.len(), 2);
/// let container = builder.build()?;
/// assert_eq!(container.get::<Config>()?.name, "app");
/// # Ok::<(), keyed_injector::DiError>(())
/// ```
#[derive(Debug, Default)]
pub struct ContainerBuilder {
    registry: Registry,
}

impl ContainerBuilder {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder with pre-allocated capacity
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            registry: Registry::with_capacity(capacity),
        }
    }

    /// Register `key` with full control over lifetime and explicit arguments
    pub fn add(
        &mut self,
        key: impl Into<Key>,
        factory: Factory,
        lifetime: Lifetime,
        kwargs: Kwargs,
    ) -> Result<&mut Self> {
        let registration = Registration::new(key, factory, lifetime, kwargs)?;

        #[cfg(feature = "logging")]
        debug!(
            target: "keyed_injector",
            service = %registration.key(),
            lifetime = lifetime.as_str(),
            params = registration.factory().params().len(),
            "Registering service"
        );

        if let Some(_previous) = self.registry.insert(registration) {
            #[cfg(feature = "logging")]
            warn!(
                target: "keyed_injector",
                service = %_previous.key(),
                "Replacing an earlier registration"
            );
        }

        Ok(self)
    }

    /// Register a transient: a new instance per resolve
    #[inline]
    pub fn register(&mut self, key: impl Into<Key>, factory: Factory) -> Result<&mut Self> {
        self.add(key, factory, Lifetime::Transient, Kwargs::new())
    }

    /// Register a transient with explicit arguments
    #[inline]
    pub fn register_with(
        &mut self,
        key: impl Into<Key>,
        factory: Factory,
        kwargs: Kwargs,
    ) -> Result<&mut Self> {
        self.add(key, factory, Lifetime::Transient, kwargs)
    }

    /// Register a singleton: constructed lazily, at most once per container
    #[inline]
    pub fn singleton(&mut self, key: impl Into<Key>, factory: Factory) -> Result<&mut Self> {
        self.add(key, factory, Lifetime::Singleton, Kwargs::new())
    }

    /// Register a singleton with explicit arguments
    #[inline]
    pub fn singleton_with(
        &mut self,
        key: impl Into<Key>,
        factory: Factory,
        kwargs: Kwargs,
    ) -> Result<&mut Self> {
        self.add(key, factory, Lifetime::Singleton, kwargs)
    }

    /// Register `T` as a singleton under its own type key, built through [`Inject`]
    #[inline]
    pub fn provide<T: Inject>(&mut self) -> Result<&mut Self> {
        self.singleton(Key::of::<T>(), Factory::of::<T>())
    }

    /// Register `T` as a transient under its own type key, built through [`Inject`]
    #[inline]
    pub fn provide_transient<T: Inject>(&mut self) -> Result<&mut Self> {
        self.register(Key::of::<T>(), Factory::of::<T>())
    }

    /// Check if `key` has been registered
    pub fn contains(&self, key: impl Into<Key>) -> bool {
        self.registry.contains(&key.into())
    }

    /// Number of registered keys
    #[inline]
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Validate every registration and produce the container.
    ///
    /// Fails with [`DiError::Validation`](crate::DiError::Validation) listing
    /// every missing dependency and every cycle found.
    pub fn build(self) -> Result<Container> {
        let overrides = Registry::new();
        crate::graph::validate(RegistryView::new(&self.registry, &overrides))?;

        #[cfg(feature = "logging")]
        debug!(
            target: "keyed_injector",
            services = self.registry.len(),
            "Container built"
        );

        Ok(Container::from_parts(
            Arc::new(self.registry),
            Arc::new(overrides),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Args, DiError, Param, Problem};

    struct A;
    struct B;

    #[test]
    fn test_overwrite_keeps_last_and_position() {
        let mut builder = ContainerBuilder::new();
        builder
            .singleton("x", Factory::value(1u8))
            .unwrap()
            .singleton("y", Factory::value(2u8))
            .unwrap()
            .register("x", Factory::value(3u8))
            .unwrap();

        assert_eq!(builder.len(), 2);
        let container = builder.build().unwrap();

        assert_eq!(*container.resolve::<u8>("x").unwrap(), 3);
        assert_eq!(container.lifetime_of("x"), Some(Lifetime::Transient));
        assert_eq!(
            container.registered_keys(),
            vec![Key::literal("x"), Key::literal("y")]
        );
    }

    #[test]
    fn test_invalid_keys_rejected_at_registration() {
        let mut builder = ContainerBuilder::new();

        assert!(matches!(
            builder.singleton("", Factory::value(1u8)),
            Err(DiError::InvalidKey { .. })
        ));
        assert!(matches!(
            builder.singleton(Key::generic("Storage", Vec::<Key>::new()), Factory::value(1u8)),
            Err(DiError::InvalidKey { .. })
        ));
        assert!(builder.is_empty());
    }

    #[test]
    fn test_build_reports_missing_and_cycles_together() {
        let mut builder = ContainerBuilder::new();
        builder
            .singleton(Key::of::<A>(), Factory::from_fn(|| A).param::<B>("b"))
            .unwrap()
            .singleton(Key::of::<B>(), Factory::from_fn(|| B).param::<A>("a"))
            .unwrap()
            .register("orphan", Factory::from_fn(|| 0u8).param_key("parent", "parent"))
            .unwrap();

        let err = builder.build().unwrap_err();
        let report = err.validation().unwrap();

        assert_eq!(report.cycles().count(), 1);
        assert_eq!(
            report.missing().collect::<Vec<_>>(),
            vec![(&Key::literal("parent"), &Key::literal("orphan"))]
        );
        assert!(matches!(report.problems()[0], Problem::Cycle { .. }));
    }

    #[test]
    fn test_provide_uses_inject_schema() {
        struct Port(u16);

        struct Server {
            port: Arc<Port>,
        }

        impl Inject for Server {
            fn params() -> Vec<Param> {
                vec![Param::of::<Port>("port")]
            }

            fn inject(args: &Args) -> Result<Self> {
                Ok(Server {
                    port: args.get("port")?,
                })
            }
        }

        let mut builder = ContainerBuilder::with_capacity(2);
        builder.provide::<Server>().unwrap();
        assert!(builder.contains(Key::of::<Server>()));

        let err = builder.build().unwrap_err();
        assert_eq!(err.validation().unwrap().missing().count(), 1);

        let mut builder = ContainerBuilder::new();
        builder
            .singleton(Key::of::<Port>(), Factory::from_fn(|| Port(8080)))
            .unwrap()
            .provide_transient::<Server>()
            .unwrap();
        let container = builder.build().unwrap();

        let a = container.get::<Server>().unwrap();
        let b = container.get::<Server>().unwrap();
        assert_eq!(a.port.0, 8080);
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_empty_builder_builds() {
        let container = ContainerBuilder::new().build().unwrap();
        assert!(container.is_empty());
    }
}
