//! Override layer for tests
//!
//! A [`TestContainer`] resolves exactly like the [`Container`] it came from,
//! except that some keys are shadowed by replacement registrations. Every
//! override produces a new test container with its own singleton cache; the
//! source container and any earlier test container are left untouched.

use crate::storage::Registry;
use crate::{Container, DiError, Factory, Injectable, Key, Kwargs, Lifetime, Registration, Result};
use std::ops::Deref;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, warn};

/// Container whose registrations may be selectively replaced.
///
/// Derefs to [`Container`], so every resolution method is available. Inside
/// factories, the injected container is this test container, overrides
/// included.
///
/// # Examples
///
/// ```rust
/// use keyed_injector::{ContainerBuilder, Factory};
///
/// let mut builder = ContainerBuilder::new();
/// builder.singleton("db_url", Factory::value(String::from("postgres://prod")))?;
/// let container = builder.build()?;
///
/// let test = container
///     .create_test_container()
///     .with_overridden_singleton("db_url", Factory::value(String::from("sqlite::memory:")))?;
///
/// assert_eq!(*test.resolve::<String>("db_url")?, "sqlite::memory:");
/// assert_eq!(*container.resolve::<String>("db_url")?, "postgres://prod");
/// # Ok::<(), keyed_injector::DiError>(())
/// ```
#[derive(Clone, Debug)]
pub struct TestContainer {
    container: Container,
}

impl TestContainer {
    pub(crate) fn from_container(container: Container) -> Self {
        Self { container }
    }

    /// Replace the registration behind `key`.
    ///
    /// `key` must already be registered. The merged registrations are
    /// validated again, so an override may not introduce missing
    /// dependencies or cycles.
    pub fn with_overridden(
        &self,
        key: impl Into<Key>,
        factory: Factory,
        lifetime: Lifetime,
        kwargs: Kwargs,
    ) -> Result<Self> {
        let registration = Registration::new(key, factory, lifetime, kwargs)?;
        let key = registration.key().clone();

        if !self.container.view().contains(&key) {
            #[cfg(feature = "logging")]
            warn!(
                target: "keyed_injector",
                service = %key,
                "Refusing to override an unregistered service"
            );
            return Err(DiError::NothingToOverride { key });
        }

        let mut overrides = Registry::clone(self.container.overrides());
        overrides.insert(registration);

        let base = Arc::clone(self.container.registry());
        crate::graph::validate(crate::storage::RegistryView::new(&base, &overrides))?;

        #[cfg(feature = "logging")]
        debug!(
            target: "keyed_injector",
            service = %key,
            lifetime = lifetime.as_str(),
            overrides = overrides.len(),
            "Overrode service"
        );

        Ok(Self::from_container(Container::from_parts(
            base,
            Arc::new(overrides),
        )))
    }

    /// Replace `key` with a singleton built by `factory`
    pub fn with_overridden_singleton(&self, key: impl Into<Key>, factory: Factory) -> Result<Self> {
        self.with_overridden(key, factory, Lifetime::Singleton, Kwargs::new())
    }

    /// Replace `key` with a singleton built by `factory` with explicit arguments
    pub fn with_overridden_singleton_with(
        &self,
        key: impl Into<Key>,
        factory: Factory,
        kwargs: Kwargs,
    ) -> Result<Self> {
        self.with_overridden(key, factory, Lifetime::Singleton, kwargs)
    }

    /// Replace `key` with a constant instance
    pub fn with_overridden_value<T: Injectable + Clone>(
        &self,
        key: impl Into<Key>,
        value: T,
    ) -> Result<Self> {
        self.with_overridden_singleton(key, Factory::value(value))
    }

    /// Keys currently shadowed by an override, in override order
    pub fn overridden_keys(&self) -> &[Key] {
        self.container.overrides().keys()
    }

    /// The underlying container
    pub fn container(&self) -> &Container {
        &self.container
    }
}

impl Deref for TestContainer {
    type Target = Container;

    fn deref(&self) -> &Container {
        &self.container
    }
}

impl From<TestContainer> for Container {
    fn from(test: TestContainer) -> Self {
        test.container
    }
}
