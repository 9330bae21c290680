//! Validated dependency injection container
//!
//! A [`Container`] is produced by [`ContainerBuilder::build`] and never
//! changes its registrations afterwards. It resolves keys lazily: singletons
//! are constructed on first use and cached, transients are constructed on
//! every resolve, and every parameter is wired from explicit arguments, the
//! parameter's declared key, or its default, in that order.
//!
//! [`ContainerBuilder::build`]: crate::ContainerBuilder::build

use crate::storage::{Registry, RegistryView, SingletonCache};
use crate::{
    Argument, Args, DiError, Injectable, Instance, Key, Lifetime, Registration, Result,
    TestContainer,
};
use std::cell::RefCell;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

thread_local! {
    /// Keys under construction on this thread, tagged with their container
    static RESOLVING: RefCell<Vec<(usize, Key)>> = const { RefCell::new(Vec::new()) };
}

/// Marks one key as under construction until dropped
struct ResolutionGuard;

impl ResolutionGuard {
    /// Fails instead of waiting on a key this thread is already building
    fn enter(owner: usize, key: &Key) -> Result<Self> {
        RESOLVING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.iter().any(|(o, k)| *o == owner && k == key) {
                return Err(DiError::circular(key.clone()));
            }
            stack.push((owner, key.clone()));
            Ok(ResolutionGuard)
        })
    }
}

impl Drop for ResolutionGuard {
    fn drop(&mut self) {
        let _ = RESOLVING.try_with(|stack| stack.borrow_mut().pop());
    }
}

struct Inner {
    /// Validated registrations, shared with every derived test container
    registry: Arc<Registry>,
    /// Registrations shadowing `registry`; empty outside test containers
    overrides: Arc<Registry>,
    /// Singletons constructed by this container only
    singletons: SingletonCache,
}

/// Build-once dependency injection container.
///
/// Cloning is cheap and clones share the singleton cache. The container is
/// `Send + Sync`; concurrent first resolutions of a singleton construct it
/// once.
///
/// # Examples
///
/// ```rust
/// use keyed_injector::{ContainerBuilder, Factory, Key};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database> }
///
/// let mut builder = ContainerBuilder::new();
/// builder
///     .singleton(Key::of::<Database>(), Factory::from_fn(|| Database { url: "postgres://localhost".into() }))?
///     .singleton(
///         Key::of::<UserService>(),
///         Factory::new(|args| Ok(UserService { db: args.get("db")? })).param::<Database>("db"),
///     )?;
///
/// let container = builder.build()?;
/// let users = container.get::<UserService>()?;
/// assert_eq!(users.db.url, "postgres://localhost");
/// # Ok::<(), keyed_injector::DiError>(())
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<Inner>,
}

impl Container {
    pub(crate) fn from_parts(registry: Arc<Registry>, overrides: Arc<Registry>) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry,
                overrides,
                singletons: SingletonCache::new(),
            }),
        }
    }

    #[inline]
    pub(crate) fn view(&self) -> RegistryView<'_> {
        RegistryView::new(&self.inner.registry, &self.inner.overrides)
    }

    pub(crate) fn registry(&self) -> &Arc<Registry> {
        &self.inner.registry
    }

    pub(crate) fn overrides(&self) -> &Arc<Registry> {
        &self.inner.overrides
    }

    // =========================================================================
    // Resolution Methods
    // =========================================================================

    /// Resolve `key` and downcast to `T`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use keyed_injector::{ContainerBuilder, Factory};
    ///
    /// let mut builder = ContainerBuilder::new();
    /// builder.singleton("answer", Factory::value(42u32))?;
    ///
    /// let container = builder.build()?;
    /// assert_eq!(*container.resolve::<u32>("answer")?, 42);
    /// # Ok::<(), keyed_injector::DiError>(())
    /// ```
    #[inline]
    pub fn resolve<T: Injectable>(&self, key: impl Into<Key>) -> Result<Arc<T>> {
        let key = key.into();
        self.resolve_key(&key)?
            .downcast::<T>()
            .map_err(|_| DiError::type_mismatch::<T>(key))
    }

    /// Resolve the plain type key of `T`
    #[inline]
    pub fn get<T: Injectable>(&self) -> Result<Arc<T>> {
        self.resolve::<T>(Key::of::<T>())
    }

    /// Resolve the plain type key of `T` if it is registered.
    ///
    /// Construction failures are still reported as `None`.
    #[inline]
    pub fn try_get<T: Injectable>(&self) -> Option<Arc<T>> {
        self.get::<T>().ok()
    }

    /// Resolve `key` without downcasting
    #[inline]
    pub fn resolve_any(&self, key: impl Into<Key>) -> Result<Instance> {
        self.resolve_key(&key.into())
    }

    pub(crate) fn resolve_key(&self, key: &Key) -> Result<Instance> {
        #[cfg(feature = "logging")]
        trace!(target: "keyed_injector", service = %key, "Resolving service");

        if key.is_container() {
            #[cfg(feature = "logging")]
            trace!(target: "keyed_injector", "Injecting the container itself");
            return Ok(Arc::new(self.clone()) as Instance);
        }

        let Some(registration) = self.view().get(key) else {
            #[cfg(feature = "logging")]
            debug!(
                target: "keyed_injector",
                service = %key,
                "Service not found in container"
            );
            return Err(DiError::NotFound { key: key.clone() });
        };

        let owner = Arc::as_ptr(&self.inner) as usize;
        let _guard = ResolutionGuard::enter(owner, key).inspect_err(|_| {
            #[cfg(feature = "logging")]
            debug!(
                target: "keyed_injector",
                service = %key,
                "Service re-entered while under construction"
            );
        })?;

        match registration.lifetime() {
            Lifetime::Singleton => self
                .inner
                .singletons
                .get_or_try_init(key, || self.instantiate(registration)),
            Lifetime::Transient => self.instantiate(registration),
        }
    }

    /// Wire the arguments of `registration` and run its factory
    fn instantiate(&self, registration: &Registration) -> Result<Instance> {
        #[cfg(feature = "logging")]
        trace!(
            target: "keyed_injector",
            service = %registration.key(),
            lifetime = registration.lifetime().as_str(),
            "Creating instance"
        );

        let factory = registration.factory();
        let mut args = Args::with_capacity(factory.params().len());

        for param in factory.params() {
            let value = match registration.kwargs().get(param.name()) {
                Some(Argument::Value(value)) => Some(Arc::clone(value)),
                Some(Argument::Dependency(target)) => Some(self.resolve_key(target)?),
                None if self.provides(param.key()) => Some(self.resolve_key(param.key())?),
                None if param.has_default() => param.default_value().map(Arc::clone),
                None => return Err(DiError::NotFound { key: param.key().clone() }),
            };
            if let Some(value) = value {
                args.insert(param.name().to_owned(), value);
            }
        }

        factory.create(&args)
    }

    /// Whether resolving `key` can succeed
    #[inline]
    fn provides(&self, key: &Key) -> bool {
        key.is_container() || self.view().contains(key)
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Check if `key` has a registration (the container key always does)
    #[inline]
    pub fn contains(&self, key: impl Into<Key>) -> bool {
        self.provides(&key.into())
    }

    /// Lifetime of the registration behind `key`
    pub fn lifetime_of(&self, key: impl Into<Key>) -> Option<Lifetime> {
        self.view().get(&key.into()).map(Registration::lifetime)
    }

    /// Registered keys in registration order
    pub fn registered_keys(&self) -> Vec<Key> {
        self.view().keys()
    }

    /// Number of registrations
    #[inline]
    pub fn len(&self) -> usize {
        self.view().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of singletons constructed so far
    pub fn cached_singletons(&self) -> usize {
        self.inner.singletons.len()
    }

    // =========================================================================
    // Test Overrides
    // =========================================================================

    /// Derive a [`TestContainer`] sharing these registrations but none of the
    /// singletons built so far.
    pub fn create_test_container(&self) -> TestContainer {
        #[cfg(feature = "logging")]
        debug!(
            target: "keyed_injector",
            services = self.len(),
            "Creating test container"
        );

        TestContainer::from_container(Container::from_parts(
            Arc::clone(&self.inner.registry),
            Arc::clone(&self.inner.overrides),
        ))
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("service_count", &self.len())
            .field("override_count", &self.inner.overrides.len())
            .field("cached_singletons", &self.cached_singletons())
            .finish()
    }
}
