//! Factory types for creating service instances
//!
//! A [`Factory`] couples a type-erased create function with its parameter
//! schema: the ordered `(name, key, has-default)` list the container uses to
//! wire arguments. Rust has no runtime signature introspection, so the schema
//! is declared explicitly, either with the builder methods below or by
//! implementing [`Inject`] (which `#[derive(Inject)]` does for structs).

use crate::{DiError, Injectable, Key, Result};
use ahash::AHashMap;
use std::any::Any;
use std::borrow::Cow;
use std::sync::Arc;

/// Type-erased service instance, shared between every holder
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Type-erased create function
type CreateFn = Arc<dyn Fn(&Args) -> Result<Instance> + Send + Sync>;

// =============================================================================
// Parameters
// =============================================================================

/// One declared factory parameter.
#[derive(Clone)]
pub struct Param {
    name: Cow<'static, str>,
    key: Key,
    has_default: bool,
    default: Option<Instance>,
}

impl Param {
    /// Required parameter resolved through `key`
    pub fn new(name: impl Into<Cow<'static, str>>, key: impl Into<Key>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            has_default: false,
            default: None,
        }
    }

    /// Required parameter resolved through the type key of `T`
    pub fn of<T: ?Sized + 'static>(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(name, Key::of::<T>())
    }

    /// Parameter of type `T` that is simply left out when nothing provides it
    pub fn optional<T: ?Sized + 'static>(name: impl Into<Cow<'static, str>>) -> Self {
        Self::of::<T>(name).allow_absent()
    }

    /// Leave the argument out when the key is not registered
    pub fn allow_absent(mut self) -> Self {
        self.has_default = true;
        self
    }

    /// Fall back to `value` when the parameter's key is not registered
    pub fn with_default<T: Injectable>(mut self, value: T) -> Self {
        self.has_default = true;
        self.default = Some(Arc::new(value));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn has_default(&self) -> bool {
        self.has_default
    }

    /// Default value, if one was given (optional parameters have none)
    pub fn default_value(&self) -> Option<&Instance> {
        self.default.as_ref()
    }
}

impl std::fmt::Debug for Param {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Param")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("has_default", &self.has_default)
            .finish()
    }
}

// =============================================================================
// Arguments
// =============================================================================

/// Arguments handed to a create function, by parameter name.
#[derive(Default)]
pub struct Args {
    values: AHashMap<Cow<'static, str>, Instance>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            values: AHashMap::with_capacity(capacity),
        }
    }

    /// Set an argument, replacing an earlier value under the same name
    pub fn insert(&mut self, name: impl Into<Cow<'static, str>>, value: Instance) {
        self.values.insert(name.into(), value);
    }

    /// Get a shared argument.
    ///
    /// Fails with `MissingArgument` when absent and `ArgumentMismatch` when
    /// the value is not a `T`.
    pub fn get<T: Injectable>(&self, name: &str) -> Result<Arc<T>> {
        let value = self
            .values
            .get(name)
            .ok_or_else(|| DiError::MissingArgument {
                name: name.to_owned(),
                expected: std::any::type_name::<T>(),
            })?;
        Arc::clone(value)
            .downcast::<T>()
            .map_err(|_| DiError::ArgumentMismatch {
                name: name.to_owned(),
                expected: std::any::type_name::<T>(),
            })
    }

    /// Get an owned copy of an argument
    pub fn cloned<T: Injectable + Clone>(&self, name: &str) -> Result<T> {
        self.get::<T>(name).map(|value| T::clone(&value))
    }

    /// Get an argument if present and of type `T`
    pub fn try_get<T: Injectable>(&self, name: &str) -> Option<Arc<T>> {
        self.values
            .get(name)
            .and_then(|value| Arc::clone(value).downcast::<T>().ok())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// =============================================================================
// Inject - static parameter schema
// =============================================================================

/// Types that declare their own parameters and construction.
///
/// # Example
///
/// ```rust
/// use keyed_injector::{Args, Inject, Param, Result};
/// use std::sync::Arc;
///
/// struct Config { debug: bool }
///
/// struct Logger { config: Arc<Config> }
///
/// impl Inject for Logger {
///     fn params() -> Vec<Param> {
///         vec![Param::of::<Config>("config")]
///     }
///
///     fn inject(args: &Args) -> Result<Self> {
///         Ok(Logger { config: args.get("config")? })
///     }
/// }
/// ```
pub trait Inject: Injectable + Sized {
    /// Ordered parameter schema
    fn params() -> Vec<Param>;

    /// Build an instance from resolved arguments
    fn inject(args: &Args) -> Result<Self>;
}

// =============================================================================
// Factory
// =============================================================================

/// Create function plus parameter schema.
///
/// Cloning is cheap: the create function is shared, so one factory can back
/// several registrations.
///
/// # Examples
///
/// ```rust
/// use keyed_injector::Factory;
///
/// struct Greeting { text: String, times: u32 }
///
/// let factory = Factory::new(|args| {
///     Ok(Greeting {
///         text: args.cloned::<String>("text")?,
///         times: args.cloned::<u32>("times")?,
///     })
/// })
/// .param::<String>("text")
/// .param_or("times", 1u32);
///
/// assert_eq!(factory.params().len(), 2);
/// ```
#[derive(Clone)]
pub struct Factory {
    create: CreateFn,
    params: Vec<Param>,
    type_name: &'static str,
}

impl Factory {
    /// Fallible factory reading its arguments from [`Args`]
    pub fn new<T: Injectable, F>(create: F) -> Self
    where
        F: Fn(&Args) -> Result<T> + Send + Sync + 'static,
    {
        Self {
            create: Arc::new(move |args: &Args| create(args).map(|value| Arc::new(value) as Instance)),
            params: Vec::new(),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Factory without parameters
    pub fn from_fn<T: Injectable, F>(create: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::new(move |_| Ok(create()))
    }

    /// Factory handing out clones of a constant
    pub fn value<T: Injectable + Clone>(value: T) -> Self {
        Self::from_fn(move || value.clone())
    }

    /// Factory taken from an [`Inject`] implementation
    pub fn of<T: Inject>() -> Self {
        Self {
            params: T::params(),
            ..Self::new(T::inject)
        }
    }

    /// Declare a required parameter keyed by the type `T`
    pub fn param<T: ?Sized + 'static>(self, name: impl Into<Cow<'static, str>>) -> Self {
        self.with_param(Param::of::<T>(name))
    }

    /// Declare a required parameter with an explicit key
    pub fn param_key(self, name: impl Into<Cow<'static, str>>, key: impl Into<Key>) -> Self {
        self.with_param(Param::new(name, key))
    }

    /// Declare a parameter keyed by `T` that falls back to `default`
    pub fn param_or<T: Injectable>(self, name: impl Into<Cow<'static, str>>, default: T) -> Self {
        self.with_param(Param::of::<T>(name).with_default(default))
    }

    /// Declare a parameter keyed by `T` that may be absent
    pub fn optional<T: ?Sized + 'static>(self, name: impl Into<Cow<'static, str>>) -> Self {
        self.with_param(Param::optional::<T>(name))
    }

    /// Append a parameter, replacing an earlier one with the same name
    pub fn with_param(mut self, param: Param) -> Self {
        match self.params.iter_mut().find(|p| p.name == param.name) {
            Some(existing) => *existing = param,
            None => self.params.push(param),
        }
        self
    }

    /// Ordered parameter schema
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Look up a parameter by name
    pub fn param_named(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Name of the produced type
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[inline]
    pub(crate) fn create(&self, args: &Args) -> Result<Instance> {
        (self.create)(args)
    }
}

impl std::fmt::Debug for Factory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Factory")
            .field("type_name", &self.type_name)
            .field("params", &self.params)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Clone)]
    struct TestService {
        id: u32,
    }

    #[test]
    fn test_from_fn_creates_fresh_values() {
        static COUNTER: AtomicU32 = AtomicU32::new(0);

        let factory = Factory::from_fn(|| TestService {
            id: COUNTER.fetch_add(1, Ordering::SeqCst),
        });

        let a = factory.create(&Args::new()).unwrap().downcast::<TestService>().unwrap();
        let b = factory.create(&Args::new()).unwrap().downcast::<TestService>().unwrap();

        assert_eq!(a.id + 1, b.id);
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(factory.type_name(), std::any::type_name::<TestService>());
    }

    #[test]
    fn test_params_keep_declaration_order() {
        let factory = Factory::value(TestService { id: 0 })
            .param::<u32>("b")
            .param_key("a", "named")
            .optional::<String>("c")
            .param_or("b", 7u32);

        let names: Vec<&str> = factory.params().iter().map(Param::name).collect();
        assert_eq!(names, ["b", "a", "c"]);

        let b = factory.param_named("b").unwrap();
        assert!(b.has_default());
        assert!(b.default_value().is_some());

        let c = factory.param_named("c").unwrap();
        assert!(c.has_default());
        assert!(c.default_value().is_none());

        assert_eq!(factory.param_named("a").unwrap().key(), &Key::literal("named"));
    }

    #[test]
    fn test_args_errors() {
        let mut args = Args::new();
        args.insert("id", Arc::new(5u32));

        assert_eq!(*args.get::<u32>("id").unwrap(), 5);
        assert_eq!(args.cloned::<u32>("id").unwrap(), 5);
        assert!(args.try_get::<String>("id").is_none());
        assert!(matches!(
            args.get::<String>("id"),
            Err(DiError::ArgumentMismatch { ref name, .. }) if name == "id"
        ));
        assert!(matches!(
            args.get::<u32>("other"),
            Err(DiError::MissingArgument { .. })
        ));
    }

    #[test]
    fn test_factory_of_inject() {
        struct Doubled(u32);

        impl Inject for Doubled {
            fn params() -> Vec<Param> {
                vec![Param::of::<u32>("n")]
            }

            fn inject(args: &Args) -> Result<Self> {
                Ok(Doubled(args.cloned::<u32>("n")? * 2))
            }
        }

        let factory = Factory::of::<Doubled>();
        assert_eq!(factory.params().len(), 1);

        let mut args = Args::new();
        args.insert("n", Arc::new(21u32));
        let value = factory.create(&args).unwrap().downcast::<Doubled>().unwrap();
        assert_eq!(value.0, 42);
    }
}
