//! # Keyed Injector - Validated Dependency Injection for Rust
//!
//! A build-once dependency injection container. Registrations are collected
//! by a [`ContainerBuilder`], the whole dependency graph is validated when the
//! container is built, and resolution afterwards is lazy.
//!
//! ## Features
//!
//! - **Three key shapes** - plain types, parameterized generics and string names
//! - **Validated graphs** - every missing dependency and every cycle is reported by `build()`
//! - **Lifetimes** - lazy singletons and per-resolve transients
//! - **Explicit arguments** - constants or [`Dependency`] markers per parameter
//! - **Self-injection** - factories may ask for the [`Container`] itself
//! - **Test overrides** - [`TestContainer`] swaps registrations without touching the original
//! - **Observable** - optional tracing integration with JSON or pretty output
//!
//! ## Quick Start
//!
//! ```rust
//! use keyed_injector::{ContainerBuilder, Factory, Key};
//! use std::sync::Arc;
//!
//! struct Config { url: String }
//!
//! struct Database { config: Arc<Config> }
//!
//! let mut builder = ContainerBuilder::new();
//! builder
//!     .singleton(Key::of::<Config>(), Factory::from_fn(|| Config { url: "postgres://localhost".into() }))?
//!     .singleton(
//!         Key::of::<Database>(),
//!         Factory::new(|args| Ok(Database { config: args.get("config")? })).param::<Config>("config"),
//!     )?;
//!
//! let container = builder.build()?;
//! let db = container.get::<Database>()?;
//! assert_eq!(db.config.url, "postgres://localhost");
//! # Ok::<(), keyed_injector::DiError>(())
//! ```
//!
//! ## String Keys and Explicit Arguments
//!
//! ```rust
//! use keyed_injector::{kwargs, ContainerBuilder, Dependency, Factory, Key};
//! use std::sync::Arc;
//!
//! struct Queue { name: &'static str }
//! struct Consumer { queue: Arc<Queue>, batch: usize }
//!
//! let mut builder = ContainerBuilder::new();
//! builder
//!     .singleton("first_q", Factory::from_fn(|| Queue { name: "first" }))?
//!     .singleton("second_q", Factory::from_fn(|| Queue { name: "second" }))?
//!     .register_with(
//!         Key::of::<Consumer>(),
//!         Factory::new(|args| Ok(Consumer { queue: args.get("queue")?, batch: args.cloned("batch")? }))
//!             .param::<Queue>("queue")
//!             .param::<usize>("batch"),
//!         kwargs! { queue => Dependency::on("second_q"), batch => 32usize },
//!     )?;
//!
//! let consumer = builder.build()?.get::<Consumer>()?;
//! assert_eq!(consumer.queue.name, "second");
//! assert_eq!(consumer.batch, 32);
//! # Ok::<(), keyed_injector::DiError>(())
//! ```
//!
//! ## Build-Time Validation
//!
//! ```rust
//! use keyed_injector::{ContainerBuilder, Factory};
//!
//! let mut builder = ContainerBuilder::new();
//! builder
//!     .singleton("a", Factory::from_fn(|| 1u8).param_key("b", "b"))?
//!     .singleton("b", Factory::from_fn(|| 2u8).param_key("a", "a"))?
//!     .singleton("c", Factory::from_fn(|| 3u8).param_key("d", "d"))?;
//!
//! let err = builder.build().unwrap_err();
//! let report = err.validation().unwrap();
//! assert_eq!(report.cycles().count(), 1);
//! assert_eq!(report.missing().count(), 1);
//! # Ok::<(), keyed_injector::DiError>(())
//! ```

mod builder;
mod container;
mod error;
mod factory;
mod graph;
mod key;
#[cfg(feature = "logging")]
pub mod logging;
mod provider;
mod registration;
mod storage;
mod testing;

pub use builder::*;
pub use container::*;
pub use error::*;
pub use factory::*;
pub use key::*;
pub use provider::*;
pub use registration::*;
pub use testing::*;

#[cfg(feature = "derive")]
pub use keyed_injector_derive::Inject;

// Re-export tracing macros for convenience when logging feature is enabled
#[cfg(feature = "logging")]
pub use tracing::{debug, error, info, trace, warn};

// Re-export for convenience
pub use std::sync::Arc;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        Args, Container, ContainerBuilder, Dependency, DiError, Factory, Inject, Injectable, Key,
        Kwargs, Lifetime, Param, Result, TestContainer, kwargs,
    };
    pub use std::sync::Arc;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Config {
        url: String,
    }

    struct Database {
        config: Arc<Config>,
    }

    struct UserService {
        db: Arc<Database>,
        page_size: usize,
    }

    fn builder() -> ContainerBuilder {
        let mut builder = ContainerBuilder::new();
        builder
            .singleton(
                Key::of::<Config>(),
                Factory::from_fn(|| Config {
                    url: "postgres://localhost".into(),
                }),
            )
            .unwrap()
            .singleton(
                Key::of::<Database>(),
                Factory::new(|args| {
                    Ok(Database {
                        config: args.get("config")?,
                    })
                })
                .param::<Config>("config"),
            )
            .unwrap()
            .register(
                Key::of::<UserService>(),
                Factory::new(|args| {
                    Ok(UserService {
                        db: args.get("db")?,
                        page_size: args.cloned("page_size")?,
                    })
                })
                .param::<Database>("db")
                .param_or("page_size", 20usize),
            )
            .unwrap();
        builder
    }

    #[test]
    fn test_object_graph() {
        let container = builder().build().unwrap();

        let a = container.get::<UserService>().unwrap();
        let b = container.get::<UserService>().unwrap();

        assert_eq!(a.db.config.url, "postgres://localhost");
        assert_eq!(a.page_size, 20);
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a.db, &b.db));
        assert!(Arc::ptr_eq(&a.db.config, &container.get::<Config>().unwrap()));
    }

    #[test]
    fn test_missing_dependency_message() {
        let mut builder = ContainerBuilder::new();
        builder
            .singleton(
                Key::of::<Database>(),
                Factory::new(|args| {
                    Ok(Database {
                        config: args.get("config")?,
                    })
                })
                .param::<Config>("config"),
            )
            .unwrap();

        let message = builder.build().unwrap_err().to_string();
        assert!(message.contains("No dependency of type"));
        assert!(message.contains(std::any::type_name::<Config>()));
        assert!(message.contains(std::any::type_name::<Database>()));
    }

    #[test]
    fn test_test_container_overrides_deep_dependency() {
        let container = builder().build().unwrap();
        let test = container
            .create_test_container()
            .with_overridden_singleton(
                Key::of::<Config>(),
                Factory::from_fn(|| Config {
                    url: "sqlite::memory:".into(),
                }),
            )
            .unwrap();

        assert_eq!(
            test.get::<UserService>().unwrap().db.config.url,
            "sqlite::memory:"
        );
        assert_eq!(
            container.get::<UserService>().unwrap().db.config.url,
            "postgres://localhost"
        );
    }

    #[test]
    fn test_prelude_exports() {
        use crate::prelude::*;

        let mut builder = ContainerBuilder::new();
        builder
            .singleton_with(
                "greeting",
                Factory::new(|args| args.cloned::<String>("text")).param::<String>("text"),
                kwargs! { text => String::from("hello") },
            )
            .unwrap();
        let container: Container = builder.build().unwrap();

        let greeting: Arc<String> = container.resolve("greeting").unwrap();
        assert_eq!(*greeting, "hello");
    }
}
