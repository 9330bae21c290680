//! `#[derive(Inject)]` end to end
#![cfg(feature = "derive")]

use keyed_injector::{ContainerBuilder, DiError, Factory, Inject, Key, kwargs};
use std::sync::Arc;

struct Database {
    url: String,
}

struct Cache {
    size: usize,
}

struct Logger;

#[derive(Inject)]
struct UserService {
    #[inject]
    db: Arc<Database>,
    #[inject]
    cache: Arc<Cache>,
    #[inject(optional)]
    logger: Option<Arc<Logger>>,
    #[inject(default)]
    page_size: usize,
    // Non-injected field uses Default
    request_count: u64,
}

#[derive(Inject)]
struct Reporter {
    #[inject(key = "reports_db")]
    db: Arc<Database>,
    #[inject(key = "title", default)]
    title: String,
}

fn builder() -> ContainerBuilder {
    let mut builder = ContainerBuilder::new();
    builder
        .singleton(
            Key::of::<Database>(),
            Factory::from_fn(|| Database {
                url: "postgres://localhost:5432/myapp".into(),
            }),
        )
        .unwrap()
        .singleton(Key::of::<Cache>(), Factory::from_fn(|| Cache { size: 1024 }))
        .unwrap();
    builder
}

#[test]
fn test_schema_follows_field_order() {
    let params = UserService::params();
    let names: Vec<&str> = params.iter().map(|p| p.name()).collect();

    assert_eq!(names, ["db", "cache", "logger", "page_size"]);
    assert!(!params[0].has_default());
    assert!(params[2].has_default());
    assert!(params[2].default_value().is_none());
    assert!(params[3].default_value().is_some());
    assert_eq!(params[1].key(), &Key::of::<Cache>());
}

#[test]
fn test_provide_derived_service() {
    let mut builder = builder();
    builder.provide::<UserService>().unwrap();
    let container = builder.build().unwrap();

    let service = container.get::<UserService>().unwrap();
    assert_eq!(service.db.url, "postgres://localhost:5432/myapp");
    assert_eq!(service.cache.size, 1024);
    assert!(service.logger.is_none());
    assert_eq!(service.page_size, 0);
    assert_eq!(service.request_count, 0);

    assert!(Arc::ptr_eq(&service.db, &container.get::<Database>().unwrap()));
}

#[test]
fn test_optional_field_filled_when_registered() {
    let mut builder = builder();
    builder
        .singleton(Key::of::<Logger>(), Factory::from_fn(|| Logger))
        .unwrap()
        .singleton(Key::of::<usize>(), Factory::value(50usize))
        .unwrap()
        .provide::<UserService>()
        .unwrap();
    let service = builder.build().unwrap().get::<UserService>().unwrap();

    assert!(service.logger.is_some());
    assert_eq!(service.page_size, 50);
}

#[test]
fn test_explicit_arguments_address_fields() {
    let mut builder = builder();
    builder
        .singleton_with(
            Key::of::<UserService>(),
            Factory::of::<UserService>(),
            kwargs! { page_size => 10usize },
        )
        .unwrap();
    let service = builder.build().unwrap().get::<UserService>().unwrap();

    assert_eq!(service.page_size, 10);
}

#[test]
fn test_string_keyed_fields() {
    let mut builder = ContainerBuilder::new();
    builder.provide::<Reporter>().unwrap();
    let err = builder.build().unwrap_err();
    let report = err.validation().unwrap();
    assert_eq!(
        report.missing().map(|(key, _)| key.clone()).collect::<Vec<_>>(),
        vec![Key::literal("reports_db")]
    );

    let mut builder = ContainerBuilder::new();
    builder
        .singleton(
            "reports_db",
            Factory::from_fn(|| Database {
                url: "postgres://reports".into(),
            }),
        )
        .unwrap()
        .singleton("title", Factory::value(String::from("Weekly")))
        .unwrap()
        .provide::<Reporter>()
        .unwrap();
    let reporter = builder.build().unwrap().get::<Reporter>().unwrap();

    assert_eq!(reporter.db.url, "postgres://reports");
    assert_eq!(reporter.title, "Weekly");
}

#[test]
fn test_missing_required_field_is_a_validation_error() {
    let mut builder = ContainerBuilder::new();
    builder.provide::<UserService>().unwrap();

    assert!(matches!(builder.build(), Err(DiError::Validation(_))));
}
