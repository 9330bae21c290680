//! Demo of the structured logging emitted by the container
//!
//! Run with JSON logging (production):
//! ```bash
//! cargo run --example logging --features logging-json
//! ```
//!
//! Run with pretty logging (development):
//! ```bash
//! cargo run --example logging --features logging-pretty
//! ```

use keyed_injector::{ContainerBuilder, Dependency, DiError, Factory, Key, kwargs};
use std::sync::Arc;

struct Database {
    url: String,
}

struct UserService {
    db: Arc<Database>,
}

#[allow(dead_code)]
struct RequestContext {
    request_id: u64,
}

fn main() -> Result<(), DiError> {
    // JSON if logging-json is enabled, pretty if logging-pretty
    keyed_injector::logging::builder().trace().injector_only().init();

    println!("=== Keyed Injector Logging Demo ===\n");

    let mut builder = ContainerBuilder::new();

    // logs: "Registering service"
    builder
        .singleton(
            "primary_db",
            Factory::from_fn(|| Database {
                url: "postgres://localhost/mydb".into(),
            }),
        )?
        .singleton_with(
            Key::of::<UserService>(),
            Factory::new(|args| Ok(UserService { db: args.get("db")? })).param::<Database>("db"),
            kwargs! { db => Dependency::on("primary_db") },
        )?
        .register(
            Key::of::<RequestContext>(),
            Factory::from_fn(|| {
                println!("  [App] Request context being created...");
                RequestContext { request_id: 12345 }
            }),
        )?;

    // logs: "Replacing an earlier registration"
    builder.register(
        Key::of::<RequestContext>(),
        Factory::from_fn(|| RequestContext { request_id: 67890 }),
    )?;

    // logs: "Dependency graph validated", "Container built"
    let container = builder.build()?;

    // logs: "Creating instance"
    let users = container.get::<UserService>()?;
    println!("  [App] UserService uses {}", users.db.url);
    let _ctx = container.get::<RequestContext>()?;

    // logs: "Service not found in container"
    assert!(container.try_get::<i32>().is_none());

    // logs: "Creating test container", "Overrode service"
    let test = container.create_test_container().with_overridden_singleton(
        "primary_db",
        Factory::from_fn(|| Database {
            url: "sqlite::memory:".into(),
        }),
    )?;
    println!("  [Test] UserService uses {}", test.get::<UserService>()?.db.url);

    // logs: "Refusing to override an unregistered service"
    let refused = test.with_overridden_value("replica_db", 0u8);
    assert!(matches!(refused, Err(DiError::NothingToOverride { .. })));

    // logs: "Missing dependency", "Cycle detected"
    let mut broken = ContainerBuilder::new();
    broken
        .singleton("a", Factory::from_fn(|| 1u8).param_key("b", "b"))?
        .singleton("b", Factory::from_fn(|| 2u8).param_key("a", "a"))?
        .singleton("c", Factory::from_fn(|| 3u8).param_key("cache", "cache"))?;
    if let Err(err) = broken.build() {
        println!("\n{err}");
    }

    println!("\n=== Demo Complete ===");
    println!("\nTip: Use --features logging-json for production (JSON output)");
    println!("     Use --features logging-pretty for development (colorful output)");
    Ok(())
}
