//! Example demonstrating logging capabilities
//!
//! Run with JSON logging (production):
//! ```bash
//! cargo run --example logging --features logging-json
//! ```
//!
//! Run with pretty logging at trace level (development):
//! ```bash
//! RUST_LOG=interface_injector=trace cargo run --example logging --features logging-pretty
//! ```

use interface_injector::{Component, Container, Lifetime, implements};
use std::sync::Arc;

trait Database: Send + Sync {
    fn url(&self) -> &str;
}

trait RequestContext: Send + Sync {
    fn request_id(&self) -> &str;
}

trait Broken: Send + Sync {}

struct Postgres;

impl Database for Postgres {
    fn url(&self) -> &str {
        "postgres://localhost/mydb"
    }
}

impl Component for Postgres {
    type Dependencies = ();
    const LIFETIME: Lifetime = Lifetime::InstanceSingleton;

    fn construct(_: ()) -> Self {
        Postgres
    }
}

struct Request {
    id: String,
}

impl RequestContext for Request {
    fn request_id(&self) -> &str {
        &self.id
    }
}

struct Ouroboros;

impl Broken for Ouroboros {}

implements!(Postgres => dyn Database);
implements!(Request => dyn RequestContext);
implements!(Ouroboros => dyn Broken);

fn main() {
    // Pretty or JSON depending on the enabled feature; RUST_LOG overrides the level
    #[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
    interface_injector::logging::builder()
        .trace()
        .from_env()
        .with_thread_names()
        .init();

    println!("=== Interface Injector Logging Demo ===\n");

    // logs: "Creating new root DI container"
    let container = Container::new();

    // logs: "Registered implementation"
    container.register_type::<dyn Database, Postgres>().unwrap();
    container
        .register::<dyn RequestContext, Request>()
        .on_create(|_, ctx| println!("  [App] request context {} ready", ctx.request_id()))
        .factory(|_| {
            Ok(Arc::new(Request {
                id: "default".into(),
            }))
        })
        .done()
        .unwrap();

    // logs: "Resolving interface", "Entering resolution frame", "Creating new instance"
    let db = container.get::<dyn Database>().unwrap();
    println!("  [App] connected to {}", db.url());

    // logs: "Returning cached instance"
    let _again = container.get::<dyn Database>().unwrap();

    // logs: "No implementation registered"
    assert!(container.try_get::<dyn Broken>().is_none());

    // logs: "Creating child scope from parent container"
    let request_scope = container.scope();
    request_scope
        .register::<dyn RequestContext, Request>()
        .instance(Arc::new(Request {
            id: "req-12345".into(),
        }))
        .done()
        .unwrap();

    let ctx = request_scope.get::<dyn RequestContext>().unwrap();
    println!("  [App] scoped request {}", ctx.request_id());

    // Falls back to the parent registration
    let _db_from_child = request_scope.get::<dyn Database>().unwrap();

    // logs a warning: the failed resolution discards pending on-create callbacks
    container
        .register::<dyn Broken, Ouroboros>()
        .factory(|container| {
            container.get::<dyn RequestContext>()?;
            container.get::<dyn Broken>()?;
            Ok(Arc::new(Ouroboros))
        })
        .done()
        .unwrap();
    let err = container.get::<dyn Broken>().err();
    println!("  [App] expected failure: {}", err.map(|e| e.to_string()).unwrap_or_default());

    // logs: "Destroying all registrations"
    request_scope.destroy_all();

    println!("\n=== Demo Complete ===");
    println!("Tip: Use --features logging-json for production (JSON output)");
    println!("     Use --features logging-pretty for development (colorful output)");
}
