//! Wiring a small application through interfaces
//!
//! ```bash
//! cargo run --example wiring
//! ```

use interface_injector::{Component, Container, Lifetime, Module, Result, implements};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

// =============================================================================
// Interfaces
// =============================================================================

trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

trait Store: Send + Sync {
    fn name(&self) -> &'static str;
}

trait Notifier: Send + Sync {
    fn notify(&self, message: &str) -> String;
}

trait OrderService: Send + Sync {
    fn place(&self, item: &str) -> String;
}

// =============================================================================
// Implementations
// =============================================================================

struct TickingClock {
    ticks: AtomicU64,
}

impl Clock for TickingClock {
    fn now(&self) -> u64 {
        self.ticks.fetch_add(1, Ordering::SeqCst)
    }
}

impl Component for TickingClock {
    type Dependencies = ();
    const LIFETIME: Lifetime = Lifetime::InstanceSingleton;

    fn construct(_: ()) -> Self {
        TickingClock {
            ticks: AtomicU64::new(1_000),
        }
    }
}

struct MemoryStore;
struct DiskStore;

impl Store for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }
}

impl Store for DiskStore {
    fn name(&self) -> &'static str {
        "disk"
    }
}

impl Component for MemoryStore {
    type Dependencies = ();

    fn construct(_: ()) -> Self {
        MemoryStore
    }
}

impl Component for DiskStore {
    type Dependencies = ();

    fn construct(_: ()) -> Self {
        DiskStore
    }
}

struct EmailNotifier {
    clock: Arc<dyn Clock>,
}

impl Notifier for EmailNotifier {
    fn notify(&self, message: &str) -> String {
        format!("[email @{}] {message}", self.clock.now())
    }
}

impl Component for EmailNotifier {
    type Dependencies = (Arc<dyn Clock>,);

    fn construct((clock,): Self::Dependencies) -> Self {
        EmailNotifier { clock }
    }
}

struct Orders {
    store: Arc<dyn Store>,
    replicas: Vec<Arc<dyn Store>>,
    notifier: Option<Arc<dyn Notifier>>,
    container: Container,
}

impl OrderService for Orders {
    fn place(&self, item: &str) -> String {
        let receipt = format!(
            "{item} stored in {} ({} replicas)",
            self.store.name(),
            self.replicas.len()
        );
        match &self.notifier {
            Some(notifier) => notifier.notify(&receipt),
            None => receipt,
        }
    }
}

impl Orders {
    /// Late lookup through the container handle
    fn audit_clock(&self) -> Option<u64> {
        self.container.try_get::<dyn Clock>().map(|clock| clock.now())
    }
}

impl Component for Orders {
    type Dependencies = (
        Arc<dyn Store>,
        Vec<Arc<dyn Store>>,
        Option<Arc<dyn Notifier>>,
        Container,
    );

    fn construct((store, replicas, notifier, container): Self::Dependencies) -> Self {
        Orders {
            store,
            replicas,
            notifier,
            container,
        }
    }
}

implements!(TickingClock => dyn Clock);
implements!(MemoryStore => dyn Store);
implements!(DiskStore => dyn Store);
implements!(EmailNotifier => dyn Notifier);
implements!(Orders => dyn OrderService);

// =============================================================================
// Modules
// =============================================================================

struct InfrastructureModule;

impl Module for InfrastructureModule {
    fn register(container: &Container) -> Result<()> {
        container.register_type::<dyn Clock, TickingClock>()?;
        container
            .register::<dyn Store, MemoryStore>()
            .named("memory")
            .as_default()
            .done()?;
        container
            .register::<dyn Store, DiskStore>()
            .named("disk")
            .done()
    }
}

struct ApplicationModule;

impl Module for ApplicationModule {
    fn register(container: &Container) -> Result<()> {
        container
            .register::<dyn Notifier, EmailNotifier>()
            .on_create(|_, notifier| {
                println!("  [hook] notifier ready: {}", notifier.notify("online"));
            })
            .done()?;
        container.register_type::<dyn OrderService, Orders>()
    }
}

fn main() -> Result<()> {
    println!("=== Interface Injector Wiring Demo ===\n");

    let container = Container::new();
    container.install::<InfrastructureModule>()?;
    container.install::<ApplicationModule>()?;

    // The hook prints after the whole Orders graph is built
    let orders = container.get::<dyn OrderService>()?;
    println!("{}", orders.place("keyboard"));

    let disk = container.resolve_by_name::<dyn Store>("disk")?;
    println!(
        "named lookup: {}",
        disk.map(|store| store.name()).unwrap_or("missing")
    );

    let plain = container.create::<Orders>()?;
    println!("audit clock: {:?}", plain.audit_clock());

    println!("\nRegistered interfaces:");
    for interface in container.interfaces() {
        println!(
            "  {} (declared: {})",
            interface.type_name, interface.declared_lifetime
        );
        for implementation in &interface.implementations {
            println!(
                "    - {} name={:?} lifetime={} default={}",
                implementation.type_name,
                implementation.name,
                implementation.lifetime,
                implementation.is_default
            );
        }
    }

    println!("\nTracked instances:");
    for instance in container.debug_store() {
        println!(
            "  {:#x} {} alive={}",
            instance.address, instance.type_name, instance.alive
        );
    }

    println!("\nPruned {} expired entries", container.prune_debug_store());
    Ok(())
}
