//! Benchmarks for the DI container

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use interface_injector::{Component, Container, Lifetime, implements};
use std::hint::black_box;
use std::sync::Arc;

trait Repository: Send + Sync {
    fn find(&self, id: u32) -> Option<u32>;
}

trait Cache: Send + Sync {
    fn capacity(&self) -> usize;
}

trait Handler: Send + Sync {
    fn handle(&self, id: u32) -> u32;
}

trait Middleware: Send + Sync {
    fn order(&self) -> u32;
}

struct MemoryRepository;

impl Repository for MemoryRepository {
    fn find(&self, id: u32) -> Option<u32> {
        Some(id)
    }
}

impl Component for MemoryRepository {
    type Dependencies = ();

    fn construct(_: ()) -> Self {
        MemoryRepository
    }
}

struct LruCache {
    capacity: usize,
}

impl Cache for LruCache {
    fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Component for LruCache {
    type Dependencies = ();

    fn construct(_: ()) -> Self {
        LruCache { capacity: 1024 }
    }
}

#[allow(dead_code)]
struct UserHandler {
    repository: Arc<dyn Repository>,
    cache: Arc<dyn Cache>,
}

impl Handler for UserHandler {
    fn handle(&self, id: u32) -> u32 {
        self.repository.find(id).unwrap_or_default()
    }
}

impl Component for UserHandler {
    type Dependencies = (Arc<dyn Repository>, Arc<dyn Cache>);

    fn construct((repository, cache): Self::Dependencies) -> Self {
        UserHandler { repository, cache }
    }
}

struct Logging;
struct Auth;
struct Compression;

impl Middleware for Logging {
    fn order(&self) -> u32 {
        0
    }
}

impl Middleware for Auth {
    fn order(&self) -> u32 {
        1
    }
}

impl Middleware for Compression {
    fn order(&self) -> u32 {
        2
    }
}

macro_rules! unit_component {
    ($($ty:ident),+) => {
        $(
            impl Component for $ty {
                type Dependencies = ();

                fn construct(_: ()) -> Self {
                    $ty
                }
            }
        )+
    };
}

unit_component!(Logging, Auth, Compression);

implements!(MemoryRepository => dyn Repository);
implements!(LruCache => dyn Cache);
implements!(UserHandler => dyn Handler);
implements!(Logging => dyn Middleware);
implements!(Auth => dyn Middleware);
implements!(Compression => dyn Middleware);

fn wired(lifetime: Lifetime) -> Container {
    let container = Container::new();
    container.set_default_lifetime(lifetime);
    container.register_type::<dyn Repository, MemoryRepository>().unwrap();
    container.register_type::<dyn Cache, LruCache>().unwrap();
    container.register_type::<dyn Handler, UserHandler>().unwrap();
    container
}

fn bench_registration(c: &mut Criterion) {
    let mut group = c.benchmark_group("registration");

    group.bench_function("register_type", |b| {
        b.iter(|| {
            let container = Container::new();
            container.register_type::<dyn Repository, MemoryRepository>().unwrap();
            black_box(container)
        })
    });

    group.bench_function("register_instance", |b| {
        b.iter(|| {
            let container = Container::new();
            container
                .register::<dyn Cache, LruCache>()
                .instance(Arc::new(LruCache { capacity: 16 }))
                .done()
                .unwrap();
            black_box(container)
        })
    });

    group.bench_function("register_3_interfaces", |b| {
        b.iter(|| black_box(wired(Lifetime::Transient)))
    });

    group.finish();
}

fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution");
    group.throughput(Throughput::Elements(1));

    let singletons = wired(Lifetime::InstanceSingleton);
    let transients = wired(Lifetime::Transient);
    let per_thread = wired(Lifetime::ThreadSingleton);
    let weak = wired(Lifetime::WeakSingleton);
    let _held = weak.get::<dyn Repository>().unwrap();

    group.bench_function("get_singleton", |b| {
        b.iter(|| black_box(singletons.get::<dyn Repository>().unwrap()))
    });

    group.bench_function("get_transient", |b| {
        b.iter(|| black_box(transients.get::<dyn Repository>().unwrap()))
    });

    group.bench_function("get_thread_singleton", |b| {
        b.iter(|| black_box(per_thread.get::<dyn Repository>().unwrap()))
    });

    group.bench_function("get_weak_singleton_held", |b| {
        b.iter(|| black_box(weak.get::<dyn Repository>().unwrap()))
    });

    group.bench_function("contains_check", |b| {
        b.iter(|| black_box(singletons.contains::<dyn Cache>()))
    });

    group.bench_function("resolve_missing", |b| {
        b.iter(|| black_box(singletons.resolve::<dyn Middleware>().unwrap()))
    });

    group.finish();
}

fn bench_auto_wiring(c: &mut Criterion) {
    let mut group = c.benchmark_group("auto_wiring");
    group.throughput(Throughput::Elements(1));

    let transients = wired(Lifetime::Transient);
    let singletons = wired(Lifetime::InstanceSingleton);

    group.bench_function("nested_transient", |b| {
        b.iter(|| black_box(transients.get::<dyn Handler>().unwrap()))
    });

    group.bench_function("nested_singleton", |b| {
        b.iter(|| black_box(singletons.get::<dyn Handler>().unwrap()))
    });

    group.bench_function("create_unregistered", |b| {
        b.iter(|| black_box(transients.create::<UserHandler>().unwrap()))
    });

    group.finish();
}

fn bench_resolve_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_all");

    let container = Container::new();
    container.register_type::<dyn Middleware, Logging>().unwrap();
    container.register_type::<dyn Middleware, Auth>().unwrap();
    container.register_type::<dyn Middleware, Compression>().unwrap();
    group.throughput(Throughput::Elements(3));

    group.bench_function("three_transients", |b| {
        b.iter(|| black_box(container.resolve_all::<dyn Middleware>().unwrap()))
    });

    group.finish();
}

fn bench_scoped(c: &mut Criterion) {
    let mut group = c.benchmark_group("scoped");

    group.bench_function("create_scope", |b| {
        let root = wired(Lifetime::InstanceSingleton);
        b.iter(|| black_box(root.scope()))
    });

    group.bench_function("resolve_from_parent", |b| {
        let root = wired(Lifetime::InstanceSingleton);
        let child = root.scope();
        b.iter(|| black_box(child.get::<dyn Cache>().unwrap()))
    });

    group.bench_function("resolve_from_deep_chain", |b| {
        let root = wired(Lifetime::InstanceSingleton);
        let leaf = root.scope().scope().scope();
        b.iter(|| black_box(leaf.get::<dyn Cache>().unwrap()))
    });

    group.finish();
}

fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let mut group = c.benchmark_group("concurrent");

    let container = wired(Lifetime::InstanceSingleton);
    group.bench_function("4_threads_singleton", |b| {
        b.iter(|| {
            thread::scope(|scope| {
                for _ in 0..4 {
                    scope.spawn(|| {
                        for _ in 0..100 {
                            black_box(container.get::<dyn Handler>().unwrap());
                        }
                    });
                }
            });
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_registration,
    bench_resolution,
    bench_auto_wiring,
    bench_resolve_all,
    bench_scoped,
    bench_concurrent,
);
criterion_main!(benches);
