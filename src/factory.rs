//! Implementation records: factories and per-lifetime instance caches.
//!
//! One [`ImplementationRecord`] exists per (interface, implementation) pair.
//! It owns the way instances are produced (a factory or a pre-built
//! instance) and the cache slots every lifetime needs. The effective lifetime
//! is chosen at resolve time, so all slots live side by side and the match in
//! [`ImplementationRecord::resolve`] picks the one to use.

use crate::{Container, Implements, Lifetime, Result};
use ahash::RandomState;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::any::{Any, TypeId};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, ThreadId};

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// A value a factory produced: the interface pointer plus the same object
/// seen as its concrete type, for the debug store
pub(crate) struct Built<I: ?Sized> {
    pub instance: Arc<I>,
    pub concrete: Arc<dyn Any + Send + Sync>,
}

/// Type-erased factory producing an interface pointer
pub(crate) type ErasedFactory<I> = Arc<dyn Fn(&Container) -> Result<Built<I>> + Send + Sync>;

/// Erase a factory of `T` into a factory of `I`
#[inline]
pub(crate) fn erase<I, T, F>(factory: F) -> ErasedFactory<I>
where
    I: ?Sized + 'static,
    T: Implements<I>,
    F: Fn(&Container) -> Result<Arc<T>> + Send + Sync + 'static,
{
    Arc::new(move |container: &Container| {
        let instance = factory(container)?;
        let concrete: Arc<dyn Any + Send + Sync> = Arc::clone(&instance) as Arc<dyn Any + Send + Sync>;
        Ok(Built {
            instance: <T as Implements<I>>::upcast(instance),
            concrete,
        })
    })
}

/// Callback invoked after an instance was created and the outermost
/// resolution that produced it has finished
pub type OnCreate<I> = Arc<dyn Fn(&Container, Arc<I>) + Send + Sync>;

/// Where instances of a record come from
pub(crate) enum InstanceSource<I: ?Sized> {
    /// Pre-built instance, returned for every lifetime
    Instance(Arc<I>),
    /// Factory invoked on every cache miss
    Factory(ErasedFactory<I>),
}

/// Summary of a registered implementation, for diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplementationInfo {
    /// Concrete type name
    pub type_name: &'static str,
    /// Name given at registration, if any
    pub name: Option<String>,
    /// Lifetime override (`Default` when the record inherits)
    pub lifetime: Lifetime,
    /// Whether the record was pinned as the default implementation
    pub is_default: bool,
    /// Whether the record serves a pre-built instance
    pub has_instance: bool,
}

/// One concrete type registered under one interface
pub(crate) struct ImplementationRecord<I: ?Sized> {
    type_id: TypeId,
    type_name: &'static str,
    name: Option<String>,
    lifetime: Lifetime,
    is_default: bool,
    source: InstanceSource<I>,
    on_create: Option<OnCreate<I>>,
    /// `InstanceSingleton` slot
    strong: OnceCell<Arc<I>>,
    /// `WeakSingleton` slot
    weak: Mutex<Option<Weak<I>>>,
    /// `ThreadSingleton` slots
    per_thread: DashMap<ThreadId, Arc<I>, RandomState>,
}

/// Everything needed to build a record
pub(crate) struct RecordSpec<I: ?Sized> {
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub name: Option<String>,
    pub lifetime: Lifetime,
    pub is_default: bool,
    pub source: InstanceSource<I>,
    pub on_create: Option<OnCreate<I>>,
}

impl<I: ?Sized + Send + Sync + 'static> ImplementationRecord<I> {
    pub(crate) fn new(spec: RecordSpec<I>) -> Self {
        Self {
            type_id: spec.type_id,
            type_name: spec.type_name,
            name: spec.name,
            lifetime: spec.lifetime,
            is_default: spec.is_default,
            source: spec.source,
            on_create: spec.on_create,
            strong: OnceCell::new(),
            weak: Mutex::new(None),
            per_thread: DashMap::with_hasher(RandomState::new()),
        }
    }

    #[inline]
    pub(crate) fn implementation_id(&self) -> TypeId {
        self.type_id
    }

    #[inline]
    pub(crate) fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[inline]
    pub(crate) fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[inline]
    pub(crate) fn is_default(&self) -> bool {
        self.is_default
    }

    pub(crate) fn info(&self) -> ImplementationInfo {
        ImplementationInfo {
            type_name: self.type_name,
            name: self.name.clone(),
            lifetime: self.lifetime,
            is_default: self.is_default,
            has_instance: matches!(self.source, InstanceSource::Instance(_)),
        }
    }

    /// Resolve an instance under `requested` unless this record overrides it.
    pub(crate) fn resolve(&self, container: &Container, requested: Lifetime) -> Result<Arc<I>> {
        let lifetime = self.lifetime.or(requested);

        let factory = match &self.source {
            InstanceSource::Instance(instance) => return Ok(Arc::clone(instance)),
            InstanceSource::Factory(factory) => factory,
        };

        if let Some(cached) = self.cached(lifetime) {
            self.trace_hit(lifetime);
            return Ok(cached);
        }

        self.create(container, factory, lifetime)
    }

    /// The cached instance for `lifetime`, if one is alive
    fn cached(&self, lifetime: Lifetime) -> Option<Arc<I>> {
        if !lifetime.is_cached() {
            return None;
        }

        match lifetime {
            Lifetime::ThreadSingleton => self
                .per_thread
                .get(&thread::current().id())
                .map(|existing| Arc::clone(existing.value())),
            Lifetime::WeakSingleton => self.weak_slot().as_ref().and_then(Weak::upgrade),
            Lifetime::InstanceSingleton => self.strong.get().cloned(),
            Lifetime::Transient | Lifetime::Default => None,
        }
    }

    /// Offer a fresh instance to the cache for `lifetime`.
    ///
    /// Returns the instance callers should receive: the candidate, or an
    /// instance another caller stored first.
    fn store(&self, lifetime: Lifetime, candidate: &Arc<I>) -> Arc<I> {
        match lifetime {
            Lifetime::ThreadSingleton => {
                let thread = thread::current().id();
                Arc::clone(
                    self.per_thread
                        .entry(thread)
                        .or_insert_with(|| Arc::clone(candidate))
                        .value(),
                )
            }
            Lifetime::WeakSingleton => {
                let mut slot = self.weak_slot();
                if let Some(live) = slot.as_ref().and_then(Weak::upgrade) {
                    return live;
                }
                *slot = Some(Arc::downgrade(candidate));
                Arc::clone(candidate)
            }
            // Created outside the cell so a recursive resolve reaches the
            // cycle check instead of blocking on initialization.
            Lifetime::InstanceSingleton => Arc::clone(self.strong.get_or_init(|| Arc::clone(candidate))),
            Lifetime::Transient | Lifetime::Default => Arc::clone(candidate),
        }
    }

    /// Run the factory inside a resolution frame for `I`.
    ///
    /// Only an instance that is actually handed out gets tracked and has its
    /// on-create hook queued; a candidate that lost a cache race is dropped.
    fn create(&self, container: &Container, factory: &ErasedFactory<I>, lifetime: Lifetime) -> Result<Arc<I>> {
        #[cfg(feature = "logging")]
        debug!(
            target: "interface_injector",
            interface = std::any::type_name::<I>(),
            implementation = self.type_name,
            lifetime = %lifetime,
            "Creating new instance"
        );

        container.instantiate::<I, _>(|container| {
            let built = factory(container)?;
            let instance = self.store(lifetime, &built.instance);
            if !Arc::ptr_eq(&instance, &built.instance) {
                #[cfg(feature = "logging")]
                trace!(
                    target: "interface_injector",
                    interface = std::any::type_name::<I>(),
                    implementation = self.type_name,
                    "Discarding instance that lost a cache race"
                );
                return Ok(instance);
            }

            container.track_created(self.type_id, self.type_name, &built.concrete);
            if let Some(hook) = &self.on_create {
                container.report_creation(&instance, Arc::clone(hook));
            }
            Ok(instance)
        })
    }

    fn weak_slot(&self) -> MutexGuard<'_, Option<Weak<I>>> {
        self.weak.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    fn trace_hit(&self, _lifetime: Lifetime) {
        #[cfg(feature = "logging")]
        trace!(
            target: "interface_injector",
            interface = std::any::type_name::<I>(),
            implementation = self.type_name,
            lifetime = %_lifetime,
            "Returning cached instance"
        );
    }
}

impl<I: ?Sized> std::fmt::Debug for ImplementationRecord<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImplementationRecord")
            .field("type_name", &self.type_name)
            .field("name", &self.name)
            .field("lifetime", &self.lifetime)
            .field("is_default", &self.is_default)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Counter(u32);

    fn counting_record(counter: &'static AtomicU32, lifetime: Lifetime) -> ImplementationRecord<Counter> {
        ImplementationRecord::new(RecordSpec {
            type_id: TypeId::of::<Counter>(),
            type_name: std::any::type_name::<Counter>(),
            name: None,
            lifetime,
            is_default: false,
            source: InstanceSource::Factory(erase::<Counter, Counter, _>(move |_| {
                Ok(Arc::new(Counter(counter.fetch_add(1, Ordering::SeqCst))))
            })),
            on_create: None,
        })
    }

    #[test]
    fn test_transient_record() {
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        let container = Container::new();
        let record = counting_record(&COUNTER, Lifetime::Default);

        let a = record.resolve(&container, Lifetime::Transient).unwrap();
        let b = record.resolve(&container, Lifetime::Transient).unwrap();

        assert_eq!(a.0 + 1, b.0);
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_instance_singleton_record() {
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        let container = Container::new();
        let record = counting_record(&COUNTER, Lifetime::Default);

        let a = record.resolve(&container, Lifetime::InstanceSingleton).unwrap();
        let b = record.resolve(&container, Lifetime::InstanceSingleton).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(COUNTER.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_override_beats_requested_lifetime() {
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        let container = Container::new();
        let record = counting_record(&COUNTER, Lifetime::InstanceSingleton);

        let a = record.resolve(&container, Lifetime::Transient).unwrap();
        let b = record.resolve(&container, Lifetime::Transient).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_weak_record_expires() {
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        let container = Container::new();
        let record = counting_record(&COUNTER, Lifetime::WeakSingleton);

        let first = record.resolve(&container, Lifetime::Default).unwrap();
        let again = record.resolve(&container, Lifetime::Default).unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        let first_id = first.0;

        drop(first);
        drop(again);

        let fresh = record.resolve(&container, Lifetime::Default).unwrap();
        assert_ne!(fresh.0, first_id);
    }

    #[test]
    fn test_explicit_instance_ignores_lifetime() {
        let container = Container::new();
        let instance = Arc::new(Counter(7));
        let record = ImplementationRecord::new(RecordSpec {
            type_id: TypeId::of::<Counter>(),
            type_name: "Counter",
            name: Some("fixed".into()),
            lifetime: Lifetime::Transient,
            is_default: false,
            source: InstanceSource::Instance(Arc::clone(&instance)),
            on_create: None,
        });

        let resolved = record.resolve(&container, Lifetime::Transient).unwrap();
        assert!(Arc::ptr_eq(&resolved, &instance));
        assert!(record.info().has_instance);
        assert_eq!(record.name(), Some("fixed"));
    }
}
