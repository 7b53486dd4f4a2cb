//! Registry storage for the DI container
//!
//! Uses DashMap with ahash for the type-indexed maps. Guards are never held
//! across a call into user code: records are cloned out of the maps first, so
//! factories may resolve (or register) recursively.

use crate::factory::{ImplementationInfo, ImplementationRecord};
use crate::{Container, DiError, Injectable, Lifetime, Result};
use ahash::RandomState;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::any::{Any, TypeId};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

// =============================================================================
// Interface Registry
// =============================================================================

/// All implementations registered for one interface
pub(crate) struct InterfaceRegistry<I: ?Sized> {
    /// Lifetime declared for the interface (`Default` = not declared)
    declared: Mutex<Lifetime>,
    /// Type-indexed records, for duplicate detection and lookup
    implementations: DashMap<TypeId, Arc<ImplementationRecord<I>>, RandomState>,
    /// Records in resolution order: registration order, with records
    /// pinned as default moved to the front
    ordered: RwLock<Vec<Arc<ImplementationRecord<I>>>>,
}

impl<I: ?Sized + Injectable> InterfaceRegistry<I> {
    pub(crate) fn new() -> Self {
        Self {
            declared: Mutex::new(Lifetime::Default),
            implementations: DashMap::with_hasher(RandomState::new()),
            ordered: RwLock::new(Vec::new()),
        }
    }

    #[inline]
    pub(crate) fn declared_lifetime(&self) -> Lifetime {
        *self.declared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    pub(crate) fn declare(&self, lifetime: Lifetime) {
        *self.declared.lock().unwrap_or_else(PoisonError::into_inner) = lifetime;
    }

    /// Add a record. Returns `false`, leaving the registry untouched, if its
    /// implementation type is already registered.
    pub(crate) fn register(&self, record: ImplementationRecord<I>) -> bool {
        match self.implementations.entry(record.implementation_id()) {
            Entry::Occupied(_) => return false,
            Entry::Vacant(slot) => {
                let record = Arc::new(record);
                slot.insert(Arc::clone(&record));

                let mut ordered = self.ordered.write().unwrap_or_else(PoisonError::into_inner);
                if record.is_default() {
                    ordered.insert(0, record);
                } else {
                    ordered.push(record);
                }
            }
        }
        true
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.implementations.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.implementations.is_empty()
    }

    /// Snapshot of the ordered records, so no lock is held while resolving
    fn snapshot(&self) -> Vec<Arc<ImplementationRecord<I>>> {
        self.ordered
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The record a bare request resolves to: the most recently pinned
    /// default (always at the front), else the most recently registered.
    fn active(&self) -> Option<Arc<ImplementationRecord<I>>> {
        let ordered = self.ordered.read().unwrap_or_else(PoisonError::into_inner);
        match ordered.first() {
            Some(first) if first.is_default() => Some(Arc::clone(first)),
            _ => ordered.last().cloned(),
        }
    }

    /// Resolve the active implementation.
    ///
    /// Returns `Ok(None)` when nothing is registered.
    pub(crate) fn resolve(&self, container: &Container, requested: Lifetime) -> Result<Option<Arc<I>>> {
        let lifetime = self.declared_lifetime().or(requested);
        match self.active() {
            Some(record) => record.resolve(container, lifetime).map(Some),
            None => Ok(None),
        }
    }

    /// Resolve every implementation, in resolution order.
    ///
    /// The first failing implementation aborts the whole batch.
    pub(crate) fn resolve_all(&self, container: &Container, requested: Lifetime) -> Result<Vec<Arc<I>>> {
        let lifetime = self.declared_lifetime().or(requested);
        self.snapshot()
            .iter()
            .map(|record| record.resolve(container, lifetime))
            .collect()
    }

    /// Resolve the first implementation registered under `name`.
    pub(crate) fn resolve_by_name(
        &self,
        container: &Container,
        name: &str,
        requested: Lifetime,
    ) -> Result<Option<Arc<I>>> {
        let lifetime = self.declared_lifetime().or(requested);
        let record = self
            .snapshot()
            .into_iter()
            .find(|record| record.name() == Some(name));

        match record {
            Some(record) => record.resolve(container, lifetime).map(Some),
            None => Ok(None),
        }
    }
}

// =============================================================================
// Type-erased registry access
// =============================================================================

/// Summary of a registered interface, for diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceInfo {
    /// Interface type name
    pub type_name: &'static str,
    /// Lifetime declared for the interface (`Default` when undeclared)
    pub declared_lifetime: Lifetime,
    /// Implementations in resolution order, pinned defaults first
    pub implementations: Vec<ImplementationInfo>,
}

/// Object-safe view of an [`InterfaceRegistry`] of any interface
pub(crate) trait ErasedRegistry: Send + Sync {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;

    fn info(&self) -> InterfaceInfo;

    fn implementation_count(&self) -> usize;
}

impl<I: ?Sized + Injectable> ErasedRegistry for InterfaceRegistry<I> {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }

    fn info(&self) -> InterfaceInfo {
        InterfaceInfo {
            type_name: std::any::type_name::<I>(),
            declared_lifetime: self.declared_lifetime(),
            implementations: self.snapshot().iter().map(|record| record.info()).collect(),
        }
    }

    fn implementation_count(&self) -> usize {
        self.len()
    }
}

/// Map from interface TypeId to its registry
pub(crate) struct RegistryMap {
    registries: DashMap<TypeId, Arc<dyn ErasedRegistry>, RandomState>,
}

impl RegistryMap {
    /// Create with pre-allocated capacity and a small shard count.
    ///
    /// Default DashMap uses num_cpus * 4 shards which is overkill for
    /// typical containers with a few dozen interfaces.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let shard_amount = if capacity <= 16 {
            8
        } else if capacity <= 64 {
            16
        } else {
            32
        };
        Self {
            registries: DashMap::with_capacity_and_hasher_and_shard_amount(
                capacity,
                RandomState::new(),
                shard_amount,
            ),
        }
    }

    /// Registry for `I`, if one was created
    pub(crate) fn get<I: ?Sized + Injectable>(&self) -> Result<Option<Arc<InterfaceRegistry<I>>>> {
        let erased = self
            .registries
            .get(&TypeId::of::<I>())
            .map(|entry| Arc::clone(entry.value()));

        erased.map(downcast_registry::<I>).transpose()
    }

    /// Registry for `I`, created on first reference
    pub(crate) fn get_or_create<I: ?Sized + Injectable>(&self) -> Result<Arc<InterfaceRegistry<I>>> {
        let erased = Arc::clone(
            self.registries
                .entry(TypeId::of::<I>())
                .or_insert_with(|| Arc::new(InterfaceRegistry::<I>::new()))
                .value(),
        );

        downcast_registry::<I>(erased)
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.registries.len()
    }

    pub(crate) fn clear(&self) {
        self.registries.clear();
    }

    pub(crate) fn infos(&self) -> Vec<InterfaceInfo> {
        let registries: Vec<Arc<dyn ErasedRegistry>> = self
            .registries
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut infos: Vec<InterfaceInfo> = registries.iter().map(|registry| registry.info()).collect();
        infos.sort_by(|a, b| a.type_name.cmp(b.type_name));
        infos
    }

    pub(crate) fn implementation_count(&self) -> usize {
        self.registries
            .iter()
            .map(|entry| entry.value().implementation_count())
            .sum()
    }
}

fn downcast_registry<I: ?Sized + Injectable>(
    erased: Arc<dyn ErasedRegistry>,
) -> Result<Arc<InterfaceRegistry<I>>> {
    erased.into_any().downcast::<InterfaceRegistry<I>>().map_err(|_| {
        DiError::Internal(format!(
            "registry stored for {} has a different interface type",
            std::any::type_name::<I>()
        ))
    })
}

// =============================================================================
// Debug Store
// =============================================================================

/// A tracked instance, for diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedInstance {
    /// Raw address of the instance
    pub address: usize,
    /// Concrete type of the instance
    pub type_id: TypeId,
    /// Concrete type name of the instance
    pub type_name: &'static str,
    /// Whether any strong reference is still alive
    pub alive: bool,
}

struct TrackedEntry {
    type_id: TypeId,
    type_name: &'static str,
    instance: Weak<dyn Any + Send + Sync>,
}

/// Weak index of every instance the container created
pub(crate) struct DebugStore {
    entries: DashMap<usize, TrackedEntry, RandomState>,
}

impl DebugStore {
    pub(crate) fn new() -> Self {
        Self {
            entries: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Record a freshly created instance.
    #[inline]
    pub(crate) fn track<T: Injectable>(&self, instance: &Arc<T>) {
        let concrete: Arc<dyn Any + Send + Sync> = Arc::clone(instance) as Arc<dyn Any + Send + Sync>;
        self.track_erased(TypeId::of::<T>(), std::any::type_name::<T>(), &concrete);
    }

    /// Record an instance already erased to `dyn Any`.
    ///
    /// An address already tracked for a live instance is left alone (the
    /// same object can come back through another interface). An expired
    /// entry at the same address is replaced.
    pub(crate) fn track_erased(
        &self,
        type_id: TypeId,
        type_name: &'static str,
        instance: &Arc<dyn Any + Send + Sync>,
    ) {
        let address = Arc::as_ptr(instance) as *const () as usize;
        let entry = TrackedEntry {
            type_id,
            type_name,
            instance: Arc::downgrade(instance),
        };

        match self.entries.entry(address) {
            Entry::Occupied(mut existing) => {
                if existing.get().instance.strong_count() == 0 {
                    existing.insert(entry);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(entry);
            }
        }
    }

    pub(crate) fn snapshot(&self) -> Vec<TrackedInstance> {
        let mut instances: Vec<TrackedInstance> = self
            .entries
            .iter()
            .map(|entry| TrackedInstance {
                address: *entry.key(),
                type_id: entry.value().type_id,
                type_name: entry.value().type_name,
                alive: entry.value().instance.strong_count() > 0,
            })
            .collect();
        instances.sort_by_key(|instance| instance.address);
        instances
    }

    /// Drop entries whose instance is gone. Returns how many were removed.
    pub(crate) fn prune(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.instance.strong_count() > 0);
        before - self.entries.len()
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Implements;
    use crate::factory::{InstanceSource, RecordSpec, erase};

    trait Plugin: Send + Sync {
        fn id(&self) -> &'static str;
    }

    struct First;
    struct Second;
    struct Third;

    impl Plugin for First {
        fn id(&self) -> &'static str {
            "first"
        }
    }

    impl Plugin for Second {
        fn id(&self) -> &'static str {
            "second"
        }
    }

    impl Plugin for Third {
        fn id(&self) -> &'static str {
            "third"
        }
    }

    crate::implements!(First => dyn Plugin);
    crate::implements!(Second => dyn Plugin);
    crate::implements!(Third => dyn Plugin);

    fn record<T: Implements<dyn Plugin>>(
        make: fn() -> T,
        name: Option<&str>,
        is_default: bool,
    ) -> ImplementationRecord<dyn Plugin> {
        ImplementationRecord::new(RecordSpec {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            name: name.map(str::to_string),
            lifetime: Lifetime::Default,
            is_default,
            source: InstanceSource::Factory(erase::<dyn Plugin, T, _>(move |_| Ok(Arc::new(make())))),
            on_create: None,
        })
    }

    #[test]
    fn test_empty_registry_resolves_to_none() {
        let container = Container::new();
        let registry = InterfaceRegistry::<dyn Plugin>::new();

        assert!(registry.is_empty());
        assert!(registry.resolve(&container, Lifetime::Transient).unwrap().is_none());
        assert!(registry.resolve_all(&container, Lifetime::Transient).unwrap().is_empty());
    }

    #[test]
    fn test_last_registration_wins() {
        let container = Container::new();
        let registry = InterfaceRegistry::<dyn Plugin>::new();
        assert!(registry.register(record(|| First, None, false)));
        assert!(registry.register(record(|| Second, None, false)));

        let active = registry.resolve(&container, Lifetime::Transient).unwrap().unwrap();
        assert_eq!(active.id(), "second");
    }

    #[test]
    fn test_default_pinned_to_front() {
        let container = Container::new();
        let registry = InterfaceRegistry::<dyn Plugin>::new();
        assert!(registry.register(record(|| Second, None, false)));
        assert!(registry.register(record(|| First, None, true)));
        assert!(registry.register(record(|| Third, None, false)));

        let active = registry.resolve(&container, Lifetime::Transient).unwrap().unwrap();
        assert_eq!(active.id(), "first");

        let all = registry.resolve_all(&container, Lifetime::Transient).unwrap();
        let ids: Vec<_> = all.iter().map(|plugin| plugin.id()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_duplicate_rejected() {
        let registry = InterfaceRegistry::<dyn Plugin>::new();
        assert!(registry.register(record(|| First, None, false)));

        assert!(!registry.register(record(|| First, None, false)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_resolve_by_name() {
        let container = Container::new();
        let registry = InterfaceRegistry::<dyn Plugin>::new();
        assert!(registry.register(record(|| First, Some("one"), false)));
        assert!(registry.register(record(|| Second, Some("two"), false)));

        let named = registry
            .resolve_by_name(&container, "one", Lifetime::Transient)
            .unwrap()
            .unwrap();
        assert_eq!(named.id(), "first");
        assert!(registry
            .resolve_by_name(&container, "three", Lifetime::Transient)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_registry_map_downcasts() {
        let map = RegistryMap::with_capacity(0);
        assert!(map.get::<dyn Plugin>().unwrap().is_none());

        let created = map.get_or_create::<dyn Plugin>().unwrap();
        assert!(created.register(record(|| First, None, false)));

        let fetched = map.get::<dyn Plugin>().unwrap().unwrap();
        assert!(Arc::ptr_eq(&created, &fetched));
        assert_eq!(map.len(), 1);
        assert_eq!(map.implementation_count(), 1);

        let infos = map.infos();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].implementations.len(), 1);
    }

    #[test]
    fn test_debug_store_tracks_weakly() {
        let store = DebugStore::new();
        let instance = Arc::new(String::from("tracked"));
        store.track(&instance);
        store.track(&instance);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot[0].alive);
        assert_eq!(snapshot[0].type_id, TypeId::of::<String>());
        assert_eq!(Arc::strong_count(&instance), 1);

        drop(instance);
        assert!(!store.snapshot()[0].alive);
        assert_eq!(store.prune(), 1);
        assert_eq!(store.len(), 0);
    }
}
