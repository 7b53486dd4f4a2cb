//! Dependency injection container
//!
//! The `Container` maps interfaces to the implementations registered for
//! them and resolves instances according to each implementation's lifetime.
//! Resolution recurses through constructor dependencies, detects cycles and
//! defers on-create callbacks until the outermost resolution has finished.

use crate::component::Component;
use crate::factory::{ImplementationRecord, InstanceSource, OnCreate, RecordSpec, erase};
use crate::resolution::{PendingCreation, ResolutionTracker};
use crate::storage::{DebugStore, InterfaceInfo, RegistryMap, TrackedInstance};
use crate::{DiError, Implements, Injectable, Lifetime, Resolvable, Result};
use std::any::{Any, TypeId};
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

#[cfg(feature = "logging")]
use tracing::{debug, trace, warn};

/// Runtime options for a new container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerOptions {
    /// Lifetime used when neither the implementation nor the interface
    /// declares one
    pub default_lifetime: Lifetime,
    /// Expected number of interfaces, used to pre-size the registry map
    pub capacity: usize,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            default_lifetime: Lifetime::Transient,
            capacity: 0,
        }
    }
}

struct ContainerInner {
    registries: RegistryMap,
    default_lifetime: Mutex<Lifetime>,
    /// Shared by every scope derived from the same root
    resolution: Arc<ResolutionTracker>,
    debug_store: DebugStore,
    parent: RwLock<Option<Container>>,
    depth: u32,
}

/// Dependency injection container.
///
/// Cloning is cheap and every clone refers to the same registrations.
///
/// # Examples
///
/// ```rust
/// use interface_injector::{implements, Component, Container};
/// use std::sync::Arc;
///
/// trait Clock: Send + Sync {
///     fn now(&self) -> u64;
/// }
///
/// struct FixedClock;
///
/// impl Clock for FixedClock {
///     fn now(&self) -> u64 { 42 }
/// }
///
/// impl Component for FixedClock {
///     type Dependencies = ();
///     fn construct(_: ()) -> Self { FixedClock }
/// }
///
/// implements!(FixedClock => dyn Clock);
///
/// let container = Container::new();
/// container.register_type::<dyn Clock, FixedClock>().unwrap();
///
/// let clock = container.get::<dyn Clock>().unwrap();
/// assert_eq!(clock.now(), 42);
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

impl Container {
    /// Create a new root container with the `Transient` default lifetime.
    #[inline]
    pub fn new() -> Self {
        Self::with_options(ContainerOptions::default())
    }

    /// Create a new root container from explicit options.
    pub fn with_options(options: ContainerOptions) -> Self {
        #[cfg(feature = "logging")]
        debug!(
            target: "interface_injector",
            default_lifetime = %options.default_lifetime,
            capacity = options.capacity,
            "Creating new root DI container"
        );

        Self {
            inner: Arc::new(ContainerInner {
                registries: RegistryMap::with_capacity(options.capacity),
                default_lifetime: Mutex::new(options.default_lifetime.or(Lifetime::Transient)),
                resolution: Arc::new(ResolutionTracker::new()),
                debug_store: DebugStore::new(),
                parent: RwLock::new(None),
                depth: 0,
            }),
        }
    }

    /// Create a child scope.
    ///
    /// The child starts with no registrations of its own. Interfaces it has
    /// no implementation for are resolved by the parent chain. The child
    /// inherits the parent's current default lifetime.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use interface_injector::Container;
    /// use std::sync::Arc;
    ///
    /// struct Config(&'static str);
    ///
    /// let root = Container::new();
    /// root.register::<Config, Config>()
    ///     .instance(Arc::new(Config("root")))
    ///     .done()
    ///     .unwrap();
    ///
    /// let request = root.scope();
    /// assert_eq!(request.get::<Config>().unwrap().0, "root");
    /// ```
    pub fn scope(&self) -> Self {
        let child_depth = self.inner.depth + 1;

        #[cfg(feature = "logging")]
        debug!(
            target: "interface_injector",
            parent_depth = self.inner.depth,
            child_depth = child_depth,
            parent_interfaces = self.inner.registries.len(),
            "Creating child scope from parent container"
        );

        Self {
            inner: Arc::new(ContainerInner {
                registries: RegistryMap::with_capacity(0),
                default_lifetime: Mutex::new(self.default_lifetime()),
                resolution: Arc::clone(&self.inner.resolution),
                debug_store: DebugStore::new(),
                parent: RwLock::new(Some(self.clone())),
                depth: child_depth,
            }),
        }
    }

    /// The parent of this scope, if any.
    pub fn parent(&self) -> Option<Container> {
        self.inner
            .parent
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Scope depth (0 for a root container).
    #[inline]
    pub fn depth(&self) -> u32 {
        self.inner.depth
    }

    /// Lifetime applied when nothing more specific is declared.
    pub fn default_lifetime(&self) -> Lifetime {
        *self
            .inner
            .default_lifetime
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Change the container-wide default lifetime.
    ///
    /// `Lifetime::Default` is stored as `Transient`, since there is nothing
    /// left to inherit from at container level.
    pub fn set_default_lifetime(&self, lifetime: Lifetime) {
        let lifetime = lifetime.or(Lifetime::Transient);

        #[cfg(feature = "logging")]
        debug!(
            target: "interface_injector",
            lifetime = %lifetime,
            "Setting container default lifetime"
        );

        *self
            .inner
            .default_lifetime
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = lifetime;
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Declare the lifetime every implementation of `I` resolves with,
    /// unless an implementation overrides it.
    ///
    /// May be called before or after implementations are registered.
    pub fn declare_interface<I: ?Sized + Injectable>(&self, lifetime: Lifetime) -> Result<()> {
        #[cfg(feature = "logging")]
        debug!(
            target: "interface_injector",
            interface = std::any::type_name::<I>(),
            lifetime = %lifetime,
            "Declaring interface lifetime"
        );

        self.inner.registries.get_or_create::<I>()?.declare(lifetime);
        Ok(())
    }

    /// Start registering `T` as an implementation of `I`.
    ///
    /// Nothing is registered until [`Registration::done`] is called.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use interface_injector::{implements, Container, Lifetime};
    /// use std::sync::Arc;
    ///
    /// trait Store: Send + Sync {
    ///     fn get(&self, key: &str) -> Option<String>;
    /// }
    ///
    /// struct MemoryStore;
    ///
    /// impl Store for MemoryStore {
    ///     fn get(&self, _key: &str) -> Option<String> { None }
    /// }
    ///
    /// implements!(MemoryStore => dyn Store);
    ///
    /// let container = Container::new();
    /// container
    ///     .register::<dyn Store, MemoryStore>()
    ///     .named("memory")
    ///     .lifetime(Lifetime::InstanceSingleton)
    ///     .factory(|_| Ok(Arc::new(MemoryStore)))
    ///     .done()
    ///     .unwrap();
    ///
    /// let a = container.get::<dyn Store>().unwrap();
    /// let b = container.resolve_by_name::<dyn Store>("memory").unwrap().unwrap();
    /// assert!(Arc::ptr_eq(&a, &b));
    /// ```
    #[inline]
    pub fn register<I, T>(&self) -> Registration<'_, I, T>
    where
        I: ?Sized + Injectable,
        T: Implements<I>,
    {
        Registration {
            container: self,
            options: RegistrationOptions {
                name: None,
                lifetime: Lifetime::Default,
                is_default: false,
                on_create: None,
            },
            source: Auto,
            _implementation: PhantomData,
        }
    }

    /// Register `T` for `I` with its deduced constructor and no modifiers.
    #[inline]
    pub fn register_type<I, T>(&self) -> Result<()>
    where
        I: ?Sized + Injectable,
        T: Component + Implements<I>,
    {
        self.register::<I, T>().done()
    }

    fn commit<I, T>(
        &self,
        options: RegistrationOptions<I>,
        lifetime: Lifetime,
        source: InstanceSource<I>,
    ) -> Result<()>
    where
        I: ?Sized + Injectable,
        T: Implements<I>,
    {
        let registry = self.inner.registries.get_or_create::<I>()?;

        #[cfg(feature = "logging")]
        let (is_default, explicit_instance) = (
            options.is_default,
            matches!(source, InstanceSource::Instance(_)),
        );

        let inserted = registry.register(ImplementationRecord::new(RecordSpec {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            name: options.name,
            lifetime,
            is_default: options.is_default,
            source,
            on_create: options.on_create,
        }));
        if !inserted {
            return Err(DiError::already_registered::<I, T>());
        }

        #[cfg(feature = "logging")]
        debug!(
            target: "interface_injector",
            interface = std::any::type_name::<I>(),
            implementation = std::any::type_name::<T>(),
            lifetime = %lifetime,
            is_default = is_default,
            explicit_instance = explicit_instance,
            depth = self.inner.depth,
            "Registered implementation"
        );

        Ok(())
    }

    /// Whether `I` has at least one implementation in this scope or an
    /// ancestor.
    pub fn contains<I: ?Sized + Injectable>(&self) -> bool {
        let local = matches!(
            self.inner.registries.get::<I>(),
            Ok(Some(registry)) if !registry.is_empty()
        );
        local || self.parent().is_some_and(|parent| parent.contains::<I>())
    }

    /// Alias for [`contains`](Self::contains).
    #[inline]
    pub fn has_any_implementations_of<I: ?Sized + Injectable>(&self) -> bool {
        self.contains::<I>()
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Resolve the active implementation of `I`.
    ///
    /// Returns `Ok(None)` when no implementation is registered anywhere in
    /// the scope chain. Faults raised while constructing the instance or its
    /// dependencies are returned as errors.
    pub fn resolve<I: ?Sized + Injectable>(&self) -> Result<Option<Arc<I>>> {
        #[cfg(feature = "logging")]
        trace!(
            target: "interface_injector",
            interface = std::any::type_name::<I>(),
            depth = self.inner.depth,
            "Resolving interface"
        );

        if let Some(registry) = self.local_registry::<I>()? {
            return registry.resolve(self, self.default_lifetime());
        }

        match self.parent() {
            Some(parent) => parent.resolve::<I>(),
            None => {
                #[cfg(feature = "logging")]
                trace!(
                    target: "interface_injector",
                    interface = std::any::type_name::<I>(),
                    "No implementation registered"
                );
                Ok(None)
            }
        }
    }

    /// Resolve the first implementation of `I` registered under `name`.
    pub fn resolve_by_name<I: ?Sized + Injectable>(&self, name: &str) -> Result<Option<Arc<I>>> {
        #[cfg(feature = "logging")]
        trace!(
            target: "interface_injector",
            interface = std::any::type_name::<I>(),
            name = name,
            "Resolving interface by name"
        );

        if let Some(registry) = self.local_registry::<I>()? {
            if let Some(found) = registry.resolve_by_name(self, name, self.default_lifetime())? {
                return Ok(Some(found));
            }
        }

        match self.parent() {
            Some(parent) => parent.resolve_by_name::<I>(name),
            None => Ok(None),
        }
    }

    /// Resolve one instance per implementation of `I`, in resolution order.
    ///
    /// A scope with its own implementations of `I` does not merge in its
    /// parent's.
    pub fn resolve_all<I: ?Sized + Injectable>(&self) -> Result<Vec<Arc<I>>> {
        #[cfg(feature = "logging")]
        trace!(
            target: "interface_injector",
            interface = std::any::type_name::<I>(),
            "Resolving all implementations"
        );

        if let Some(registry) = self.local_registry::<I>()? {
            return registry.resolve_all(self, self.default_lifetime());
        }

        match self.parent() {
            Some(parent) => parent.resolve_all::<I>(),
            None => Ok(Vec::new()),
        }
    }

    /// Resolve `I`, failing with [`DiError::NotFound`] when nothing is
    /// registered.
    #[inline]
    pub fn get<I: ?Sized + Injectable>(&self) -> Result<Arc<I>> {
        self.resolve::<I>()?.ok_or_else(DiError::not_found::<I>)
    }

    /// Resolve `I`, discarding any error.
    #[inline]
    pub fn try_get<I: ?Sized + Injectable>(&self) -> Option<Arc<I>> {
        self.get::<I>().ok()
    }

    /// Local registry for `I`, if it has any implementation
    fn local_registry<I: ?Sized + Injectable>(
        &self,
    ) -> Result<Option<Arc<crate::storage::InterfaceRegistry<I>>>> {
        Ok(self
            .inner
            .registries
            .get::<I>()?
            .filter(|registry| !registry.is_empty()))
    }

    /// Run `create` inside a resolution frame for `I`.
    ///
    /// Fails with [`DiError::CircularDependency`] if `I` is already being
    /// resolved on this thread. When the frame was the outermost one, queued
    /// on-create callbacks run after it is popped, or are dropped if creation
    /// failed.
    pub(crate) fn instantiate<I, F>(&self, create: F) -> Result<Arc<I>>
    where
        I: ?Sized + Injectable,
        F: FnOnce(&Container) -> Result<Arc<I>>,
    {
        let frame = self.inner.resolution.enter::<I>()?;
        let created = create(self);
        drop(frame);

        let pending = self.inner.resolution.take_if_outermost();
        match &created {
            Ok(_) => {
                for creation in pending {
                    creation.notify(self);
                }
            }
            Err(_err) => {
                if !pending.is_empty() {
                    #[cfg(feature = "logging")]
                    warn!(
                        target: "interface_injector",
                        interface = std::any::type_name::<I>(),
                        discarded = pending.len(),
                        error = %_err,
                        "Resolution failed, discarding pending on-create callbacks"
                    );
                }
            }
        }

        created
    }

    /// Queue `hook` for `instance` until the outermost resolution completes.
    pub(crate) fn report_creation<I: ?Sized + Injectable>(&self, instance: &Arc<I>, hook: OnCreate<I>) {
        let address = Arc::as_ptr(instance) as *const () as usize;
        let instance = Arc::clone(instance);

        self.inner.resolution.report(PendingCreation::new(
            address,
            Box::new(move |container: &Container| hook(container, instance)),
        ));
    }

    /// Remember a created instance in the debug store.
    #[inline]
    pub(crate) fn track<T: Injectable>(&self, instance: &Arc<T>) {
        self.inner.debug_store.track(instance);
    }

    #[inline]
    pub(crate) fn track_created(
        &self,
        type_id: TypeId,
        type_name: &'static str,
        instance: &Arc<dyn Any + Send + Sync>,
    ) {
        self.inner.debug_store.track_erased(type_id, type_name, instance);
    }

    /// Number of interfaces the calling thread is currently resolving.
    ///
    /// Non-zero only when called from inside a factory or constructor.
    pub fn resolution_depth(&self) -> usize {
        self.inner.resolution.depth()
    }

    /// Interfaces the calling thread is currently resolving, outermost first.
    pub fn resolution_chain(&self) -> Vec<&'static str> {
        self.inner.resolution.chain()
    }

    // =========================================================================
    // Teardown and introspection
    // =========================================================================

    /// Drop every interface registry, with all cached instances, and detach
    /// from the parent scope.
    pub fn destroy_all(&self) {
        #[cfg(feature = "logging")]
        debug!(
            target: "interface_injector",
            depth = self.inner.depth,
            interfaces = self.inner.registries.len(),
            "Destroying all registrations"
        );

        self.inner.registries.clear();
        *self
            .inner
            .parent
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Registered interfaces of this scope, sorted by name.
    pub fn interfaces(&self) -> Vec<InterfaceInfo> {
        self.inner.registries.infos()
    }

    /// Instances this scope has created, sorted by address.
    pub fn debug_store(&self) -> Vec<TrackedInstance> {
        self.inner.debug_store.snapshot()
    }

    /// Forget instances that no longer exist. Returns how many were removed.
    pub fn prune_debug_store(&self) -> usize {
        self.inner.debug_store.prune()
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("interface_count", &self.inner.registries.len())
            .field(
                "implementation_count",
                &self.inner.registries.implementation_count(),
            )
            .field("default_lifetime", &self.default_lifetime())
            .field("tracked_instances", &self.inner.debug_store.len())
            .field("depth", &self.inner.depth)
            .field("has_parent", &self.parent().is_some())
            .finish()
    }
}

// =============================================================================
// Registration builder
// =============================================================================

/// Source state: the factory is deduced from [`Component`]
pub struct Auto;

/// Source state: a pre-built instance served for every lifetime
pub struct FromInstance<T>(Arc<T>);

/// Source state: a caller-supplied factory
pub struct FromFactory<F>(F);

struct RegistrationOptions<I: ?Sized> {
    name: Option<String>,
    lifetime: Lifetime,
    is_default: bool,
    on_create: Option<OnCreate<I>>,
}

/// Fluent registration of one implementation.
///
/// An explicit instance and a custom factory exclude each other: both are
/// only offered from the initial state.
#[must_use = "registrations take effect only when `done` is called"]
pub struct Registration<'c, I: ?Sized, T, S = Auto> {
    container: &'c Container,
    options: RegistrationOptions<I>,
    source: S,
    _implementation: PhantomData<fn() -> T>,
}

impl<'c, I, T, S> Registration<'c, I, T, S>
where
    I: ?Sized + Injectable,
    T: Implements<I>,
{
    /// Name this implementation for [`Container::resolve_by_name`]
    #[inline]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.options.name = Some(name.into());
        self
    }

    /// Override the lifetime for this implementation
    #[inline]
    pub fn lifetime(mut self, lifetime: Lifetime) -> Self {
        self.options.lifetime = lifetime;
        self
    }

    /// Pin this implementation as the one bare requests resolve to,
    /// regardless of later registrations
    #[inline]
    pub fn as_default(mut self) -> Self {
        self.options.is_default = true;
        self
    }

    /// Run `hook` for every instance created from this registration, once
    /// the outermost resolution that produced it has completed
    #[inline]
    pub fn on_create<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Container, Arc<I>) + Send + Sync + 'static,
    {
        self.options.on_create = Some(Arc::new(hook));
        self
    }

    fn with_source<S2>(self, source: S2) -> Registration<'c, I, T, S2> {
        Registration {
            container: self.container,
            options: self.options,
            source,
            _implementation: PhantomData,
        }
    }
}

impl<'c, I, T> Registration<'c, I, T, Auto>
where
    I: ?Sized + Injectable,
    T: Implements<I>,
{
    /// Serve `instance` for every resolution, whatever the lifetime
    #[inline]
    pub fn instance(self, instance: Arc<T>) -> Registration<'c, I, T, FromInstance<T>> {
        self.with_source(FromInstance(instance))
    }

    /// Create instances with `factory` instead of the deduced constructor.
    ///
    /// The factory may hand back an object that already exists, for example
    /// one singleton served under several interfaces.
    #[inline]
    pub fn factory<F>(self, factory: F) -> Registration<'c, I, T, FromFactory<F>>
    where
        F: Fn(&Container) -> Result<Arc<T>> + Send + Sync + 'static,
    {
        self.with_source(FromFactory(factory))
    }

    /// Commit the registration with the deduced constructor.
    ///
    /// The implementation's declared [`Component::LIFETIME`] applies unless
    /// [`lifetime`](Registration::lifetime) overrode it.
    pub fn done(self) -> Result<()>
    where
        T: Component,
    {
        let lifetime = self.options.lifetime.or(T::LIFETIME);
        let factory = erase::<I, T, _>(|container: &Container| {
            let dependencies = <T::Dependencies as Resolvable>::resolve(container)?;
            Ok(Arc::new(T::construct(dependencies)))
        });

        self.container
            .commit::<I, T>(self.options, lifetime, InstanceSource::Factory(factory))
    }
}

impl<I, T> Registration<'_, I, T, FromInstance<T>>
where
    I: ?Sized + Injectable,
    T: Implements<I>,
{
    /// Commit the registration
    pub fn done(self) -> Result<()> {
        let lifetime = self.options.lifetime;
        let FromInstance(instance) = self.source;
        let instance = <T as Implements<I>>::upcast(instance);

        self.container
            .commit::<I, T>(self.options, lifetime, InstanceSource::Instance(instance))
    }
}

impl<I, T, F> Registration<'_, I, T, FromFactory<F>>
where
    I: ?Sized + Injectable,
    T: Implements<I>,
    F: Fn(&Container) -> Result<Arc<T>> + Send + Sync + 'static,
{
    /// Commit the registration
    pub fn done(self) -> Result<()> {
        let lifetime = self.options.lifetime;
        let FromFactory(create) = self.source;
        let factory = erase::<I, T, _>(create);

        self.container
            .commit::<I, T>(self.options, lifetime, InstanceSource::Factory(factory))
    }
}
