//! Components: implementations that declare their constructor dependencies
//!
//! A [`Component`] names its dependencies as a [`Resolvable`] type, usually a
//! tuple of dependency shapes. The container resolves that tuple
//! positionally and hands it to [`Component::construct`].
//!
//! # Supported dependency shapes
//!
//! | Shape              | Resolved with                 | Missing interface  |
//! |--------------------|-------------------------------|--------------------|
//! | `Arc<I>`           | [`Container::get`]            | `DiError::NotFound`|
//! | `Option<Arc<I>>`   | [`Container::resolve`]        | `None`             |
//! | `Vec<Arc<I>>`      | [`Container::resolve_all`]    | empty `Vec`        |
//! | `Container`        | the resolving container       |                    |
//!
//! Tuples of these shapes, up to [`MAX_DEPENDENCIES`] elements, resolve
//! left to right.
//!
//! # Example
//!
//! ```rust
//! use interface_injector::{implements, Component, Container};
//! use std::sync::Arc;
//!
//! trait Database: Send + Sync {
//!     fn url(&self) -> &str;
//! }
//!
//! struct Postgres;
//!
//! impl Database for Postgres {
//!     fn url(&self) -> &str { "postgres://localhost" }
//! }
//!
//! impl Component for Postgres {
//!     type Dependencies = ();
//!     fn construct(_: ()) -> Self { Postgres }
//! }
//!
//! implements!(Postgres => dyn Database);
//!
//! struct UserRepository {
//!     db: Arc<dyn Database>,
//! }
//!
//! impl Component for UserRepository {
//!     type Dependencies = (Arc<dyn Database>,);
//!     fn construct((db,): Self::Dependencies) -> Self {
//!         UserRepository { db }
//!     }
//! }
//!
//! let container = Container::new();
//! container.register_type::<dyn Database, Postgres>().unwrap();
//! container.register_type::<UserRepository, UserRepository>().unwrap();
//!
//! let repo = container.get::<UserRepository>().unwrap();
//! assert_eq!(repo.db.url(), "postgres://localhost");
//! ```

use crate::{Container, Injectable, Lifetime, Result};
use std::sync::Arc;

/// Largest number of constructor dependencies a component may declare
pub const MAX_DEPENDENCIES: usize = 20;

// =============================================================================
// Resolvable
// =============================================================================

/// A value that can be produced by resolving from a container.
pub trait Resolvable: Sized {
    /// Resolve this value from the container.
    fn resolve(container: &Container) -> Result<Self>;
}

impl Resolvable for () {
    #[inline]
    fn resolve(_container: &Container) -> Result<Self> {
        Ok(())
    }
}

// Required dependency
impl<I: ?Sized + Injectable> Resolvable for Arc<I> {
    #[inline]
    fn resolve(container: &Container) -> Result<Self> {
        container.get::<I>()
    }
}

// Optional dependency
impl<I: ?Sized + Injectable> Resolvable for Option<Arc<I>> {
    #[inline]
    fn resolve(container: &Container) -> Result<Self> {
        container.resolve::<I>()
    }
}

// Every implementation of an interface
impl<I: ?Sized + Injectable> Resolvable for Vec<Arc<I>> {
    #[inline]
    fn resolve(container: &Container) -> Result<Self> {
        container.resolve_all::<I>()
    }
}

// The container itself, for components that resolve lazily.
// A singleton holding its own container keeps it alive until `destroy_all`.
impl Resolvable for Container {
    #[inline]
    fn resolve(container: &Container) -> Result<Self> {
        Ok(container.clone())
    }
}

macro_rules! impl_resolvable_tuple {
    ($($T:ident),+) => {
        impl<$($T: Resolvable),+> Resolvable for ($($T,)+) {
            #[inline]
            fn resolve(container: &Container) -> Result<Self> {
                Ok(($(<$T as Resolvable>::resolve(container)?,)+))
            }
        }
    };
}

impl_resolvable_tuple!(A);
impl_resolvable_tuple!(A, B);
impl_resolvable_tuple!(A, B, C);
impl_resolvable_tuple!(A, B, C, D);
impl_resolvable_tuple!(A, B, C, D, E);
impl_resolvable_tuple!(A, B, C, D, E, F);
impl_resolvable_tuple!(A, B, C, D, E, F, G);
impl_resolvable_tuple!(A, B, C, D, E, F, G, H);
impl_resolvable_tuple!(A, B, C, D, E, F, G, H, I);
impl_resolvable_tuple!(A, B, C, D, E, F, G, H, I, J);
impl_resolvable_tuple!(A, B, C, D, E, F, G, H, I, J, K);
impl_resolvable_tuple!(A, B, C, D, E, F, G, H, I, J, K, L);
impl_resolvable_tuple!(A, B, C, D, E, F, G, H, I, J, K, L, M);
impl_resolvable_tuple!(A, B, C, D, E, F, G, H, I, J, K, L, M, N);
impl_resolvable_tuple!(A, B, C, D, E, F, G, H, I, J, K, L, M, N, O);
impl_resolvable_tuple!(A, B, C, D, E, F, G, H, I, J, K, L, M, N, O, P);
impl_resolvable_tuple!(A, B, C, D, E, F, G, H, I, J, K, L, M, N, O, P, Q);
impl_resolvable_tuple!(A, B, C, D, E, F, G, H, I, J, K, L, M, N, O, P, Q, R);
impl_resolvable_tuple!(A, B, C, D, E, F, G, H, I, J, K, L, M, N, O, P, Q, R, S);
impl_resolvable_tuple!(A, B, C, D, E, F, G, H, I, J, K, L, M, N, O, P, Q, R, S, T);

// =============================================================================
// Component
// =============================================================================

/// A concrete type the container can construct on its own.
///
/// Register it with [`Container::register_type`] or
/// [`Container::register`]`(..).done()`.
pub trait Component: Injectable + Sized {
    /// Constructor dependencies, resolved positionally.
    ///
    /// Use `()` for none and a tuple (including the 1-tuple `(Arc<X>,)`)
    /// otherwise.
    type Dependencies: Resolvable + DependencyInfo;

    /// Lifetime this type asks for, unless the registration overrides it
    const LIFETIME: Lifetime = Lifetime::Default;

    /// Build the component from its resolved dependencies.
    fn construct(dependencies: Self::Dependencies) -> Self;

    /// Type names of the dependencies, in constructor order.
    fn dependencies() -> Vec<&'static str> {
        <Self::Dependencies as DependencyInfo>::dependency_names()
    }
}

impl Container {
    /// Construct a `T` with dependencies from this container, without
    /// registering it.
    ///
    /// `T` itself is not put on the resolution stack; its dependencies are.
    pub fn create<T: Component>(&self) -> Result<T> {
        let dependencies = <T::Dependencies as Resolvable>::resolve(self)?;
        Ok(T::construct(dependencies))
    }

    /// Like [`create`](Self::create), returning a shared pointer that is
    /// tracked in the debug store.
    pub fn create_arc<T: Component>(&self) -> Result<Arc<T>> {
        let instance = Arc::new(self.create::<T>()?);
        self.track(&instance);
        Ok(instance)
    }

    /// Register everything a [`Module`] provides.
    pub fn install<M: Module>(&self) -> Result<()> {
        M::register(self)
    }
}

// =============================================================================
// Module
// =============================================================================

/// A group of related registrations.
///
/// # Example
///
/// ```rust
/// use interface_injector::{Component, Container, Module, Result};
///
/// struct Metrics;
///
/// impl Component for Metrics {
///     type Dependencies = ();
///     fn construct(_: ()) -> Self { Metrics }
/// }
///
/// struct TelemetryModule;
///
/// impl Module for TelemetryModule {
///     fn register(container: &Container) -> Result<()> {
///         container.register_type::<Metrics, Metrics>()
///     }
/// }
///
/// let container = Container::new();
/// container.install::<TelemetryModule>().unwrap();
/// assert!(container.contains::<Metrics>());
/// ```
pub trait Module {
    /// Register all implementations of this module.
    fn register(container: &Container) -> Result<()>;
}

// =============================================================================
// Dependency Graph Helpers
// =============================================================================

/// Type names of a dependency descriptor, for diagnostics.
pub trait DependencyInfo {
    /// Type names of every dependency, in constructor order.
    fn dependency_names() -> Vec<&'static str>;
}

impl DependencyInfo for () {
    fn dependency_names() -> Vec<&'static str> {
        vec![]
    }
}

impl<I: ?Sized + Injectable> DependencyInfo for Arc<I> {
    fn dependency_names() -> Vec<&'static str> {
        vec![std::any::type_name::<I>()]
    }
}

impl<I: ?Sized + Injectable> DependencyInfo for Option<Arc<I>> {
    fn dependency_names() -> Vec<&'static str> {
        vec![std::any::type_name::<I>()]
    }
}

impl<I: ?Sized + Injectable> DependencyInfo for Vec<Arc<I>> {
    fn dependency_names() -> Vec<&'static str> {
        vec![std::any::type_name::<I>()]
    }
}

impl DependencyInfo for Container {
    fn dependency_names() -> Vec<&'static str> {
        vec![std::any::type_name::<Container>()]
    }
}

macro_rules! impl_dependency_info_tuple {
    ($($T:ident),+) => {
        impl<$($T: DependencyInfo),+> DependencyInfo for ($($T,)+) {
            fn dependency_names() -> Vec<&'static str> {
                let mut names = Vec::new();
                $(names.extend(<$T as DependencyInfo>::dependency_names());)+
                names
            }
        }
    };
}

impl_dependency_info_tuple!(A);
impl_dependency_info_tuple!(A, B);
impl_dependency_info_tuple!(A, B, C);
impl_dependency_info_tuple!(A, B, C, D);
impl_dependency_info_tuple!(A, B, C, D, E);
impl_dependency_info_tuple!(A, B, C, D, E, F);
impl_dependency_info_tuple!(A, B, C, D, E, F, G);
impl_dependency_info_tuple!(A, B, C, D, E, F, G, H);
impl_dependency_info_tuple!(A, B, C, D, E, F, G, H, I);
impl_dependency_info_tuple!(A, B, C, D, E, F, G, H, I, J);
impl_dependency_info_tuple!(A, B, C, D, E, F, G, H, I, J, K);
impl_dependency_info_tuple!(A, B, C, D, E, F, G, H, I, J, K, L);
impl_dependency_info_tuple!(A, B, C, D, E, F, G, H, I, J, K, L, M);
impl_dependency_info_tuple!(A, B, C, D, E, F, G, H, I, J, K, L, M, N);
impl_dependency_info_tuple!(A, B, C, D, E, F, G, H, I, J, K, L, M, N, O);
impl_dependency_info_tuple!(A, B, C, D, E, F, G, H, I, J, K, L, M, N, O, P);
impl_dependency_info_tuple!(A, B, C, D, E, F, G, H, I, J, K, L, M, N, O, P, Q);
impl_dependency_info_tuple!(A, B, C, D, E, F, G, H, I, J, K, L, M, N, O, P, Q, R);
impl_dependency_info_tuple!(A, B, C, D, E, F, G, H, I, J, K, L, M, N, O, P, Q, R, S);
impl_dependency_info_tuple!(A, B, C, D, E, F, G, H, I, J, K, L, M, N, O, P, Q, R, S, T);

// =============================================================================
// Tests
// =============================================================================
