//! # Interface Injector - Interface-Based Dependency Injection for Rust
//!
//! A container that maps interfaces (usually trait objects) to the concrete
//! types implementing them, constructs those types with their dependencies
//! resolved recursively, and caches instances according to a lifetime policy.
//!
//! ## Features
//!
//! - 🔌 **Interfaces first** - Resolve `dyn Trait`, register any number of implementations
//! - 🧩 **Auto-wiring** - Constructor dependencies declared once per type, resolved positionally
//! - ♻️ **Lifetimes** - Transient, instance singleton, weak singleton and per-thread singleton
//! - 🔁 **Cycle detection** - Circular dependencies fail with the full resolution chain
//! - 🪝 **On-create hooks** - Deferred until the outermost resolution completes
//! - 🔄 **Scoped containers** - Child scopes fall back to their parent chain
//! - 📊 **Observable** - Optional tracing integration with JSON or pretty output
//!
//! ## Quick Start
//!
//! ```rust
//! use interface_injector::{implements, Component, Container, Lifetime};
//! use std::sync::Arc;
//!
//! trait Logger: Send + Sync {
//!     fn log(&self, message: &str) -> String;
//! }
//!
//! trait Mailer: Send + Sync {
//!     fn send(&self, to: &str) -> String;
//! }
//!
//! struct ConsoleLogger;
//!
//! impl Logger for ConsoleLogger {
//!     fn log(&self, message: &str) -> String { format!("[console] {message}") }
//! }
//!
//! impl Component for ConsoleLogger {
//!     type Dependencies = ();
//!     const LIFETIME: Lifetime = Lifetime::InstanceSingleton;
//!     fn construct(_: ()) -> Self { ConsoleLogger }
//! }
//!
//! struct SmtpMailer {
//!     logger: Arc<dyn Logger>,
//! }
//!
//! impl Mailer for SmtpMailer {
//!     fn send(&self, to: &str) -> String { self.logger.log(&format!("mail to {to}")) }
//! }
//!
//! impl Component for SmtpMailer {
//!     type Dependencies = (Arc<dyn Logger>,);
//!     fn construct((logger,): Self::Dependencies) -> Self { SmtpMailer { logger } }
//! }
//!
//! implements!(ConsoleLogger => dyn Logger);
//! implements!(SmtpMailer => dyn Mailer);
//!
//! let container = Container::new();
//! container.register_type::<dyn Logger, ConsoleLogger>().unwrap();
//! container.register_type::<dyn Mailer, SmtpMailer>().unwrap();
//!
//! let mailer = container.get::<dyn Mailer>().unwrap();
//! assert_eq!(mailer.send("ops"), "[console] mail to ops");
//! ```
//!
//! ## Lifetimes
//!
//! The lifetime a resolution uses is the first non-`Default` of:
//!
//! 1. the registration's [`lifetime`](Registration::lifetime) override, or the
//!    implementation's [`Component::LIFETIME`]
//! 2. the interface's declared lifetime ([`Container::declare_interface`])
//! 3. the container's [`default_lifetime`](Container::default_lifetime)
//!    (`Transient` unless configured)
//!
//! An implementation registered with an explicit
//! [`instance`](Registration::instance) always returns that instance.
//!
//! ## Selecting Among Implementations
//!
//! ```rust
//! use interface_injector::{implements, Arc, Component, Container};
//!
//! trait Codec: Send + Sync {
//!     fn name(&self) -> &'static str;
//! }
//!
//! struct Json;
//! struct Cbor;
//!
//! impl Codec for Json { fn name(&self) -> &'static str { "json" } }
//! impl Codec for Cbor { fn name(&self) -> &'static str { "cbor" } }
//!
//! impl Component for Json {
//!     type Dependencies = ();
//!     fn construct(_: ()) -> Self { Json }
//! }
//!
//! implements!(Json => dyn Codec);
//! implements!(Cbor => dyn Codec);
//!
//! let container = Container::new();
//! container.register::<dyn Codec, Json>().as_default().done().unwrap();
//! container.register::<dyn Codec, Cbor>().named("cbor").factory(|_| Ok(Arc::new(Cbor))).done().unwrap();
//!
//! // The pinned default wins over later registrations
//! assert_eq!(container.get::<dyn Codec>().unwrap().name(), "json");
//! assert_eq!(container.resolve_by_name::<dyn Codec>("cbor").unwrap().unwrap().name(), "cbor");
//! assert_eq!(container.resolve_all::<dyn Codec>().unwrap().len(), 2);
//! ```

// Lets derive output name this crate from inside it
extern crate self as interface_injector;

mod component;
mod container;
mod error;
mod factory;
#[cfg(feature = "logging")]
pub mod logging;
mod provider;
mod resolution;
mod storage;

pub use component::{Component, DependencyInfo, MAX_DEPENDENCIES, Module, Resolvable};
pub use container::{Auto, Container, ContainerOptions, FromFactory, FromInstance, Registration};
pub use error::*;
pub use factory::{ImplementationInfo, OnCreate};
pub use provider::*;
pub use storage::{InterfaceInfo, TrackedInstance};

// Re-export derive macros when feature is enabled
#[cfg(feature = "derive")]
pub use interface_injector_derive::Component;

// Re-export tracing macros for convenience when logging feature is enabled
#[cfg(feature = "logging")]
pub use tracing::{debug, error, info, trace, warn};

// Re-export for convenience
pub use std::sync::Arc;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        Component, Container, ContainerOptions, DiError, Implements, Injectable, Lifetime, Module,
        Resolvable, Result, implements,
    };
    pub use std::sync::Arc;
}
