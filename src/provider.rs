//! Provider traits for dependency injection
//!
//! These traits define what can be registered, how implementations map onto
//! the interfaces they satisfy, and how long resolved instances live.

use crate::DiError;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Marker trait for types that can live in the DI container.
///
/// This is automatically implemented for every `Send + Sync + 'static` type,
/// including unsized trait objects such as `dyn Logger` that act as interfaces.
///
/// # Examples
///
/// ```rust
/// use interface_injector::Injectable;
///
/// trait Logger: Send + Sync {}
///
/// fn assert_injectable<T: Injectable + ?Sized>() {}
///
/// assert_injectable::<String>();
/// assert_injectable::<dyn Logger>();
/// ```
pub trait Injectable: Send + Sync + 'static {}

impl<T: ?Sized + Send + Sync + 'static> Injectable for T {}

/// Declares that a concrete type can stand in for the interface `I`.
///
/// Every injectable type implements itself. Trait-object interfaces are wired
/// with the [`implements!`](crate::implements) macro. Registering a type
/// against an interface it does not implement fails to compile.
pub trait Implements<I: ?Sized>: Injectable {
    /// Convert a shared implementation into a shared interface pointer.
    fn upcast(self: Arc<Self>) -> Arc<I>;
}

impl<T: Injectable> Implements<T> for T {
    #[inline]
    fn upcast(self: Arc<Self>) -> Arc<T> {
        self
    }
}

/// Implement [`Implements`] for one concrete type and one or more interfaces.
///
/// # Examples
///
/// ```rust
/// use interface_injector::{implements, Implements};
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
/// trait Named: Send + Sync {}
///
/// struct English;
/// impl Greeter for English {
///     fn greet(&self) -> String { "hello".into() }
/// }
/// impl Named for English {}
///
/// implements!(English => dyn Greeter, dyn Named);
///
/// let greeter = Implements::<dyn Greeter>::upcast(Arc::new(English));
/// assert_eq!(greeter.greet(), "hello");
/// ```
#[macro_export]
macro_rules! implements {
    ($implementation:ty => $($interface:ty),+ $(,)?) => {
        $(
            impl $crate::Implements<$interface> for $implementation {
                #[inline]
                fn upcast(
                    self: ::std::sync::Arc<Self>,
                ) -> ::std::sync::Arc<$interface> {
                    self
                }
            }
        )+
    };
}

/// Caching policy for resolved instances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifetime {
    /// Inherit from the enclosing scope: the implementation override, then
    /// the interface declaration, then the container default
    #[default]
    Default,

    /// New instance created on every resolve
    Transient,

    /// Created on first resolve and kept by the container
    InstanceSingleton,

    /// Shared while someone outside the container still holds it;
    /// recreated once every owner has dropped it
    WeakSingleton,

    /// One instance per resolving thread
    ThreadSingleton,
}

impl Lifetime {
    /// All lifetimes, in declaration order
    pub const ALL: [Lifetime; 5] = [
        Lifetime::Default,
        Lifetime::Transient,
        Lifetime::InstanceSingleton,
        Lifetime::WeakSingleton,
        Lifetime::ThreadSingleton,
    ];

    /// Return `self` unless it is `Default`, in which case `fallback`.
    #[inline]
    pub const fn or(self, fallback: Lifetime) -> Lifetime {
        match self {
            Lifetime::Default => fallback,
            other => other,
        }
    }

    /// Whether resolved instances may be cached by the container
    #[inline]
    pub const fn is_cached(self) -> bool {
        !matches!(self, Lifetime::Default | Lifetime::Transient)
    }

    /// Configuration name of this lifetime
    pub const fn as_str(self) -> &'static str {
        match self {
            Lifetime::Default => "default",
            Lifetime::Transient => "transient",
            Lifetime::InstanceSingleton => "instance-singleton",
            Lifetime::WeakSingleton => "weak-singleton",
            Lifetime::ThreadSingleton => "thread-singleton",
        }
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lifetime {
    type Err = DiError;

    /// Parse a configuration name. Underscores and case are ignored, so
    /// `instance_singleton` and `InstanceSingleton` are accepted too.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match normalized.as_str() {
            "default" => Ok(Lifetime::Default),
            "transient" => Ok(Lifetime::Transient),
            "instancesingleton" | "singleton" => Ok(Lifetime::InstanceSingleton),
            "weaksingleton" => Ok(Lifetime::WeakSingleton),
            "threadsingleton" => Ok(Lifetime::ThreadSingleton),
            _ => Err(DiError::InvalidLifetime(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Shape: Send + Sync {
        fn sides(&self) -> u32;
    }

    struct Square;

    impl Shape for Square {
        fn sides(&self) -> u32 {
            4
        }
    }

    crate::implements!(Square => dyn Shape);

    #[test]
    fn test_upcast_to_trait_object() {
        let shape = Implements::<dyn Shape>::upcast(Arc::new(Square));
        assert_eq!(shape.sides(), 4);
    }

    #[test]
    fn test_identity_upcast_keeps_pointer() {
        let original = Arc::new(String::from("same"));
        let upcast = Implements::<String>::upcast(Arc::clone(&original));
        assert!(Arc::ptr_eq(&original, &upcast));
    }

    #[test]
    fn test_lifetime_or() {
        assert_eq!(Lifetime::Default.or(Lifetime::Transient), Lifetime::Transient);
        assert_eq!(
            Lifetime::WeakSingleton.or(Lifetime::Transient),
            Lifetime::WeakSingleton
        );
    }

    #[test]
    fn test_lifetime_display_round_trips() {
        for lifetime in Lifetime::ALL {
            assert_eq!(lifetime.to_string().parse::<Lifetime>().unwrap(), lifetime);
        }
    }

    #[test]
    fn test_lifetime_parse_variants() {
        assert_eq!(
            "InstanceSingleton".parse::<Lifetime>().unwrap(),
            Lifetime::InstanceSingleton
        );
        assert_eq!(
            " thread_singleton ".parse::<Lifetime>().unwrap(),
            Lifetime::ThreadSingleton
        );
        assert!(matches!(
            "scoped".parse::<Lifetime>(),
            Err(DiError::InvalidLifetime(name)) if name == "scoped"
        ));
    }

    #[test]
    fn test_is_cached() {
        assert!(!Lifetime::Transient.is_cached());
        assert!(!Lifetime::Default.is_cached());
        assert!(Lifetime::WeakSingleton.is_cached());
    }
}
