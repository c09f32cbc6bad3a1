//! Public macros for ergonomic service resolution.

/// Resolves a service from a container, panicking if it cannot be resolved.
///
/// Meant for places where a missing binding is a programming error (tests,
/// `main`). Inside creators prefer `container.instance::<T>(..)?`, which lets
/// dependency loops surface as errors.
///
/// # Panics
///
/// Panics if the service is not bound or fails to resolve. For a
/// non-panicking version, use [`maybe_resolve!`] or the container directly.
///
/// # Examples
///
/// ```
/// use fibre_di::{resolve, type_token, Container};
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync { fn greet(&self) -> String; }
/// struct EnglishGreeter;
/// impl Greeter for EnglishGreeter { fn greet(&self) -> String { "Hello!".to_string() } }
/// type_token!(dyn Greeter);
///
/// let container = Container::new(|b| {
///   b.constant("message").with(String::from("hello"))?;
///   b.bind::<dyn Greeter>().instance_arc(Arc::new(EnglishGreeter))
/// }).unwrap();
///
/// assert_eq!(*resolve!(&container, String, "message"), "hello");
/// assert_eq!(resolve!(&container, trait Greeter).greet(), "Hello!");
/// ```
#[macro_export]
macro_rules! resolve {
    // Arm for resolving a trait object: resolve!(container, trait MyTrait)
    ($container:expr, trait $trait_ident:ident) => {
        $container
            .instance::<dyn $trait_ident>(None)
            .unwrap_or_else(|err| {
                panic!(
                    "Failed to resolve required trait service {}: {}",
                    std::any::type_name::<dyn $trait_ident>(),
                    err
                )
            })
    };

    // Arm for resolving a named trait object: resolve!(container, trait MyTrait, "name")
    ($container:expr, trait $trait_ident:ident, $name:expr) => {
        $container
            .instance::<dyn $trait_ident>(Some($name))
            .unwrap_or_else(|err| {
                panic!(
                    "Failed to resolve required trait service with name '{}' {}: {}",
                    $name,
                    std::any::type_name::<dyn $trait_ident>(),
                    err
                )
            })
    };

    // Arm for resolving a concrete type: resolve!(container, MyService)
    ($container:expr, $type:ty) => {
        $container
            .instance::<$type>(None)
            .unwrap_or_else(|err| {
                panic!(
                    "Failed to resolve required service {}: {}",
                    std::any::type_name::<$type>(),
                    err
                )
            })
    };

    // Arm for resolving a named concrete type: resolve!(container, MyService, "name")
    ($container:expr, $type:ty, $name:expr) => {
        $container
            .instance::<$type>(Some($name))
            .unwrap_or_else(|err| {
                panic!(
                    "Failed to resolve required service with name '{}' {}: {}",
                    $name,
                    std::any::type_name::<$type>(),
                    err
                )
            })
    };
}

/// Resolves a service from a container, returning `None` if it is not bound.
///
/// Any other failure (a dependency loop, a missing transitive dependency)
/// still panics, as with [`resolve!`].
#[macro_export]
macro_rules! maybe_resolve {
    (@unwrap $result:expr) => {
        $result.unwrap_or_else(|err| panic!("Failed to resolve optional service: {}", err))
    };

    ($container:expr, trait $trait_ident:ident) => {
        $crate::maybe_resolve!(@unwrap $container.instance_or_none::<dyn $trait_ident>(None))
    };

    ($container:expr, trait $trait_ident:ident, $name:expr) => {
        $crate::maybe_resolve!(@unwrap $container.instance_or_none::<dyn $trait_ident>(Some($name)))
    };

    ($container:expr, $type:ty) => {
        $crate::maybe_resolve!(@unwrap $container.instance_or_none::<$type>(None))
    };

    ($container:expr, $type:ty, $name:expr) => {
        $crate::maybe_resolve!(@unwrap $container.instance_or_none::<$type>(Some($name)))
    };
}
