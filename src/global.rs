//! Process-wide default container.

use once_cell::sync::Lazy;

use crate::Container;

static GLOBAL: Lazy<Container> = Lazy::new(Container::new);

/// The shared container for applications that wire everything in one place.
///
/// It behaves like any other [`Container`]: register, then
/// [`initialize`](Container::initialize) once.
pub fn global() -> &'static Container {
    &GLOBAL
}
