//! Factory queries.

use std::cmp::Ordering;
use std::ops::ControlFlow;
use std::sync::Arc;

use crate::error::DiResult;
use crate::factory::{Condition, Factory};
use crate::key::Key;
use crate::Container;

/// Criteria for [`Container::filter`]. Every set criterion must match.
///
/// # Examples
///
/// ```
/// use ferrous_wire::{Container, FactoryFilter};
/// use std::sync::Arc;
///
/// struct Metrics;
///
/// let container = Container::new();
/// container.factory(|| Arc::new(Metrics)).startup(10).register().unwrap();
/// container.factory(|| Arc::new(1u8)).register().unwrap();
///
/// let startup = container.filter(FactoryFilter::new().startup());
/// assert_eq!(startup.len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct FactoryFilter {
    primary: bool,
    startup: bool,
    scope: Option<String>,
    qualifiers: Vec<Key>,
    assignable_to: Option<Key>,
    conditions: Vec<Condition>,
}

impl FactoryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    pub fn startup(mut self) -> Self {
        self.startup = true;
        self
    }

    pub fn scope(mut self, name: impl Into<String>) -> Self {
        self.scope = Some(name.into());
        self
    }

    /// Matches factories carrying at least one of the requested qualifiers.
    pub fn qualifier<Q: ?Sized + 'static>(mut self) -> Self {
        self.qualifiers.push(Key::of::<Q>());
        self
    }

    /// Matches factories providing `T` exactly or through a declared cast.
    pub fn assignable_to<T: ?Sized + 'static>(self) -> Self {
        self.assignable_to_key(Key::of::<T>())
    }

    pub(crate) fn assignable_to_key(mut self, key: Key) -> Self {
        self.assignable_to = Some(key);
        self
    }

    pub fn condition(mut self, condition: impl Fn(&Container, &Factory) -> bool + Send + Sync + 'static) -> Self {
        self.conditions.push(Arc::new(condition));
        self
    }

    pub(crate) fn matches(&self, container: &Container, factory: &Factory) -> bool {
        if !self.conditions.iter().all(|condition| condition(container, factory)) {
            return false;
        }
        if self.primary && !factory.is_primary() {
            return false;
        }
        if self.startup && !factory.is_startup() {
            return false;
        }
        if let Some(scope) = &self.scope {
            if scope != factory.scope() {
                return false;
            }
        }
        if !self.qualifiers.is_empty() && !self.qualifiers.iter().any(|q| factory.has_qualifier(*q)) {
            return false;
        }
        if let Some(key) = self.assignable_to {
            if factory.key() != key && !factory.is_assignable_to(key) {
                return false;
            }
        }
        true
    }
}

/// Result of [`Container::filter`], in registration order until sorted.
pub struct FilteredFactories {
    factories: Vec<Arc<Factory>>,
}

impl FilteredFactories {
    pub(crate) fn new(factories: Vec<Arc<Factory>>) -> Self {
        Self { factories }
    }

    /// Sorts by ascending priority, ties kept in registration order.
    pub fn sort(self) -> Self {
        self.sort_by(default_order)
    }

    /// Stable sort with a custom comparator.
    pub fn sort_by(mut self, compare: impl FnMut(&Arc<Factory>, &Arc<Factory>) -> Ordering) -> Self {
        self.factories.sort_by(compare);
        self
    }

    /// Visits factories in order until the visitor breaks or fails.
    pub fn for_each<F>(&self, mut visitor: F) -> DiResult<()>
    where
        F: FnMut(&Arc<Factory>) -> DiResult<ControlFlow<()>>,
    {
        for factory in &self.factories {
            if visitor(factory)?.is_break() {
                break;
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arc<Factory>> {
        self.factories.iter()
    }
}

impl IntoIterator for FilteredFactories {
    type Item = Arc<Factory>;
    type IntoIter = std::vec::IntoIter<Arc<Factory>>;

    fn into_iter(self) -> Self::IntoIter {
        self.factories.into_iter()
    }
}

impl<'a> IntoIterator for &'a FilteredFactories {
    type Item = &'a Arc<Factory>;
    type IntoIter = std::slice::Iter<'a, Arc<Factory>>;

    fn into_iter(self) -> Self::IntoIter {
        self.factories.iter()
    }
}

/// Priority first, then registration order.
pub fn default_order(a: &Arc<Factory>, b: &Arc<Factory>) -> Ordering {
    a.priority().cmp(&b.priority()).then(a.order().cmp(&b.order()))
}
