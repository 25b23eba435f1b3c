//! Factory registry and candidate index.

use std::sync::Arc;

use ahash::AHashMap;
use tracing::{debug, info, warn};

use crate::error::{DiError, DiResult};
use crate::factory::Factory;
use crate::graph::Graph;
use crate::key::Key;
use crate::signature::{MatchKind, ParamKind, Parameter};

/// Factories able to satisfy one parameter, in registration order.
#[derive(Debug, Default, Clone)]
pub struct Candidates {
    /// Factories whose key is exactly the requested identity
    pub exact: Vec<Arc<Factory>>,
    /// Factories assignable to the requested identity
    pub structural: Vec<Arc<Factory>>,
}

impl Candidates {
    fn compute(param: &Parameter, factories: &[Arc<Factory>]) -> Self {
        let mut candidates = Candidates::default();
        for factory in factories {
            candidates.offer(param, factory);
        }
        candidates
    }

    fn offer(&mut self, param: &Parameter, factory: &Arc<Factory>) {
        match param.candidate_match(factory) {
            Some(MatchKind::Exact) => self.exact.push(factory.clone()),
            Some(MatchKind::Structural) => self.structural.push(factory.clone()),
            None => {}
        }
    }

    /// The set used for selection: exact matches when there are any,
    /// structural ones otherwise.
    pub fn preferred(&self) -> &[Arc<Factory>] {
        if self.exact.is_empty() {
            &self.structural
        } else {
            &self.exact
        }
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.structural.is_empty()
    }
}

/// Registration state of one container.
///
/// Mutated only while the container is unlocked. A rejected registration
/// leaves every structure exactly as it was.
#[derive(Default)]
pub(crate) struct Registry {
    graph: Graph<Arc<Factory>>,
    params: AHashMap<Key, Arc<Parameter>>,
    candidates: AHashMap<Key, Candidates>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Adds `factory` to the graph, rejecting it when it closes a cycle.
    pub(crate) fn register(&mut self, mut factory: Factory) -> DiResult<Arc<Factory>> {
        let order = self.graph.len();
        factory.set_order(order);

        // share descriptors already known to this registry
        let mut fresh: Vec<Arc<Parameter>> = Vec::new();
        for param in factory.parameters_mut().iter_mut() {
            match self.params.get(&param.key()) {
                Some(known) => *param = known.clone(),
                None => {
                    if !fresh.iter().any(|p| p.key() == param.key()) {
                        fresh.push(param.clone());
                    }
                }
            }
        }

        let factory = Arc::new(factory);
        self.graph.add(factory.clone());

        if let Some(cycle) = self.graph.find_cycle_from(order, |_, node| self.edges_from(node, &factory)) {
            let names = cycle
                .iter()
                .filter_map(|&n| self.graph.node(n).map(|f| f.name()))
                .collect::<Vec<_>>();
            self.graph.truncate(order);
            warn!(component = factory.name(), cycle = ?names, "registration rejected: dependency cycle");
            return Err(DiError::CycleDetected {
                component: factory.name(),
                path: cycle,
                names,
            });
        }

        // index the new factory against descriptors known before it
        for (key, param) in &self.params {
            let entry = self.candidates.entry(*key).or_default();
            match param.candidate_match(&factory) {
                Some(MatchKind::Exact) => entry.exact.push(factory.clone()),
                Some(MatchKind::Structural) => {
                    info!(component = factory.name(), assignable_to = %key, "registered structural candidate");
                    entry.structural.push(factory.clone());
                }
                None => {}
            }
        }

        for param in fresh {
            self.track(param);
        }
        // every identity the factory can be resolved as gets a descriptor
        if factory.returns_value() {
            for key in std::iter::once(factory.key()).chain(factory.implemented()) {
                if !self.params.contains_key(&key) {
                    self.track(Arc::new(Parameter::direct(key)));
                }
            }
        }
        // wrapped identities are resolvable on their own
        let wrapped: Vec<Key> = factory
            .parameters()
            .iter()
            .filter(|p| p.key() != p.value())
            .map(|p| p.value())
            .collect();
        for key in wrapped {
            if !self.params.contains_key(&key) {
                self.track(Arc::new(Parameter::direct(key)));
            }
        }

        debug!(component = factory.name(), order, scope = factory.scope(), "registered factory");
        Ok(factory)
    }

    /// Records a descriptor and indexes every existing factory against it.
    fn track(&mut self, param: Arc<Parameter>) {
        let candidates = Candidates::compute(&param, self.graph.nodes());
        self.candidates.insert(param.key(), candidates);
        self.params.insert(param.key(), param);
    }

    /// Orders of the factories `node` is built from, taken from the same
    /// set selection uses. `added` is the factory being registered, not yet
    /// present in the candidate index.
    fn edges_from(&self, node: &Factory, added: &Arc<Factory>) -> Vec<usize> {
        let mut edges = Vec::new();
        for param in node.parameters() {
            if !matches!(param.kind(), ParamKind::Direct | ParamKind::Qualified(_)) {
                continue;
            }
            match self.candidates.get(&param.key()) {
                Some(known) => {
                    let pending = param.candidate_match(added);
                    let kind = if known.exact.is_empty() && pending != Some(MatchKind::Exact) {
                        edges.extend(known.structural.iter().map(|f| f.order()));
                        MatchKind::Structural
                    } else {
                        edges.extend(known.exact.iter().map(|f| f.order()));
                        MatchKind::Exact
                    };
                    if pending == Some(kind) {
                        edges.push(added.order());
                    }
                }
                // descriptors first seen on `added` itself
                None => {
                    let candidates = Candidates::compute(param, self.graph.nodes());
                    edges.extend(candidates.preferred().iter().map(|f| f.order()));
                }
            }
        }
        edges
    }

    /// The memoized descriptor for `key`, if any factory made it known.
    pub(crate) fn param(&self, key: Key) -> Option<Arc<Parameter>> {
        self.params.get(&key).cloned()
    }

    /// Candidates for `param`, computed on the fly when the key is unknown
    /// to this registry (for example a wrapper first seen by a child).
    pub(crate) fn with_candidates<R>(&self, param: &Parameter, f: impl FnOnce(&Candidates) -> R) -> R {
        match self.candidates.get(&param.key()) {
            Some(candidates) if self.params.get(&param.key()).map_or(false, |p| **p == *param) => f(candidates),
            _ => f(&Candidates::compute(param, self.graph.nodes())),
        }
    }

    pub(crate) fn has_candidates(&self, param: &Parameter) -> bool {
        self.with_candidates(param, |c| !c.is_empty())
    }

    /// All factories in registration order.
    pub(crate) fn factories(&self) -> &[Arc<Factory>] {
        self.graph.nodes()
    }

    pub(crate) fn len(&self) -> usize {
        self.graph.len()
    }
}
