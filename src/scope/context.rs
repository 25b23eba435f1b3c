use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;
use smallvec::SmallVec;
use tracing::debug;

use crate::creation::Instance;
use crate::error::{DiError, DiResult};
use crate::factory::Factory;
use crate::scope::{CreateFn, Scope, SingletonScope};
use crate::Context;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Sessions entered along a context chain, as (scope id, session id).
#[derive(Clone, Default)]
struct ActiveSessions(SmallVec<[(u64, u64); 2]>);

/// A named scope caching one instance per session.
///
/// A session starts with [`ContextScope::enter`], which derives a context
/// carrying the session; every resolution made with that context (or a
/// context derived from it) shares the session's instances. Ending the
/// session disposes them, newest first.
///
/// # Examples
///
/// ```rust
/// use ferrous_wire::{Container, Context, ContextScope, Resolver};
/// use std::sync::Arc;
///
/// struct RequestId(u64);
///
/// let container = Container::new();
/// let requests = ContextScope::new("request");
/// container.register_scope("request", Arc::new(requests.clone())).unwrap();
/// container.factory(|| Arc::new(RequestId(7))).scoped("request").register().unwrap();
///
/// let (ctx, session) = requests.enter(&Context::background());
/// let a = container.get::<RequestId>(&ctx).unwrap();
/// let b = container.get::<RequestId>(&ctx).unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
/// session.end();
///
/// assert!(container.get::<RequestId>(&Context::background()).is_err());
/// ```
#[derive(Clone)]
pub struct ContextScope {
    inner: Arc<ContextScopeInner>,
}

struct ContextScopeInner {
    id: u64,
    name: String,
    sessions: RwLock<AHashMap<u64, Arc<SingletonScope>>>,
}

impl ContextScope {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ContextScopeInner {
                id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
                name: name.into(),
                sessions: RwLock::new(AHashMap::new()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Starts a session and returns the context that carries it.
    pub fn enter(&self, ctx: &Context) -> (Context, ScopeSession) {
        let session = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        self.inner.sessions.write().insert(session, Arc::new(SingletonScope::new()));

        let mut active = ctx.value::<ActiveSessions>().map(|a| (*a).clone()).unwrap_or_default();
        active.0.push((self.inner.id, session));
        debug!(scope = %self.inner.name, session, "scope session started");

        let ctx = ctx.with_value(active);
        (ctx, ScopeSession { scope: self.clone(), session, ended: false })
    }

    /// Number of sessions not yet ended.
    pub fn active_sessions(&self) -> usize {
        self.inner.sessions.read().len()
    }

    fn store_for(&self, ctx: &Context) -> DiResult<Arc<SingletonScope>> {
        let not_active = || DiError::ScopeNotActive(self.inner.name.clone());
        let active = ctx.value::<ActiveSessions>().ok_or_else(not_active)?;
        let session = active
            .0
            .iter()
            .rev()
            .find(|(scope, _)| *scope == self.inner.id)
            .map(|(_, session)| *session)
            .ok_or_else(not_active)?;
        self.inner.sessions.read().get(&session).cloned().ok_or_else(not_active)
    }

    fn end_session(&self, session: u64) {
        let store = self.inner.sessions.write().remove(&session);
        if let Some(store) = store {
            debug!(scope = %self.inner.name, session, "scope session ended");
            store.destroy();
        }
    }
}

impl Scope for ContextScope {
    fn get(&self, ctx: &Context, factory: &Factory, create: &mut CreateFn<'_>) -> DiResult<Option<Instance>> {
        self.store_for(ctx)?.get(ctx, factory, create)
    }

    fn remove(&self, factory: &Factory) -> Option<Instance> {
        let stores: Vec<_> = self.inner.sessions.read().values().cloned().collect();
        stores.iter().filter_map(|store| store.remove(factory)).last()
    }

    fn destroy(&self) {
        let sessions: Vec<u64> = self.inner.sessions.read().keys().copied().collect();
        for session in sessions {
            self.end_session(session);
        }
    }
}

impl std::fmt::Debug for ContextScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextScope")
            .field("name", &self.inner.name)
            .field("sessions", &self.active_sessions())
            .finish()
    }
}

/// An active [`ContextScope`] session. Ends on drop.
#[must_use = "the session ends as soon as this guard is dropped"]
pub struct ScopeSession {
    scope: ContextScope,
    session: u64,
    ended: bool,
}

impl ScopeSession {
    /// Ends the session, disposing its instances.
    pub fn end(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if !self.ended {
            self.ended = true;
            self.scope.end_session(self.session);
        }
    }
}

impl Drop for ScopeSession {
    fn drop(&mut self) {
        self.finish();
    }
}
