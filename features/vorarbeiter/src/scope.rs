use std::{
    any::Any,
    collections::HashMap,
    sync::{Arc, Weak},
    thread::{self, ThreadId},
};

use parking_lot::Mutex;
use thiserror::Error;

use crate::{
    container::Container,
    errors::ResolveError,
    factories::ContextResolver,
    types::{Context, Instance, ServiceId},
};

struct ScopeToken;

/// Creates a fresh context, distinct from every other live context
pub fn new_context() -> Context {
    Arc::new(ScopeToken)
}

fn context_key(context: &Context) -> usize {
    Arc::as_ptr(context) as *const () as usize
}

/// Instances of one scoped service, keyed weakly by their context
///
/// The cache never keeps a context alive. Entries of dropped contexts are
/// evicted on the next insert, or by [`Container::purge_scopes`].
#[derive(Default)]
pub(crate) struct ScopedInstances {
    entries: HashMap<usize, ScopedEntry>,
}

struct ScopedEntry {
    context: Weak<dyn Any + Send + Sync>,
    instance: Instance,
}
impl ScopedEntry {
    fn is_live(&self) -> bool {
        self.context.strong_count() > 0
    }
}

impl ScopedInstances {
    /// The weak handle pins the allocation of a dropped context until its entry
    /// is evicted, so a live context never matches a stale entry.
    pub(crate) fn get(&self, context: &Context) -> Option<Instance> {
        self.entries
            .get(&context_key(context))
            .map(|entry| entry.instance.clone())
    }

    /// Stores `instance` for `context`, returns the evicted instances of dropped contexts
    pub(crate) fn insert(&mut self, context: &Context, instance: Instance) -> Vec<Instance> {
        let evicted = self.evict_stale();
        self.entries.insert(
            context_key(context),
            ScopedEntry {
                context: Arc::downgrade(context),
                instance,
            },
        );
        evicted
    }

    /// Removes the instances of all contexts which are gone
    ///
    /// The instances are returned instead of dropped, so the caller can release
    /// them once it no longer holds the container state.
    pub(crate) fn evict_stale(&mut self) -> Vec<Instance> {
        let stale: Vec<usize> = self
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_live())
            .map(|(key, _)| *key)
            .collect();
        let evicted: Vec<Instance> = stale
            .into_iter()
            .filter_map(|key| self.entries.remove(&key))
            .map(|entry| entry.instance)
            .collect();
        if !evicted.is_empty() {
            tracing::debug!("Evicted {} instances of dropped scopes", evicted.len());
        }
        evicted
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// No scope was active when a [`ScopeSlot`] was asked for its context
#[derive(Error, Debug, Clone, Copy)]
#[error("no scope is active on the scope slot")]
pub struct NoActiveScope;

/// Holds the context scoped services are currently resolved in
///
/// Register it as a shared service and point scoped services at it with
/// [`ScopeSlot::resolver`]:
///
/// ```
/// use vorarbeiter::{create_service_container, create_service_spec_builder, new_context, ScopeSlot};
///
/// let mut builder = create_service_spec_builder();
/// builder.set("scope", |_| Ok(ScopeSlot::new()));
/// builder
///     .set("request", |_| Ok(String::from("request state")))
///     .scoped_with(ScopeSlot::resolver("scope"));
///
/// let container = create_service_container(builder.get_service_spec());
/// let slot = container.get::<ScopeSlot>("scope").unwrap();
///
/// let (first, second) = slot.run(new_context(), || {
///     (
///         container.get::<String>("request").unwrap(),
///         container.get::<String>("request").unwrap(),
///     )
/// });
/// assert!(std::sync::Arc::ptr_eq(&first, &second));
/// ```
///
/// Each thread has its own current context. A thread spawned inside
/// [`ScopeSlot::run`] starts without one.
#[derive(Default)]
pub struct ScopeSlot {
    /// Contexts entered by `run`, innermost last
    scopes: Mutex<HashMap<ThreadId, Vec<Context>>>,
}
impl ScopeSlot {
    pub fn new() -> Self {
        ScopeSlot {
            scopes: Mutex::new(HashMap::new()),
        }
    }

    /// Context of the innermost `run` on the calling thread
    pub fn current(&self) -> Option<Context> {
        self.scopes
            .lock()
            .get(&thread::current().id())
            .and_then(|stack| stack.last().cloned())
    }

    /// Makes `context` current on this thread while `scope` runs, the previous context is restored afterwards
    pub fn run<R>(&self, context: Context, scope: impl FnOnce() -> R) -> R {
        let thread = thread::current().id();
        self.scopes.lock().entry(thread).or_default().push(context);
        let _restore = RestoreOnDrop { slot: self, thread };
        scope()
    }

    /// Context resolver reading the slot registered under `slot_id`
    pub fn resolver(slot_id: impl Into<ServiceId>) -> SlotContextResolver {
        SlotContextResolver {
            slot_id: slot_id.into(),
        }
    }
}

struct RestoreOnDrop<'a> {
    slot: &'a ScopeSlot,
    thread: ThreadId,
}
impl Drop for RestoreOnDrop<'_> {
    fn drop(&mut self) {
        let left = {
            let mut scopes = self.slot.scopes.lock();
            let Some(stack) = scopes.get_mut(&self.thread) else {
                return;
            };
            let left = stack.pop();
            if stack.is_empty() {
                scopes.remove(&self.thread);
            }
            left
        };
        // The context may be the last handle to it, release it unlocked
        drop(left);
    }
}

/// Resolves the current context of a [`ScopeSlot`] service
#[derive(Debug, Clone)]
pub struct SlotContextResolver {
    slot_id: ServiceId,
}
impl ContextResolver for SlotContextResolver {
    fn resolve_context(&self, container: &Container) -> Result<Context, ResolveError> {
        container
            .get::<ScopeSlot>(&self.slot_id)?
            .current()
            .ok_or_else(|| ResolveError::other(NoActiveScope))
    }
}
