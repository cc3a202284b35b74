//! Process-wide RPC state.
//!
//! [`RpcContext`] replaces what would otherwise be module-level
//! globals: the function registry, the dispatcher-attached flag, and
//! the cached transport flavor. It is constructed once at startup by
//! the hosting process and shared by the proxy factory and the
//! exposer, which keeps the attach-once guarantee and registry
//! isolation testable per context instead of leaking across tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::dispatcher::Handler;
use crate::transport::TransportFlavor;

/// Per-process context owning the registry and idempotency flags.
pub struct RpcContext {
    /// Function registry: name -> handler. Mutated only by
    /// registration, read by the dispatcher. Entries are never
    /// removed; same-name registration overwrites (last write wins).
    registry: Mutex<HashMap<String, Handler>>,
    /// True once the dispatcher listener has been attached to the
    /// transport; guards attach-at-most-once.
    dispatcher_attached: AtomicBool,
    /// Transport flavor, resolved lazily at most once and cached for
    /// process lifetime unless explicitly forced.
    flavor: Mutex<Option<TransportFlavor>>,
}

impl RpcContext {
    /// Create a fresh context with an empty registry.
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(HashMap::new()),
            dispatcher_attached: AtomicBool::new(false),
            flavor: Mutex::new(None),
        }
    }

    /// Merge handlers into the registry, overwriting same-name entries.
    pub(crate) fn merge_handlers(&self, handlers: HashMap<String, Handler>) {
        let mut registry = self.registry.lock().unwrap();
        registry.extend(handlers);
    }

    /// Look up a registered handler by name.
    pub(crate) fn lookup(&self, name: &str) -> Option<Handler> {
        self.registry.lock().unwrap().get(name).cloned()
    }

    /// Names currently registered, for diagnostics.
    pub fn registered_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.registry.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    /// Flip the attached flag. Returns true exactly once, for the
    /// caller that should perform the attach.
    pub(crate) fn mark_dispatcher_attached(&self) -> bool {
        !self.dispatcher_attached.swap(true, Ordering::SeqCst)
    }

    /// Whether the dispatcher listener has been attached.
    pub fn dispatcher_attached(&self) -> bool {
        self.dispatcher_attached.load(Ordering::SeqCst)
    }

    /// Resolve the transport flavor, probing at most once. Subsequent
    /// calls return the cached value without consulting the probe.
    pub fn resolve_flavor(&self, probe: impl FnOnce() -> TransportFlavor) -> TransportFlavor {
        let mut cell = self.flavor.lock().unwrap();
        *cell.get_or_insert_with(probe)
    }

    /// Overwrite the cached flavor. This is the only way to re-resolve
    /// after the first [`RpcContext::resolve_flavor`] call.
    pub fn force_flavor(&self, flavor: TransportFlavor) {
        *self.flavor.lock().unwrap() = Some(flavor);
    }

    /// The cached flavor, if one has been resolved.
    pub fn flavor(&self) -> Option<TransportFlavor> {
        *self.flavor.lock().unwrap()
    }
}

impl Default for RpcContext {
    fn default() -> Self {
        Self::new()
    }
}
