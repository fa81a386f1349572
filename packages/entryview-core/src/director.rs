//! Session state shared by proxies and readers.
//!
//! The Director owns the entry cursor, the chain, and every proxy of a
//! reading session. On each transition to another chain element it calls
//! every registered invalidation callback before any proxy is used again.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::sync::Arc;

use crate::chain::{Chain, SourceTransition};
use crate::config::ReaderConfig;
use crate::diagnostics::Diagnostics;
use crate::error::ReaderError;
use crate::proxy::{AbsencePolicy, ColumnProxy, ProxyId, ProxyRef, SplitPrefixPolicy};
use crate::source::{Source, SourceSchema};
use crate::types::{SchemaGeneration, TypeCatalog};

/// Position of the session within its chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryCursor {
    /// Global entry, `None` before the first load
    pub entry: Option<u64>,
    /// Entry within the current source
    pub local_entry: u64,
    pub element: Option<usize>,
    pub generation: Option<SchemaGeneration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ProxyKey {
    Root(String),
    Member(String),
}

struct DirectorInner {
    catalog: Arc<dyn TypeCatalog>,
    config: ReaderConfig,
    absence_policy: RefCell<Box<dyn AbsencePolicy>>,
    chain: RefCell<Chain>,
    cursor: Cell<EntryCursor>,
    current_source: RefCell<Option<Arc<dyn Source>>>,
    proxies: RefCell<Vec<ProxyRef>>,
    proxy_index: RefCell<HashMap<ProxyKey, usize>>,
    subscriptions: RefCell<BTreeMap<ProxyId, Box<dyn Fn()>>>,
    diagnostics: Diagnostics,
    next_proxy_id: Cell<u64>,
}

/// Handle to a reading session. Clones share the same session.
#[derive(Clone)]
pub struct Director {
    inner: Rc<DirectorInner>,
}

impl std::fmt::Debug for Director {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Director")
            .field("cursor", &self.inner.cursor.get())
            .field("proxies", &self.inner.proxies.borrow().len())
            .finish()
    }
}

impl Director {
    /// Creates a session over `chain` with the default configuration.
    pub fn new(chain: Chain, catalog: Arc<dyn TypeCatalog>) -> Self {
        Self::with_config(chain, catalog, ReaderConfig::default())
    }

    pub fn with_config(chain: Chain, catalog: Arc<dyn TypeCatalog>, config: ReaderConfig) -> Self {
        let diagnostics = Diagnostics::new(config.max_recorded_diagnostics);
        Self {
            inner: Rc::new(DirectorInner {
                catalog,
                config,
                absence_policy: RefCell::new(Box::new(SplitPrefixPolicy)),
                chain: RefCell::new(chain),
                cursor: Cell::new(EntryCursor::default()),
                current_source: RefCell::new(None),
                proxies: RefCell::new(Vec::new()),
                proxy_index: RefCell::new(HashMap::new()),
                subscriptions: RefCell::new(BTreeMap::new()),
                diagnostics,
                next_proxy_id: Cell::new(1),
            }),
        }
    }

    /// Replaces the predicate deciding whether a missing column is expected.
    pub fn set_absence_policy(&self, policy: impl AbsencePolicy + 'static) {
        *self.inner.absence_policy.borrow_mut() = Box::new(policy);
    }

    pub(crate) fn is_benign_absence(&self, column: &str, schema: &SourceSchema) -> bool {
        self.inner.absence_policy.borrow().is_benign(column, schema)
    }

    /// Positions the session on global entry `entry`.
    ///
    /// Returns the entry's index within its source. Moving to another chain
    /// element invalidates every subscribed proxy.
    pub fn load_entry(&self, entry: u64) -> Result<u64, ReaderError> {
        let cursor = self.inner.cursor.get();
        if cursor.entry == Some(entry) {
            return Ok(cursor.local_entry);
        }

        let outcome = self.inner.chain.borrow_mut().load_entry(entry)?;
        let generation = match &outcome.transition {
            Some(transition) => {
                *self.inner.current_source.borrow_mut() = Some(Arc::clone(&transition.source));
                Some(transition.generation)
            }
            None => cursor.generation,
        };
        self.inner.cursor.set(EntryCursor {
            entry: Some(entry),
            local_entry: outcome.local_entry,
            element: Some(outcome.element),
            generation,
        });

        if let Some(transition) = &outcome.transition {
            self.notify_transition(transition);
        }
        Ok(outcome.local_entry)
    }

    /// Invokes every invalidation callback.
    pub fn notify_transition(&self, transition: &SourceTransition) {
        let subscriptions = self.inner.subscriptions.borrow();
        for callback in subscriptions.values() {
            callback();
        }
        tracing::debug!(
            source = %transition.source_name,
            element = transition.element,
            entries = transition.entries,
            generation = %transition.generation,
            schema_changed = transition.schema_changed,
            invalidated = subscriptions.len(),
            "Source transition"
        );
    }

    /// Registers the invalidation callback of proxy `id`.
    ///
    /// Returns `false` if the proxy was already subscribed; the first
    /// callback is kept.
    pub fn subscribe(&self, id: ProxyId, callback: Box<dyn Fn()>) -> bool {
        let mut subscriptions = self.inner.subscriptions.borrow_mut();
        if subscriptions.contains_key(&id) {
            return false;
        }
        subscriptions.insert(id, callback);
        true
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscriptions.borrow().len()
    }

    /// Returns the proxy for a column path, creating it on first request.
    ///
    /// Dotted paths whose prefix is a column resolve the remainder as a
    /// member of that column's class.
    pub fn proxy(&self, path: &str) -> ProxyRef {
        let key = ProxyKey::Root(path.to_string());
        self.attach(key, |id| ColumnProxy::root(id, path))
    }

    /// Returns the proxy for `member` of the object `parent` yields.
    pub fn member_proxy(&self, parent: &ProxyRef, member: &str) -> ProxyRef {
        let key = ProxyKey::Member(format!("{}.{}", parent.borrow().path(), member));
        self.attach(key, |id| ColumnProxy::child(id, parent, member))
    }

    fn attach(&self, key: ProxyKey, create: impl FnOnce(ProxyId) -> ColumnProxy) -> ProxyRef {
        if let Some(&index) = self.inner.proxy_index.borrow().get(&key) {
            if let Some(proxy) = self.inner.proxies.borrow().get(index) {
                return Rc::clone(proxy);
            }
        }

        let id = ProxyId(self.inner.next_proxy_id.get());
        self.inner.next_proxy_id.set(id.0 + 1);
        let proxy = Rc::new(RefCell::new(create(id)));

        let mut proxies = self.inner.proxies.borrow_mut();
        self.inner.proxy_index.borrow_mut().insert(key, proxies.len());
        proxies.push(Rc::clone(&proxy));
        proxy
    }

    /// Number of proxies attached to the session. Never decreases.
    pub fn attached_count(&self) -> usize {
        self.inner.proxies.borrow().len()
    }

    /// Forgets the current position. The next load reports a transition
    /// and invalidates every proxy.
    pub fn rewind(&self) {
        self.inner.chain.borrow_mut().rewind();
        self.inner.cursor.set(EntryCursor::default());
        *self.inner.current_source.borrow_mut() = None;
    }

    pub fn cursor(&self) -> EntryCursor {
        self.inner.cursor.get()
    }

    pub fn current_source(&self) -> Option<Arc<dyn Source>> {
        self.inner.current_source.borrow().clone()
    }

    pub fn total_entries(&self) -> u64 {
        self.inner.chain.borrow().total_entries()
    }

    pub fn catalog(&self) -> &dyn TypeCatalog {
        self.inner.catalog.as_ref()
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.inner.config
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.inner.diagnostics
    }
}
