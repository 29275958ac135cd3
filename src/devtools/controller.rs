use crate::core::errors::AsinCacheError;
use crate::core::models::{ASIN_CACHE_INVALIDATOR, Asin, NotificationEvent, ProductRecord};
use crate::core::services::InvalidationOutcome;
use crate::devtools::Invalidator;
use crate::infrastructure::bus::{NotificationBus, Subscription};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, error, warn};

pub const DEFAULT_WATCHDOG: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStatus {
    Idle,
    Loading,
}

/// How a direct invalidation call was reconciled once it returned.
#[derive(Debug, Clone, PartialEq)]
pub enum Settled {
    /// Fresh data merged into the panel.
    Applied,
    /// The operator cancelled; the result was dropped.
    Suppressed,
    /// The call failed and the error was logged.
    Failed(AsinCacheError),
    /// A newer request replaced this one before it returned.
    Superseded,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanelSnapshot {
    pub data: HashMap<Asin, ProductRecord>,
    pub loading: BTreeSet<Asin>,
    pub all_loading: bool,
}

/// One invalidation in flight (or a leftover cancel marker).
#[derive(Debug, Clone, Copy)]
struct Session {
    id: u64,
    cancelled: bool,
    /// The direct call has not returned yet.
    direct_pending: bool,
    /// A bus notification for this key already arrived.
    notified: bool,
}

impl Session {
    fn in_flight(id: u64) -> Self {
        Session {
            id,
            cancelled: false,
            direct_pending: true,
            notified: false,
        }
    }

    fn cancel_marker(id: u64) -> Self {
        Session {
            id,
            cancelled: true,
            direct_pending: false,
            notified: false,
        }
    }
}

#[derive(Debug, Clone)]
enum Scope {
    One(Asin),
    All,
}

#[derive(Debug, Default)]
struct PanelState {
    data: HashMap<Asin, ProductRecord>,
    loading: BTreeSet<Asin>,
    all_loading: bool,
    sessions: HashMap<Asin, Session>,
    global: Option<Session>,
    next_session: u64,
}

impl PanelState {
    fn begin_session(&mut self) -> u64 {
        self.next_session += 1;
        self.next_session
    }

    fn global_cancelled(&self) -> bool {
        self.global.is_some_and(|g| g.cancelled)
    }

    /// Cancelled sessions outlive the first arrival from either path, so a late
    /// duplicate is still dropped; non-cancelled ones retire once the direct call returns.
    fn apply_notification(&mut self, event: &NotificationEvent) {
        let global_cancelled = self.global_cancelled();
        for (asin, record) in &event.asin_data {
            let cancelled = global_cancelled || self.sessions.get(asin).is_some_and(|s| s.cancelled);
            if cancelled {
                debug!(%asin, "dropping notification for cancelled invalidation");
            } else {
                self.data.insert(asin.clone(), record.clone());
            }
            if let Some(session) = self.sessions.get_mut(asin) {
                session.notified = true;
                if !session.direct_pending {
                    self.sessions.remove(asin);
                }
            }
            self.loading.remove(asin);
        }

        if let Some(global) = self.global.as_mut() {
            global.notified = true;
            if global.cancelled && !global.direct_pending {
                self.global = None;
            }
        }
        if self.loading.is_empty() {
            self.all_loading = false;
        }
    }

    fn settle_one(&mut self, asin: &Asin, id: u64, result: Result<InvalidationOutcome, AsinCacheError>) -> Settled {
        let session = match self.sessions.get_mut(asin) {
            Some(session) if session.id == id && session.direct_pending => session,
            _ => return Settled::Superseded,
        };
        session.direct_pending = false;

        if session.cancelled {
            if session.notified {
                self.sessions.remove(asin);
            }
            return Settled::Suppressed;
        }

        self.sessions.remove(asin);
        self.loading.remove(asin);
        match result {
            Ok(mut outcome) => {
                if let Some(record) = outcome.fresh_data.remove(asin) {
                    self.data.insert(asin.clone(), record);
                }
                Settled::Applied
            }
            Err(e) => {
                error!(%asin, error = %e, "failed to invalidate ASIN");
                Settled::Failed(e)
            }
        }
    }

    fn settle_all(&mut self, id: u64, result: Result<InvalidationOutcome, AsinCacheError>) -> Settled {
        let global = match self.global.as_mut() {
            Some(global) if global.id == id && global.direct_pending => global,
            _ => return Settled::Superseded,
        };
        global.direct_pending = false;
        let cancelled = global.cancelled;
        if !cancelled || global.notified {
            self.global = None;
        }
        self.all_loading = false;

        let mut fresh = match &result {
            Ok(outcome) => outcome.fresh_data.clone(),
            Err(_) => HashMap::new(),
        };
        let members: Vec<Asin> = self
            .sessions
            .iter()
            .filter(|(_, s)| s.id == id && s.direct_pending)
            .map(|(asin, _)| asin.clone())
            .collect();
        for asin in members {
            let Some(session) = self.sessions.get_mut(&asin) else {
                continue;
            };
            session.direct_pending = false;
            if session.cancelled || cancelled {
                session.cancelled = true;
                if session.notified {
                    self.sessions.remove(&asin);
                }
                continue;
            }
            self.sessions.remove(&asin);
            self.loading.remove(&asin);
            if let Some(record) = fresh.remove(&asin) {
                self.data.insert(asin, record);
            }
        }

        match result {
            _ if cancelled => Settled::Suppressed,
            Ok(_) => Settled::Applied,
            Err(e) => {
                error!(error = %e, "failed to invalidate all ASINs");
                Settled::Failed(e)
            }
        }
    }

    /// Watchdog expiry: stop showing the operation as loading. The session stays
    /// open, so a late direct result or notification is still merged.
    fn force_idle(&mut self, scope: &Scope, id: u64) {
        match scope {
            Scope::One(asin) => {
                let pending = self.sessions.get(asin).is_some_and(|s| s.id == id && s.direct_pending);
                if pending && self.loading.remove(asin) {
                    warn!(%asin, "invalidation watchdog fired, forcing idle");
                }
            }
            Scope::All => {
                if !self.global.is_some_and(|g| g.id == id && g.direct_pending) {
                    return;
                }
                warn!("bulk invalidation watchdog fired, forcing idle");
                self.all_loading = false;
                let members: Vec<Asin> = self
                    .sessions
                    .iter()
                    .filter(|(_, s)| s.id == id && s.direct_pending)
                    .map(|(asin, _)| asin.clone())
                    .collect();
                for asin in &members {
                    self.loading.remove(asin);
                }
            }
        }
    }
}

/// State machine behind the devtools panel.
///
/// Both the direct call result and the bus notification may clear a key's
/// loading state; either may arrive first, twice, or not at all.
pub struct InvalidationController<I: Invalidator> {
    invalidator: Arc<I>,
    tracked: Arc<Vec<Asin>>,
    state: Arc<Mutex<PanelState>>,
    watchdog: Duration,
}

impl<I: Invalidator> Clone for InvalidationController<I> {
    fn clone(&self) -> Self {
        InvalidationController {
            invalidator: self.invalidator.clone(),
            tracked: self.tracked.clone(),
            state: self.state.clone(),
            watchdog: self.watchdog,
        }
    }
}

impl<I: Invalidator> InvalidationController<I> {
    pub fn new(invalidator: Arc<I>, tracked: Vec<Asin>, watchdog: Duration) -> Self {
        InvalidationController {
            invalidator,
            tracked: Arc::new(tracked),
            state: Arc::new(Mutex::new(PanelState::default())),
            watchdog,
        }
    }

    fn lock(&self) -> MutexGuard<'_, PanelState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn tracked(&self) -> &[Asin] {
        &self.tracked
    }

    /// Reconciles bus notifications into the panel until the subscription is dropped.
    pub fn attach(&self, bus: &NotificationBus) -> Subscription {
        let state = self.state.clone();
        bus.subscribe(ASIN_CACHE_INVALIDATOR, move |event| {
            state.lock().unwrap_or_else(|e| e.into_inner()).apply_notification(event);
        })
    }

    pub fn handle_notification(&self, event: &NotificationEvent) {
        self.lock().apply_notification(event);
    }

    pub fn status(&self, asin: &Asin) -> KeyStatus {
        if self.lock().loading.contains(asin) {
            KeyStatus::Loading
        } else {
            KeyStatus::Idle
        }
    }

    pub fn is_all_loading(&self) -> bool {
        self.lock().all_loading
    }

    pub fn record(&self, asin: &Asin) -> Option<ProductRecord> {
        self.lock().data.get(asin).cloned()
    }

    pub fn snapshot(&self) -> PanelSnapshot {
        let state = self.lock();
        PanelSnapshot {
            data: state.data.clone(),
            loading: state.loading.clone(),
            all_loading: state.all_loading,
        }
    }

    fn arm_watchdog(&self, scope: Scope, id: u64) -> tokio::task::JoinHandle<()> {
        let state = self.state.clone();
        let bound = self.watchdog;
        tokio::spawn(async move {
            tokio::time::sleep(bound).await;
            state.lock().unwrap_or_else(|e| e.into_inner()).force_idle(&scope, id);
        })
    }

    /// Invalidates one key. Calling again while loading starts a fresh request.
    pub async fn request_one(&self, asin: Asin) -> Settled {
        let id = {
            let mut guard = self.lock();
            let state = &mut *guard;
            let id = state.begin_session();
            // Once the bulk call has returned, only a spent cancel marker can remain.
            if state.global.is_some_and(|g| !g.direct_pending) {
                state.global = None;
            }
            state.sessions.insert(asin.clone(), Session::in_flight(id));
            state.loading.insert(asin.clone());
            id
        };
        let watchdog = self.arm_watchdog(Scope::One(asin.clone()), id);
        let result = self.invalidator.request_invalidation(vec![asin.clone()]).await;
        watchdog.abort();
        self.lock().settle_one(&asin, id, result)
    }

    /// Stops showing `asin` as loading; the in-flight call keeps running and its result is dropped.
    pub fn cancel_one(&self, asin: &Asin) {
        let mut guard = self.lock();
        let state = &mut *guard;
        let marker = state.begin_session();
        state
            .sessions
            .entry(asin.clone())
            .and_modify(|s| s.cancelled = true)
            .or_insert_with(|| Session::cancel_marker(marker));
        state.loading.remove(asin);
        debug!(%asin, "cancelled invalidation");
    }

    pub async fn request_all(&self) -> Settled {
        let id = {
            let mut guard = self.lock();
            let state = &mut *guard;
            let id = state.begin_session();
            state.global = Some(Session::in_flight(id));
            state.sessions.clear();
            for asin in self.tracked.iter() {
                state.sessions.insert(asin.clone(), Session::in_flight(id));
                state.loading.insert(asin.clone());
            }
            state.all_loading = true;
            id
        };
        let watchdog = self.arm_watchdog(Scope::All, id);
        let result = self.invalidator.request_invalidation(self.tracked.to_vec()).await;
        watchdog.abort();
        self.lock().settle_all(id, result)
    }

    pub fn cancel_all(&self) {
        let mut guard = self.lock();
        let state = &mut *guard;
        let marker = state.begin_session();
        match state.global.as_mut() {
            Some(global) => global.cancelled = true,
            None => state.global = Some(Session::cancel_marker(marker)),
        }
        let keys: BTreeSet<Asin> = self.tracked.iter().cloned().chain(state.loading.iter().cloned()).collect();
        for asin in keys {
            state
                .sessions
                .entry(asin)
                .and_modify(|s| s.cancelled = true)
                .or_insert_with(|| Session::cancel_marker(marker));
        }
        state.loading.clear();
        state.all_loading = false;
        debug!("cancelled all invalidations");
    }
}
