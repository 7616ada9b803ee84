//! Update batching.
//!
//! [`Controller::update`] does not render right away. It adds the controller to
//! the scheduler's dirty set and, if no flush is pending yet, spawns one flush
//! task on the executor. Any number of updates issued before that task runs
//! are rendered by the same flush. Controllers dirtied while the flush drains,
//! for example by a parent's render, are appended and handled by that flush
//! too.

use alloc::{boxed::Box, collections::VecDeque, rc::Rc, vec::Vec};
use core::{
    cell::{Cell, RefCell},
    fmt::{self, Debug},
    future::Future,
};
use std::collections::HashSet;

use futures::task::{LocalSpawn, LocalSpawnExt};
use tracing::{debug, error};

use crate::{
    config::Config,
    controller::{Controller, ControllerId},
    error::{ReconcileError, Result},
};

/// Counters of the work performed by the reconciler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStats {
    /// Controller render calls.
    pub renders: u64,
    /// Host views created.
    pub views_created: u64,
    /// Host views destroyed.
    pub views_destroyed: u64,
    /// Property writes issued to the host.
    pub property_writes: u64,
    /// Views repositioned with `insert_after` or `insert_before`.
    pub moves: u64,
    /// Controllers instantiated.
    pub controllers_created: u64,
    /// Controllers destroyed.
    pub controllers_destroyed: u64,
}

impl DiffStats {
    /// Work done since `earlier` was captured.
    #[must_use]
    pub const fn since(&self, earlier: &Self) -> Self {
        Self {
            renders: self.renders.saturating_sub(earlier.renders),
            views_created: self.views_created.saturating_sub(earlier.views_created),
            views_destroyed: self.views_destroyed.saturating_sub(earlier.views_destroyed),
            property_writes: self.property_writes.saturating_sub(earlier.property_writes),
            moves: self.moves.saturating_sub(earlier.moves),
            controllers_created: self
                .controllers_created
                .saturating_sub(earlier.controllers_created),
            controllers_destroyed: self
                .controllers_destroyed
                .saturating_sub(earlier.controllers_destroyed),
        }
    }
}

/// Summary of one flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Controllers taken from the dirty set and rendered.
    pub rendered: usize,
    /// Work performed during the flush.
    pub stats: DiffStats,
}

struct Inner {
    config: Config,
    spawner: Box<dyn LocalSpawn>,
    queue: RefCell<VecDeque<Controller>>,
    pending: RefCell<HashSet<ControllerId>>,
    flush_scheduled: Cell<bool>,
    flushes: Cell<u64>,
    flushed: Cell<usize>,
    stats: Cell<DiffStats>,
    failures: RefCell<Vec<ReconcileError>>,
}

/// Dirty set and flush driver shared by every controller of one application.
///
/// The scheduler is single threaded: it and every controller registered with
/// it must stay on the thread that created them.
#[derive(Clone)]
pub struct Scheduler(Rc<Inner>);

impl Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("pending", &self.0.pending.borrow().len())
            .field("flush_scheduled", &self.0.flush_scheduled.get())
            .field("flushes", &self.0.flushes.get())
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    /// Creates a scheduler spawning its flushes on `spawner`.
    pub fn new(spawner: impl LocalSpawn + 'static, config: Config) -> Self {
        Self(Rc::new(Inner {
            config,
            spawner: Box::new(spawner),
            queue: RefCell::new(VecDeque::new()),
            pending: RefCell::new(HashSet::new()),
            flush_scheduled: Cell::new(false),
            flushes: Cell::new(0),
            flushed: Cell::new(0),
            stats: Cell::new(DiffStats::default()),
            failures: RefCell::new(Vec::new()),
        }))
    }

    /// Engine configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.0.config
    }

    /// Adds `controller` to the dirty set, scheduling a flush if none is pending.
    ///
    /// Controllers left over by an aborted flush are still pending; enqueuing
    /// any of them again schedules the flush that renders them.
    pub fn enqueue(&self, controller: &Controller) {
        if controller.is_destroyed() {
            return;
        }
        if self.0.pending.borrow_mut().insert(controller.id()) {
            self.0.queue.borrow_mut().push_back(controller.clone());
        }
        if !self.0.flush_scheduled.replace(true) {
            let scheduler = self.clone();
            let spawned = self.spawn(async move {
                if let Err(error) = scheduler.flush() {
                    error!(%error, "render pass aborted");
                    scheduler.0.failures.borrow_mut().push(error);
                }
            });
            if !spawned {
                self.0.flush_scheduled.set(false);
            }
        }
    }

    /// Removes `id` from the dirty set.
    pub(crate) fn forget(&self, id: ControllerId) {
        self.0.pending.borrow_mut().remove(&id);
    }

    /// Returns `true` if `controller` waits for the next flush.
    #[must_use]
    pub fn is_pending(&self, controller: &Controller) -> bool {
        self.0.pending.borrow().contains(&controller.id())
    }

    /// Number of controllers waiting for a flush.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.0.pending.borrow().len()
    }

    /// Returns `true` while a flush task is spawned but has not finished.
    #[must_use]
    pub fn is_flush_scheduled(&self) -> bool {
        self.0.flush_scheduled.get()
    }

    /// Renders every dirty controller, including those dirtied meanwhile.
    ///
    /// # Errors
    ///
    /// Stops at the first structural error. Controllers not reached yet stay
    /// in the dirty set and are rendered by the next flush.
    pub fn flush(&self) -> Result<FlushReport> {
        let before = self.stats();
        let mut rendered = 0;
        let result = loop {
            let Some(controller) = self.next_dirty() else {
                break Ok(());
            };
            rendered += 1;
            if let Err(error) = controller.rerender() {
                break Err(error);
            }
        };
        self.0.flush_scheduled.set(false);
        self.0.flushes.set(self.0.flushes.get() + 1);
        self.0.flushed.set(self.0.flushed.get() + rendered);

        let report = FlushReport {
            rendered,
            stats: self.stats().since(&before),
        };
        debug!(
            rendered,
            views_created = report.stats.views_created,
            views_destroyed = report.stats.views_destroyed,
            property_writes = report.stats.property_writes,
            moves = report.stats.moves,
            "flush finished"
        );
        result.map(|()| report)
    }

    fn next_dirty(&self) -> Option<Controller> {
        loop {
            let controller = self.0.queue.borrow_mut().pop_front()?;
            // stale entries were already rendered through their parent
            if self.0.pending.borrow_mut().remove(&controller.id()) {
                return Some(controller);
            }
        }
    }

    /// Number of flushes run so far.
    #[must_use]
    pub fn flush_count(&self) -> u64 {
        self.0.flushes.get()
    }

    /// Controllers rendered by all flushes so far.
    #[must_use]
    pub fn flushed_count(&self) -> usize {
        self.0.flushed.get()
    }

    /// Cumulative work counters.
    #[must_use]
    pub fn stats(&self) -> DiffStats {
        self.0.stats.get()
    }

    pub(crate) fn count(&self, f: impl FnOnce(&mut DiffStats)) {
        let mut stats = self.0.stats.get();
        f(&mut stats);
        self.0.stats.set(stats);
    }

    /// Errors raised by flushes that ran on the executor, oldest first.
    pub fn take_failures(&self) -> Vec<ReconcileError> {
        core::mem::take(&mut *self.0.failures.borrow_mut())
    }

    pub(crate) fn spawn(&self, task: impl Future<Output = ()> + 'static) -> bool {
        match self.0.spawner.spawn_local(task) {
            Ok(()) => true,
            Err(error) => {
                error!(%error, "executor rejected a reconciler task");
                false
            }
        }
    }
}
