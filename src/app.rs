//! A single-threaded Eddy application.

use eddy_core::{FlushReport, Render, Root, Scheduler, SharedHost, ViewId};
use futures::executor::LocalPool;
use tracing::{debug, info};

use crate::{error::Result, settings::Settings};

/// Owns the executor, the scheduler, and the root of one tree.
///
/// Updates made by controllers are only rendered when the executor runs, so
/// call [`App::run_until_stalled`] after handing out work.
#[derive(Debug)]
pub struct App {
    pool: LocalPool,
    scheduler: Scheduler,
    root: Root,
    settings: Settings,
}

impl App {
    /// Creates an application rendering into `container` of `host`.
    #[must_use]
    pub fn new(settings: Settings, host: SharedHost, container: ViewId) -> Self {
        let pool = LocalPool::new();
        let scheduler = Scheduler::new(pool.spawner(), settings.core.clone());
        let root = Root::new(host, scheduler.clone(), container);
        info!(%container, "eddy app created");
        Self {
            pool,
            scheduler,
            root,
            settings,
        }
    }

    /// Reconciles the tree with `node` right away.
    ///
    /// # Errors
    ///
    /// Returns the structural error that aborted the pass.
    pub fn render(&self, node: impl Into<Render>) -> Result<()> {
        self.root.render(node)?;
        Ok(())
    }

    /// Runs queued flushes and pending loads until nothing can make progress.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a flush while running.
    pub fn run_until_stalled(&mut self) -> Result<FlushReport> {
        let rendered = self.scheduler.flushed_count();
        let stats = self.scheduler.stats();
        self.pool.run_until_stalled();

        if let Some(error) = self.scheduler.take_failures().into_iter().next() {
            return Err(error.into());
        }
        let report = FlushReport {
            rendered: self.scheduler.flushed_count() - rendered,
            stats: self.scheduler.stats().since(&stats),
        };
        debug!(rendered = report.rendered, "executor stalled");
        Ok(report)
    }

    /// The root of the tree.
    #[must_use]
    pub const fn root(&self) -> &Root {
        &self.root
    }

    /// The scheduler shared by every controller of this app.
    #[must_use]
    pub const fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Settings the app was created with.
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Destroys the tree and drops any pending work.
    pub fn unmount(&mut self) {
        self.root.unmount();
        self.pool.run_until_stalled();
    }
}
