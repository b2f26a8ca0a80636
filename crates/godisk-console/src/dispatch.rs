use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::future::join_all;
use godisk_api::{
    poll_until_ready, ConsoleBackend, GoDiskApiError, InodeReport, Polled, ReportKind,
    ReportPayload, ReportReadiness, ReportRequest, RetryPolicy,
};

use crate::block_runs::contiguous_runs;
use crate::content_opener::{ContentOpener, FileOpenRequest};
use crate::directives::{detect_directives, DetectedDirectives};
use crate::error::ConsoleError;
use crate::inode_explorer::{fetch_inode, fetch_inode_chain, DEFAULT_MAX_CHAIN_NODES};
use crate::surfaces::{ConsoleSurfaces, RedrawHandler};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Public struct `ConsoleConfig` used across GoDisk console components.
pub struct ConsoleConfig {
    pub retry: RetryPolicy,
    /// Inodes fetched in full when an inode listing arrives.
    pub max_chain_nodes: usize,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            max_chain_nodes: DEFAULT_MAX_CHAIN_NODES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// How one submission ended.
pub enum DispatchOutcome {
    /// Results were applied; `pending` lists kinds that stayed empty.
    Applied {
        token: u64,
        pending: Vec<ReportKind>,
    },
    /// The run failed and `Error: <message>` was shown.
    Failed { token: u64, message: String },
    /// A newer submission or a cancel superseded this run.
    Discarded { token: u64 },
    RejectedBlank,
    RejectedBusy,
}

struct ConsoleState {
    token: u64,
    in_flight: bool,
    surfaces: ConsoleSurfaces,
}

struct RunResult {
    output: String,
    reports: Vec<Polled<ReportPayload>>,
    inode_chain: Vec<InodeReport>,
}

/// Submits scripts and reconciles their reports into [`ConsoleSurfaces`].
///
/// Every submission takes a fresh token; results are applied only when their
/// token is still current, so late answers from superseded or cancelled runs
/// never touch the display.
pub struct Console {
    backend: Arc<dyn ConsoleBackend>,
    opener: Arc<dyn ContentOpener>,
    config: ConsoleConfig,
    state: Mutex<ConsoleState>,
    redraw_handlers: Mutex<Vec<RedrawHandler>>,
}

impl Console {
    pub fn new(
        backend: Arc<dyn ConsoleBackend>,
        opener: Arc<dyn ContentOpener>,
        config: ConsoleConfig,
    ) -> Self {
        Self {
            backend,
            opener,
            config,
            state: Mutex::new(ConsoleState {
                token: 0,
                in_flight: false,
                surfaces: ConsoleSurfaces::default(),
            }),
            redraw_handlers: Mutex::new(Vec::new()),
        }
    }

    fn state(&self) -> MutexGuard<'_, ConsoleState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn subscribe(&self, handler: RedrawHandler) {
        self.redraw_handlers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(handler);
    }

    fn redraw(&self, surfaces: &ConsoleSurfaces) {
        let handlers = self
            .redraw_handlers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        for handler in handlers {
            handler(surfaces);
        }
    }

    fn mutate(&self, apply: impl FnOnce(&mut ConsoleState)) {
        let snapshot = {
            let mut state = self.state();
            apply(&mut state);
            state.surfaces.clone()
        };
        self.redraw(&snapshot);
    }

    pub fn snapshot(&self) -> ConsoleSurfaces {
        self.state().surfaces.clone()
    }

    pub fn current_token(&self) -> u64 {
        self.state().token
    }

    pub fn is_busy(&self) -> bool {
        self.state().in_flight
    }

    /// Runs `script` unless it is blank or another run is still in flight.
    pub async fn execute(&self, script: &str) -> DispatchOutcome {
        if script.trim().is_empty() {
            return DispatchOutcome::RejectedBlank;
        }
        let mut token = None;
        self.mutate(|state| {
            if !state.in_flight {
                token = Some(begin_run(state));
            }
        });
        let Some(token) = token else {
            tracing::debug!("submission rejected while a run is in flight");
            return DispatchOutcome::RejectedBusy;
        };
        self.run(token, script).await
    }

    /// Runs `script` even while another run is in flight; the older run's
    /// results are discarded when they arrive.
    pub async fn supersede(&self, script: &str) -> DispatchOutcome {
        if script.trim().is_empty() {
            return DispatchOutcome::RejectedBlank;
        }
        let mut token = 0;
        self.mutate(|state| token = begin_run(state));
        self.run(token, script).await
    }

    /// Invalidates the in-flight run, if any, and clears the busy state.
    pub fn cancel(&self) {
        self.mutate(|state| {
            state.token = state.token.wrapping_add(1);
            state.in_flight = false;
            state.surfaces.busy = false;
        });
    }

    /// Closes one report surface.
    pub fn dismiss(&self, kind: ReportKind) {
        self.mutate(|state| state.surfaces.dismiss(kind));
    }

    /// Moves the tree selection; unknown nodes leave it unchanged.
    pub fn select_tree_node(&self, index: i64) -> bool {
        let mut selected = false;
        self.mutate(|state| {
            let surfaces = &mut state.surfaces;
            if surfaces
                .tree
                .as_ref()
                .is_some_and(|tree| tree.node(index).is_some())
            {
                surfaces.tree_selection = Some(index);
                selected = true;
            }
        });
        selected
    }

    /// Opens inode `index` of the listed mount in the inode explorer.
    ///
    /// The answer is dropped when a newer run or a dismiss replaced the
    /// listing while the fetch was in flight.
    pub async fn select_inode(&self, index: i64) -> Result<InodeReport, ConsoleError> {
        let (token, id) = {
            let state = self.state();
            let id = state
                .surfaces
                .inodes
                .as_ref()
                .map(|inodes| inodes.id.clone())
                .ok_or(ConsoleError::MissingField("inode listing"))?;
            (state.token, id)
        };
        let report = fetch_inode(self.backend.as_ref(), &id, index).await?;
        let mut applied = false;
        self.mutate(|state| {
            let surfaces = &mut state.surfaces;
            let same_listing = surfaces
                .inodes
                .as_ref()
                .is_some_and(|inodes| inodes.id == id);
            if state.token != token || !same_listing {
                return;
            }
            if surfaces.inode_root.is_none() {
                surfaces.inode_root = Some(report.clone());
            }
            surfaces.inode_runs = contiguous_runs(&report.blocks);
            surfaces.inode_selected = Some(report.clone());
            applied = true;
        });
        if !applied {
            tracing::warn!(token, index, "discarding stale inode selection");
            return Err(ConsoleError::StaleSelection { index });
        }
        Ok(report)
    }

    async fn run(&self, token: u64, script: &str) -> DispatchOutcome {
        let directives = detect_directives(script);
        tracing::debug!(token, reports = ?directives.kinds(), "dispatching script");
        let result = self.collect(token, script, &directives).await;

        let mut outcome = DispatchOutcome::Discarded { token };
        self.mutate(|state| {
            if state.token != token {
                tracing::warn!(token, current = state.token, "discarding stale run");
                return;
            }
            state.in_flight = false;
            state.surfaces.busy = false;
            outcome = match result {
                Ok(run) => apply_run(&mut state.surfaces, token, run),
                Err(message) => {
                    state.surfaces.output = format!("Error: {message}");
                    DispatchOutcome::Failed { token, message }
                }
            };
        });
        outcome
    }

    async fn collect(
        &self,
        token: u64,
        script: &str,
        directives: &DetectedDirectives,
    ) -> Result<RunResult, String> {
        let response = self
            .backend
            .execute(script)
            .await
            .map_err(|error| error.user_message())?;

        if let Some(file) = directives.get(ReportKind::File) {
            if self.current_token() == token {
                self.open_file(file).await;
            }
        }

        let polls = directives
            .requests()
            .filter(|request| request.kind != ReportKind::File)
            .map(|request| self.poll_report(request));
        let mut reports = Vec::new();
        // All polls settle before the first failure is reported.
        for settled in join_all(polls).await {
            reports.push(settled.map_err(|error| error.user_message())?);
        }

        let inode_chain = self.collect_inode_chain(directives, &reports).await;
        Ok(RunResult {
            output: response.output,
            reports,
            inode_chain,
        })
    }

    async fn poll_report(
        &self,
        request: &ReportRequest,
    ) -> Result<Polled<ReportPayload>, GoDiskApiError> {
        poll_until_ready(
            self.config.retry,
            request.kind.as_str(),
            || self.backend.fetch_report(request),
            |payload: &ReportPayload| payload.is_ready(),
        )
        .await
    }

    async fn open_file(&self, request: &ReportRequest) {
        let ruta = request.ruta.clone().unwrap_or_default();
        let location = self.backend.file_location(&request.id, &ruta);
        tracing::debug!(location = %location, "opening file report");
        self.opener
            .open(FileOpenRequest {
                id: request.id.clone(),
                ruta,
                location,
            })
            .await;
    }

    async fn collect_inode_chain(
        &self,
        directives: &DetectedDirectives,
        reports: &[Polled<ReportPayload>],
    ) -> Vec<InodeReport> {
        let listing = reports.iter().find_map(|polled| match &polled.payload {
            ReportPayload::Inodes(listing) if polled.ready => Some(listing),
            _ => None,
        });
        let (Some(listing), Some(request)) = (listing, directives.get(ReportKind::Inodes)) else {
            return Vec::new();
        };
        match fetch_inode_chain(
            self.backend.as_ref(),
            &request.id,
            &listing.items,
            self.config.max_chain_nodes,
        )
        .await
        {
            Ok(chain) => chain,
            Err(error) => {
                tracing::warn!(error = %error, "inode chain unavailable");
                Vec::new()
            }
        }
    }
}

fn begin_run(state: &mut ConsoleState) -> u64 {
    state.token = state.token.wrapping_add(1);
    state.in_flight = true;
    state.surfaces.clear();
    state.surfaces.busy = true;
    state.token
}

// Reports arrive in kind order, which is also the display order.
fn apply_run(surfaces: &mut ConsoleSurfaces, token: u64, run: RunResult) -> DispatchOutcome {
    surfaces.output = run.output;
    let mut pending = Vec::new();
    for polled in run.reports {
        if polled.ready {
            surfaces.apply_report(polled.payload);
        } else {
            pending.push(polled.payload.kind());
        }
    }
    if surfaces.inodes.is_some() {
        surfaces.inode_chain = run.inode_chain;
    }
    surfaces.pending = pending.clone();
    DispatchOutcome::Applied { token, pending }
}
