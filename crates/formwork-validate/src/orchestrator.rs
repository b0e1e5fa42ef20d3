//! Asynchronous validation scheduling.
//!
//! One scheduler task per form session reacts to host-tree change
//! notifications. Per validation target it debounces bursts, keeps suite
//! invocations single-flight, discards stale results by generation, and
//! fans a settled user edit out to the target's configured dependents —
//! exactly one hop, so bidirectional and group configurations can never
//! cascade into a loop.
//!
//! Scheduling is cooperative: suite runs execute as spawned tasks whose
//! settlement returns through the scheduler's mailbox, so several targets
//! can be logically in flight while each target's results apply in
//! generation order. The tree is the only shared mutable resource; this
//! module is the sole writer of error/warning/pending state on it.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{self, Duration, Instant};

use formwork_core::FormTree;
use formwork_model::{DependencyGraph, FieldPath, OrchestratorOptions, ROOT_KEY, SuiteResult};

use crate::suite::{SuiteError, ValidationSuite};

/// Configures and spawns the validation scheduler for one form session.
pub struct Orchestrator {
    tree: Arc<Mutex<FormTree>>,
    suite: Arc<dyn ValidationSuite>,
    graph: DependencyGraph,
    options: OrchestratorOptions,
}

impl Orchestrator {
    pub fn new(tree: Arc<Mutex<FormTree>>, suite: impl ValidationSuite) -> Self {
        Self {
            tree,
            suite: Arc::new(suite),
            graph: DependencyGraph::default(),
            options: OrchestratorOptions::default(),
        }
    }

    /// Supply the dependency graph built for this form configuration.
    pub fn with_graph(mut self, graph: DependencyGraph) -> Self {
        self.graph = graph;
        self
    }

    /// Override the default scheduling options.
    pub fn with_options(mut self, options: OrchestratorOptions) -> Self {
        self.options = options;
        self
    }

    /// Subscribe to the tree and start the scheduler task.
    pub fn spawn(self) -> OrchestratorHandle {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (settle_tx, settle_rx) = mpsc::unbounded_channel();
        let (busy_tx, busy_rx) = watch::channel(false);
        let changes = self
            .tree
            .lock()
            .expect("form tree lock poisoned")
            .subscribe();

        let scheduler = Scheduler {
            tree: self.tree,
            suite: self.suite,
            graph: self.graph,
            options: self.options,
            targets: BTreeMap::new(),
            commands: command_rx,
            changes,
            settlements: settle_rx,
            settle_tx,
            busy_tx,
            busy_clear_at: None,
            waiters: Vec::new(),
        };
        tokio::spawn(scheduler.run());

        OrchestratorHandle {
            commands: command_tx,
            busy: busy_rx,
        }
    }
}

/// Cheaply clonable handle to a running scheduler.
///
/// Dropping every handle shuts the scheduler down.
#[derive(Clone)]
pub struct OrchestratorHandle {
    commands: mpsc::UnboundedSender<Command>,
    busy: watch::Receiver<bool>,
}

impl OrchestratorHandle {
    /// Report a value change for hosts that cannot notify through the
    /// tree's own subscription channel.
    pub fn notify_change(&self, path: &FieldPath) {
        let _ = self.commands.send(Command::Changed(path.clone()));
    }

    /// Run a target's own validators without fanning out to its dependents
    /// and without looking like a user edit.
    pub fn revalidate(&self, target: impl Into<String>) {
        let _ = self.commands.send(Command::Revalidate(target.into()));
    }

    /// Run the suite over the whole model (suite target `None`) and apply
    /// every per-path entry of the result. Used for submit-time validation.
    pub fn validate_all(&self) {
        let _ = self.commands.send(Command::ValidateAll);
    }

    /// Resolve once every pending debounce window, in-flight run and
    /// coalesced rerun has drained and the busy signal has cleared.
    pub async fn await_settled(&self) {
        let (reply, done) = oneshot::channel();
        if self.commands.send(Command::AwaitSettled(reply)).is_err() {
            return;
        }
        let _ = done.await;
    }

    /// The smoothed pending state: true while validation activity is in
    /// progress, cleared after a trailing quiet period.
    pub fn is_busy(&self) -> bool {
        *self.busy.borrow()
    }

    /// Watch the smoothed pending state.
    pub fn busy_signal(&self) -> watch::Receiver<bool> {
        self.busy.clone()
    }

    /// Stop the scheduler task.
    pub fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
    }
}

enum Command {
    Changed(FieldPath),
    Revalidate(String),
    ValidateAll,
    AwaitSettled(oneshot::Sender<()>),
    Shutdown,
}

/// What a validation run covers: a field or group path, the whole-form root
/// target, or a whole-model pass.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum TargetKey {
    Path(String),
    Root,
    All,
}

impl TargetKey {
    /// The target argument handed to the suite.
    fn suite_target(&self) -> Option<String> {
        match self {
            TargetKey::Path(path) => Some(path.clone()),
            TargetKey::Root => Some(ROOT_KEY.to_string()),
            TargetKey::All => None,
        }
    }
}

impl fmt::Display for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKey::Path(path) => f.write_str(path),
            TargetKey::Root => f.write_str(ROOT_KEY),
            TargetKey::All => f.write_str("<whole-model>"),
        }
    }
}

/// Why a run was scheduled. Edits fan out to graph dependents once settled;
/// internal revalidations must not, which is what bounds every cascade to a
/// single hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunKind {
    Edit,
    Revalidation,
}

fn merge_kind(current: Option<RunKind>, incoming: RunKind) -> RunKind {
    match (current, incoming) {
        (Some(RunKind::Edit), _) | (_, RunKind::Edit) => RunKind::Edit,
        _ => RunKind::Revalidation,
    }
}

#[derive(Debug, Default)]
struct TargetState {
    /// Pending debounce window, if any.
    deadline: Option<Instant>,
    /// Kind of the run queued behind `deadline`.
    queued: Option<RunKind>,
    /// Monotonically increasing dispatch counter; a settling run is applied
    /// only if its generation is still current.
    generation: u64,
    in_flight: bool,
    /// Coalesced request to rerun after the in-flight run settles.
    rerun: Option<RunKind>,
}

impl TargetState {
    fn idle(&self) -> bool {
        self.deadline.is_none() && !self.in_flight && self.rerun.is_none()
    }
}

struct Settlement {
    key: TargetKey,
    generation: u64,
    kind: RunKind,
    outcome: Result<SuiteResult, SuiteError>,
}

struct Scheduler {
    tree: Arc<Mutex<FormTree>>,
    suite: Arc<dyn ValidationSuite>,
    graph: DependencyGraph,
    options: OrchestratorOptions,
    targets: BTreeMap<TargetKey, TargetState>,
    commands: mpsc::UnboundedReceiver<Command>,
    changes: mpsc::UnboundedReceiver<FieldPath>,
    settlements: mpsc::UnboundedReceiver<Settlement>,
    settle_tx: mpsc::UnboundedSender<Settlement>,
    busy_tx: watch::Sender<bool>,
    busy_clear_at: Option<Instant>,
    waiters: Vec<oneshot::Sender<()>>,
}

impl Scheduler {
    async fn run(mut self) {
        tracing::info!("validation orchestrator started");
        loop {
            let next = self.next_deadline();
            let deadline = next.unwrap_or_else(|| Instant::now() + Duration::from_secs(60));
            // Biased order: settlements and change notifications drain
            // before handle commands, so an `AwaitSettled` sent right after
            // an edit cannot observe the pre-edit quiescent state. The
            // timer only fires once the mailboxes are empty.
            tokio::select! {
                biased;
                settlement = self.settlements.recv() => {
                    if let Some(settlement) = settlement {
                        self.handle_settlement(settlement);
                    }
                },
                change = self.changes.recv() => match change {
                    Some(path) => self.handle_change(path),
                    None => break,
                },
                command = self.commands.recv() => match command {
                    None | Some(Command::Shutdown) => break,
                    Some(command) => self.handle_command(command),
                },
                _ = time::sleep_until(deadline), if next.is_some() => self.fire_due(),
            }
            self.update_busy();
        }
        tracing::info!("validation orchestrator stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Changed(path) => self.handle_change(path),
            Command::Revalidate(target) => {
                self.schedule(TargetKey::Path(target), RunKind::Revalidation);
            }
            Command::ValidateAll => self.schedule(TargetKey::All, RunKind::Revalidation),
            Command::AwaitSettled(reply) => {
                if self.is_quiescent() && !*self.busy_tx.borrow() {
                    let _ = reply.send(());
                } else {
                    self.waiters.push(reply);
                }
            }
            // Handled in the event loop.
            Command::Shutdown => {}
        }
    }

    /// A raw value change: schedule the field itself and, implicitly, the
    /// whole-form root target. Internal revalidations never come this way,
    /// so they cannot re-trigger the root.
    fn handle_change(&mut self, path: FieldPath) {
        tracing::debug!("change observed at '{}'", path);
        // A whole-model replacement has no field target of its own; it
        // still drives the root target below.
        if !path.is_empty() {
            self.schedule(TargetKey::Path(path.to_string()), RunKind::Edit);
        }
        if self.options.validate_root || path.is_empty() {
            self.schedule(TargetKey::Root, RunKind::Edit);
        }
    }

    fn schedule(&mut self, key: TargetKey, kind: RunKind) {
        self.mark_pending(&key);
        let delay = match (&key, kind) {
            // Revalidations and whole-model passes skip the debounce: the
            // window exists to absorb keystroke bursts, which cannot
            // originate internally.
            (_, RunKind::Revalidation) | (TargetKey::All, _) => Duration::ZERO,
            (TargetKey::Root, RunKind::Edit) => self.options.debounce_for(ROOT_KEY),
            (TargetKey::Path(path), RunKind::Edit) => self.options.debounce_for(path),
        };
        let state = self.targets.entry(key).or_default();
        match kind {
            RunKind::Edit => {
                // A fresh edit supersedes any pending window.
                state.deadline = Some(Instant::now() + delay);
                state.queued = Some(merge_kind(state.queued, RunKind::Edit));
            }
            RunKind::Revalidation => {
                if state.deadline.is_some() {
                    // Already pending: coalesce into the existing window.
                } else if state.in_flight {
                    state.rerun = Some(merge_kind(state.rerun, RunKind::Revalidation));
                } else {
                    state.deadline = Some(Instant::now());
                    state.queued = Some(merge_kind(state.queued, RunKind::Revalidation));
                }
            }
        }
    }

    /// Dispatch every target whose debounce window has elapsed, and clear
    /// the busy signal if its trailing quiet period just ended.
    fn fire_due(&mut self) {
        let now = Instant::now();
        let due: Vec<TargetKey> = self
            .targets
            .iter()
            .filter(|(_, state)| state.deadline.is_some_and(|deadline| deadline <= now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in due {
            self.dispatch(key);
        }

        if let Some(clear_at) = self.busy_clear_at
            && clear_at <= now
            && self.is_quiescent()
        {
            self.busy_clear_at = None;
            let _ = self.busy_tx.send(false);
            for waiter in self.waiters.drain(..) {
                let _ = waiter.send(());
            }
        }
    }

    /// Start a suite run for `key`, single-flight: while one run is in
    /// flight the request coalesces into a rerun, but the generation still
    /// advances so the in-flight result lands stale.
    fn dispatch(&mut self, key: TargetKey) {
        let (kind, generation) = {
            let Some(state) = self.targets.get_mut(&key) else {
                return;
            };
            let kind = state.queued.take().unwrap_or(RunKind::Edit);
            state.deadline = None;
            state.generation += 1;
            if state.in_flight {
                state.rerun = Some(merge_kind(state.rerun, kind));
                tracing::debug!("coalescing request for '{}' into in-flight run", key);
                return;
            }
            state.in_flight = true;
            (kind, state.generation)
        };

        // Fresh snapshot at dispatch time: a rapid edit sequence validates
        // against the latest value, never one captured at debounce start.
        let model = self.lock_tree().value();
        let suite = Arc::clone(&self.suite);
        let settle = self.settle_tx.clone();
        let target = key.suite_target();
        tracing::debug!("validating '{}' (generation {})", key, generation);
        tokio::spawn(async move {
            let outcome = match tokio::spawn(suite.run(model, target)).await {
                Ok(outcome) => outcome,
                Err(join_error) => Err(SuiteError::Panicked(join_error.to_string())),
            };
            let _ = settle.send(Settlement {
                key,
                generation,
                kind,
                outcome,
            });
        });
    }

    fn handle_settlement(&mut self, settlement: Settlement) {
        let Settlement {
            key,
            generation,
            kind,
            outcome,
        } = settlement;

        let (stale, rerun) = match self.targets.get_mut(&key) {
            Some(state) => {
                state.in_flight = false;
                (generation != state.generation, state.rerun.take())
            }
            None => return,
        };

        if stale {
            tracing::debug!(
                "discarding stale result for '{}' (generation {})",
                key,
                generation
            );
        } else {
            let ran_ok = outcome.is_ok();
            self.apply(&key, outcome);
            if ran_ok
                && kind == RunKind::Edit
                && let TargetKey::Path(path) = &key
            {
                let dependents = self.graph.dependents_of(path).to_vec();
                if !dependents.is_empty() {
                    tracing::debug!(
                        "fanning out from '{}' to {} dependent(s)",
                        path,
                        dependents.len()
                    );
                }
                for dependent in dependents {
                    self.schedule(TargetKey::Path(dependent), RunKind::Revalidation);
                }
            }
        }

        if let Some(rerun_kind) = rerun {
            let state = self.targets.entry(key).or_default();
            state.queued = Some(merge_kind(state.queued, rerun_kind));
            if state.deadline.is_none() {
                state.deadline = Some(Instant::now());
            }
        }
    }

    /// Write a settled result onto the tree. Suite failures become one
    /// synthetic error entry, shaped like any other validation error, and
    /// the pending flag still clears.
    fn apply(&mut self, key: &TargetKey, outcome: Result<SuiteResult, SuiteError>) {
        let result = match outcome {
            Ok(result) => result,
            Err(error) => {
                tracing::warn!("suite execution failed for '{}': {}", key, error);
                let entry = key.suite_target().unwrap_or_else(|| ROOT_KEY.to_string());
                SuiteResult::new().with_error(entry, error.to_string())
            }
        };

        let mut tree = self.lock_tree();
        match key {
            TargetKey::Path(path) => {
                if let Some(id) = tree.resolve(&FieldPath::parse(path)) {
                    tree.set_errors(id, result.errors_for(path).to_vec());
                    tree.set_warnings(id, result.warnings_for(path).to_vec());
                    tree.set_pending(id, false);
                } else {
                    tracing::debug!("control '{}' no longer exists; dropping its result", path);
                }
            }
            TargetKey::Root => {
                let root = tree.root();
                tree.set_errors(root, result.errors_for(ROOT_KEY).to_vec());
                tree.set_warnings(root, result.warnings_for(ROOT_KEY).to_vec());
                tree.set_pending(root, false);
            }
            TargetKey::All => {
                tree.clear_validation_state();
                let paths: BTreeSet<&str> =
                    result.error_paths().chain(result.warning_paths()).collect();
                for path in paths {
                    let id = if path == ROOT_KEY {
                        Some(tree.root())
                    } else {
                        tree.resolve(&FieldPath::parse(path))
                    };
                    let Some(id) = id else {
                        tracing::debug!("whole-model result names unknown path '{}'", path);
                        continue;
                    };
                    tree.set_errors(id, result.errors_for(path).to_vec());
                    tree.set_warnings(id, result.warnings_for(path).to_vec());
                }
                let root = tree.root();
                tree.set_pending(root, false);
            }
        }
    }

    fn mark_pending(&self, key: &TargetKey) {
        let mut tree = self.lock_tree();
        let id = match key {
            TargetKey::Path(path) => tree.resolve(&FieldPath::parse(path)),
            TargetKey::Root | TargetKey::All => Some(tree.root()),
        };
        if let Some(id) = id {
            tree.set_pending(id, true);
        }
    }

    fn is_quiescent(&self) -> bool {
        self.targets.values().all(TargetState::idle)
    }

    /// Trailing-edge smoothing for the busy signal: flip true immediately
    /// on activity, clear only after `pending_quiet` with nothing pending.
    fn update_busy(&mut self) {
        if self.is_quiescent() {
            if *self.busy_tx.borrow() && self.busy_clear_at.is_none() {
                self.busy_clear_at = Some(Instant::now() + self.options.pending_quiet());
            }
        } else {
            self.busy_clear_at = None;
            if !*self.busy_tx.borrow() {
                let _ = self.busy_tx.send(true);
            }
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        let target_min = self
            .targets
            .values()
            .filter_map(|state| state.deadline)
            .min();
        match (target_min, self.busy_clear_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// The tree lock is only ever held across short, non-awaiting
    /// sections; a poisoned lock means a writer panicked mid-update, which
    /// is a programming error rather than a runtime condition.
    fn lock_tree(&self) -> MutexGuard<'_, FormTree> {
        self.tree.lock().expect("form tree lock poisoned")
    }
}
