//! Session registry: one solving session per submitted timetable, each on its
//! own worker thread, with status, best-snapshot and cancellation access from
//! any thread.

use crate::config::SolverConfig;
use crate::constraints;
use crate::domain::{Assignment, Timetable};
use crate::error::{TimetableError, TtResult};
use crate::optimizer::{
    BestSolutionListener, Snapshot, SolveOutcome, SolveStats, Solver, TerminationReason,
};
use crate::score::HardSoftScore;
use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};
use strum_macros::{Display, EnumString};
use tracing::{debug, error, info, info_span, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionHandle(pub u64);

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SolverStatus {
    NotStarted,
    Solving,
    Stopped,
    TimedOut,
    Exhausted,
    /// Unknown or evicted handle.
    NotFound,
}

impl SolverStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SolverStatus::Stopped | SolverStatus::TimedOut | SolverStatus::Exhausted
        )
    }
}

impl From<TerminationReason> for SolverStatus {
    fn from(reason: TerminationReason) -> Self {
        match reason {
            TerminationReason::Stopped => SolverStatus::Stopped,
            TerminationReason::TimedOut => SolverStatus::TimedOut,
            TerminationReason::Exhausted => SolverStatus::Exhausted,
        }
    }
}

/// Receives each new best solution of one session, on that session's notifier
/// thread. Callbacks of a session never run concurrently with each other.
pub type ImprovedCallback = Box<dyn FnMut(&Timetable, HardSoftScore) + Send + 'static>;

/// What is known about a finished session besides its snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub status: Option<SolverStatus>,
    pub stats: Option<SolveStats>,
    pub fault: Option<String>,
}

struct Lifecycle {
    status: SolverStatus,
    finished_at: Option<Instant>,
    stats: Option<SolveStats>,
    fault: Option<String>,
}

struct Session {
    problem: Timetable,
    stop: AtomicBool,
    best: Mutex<Snapshot>,
    lifecycle: Mutex<Lifecycle>,
    changed: Condvar,
    callbacks: Mutex<Vec<ImprovedCallback>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    notifier: Mutex<Option<ThreadId>>,
}

impl Session {
    fn new(problem: Timetable, initial: Snapshot) -> Self {
        Self {
            problem,
            stop: AtomicBool::new(false),
            best: Mutex::new(initial),
            lifecycle: Mutex::new(Lifecycle {
                status: SolverStatus::NotStarted,
                finished_at: None,
                stats: None,
                fault: None,
            }),
            changed: Condvar::new(),
            callbacks: Mutex::new(Vec::new()),
            worker: Mutex::new(None),
            notifier: Mutex::new(None),
        }
    }

    /// True on this session's notifier thread, i.e. from inside a callback.
    fn is_notifying(&self) -> bool {
        *lock(&self.notifier) == Some(thread::current().id())
    }

    fn status(&self) -> SolverStatus {
        lock(&self.lifecycle).status
    }

    fn begin(&self) {
        let mut life = lock(&self.lifecycle);
        if life.status == SolverStatus::NotStarted {
            life.status = SolverStatus::Solving;
            self.changed.notify_all();
        }
    }

    fn finish(&self, status: SolverStatus, stats: Option<SolveStats>, fault: Option<String>) {
        let mut life = lock(&self.lifecycle);
        life.status = status;
        life.finished_at = Some(Instant::now());
        life.stats = stats;
        life.fault = fault;
        self.changed.notify_all();
    }

    fn materialize(&self, snapshot: &Snapshot) -> Timetable {
        let mut tt = self.problem.clone();
        tt.restore(&snapshot.assignments);
        tt
    }
}

/// Publishes the loop's best snapshots into the session and queues them for
/// the notifier. Runs on the worker thread and never blocks on callbacks.
struct Publisher {
    session: Arc<Session>,
    notices: Sender<Snapshot>,
}

impl BestSolutionListener for Publisher {
    fn on_started(&mut self, snapshot: &Snapshot) {
        *lock(&self.session.best) = snapshot.clone();
    }

    fn on_new_best(&mut self, snapshot: &Snapshot) {
        *lock(&self.session.best) = snapshot.clone();
        // The notifier only goes away after the publisher is dropped.
        let _ = self.notices.send(snapshot.clone());
    }
}

pub struct SolverManager {
    config: SolverConfig,
    sessions: RwLock<FnvHashMap<SessionHandle, Arc<Session>>>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl SolverManager {
    pub fn new(config: SolverConfig) -> TtResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            sessions: RwLock::new(FnvHashMap::default()),
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Validates the problem and starts solving it on a dedicated worker.
    pub fn submit(&self, timetable: Timetable) -> TtResult<SessionHandle> {
        self.submit_with(timetable, self.config.clone())
    }

    /// Like [`submit`](Self::submit), first re-applying a previously persisted
    /// partial assignment.
    pub fn submit_resumed(
        &self,
        mut timetable: Timetable,
        assignments: &[Assignment],
    ) -> TtResult<SessionHandle> {
        timetable.resume_from(assignments)?;
        self.submit(timetable)
    }

    /// Submits with per-session solver settings.
    pub fn submit_with(&self, timetable: Timetable, config: SolverConfig) -> TtResult<SessionHandle> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TimetableError::ShutDown);
        }
        timetable.validate()?;
        let solver = Solver::new(config)?;
        self.evict_expired();

        let initial = Snapshot {
            score: constraints::full_score(&timetable)?,
            assignments: timetable.assignments(),
        };
        let handle = SessionHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        let shape = (
            timetable.lessons().len(),
            timetable.timeslots().len(),
            timetable.rooms().len(),
        );
        let session = Arc::new(Session::new(timetable, initial));

        let (tx, rx) = mpsc::channel();
        let notifier = spawn_notifier(handle, session.clone(), rx)?;
        let worker_session = session.clone();
        let worker = thread::Builder::new()
            .name(format!("solve-{}", handle.0))
            .spawn(move || {
                run_session(handle, worker_session, tx, notifier, |problem, stop, publisher| {
                    solver.solve(problem, stop, publisher)
                })
            })?;
        *lock(&session.worker) = Some(worker);

        {
            // Checked again under the write lock so a concurrent shutdown either
            // sees this session or is seen here.
            let mut sessions = write_lock(&self.sessions);
            if self.closed.load(Ordering::Acquire) {
                drop(sessions);
                session.stop.store(true, Ordering::Release);
                join_worker(handle, &session);
                return Err(TimetableError::ShutDown);
            }
            sessions.insert(handle, session);
        }
        info!(
            "Submitted {} ({} lessons, {} timeslots, {} rooms)",
            handle, shape.0, shape.1, shape.2
        );
        Ok(handle)
    }

    pub fn status(&self, handle: SessionHandle) -> SolverStatus {
        self.evict_expired();
        self.with_session(handle, |s| s.status())
            .unwrap_or(SolverStatus::NotFound)
    }

    /// The best timetable found so far. Only ever reflects move boundaries.
    pub fn best_snapshot(&self, handle: SessionHandle) -> TtResult<(Timetable, HardSoftScore)> {
        let session = self.session(handle)?;
        let snapshot = lock(&session.best).clone();
        Ok((session.materialize(&snapshot), snapshot.score))
    }

    /// Requests cooperative cancellation. Idempotent, and a no-op for
    /// sessions that already finished.
    pub fn stop(&self, handle: SessionHandle) -> TtResult<()> {
        let session = self.session(handle)?;
        if !session.status().is_terminal() {
            debug!("Stop requested for {}", handle);
            session.stop.store(true, Ordering::Release);
        }
        Ok(())
    }

    pub fn on_improved<F>(&self, handle: SessionHandle, callback: F) -> TtResult<()>
    where
        F: FnMut(&Timetable, HardSoftScore) + Send + 'static,
    {
        let session = self.session(handle)?;
        lock(&session.callbacks).push(Box::new(callback));
        Ok(())
    }

    /// Blocks until the session is terminal or `timeout` elapses, and returns
    /// the status at that point. Once terminal, every improvement callback of
    /// the session has already run.
    pub fn await_termination(
        &self,
        handle: SessionHandle,
        timeout: Duration,
    ) -> TtResult<SolverStatus> {
        let session = self.session(handle)?;
        let life = lock(&session.lifecycle);
        let (life, _) = session
            .changed
            .wait_timeout_while(life, timeout, |l| !l.status.is_terminal())
            .unwrap_or_else(PoisonError::into_inner);
        Ok(life.status)
    }

    pub fn summary(&self, handle: SessionHandle) -> TtResult<SessionSummary> {
        let session = self.session(handle)?;
        let life = lock(&session.lifecycle);
        Ok(SessionSummary {
            status: Some(life.status),
            stats: life.stats.clone(),
            fault: life.fault.clone(),
        })
    }

    /// Drops sessions that have been terminal for longer than the configured TTL.
    /// Returns how many were removed.
    pub fn evict_expired(&self) -> usize {
        let ttl = self.config.session_ttl();
        let now = Instant::now();
        let mut sessions = write_lock(&self.sessions);
        let before = sessions.len();
        sessions.retain(|handle, session| {
            let life = lock(&session.lifecycle);
            let expired = life.status.is_terminal()
                && life
                    .finished_at
                    .is_some_and(|at| now.duration_since(at) >= ttl);
            if expired {
                debug!("Evicting {}", handle);
            }
            !expired
        });
        before - sessions.len()
    }

    pub fn session_count(&self) -> usize {
        read_lock(&self.sessions).len()
    }

    /// Stops every live session, waits for the workers and refuses further
    /// submissions.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let sessions: Vec<(SessionHandle, Arc<Session>)> = read_lock(&self.sessions)
            .iter()
            .map(|(h, s)| (*h, s.clone()))
            .collect();
        for (_, session) in &sessions {
            session.stop.store(true, Ordering::Release);
        }
        for (handle, session) in sessions {
            // From inside one of its callbacks the worker is waiting on us; it
            // exits once the callback returns.
            if session.is_notifying() {
                continue;
            }
            join_worker(handle, &session);
        }
        info!("Solver manager shut down");
    }

    fn session(&self, handle: SessionHandle) -> TtResult<Arc<Session>> {
        read_lock(&self.sessions)
            .get(&handle)
            .cloned()
            .ok_or(TimetableError::SessionNotFound(handle))
    }

    fn with_session<T>(&self, handle: SessionHandle, f: impl FnOnce(&Session) -> T) -> Option<T> {
        read_lock(&self.sessions).get(&handle).map(|s| f(s))
    }
}

impl Drop for SolverManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn join_worker(handle: SessionHandle, session: &Session) {
    let worker = lock(&session.worker).take();
    if let Some(worker) = worker {
        if worker.join().is_err() {
            warn!("Worker of {} did not exit cleanly", handle);
        }
    }
}

fn run_session<F>(
    handle: SessionHandle,
    session: Arc<Session>,
    notices: Sender<Snapshot>,
    notifier: JoinHandle<()>,
    solve: F,
) where
    F: FnOnce(Timetable, &AtomicBool, &mut Publisher) -> SolveOutcome,
{
    let span = info_span!("session", id = handle.0);
    let _enter = span.enter();

    session.begin();
    let mut publisher = Publisher {
        session: session.clone(),
        notices,
    };
    let problem = session.problem.clone();
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        solve(problem, &session.stop, &mut publisher)
    }));

    // Closing the channel lets the notifier drain and exit.
    drop(publisher);
    if notifier.join().is_err() {
        warn!("Notifier of {} panicked", handle);
    }

    match result {
        Ok(outcome) => {
            // Without a score the last published snapshot stands.
            if let Some(score) = outcome.score {
                *lock(&session.best) = Snapshot {
                    score,
                    assignments: outcome.timetable.assignments(),
                };
            }
            session.finish(outcome.termination.into(), Some(outcome.stats), outcome.fault);
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!("Solver of {} panicked: {}", handle, message);
            session.finish(SolverStatus::Stopped, None, Some(message));
        }
    }
}

fn spawn_notifier(
    handle: SessionHandle,
    session: Arc<Session>,
    notices: Receiver<Snapshot>,
) -> TtResult<JoinHandle<()>> {
    let notifier_session = session.clone();
    let notifier = thread::Builder::new()
        .name(format!("notify-{}", handle.0))
        .spawn(move || {
            for snapshot in notices {
                // Callbacks run unlocked so they may register further callbacks.
                let mut callbacks = std::mem::take(&mut *lock(&session.callbacks));
                if callbacks.is_empty() {
                    continue;
                }
                let tt = session.materialize(&snapshot);
                for callback in callbacks.iter_mut() {
                    let delivered =
                        panic::catch_unwind(AssertUnwindSafe(|| callback(&tt, snapshot.score)));
                    if delivered.is_err() {
                        warn!("Improvement callback of {} panicked", handle);
                    }
                }
                let mut registered = lock(&session.callbacks);
                callbacks.append(&mut registered);
                *registered = callbacks;
            }
        })?;
    *lock(&notifier_session.notifier) = Some(notifier.thread().id());
    Ok(notifier)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
