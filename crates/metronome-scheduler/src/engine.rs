//! Task registry and poll loop.
//!
//! One exclusive lock serializes registry mutation and the whole per-tick
//! pass: a task added mid-pass is either fully visible to that pass or
//! deferred to the next tick, never partially visible. Callbacks run
//! synchronously on the poll task *while the lock is held*, so a long
//! callback stalls every other task's evaluation for that tick, and a
//! callback must never call back into the registry: every operation takes
//! the same lock and would deadlock. [`Scheduler::stop`] is the one
//! exception: it only touches an atomic flag and is safe from anywhere,
//! including inside a callback.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDateTime;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use metronome_core::{Clock, Task};

use crate::config::{SchedulerConfig, DEFAULT_ACCURACY_MS, MAX_ACCURACY_MS, MIN_ACCURACY_MS};
use crate::error::{Result, SchedulerError};

/// Callback invoked on the poll task when its owner fires.
pub type Callback = Box<dyn Fn() + Send + 'static>;

struct TaskEntry {
    task: Task,
    callbacks: Vec<Callback>,
}

/// Cheaply cloneable handle to a shared task registry and its poll loop.
///
/// Any clone may mutate the registry or stop the loop; one clone runs
/// [`Scheduler::run`] (typically under `tokio::spawn`). Tasks are kept in
/// name order and evaluated in that order each tick.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

struct Inner {
    tasks: Mutex<BTreeMap<String, TaskEntry>>,
    running: AtomicBool,
    accuracy_ms: AtomicU16,
    clock: Clock,
}

impl Scheduler {
    /// Scheduler on a plain UTC clock with the default cadence.
    pub fn new() -> Self {
        Self::with_clock(Clock::utc())
    }

    /// Scheduler on an explicit clock; tasks added by rule text are armed
    /// against it.
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            inner: Arc::new(Inner {
                tasks: Mutex::new(BTreeMap::new()),
                running: AtomicBool::new(false),
                accuracy_ms: AtomicU16::new(DEFAULT_ACCURACY_MS),
                clock,
            }),
        }
    }

    /// Build from config: clock offset applied, cadence clamped.
    pub fn from_config(config: &SchedulerConfig) -> Self {
        let scheduler = Self::with_clock(Clock::with_offset(config.utc_offset_secs));
        scheduler.set_accuracy(config.accuracy_ms);
        scheduler
    }

    /// The clock this scheduler polls with, for arming [`Task`]s in the
    /// same shifted frame.
    pub fn clock(&self) -> Clock {
        self.inner.clock
    }

    // --- Registry operations -----------------------------------------------

    /// Decode `rule` against this scheduler's clock and register it under
    /// `name` with the given callbacks (zero callbacks is legal; the task
    /// fires silently).
    ///
    /// A failed add leaves the registry unchanged.
    pub fn add_task(&self, name: &str, rule: &str, callbacks: Vec<Callback>) -> Result<()> {
        if name.is_empty() {
            return Err(SchedulerError::EmptyName);
        }
        if rule.is_empty() {
            return Err(SchedulerError::EmptyRule);
        }
        let task = Task::parse(rule, self.inner.clock.now())?;
        self.insert_entry(name, task, callbacks)
    }

    /// Register a pre-armed task. The caller is responsible for arming it
    /// against [`Scheduler::clock`] readings.
    pub fn add_armed_task(&self, name: &str, task: Task, callbacks: Vec<Callback>) -> Result<()> {
        if name.is_empty() {
            return Err(SchedulerError::EmptyName);
        }
        self.insert_entry(name, task, callbacks)
    }

    /// Append one callback to an existing task.
    pub fn add_callback(&self, name: &str, callback: Callback) -> Result<()> {
        if name.is_empty() {
            return Err(SchedulerError::EmptyName);
        }
        let mut tasks = self.lock();
        let entry = tasks
            .get_mut(name)
            .ok_or_else(|| SchedulerError::TaskNotFound { name: name.into() })?;
        entry.callbacks.push(callback);
        Ok(())
    }

    /// Append callbacks to an existing task, keeping registration order.
    /// An empty vector is rejected.
    pub fn add_callbacks(&self, name: &str, callbacks: Vec<Callback>) -> Result<()> {
        if name.is_empty() {
            return Err(SchedulerError::EmptyName);
        }
        if callbacks.is_empty() {
            return Err(SchedulerError::NoCallbacks);
        }
        let mut tasks = self.lock();
        let entry = tasks
            .get_mut(name)
            .ok_or_else(|| SchedulerError::TaskNotFound { name: name.into() })?;
        entry.callbacks.extend(callbacks);
        Ok(())
    }

    /// Drop every callback of a task; silently a no-op when the task is
    /// missing. The task itself stays registered and keeps firing.
    pub fn clear_callbacks(&self, name: &str) {
        let mut tasks = self.lock();
        if let Some(entry) = tasks.get_mut(name) {
            entry.callbacks.clear();
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        if name.is_empty() {
            return false;
        }
        self.lock().contains_key(name)
    }

    pub fn count_tasks(&self) -> usize {
        self.lock().len()
    }

    /// Remove every task. Rejected while the poll loop runs; the loop
    /// iterates the registry each tick and must not have it emptied under
    /// it wholesale.
    pub fn clear_tasks(&self) -> Result<()> {
        if self.is_running() {
            return Err(SchedulerError::Running);
        }
        let mut tasks = self.lock();
        let removed = tasks.len();
        tasks.clear();
        info!(removed, "all tasks cleared");
        Ok(())
    }

    // --- Poll cadence ------------------------------------------------------

    /// Current poll cadence in milliseconds.
    pub fn accuracy(&self) -> u16 {
        self.inner.accuracy_ms.load(Ordering::Relaxed)
    }

    /// Set the poll cadence, clamped to [10, 500] ms. Safe to call while
    /// the loop runs; the next tick sleeps the new amount.
    pub fn set_accuracy(&self, ms: u16) {
        self.inner
            .accuracy_ms
            .store(ms.clamp(MIN_ACCURACY_MS, MAX_ACCURACY_MS), Ordering::Relaxed);
    }

    // --- Poll loop ---------------------------------------------------------

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    /// Ask the poll loop to exit. Advisory: observed after the current
    /// sleep and between callback invocations, never preempting a callback
    /// in flight.
    pub fn stop(&self) {
        self.inner.running.store(false, Ordering::Release);
        debug!("stop requested");
    }

    /// The poll loop: sleep for the configured cadence, then evaluate and
    /// fire every due task, until [`Scheduler::stop`].
    ///
    /// Returns immediately when the registry is empty or when another
    /// clone's loop is already running. Spawn-friendly:
    /// `tokio::spawn(async move { scheduler.run().await })`.
    pub async fn run(&self) {
        if self.count_tasks() == 0 {
            warn!("no tasks registered; poll loop not started");
            return;
        }
        if self
            .inner
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("poll loop already running");
            return;
        }

        info!(accuracy_ms = self.accuracy(), "poll loop started");
        loop {
            sleep(Duration::from_millis(u64::from(self.accuracy()))).await;
            // A stop during the sleep exits before taking the lock.
            if !self.is_running() {
                break;
            }
            let now = self.inner.clock.now();
            if !self.poll_tick(now) {
                break;
            }
            if !self.is_running() {
                break;
            }
        }
        info!("poll loop stopped");
    }

    /// One evaluate-and-fire pass over every task at an explicit instant.
    ///
    /// Driven by [`Scheduler::run`] each tick; hosts and tests may also
    /// call it directly on a stopped scheduler for deterministic stepping.
    /// For every due task the callbacks run in registration order; a
    /// single-shot task is removed once all its callbacks complete. When a
    /// stop request arrives mid-pass the remaining callbacks and tasks are
    /// skipped (including the single-shot removal of the interrupted task)
    /// and the pass reports `false`.
    pub fn poll_tick(&self, now: NaiveDateTime) -> bool {
        // Only a pass that started under a running loop can observe a stop;
        // a direct call on a stopped scheduler always completes.
        let was_running = self.is_running();
        let mut tasks = self.lock();

        let names: Vec<String> = tasks.keys().cloned().collect();
        for name in names {
            let Some(entry) = tasks.get_mut(&name) else {
                continue;
            };
            if !entry.task.is_due(now, false) {
                continue;
            }
            debug!(task = %name, kind = %entry.task.kind(), "task fired");

            for callback in &entry.callbacks {
                callback();
                if was_running && !self.is_running() {
                    debug!(task = %name, "stop observed mid-fire; pass aborted");
                    return false;
                }
            }

            if entry.task.is_single() {
                info!(task = %name, "single-shot task retired");
                tasks.remove(&name);
            }
        }
        true
    }

    // --- Internals ---------------------------------------------------------

    fn insert_entry(&self, name: &str, task: Task, callbacks: Vec<Callback>) -> Result<()> {
        let mut tasks = self.lock();
        if tasks.contains_key(name) {
            return Err(SchedulerError::DuplicateTask { name: name.into() });
        }
        info!(
            task = %name,
            kind = %task.kind(),
            single = task.is_single(),
            callbacks = callbacks.len(),
            "task added"
        );
        tasks.insert(name.to_string(), TaskEntry { task, callbacks });
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, TaskEntry>> {
        self.inner.tasks.lock().unwrap()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::sync::atomic::AtomicUsize;

    fn at(year: i32, month: u32, day: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn counter() -> (Arc<AtomicUsize>, Callback) {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        (
            hits,
            Box::new(move || {
                h.fetch_add(1, Ordering::Relaxed);
            }),
        )
    }

    // --- Registry operations ---

    #[test]
    fn add_task_registers_under_its_name() {
        let scheduler = Scheduler::new();
        let (_, cb) = counter();
        scheduler.add_task("daily", "P 00/00 15:00:00", vec![cb]).unwrap();

        assert!(scheduler.contains("daily"));
        assert!(!scheduler.contains("weekly"));
        assert!(!scheduler.contains(""));
        assert_eq!(scheduler.count_tasks(), 1);
    }

    #[test]
    fn duplicate_names_are_rejected_without_mutation() {
        let scheduler = Scheduler::new();
        scheduler.add_task("daily", "P 00/00 15:00:00", vec![]).unwrap();

        let err = scheduler
            .add_task("daily", "I 00001 00:00:00", vec![])
            .unwrap_err();
        assert!(matches!(err, SchedulerError::DuplicateTask { .. }));
        assert_eq!(scheduler.count_tasks(), 1);
    }

    #[test]
    fn empty_name_and_rule_are_rejected() {
        let scheduler = Scheduler::new();
        assert!(matches!(
            scheduler.add_task("", "P 00/00 15:00:00", vec![]),
            Err(SchedulerError::EmptyName)
        ));
        assert!(matches!(
            scheduler.add_task("daily", "", vec![]),
            Err(SchedulerError::EmptyRule)
        ));
        assert_eq!(scheduler.count_tasks(), 0);
    }

    #[test]
    fn invalid_rule_text_adds_nothing() {
        let scheduler = Scheduler::new();
        assert!(matches!(
            scheduler.add_task("bad", "P 32/13 99:99:99", vec![]),
            Err(SchedulerError::Rule(_))
        ));
        assert!(matches!(
            scheduler.add_task("bad", "P 31/04 10:00:00", vec![]),
            Err(SchedulerError::Rule(_))
        ));
        assert!(!scheduler.contains("bad"));
        assert_eq!(scheduler.count_tasks(), 0);
    }

    #[test]
    fn callbacks_require_an_existing_task() {
        let scheduler = Scheduler::new();
        let (_, cb) = counter();
        assert!(matches!(
            scheduler.add_callback("ghost", cb),
            Err(SchedulerError::TaskNotFound { .. })
        ));

        scheduler.add_task("real", "I 00001 00:00:00", vec![]).unwrap();
        let (_, cb) = counter();
        scheduler.add_callback("real", cb).unwrap();

        assert!(matches!(
            scheduler.add_callbacks("real", vec![]),
            Err(SchedulerError::NoCallbacks)
        ));
        let (_, cb1) = counter();
        let (_, cb2) = counter();
        scheduler.add_callbacks("real", vec![cb1, cb2]).unwrap();

        // Clearing a missing task is a silent no-op.
        scheduler.clear_callbacks("ghost");
        scheduler.clear_callbacks("real");
        assert!(scheduler.contains("real"));
    }

    #[test]
    fn clear_tasks_is_guarded_by_the_running_flag() {
        let scheduler = Scheduler::new();
        scheduler.add_task("daily", "P 00/00 15:00:00", vec![]).unwrap();

        scheduler.inner.running.store(true, Ordering::Release);
        assert!(matches!(scheduler.clear_tasks(), Err(SchedulerError::Running)));
        assert_eq!(scheduler.count_tasks(), 1);

        scheduler.inner.running.store(false, Ordering::Release);
        scheduler.clear_tasks().unwrap();
        assert_eq!(scheduler.count_tasks(), 0);
    }

    #[test]
    fn accuracy_clamps_at_both_bounds() {
        let scheduler = Scheduler::new();
        assert_eq!(scheduler.accuracy(), DEFAULT_ACCURACY_MS);

        scheduler.set_accuracy(5);
        assert_eq!(scheduler.accuracy(), MIN_ACCURACY_MS);
        scheduler.set_accuracy(1000);
        assert_eq!(scheduler.accuracy(), MAX_ACCURACY_MS);
        scheduler.set_accuracy(250);
        assert_eq!(scheduler.accuracy(), 250);

        let config = SchedulerConfig {
            accuracy_ms: 2,
            utc_offset_secs: 0,
        };
        assert_eq!(Scheduler::from_config(&config).accuracy(), MIN_ACCURACY_MS);
    }

    // --- poll_tick ---

    #[test]
    fn repeating_task_fires_once_and_stays() {
        let scheduler = Scheduler::new();
        let armed_at = at(2026, 8, 25, 14, 0, 0);
        let task = Task::parse("P 00/00 15:00:00", armed_at).unwrap();
        let (hits, cb) = counter();
        scheduler.add_armed_task("daily", task, vec![cb]).unwrap();

        // Before the deadline: quiet.
        assert!(scheduler.poll_tick(at(2026, 8, 25, 14, 30, 0)));
        assert_eq!(hits.load(Ordering::Relaxed), 0);

        // Just past it: exactly one fire, task stays registered.
        assert!(scheduler.poll_tick(at(2026, 8, 25, 15, 0, 1)));
        assert_eq!(hits.load(Ordering::Relaxed), 1);
        assert!(scheduler.contains("daily"));

        // Re-armed for tomorrow: no double fire on the next tick.
        assert!(scheduler.poll_tick(at(2026, 8, 25, 15, 0, 2)));
        assert_eq!(hits.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn single_shot_task_is_removed_after_firing() {
        let scheduler = Scheduler::new();
        let armed_at = at(2026, 8, 25, 14, 0, 0);
        let task = Task::parse("SI 00000 00:00:05", armed_at).unwrap();
        let (hits, cb) = counter();
        scheduler.add_armed_task("once", task, vec![cb]).unwrap();

        assert!(scheduler.poll_tick(at(2026, 8, 25, 14, 0, 6)));
        assert_eq!(hits.load(Ordering::Relaxed), 1);
        assert!(!scheduler.contains("once"));
        assert_eq!(scheduler.count_tasks(), 0);
    }

    #[test]
    fn zero_callback_task_fires_silently() {
        let scheduler = Scheduler::new();
        let armed_at = at(2026, 8, 25, 14, 0, 0);
        let task = Task::parse("SI 00000 00:00:05", armed_at).unwrap();
        scheduler.add_armed_task("quiet", task, vec![]).unwrap();

        assert!(scheduler.poll_tick(at(2026, 8, 25, 14, 0, 6)));
        assert!(!scheduler.contains("quiet"));
    }

    #[test]
    fn callbacks_fire_in_registration_order() {
        let scheduler = Scheduler::new();
        let armed_at = at(2026, 8, 25, 14, 0, 0);
        let task = Task::parse("I 00000 00:00:05", armed_at).unwrap();

        let order: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
        let callbacks: Vec<Callback> = (1u8..=3)
            .map(|i| {
                let order = Arc::clone(&order);
                Box::new(move || order.lock().unwrap().push(i)) as Callback
            })
            .collect();
        scheduler.add_armed_task("ordered", task, vec![]).unwrap();
        scheduler.add_callbacks("ordered", callbacks).unwrap();

        assert!(scheduler.poll_tick(at(2026, 8, 25, 14, 0, 6)));
        assert_eq!(*order.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn stop_between_callbacks_aborts_the_pass() {
        let scheduler = Scheduler::new();
        let armed_at = at(2026, 8, 25, 14, 0, 0);
        let task = Task::parse("SI 00000 00:00:05", armed_at).unwrap();

        let stopper = scheduler.clone();
        let (first_hits, count) = counter();
        let first: Callback = Box::new(move || {
            count();
            stopper.stop();
        });
        let (second_hits, second) = counter();
        scheduler
            .add_armed_task("cleanup", task, vec![first, second])
            .unwrap();

        // Pretend the loop is driving this pass so the stop is observable.
        scheduler.inner.running.store(true, Ordering::Release);
        assert!(!scheduler.poll_tick(at(2026, 8, 25, 14, 0, 6)));

        assert_eq!(first_hits.load(Ordering::Relaxed), 1);
        assert_eq!(second_hits.load(Ordering::Relaxed), 0);
        // The abort skipped the single-shot removal.
        assert!(scheduler.contains("cleanup"));
        assert!(!scheduler.is_running());
    }

    // --- Poll loop lifecycle ---

    #[tokio::test]
    async fn run_returns_immediately_with_no_tasks() {
        let scheduler = Scheduler::new();
        scheduler.run().await;
        assert!(!scheduler.is_running());
    }

    #[tokio::test]
    async fn run_sets_and_clears_the_running_flag() {
        let scheduler = Scheduler::new();
        scheduler.add_task("slow", "I 00001 00:00:00", vec![]).unwrap();

        let loop_handle = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move { scheduler.run().await })
        };
        sleep(Duration::from_millis(50)).await;
        assert!(scheduler.is_running());

        // A second run is rejected while the first owns the flag.
        scheduler.run().await;
        assert!(scheduler.is_running());

        scheduler.stop();
        loop_handle.await.unwrap();
        assert!(!scheduler.is_running());
    }

    #[tokio::test]
    async fn loop_fires_a_real_interval_task() {
        let scheduler = Scheduler::new();
        let (hits, cb) = counter();
        scheduler
            .add_task("second", "SI 00000 00:00:01", vec![cb])
            .unwrap();

        let loop_handle = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move { scheduler.run().await })
        };
        // One-second interval at a 10 ms cadence: well fired by 1.6 s, and
        // single-shot, so exactly once.
        sleep(Duration::from_millis(1600)).await;
        assert_eq!(hits.load(Ordering::Relaxed), 1);
        assert!(!scheduler.contains("second"));

        scheduler.stop();
        loop_handle.await.unwrap();
    }
}
