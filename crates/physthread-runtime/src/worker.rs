//! Worker thread pool
//!
//! N persistent OS threads, one per slot. A single coordinating thread
//! dispatches a unit of work to a specific idle slot with `send_request`
//! and later collects whichever slot finishes first with
//! `wait_for_response` / `poll_for_completion`.
//!
//! The slot's status word is the ownership token for its fields: the
//! coordinator owns them while the slot is `Idle` or `Completed`, the
//! worker while it is `Dispatched`. Start and completion are auto-reset
//! events, one pair per slot; the completion events form an `EventGroup`
//! so the coordinator can wait on all of them at once.

use std::cell::Cell;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use physthread_core::{
    kdebug, kerror, kinfo, ktrace, kwarn, AtomicSlotStatus, BinarySignal, MultiWait,
    PlatformThread, PoolError, PoolResult, SlotStatus, SpinLock,
};

use crate::barrier::Barrier;
use crate::config::PoolConfig;
use crate::critical_section::CriticalSection;
use crate::signal::{Event, EventGroup, ResetMode};
use crate::CurrentPlatform;

/// Interval at which shutdown re-checks that a worker it waits on is alive
const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

/// What the coordinator hands to a worker
enum Command<I> {
    Run(I),
    /// Terminate the worker after acknowledging
    Exit,
}

/// Per-worker state shared between the coordinator and one worker thread.
pub struct WorkerSlot<I, O> {
    task_id: usize,
    command_id: AtomicU32,
    status: AtomicSlotStatus,
    input: SpinLock<Option<Command<I>>>,
    output: SpinLock<Option<O>>,
    start: Event,
    completed: Arc<Event>,
}

impl<I, O> WorkerSlot<I, O> {
    /// Stable index correlating a dispatch with its completion
    #[inline]
    pub fn task_id(&self) -> usize {
        self.task_id
    }

    #[inline]
    pub fn status(&self) -> SlotStatus {
        self.status.load()
    }

    /// Opcode of the most recent dispatch (advisory)
    #[inline]
    pub fn command_id(&self) -> u32 {
        self.command_id.load(Ordering::Relaxed)
    }

    pub fn start_signal_name(&self) -> &str {
        self.start.name()
    }

    pub fn completion_signal_name(&self) -> &str {
        self.completed.name()
    }
}

/// One finished unit of work, as reported to the coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response<O> {
    pub task_id: usize,
    /// Slot status observed before the slot was recycled to `Idle`
    pub status: SlotStatus,
    /// Opcode the unit was dispatched with
    pub command_id: u32,
    /// `None` if the unit of work panicked
    pub output: Option<O>,
}

/// Identity of the calling worker thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerIdentity {
    pub pool_id: u64,
    pub index: usize,
}

thread_local! {
    static CURRENT_WORKER: Cell<Option<WorkerIdentity>> = const { Cell::new(None) };
}

/// Pool and slot of the calling thread, `None` off-pool
#[inline]
pub fn current_worker() -> Option<WorkerIdentity> {
    CURRENT_WORKER.with(|c| c.get())
}

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

/// Unique names of all live pools in the process
fn live_names() -> &'static Mutex<HashSet<String>> {
    static LIVE: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();
    LIVE.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Reservation of a unique name, released on drop
struct NameLease(String);

impl NameLease {
    fn acquire(name: &str) -> PoolResult<Self> {
        let mut names = live_names().lock().unwrap_or_else(PoisonError::into_inner);
        if !names.insert(name.to_string()) {
            return Err(PoolError::NameInUse(name.to_string()));
        }
        Ok(NameLease(name.to_string()))
    }
}

impl Drop for NameLease {
    fn drop(&mut self) {
        live_names()
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.0);
    }
}

#[derive(Clone, Copy)]
struct ThreadTuning {
    pin: bool,
    elevate: bool,
}

/// Fixed-size pool of persistent workers.
///
/// `I` is the per-dispatch payload, `O` the unit's result. The unit of work
/// and the per-worker scratch allocator are fixed at construction.
pub struct WorkerThreadPool<I, O> {
    id: u64,
    name: String,
    slots: Vec<Arc<WorkerSlot<I, O>>>,
    completions: EventGroup,
    handles: Vec<Option<JoinHandle<()>>>,
    outstanding: AtomicUsize,
    _lease: NameLease,
}

impl<I, O> WorkerThreadPool<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Start `config.num_threads` workers.
    ///
    /// `work` runs once per dispatch on the worker that received it, with that
    /// worker's scratch value. `scratch_alloc` is called once per worker
    /// before its thread starts.
    ///
    /// # Panics
    ///
    /// If `config.num_threads` is zero.
    pub fn new<S, F, A>(config: &PoolConfig, work: F, mut scratch_alloc: A) -> PoolResult<Self>
    where
        S: Send + 'static,
        F: Fn(I, &mut S) -> O + Send + Sync + 'static,
        A: FnMut() -> S,
    {
        assert!(config.num_threads > 0, "WorkerThreadPool requires at least one thread");
        config.validate().map_err(PoolError::InvalidConfig)?;

        let lease = NameLease::acquire(&config.unique_name)?;
        let name = config.unique_name.clone();
        let n = config.num_threads;

        let completions =
            EventGroup::auto_reset((0..n).map(|i| format!("eventComplete{}{}", name, i)));
        let slots: Vec<_> = (0..n)
            .map(|i| {
                Arc::new(WorkerSlot {
                    task_id: i,
                    command_id: AtomicU32::new(0),
                    status: AtomicSlotStatus::new(SlotStatus::Idle),
                    input: SpinLock::new(None),
                    output: SpinLock::new(None),
                    start: Event::new(ResetMode::Auto, format!("eventStart{}{}", name, i)),
                    completed: Arc::clone(completions.get(i)),
                })
            })
            .collect();

        // Built before spawning so a failed spawn tears down the started
        // workers through Drop.
        let mut pool = Self {
            id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
            name,
            slots,
            completions,
            handles: Vec::with_capacity(n),
            outstanding: AtomicUsize::new(0),
            _lease: lease,
        };

        let work = Arc::new(work);
        let tuning = ThreadTuning {
            pin: config.pin_threads,
            elevate: config.elevate_priority,
        };

        for i in 0..n {
            let slot = Arc::clone(&pool.slots[i]);
            let work = Arc::clone(&work);
            let scratch = scratch_alloc();
            let pool_id = pool.id;

            let mut builder = thread::Builder::new().name(format!("{}-{}", pool.name, i));
            if config.stack_size != 0 {
                builder = builder.stack_size(config.stack_size);
            }
            let handle = builder.spawn(move || worker_main(slot, work, scratch, tuning, pool_id))?;
            pool.handles.push(Some(handle));
        }

        kinfo!("pool '{}' started with {} workers", pool.name, n);
        Ok(pool)
    }
}

impl<I, O> WorkerThreadPool<I, O> {
    /// Dispatch `input` to slot `task_id` and wake its worker.
    ///
    /// Non-blocking. `command_id` is stored with the dispatch and echoed in
    /// the response.
    ///
    /// # Panics
    ///
    /// If `task_id` is out of range or the slot is not `Idle`.
    pub fn send_request(&self, command_id: u32, input: I, task_id: usize) {
        assert!(
            task_id < self.slots.len(),
            "task_id {} out of range for pool '{}' of {}",
            task_id,
            self.name,
            self.slots.len()
        );
        let slot = &self.slots[task_id];
        if let Err(actual) = slot.status.transition(SlotStatus::Idle, SlotStatus::Dispatched) {
            panic!("dispatch to slot {} of pool '{}' while {}", task_id, self.name, actual);
        }
        slot.command_id.store(command_id, Ordering::Relaxed);
        slot.input.put(Command::Run(input));
        self.outstanding.fetch_add(1, Ordering::AcqRel);
        ktrace!("dispatched command {} to slot {}", command_id, task_id);
        slot.start.signal();
    }

    /// Block until some dispatched slot completes, recycle it and report it.
    ///
    /// When several slots are done the lowest index observed ready is
    /// returned.
    ///
    /// # Panics
    ///
    /// If nothing is outstanding.
    pub fn wait_for_response(&self) -> Response<O> {
        assert!(
            self.outstanding.load(Ordering::Acquire) > 0,
            "wait_for_response on pool '{}' with nothing outstanding",
            self.name
        );
        loop {
            if let Some(index) = self.completions.wait_any(None) {
                return self.collect(index);
            }
        }
    }

    /// Like `wait_for_response`, but gives up after `timeout`.
    ///
    /// Calling with nothing outstanding is allowed and simply times out.
    pub fn poll_for_completion(&self, timeout: Duration) -> Option<Response<O>> {
        self.completions
            .wait_any(Some(timeout))
            .map(|index| self.collect(index))
    }

    fn collect(&self, index: usize) -> Response<O> {
        let slot = &self.slots[index];
        let output = slot.output.take();
        if let Err(actual) = slot.status.transition(SlotStatus::Completed, SlotStatus::Idle) {
            panic!("slot {} of pool '{}' signaled completion while {}", index, self.name, actual);
        }
        self.outstanding.fetch_sub(1, Ordering::AcqRel);
        Response {
            task_id: slot.task_id,
            status: SlotStatus::Completed,
            command_id: slot.command_id.load(Ordering::Relaxed),
            output,
        }
    }

    /// Number of worker slots
    #[inline]
    pub fn num_tasks(&self) -> usize {
        self.slots.len()
    }

    /// Dispatches not yet collected
    #[inline]
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Process-unique pool id, as seen in `current_worker()`
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn slot(&self, task_id: usize) -> &WorkerSlot<I, O> {
        &self.slots[task_id]
    }

    /// A barrier sized to this pool's worker count
    pub fn create_barrier(&self) -> Barrier {
        Barrier::with_count(self.num_tasks())
    }

    pub fn create_critical_section(&self) -> CriticalSection {
        CriticalSection::new()
    }

    /// Stop every worker, in slot order.
    ///
    /// A slot with work in flight is allowed to finish first; its result is
    /// discarded. Idempotent.
    pub fn shutdown(&mut self) {
        if self.handles.iter().all(Option::is_none) {
            return;
        }
        for (i, slot) in self.slots.iter().enumerate() {
            let Some(handle) = self.handles.get_mut(i).and_then(Option::take) else {
                continue;
            };

            if slot.status.load().is_busy() {
                kdebug!("slot {} of '{}' busy at shutdown, waiting", i, self.name);
                if !wait_for_worker(slot, &handle) {
                    kerror!("worker {} of '{}' died with work in flight", i, self.name);
                    continue;
                }
                drop(slot.output.take());
                slot.status.store(SlotStatus::Idle);
                self.outstanding.fetch_sub(1, Ordering::AcqRel);
            }

            if slot.status.transition(SlotStatus::Idle, SlotStatus::Exiting).is_err() {
                kwarn!("slot {} of '{}' not idle at shutdown", i, self.name);
            }
            slot.input.put(Command::Exit);
            slot.start.signal();
            if !wait_for_worker(slot, &handle) {
                kerror!("worker {} of '{}' exited without acknowledging", i, self.name);
            }
            if handle.join().is_err() {
                kerror!("worker {} of '{}' panicked", i, self.name);
            }
        }
        kinfo!("pool '{}' stopped", self.name);
    }
}

impl<I, O> Drop for WorkerThreadPool<I, O> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Wait for the slot's completion signal; `false` if the thread is gone
/// without signaling.
fn wait_for_worker<I, O>(slot: &WorkerSlot<I, O>, handle: &JoinHandle<()>) -> bool {
    loop {
        if slot.completed.wait_timeout(SHUTDOWN_POLL) {
            return true;
        }
        if handle.is_finished() {
            return slot.completed.wait_timeout(Duration::ZERO);
        }
    }
}

fn apply_tuning(index: usize, tuning: ThreadTuning) {
    let platform = CurrentPlatform::new();
    if tuning.pin {
        // Worker i takes the i-th cpu the pool was started with, not cpu id i
        let cpus = platform.allowed_cpus();
        match cpus.get(index) {
            Some(&cpu) => {
                if let Err(e) = platform.pin_current_thread(cpu) {
                    kwarn!("could not pin to cpu {}: {}", cpu, e);
                }
            }
            None => kdebug!("not pinned, {} cpus allowed", cpus.len()),
        }
    }
    if tuning.elevate {
        if let Err(e) = platform.raise_current_thread_priority() {
            kdebug!("keeping inherited priority: {}", e);
        }
    }
}

fn worker_main<I, O, S, F>(
    slot: Arc<WorkerSlot<I, O>>,
    work: Arc<F>,
    mut scratch: S,
    tuning: ThreadTuning,
    pool_id: u64,
) where
    F: Fn(I, &mut S) -> O,
{
    let index = slot.task_id;
    CURRENT_WORKER.with(|c| c.set(Some(WorkerIdentity { pool_id, index })));
    apply_tuning(index, tuning);
    kdebug!("worker {} started", index);

    loop {
        slot.start.wait();
        match slot.input.take() {
            Some(Command::Run(input)) => {
                let result = panic::catch_unwind(AssertUnwindSafe(|| work(input, &mut scratch)));
                match result {
                    Ok(output) => {
                        slot.output.put(output);
                    }
                    Err(_) => kerror!("unit of work panicked on slot {}", index),
                }
                if let Err(actual) = slot.status.transition(SlotStatus::Dispatched, SlotStatus::Completed) {
                    kerror!("slot {} finished work while {}", index, actual);
                }
                slot.completed.signal();
            }
            Some(Command::Exit) => {
                slot.status.store(SlotStatus::Exiting);
                slot.completed.signal();
                break;
            }
            None => ktrace!("spurious start on slot {}", index),
        }
    }

    CURRENT_WORKER.with(|c| c.set(None));
    kdebug!("worker {} exiting", index);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn test_config(name: &str, n: usize) -> PoolConfig {
        PoolConfig::new()
            .num_threads(n)
            .unique_name(name)
            .pin_threads(false)
            .elevate_priority(false)
    }

    fn square_pool(name: &str, n: usize) -> WorkerThreadPool<u64, u64> {
        WorkerThreadPool::new(&test_config(name, n), |x: u64, _: &mut ()| x * x, || ()).unwrap()
    }

    #[test]
    fn test_construct_destroy_all_sizes() {
        for round in 0..3 {
            for n in 1..=16 {
                let mut pool = square_pool(&format!("churn-{}-{}", round, n), n);
                assert_eq!(pool.num_tasks(), n);
                pool.shutdown();
                pool.shutdown();
            }
        }
    }

    #[test]
    fn test_each_slot_writes_context() {
        let n = 4;
        let pool: WorkerThreadPool<Arc<AtomicUsize>, ()> = WorkerThreadPool::new(
            &test_config("write-ctx", n),
            |ctx: Arc<AtomicUsize>, _: &mut ()| ctx.store(0xBEEF, Ordering::Release),
            || (),
        )
        .unwrap();

        for i in 0..n {
            let ctx = Arc::new(AtomicUsize::new(0));
            pool.send_request(7, Arc::clone(&ctx), i);
            let r = pool.wait_for_response();
            assert_eq!(r.task_id, i);
            assert_eq!(r.status, SlotStatus::Completed);
            assert_eq!(r.command_id, 7);
            assert_eq!(ctx.load(Ordering::Acquire), 0xBEEF);
            assert_eq!(pool.slot(i).status(), SlotStatus::Idle);
        }
    }

    #[test]
    fn test_dispatch_all_then_drain() {
        let n = 8;
        let pool: WorkerThreadPool<(usize, Arc<Vec<AtomicUsize>>), ()> = WorkerThreadPool::new(
            &test_config("drain-all", n),
            |(i, cells): (usize, Arc<Vec<AtomicUsize>>), _: &mut ()| {
                cells[i].store(i + 100, Ordering::Release)
            },
            || (),
        )
        .unwrap();

        let cells: Arc<Vec<AtomicUsize>> = Arc::new((0..n).map(|_| AtomicUsize::new(0)).collect());
        for i in 0..n {
            pool.send_request(0, (i, Arc::clone(&cells)), i);
        }
        let mut seen = vec![false; n];
        for _ in 0..n {
            let r = pool.wait_for_response();
            assert!(!seen[r.task_id], "slot {} reported twice", r.task_id);
            seen[r.task_id] = true;
        }
        assert!(seen.iter().all(|&s| s));
        assert_eq!(pool.outstanding(), 0);
        for (i, c) in cells.iter().enumerate() {
            assert_eq!(c.load(Ordering::Acquire), i + 100);
        }
    }

    #[test]
    fn test_poll_without_dispatch_times_out() {
        let pool = square_pool("poll-idle", 2);
        let start = Instant::now();
        assert!(pool.poll_for_completion(Duration::from_millis(50)).is_none());
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(40));
        assert!(elapsed < Duration::from_secs(2));
    }

    #[test]
    fn test_poll_with_unbounded_timeout_collects() {
        let pool = square_pool("poll-max", 1);
        pool.send_request(0, 3, 0);
        let r = pool.poll_for_completion(Duration::MAX).unwrap();
        assert_eq!(r.task_id, 0);
        assert_eq!(r.output, Some(9));
        assert_eq!(pool.outstanding(), 0);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_pinned_workers_follow_allowed_cpu_ids() {
        let cpus = CurrentPlatform::new().allowed_cpus();
        let n = cpus.len().min(2);
        let config = test_config("pin-ids", n).pin_threads(true);
        let pool: WorkerThreadPool<(), Vec<usize>> =
            WorkerThreadPool::new(&config, |_, _: &mut ()| CurrentPlatform::new().allowed_cpus(), || ())
                .unwrap();

        for i in 0..n {
            pool.send_request(0, (), i);
            let r = pool.wait_for_response();
            assert_eq!(r.output, Some(vec![cpus[i]]), "worker {} pinned off its cpu", i);
        }
    }

    #[test]
    fn test_undispatched_slots_never_reported() {
        let pool = square_pool("skip-idle", 4);
        pool.send_request(0, 5, 2);
        let r = pool.poll_for_completion(Duration::from_secs(5)).unwrap();
        assert_eq!(r.task_id, 2);
        assert_eq!(r.output, Some(25));
        assert!(pool.poll_for_completion(Duration::from_millis(20)).is_none());
    }

    #[test]
    fn test_sum_of_squares() {
        let pool = square_pool("sum-squares", 4);
        for (i, x) in [1u64, 2, 3, 4].into_iter().enumerate() {
            pool.send_request(1, x, i);
        }
        let mut results: Vec<u64> = (0..4)
            .map(|_| pool.wait_for_response().output.unwrap())
            .collect();
        results.sort_unstable();
        assert_eq!(results, vec![1, 4, 9, 16]);
    }

    #[test]
    fn test_scratch_allocated_once_per_worker() {
        let allocs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&allocs);
        let pool: WorkerThreadPool<(), usize> = WorkerThreadPool::new(
            &test_config("scratch", 3),
            |_: (), scratch: &mut Vec<u8>| {
                scratch.push(1);
                scratch.len()
            },
            move || {
                counter.fetch_add(1, Ordering::Relaxed);
                Vec::with_capacity(16)
            },
        )
        .unwrap();
        assert_eq!(allocs.load(Ordering::Relaxed), 3);

        for round in 1..=3 {
            pool.send_request(0, (), 1);
            assert_eq!(pool.wait_for_response().output, Some(round));
        }
        assert_eq!(allocs.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_thread_names_and_identity() {
        let pool: WorkerThreadPool<(), (Option<String>, Option<WorkerIdentity>)> =
            WorkerThreadPool::new(
                &test_config("named", 2),
                |_: (), _: &mut ()| (thread::current().name().map(str::to_string), current_worker()),
                || (),
            )
            .unwrap();
        pool.send_request(0, (), 1);
        let (name, ident) = pool.wait_for_response().output.unwrap();
        assert_eq!(name.as_deref(), Some("named-1"));
        assert_eq!(ident, Some(WorkerIdentity { pool_id: pool.id(), index: 1 }));
        assert_eq!(pool.slot(1).start_signal_name(), "eventStartnamed1");
        assert_eq!(pool.slot(1).completion_signal_name(), "eventCompletenamed1");
        assert!(current_worker().is_none());
    }

    #[test]
    fn test_name_in_use() {
        let _pool = square_pool("dup-name", 1);
        let err = WorkerThreadPool::<u64, u64>::new(&test_config("dup-name", 1), |x, _: &mut ()| x, || ());
        assert!(matches!(err, Err(PoolError::NameInUse(ref n)) if n == "dup-name"));
    }

    #[test]
    fn test_name_released_on_drop() {
        drop(square_pool("reuse-name", 2));
        let _again = square_pool("reuse-name", 2);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = test_config("", 2);
        let err = WorkerThreadPool::<u64, u64>::new(&config, |x, _: &mut ()| x, || ());
        assert!(matches!(err, Err(PoolError::InvalidConfig(_))));
    }

    #[test]
    #[should_panic(expected = "at least one thread")]
    fn test_zero_threads_panics() {
        let _ = WorkerThreadPool::<u64, u64>::new(&test_config("zero", 0), |x, _: &mut ()| x, || ());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_task_id_out_of_range_panics() {
        let pool = square_pool("oob", 2);
        pool.send_request(0, 1, 2);
    }

    #[test]
    #[should_panic(expected = "while dispatched")]
    fn test_double_dispatch_panics() {
        let pool: WorkerThreadPool<(), ()> = WorkerThreadPool::new(
            &test_config("double", 1),
            |_: (), _: &mut ()| thread::sleep(Duration::from_millis(200)),
            || (),
        )
        .unwrap();
        pool.send_request(0, (), 0);
        pool.send_request(0, (), 0);
    }

    #[test]
    #[should_panic(expected = "nothing outstanding")]
    fn test_wait_with_nothing_outstanding_panics() {
        let pool = square_pool("nothing", 1);
        pool.wait_for_response();
    }

    #[test]
    fn test_panicking_unit_reports_no_output() {
        let pool: WorkerThreadPool<u32, u32> = WorkerThreadPool::new(
            &test_config("panicky", 1),
            |x: u32, _: &mut ()| {
                if x == 0 {
                    panic!("bad input");
                }
                x
            },
            || (),
        )
        .unwrap();
        pool.send_request(0, 0, 0);
        let r = pool.wait_for_response();
        assert_eq!(r.status, SlotStatus::Completed);
        assert_eq!(r.output, None);

        // the worker survives
        pool.send_request(0, 9, 0);
        assert_eq!(pool.wait_for_response().output, Some(9));
    }

    #[test]
    fn test_shutdown_waits_for_in_flight() {
        let done = Arc::new(AtomicUsize::new(0));
        let flag = Arc::clone(&done);
        let mut pool: WorkerThreadPool<(), ()> = WorkerThreadPool::new(
            &test_config("in-flight", 2),
            move |_: (), _: &mut ()| {
                thread::sleep(Duration::from_millis(50));
                flag.fetch_add(1, Ordering::Release);
            },
            || (),
        )
        .unwrap();
        pool.send_request(0, (), 0);
        pool.send_request(0, (), 1);
        pool.shutdown();
        assert_eq!(done.load(Ordering::Acquire), 2);
        assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    fn test_barrier_and_critical_section_factories() {
        let pool = square_pool("factories", 5);
        let barrier = pool.create_barrier();
        assert_eq!(barrier.max_count(), 5);
        let cs = pool.create_critical_section();
        cs.lock();
        cs.set_shared_param(0, 11);
        assert_eq!(cs.shared_param(0), 11);
        cs.unlock();
    }
}
