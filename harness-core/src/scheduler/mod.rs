//! Cooperative, single-threaded task queue with relative-time delays.
//!
//! Work items are appended in arrival order and executed from [`EventQueue::run_once`]
//! once their delay has elapsed. Ready items run oldest-first and removal never
//! reorders the remainder, so tasks maturing in the same iteration execute in the
//! order they were posted. Radio adapters marshal every completion into this queue,
//! which keeps the coordinator free of locks and re-entrancy.

use core::{fmt, ops::Add, time::Duration};

use heapless::Vec;

use crate::telemetry::TelemetryInstant;

/// Number of pending tasks an [`EventQueue`] holds unless configured otherwise.
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// Monotonic time source consulted by the queue.
pub trait Clock {
    /// Instant type produced by the clock.
    type Instant: Copy + Ord + Add<Duration, Output = Self::Instant> + TelemetryInstant;

    /// Returns the current instant.
    fn now(&self) -> Self::Instant;
}

impl<C> Clock for &C
where
    C: Clock + ?Sized,
{
    type Instant = C::Instant;

    fn now(&self) -> Self::Instant {
        (**self).now()
    }
}

/// Millisecond instant measured from an arbitrary epoch (usually boot).
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Millis(u64);

impl Millis {
    /// Instant at the clock epoch.
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn from_millis(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }
}

impl Add<Duration> for Millis {
    type Output = Millis;

    fn add(self, rhs: Duration) -> Self::Output {
        let millis = u64::try_from(rhs.as_millis()).unwrap_or(u64::MAX);
        Millis(self.0.saturating_add(millis))
    }
}

impl TelemetryInstant for Millis {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

impl fmt::Display for Millis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "+{}ms", self.0)
    }
}

/// Deferred unit of work owned by the queue until it executes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ScheduledTask<T, TInstant> {
    task: T,
    delay: Duration,
    posted_at: TInstant,
}

impl<T, TInstant> ScheduledTask<T, TInstant>
where
    TInstant: Copy + Ord + Add<Duration, Output = TInstant>,
{
    #[must_use]
    pub const fn new(task: T, delay: Duration, posted_at: TInstant) -> Self {
        Self {
            task,
            delay,
            posted_at,
        }
    }

    /// Payload carried by the task.
    pub const fn task(&self) -> &T {
        &self.task
    }

    /// Minimum delay requested when the task was posted.
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Instant at which the task was posted.
    pub const fn posted_at(&self) -> TInstant {
        self.posted_at
    }

    /// Earliest instant at which the task may execute.
    pub fn ready_at(&self) -> TInstant {
        self.posted_at + self.delay
    }

    /// Returns `true` once the requested delay has elapsed at `now`.
    pub fn is_ready(&self, now: TInstant) -> bool {
        now >= self.ready_at()
    }

    fn into_task(self) -> T {
        self.task
    }
}

/// Returned when the queue has no room for another task; hands the task back.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct QueueFull<T>(pub T);

impl<T> QueueFull<T> {
    /// Recovers the task that could not be queued.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Display for QueueFull<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("scheduler queue is full")
    }
}

/// Bounded FIFO of deferred tasks driven by a single cooperative loop.
pub struct EventQueue<T, C, const CAPACITY: usize = DEFAULT_QUEUE_CAPACITY>
where
    C: Clock,
{
    clock: C,
    pending: Vec<ScheduledTask<T, C::Instant>, CAPACITY>,
}

impl<T, C, const CAPACITY: usize> EventQueue<T, C, CAPACITY>
where
    C: Clock,
{
    /// Creates an empty queue reading time from `clock`.
    #[must_use]
    pub const fn new(clock: C) -> Self {
        Self {
            clock,
            pending: Vec::new(),
        }
    }

    /// Clock backing the queue.
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    /// Current instant according to the queue's clock.
    pub fn now(&self) -> C::Instant {
        self.clock.now()
    }

    /// Number of tasks waiting to execute.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` when no tasks are pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Pending tasks in insertion order.
    pub fn pending(&self) -> &[ScheduledTask<T, C::Instant>] {
        &self.pending
    }

    /// Queues `task` to run on a later iteration, never synchronously.
    ///
    /// # Errors
    ///
    /// Returns [`QueueFull`] carrying the task when the queue is at capacity.
    pub fn post(&mut self, task: T) -> Result<(), QueueFull<T>> {
        self.post_after(Duration::ZERO, task)
    }

    /// Queues `task` to run no earlier than `delay` after now.
    ///
    /// # Errors
    ///
    /// Returns [`QueueFull`] carrying the task when the queue is at capacity.
    pub fn post_after(&mut self, delay: Duration, task: T) -> Result<(), QueueFull<T>> {
        let scheduled = ScheduledTask::new(task, delay, self.clock.now());
        self.pending
            .push(scheduled)
            .map_err(|rejected| QueueFull(rejected.into_task()))
    }

    /// Earliest instant at which a pending task becomes ready.
    pub fn next_ready_at(&self) -> Option<C::Instant> {
        self.pending.iter().map(ScheduledTask::ready_at).min()
    }

    /// Runs one scheduler iteration and returns how many tasks executed.
    ///
    /// The clock is sampled once. Only tasks pending when the iteration began are
    /// considered; anything `dispatch` posts is left for a later iteration.
    pub fn run_once<F>(&mut self, mut dispatch: F) -> usize
    where
        F: FnMut(&mut Self, T),
    {
        let now = self.clock.now();
        let mut remaining = self.pending.len();
        let mut index = 0;
        let mut executed = 0;

        while remaining > 0 {
            remaining -= 1;
            if self.pending[index].is_ready(now) {
                let scheduled = self.pending.remove(index);
                dispatch(self, scheduled.into_task());
                executed += 1;
            } else {
                index += 1;
            }
        }

        executed
    }

    /// Drives the queue forever; acts as the program's main loop.
    pub fn run_forever<F>(&mut self, mut dispatch: F) -> !
    where
        F: FnMut(&mut Self, T),
    {
        loop {
            self.run_once(&mut dispatch);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    #[derive(Default)]
    struct StepClock(Cell<u64>);

    impl StepClock {
        fn advance(&self, millis: u64) {
            self.0.set(self.0.get() + millis);
        }
    }

    impl Clock for StepClock {
        type Instant = Millis;

        fn now(&self) -> Millis {
            Millis::from_millis(self.0.get())
        }
    }

    fn drain<const N: usize>(queue: &mut EventQueue<u8, &StepClock, N>) -> Vec<u8, N> {
        let mut order = Vec::new();
        queue.run_once(|_, task| order.push(task).expect("order buffer"));
        order
    }

    #[test]
    fn posted_task_never_runs_before_next_iteration() {
        let clock = StepClock::default();
        let mut queue: EventQueue<u8, &StepClock, 4> = EventQueue::new(&clock);

        queue.post(1).expect("post");
        assert_eq!(queue.len(), 1);
        assert_eq!(drain(&mut queue).as_slice(), &[1]);
        assert!(queue.is_empty());
    }

    #[test]
    fn delayed_task_waits_for_its_delay() {
        let clock = StepClock::default();
        let mut queue: EventQueue<u8, &StepClock, 4> = EventQueue::new(&clock);

        queue
            .post_after(Duration::from_millis(100), 7)
            .expect("post");
        clock.advance(99);
        assert_eq!(queue.run_once(|_, _| {}), 0);
        assert_eq!(queue.next_ready_at(), Some(Millis::from_millis(100)));

        clock.advance(1);
        assert_eq!(drain(&mut queue).as_slice(), &[7]);
    }

    #[test]
    fn simultaneously_ready_tasks_run_in_post_order() {
        let clock = StepClock::default();
        let mut queue: EventQueue<u8, &StepClock, 8> = EventQueue::new(&clock);

        queue.post_after(Duration::from_millis(50), 1).expect("post");
        queue.post_after(Duration::from_millis(10), 2).expect("post");
        queue.post_after(Duration::from_millis(50), 3).expect("post");
        queue.post_after(Duration::from_millis(500), 4).expect("post");

        clock.advance(60);
        assert_eq!(drain(&mut queue).as_slice(), &[1, 2, 3]);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pending()[0].task(), &4);
    }

    #[test]
    fn tasks_posted_during_dispatch_wait_for_the_next_iteration() {
        let clock = StepClock::default();
        let mut queue: EventQueue<u8, &StepClock, 4> = EventQueue::new(&clock);
        queue.post(1).expect("post");

        let mut seen: Vec<u8, 4> = Vec::new();
        let executed = queue.run_once(|queue, task| {
            seen.push(task).expect("seen");
            queue.post(task + 1).expect("repost");
        });
        assert_eq!(executed, 1);
        assert_eq!(seen.as_slice(), &[1]);
        assert_eq!(queue.pending()[0].task(), &2);

        assert_eq!(drain(&mut queue).as_slice(), &[2]);
    }

    #[test]
    fn full_queue_returns_the_task() {
        let clock = StepClock::default();
        let mut queue: EventQueue<u8, &StepClock, 2> = EventQueue::new(&clock);
        queue.post(1).expect("post");
        queue.post(2).expect("post");

        match queue.post(3) {
            Err(QueueFull(task)) => assert_eq!(task, 3),
            other => panic!("unexpected post result: {other:?}"),
        }
    }

    #[test]
    fn millis_addition_saturates() {
        let late = Millis::from_millis(u64::MAX - 1) + Duration::from_secs(1);
        assert_eq!(late.as_millis(), u64::MAX);
        assert_eq!(
            Millis::from_millis(300).saturating_duration_since(Millis::from_millis(500)),
            Duration::ZERO
        );
    }
}
