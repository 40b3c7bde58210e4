//! Deterministic host event loop.
//!
//! Time is virtual: it only moves when the embedder calls
//! [`EventLoop::set_now`]. Each call to [`EventLoop::next_ready`] yields the
//! next runnable task in this order:
//!
//! 1. microtasks (FIFO, promise reactions included)
//! 2. the remainder of the current animation-frame batch
//! 3. due timers, ordered by `(due, seq)`
//! 4. a new animation-frame batch, if a frame is due
//! 5. idle callbacks
//!
//! Cancelling a timer, frame or idle callback only removes the scheduled
//! entry; it never touches the callback's lifetime beyond dropping the
//! loop's own hold.

use std::collections::VecDeque;

use tracing::trace;

use crate::object::{IdleDeadline, ObjectKind, ObjectRef};
use crate::value::HostValue;

/// Spacing of animation frames (ms).
pub const FRAME_INTERVAL_MS: f64 = 16.0;
/// `timeRemaining()` reported to idle callbacks (ms).
pub const IDLE_BUDGET_MS: f64 = 50.0;

/// Where a task came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskSource {
    Microtask,
    Timer(u32),
    AnimationFrame(u32),
    IdleCallback(u32),
    PromiseReaction,
}

/// A runnable unit of work: call `callback` with `args`.
pub struct Task {
    pub source: TaskSource,
    pub callback: HostValue,
    pub args: Vec<HostValue>,
    /// Derived promise settled with the callback's outcome.
    pub settles: Option<ObjectRef>,
}

impl Task {
    pub fn microtask(callback: HostValue) -> Self {
        Self {
            source: TaskSource::Microtask,
            callback,
            args: Vec::new(),
            settles: None,
        }
    }
}

struct Timer {
    id: u32,
    due: f64,
    seq: u64,
    interval: Option<f64>,
    callback: HostValue,
}

struct Scheduled {
    id: u32,
    callback: HostValue,
}

pub struct EventLoop {
    now: f64,
    next_id: u32,
    next_seq: u64,
    microtasks: VecDeque<Task>,
    timers: Vec<Timer>,
    frame_requests: Vec<Scheduled>,
    frame_batch: VecDeque<Scheduled>,
    next_frame_at: f64,
    idle_callbacks: VecDeque<Scheduled>,
    idle_enabled: bool,
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLoop {
    pub fn new() -> Self {
        Self {
            now: 0.0,
            next_id: 1,
            next_seq: 0,
            microtasks: VecDeque::new(),
            timers: Vec::new(),
            frame_requests: Vec::new(),
            frame_batch: VecDeque::new(),
            next_frame_at: 0.0,
            idle_callbacks: VecDeque::new(),
            idle_enabled: true,
        }
    }

    /// Disable idle-callback delivery (requests are still accepted).
    pub fn set_idle_enabled(&mut self, enabled: bool) {
        self.idle_enabled = enabled;
    }

    /// Current virtual time (ms).
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Move the clock forward. The clock never goes backwards.
    pub fn set_now(&mut self, now: f64) {
        if now > self.now {
            self.now = now;
        }
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);
        id
    }

    fn allocate_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    // ── Scheduling ──

    pub fn queue_microtask(&mut self, callback: HostValue) {
        self.microtasks.push_back(Task::microtask(callback));
    }

    /// Queue an arbitrary task on the microtask queue.
    pub fn queue_task(&mut self, task: Task) {
        self.microtasks.push_back(task);
    }

    /// `setTimeout`: negative and NaN delays count as 0.
    pub fn set_timeout(&mut self, callback: HostValue, delay_ms: f64) -> u32 {
        self.add_timer(callback, delay_ms, None)
    }

    /// `setInterval`: re-armed every `max(interval, 1)` ms until cleared.
    pub fn set_interval(&mut self, callback: HostValue, interval_ms: f64) -> u32 {
        let interval = clamp_delay(interval_ms).max(1.0);
        self.add_timer(callback, interval, Some(interval))
    }

    fn add_timer(&mut self, callback: HostValue, delay_ms: f64, interval: Option<f64>) -> u32 {
        let id = self.allocate_id();
        let seq = self.allocate_seq();
        let due = self.now + clamp_delay(delay_ms);
        trace!(id, due, "timer scheduled");
        self.timers.push(Timer {
            id,
            due,
            seq,
            interval,
            callback,
        });
        id
    }

    /// `clearTimeout` / `clearInterval`. Unknown ids are ignored.
    pub fn clear_timer(&mut self, id: u32) {
        self.timers.retain(|t| t.id != id);
    }

    pub fn request_animation_frame(&mut self, callback: HostValue) -> u32 {
        let id = self.allocate_id();
        self.frame_requests.push(Scheduled { id, callback });
        id
    }

    pub fn cancel_animation_frame(&mut self, id: u32) {
        self.frame_requests.retain(|s| s.id != id);
        self.frame_batch.retain(|s| s.id != id);
    }

    pub fn request_idle_callback(&mut self, callback: HostValue) -> u32 {
        let id = self.allocate_id();
        self.idle_callbacks.push_back(Scheduled { id, callback });
        id
    }

    pub fn cancel_idle_callback(&mut self, id: u32) {
        self.idle_callbacks.retain(|s| s.id != id);
    }

    // ── Draining ──

    /// Pop the next task runnable at the current time.
    pub fn next_ready(&mut self) -> Option<Task> {
        if let Some(task) = self.microtasks.pop_front() {
            return Some(task);
        }
        if let Some(frame) = self.frame_batch.pop_front() {
            return Some(self.frame_task(frame));
        }
        if let Some(task) = self.next_due_timer() {
            return Some(task);
        }
        if !self.frame_requests.is_empty() && self.now >= self.next_frame_at {
            trace!(count = self.frame_requests.len(), now = self.now, "animation frame");
            self.frame_batch.extend(self.frame_requests.drain(..));
            self.next_frame_at = self.now + FRAME_INTERVAL_MS;
            if let Some(frame) = self.frame_batch.pop_front() {
                return Some(self.frame_task(frame));
            }
        }
        if self.idle_enabled {
            if let Some(idle) = self.idle_callbacks.pop_front() {
                let deadline = ObjectRef::new(ObjectKind::IdleDeadline(IdleDeadline {
                    did_timeout: false,
                    time_remaining: IDLE_BUDGET_MS,
                }));
                return Some(Task {
                    source: TaskSource::IdleCallback(idle.id),
                    callback: idle.callback,
                    args: vec![HostValue::from(deadline)],
                    settles: None,
                });
            }
        }
        None
    }

    fn frame_task(&self, frame: Scheduled) -> Task {
        Task {
            source: TaskSource::AnimationFrame(frame.id),
            callback: frame.callback,
            args: vec![HostValue::Number(self.now)],
            settles: None,
        }
    }

    fn next_due_timer(&mut self) -> Option<Task> {
        let index = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= self.now)
            .min_by(|(_, a), (_, b)| a.due.total_cmp(&b.due).then(a.seq.cmp(&b.seq)))
            .map(|(i, _)| i)?;

        let timer = &self.timers[index];
        let task = Task {
            source: TaskSource::Timer(timer.id),
            callback: timer.callback.clone(),
            args: Vec::new(),
            settles: None,
        };
        match timer.interval {
            Some(interval) => {
                let seq = self.allocate_seq();
                let timer = &mut self.timers[index];
                timer.due = self.now + interval;
                timer.seq = seq;
            }
            None => {
                self.timers.swap_remove(index);
            }
        }
        Some(task)
    }

    /// Earliest future time at which a timer or frame becomes runnable.
    pub fn next_deadline(&self) -> Option<f64> {
        let timers = self.timers.iter().map(|t| t.due);
        let frame = (!self.frame_requests.is_empty()).then_some(self.next_frame_at);
        timers.chain(frame).min_by(f64::total_cmp)
    }

    /// True if anything is queued or scheduled.
    pub fn has_pending(&self) -> bool {
        !self.microtasks.is_empty()
            || !self.timers.is_empty()
            || !self.frame_requests.is_empty()
            || !self.frame_batch.is_empty()
            || (self.idle_enabled && !self.idle_callbacks.is_empty())
    }

    /// Number of live timers (one-shot and interval).
    pub fn timer_count(&self) -> usize {
        self.timers.len()
    }
}

fn clamp_delay(ms: f64) -> f64 {
    if ms.is_nan() || ms < 0.0 {
        0.0
    } else {
        ms
    }
}
