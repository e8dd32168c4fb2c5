//! Deferred and repeating callbacks driven by frame delta.
//!
//! Timers accumulate `delta * 1000` milliseconds on every [`TimerManager::update`]
//! and fire once the accumulated time reaches their delay. One-shot timers are
//! dropped after firing; interval timers subtract their delay from the elapsed
//! time, so overshoot carries over into the next period.
//!
//! All methods take `&self`. Callbacks are invoked after the internal borrow is
//! released, so a callback may freely schedule or clear timers, including
//! itself.
//!
//! # Catch-up
//!
//! When one frame covers several interval periods (a long hitch), the
//! [`IntervalCatchUp`] policy decides how many times the callback runs:
//! [`IntervalCatchUp::Single`] fires once and keeps the residual time,
//! [`IntervalCatchUp::All`] fires once per elapsed period, up to
//! [`MAX_CATCH_UP_FIRES`]; periods past the cap are dropped.

use crate::error::ScriptError;
use log::warn;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

/// Timer identifier. Ids start at 1 and are never reused within a manager.
pub type TimerId = u32;

/// Callback run when a timer fires.
pub type TimerCallback = Rc<dyn Fn() -> Result<(), ScriptError>>;

/// Most times one interval fires in a single update under [`IntervalCatchUp::All`].
pub const MAX_CATCH_UP_FIRES: u32 = 16;

/// How many times an interval fires when a frame spans several periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntervalCatchUp {
    #[default]
    Single,
    All,
}

impl IntervalCatchUp {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Some(IntervalCatchUp::Single),
            "all" => Some(IntervalCatchUp::All),
            _ => None,
        }
    }
}

struct Timer {
    callback: TimerCallback,
    delay: f32,
    elapsed: f32,
    is_interval: bool,
}

#[derive(Default)]
struct TimerState {
    timers: BTreeMap<TimerId, Timer>,
    next_id: TimerId,
}

/// Scheduler for timeouts, intervals and [`WaitHandle`]s.
#[derive(Default)]
pub struct TimerManager {
    state: RefCell<TimerState>,
    catch_up: IntervalCatchUp,
}

impl TimerManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catch_up(catch_up: IntervalCatchUp) -> Self {
        Self {
            state: RefCell::default(),
            catch_up,
        }
    }

    fn insert(&self, callback: TimerCallback, delay_ms: f32, is_interval: bool) -> TimerId {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let id = state.next_id;
        state.timers.insert(
            id,
            Timer {
                callback,
                delay: delay_ms.max(0.0),
                elapsed: 0.0,
                is_interval,
            },
        );
        id
    }

    /// Run `callback` once after `delay_ms` milliseconds.
    pub fn set_timeout(&self, callback: TimerCallback, delay_ms: f32) -> TimerId {
        self.insert(callback, delay_ms, false)
    }

    /// Run `callback` every `interval_ms` milliseconds until cleared.
    pub fn set_interval(&self, callback: TimerCallback, interval_ms: f32) -> TimerId {
        self.insert(callback, interval_ms, true)
    }

    /// Cancel a timer. Unknown ids are ignored.
    pub fn clear_timeout(&self, id: TimerId) {
        self.state.borrow_mut().timers.remove(&id);
    }

    /// Same as [`clear_timeout`](Self::clear_timeout).
    pub fn clear_interval(&self, id: TimerId) {
        self.clear_timeout(id);
    }

    /// Returns a handle that resolves when a one-shot timer of `ms` fires.
    pub fn wait(&self, ms: f32) -> WaitHandle {
        let handle = WaitHandle::new();
        let resolver = handle.clone();
        self.set_timeout(
            Rc::new(move || {
                resolver.resolve();
                Ok(())
            }),
            ms,
        );
        handle
    }

    /// Advance every active timer by `delta` seconds and fire the due ones.
    pub fn update(&self, delta: f32) {
        let delta_ms = delta * 1000.0;
        let ids: Vec<TimerId> = self.state.borrow().timers.keys().copied().collect();

        for id in ids {
            let (callback, fires) = {
                let mut state = self.state.borrow_mut();
                // Cleared by an earlier callback in this same update
                let Some(timer) = state.timers.get_mut(&id) else {
                    continue;
                };
                timer.elapsed += delta_ms;
                if timer.elapsed < timer.delay {
                    continue;
                }
                let callback = timer.callback.clone();
                let fires = if timer.is_interval {
                    let fires = match self.catch_up {
                        IntervalCatchUp::All if timer.delay > 0.0 => {
                            ((timer.elapsed / timer.delay).floor() as u32).min(MAX_CATCH_UP_FIRES)
                        }
                        _ => 1,
                    };
                    timer.elapsed -= timer.delay * fires as f32;
                    if fires == MAX_CATCH_UP_FIRES && timer.elapsed >= timer.delay {
                        timer.elapsed %= timer.delay;
                    }
                    fires
                } else {
                    state.timers.remove(&id);
                    1
                };
                (callback, fires)
            };

            for _ in 0..fires {
                if let Err(err) = callback() {
                    warn!("Timer callback error (id {}): {}", id, err);
                }
                if fires > 1 && !self.state.borrow().timers.contains_key(&id) {
                    break;
                }
            }
        }
    }

    /// Number of timers still scheduled.
    pub fn active_timer_count(&self) -> usize {
        self.state.borrow().timers.len()
    }

    /// Accumulated milliseconds of a scheduled timer.
    pub fn elapsed_of(&self, id: TimerId) -> Option<f32> {
        self.state.borrow().timers.get(&id).map(|t| t.elapsed)
    }

    /// Drop every scheduled timer.
    pub fn dispose(&self) {
        self.state.borrow_mut().timers.clear();
    }
}

type Continuation = Box<dyn FnOnce() -> Result<(), ScriptError>>;

#[derive(Default)]
struct WaitState {
    resolved: Cell<bool>,
    continuations: RefCell<Vec<Continuation>>,
    waker: RefCell<Option<Waker>>,
}

/// Completion handle returned by [`TimerManager::wait`].
///
/// Continuations registered with [`on_resolved`](Self::on_resolved) run on the
/// frame whose timer tick crosses the delay. The handle is also a `Future`
/// for hosts that drive their own local executor.
#[derive(Clone, Default)]
pub struct WaitHandle {
    inner: Rc<WaitState>,
}

impl WaitHandle {
    fn new() -> Self {
        Self::default()
    }

    pub fn is_resolved(&self) -> bool {
        self.inner.resolved.get()
    }

    /// Run `f` once the wait completes (immediately if it already has).
    pub fn on_resolved(&self, f: impl FnOnce() -> Result<(), ScriptError> + 'static) {
        if self.is_resolved() {
            if let Err(err) = f() {
                warn!("Wait continuation error: {}", err);
            }
        } else {
            self.inner.continuations.borrow_mut().push(Box::new(f));
        }
    }

    fn resolve(&self) {
        self.inner.resolved.set(true);
        let pending = std::mem::take(&mut *self.inner.continuations.borrow_mut());
        for f in pending {
            if let Err(err) = f() {
                warn!("Wait continuation error: {}", err);
            }
        }
        if let Some(waker) = self.inner.waker.borrow_mut().take() {
            waker.wake();
        }
    }
}

impl Future for WaitHandle {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.is_resolved() {
            Poll::Ready(())
        } else {
            *self.inner.waker.borrow_mut() = Some(cx.waker().clone());
            Poll::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-3;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    fn counter() -> (Rc<Cell<u32>>, TimerCallback) {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        (
            count,
            Rc::new(move || {
                c.set(c.get() + 1);
                Ok(())
            }),
        )
    }

    #[test]
    fn test_ids_start_at_one() {
        let timers = TimerManager::new();
        let (_, cb) = counter();
        assert_eq!(timers.set_timeout(cb.clone(), 10.0), 1);
        assert_eq!(timers.set_interval(cb, 10.0), 2);
    }

    #[test]
    fn test_timeout_fires_exactly_once() {
        let timers = TimerManager::new();
        let (count, cb) = counter();
        let id = timers.set_timeout(cb, 1000.0);
        for _ in 0..3 {
            timers.update(0.3);
        }
        assert_eq!(count.get(), 0);
        timers.update(0.3);
        assert_eq!(count.get(), 1);
        assert!(timers.elapsed_of(id).is_none());
        timers.update(0.3);
        assert_eq!(count.get(), 1);
        assert_eq!(timers.active_timer_count(), 0);
    }

    #[test]
    fn test_interval_single_catch_up_keeps_residual() {
        let timers = TimerManager::new();
        let (count, cb) = counter();
        let id = timers.set_interval(cb, 500.0);
        timers.update(1.2);
        assert_eq!(count.get(), 1);
        assert!(approx_eq(timers.elapsed_of(id).unwrap(), 700.0));
        timers.update(0.0);
        assert_eq!(count.get(), 2);
        assert!(approx_eq(timers.elapsed_of(id).unwrap(), 200.0));
    }

    #[test]
    fn test_interval_all_catch_up() {
        let timers = TimerManager::with_catch_up(IntervalCatchUp::All);
        let (count, cb) = counter();
        let id = timers.set_interval(cb, 500.0);
        timers.update(1.2);
        assert_eq!(count.get(), 2);
        assert!(approx_eq(timers.elapsed_of(id).unwrap(), 200.0));
    }

    #[test]
    fn test_interval_all_catch_up_is_capped() {
        let timers = TimerManager::with_catch_up(IntervalCatchUp::All);
        let (count, cb) = counter();
        let id = timers.set_interval(cb, 1.0);
        timers.update(10.0);
        assert_eq!(count.get(), MAX_CATCH_UP_FIRES);
        assert!(timers.elapsed_of(id).unwrap() < 1.0);
        timers.update(0.001);
        assert_eq!(count.get(), MAX_CATCH_UP_FIRES + 1);
    }

    #[test]
    fn test_clear_interval_stops_firing() {
        let timers = TimerManager::new();
        let (count, cb) = counter();
        let id = timers.set_interval(cb, 100.0);
        timers.update(0.1);
        timers.clear_interval(id);
        timers.update(0.1);
        assert_eq!(count.get(), 1);
        timers.clear_timeout(999);
    }

    #[test]
    fn test_callback_can_clear_later_timer() {
        let timers = Rc::new(TimerManager::new());
        let (count, cb) = counter();
        let t = timers.clone();
        timers.set_timeout(
            Rc::new(move || {
                t.clear_timeout(2);
                Ok(())
            }),
            0.0,
        );
        timers.set_timeout(cb, 0.0);
        timers.update(0.016);
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn test_callback_error_does_not_stop_other_timers() {
        let timers = TimerManager::new();
        let (count, cb) = counter();
        timers.set_timeout(Rc::new(|| Err(ScriptError::callback("boom"))), 0.0);
        timers.set_timeout(cb, 0.0);
        timers.update(0.016);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_timer_scheduled_inside_callback_waits_for_next_update() {
        let timers = Rc::new(TimerManager::new());
        let (count, cb) = counter();
        let t = timers.clone();
        timers.set_timeout(
            Rc::new(move || {
                t.set_timeout(cb.clone(), 0.0);
                Ok(())
            }),
            0.0,
        );
        timers.update(0.016);
        assert_eq!(count.get(), 0);
        timers.update(0.016);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_wait_resolves_and_runs_continuation() {
        let timers = TimerManager::new();
        let handle = timers.wait(250.0);
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        handle.on_resolved(move || {
            h.set(h.get() + 1);
            Ok(())
        });
        timers.update(0.2);
        assert!(!handle.is_resolved());
        timers.update(0.1);
        assert!(handle.is_resolved());
        assert_eq!(hits.get(), 1);

        let h = hits.clone();
        handle.on_resolved(move || {
            h.set(h.get() + 1);
            Ok(())
        });
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn test_dispose_clears_everything() {
        let timers = TimerManager::new();
        let (_, cb) = counter();
        timers.set_timeout(cb.clone(), 10.0);
        timers.set_interval(cb, 10.0);
        assert_eq!(timers.active_timer_count(), 2);
        timers.dispose();
        assert_eq!(timers.active_timer_count(), 0);
    }

    #[test]
    fn test_parse_catch_up() {
        assert_eq!(IntervalCatchUp::parse("single"), Some(IntervalCatchUp::Single));
        assert_eq!(IntervalCatchUp::parse(" ALL "), Some(IntervalCatchUp::All));
        assert_eq!(IntervalCatchUp::parse("some"), None);
    }
}
