//! Property tweens on scene objects.
//!
//! [`AnimationManager`] drives a set of running animations, each of which
//! blends one property of an [`AnimationTarget`] from its value at start time
//! toward a goal over a duration in milliseconds.
//!
//! # Lifecycle
//!
//! 1. [`animate`](AnimationManager::animate) or
//!    [`animate_sequence`](AnimationManager::animate_sequence) validates the
//!    property path and goal value, snapshots the current value and returns
//!    the animation id(s)
//! 2. every [`update`](AnimationManager::update) adds `delta * 1000` ms to the
//!    animation clock; while the clock is inside the start delay nothing is
//!    written
//! 3. past the delay, `progress = (clock - delay) / duration` is clamped to
//!    [0, 1], eased and used to interpolate; at progress 1 the goal value is
//!    written exactly
//! 4. `on_update` receives each written value and `on_complete` runs once on
//!    the final frame; both run after all animations have been stepped, and
//!    the callbacks of an animation stopped by an earlier callback in the
//!    same `update` are skipped
//! 5. finished animations are pruned at the end of the same `update`
//!
//! The start value is the one read at creation, also for delayed animations.
//! [`AnimationOptions::with_capture_at_start`] makes a delayed animation read
//! it again when its delay ends, so a chained step continues from where the
//! previous step left the property.

use crate::components::property::{PropertyPath, PropertyValue};
use crate::error::{PropertyError, ScriptError};
use crate::systems::tween::{Easing, ease};
use log::warn;
use std::cell::RefCell;
use std::rc::Rc;

/// Animation identifier (`anim-N` or `seq-N-i`).
pub type AnimationId = String;

/// Called with the value written on each animated frame.
pub type UpdateCallback = Rc<dyn Fn(PropertyValue) -> Result<(), ScriptError>>;
/// Called once when an animation reaches its goal.
pub type CompleteCallback = Rc<dyn Fn() -> Result<(), ScriptError>>;

/// Something whose properties can be read and written by path.
pub trait AnimationTarget {
    fn read_property(&self, path: &PropertyPath) -> Result<PropertyValue, PropertyError>;
    fn write_property(&self, path: &PropertyPath, value: PropertyValue) -> Result<(), PropertyError>;
}

/// Parameters for a single animation.
#[derive(Clone)]
pub struct AnimationOptions {
    pub property: String,
    pub to: PropertyValue,
    /// Duration in milliseconds.
    pub duration: f32,
    pub easing: Easing,
    pub on_update: Option<UpdateCallback>,
    pub on_complete: Option<CompleteCallback>,
    /// Re-read the start value when the start delay ends.
    pub capture_at_start: bool,
}

impl AnimationOptions {
    pub fn new(property: impl Into<String>, to: PropertyValue, duration: f32) -> Self {
        Self {
            property: property.into(),
            to,
            duration,
            easing: Easing::Linear,
            on_update: None,
            on_complete: None,
            capture_at_start: false,
        }
    }
    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }
    pub fn with_on_update(mut self, cb: UpdateCallback) -> Self {
        self.on_update = Some(cb);
        self
    }
    pub fn with_on_complete(mut self, cb: CompleteCallback) -> Self {
        self.on_complete = Some(cb);
        self
    }
    pub fn with_capture_at_start(mut self, capture: bool) -> Self {
        self.capture_at_start = capture;
        self
    }
}

/// One step of [`AnimationManager::animate_sequence`].
#[derive(Clone)]
pub struct SequenceStep {
    pub options: AnimationOptions,
    /// Extra pause before this step, in milliseconds.
    pub delay: f32,
}

struct Animation {
    id: AnimationId,
    target: Rc<dyn AnimationTarget>,
    path: PropertyPath,
    initial: PropertyValue,
    goal: PropertyValue,
    duration: f32,
    start_delay: f32,
    elapsed: f32,
    easing: Easing,
    capture_at_start: bool,
    started: bool,
    complete: bool,
    on_update: Option<UpdateCallback>,
    on_complete: Option<CompleteCallback>,
}

#[derive(Default)]
struct AnimationState {
    animations: Vec<Animation>,
    next_id: u32,
}

/// Runs property animations in creation order.
#[derive(Default)]
pub struct AnimationManager {
    state: RefCell<AnimationState>,
}

fn prepare(
    target: &Rc<dyn AnimationTarget>,
    options: &AnimationOptions,
) -> Result<(PropertyPath, PropertyValue, PropertyValue), PropertyError> {
    let path: PropertyPath = options.property.parse()?;
    let goal = path.coerce(options.to)?;
    let initial = target.read_property(&path)?;
    Ok((path, initial, goal))
}

impl AnimationManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn build(
        id: AnimationId,
        target: Rc<dyn AnimationTarget>,
        options: AnimationOptions,
        prepared: (PropertyPath, PropertyValue, PropertyValue),
        start_delay: f32,
    ) -> Animation {
        let (path, initial, goal) = prepared;
        Animation {
            id,
            target,
            path,
            initial,
            goal,
            duration: options.duration.max(0.0),
            start_delay: start_delay.max(0.0),
            elapsed: 0.0,
            easing: options.easing,
            capture_at_start: options.capture_at_start,
            started: false,
            complete: false,
            on_update: options.on_update,
            on_complete: options.on_complete,
        }
    }

    /// Start animating one property of `target`.
    pub fn animate(
        &self,
        target: Rc<dyn AnimationTarget>,
        options: AnimationOptions,
    ) -> Result<AnimationId, PropertyError> {
        let prepared = prepare(&target, &options)?;
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let id = format!("anim-{}", state.next_id);
        let anim = Self::build(id.clone(), target, options, prepared, 0.0);
        state.animations.push(anim);
        Ok(id)
    }

    /// Chain several animations on one target.
    ///
    /// Step `i` starts after the delays and durations of all earlier steps
    /// plus its own delay: steps of 500 ms and 300 ms with delays 0 and
    /// 200 ms start at 0 and 700 ms. Either every step is scheduled or, when one step
    /// fails validation, none is.
    pub fn animate_sequence(
        &self,
        target: Rc<dyn AnimationTarget>,
        steps: Vec<SequenceStep>,
    ) -> Result<Vec<AnimationId>, PropertyError> {
        let prepared = steps
            .iter()
            .map(|step| prepare(&target, &step.options))
            .collect::<Result<Vec<_>, _>>()?;

        let mut state = self.state.borrow_mut();
        let mut ids = Vec::with_capacity(steps.len());
        let mut total_delay = 0.0;
        for (index, (step, prep)) in steps.into_iter().zip(prepared).enumerate() {
            total_delay += step.delay.max(0.0);
            state.next_id += 1;
            let id = format!("seq-{}-{}", state.next_id, index);
            let duration = step.options.duration.max(0.0);
            let anim = Self::build(id.clone(), target.clone(), step.options, prep, total_delay);
            state.animations.push(anim);
            ids.push(id);
            total_delay += duration;
        }
        Ok(ids)
    }

    /// Remove an animation without running its completion callback.
    pub fn stop_animation(&self, id: &str) {
        self.state.borrow_mut().animations.retain(|a| a.id != id);
    }

    pub fn stop_all_animations(&self) {
        self.state.borrow_mut().animations.clear();
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.state.borrow().animations.iter().any(|a| a.id == id)
    }

    pub fn active_count(&self) -> usize {
        self.state.borrow().animations.len()
    }

    /// Step every animation by `delta` seconds.
    pub fn update(&self, delta: f32) {
        let delta_ms = delta.max(0.0) * 1000.0;
        let mut pending: Vec<(AnimationId, PropertyValue, Option<UpdateCallback>, Option<CompleteCallback>)> =
            Vec::new();

        {
            let mut state = self.state.borrow_mut();
            for anim in state.animations.iter_mut() {
                if anim.complete {
                    continue;
                }
                anim.elapsed += delta_ms;
                if anim.elapsed < anim.start_delay {
                    continue;
                }
                if !anim.started {
                    anim.started = true;
                    if anim.capture_at_start && anim.start_delay > 0.0 {
                        match anim.target.read_property(&anim.path) {
                            Ok(v) => anim.initial = v,
                            Err(err) => {
                                warn!("Animation {} dropped: {}", anim.id, err);
                                anim.complete = true;
                                continue;
                            }
                        }
                    }
                }

                let progress = if anim.duration <= 0.0 {
                    1.0
                } else {
                    ((anim.elapsed - anim.start_delay) / anim.duration).clamp(0.0, 1.0)
                };
                let value = if progress >= 1.0 {
                    anim.goal
                } else {
                    anim.initial.interpolate(&anim.goal, ease(anim.easing, progress))
                };

                if let Err(err) = anim.target.write_property(&anim.path, value) {
                    warn!("Animation {} dropped: {}", anim.id, err);
                    anim.complete = true;
                    continue;
                }

                let finished = progress >= 1.0;
                if finished {
                    anim.complete = true;
                }
                if anim.on_update.is_some() || finished {
                    pending.push((
                        anim.id.clone(),
                        value,
                        anim.on_update.clone(),
                        if finished { anim.on_complete.clone() } else { None },
                    ));
                }
            }
        }

        for (id, value, on_update, on_complete) in pending {
            if !self.is_active(&id) {
                continue;
            }
            if let Some(cb) = on_update {
                if let Err(err) = cb(value) {
                    warn!("Animation {} update callback error: {}", id, err);
                }
            }
            if let Some(cb) = on_complete {
                if !self.is_active(&id) {
                    continue;
                }
                if let Err(err) = cb() {
                    warn!("Animation {} complete callback error: {}", id, err);
                }
            }
        }

        self.state.borrow_mut().animations.retain(|a| !a.complete);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::material::Material;
    use crate::components::script::Visible;
    use crate::components::transform::Transform3;
    use glam::Vec3;
    use std::cell::Cell;

    const EPSILON: f32 = 1e-4;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[derive(Default)]
    struct Subject {
        parts: RefCell<(Transform3, Material, Visible)>,
    }

    impl AnimationTarget for Subject {
        fn read_property(&self, path: &PropertyPath) -> Result<PropertyValue, PropertyError> {
            let p = self.parts.borrow();
            Ok(path.read(&p.0, &p.1, &p.2))
        }
        fn write_property(&self, path: &PropertyPath, value: PropertyValue) -> Result<(), PropertyError> {
            let mut p = self.parts.borrow_mut();
            let (t, m, v) = &mut *p;
            path.write(value, t, m, v)
        }
    }

    fn subject() -> Rc<Subject> {
        Rc::new(Subject::default())
    }

    fn y(p: &Subject) -> f32 {
        p.parts.borrow().0.position.y
    }

    #[test]
    fn test_ids_follow_counter() {
        let anims = AnimationManager::new();
        let p = subject();
        let id = anims
            .animate(p.clone(), AnimationOptions::new("position.y", PropertyValue::Number(1.0), 100.0))
            .unwrap();
        assert_eq!(id, "anim-1");
        let step = SequenceStep {
            options: AnimationOptions::new("position.x", PropertyValue::Number(1.0), 100.0),
            delay: 0.0,
        };
        let ids = anims.animate_sequence(p, vec![step.clone(), step]).unwrap();
        assert_eq!(ids, vec!["seq-2-0".to_string(), "seq-3-1".to_string()]);
    }

    #[test]
    fn test_linear_progress_and_exact_final_value() {
        let anims = AnimationManager::new();
        let p = subject();
        anims
            .animate(p.clone(), AnimationOptions::new("position.y", PropertyValue::Number(10.0), 1000.0))
            .unwrap();
        anims.update(0.25);
        assert!(approx_eq(y(&p), 2.5));
        anims.update(10.0);
        assert_eq!(y(&p), 10.0);
        assert_eq!(anims.active_count(), 0);
    }

    #[test]
    fn test_invalid_path_is_rejected_up_front() {
        let anims = AnimationManager::new();
        let err = anims
            .animate(subject(), AnimationOptions::new("position.w", PropertyValue::Number(1.0), 10.0))
            .unwrap_err();
        assert_eq!(err, PropertyError::InvalidPath("position.w".into()));
        let err = anims
            .animate(subject(), AnimationOptions::new("position", PropertyValue::Number(1.0), 10.0))
            .unwrap_err();
        assert!(matches!(err, PropertyError::TypeMismatch { .. }));
        assert_eq!(anims.active_count(), 0);
    }

    #[test]
    fn test_start_delay_writes_nothing() {
        let anims = AnimationManager::new();
        let p = subject();
        let step = SequenceStep {
            options: AnimationOptions::new("position.y", PropertyValue::Number(4.0), 100.0),
            delay: 200.0,
        };
        anims.animate_sequence(p.clone(), vec![step]).unwrap();
        anims.update(0.1);
        assert_eq!(y(&p), 0.0);
        anims.update(0.15);
        assert!(approx_eq(y(&p), 2.0));
    }

    #[test]
    fn test_delayed_start_value_is_taken_at_creation() {
        let anims = AnimationManager::new();
        let p = subject();
        let step = SequenceStep {
            options: AnimationOptions::new("position.y", PropertyValue::Number(4.0), 100.0),
            delay: 200.0,
        };
        anims.animate_sequence(p.clone(), vec![step]).unwrap();
        p.parts.borrow_mut().0.position.y = 10.0;
        anims.update(0.25);
        assert!(approx_eq(y(&p), 2.0));
    }

    #[test]
    fn test_capture_at_start_reads_value_after_delay() {
        let anims = AnimationManager::new();
        let p = subject();
        let step = SequenceStep {
            options: AnimationOptions::new("position.y", PropertyValue::Number(4.0), 100.0)
                .with_capture_at_start(true),
            delay: 200.0,
        };
        anims.animate_sequence(p.clone(), vec![step]).unwrap();
        p.parts.borrow_mut().0.position.y = 10.0;
        anims.update(0.25);
        assert!(approx_eq(y(&p), 7.0));
    }

    #[test]
    fn test_sequence_offsets() {
        let anims = AnimationManager::new();
        let p = subject();
        let steps = vec![
            SequenceStep {
                options: AnimationOptions::new("position.y", PropertyValue::Number(5.0), 500.0),
                delay: 0.0,
            },
            SequenceStep {
                options: AnimationOptions::new("position.y", PropertyValue::Number(3.0), 300.0),
                delay: 200.0,
            },
        ];
        anims.animate_sequence(p.clone(), steps).unwrap();
        anims.update(0.5);
        assert_eq!(y(&p), 5.0);
        anims.update(0.15);
        assert_eq!(y(&p), 5.0);
        // second step starts at 700 ms, earlier delay + duration plus its own
        // delay (its own duration is not counted, so not 800 ms), and blends
        // from the value read at creation
        anims.update(0.1);
        assert!(approx_eq(y(&p), 0.5));
        anims.update(0.25);
        assert_eq!(y(&p), 3.0);
        assert_eq!(anims.active_count(), 0);
    }

    #[test]
    fn test_callback_stopping_other_animation_skips_its_callbacks() {
        let anims = Rc::new(AnimationManager::new());
        let p = subject();
        let second_calls = Rc::new(Cell::new(0));
        let second_id = Rc::new(RefCell::new(String::new()));
        let (a, sid) = (anims.clone(), second_id.clone());
        anims
            .animate(
                p.clone(),
                AnimationOptions::new("position.x", PropertyValue::Number(1.0), 100.0).with_on_update(
                    Rc::new(move |_: PropertyValue| {
                        a.stop_animation(&sid.borrow());
                        Ok(())
                    }),
                ),
            )
            .unwrap();
        let calls = second_calls.clone();
        let id = anims
            .animate(
                p,
                AnimationOptions::new("position.y", PropertyValue::Number(1.0), 100.0)
                    .with_on_update(Rc::new(move |_: PropertyValue| {
                        calls.set(calls.get() + 1);
                        Ok(())
                    })),
            )
            .unwrap();
        *second_id.borrow_mut() = id.clone();
        anims.update(0.05);
        assert_eq!(second_calls.get(), 0);
        assert!(!anims.is_active(&id));
    }

    #[test]
    fn test_callbacks_and_pruning() {
        let anims = AnimationManager::new();
        let p = subject();
        let updates = Rc::new(Cell::new(0));
        let completes = Rc::new(Cell::new(0));
        let (u, c) = (updates.clone(), completes.clone());
        anims
            .animate(
                p,
                AnimationOptions::new("scale", PropertyValue::Vector(Vec3::splat(2.0)), 100.0)
                    .with_easing(Easing::QuadOut)
                    .with_on_update(Rc::new(move |_: PropertyValue| {
                        u.set(u.get() + 1);
                        Ok(())
                    }))
                    .with_on_complete(Rc::new(move || {
                        c.set(c.get() + 1);
                        Ok(())
                    })),
            )
            .unwrap();
        anims.update(0.05);
        assert_eq!((updates.get(), completes.get()), (1, 0));
        anims.update(0.05);
        assert_eq!((updates.get(), completes.get()), (2, 1));
        anims.update(0.05);
        assert_eq!((updates.get(), completes.get()), (2, 1));
    }

    #[test]
    fn test_stop_skips_completion() {
        let anims = AnimationManager::new();
        let fired = Rc::new(Cell::new(false));
        let f = fired.clone();
        let id = anims
            .animate(
                subject(),
                AnimationOptions::new("material.opacity", PropertyValue::Number(0.0), 100.0)
                    .with_on_complete(Rc::new(move || {
                        f.set(true);
                        Ok(())
                    })),
            )
            .unwrap();
        assert!(anims.is_active(&id));
        anims.stop_animation(&id);
        anims.update(1.0);
        assert!(!fired.get());
    }

    #[test]
    fn test_callback_can_start_new_animation() {
        let anims = Rc::new(AnimationManager::new());
        let p = subject();
        let (a, target) = (anims.clone(), p.clone());
        anims
            .animate(
                p.clone(),
                AnimationOptions::new("position.x", PropertyValue::Number(1.0), 0.0).with_on_complete(
                    Rc::new(move || {
                        a.animate(
                            target.clone(),
                            AnimationOptions::new("position.x", PropertyValue::Number(0.0), 100.0),
                        )?;
                        Ok(())
                    }),
                ),
            )
            .unwrap();
        anims.update(0.016);
        assert_eq!(anims.active_count(), 1);
        assert_eq!(p.parts.borrow().0.position.x, 1.0);
    }

    #[test]
    fn test_zero_duration_completes_immediately() {
        let anims = AnimationManager::new();
        let p = subject();
        anims
            .animate(p.clone(), AnimationOptions::new("visible", PropertyValue::Flag(false), 0.0))
            .unwrap();
        anims.update(0.0);
        assert!(!p.parts.borrow().2.0);
        assert_eq!(anims.active_count(), 0);
    }
}
