/// Eased display of pane transforms
///
/// The engine's transform is the target. While the user drags, the
/// displayed transform follows it exactly; otherwise it eases toward the
/// target over [`TRANSITION`].

use std::time::{Duration, Instant};

use crate::state::transform::PaneTransform;

pub const TRANSITION: Duration = Duration::from_millis(150);

fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}

/// Cubic ease-out
fn ease_out(progress: f32) -> f32 {
    1.0 - (1.0 - progress).powi(3)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimatedTransform {
    from: PaneTransform,
    to: PaneTransform,
    current: PaneTransform,
    started: Option<Instant>,
}

impl Default for AnimatedTransform {
    fn default() -> Self {
        Self::new(PaneTransform::IDENTITY)
    }
}

impl AnimatedTransform {
    pub fn new(transform: PaneTransform) -> Self {
        Self {
            from: transform,
            to: transform,
            current: transform,
            started: None,
        }
    }

    /// Jump straight to `target`
    pub fn snap(&mut self, target: PaneTransform) {
        *self = Self::new(target);
    }

    /// Start easing from the displayed value toward `target`
    pub fn retarget(&mut self, target: PaneTransform, now: Instant) {
        if target == self.to {
            return;
        }
        self.from = self.current;
        self.to = target;
        self.started = Some(now);
    }

    /// Follow the engine: instant while dragging, eased otherwise
    pub fn follow(&mut self, target: PaneTransform, dragging: bool, now: Instant) {
        if dragging {
            self.snap(target);
        } else {
            self.retarget(target, now);
        }
    }

    /// Advance to `now`; returns whether the animation is still running
    pub fn tick(&mut self, now: Instant) -> bool {
        let Some(started) = self.started else {
            return false;
        };
        let progress = now.saturating_duration_since(started).as_secs_f32() / TRANSITION.as_secs_f32();
        if progress >= 1.0 {
            self.snap(self.to);
            return false;
        }

        let t = ease_out(progress);
        self.current = PaneTransform {
            scale: lerp(self.from.scale, self.to.scale, t),
            translate_x: lerp(self.from.translate_x, self.to.translate_x, t),
            translate_y: lerp(self.from.translate_y, self.to.translate_y, t),
        };
        true
    }

    pub fn current(&self) -> PaneTransform {
        self.current
    }

    pub fn is_animating(&self) -> bool {
        self.started.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zoomed(scale: f32) -> PaneTransform {
        PaneTransform {
            scale,
            ..PaneTransform::IDENTITY
        }
    }

    #[test]
    fn test_idle_changes_ease() {
        let start = Instant::now();
        let mut animated = AnimatedTransform::default();
        animated.follow(zoomed(2.0), false, start);
        assert!(animated.is_animating());
        assert_eq!(animated.current().scale, 1.0);

        assert!(animated.tick(start + TRANSITION / 2));
        let midway = animated.current().scale;
        assert!(midway > 1.5 && midway < 2.0, "ease-out passes the midpoint early: {midway}");

        assert!(!animated.tick(start + TRANSITION));
        assert_eq!(animated.current(), zoomed(2.0));
        assert!(!animated.is_animating());
    }

    #[test]
    fn test_dragging_follows_instantly() {
        let start = Instant::now();
        let mut animated = AnimatedTransform::default();
        animated.follow(zoomed(3.0), false, start);
        animated.tick(start + Duration::from_millis(10));

        let moved = PaneTransform {
            translate_x: 40.0,
            ..zoomed(3.0)
        };
        animated.follow(moved, true, start + Duration::from_millis(20));
        assert_eq!(animated.current(), moved);
        assert!(!animated.is_animating());
    }

    #[test]
    fn test_same_target_does_not_restart() {
        let start = Instant::now();
        let mut animated = AnimatedTransform::default();
        animated.follow(zoomed(2.0), false, start);
        animated.follow(zoomed(2.0), false, start + TRANSITION / 2);
        assert!(!animated.tick(start + TRANSITION));
    }
}
