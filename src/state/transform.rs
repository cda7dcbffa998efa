/// Pan/zoom state for the two comparison panes
///
/// Zoom is center-anchored on the image origin. Dragging is anchored by
/// offset: every move recomputes the translation from the pointer position
/// and the offset captured at press time, so dropped move events never
/// accumulate drift.

/// Smallest allowed scale
pub const MIN_SCALE: f32 = 0.5;
/// Largest allowed scale
pub const MAX_SCALE: f32 = 5.0;
/// Scale change per unit of wheel delta
pub const ZOOM_SENSITIVITY: f32 = 0.001;

/// One half of the two-up viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pane {
    Reference,
    Candidate,
}

impl Pane {
    pub const ALL: [Pane; 2] = [Pane::Reference, Pane::Candidate];

    pub fn label(self) -> &'static str {
        match self {
            Pane::Reference => "Reference",
            Pane::Candidate => "Candidate",
        }
    }
}

/// Scale and translation applied to a pane's image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaneTransform {
    pub scale: f32,
    pub translate_x: f32,
    pub translate_y: f32,
}

impl Default for PaneTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl PaneTransform {
    pub const IDENTITY: PaneTransform = PaneTransform {
        scale: 1.0,
        translate_x: 0.0,
        translate_y: 0.0,
    };

    /// Scale after a wheel event with DOM-style `delta_y` (positive = scroll down = zoom out)
    pub fn zoomed_scale(&self, wheel_delta_y: f32) -> f32 {
        clamp_scale(self.scale - wheel_delta_y * ZOOM_SENSITIVITY)
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale = clamp_scale(scale);
    }

    pub fn set_translate(&mut self, x: f32, y: f32) {
        self.translate_x = x;
        self.translate_y = y;
    }
}

/// Clamp into `[MIN_SCALE, MAX_SCALE]`; NaN collapses to `MIN_SCALE`
fn clamp_scale(scale: f32) -> f32 {
    if scale.is_nan() {
        MIN_SCALE
    } else {
        scale.clamp(MIN_SCALE, MAX_SCALE)
    }
}

/// Drag in progress
#[derive(Debug, Clone, Copy, PartialEq)]
struct DragAnchor {
    pane: Pane,
    /// Pointer position minus the pane translation at press time
    offset_x: f32,
    offset_y: f32,
}

/// Both pane transforms, the coupling mode and the active drag
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformEngine {
    reference: PaneTransform,
    candidate: PaneTransform,
    sync: bool,
    drag: Option<DragAnchor>,
}

impl TransformEngine {
    /// Identity transforms on both panes, independent mode
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transform(&self, pane: Pane) -> PaneTransform {
        match pane {
            Pane::Reference => self.reference,
            Pane::Candidate => self.candidate,
        }
    }

    fn transform_mut(&mut self, pane: Pane) -> &mut PaneTransform {
        match pane {
            Pane::Reference => &mut self.reference,
            Pane::Candidate => &mut self.candidate,
        }
    }

    pub fn is_synced(&self) -> bool {
        self.sync
    }

    /// Switch coupling. The transforms are left as they are, even if diverged.
    pub fn set_sync(&mut self, sync: bool) {
        self.sync = sync;
    }

    /// Panes written by a mutation originating from `origin`
    fn targets(&self, origin: Pane) -> &'static [Pane] {
        if self.sync {
            &Pane::ALL
        } else {
            match origin {
                Pane::Reference => &[Pane::Reference],
                Pane::Candidate => &[Pane::Candidate],
            }
        }
    }

    /// Apply one wheel event on `pane`; returns the new scale
    pub fn apply_zoom(&mut self, pane: Pane, wheel_delta_y: f32) -> f32 {
        let scale = self.transform(pane).zoomed_scale(wheel_delta_y);
        for &target in self.targets(pane) {
            self.transform_mut(target).set_scale(scale);
        }
        scale
    }

    pub fn begin_drag(&mut self, pane: Pane, pointer_x: f32, pointer_y: f32) {
        let current = self.transform(pane);
        self.drag = Some(DragAnchor {
            pane,
            offset_x: pointer_x - current.translate_x,
            offset_y: pointer_y - current.translate_y,
        });
    }

    /// Move the dragged pane(s); ignored when no drag is active
    pub fn continue_drag(&mut self, pointer_x: f32, pointer_y: f32) {
        let Some(anchor) = self.drag else {
            return;
        };
        let x = pointer_x - anchor.offset_x;
        let y = pointer_y - anchor.offset_y;
        for &target in self.targets(anchor.pane) {
            self.transform_mut(target).set_translate(x, y);
        }
    }

    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    /// Pane that started the active drag
    pub fn dragging(&self) -> Option<Pane> {
        self.drag.map(|anchor| anchor.pane)
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }
}
