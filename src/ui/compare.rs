/// Comparison overlay: two panes side by side with synced or independent pan/zoom

use iced::keyboard::{self, key, Key, Modifiers};
use iced::widget::{button, canvas, checkbox, column, container, horizontal_space, row, text, Column};
use iced::{Element, Length, Point, Subscription};
use std::path::Path;
use std::time::Instant;
use tracing::debug;

use super::animation::AnimatedTransform;
use super::images::ImageCache;
use super::pane::PaneCanvas;
use crate::imagery::locator::{candidate_location, source_location};
use crate::imagery::{ImageSource, SizeHint};
use crate::state::data::{CandidateImage, ImageRef};
use crate::state::session::{ComparisonOverlay, ComparisonSession, SessionError, Shortcut, ShortcutOutcome, Step};
use crate::state::transform::Pane;

#[derive(Debug, Clone)]
pub enum ViewerMessage {
    Close,
    ToggleSync(bool),
    Shortcut(Shortcut),
    Navigate(Pane, Step),
    Zoom(Pane, f32),
    DragStart(Pane, Point),
    DragMove(Point),
    DragEnd,
    Tick(Instant),
}

/// Escape closes, left/right step through generated images
fn shortcut_for(key: Key, _modifiers: Modifiers) -> Option<ViewerMessage> {
    let shortcut = match key.as_ref() {
        Key::Named(key::Named::Escape) => Shortcut::Close,
        Key::Named(key::Named::ArrowRight) => Shortcut::NextCandidate,
        Key::Named(key::Named::ArrowLeft) => Shortcut::PrevCandidate,
        _ => return None,
    };
    Some(ViewerMessage::Shortcut(shortcut))
}

/// The overlay plus the eased transforms actually drawn
#[derive(Debug, Default)]
pub struct Viewer {
    overlay: ComparisonOverlay,
    reference: AnimatedTransform,
    candidate: AnimatedTransform,
}

impl Viewer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session; view state always starts from identity
    pub fn open(
        &mut self,
        sources: Vec<ImageRef>,
        source_index: usize,
        candidates: Vec<CandidateImage>,
        candidate_index: usize,
    ) -> Result<(), SessionError> {
        self.overlay.open(sources, source_index, candidates, candidate_index)?;
        self.reference = AnimatedTransform::default();
        self.candidate = AnimatedTransform::default();
        Ok(())
    }

    pub fn close(&mut self) {
        self.overlay.close();
    }

    pub fn is_open(&self) -> bool {
        self.overlay.is_open()
    }

    pub fn session(&self) -> Option<&ComparisonSession> {
        self.overlay.session()
    }

    fn animated_mut(&mut self, pane: Pane) -> &mut AnimatedTransform {
        match pane {
            Pane::Reference => &mut self.reference,
            Pane::Candidate => &mut self.candidate,
        }
    }

    /// Push the engine's transforms into the displayed ones
    fn sync_display(&mut self, now: Instant) {
        let Some(session) = self.overlay.session() else {
            return;
        };
        let engine = session.transforms().clone();
        for pane in Pane::ALL {
            self.animated_mut(pane)
                .follow(engine.transform(pane), engine.is_dragging(), now);
        }
    }

    pub fn update(&mut self, message: ViewerMessage) {
        let now = Instant::now();
        match message {
            ViewerMessage::Close => self.close(),
            ViewerMessage::Shortcut(shortcut) => {
                if self.overlay.handle_shortcut(shortcut) == ShortcutOutcome::Closed {
                    debug!("comparison closed from keyboard");
                }
            }
            ViewerMessage::Tick(now) => {
                self.reference.tick(now);
                self.candidate.tick(now);
            }
            message => {
                let Some(session) = self.overlay.session_mut() else {
                    return;
                };
                match message {
                    ViewerMessage::ToggleSync(sync) => session.transforms_mut().set_sync(sync),
                    ViewerMessage::Navigate(pane, step) => session.step(pane, step),
                    ViewerMessage::Zoom(pane, delta) => {
                        session.transforms_mut().apply_zoom(pane, delta);
                    }
                    ViewerMessage::DragStart(pane, position) => {
                        session.transforms_mut().begin_drag(pane, position.x, position.y);
                    }
                    ViewerMessage::DragMove(position) => {
                        session.transforms_mut().continue_drag(position.x, position.y);
                    }
                    ViewerMessage::DragEnd => session.transforms_mut().end_drag(),
                    ViewerMessage::Close | ViewerMessage::Shortcut(_) | ViewerMessage::Tick(_) => {}
                }
                self.sync_display(now);
            }
        }
    }

    /// Full-size images the open session currently shows
    pub fn wanted_images(&self, output_root: &Path, full_size: u32) -> Vec<ImageSource> {
        match self.overlay.session() {
            Some(session) => vec![
                source_location(session.current_source(), SizeHint::Full(full_size)),
                candidate_location(&session.current_candidate().image, output_root),
            ],
            None => Vec::new(),
        }
    }

    /// Shortcuts only while a session is open; frames only while easing
    pub fn subscription(&self) -> Subscription<ViewerMessage> {
        if !self.is_open() {
            return Subscription::none();
        }
        let mut subscriptions = vec![keyboard::on_key_press(shortcut_for)];
        if self.reference.is_animating() || self.candidate.is_animating() {
            subscriptions.push(iced::window::frames().map(ViewerMessage::Tick));
        }
        Subscription::batch(subscriptions)
    }

    pub fn view<'a>(&'a self, images: &'a ImageCache, output_root: &Path, full_size: u32) -> Element<'a, ViewerMessage> {
        let Some(session) = self.overlay.session() else {
            return text("No comparison open").into();
        };
        let engine = session.transforms();
        let candidate = session.current_candidate();

        let header = row![
            text("Compare").size(24),
            horizontal_space(),
            checkbox("Sync pan & zoom", engine.is_synced()).on_toggle(ViewerMessage::ToggleSync),
            button("Close (Esc)").on_press(ViewerMessage::Close).padding(8),
        ]
        .spacing(16)
        .align_y(iced::Alignment::Center);

        let source = source_location(session.current_source(), SizeHint::Full(full_size));
        let generated = candidate_location(&candidate.image, output_root);

        let reference_label = format!(
            "Reference {}  ·  {}",
            session.position_label(Pane::Reference),
            session.current_source().file_name()
        );
        let candidate_label = format!(
            "Candidate {}  ·  {}  ·  {}",
            session.position_label(Pane::Candidate),
            candidate.file_name(),
            candidate.engine_version.label()
        );

        let panes = row![
            self.pane_view(Pane::Reference, reference_label, images, &source, session.source_count() > 1),
            self.pane_view(Pane::Candidate, candidate_label, images, &generated, session.candidate_count() > 1),
        ]
        .spacing(12)
        .height(Length::Fill);

        let provenance = column![
            text(format!("Model: {}", candidate.model_id)).size(14),
            text(format!("Positive prompt: {}", candidate.prompts.positive)).size(14),
            text(format!("Negative prompt: {}", candidate.prompts.negative_display())).size(14),
            text("Scroll to zoom, drag to pan, ←/→ to switch generated image").size(12),
        ]
        .spacing(4);

        container(column![header, panes, provenance].spacing(12).padding(16))
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn pane_view<'a>(
        &self,
        pane: Pane,
        label: String,
        images: &ImageCache,
        source: &ImageSource,
        arrows: bool,
    ) -> Element<'a, ViewerMessage> {
        let transform = match pane {
            Pane::Reference => self.reference.current(),
            Pane::Candidate => self.candidate.current(),
        };
        let placeholder = match images.error(source) {
            Some(e) => format!("Failed to load image: {e}"),
            None => "Loading…".to_string(),
        };

        let program = PaneCanvas {
            pane,
            image: images.get(source).cloned(),
            transform,
            drag_origin: self.session().and_then(|s| s.transforms().dragging()),
            arrows,
            placeholder,
        };

        let pane_column: Column<'a, ViewerMessage> = column![
            text(label).size(14),
            canvas(program).width(Length::Fill).height(Length::Fill),
        ]
        .spacing(6)
        .width(Length::FillPortion(1));

        pane_column.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::data::{EngineVersion, Prompts};
    use crate::state::transform::PaneTransform;

    fn lists(sources: usize, candidates: usize) -> (Vec<ImageRef>, Vec<CandidateImage>) {
        let sources = (0..sources).map(|i| ImageRef::new(format!("https://cdn.example.com/{i}"))).collect();
        let candidates = (0..candidates)
            .map(|i| CandidateImage {
                image: ImageRef::new(format!("T1/p1_l{}.jpg", 101 + i)),
                engine_version: EngineVersion::V2NanoBananaPro,
                model_id: "gemini-3-pro-image-preview".to_string(),
                prompts: Prompts::new("on white", None),
            })
            .collect();
        (sources, candidates)
    }

    fn open_viewer(sources: usize, candidates: usize) -> Viewer {
        let (sources, candidates) = lists(sources, candidates);
        let mut viewer = Viewer::new();
        viewer.open(sources, 0, candidates, 0).unwrap();
        viewer
    }

    #[test]
    fn test_shortcut_mapping() {
        assert!(matches!(
            shortcut_for(Key::Named(key::Named::Escape), Modifiers::empty()),
            Some(ViewerMessage::Shortcut(Shortcut::Close))
        ));
        assert!(matches!(
            shortcut_for(Key::Named(key::Named::ArrowLeft), Modifiers::empty()),
            Some(ViewerMessage::Shortcut(Shortcut::PrevCandidate))
        ));
        assert!(shortcut_for(Key::Named(key::Named::ArrowUp), Modifiers::empty()).is_none());
        assert!(shortcut_for(Key::Character("a".into()), Modifiers::empty()).is_none());
    }

    #[test]
    fn test_drag_follows_instantly_and_release_eases() {
        let mut viewer = open_viewer(2, 2);
        viewer.update(ViewerMessage::DragStart(Pane::Reference, Point::new(100.0, 100.0)));
        viewer.update(ViewerMessage::DragMove(Point::new(150.0, 80.0)));

        assert_eq!(viewer.reference.current().translate_x, 50.0);
        assert!(!viewer.reference.is_animating());
        assert_eq!(viewer.candidate.current(), PaneTransform::IDENTITY);

        viewer.update(ViewerMessage::DragEnd);
        viewer.update(ViewerMessage::Zoom(Pane::Reference, -500.0));
        assert!(viewer.reference.is_animating());
    }

    #[test]
    fn test_arrow_keys_step_candidates_only() {
        let mut viewer = open_viewer(3, 4);
        viewer.update(ViewerMessage::Shortcut(Shortcut::PrevCandidate));
        let session = viewer.session().unwrap();
        assert_eq!((session.source_index(), session.candidate_index()), (0, 3));

        viewer.update(ViewerMessage::Navigate(Pane::Reference, Step::Next));
        assert_eq!(viewer.session().unwrap().source_index(), 1);

        viewer.update(ViewerMessage::Shortcut(Shortcut::Close));
        assert!(!viewer.is_open());
    }

    #[test]
    fn test_reopen_starts_from_identity() {
        let mut viewer = open_viewer(2, 2);
        viewer.update(ViewerMessage::ToggleSync(true));
        viewer.update(ViewerMessage::Zoom(Pane::Candidate, -3000.0));
        viewer.close();

        let (sources, candidates) = lists(2, 2);
        viewer.open(sources, 1, candidates, 1).unwrap();
        assert_eq!(viewer.reference.current(), PaneTransform::IDENTITY);
        assert_eq!(viewer.candidate.current(), PaneTransform::IDENTITY);
        assert!(!viewer.session().unwrap().transforms().is_synced());
    }

    #[test]
    fn test_wanted_images_follow_cursors() {
        let mut viewer = open_viewer(2, 2);
        viewer.update(ViewerMessage::Shortcut(Shortcut::NextCandidate));
        let wanted = viewer.wanted_images(Path::new("/out"), 1024);
        assert_eq!(
            wanted,
            vec![
                ImageSource::Remote("https://cdn.example.com/0?wid=1024&hei=1024&fmt=jpg".to_string()),
                ImageSource::Local(std::path::PathBuf::from("/out/T1/p1_l102.jpg")),
            ]
        );

        viewer.close();
        assert!(viewer.wanted_images(Path::new("/out"), 1024).is_empty());
    }
}
