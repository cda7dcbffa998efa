use iced::alignment::{Horizontal, Vertical};
use iced::mouse::{self, Cursor};
use iced::widget::canvas::{self, Path, Program};
use iced::{Color, Pixels, Point, Rectangle, Renderer, Size, Theme, Vector};

use super::compare::ViewerMessage;
use super::images::LoadedImage;
use crate::state::session::Step;
use crate::state::transform::{Pane, PaneTransform};

/// Radius of the on-pane navigation buttons
const ARROW_RADIUS: f32 = 18.0;
/// Distance of a button's center from the pane edge
const ARROW_INSET: f32 = 28.0;
/// Wheel "line" steps converted to pixel deltas
const PIXELS_PER_LINE: f32 = 100.0;

/// What lies under a point inside a pane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaneHit {
    Arrow(Step),
    Image,
}

/// Classify a pane-local position; arrows only exist when there is something to step to
pub fn hit_test(size: Size, local: Point, arrows: bool) -> PaneHit {
    if arrows {
        let center_y = size.height / 2.0;
        let prev = Point::new(ARROW_INSET, center_y);
        let next = Point::new(size.width - ARROW_INSET, center_y);
        if local.distance(prev) <= ARROW_RADIUS {
            return PaneHit::Arrow(Step::Prev);
        }
        if local.distance(next) <= ARROW_RADIUS {
            return PaneHit::Arrow(Step::Next);
        }
    }
    PaneHit::Image
}

/// Screen rectangle of an image fitted into the pane, then scaled about its
/// own center and translated
pub fn image_rect(pane: Size, image: Size, transform: PaneTransform) -> Rectangle {
    let fit = if image.width <= 0.0 || image.height <= 0.0 {
        0.0
    } else {
        (pane.width / image.width).min(pane.height / image.height)
    };
    let width = image.width * fit * transform.scale;
    let height = image.height * fit * transform.scale;
    let center = Point::new(pane.width / 2.0, pane.height / 2.0)
        + Vector::new(transform.translate_x, transform.translate_y);

    Rectangle {
        x: center.x - width / 2.0,
        y: center.y - height / 2.0,
        width,
        height,
    }
}

/// DOM-style wheel delta (positive = scroll down) from an iced scroll
pub fn wheel_delta_y(delta: mouse::ScrollDelta) -> f32 {
    match delta {
        mouse::ScrollDelta::Lines { y, .. } => -y * PIXELS_PER_LINE,
        mouse::ScrollDelta::Pixels { y, .. } => -y,
    }
}

/// Canvas for one half of the comparison viewer
/// Draws the image under its displayed transform and turns mouse input into zoom/pan messages
pub struct PaneCanvas {
    pub pane: Pane,
    pub image: Option<LoadedImage>,
    /// Eased transform to draw
    pub transform: PaneTransform,
    /// Pane that owns the active drag, if any
    pub drag_origin: Option<Pane>,
    /// Whether the list behind this pane has more than one image
    pub arrows: bool,
    /// Shown when the image is missing
    pub placeholder: String,
}

impl PaneCanvas {
    fn owns_drag(&self) -> bool {
        self.drag_origin == Some(self.pane)
    }
}

impl Program<ViewerMessage> for PaneCanvas {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: Cursor,
    ) -> Vec<canvas::Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());
        let size = bounds.size();
        frame.fill_rectangle(Point::ORIGIN, size, Color::from_rgb8(0x1b, 0x1d, 0x22));

        frame.with_clip(Rectangle::with_size(size), |frame| match &self.image {
            Some(image) => {
                let rect = image_rect(
                    size,
                    Size::new(image.width as f32, image.height as f32),
                    self.transform,
                );
                frame.draw_image(rect, &image.handle);
            }
            None => {
                frame.fill_text(canvas::Text {
                    content: self.placeholder.clone(),
                    position: Point::new(size.width / 2.0, size.height / 2.0),
                    color: Color::from_rgb(0.6, 0.6, 0.6),
                    size: Pixels(16.0),
                    horizontal_alignment: Horizontal::Center,
                    vertical_alignment: Vertical::Center,
                    ..canvas::Text::default()
                });
            }
        });

        if self.arrows {
            let center_y = size.height / 2.0;
            for (x, glyph) in [(ARROW_INSET, "‹"), (size.width - ARROW_INSET, "›")] {
                let center = Point::new(x, center_y);
                frame.fill(&Path::circle(center, ARROW_RADIUS), Color::from_rgba(0.0, 0.0, 0.0, 0.55));
                frame.fill_text(canvas::Text {
                    content: glyph.to_string(),
                    position: center,
                    color: Color::WHITE,
                    size: Pixels(26.0),
                    horizontal_alignment: Horizontal::Center,
                    vertical_alignment: Vertical::Center,
                    ..canvas::Text::default()
                });
            }
        }

        vec![frame.into_geometry()]
    }

    fn update(
        &self,
        _state: &mut Self::State,
        event: canvas::Event,
        bounds: Rectangle,
        cursor: Cursor,
    ) -> (canvas::event::Status, Option<ViewerMessage>) {
        match event {
            // Mouse wheel for zooming
            canvas::Event::Mouse(mouse::Event::WheelScrolled { delta }) => {
                if cursor.is_over(bounds) {
                    let message = ViewerMessage::Zoom(self.pane, wheel_delta_y(delta));
                    return (canvas::event::Status::Captured, Some(message));
                }
            }

            // Press on an arrow navigates and never starts a drag
            canvas::Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => {
                if let (Some(local), Some(position)) = (cursor.position_in(bounds), cursor.position()) {
                    let message = match hit_test(bounds.size(), local, self.arrows) {
                        PaneHit::Arrow(step) => ViewerMessage::Navigate(self.pane, step),
                        PaneHit::Image => ViewerMessage::DragStart(self.pane, position),
                    };
                    return (canvas::event::Status::Captured, Some(message));
                }
            }

            // Release anywhere ends the drag this pane started
            canvas::Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left)) => {
                if self.owns_drag() {
                    return (canvas::event::Status::Captured, Some(ViewerMessage::DragEnd));
                }
            }

            // Window coordinates, so the drag continues outside the pane
            canvas::Event::Mouse(mouse::Event::CursorMoved { position }) => {
                if self.owns_drag() {
                    return (canvas::event::Status::Captured, Some(ViewerMessage::DragMove(position)));
                }
            }

            canvas::Event::Mouse(mouse::Event::CursorLeft) => {
                if self.owns_drag() {
                    return (canvas::event::Status::Ignored, Some(ViewerMessage::DragEnd));
                }
            }

            _ => {}
        }

        (canvas::event::Status::Ignored, None)
    }

    fn mouse_interaction(&self, _state: &Self::State, bounds: Rectangle, cursor: Cursor) -> mouse::Interaction {
        if self.owns_drag() {
            return mouse::Interaction::Grabbing;
        }
        match cursor.position_in(bounds) {
            Some(local) => match hit_test(bounds.size(), local, self.arrows) {
                PaneHit::Arrow(_) => mouse::Interaction::Pointer,
                PaneHit::Image => mouse::Interaction::Grab,
            },
            None => mouse::Interaction::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arrows_take_precedence_over_drag() {
        let size = Size::new(400.0, 300.0);
        assert_eq!(hit_test(size, Point::new(28.0, 150.0), true), PaneHit::Arrow(Step::Prev));
        assert_eq!(hit_test(size, Point::new(380.0, 140.0), true), PaneHit::Arrow(Step::Next));
        assert_eq!(hit_test(size, Point::new(200.0, 150.0), true), PaneHit::Image);
        // Single-image lists draw no arrows
        assert_eq!(hit_test(size, Point::new(28.0, 150.0), false), PaneHit::Image);
    }

    #[test]
    fn test_image_rect_fits_then_transforms() {
        let pane = Size::new(400.0, 200.0);
        let image = Size::new(1000.0, 1000.0);

        let rect = image_rect(pane, image, PaneTransform::IDENTITY);
        assert_eq!(rect, Rectangle { x: 100.0, y: 0.0, width: 200.0, height: 200.0 });

        let zoomed = PaneTransform { scale: 2.0, translate_x: 10.0, translate_y: -5.0 };
        let rect = image_rect(pane, image, zoomed);
        assert_eq!(rect, Rectangle { x: 10.0, y: -105.0, width: 400.0, height: 400.0 });
    }

    #[test]
    fn test_wheel_direction_matches_dom() {
        // Scrolling up in iced is positive; the DOM reports it as negative
        assert_eq!(wheel_delta_y(mouse::ScrollDelta::Lines { x: 0.0, y: 1.0 }), -100.0);
        assert_eq!(wheel_delta_y(mouse::ScrollDelta::Pixels { x: 0.0, y: -30.0 }), 30.0);
    }
}
