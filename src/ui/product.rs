/// Product list and product detail views

use iced::keyboard::Modifiers;
use iced::widget::{button, column, container, image, row, scrollable, text, Column};
use iced::{Alignment, Element, Length};
use iced_aw::Wrap;
use std::path::Path;

use super::images::{ImageCache, LoadedImage};
use crate::imagery::fetch::candidate_thumbnail_key;
use crate::imagery::locator::{candidate_path, source_location};
use crate::imagery::SizeHint;
use crate::state::data::{ProductRecord, ProductSummary};
use crate::state::selection::{ModifierState, SelectionState};
use crate::Message;

const THUMBNAIL_EDGE: f32 = 120.0;

/// Held keys as the selection machine sees them; `logo` is Command on macOS
impl From<Modifiers> for ModifierState {
    fn from(modifiers: Modifiers) -> Self {
        ModifierState {
            control: modifiers.control(),
            meta: modifiers.logo(),
            shift: modifiers.shift(),
        }
    }
}

/// Left column: every product, those with generated images marked
pub fn product_list<'a>(products: &'a [ProductSummary], current: Option<&str>) -> Element<'a, Message> {
    let entries = products.iter().map(|product| {
        let marker = if product.has_generated_images { "● " } else { "○ " };
        let label = column![
            text(format!("{marker}{}", product.name)).size(15),
            text(format!("{} · {}", product.class_description, product.tranche)).size(12),
        ]
        .spacing(2);

        let style = if current == Some(product.id.as_str()) {
            button::primary
        } else {
            button::text
        };
        button(label)
            .on_press(Message::SelectProduct(product.id.clone()))
            .style(style)
            .width(Length::Fill)
            .into()
    });

    scrollable(Column::with_children(entries).spacing(4).padding(8))
        .height(Length::Fill)
        .into()
}

/// Thumbnail or a loading placeholder
fn thumbnail<'a>(loaded: Option<&LoadedImage>, failed: bool) -> Element<'a, Message> {
    match loaded {
        Some(loaded) => image(loaded.handle.clone())
            .width(Length::Fixed(THUMBNAIL_EDGE))
            .height(Length::Fixed(THUMBNAIL_EDGE))
            .into(),
        None => container(text(if failed { "⚠" } else { "…" }))
            .width(Length::Fixed(THUMBNAIL_EDGE))
            .height(Length::Fixed(THUMBNAIL_EDGE))
            .center_x(Length::Fixed(THUMBNAIL_EDGE))
            .center_y(Length::Fixed(THUMBNAIL_EDGE))
            .into(),
    }
}

/// Everything the detail view needs besides the record itself
pub struct DetailContext<'a> {
    pub selection: &'a SelectionState,
    pub images: &'a ImageCache,
    pub output_root: &'a Path,
    /// Disk cache the candidate thumbnails are keyed by
    pub thumbnail_dir: Option<&'a Path>,
    pub thumbnail_size: u32,
    pub can_generate: bool,
    pub generating: bool,
}

pub fn product_detail<'a>(product: &'a ProductRecord, ctx: DetailContext<'a>) -> Element<'a, Message> {
    let heading = column![
        text(&product.name).size(28),
        text(format!(
            "{}  ·  {}  ·  Tranche {}  ·  {}",
            product.brand, product.class_description, product.tranche, product.id
        ))
        .size(14),
    ]
    .spacing(4);

    let specifications = Column::with_children(
        product
            .specifications
            .iter()
            .map(|(key, value)| text(format!("{key}: {value}")).size(13).into()),
    )
    .spacing(2);

    // Source grid: click selects one, Ctrl/Cmd/Shift-click toggles
    let sources = Wrap::with_elements(
        product
            .source_images
            .iter()
            .map(|source| {
                let location = source_location(source, SizeHint::Thumbnail(ctx.thumbnail_size));
                let selected = ctx.selection.is_selected(source);
                button(thumbnail(ctx.images.get(&location), ctx.images.error(&location).is_some()))
                    .on_press(Message::SourceClicked(source.clone()))
                    .style(if selected { button::primary } else { button::secondary })
                    .padding(4)
                    .into()
            })
            .collect(),
    )
    .spacing(8.0)
    .line_spacing(8.0);

    let selection_label = match ctx.selection.selected().len() {
        0 => "No selection".to_string(),
        1 => "1 source selected".to_string(),
        n => format!("{n} sources selected"),
    };
    let generate_label = if ctx.generating { "Generating…" } else { "Generate" };
    let actions = row![
        text(selection_label).size(14),
        button(generate_label)
            .on_press_maybe(ctx.can_generate.then_some(Message::Generate))
            .padding(10),
        button("Compare")
            .on_press_maybe(
                (!product.source_images.is_empty() && !product.candidate_images.is_empty())
                    .then_some(Message::OpenComparison),
            )
            .padding(10),
    ]
    .spacing(16)
    .align_y(Alignment::Center);

    let active = ctx.selection.active_candidate();
    let candidates: Element<'a, Message> = if product.candidate_images.is_empty() {
        text("No generated images yet").size(14).into()
    } else {
        Wrap::with_elements(
            product
                .candidate_images
                .iter()
                .enumerate()
                .map(|(index, candidate)| {
                    let location = candidate_thumbnail_key(
                        &candidate_path(&candidate.image, ctx.output_root),
                        ctx.thumbnail_dir,
                        ctx.thumbnail_size,
                    );
                    let card = column![
                        thumbnail(ctx.images.get(&location), ctx.images.error(&location).is_some()),
                        text(candidate.file_name()).size(11),
                    ]
                    .spacing(2)
                    .align_x(Alignment::Center);
                    button(card)
                        .on_press(Message::CandidateClicked(index))
                        .style(if index == active { button::primary } else { button::secondary })
                        .padding(4)
                        .into()
                })
                .collect(),
        )
        .spacing(8.0)
        .line_spacing(8.0)
        .into()
    };

    let provenance: Element<'a, Message> = match product.candidate_images.get(active) {
        Some(candidate) => column![
            text(format!("{}  ·  {}", candidate.engine_version.label(), candidate.model_id)).size(13),
            text(format!("Positive: {}", candidate.prompts.positive)).size(13),
            text(format!("Negative: {}", candidate.prompts.negative_display())).size(13),
        ]
        .spacing(2)
        .into(),
        None => column![].into(),
    };

    scrollable(
        column![
            heading,
            specifications,
            text("Ghost images").size(18),
            sources,
            actions,
            text("Generated images").size(18),
            candidates,
            provenance,
        ]
        .spacing(14)
        .padding(16),
    )
    .height(Length::Fill)
    .into()
}
