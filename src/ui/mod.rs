/// User interface module
///
/// - Product list and detail views (product.rs)
/// - Comparison overlay (compare.rs) and its pane canvas (pane.rs)
/// - Eased pane transforms (animation.rs)
/// - Decoded image cache (images.rs)

pub mod animation;
pub mod compare;
pub mod images;
pub mod pane;
pub mod product;
