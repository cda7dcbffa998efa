/// External collaborators
///
/// - Product catalog (catalog.rs)
/// - Generation service client (generation.rs)

pub mod catalog;
pub mod generation;
