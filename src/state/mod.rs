/// State management module
///
/// This module handles all application state, including:
/// - Product catalog database and imports (library.rs)
/// - Generated image discovery from output logs (outputs.rs)
/// - Shared data structures (data.rs)
/// - Source/candidate selection (selection.rs)
/// - Pane pan/zoom (transform.rs) and the comparison session (session.rs)
/// - Generation request tracking (generation.rs)

pub mod data;
pub mod generation;
pub mod library;
pub mod outputs;
pub mod selection;
pub mod session;
pub mod transform;
