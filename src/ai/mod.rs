//! AI-assisted editing.
//!
//! One request at a time: shrink the document by swapping embedded images for
//! placeholder tokens, ask the text service for a JSON edit, check the
//! contract, restore the images and hand the result back to the workspace.

pub mod chat;
pub mod client;
pub mod coordinator;
pub mod placeholder;
pub mod prompt;
pub mod response;

pub use chat::{ChatLog, ChatMessage, ChatRole};
pub use client::{GeminiClient, ModelInfo, TextService};
pub use coordinator::{AiCoordinator, CoordinatorState, SubmitOutcome};
pub use placeholder::ImagePlaceholderMap;
pub use prompt::build_prompt;
pub use response::{parse_response, ModelEdit};
