pub mod completion;

pub use completion::{ChatMessage, CompletionClient};
