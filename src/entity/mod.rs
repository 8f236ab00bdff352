mod draft;
mod prompt;
mod viewer;

pub use draft::{PromptDraft, ValidationError};
pub use prompt::{
    newest_first, normalize_tags, parse_timestamp, sort_newest_first, Prompt, ToolList,
};
pub use viewer::Viewer;
