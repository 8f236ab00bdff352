mod commands;
mod handlers;

pub use commands::{Cli, Commands, DraftArgs};
pub use handlers::{
    handle_browse, handle_edit, handle_favorite, handle_favorites, handle_filter, handle_retool,
    handle_search, handle_show, handle_submit, handle_tools, handle_upvote, handle_whoami,
};
