//! Terminal output: colors and exchange rendering

pub mod format;
pub mod terminal;

pub use format::{format_body, format_request_head, format_response_head, print_exchange};
pub use terminal::{colors, RESET};
