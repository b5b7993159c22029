//! Utility functions for common operations.
//!
//! - **Text processing**: HTML entity decoding for feed text and terminal-safe
//!   output
//! - **URL validation**: feed URL checks before a feed is stored

mod text;
mod url_validator;

pub use text::{strip_control_chars, unescape_html};
pub use url_validator::{validate_url, UrlValidationError};
