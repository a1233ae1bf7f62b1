//! Utility functions for report text and file names.

pub mod format;

pub use format::{escape_html, format_date, pluralize, sanitize_file_name, signed_points};
