//! Utility functions for presenting records as text.

pub mod format;

pub use format::{format_cell, format_date, render_table, table_columns, truncate_string};
