//! Headless screen controllers for the back-office console.

pub mod master_detail;

pub use master_detail::{EditOutcome, MasterDetail, Notice, View};
