//! I/O modules for storm reports and feature tables

pub mod feature_table;
pub mod reports;

pub use feature_table::{
    read_feature_table, read_labeled_table, write_feature_table, write_labeled_table,
};
pub use reports::ReportReader;
