//! Transformation module.
//!
//! - Rewrite: courier shipment rows → billing-coded rows
//! - Grouper: address rows → institution / address report
//! - Pipeline: bytes in, named export file out

pub mod grouper;
pub mod pipeline;
pub mod rewrite;

pub use grouper::{group_addresses, summarize, GroupingColumns, GroupingSummary, UNCLASSIFIED};
pub use pipeline::*;
