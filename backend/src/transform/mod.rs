//! Transformation module.
//!
//! This module handles payroll row to bank transfer record transformation:
//! - Lookup: bank / branch routing tables
//! - Narration: safe template rendering
//! - Mapper: per-row field mapping
//! - Grouper: CFL partitioning and group selection
//! - Pipeline: validate → map → export orchestration

pub mod grouper;
pub mod lookup;
pub mod mapper;
pub mod narration;
pub mod pipeline;

pub use grouper::{distinct_groups, group_counts, next_selection, partition, RecordGroup};
pub use lookup::{LookupEntry, LookupTable, MatchMode};
pub use mapper::{month_label, parse_date, MapResult, MappedRow, MappingRules, MonthStyle, RowMapper};
pub use narration::{render_narration, NarrationKind, NarrationTemplate, NarrationValues, Placeholder};
pub use pipeline::*;
