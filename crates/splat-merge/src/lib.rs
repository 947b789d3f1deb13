pub mod config;
pub mod merge;
pub mod store;

pub use config::{Device, MergeArgs, MergeConfig};
pub use merge::{
    InputSummary, MergeError, MergeMessage, MergeReport, SchemaSource, merge, merge_with,
};
pub use store::{RecordStore, SchemaMismatch};
