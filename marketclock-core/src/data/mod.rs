pub mod source;

pub use source::{DataSource, DirectorySource, Snapshot};
