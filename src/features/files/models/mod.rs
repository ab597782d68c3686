mod file;
pub mod metadata;
pub mod object_path;

pub use file::*;
pub use metadata::{MetadataError, MetadataField};
pub use object_path::ObjectPathError;
