mod error;
mod ordering;
mod text;
mod traits;
mod types;

pub use error::ToolError;
pub use ordering::{GROUP_CAP, VersionGroup, flatten_groups, group_by_major, sort_descending};
pub use text::{has_current_annotation, normalize_version, strip_ansi, version_triples};
pub use traits::{DisabledIndex, ReleaseIndex};
pub use types::{
    EnvScope, EnvVariableRecord, NodeVersion, RegistryRecord, ToolOutput, VersionParseError,
    VersionRecord,
};
