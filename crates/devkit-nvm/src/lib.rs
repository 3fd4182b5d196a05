mod backend;
mod client;
mod parser;
mod remote;

pub use backend::NvmBackend;
pub use client::{NvmClient, NvmEnvironment};
pub use parser::{parse_available, parse_current, parse_installed, parse_node_version};
pub use remote::{DEFAULT_MIRROR, NodeDistIndex};
