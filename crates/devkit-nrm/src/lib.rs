mod backend;
mod client;
mod parser;

pub use backend::{BUILTIN_REGISTRIES, NrmBackend};
pub use client::NrmClient;
pub use parser::{parse_current_registry, parse_registries};
