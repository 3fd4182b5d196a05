mod backend;
mod parser;

pub use backend::{EnvBackend, SESSION_ONLY_WARNING};
pub use parser::{classify_unix, parse_printenv, parse_windows_scope};
