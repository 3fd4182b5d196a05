mod commands;
mod paths;
mod shell;

pub use commands::HideWindow;
pub use paths::{AppPaths, AppPathsError};
pub use shell::{Platform, posix_quote, powershell_quote};
