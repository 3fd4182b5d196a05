//! devkit: Node.js versions through nvm, npm registries through nrm and
//! environment variables, served as line-delimited JSON over stdio.

pub mod bridge;
pub mod logging;
pub mod protocol;
pub mod settings;
pub mod toolbox;

pub use bridge::serve;
pub use protocol::{Operation, Payload, Request, Response, parse_request};
pub use settings::AppSettings;
pub use toolbox::{Reply, Toolbox};
