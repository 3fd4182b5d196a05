//! Line-delimited JSON messages exchanged over stdin/stdout.
//!
//! A request is one object per line, `{"id": …, "op": "<operation>", …}`.
//! Every request gets exactly one response line carrying the same `id`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use devkit_backend::{
    EnvScope, EnvVariableRecord, RegistryRecord, ToolError, ToolOutput, VersionRecord,
};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum Operation {
    ListInstalledVersions,
    ListAvailableVersions,
    InstallVersion { version: String },
    SwitchVersion { version: String },
    UninstallVersion { version: String },
    CurrentVersion,
    ListRegistries,
    CurrentRegistry,
    UseRegistry { name: String },
    AddRegistry { name: String, url: String },
    DeleteRegistry { name: String },
    TestRegistrySpeed { name: String },
    ListEnvVariables,
    SetEnvVariable {
        name: String,
        value: String,
        scope: EnvScope,
    },
    DeleteEnvVariable { name: String, scope: EnvScope },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub id: Value,
    pub operation: Operation,
}

/// Decode one input line. A line that is not a JSON object answers with
/// `id: null`; an object with a usable `id` but a bad operation keeps it.
///
/// # Errors
/// Returns the `invalid-request` response to send back.
pub fn parse_request(line: &str) -> Result<Request, Response> {
    let mut value: Value = serde_json::from_str(line)
        .map_err(|error| Response::invalid_request(Value::Null, &error.to_string()))?;

    let Some(object) = value.as_object_mut() else {
        return Err(Response::invalid_request(
            Value::Null,
            "request must be a JSON object",
        ));
    };
    let id = object.remove("id").unwrap_or(Value::Null);

    match serde_json::from_value(value) {
        Ok(operation) => Ok(Request { id, operation }),
        Err(error) => Err(Response::invalid_request(id, &error.to_string())),
    }
}

/// Shapes of the `data` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Versions(Vec<VersionRecord>),
    VersionStrings(Vec<String>),
    Registries(Vec<RegistryRecord>),
    Variables(Vec<EnvVariableRecord>),
    Output(ToolOutput),
    Text(String),
    MaybeText(Option<String>),
}

impl Payload {
    /// The `[]` sent when a listing parsed to nothing.
    #[must_use]
    pub fn empty_list() -> Self {
        Payload::VersionStrings(Vec::new())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Data {
        id: Value,
        data: Payload,
        #[serde(skip_serializing_if = "Option::is_none")]
        warning: Option<String>,
    },
    Error {
        id: Value,
        error: String,
        kind: &'static str,
    },
}

impl Response {
    #[must_use]
    pub fn data(id: Value, data: Payload, warning: Option<String>) -> Self {
        Response::Data { id, data, warning }
    }

    #[must_use]
    pub fn from_error(id: Value, error: &ToolError) -> Self {
        Response::Error {
            id,
            error: error.to_string(),
            kind: error.kind(),
        }
    }

    fn invalid_request(id: Value, reason: &str) -> Self {
        Response::Error {
            id,
            error: format!("Invalid request: {reason}"),
            kind: "invalid-request",
        }
    }

    #[must_use]
    pub fn id(&self) -> &Value {
        match self {
            Response::Data { id, .. } | Response::Error { id, .. } => id,
        }
    }
}
