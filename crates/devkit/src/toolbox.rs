use std::sync::Arc;

use log::debug;

use devkit_backend::{DisabledIndex, ReleaseIndex, ToolError, ToolOutput};
use devkit_env::EnvBackend;
use devkit_exec::CommandRunner;
use devkit_nrm::{NrmBackend, NrmClient};
use devkit_nvm::{NodeDistIndex, NvmBackend, NvmClient, NvmEnvironment};
use devkit_platform::Platform;

use crate::protocol::{Operation, Payload, Request, Response};
use crate::settings::AppSettings;

/// Successful result of one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub data: Payload,
    pub warning: Option<String>,
}

impl From<Payload> for Reply {
    fn from(data: Payload) -> Self {
        Self {
            data,
            warning: None,
        }
    }
}

impl From<ToolOutput> for Reply {
    fn from(mut output: ToolOutput) -> Self {
        let warning = output.warning.take();
        Self {
            data: Payload::Output(output),
            warning,
        }
    }
}

/// The three tool backends behind one dispatch point.
#[derive(Clone)]
pub struct Toolbox {
    nvm: NvmBackend,
    nrm: NrmBackend,
    env: EnvBackend,
}

impl Toolbox {
    pub fn new(nvm: NvmBackend, nrm: NrmBackend, env: EnvBackend) -> Self {
        Self { nvm, nrm, env }
    }

    /// Wire every backend to `runner` with the configured timeouts, stderr
    /// policy and release index.
    pub fn from_settings(settings: &AppSettings, runner: Arc<dyn CommandRunner>) -> Self {
        let platform = Platform::current();
        let stderr = settings.stderr_policy();

        let environment = match settings.nvm_path.clone() {
            Some(nvm_exe) if platform.is_windows() => NvmEnvironment::Windows { nvm_exe },
            Some(nvm_dir) => NvmEnvironment::Unix { nvm_dir },
            None => NvmEnvironment::detect(),
        };
        debug!("Using nvm environment {environment:?}");

        let nvm_client = NvmClient::new(environment)
            .with_timeouts(settings.fetch_timeout(), settings.install_timeout())
            .with_stderr_policy(stderr);
        let nvm = NvmBackend::new(nvm_client, runner.clone(), release_index(settings));

        let nrm_client = NrmClient::new(platform)
            .with_timeout(settings.fetch_timeout())
            .with_stderr_policy(stderr);
        let nrm = NrmBackend::new(nrm_client, runner.clone());

        let env = EnvBackend::new(platform, runner)
            .with_timeout(settings.fetch_timeout())
            .with_stderr_policy(stderr);

        Self::new(nvm, nrm, env)
    }

    /// # Errors
    /// Returns whatever the backend reported, including
    /// [`ToolError::NothingFound`] for empty listings.
    pub async fn dispatch(&self, operation: Operation) -> Result<Reply, ToolError> {
        let reply: Reply = match operation {
            Operation::ListInstalledVersions => {
                Payload::Versions(self.nvm.list_installed().await?).into()
            }
            Operation::ListAvailableVersions => {
                Payload::VersionStrings(self.nvm.list_available().await?).into()
            }
            Operation::InstallVersion { version } => self.nvm.install(&version).await?.into(),
            Operation::SwitchVersion { version } => self.nvm.switch(&version).await?.into(),
            Operation::UninstallVersion { version } => {
                self.nvm.uninstall(&version).await?.into()
            }
            Operation::CurrentVersion => {
                Payload::MaybeText(self.nvm.current_version().await?).into()
            }
            Operation::ListRegistries => {
                Payload::Registries(self.nrm.list_registries().await?).into()
            }
            Operation::CurrentRegistry => Payload::Text(self.nrm.current_registry().await?).into(),
            Operation::UseRegistry { name } => self.nrm.use_registry(&name).await?.into(),
            Operation::AddRegistry { name, url } => {
                self.nrm.add_registry(&name, &url).await?.into()
            }
            Operation::DeleteRegistry { name } => self.nrm.delete_registry(&name).await?.into(),
            Operation::TestRegistrySpeed { name } => {
                self.nrm.test_registry_speed(&name).await?.into()
            }
            Operation::ListEnvVariables => {
                Payload::Variables(self.env.list_variables().await?).into()
            }
            Operation::SetEnvVariable { name, value, scope } => {
                self.env.set_variable(&name, &value, scope).await?.into()
            }
            Operation::DeleteEnvVariable { name, scope } => {
                self.env.delete_variable(&name, scope).await?.into()
            }
        };
        Ok(reply)
    }

    /// Run a request to its response. An empty listing is data, not an
    /// error: `[]` with the reason as a warning.
    pub async fn respond(&self, request: Request) -> Response {
        debug!("Handling {:?} (id {})", request.operation, request.id);

        match self.dispatch(request.operation).await {
            Ok(reply) => Response::data(request.id, reply.data, reply.warning),
            Err(error @ ToolError::NothingFound { .. }) => {
                Response::data(request.id, Payload::empty_list(), Some(error.to_string()))
            }
            Err(error) => {
                debug!("Request {} failed ({}): {error}", request.id, error.kind());
                Response::from_error(request.id, &error)
            }
        }
    }
}

fn release_index(settings: &AppSettings) -> Arc<dyn ReleaseIndex> {
    if !settings.remote_fallback {
        return Arc::new(DisabledIndex);
    }

    let http = reqwest::Client::builder()
        .timeout(settings.http_timeout())
        .user_agent(format!("devkit/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_default();
    Arc::new(NodeDistIndex::new(http, settings.node_dist_mirror.as_deref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use devkit_backend::VersionRecord;
    use devkit_exec::testing::ScriptedRunner;

    fn toolbox(runner: Arc<ScriptedRunner>) -> Toolbox {
        let settings = AppSettings {
            remote_fallback: false,
            nvm_path: Some(if cfg!(windows) {
                "C:\\nvm\\nvm.exe".into()
            } else {
                "/opt/nvm".into()
            }),
            ..AppSettings::default()
        };
        Toolbox::from_settings(&settings, runner)
    }

    #[test]
    fn tool_output_warning_is_lifted_out_of_data() {
        let output = ToolOutput {
            stdout: "ok".to_string(),
            stderr: String::new(),
            warning: Some("session only".to_string()),
        };

        let reply = Reply::from(output);

        assert_eq!(reply.warning.as_deref(), Some("session only"));
        let Payload::Output(output) = reply.data else {
            panic!("expected tool output");
        };
        assert!(output.warning.is_none());
    }

    #[tokio::test]
    async fn nothing_found_becomes_empty_data_with_warning() {
        let runner = Arc::new(ScriptedRunner::new().succeed("no registries here\n"));

        let response = toolbox(runner)
            .respond(Request {
                id: serde_json::json!(1),
                operation: Operation::ListRegistries,
            })
            .await;

        assert_eq!(
            response,
            Response::data(
                serde_json::json!(1),
                Payload::empty_list(),
                Some("No npm registries found".to_string())
            )
        );
    }

    #[tokio::test]
    async fn installed_versions_come_back_as_records() {
        let runner = Arc::new(ScriptedRunner::new().succeed("-> v20.11.1\n   v18.19.0\n"));

        let reply = toolbox(runner)
            .dispatch(Operation::ListInstalledVersions)
            .await
            .unwrap();

        assert_eq!(
            reply.data,
            Payload::Versions(vec![
                VersionRecord::new("v20.11.1", true),
                VersionRecord::new("v18.19.0", false),
            ])
        );
    }

    #[tokio::test]
    async fn invalid_input_is_an_error_response() {
        let runner = Arc::new(ScriptedRunner::new());

        let response = toolbox(runner.clone())
            .respond(Request {
                id: serde_json::json!(9),
                operation: Operation::InstallVersion {
                    version: "rm -rf /".to_string(),
                },
            })
            .await;

        assert!(matches!(response, Response::Error { kind: "invalid-input", .. }));
        assert!(runner.calls().is_empty());
    }
}
