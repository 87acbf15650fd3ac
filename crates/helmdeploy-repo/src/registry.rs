//! OCI registry push backends

use async_trait::async_trait;
use helmdeploy_core::{HelmCommand, HelmRunner};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::Result;
use crate::oci::NativeOciClient;
use crate::request::RegistryRequest;

/// Which backend pushes to OCI registries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryClientKind {
    /// `helm registry login` + `helm push`
    #[default]
    Helm,
    /// Built-in OCI distribution client
    Native,
}

/// Create the configured registry backend
pub fn create_registry_client(
    kind: RegistryClientKind,
    helm: Arc<dyn HelmRunner>,
    working_dir: impl Into<PathBuf>,
    insecure: bool,
) -> Arc<dyn RegistryClient> {
    match kind {
        RegistryClientKind::Helm => Arc::new(HelmRegistryClient::new(helm, working_dir)),
        RegistryClientKind::Native => Arc::new(NativeOciClient::new(insecure)),
    }
}

/// Pushes a packaged chart to an OCI registry
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Push the request's archive, returning the pushed reference
    async fn push(&self, request: &RegistryRequest) -> Result<String>;
}

/// Pushes through `helm registry login` + `helm push`
pub struct HelmRegistryClient {
    helm: Arc<dyn HelmRunner>,
    working_dir: PathBuf,
}

impl HelmRegistryClient {
    pub fn new(helm: Arc<dyn HelmRunner>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            helm,
            working_dir: working_dir.into(),
        }
    }
}

#[async_trait]
impl RegistryClient for HelmRegistryClient {
    async fn push(&self, request: &RegistryRequest) -> Result<String> {
        if let Some(creds) = &request.credentials {
            let login = HelmCommand::registry_login(
                &self.working_dir,
                &request.host,
                &creds.username,
                &creds.password,
            );
            self.helm.run(&login).await?;
        }

        let push = HelmCommand::push(&self.working_dir, &request.archive, &request.remote);
        self.helm.run(&push).await?;

        Ok(oci_tag_reference(request))
    }
}

/// `host/path/name:version` with `+` mapped to `_` the way helm tags charts
pub fn oci_tag_reference(request: &RegistryRequest) -> String {
    format!(
        "{}/{}:{}",
        request.remote.trim_start_matches("oci://"),
        request.chart.name,
        request.chart.version.replace('+', "_")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::Credentials;
    use helmdeploy_core::{ChartIdentity, HelmOutput};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingHelm {
        commands: Mutex<Vec<HelmCommand>>,
    }

    #[async_trait]
    impl HelmRunner for RecordingHelm {
        async fn run(&self, command: &HelmCommand) -> helmdeploy_core::Result<HelmOutput> {
            self.commands.lock().unwrap().push(command.clone());
            Ok(HelmOutput::default())
        }
    }

    fn request(credentials: Option<Credentials>) -> RegistryRequest {
        RegistryRequest {
            chart: ChartIdentity::new("foo", "1.0.0+build.1").unwrap(),
            archive: PathBuf::from("/t/helm/foo-1.0.0+build.1.tgz"),
            remote: "oci://ghcr.io/org".to_string(),
            host: "ghcr.io".to_string(),
            credentials,
        }
    }

    #[tokio::test]
    async fn test_login_then_push() {
        let helm = Arc::new(RecordingHelm::default());
        let client = HelmRegistryClient::new(helm.clone(), "/t/helm");

        let pushed = client
            .push(&request(Some(Credentials::new("bot", "token"))))
            .await
            .unwrap();
        assert_eq!(pushed, "ghcr.io/org/foo:1.0.0_build.1");

        let commands = helm.commands.lock().unwrap();
        let displays: Vec<_> = commands.iter().map(HelmCommand::display).collect();
        assert_eq!(
            displays,
            vec![
                "helm registry login ghcr.io --username bot --password-stdin",
                "helm push /t/helm/foo-1.0.0+build.1.tgz oci://ghcr.io/org"
            ]
        );
        assert_eq!(commands[0].stdin.as_deref(), Some("token"));
    }

    #[test]
    fn test_client_kind_names() {
        let kind: RegistryClientKind = serde_yaml::from_str("native").unwrap();
        assert_eq!(kind, RegistryClientKind::Native);
        assert_eq!(RegistryClientKind::default(), RegistryClientKind::Helm);
    }

    #[tokio::test]
    async fn test_anonymous_push_skips_login() {
        let helm = Arc::new(RecordingHelm::default());
        let client = HelmRegistryClient::new(helm.clone(), "/t/helm");
        client.push(&request(None)).await.unwrap();
        assert_eq!(helm.commands.lock().unwrap().len(), 1);
    }
}
