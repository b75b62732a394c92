//! Docker implementation of [`ContainerRuntime`] on top of bollard.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use bollard::Docker;
use bollard::container::{
    Config, CreateContainerOptions, LogOutput, LogsOptions, RemoveContainerOptions,
    StartContainerOptions, WaitContainerOptions,
};
use bollard::errors::Error as BollardError;
use bollard::image::CreateImageOptions;
use bollard::models::HostConfig;
use futures::StreamExt;

use crate::sandbox::container::{
    ContainerHandle, ContainerRuntime, ContainerSpec, ImageRef, OutputBuffer,
};
use crate::sandbox::error::{Result, SandboxError};

/// Seconds bollard waits on a single daemon request.
const DOCKER_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Label set on every container this process creates.
const MANAGED_LABEL: &str = "toolgate.managed";

/// Process-count ceiling inside a tool container.
const PIDS_LIMIT: i64 = 256;

/// Connect to the Docker daemon, either through an explicit socket path or
/// the platform defaults (`DOCKER_HOST`, `/var/run/docker.sock`).
pub fn connect_docker(socket: Option<&Path>) -> Result<Docker> {
    let connected = match socket {
        Some(path) => Docker::connect_with_socket(
            &path.to_string_lossy(),
            DOCKER_REQUEST_TIMEOUT_SECS,
            bollard::API_DEFAULT_VERSION,
        ),
        None => Docker::connect_with_local_defaults(),
    };

    connected.map_err(|e| SandboxError::DockerNotAvailable {
        reason: e.to_string(),
    })
}

/// Container runtime backed by the Docker Engine API.
#[derive(Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// Connect using [`connect_docker`].
    pub fn connect(socket: Option<&Path>) -> Result<Self> {
        connect_docker(socket).map(Self::new)
    }

    /// Check that the daemon answers.
    pub async fn ping(&self) -> Result<()> {
        self.docker
            .ping()
            .await
            .map(|_| ())
            .map_err(|e| SandboxError::DockerNotAvailable {
                reason: e.to_string(),
            })
    }
}

fn is_not_found(err: &BollardError) -> bool {
    matches!(
        err,
        BollardError::DockerResponseServerError {
            status_code: 404,
            ..
        }
    )
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn image_exists(&self, image: &ImageRef) -> Result<bool> {
        match self.docker.inspect_image(&image.to_string()).await {
            Ok(_) => Ok(true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn pull_image(&self, image: &ImageRef) -> Result<()> {
        let options = CreateImageOptions {
            from_image: image.repository().to_string(),
            tag: image.tag().to_string(),
            ..Default::default()
        };

        let mut progress = self.docker.create_image(Some(options), None, None);
        while let Some(event) = progress.next().await {
            let info = event.map_err(|e| SandboxError::ImagePullFailed {
                image: image.to_string(),
                reason: e.to_string(),
            })?;
            if let Some(status) = info.status.as_deref() {
                tracing::trace!(image = %image, status, "Pull progress");
            }
        }

        Ok(())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<ContainerHandle> {
        let name = format!("toolgate-{}", uuid::Uuid::new_v4().simple());
        let image = spec.image.to_string();

        let host_config = HostConfig {
            memory: Some(i64::try_from(spec.memory_bytes).unwrap_or(i64::MAX)),
            cap_drop: Some(vec!["ALL".to_string()]),
            security_opt: Some(vec!["no-new-privileges".to_string()]),
            pids_limit: Some(PIDS_LIMIT),
            auto_remove: Some(false),
            ..Default::default()
        };

        let config = Config {
            image: Some(image.clone()),
            cmd: Some(spec.argv.clone()),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            tty: Some(false),
            labels: Some(HashMap::from([(
                MANAGED_LABEL.to_string(),
                "true".to_string(),
            )])),
            host_config: Some(host_config),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: name.clone(),
            platform: None,
        };

        let created = self
            .docker
            .create_container(Some(options), config)
            .await
            .map_err(|e| SandboxError::ContainerCreationFailed {
                reason: e.to_string(),
            })?;

        for warning in &created.warnings {
            tracing::warn!(container = %name, warning = %warning, "Docker warning on create");
        }

        Ok(ContainerHandle {
            id: created.id,
            image,
        })
    }

    async fn run_to_completion(
        &self,
        container: &ContainerHandle,
        output: &mut OutputBuffer,
    ) -> Result<i64> {
        self.docker
            .start_container(&container.id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| SandboxError::ContainerStartFailed {
                reason: e.to_string(),
            })?;

        let options = LogsOptions::<String> {
            follow: true,
            stdout: true,
            stderr: true,
            tail: "all".to_string(),
            ..Default::default()
        };
        let mut logs = self.docker.logs(&container.id, Some(options));
        while let Some(chunk) = logs.next().await {
            match chunk {
                Ok(LogOutput::StdOut { message })
                | Ok(LogOutput::StdErr { message })
                | Ok(LogOutput::Console { message }) => output.push(&message),
                Ok(LogOutput::StdIn { .. }) => {}
                Err(e) => {
                    return Err(SandboxError::ExecutionFailed {
                        reason: format!("log stream failed: {}", e),
                    });
                }
            }
        }

        let options = WaitContainerOptions {
            condition: "not-running",
        };
        let mut wait = self.docker.wait_container(&container.id, Some(options));
        match wait.next().await {
            Some(Ok(response)) => Ok(response.status_code),
            // bollard reports non-zero exits as an error carrying the code.
            Some(Err(BollardError::DockerContainerWaitError { code, .. })) => Ok(code),
            Some(Err(e)) => Err(e.into()),
            None => Err(SandboxError::ExecutionFailed {
                reason: "wait stream ended without an exit status".to_string(),
            }),
        }
    }

    async fn remove_container(&self, container: &ContainerHandle) -> Result<()> {
        let options = RemoveContainerOptions {
            force: true,
            v: true,
            ..Default::default()
        };
        match self
            .docker
            .remove_container(&container.id, Some(options))
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if is_not_found(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_detection() {
        let err = BollardError::DockerResponseServerError {
            status_code: 404,
            message: "No such image: sherlockproject/sherlock:latest".to_string(),
        };
        assert!(is_not_found(&err));

        let err = BollardError::DockerResponseServerError {
            status_code: 500,
            message: "server error".to_string(),
        };
        assert!(!is_not_found(&err));
    }
}
