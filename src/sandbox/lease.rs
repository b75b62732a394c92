//! Scoped ownership of a single tool container.
//!
//! A [`ContainerLease`] is created together with its container and removes
//! it exactly once: through [`ContainerLease::release`] on the normal path,
//! or from `Drop` when the owning future is cancelled before release.
//!
//! Creation runs in its own task and hands the finished lease over a
//! oneshot channel. If the caller is cancelled mid-create, the lease is
//! dropped unreceived and its container is still removed.

use std::sync::Arc;

use tokio::sync::oneshot;

use crate::sandbox::container::{ContainerHandle, ContainerRuntime, ContainerSpec, OutputBuffer};
use crate::sandbox::error::{Result, SandboxError};

pub struct ContainerLease {
    runtime: Arc<dyn ContainerRuntime>,
    container: ContainerHandle,
    released: bool,
}

impl ContainerLease {
    /// Create the container and take ownership of it.
    pub async fn acquire(runtime: Arc<dyn ContainerRuntime>, spec: &ContainerSpec) -> Result<Self> {
        let (tx, rx) = oneshot::channel();
        let spec = spec.clone();
        tokio::spawn(async move {
            let created = runtime.create_container(&spec).await;
            let created = created.map(|container| {
                tracing::debug!(
                    container = %container.id,
                    image = %container.image,
                    "Container created"
                );
                Self {
                    runtime,
                    container,
                    released: false,
                }
            });
            // An unreceived lease is dropped here or with the channel.
            let _ = tx.send(created);
        });

        rx.await
            .map_err(|_| SandboxError::ContainerCreationFailed {
                reason: "create task ended without a result".to_string(),
            })?
    }

    /// Start the container and wait for it to stop.
    pub async fn run(&self, output: &mut OutputBuffer) -> Result<i64> {
        self.runtime
            .run_to_completion(&self.container, output)
            .await
    }

    /// Remove the container. Failures are logged, never returned, so they
    /// cannot mask the execution result.
    pub async fn release(mut self) {
        self.released = true;
        remove_logged(self.runtime.as_ref(), &self.container).await;
    }
}

impl Drop for ContainerLease {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        let runtime = Arc::clone(&self.runtime);
        let container = self.container.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::warn!(
                    container = %container.id,
                    "Container lease dropped before release, scheduling removal"
                );
                handle.spawn(async move {
                    remove_logged(runtime.as_ref(), &container).await;
                });
            }
            Err(_) => {
                tracing::error!(
                    container = %container.id,
                    "Container lease dropped outside a runtime; container leaked"
                );
            }
        }
    }
}

async fn remove_logged(runtime: &dyn ContainerRuntime, container: &ContainerHandle) {
    match runtime.remove_container(container).await {
        Ok(()) => tracing::debug!(container = %container.id, "Container removed"),
        Err(e) => tracing::warn!(
            container = %container.id,
            error = %e,
            "Failed to remove container"
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::sandbox::container::ImageRef;
    use crate::sandbox::testing::FakeRuntime;

    async fn wait_for_removal(fake: &FakeRuntime, expected: usize) {
        for _ in 0..50 {
            if fake.counts().removed == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    fn spec() -> ContainerSpec {
        ContainerSpec {
            image: ImageRef::parse("sherlockproject/sherlock"),
            argv: vec!["john_doe".to_string(), "--no-color".to_string()],
            memory_bytes: 64 * 1024 * 1024,
        }
    }

    #[tokio::test]
    async fn test_release_removes_exactly_once() {
        let fake = Arc::new(FakeRuntime::new());
        let lease = ContainerLease::acquire(fake.clone(), &spec()).await.unwrap();
        lease.release().await;

        assert_eq!(fake.counts().created, 1);
        assert_eq!(fake.counts().removed, 1);
    }

    #[tokio::test]
    async fn test_drop_without_release_schedules_removal() {
        let fake = Arc::new(FakeRuntime::new());
        let lease = ContainerLease::acquire(fake.clone(), &spec()).await.unwrap();
        drop(lease);

        wait_for_removal(&fake, 1).await;
        assert_eq!(fake.counts().removed, 1);
    }

    #[tokio::test]
    async fn test_cancel_during_create_removes_container() {
        let fake = Arc::new(FakeRuntime::new().with_create_delay(Duration::from_millis(100)));
        let spec = spec();
        let acquire = ContainerLease::acquire(fake.clone(), &spec);
        assert!(
            tokio::time::timeout(Duration::from_millis(20), acquire)
                .await
                .is_err()
        );

        wait_for_removal(&fake, 1).await;
        assert_eq!(fake.counts().created, 1);
        assert_eq!(fake.counts().removed, 1);
    }

    #[tokio::test]
    async fn test_create_failure_is_returned() {
        let fake = Arc::new(FakeRuntime::new().failing_create());
        let result = ContainerLease::acquire(fake.clone(), &spec()).await;
        assert!(matches!(
            result,
            Err(SandboxError::ContainerCreationFailed { .. })
        ));
        assert_eq!(fake.counts().removed, 0);
    }

    #[tokio::test]
    async fn test_remove_failure_is_swallowed() {
        let fake = Arc::new(FakeRuntime::new().failing_remove());
        let lease = ContainerLease::acquire(fake.clone(), &spec()).await.unwrap();
        lease.release().await;
        assert_eq!(fake.counts().removed, 1);
    }
}
