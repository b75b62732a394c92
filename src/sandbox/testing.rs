//! Recording container runtime for unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::sandbox::container::{
    ContainerHandle, ContainerRuntime, ContainerSpec, ImageRef, OutputBuffer,
};
use crate::sandbox::error::{Result, SandboxError};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Counts {
    pub image_checks: usize,
    pub pulls: usize,
    pub created: usize,
    pub runs: usize,
    pub removed: usize,
}

#[derive(Debug, Clone)]
enum RunBehavior {
    Exit { code: i64, output: String },
    Fail,
    Hang,
}

pub(crate) struct FakeRuntime {
    image_present: bool,
    pull_fails: bool,
    create_fails: bool,
    remove_fails: bool,
    run: RunBehavior,
    run_delay: Duration,
    create_delay: Duration,
    counts: Mutex<Counts>,
    specs: Mutex<Vec<ContainerSpec>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self {
            image_present: true,
            pull_fails: false,
            create_fails: false,
            remove_fails: false,
            run: RunBehavior::Exit {
                code: 0,
                output: "ok".to_string(),
            },
            run_delay: Duration::ZERO,
            create_delay: Duration::ZERO,
            counts: Mutex::new(Counts::default()),
            specs: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn missing_image(mut self) -> Self {
        self.image_present = false;
        self
    }

    pub fn failing_pull(mut self) -> Self {
        self.image_present = false;
        self.pull_fails = true;
        self
    }

    pub fn failing_create(mut self) -> Self {
        self.create_fails = true;
        self
    }

    pub fn failing_remove(mut self) -> Self {
        self.remove_fails = true;
        self
    }

    pub fn exiting(mut self, code: i64, output: impl Into<String>) -> Self {
        self.run = RunBehavior::Exit {
            code,
            output: output.into(),
        };
        self
    }

    pub fn failing_run(mut self) -> Self {
        self.run = RunBehavior::Fail;
        self
    }

    pub fn hanging(mut self) -> Self {
        self.run = RunBehavior::Hang;
        self
    }

    pub fn with_run_delay(mut self, delay: Duration) -> Self {
        self.run_delay = delay;
        self
    }

    /// Record the container as created, then stall before returning it.
    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = delay;
        self
    }

    pub fn counts(&self) -> Counts {
        *self.counts.lock().unwrap()
    }

    pub fn specs(&self) -> Vec<ContainerSpec> {
        self.specs.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn image_exists(&self, _image: &ImageRef) -> Result<bool> {
        self.counts.lock().unwrap().image_checks += 1;
        Ok(self.image_present)
    }

    async fn pull_image(&self, image: &ImageRef) -> Result<()> {
        self.counts.lock().unwrap().pulls += 1;
        if self.pull_fails {
            return Err(SandboxError::ImagePullFailed {
                image: image.to_string(),
                reason: "registry unreachable".to_string(),
            });
        }
        Ok(())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<ContainerHandle> {
        if self.create_fails {
            return Err(SandboxError::ContainerCreationFailed {
                reason: "daemon refused".to_string(),
            });
        }
        let created = {
            let mut counts = self.counts.lock().unwrap();
            counts.created += 1;
            counts.created
        };
        self.specs.lock().unwrap().push(spec.clone());
        if !self.create_delay.is_zero() {
            tokio::time::sleep(self.create_delay).await;
        }
        Ok(ContainerHandle {
            id: format!("fake-{}", created),
            image: spec.image.to_string(),
        })
    }

    async fn run_to_completion(
        &self,
        _container: &ContainerHandle,
        output: &mut OutputBuffer,
    ) -> Result<i64> {
        self.counts.lock().unwrap().runs += 1;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.run_delay.is_zero() {
            tokio::time::sleep(self.run_delay).await;
        }

        let result = match &self.run {
            RunBehavior::Exit { code, output: text } => {
                output.push(text.as_bytes());
                Ok(*code)
            }
            RunBehavior::Fail => Err(SandboxError::ContainerStartFailed {
                reason: "oci runtime error".to_string(),
            }),
            RunBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(0)
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn remove_container(&self, _container: &ContainerHandle) -> Result<()> {
        self.counts.lock().unwrap().removed += 1;
        if self.remove_fails {
            return Err(SandboxError::ExecutionFailed {
                reason: "removal in progress".to_string(),
            });
        }
        Ok(())
    }
}
