//! Container runtime abstraction.
//!
//! The orchestrator talks to the container daemon only through
//! [`ContainerRuntime`], which keeps the pull/run/cleanup sequencing testable
//! without a Docker socket.

use std::fmt;

use async_trait::async_trait;

use crate::sandbox::error::Result;

/// Default tag used when an image reference names none.
const DEFAULT_TAG: &str = "latest";

/// A parsed image reference (`repository[:tag]` or `repository@digest`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    repository: String,
    tag: String,
    digest: bool,
}

impl ImageRef {
    /// Parse a reference, defaulting the tag to `latest`.
    ///
    /// A registry port (`registry:5000/repo`) is not mistaken for a tag
    /// because only a colon after the last `/` separates a tag.
    pub fn parse(reference: &str) -> Self {
        if let Some((repository, digest)) = reference.split_once('@') {
            return Self {
                repository: repository.to_string(),
                tag: digest.to_string(),
                digest: true,
            };
        }

        let name_start = reference.rfind('/').map_or(0, |i| i + 1);
        match reference[name_start..].rfind(':') {
            Some(pos) => {
                let split = name_start + pos;
                Self {
                    repository: reference[..split].to_string(),
                    tag: reference[split + 1..].to_string(),
                    digest: false,
                }
            }
            None => Self {
                repository: reference.to_string(),
                tag: DEFAULT_TAG.to_string(),
                digest: false,
            },
        }
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Tag, or digest for digest-pinned references.
    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = if self.digest { '@' } else { ':' };
        write!(f, "{}{}{}", self.repository, separator, self.tag)
    }
}

/// What to run: one image, one argument vector.
///
/// Arguments are passed to the runtime as a discrete vector and are never
/// joined into a shell string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub image: ImageRef,
    pub argv: Vec<String>,
    pub memory_bytes: u64,
}

/// Runtime-assigned identity of a created container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHandle {
    pub id: String,
    pub image: String,
}

/// In-memory sink for container output with a hard byte bound.
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer {
    text: String,
    limit_bytes: usize,
    dropped_bytes: usize,
}

impl OutputBuffer {
    pub fn new(limit_bytes: usize) -> Self {
        Self {
            text: String::new(),
            limit_bytes,
            dropped_bytes: 0,
        }
    }

    /// Append a chunk of raw output. Invalid UTF-8 is replaced, bytes past
    /// the limit are counted and discarded.
    pub fn push(&mut self, chunk: &[u8]) {
        let decoded = String::from_utf8_lossy(chunk);
        let room = self.limit_bytes.saturating_sub(self.text.len());
        if decoded.len() <= room {
            self.text.push_str(&decoded);
            return;
        }

        let mut cut = room;
        while !decoded.is_char_boundary(cut) {
            cut -= 1;
        }
        self.text.push_str(&decoded[..cut]);
        self.dropped_bytes += decoded.len() - cut;
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Number of bytes discarded because the buffer was full.
    pub fn dropped_bytes(&self) -> usize {
        self.dropped_bytes
    }
}

/// Operations the orchestrator needs from a container daemon.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Whether the image is present locally.
    async fn image_exists(&self, image: &ImageRef) -> Result<bool>;

    /// Pull the image, consuming progress until the daemon reports completion.
    async fn pull_image(&self, image: &ImageRef) -> Result<()>;

    /// Create (but do not start) a container from `spec`.
    async fn create_container(&self, spec: &ContainerSpec) -> Result<ContainerHandle>;

    /// Start the container, collect its output into `output` and return its
    /// exit code once it stops.
    async fn run_to_completion(
        &self,
        container: &ContainerHandle,
        output: &mut OutputBuffer,
    ) -> Result<i64>;

    /// Force-remove the container, killing it first if it is still running.
    async fn remove_container(&self, container: &ContainerHandle) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_ref_defaults_to_latest() {
        let image = ImageRef::parse("sherlockproject/sherlock");
        assert_eq!(image.repository(), "sherlockproject/sherlock");
        assert_eq!(image.tag(), "latest");
        assert_eq!(image.to_string(), "sherlockproject/sherlock:latest");
    }

    #[test]
    fn test_image_ref_explicit_tag() {
        let image = ImageRef::parse("smicallef/spiderfoot:v4.0");
        assert_eq!(image.repository(), "smicallef/spiderfoot");
        assert_eq!(image.tag(), "v4.0");
    }

    #[test]
    fn test_image_ref_registry_port_is_not_a_tag() {
        let image = ImageRef::parse("registry.local:5000/osint/sherlock");
        assert_eq!(image.repository(), "registry.local:5000/osint/sherlock");
        assert_eq!(image.tag(), "latest");

        let image = ImageRef::parse("registry.local:5000/osint/sherlock:1.2");
        assert_eq!(image.repository(), "registry.local:5000/osint/sherlock");
        assert_eq!(image.tag(), "1.2");
    }

    #[test]
    fn test_image_ref_digest() {
        let image = ImageRef::parse("alpine@sha256:abcdef");
        assert_eq!(image.repository(), "alpine");
        assert_eq!(image.tag(), "sha256:abcdef");
        assert_eq!(image.to_string(), "alpine@sha256:abcdef");
    }

    #[test]
    fn test_output_buffer_collects_chunks() {
        let mut buffer = OutputBuffer::new(1024);
        buffer.push(b"[+] GitHub: ");
        buffer.push(b"https://github.com/john_doe\n");
        assert_eq!(buffer.as_str(), "[+] GitHub: https://github.com/john_doe\n");
        assert_eq!(buffer.dropped_bytes(), 0);
    }

    #[test]
    fn test_output_buffer_enforces_limit() {
        let mut buffer = OutputBuffer::new(8);
        buffer.push(b"0123456789");
        buffer.push(b"abc");
        assert_eq!(buffer.as_str(), "01234567");
        assert_eq!(buffer.dropped_bytes(), 5);
    }

    #[test]
    fn test_output_buffer_cuts_on_char_boundary() {
        let mut buffer = OutputBuffer::new(5);
        buffer.push("abcdé".as_bytes());
        buffer.push("é".as_bytes());
        assert_eq!(buffer.as_str(), "abcd");
        assert_eq!(buffer.as_str().len(), 4);
    }

    #[test]
    fn test_output_buffer_replaces_invalid_utf8() {
        let mut buffer = OutputBuffer::new(64);
        buffer.push(&[b'o', b'k', 0xff]);
        assert!(buffer.as_str().starts_with("ok"));
    }
}
