//! Allow-lists for the privileged service relay.
//!
//! Both the action and the target service must be listed before any host
//! process is spawned. The lists are built once at start-up and only read
//! afterwards.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::safety::{CharClass, sanitize};

/// Lifecycle actions accepted by the service relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceAction {
    Start,
    Stop,
    Restart,
}

impl ServiceAction {
    pub const ALL: [ServiceAction; 3] = [Self::Start, Self::Stop, Self::Restart];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
        }
    }

    pub fn past_tense(&self) -> &'static str {
        match self {
            Self::Start => "started",
            Self::Stop => "stopped",
            Self::Restart => "restarted",
        }
    }
}

impl fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceAction {
    type Err = String;

    /// Exact, case-sensitive match against the allow-list.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| format!("'{}' is not one of start, stop, restart", s))
    }
}

/// Services shipped with the newsroom stack.
pub fn builtin_services() -> Vec<&'static str> {
    vec![
        "ph-postgres",
        "ph-mariadb",
        "ph-portainer",
        "ph-glances",
        "ph-uptime-kuma",
        "ph-keycloak",
        "ph-n8n",
        "ph-gitea",
        "ph-ollama-engine",
        "ph-yemenjpt-ui",
        "ph-vector-db",
        "ph-langfuse-server",
        "ph-langfuse-ui",
        "ph-libretranslate",
        "ph-whisper-ui",
        "ph-mattermost",
        "ph-nextcloud",
        "ph-secure-browser",
        "ph-vaultwarden",
        "ph-searxng",
        "ph-spiderfoot",
        "ph-social-analyzer",
        "ph-changedetection",
        "ph-archivebox",
        "ph-meedan-check",
        "ph-languagetool",
        "ph-forensics",
        "ph-nocodb",
        "ph-internal-proxy",
        "yemenjpt_app",
        "ph-label-studio",
        "ph-azuracast",
        "ph-ghost",
        "ph-posteio",
        "ph-restreamer",
        "ph-mixpost",
        "ph-mongodb",
        "ph-evolution-api",
        "mcp-server",
    ]
}

/// Immutable set of service names the relay may act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAllowlist {
    services: BTreeSet<String>,
}

impl ServiceAllowlist {
    /// Build an allow-list. Every name must consist of identifier characters
    /// only; the first offending name is returned as the error.
    pub fn new<I, S>(names: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut services = BTreeSet::new();
        for name in names {
            let name = name.into();
            if name.is_empty() || sanitize(&name, CharClass::Identifier) != name {
                return Err(name);
            }
            services.insert(name);
        }
        Ok(Self { services })
    }

    /// The built-in newsroom service list.
    pub fn builtin() -> Self {
        Self {
            services: builtin_services().into_iter().map(String::from).collect(),
        }
    }

    /// Parse a comma-separated list, ignoring blanks around entries.
    pub fn from_csv(csv: &str) -> Result<Self, String> {
        Self::new(csv.split(',').map(str::trim).filter(|s| !s.is_empty()))
    }

    pub fn contains(&self, service: &str) -> bool {
        self.services.contains(service)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Sorted service names.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.services.iter().map(String::as_str)
    }
}

impl Default for ServiceAllowlist {
    fn default() -> Self {
        Self::builtin()
    }
}
