//! Input hardening for values that reach a container or host command.
//!
//! - [`sanitize`]: restricts a value to a fixed character class
//! - [`allowlist`]: static allow-lists for privileged service actions
//! - [`redaction`]: argument redaction before logging

pub mod allowlist;
pub mod redaction;

pub use allowlist::{ServiceAction, ServiceAllowlist, builtin_services};
pub use redaction::redact_arguments;

/// Character classes permitted in values handed to external programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    /// ASCII letters only.
    Alphabetic,
    /// ASCII letters, digits, `-` and `_`.
    Identifier,
    /// [`CharClass::Identifier`] plus `.`, `:`, `@` and `/`, enough for
    /// domains, IP addresses, CIDR ranges and e-mail addresses.
    Target,
}

impl CharClass {
    pub fn allows(self, c: char) -> bool {
        match self {
            Self::Alphabetic => c.is_ascii_alphabetic(),
            Self::Identifier => c.is_ascii_alphanumeric() || c == '-' || c == '_',
            Self::Target => {
                Self::Identifier.allows(c) || matches!(c, '.' | ':' | '@' | '/')
            }
        }
    }
}

/// Drop every character outside `class`. Idempotent.
pub fn sanitize(input: &str, class: CharClass) -> String {
    input.chars().filter(|c| class.allows(*c)).collect()
}
