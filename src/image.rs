//! Container image identity.

use std::fmt;

use crate::errors::ToolchainError;

/// Docker image identified by repository and tag.
///
/// Both parts are non-empty; the canonical identity is `repository:tag`, which is what the
/// local image list is compared against and what gets passed to `docker run`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ImageReference {
    repository: String,
    tag: String,
}

impl ImageReference {
    pub fn new(
        repository: impl Into<String>,
        tag: impl Into<String>,
    ) -> Result<Self, ToolchainError> {
        let repository = hub_short_name(repository.into().trim()).to_string();
        let tag = tag.into().trim().to_string();
        if repository.is_empty() {
            return Err(ToolchainError::config("image repository must not be empty"));
        }
        if tag.is_empty() {
            return Err(ToolchainError::config(format!(
                "image tag for {repository} must not be empty"
            )));
        }
        Ok(Self { repository, tag })
    }

    /// Parse a `repository:tag` reference. The tag is split at the last ':' that follows
    /// the last '/', so registry host:port prefixes are kept in the repository.
    pub fn parse(reference: &str) -> Result<Self, ToolchainError> {
        let reference = reference.trim();
        let last_slash = reference.rfind('/').map(|i| i + 1).unwrap_or(0);
        match reference[last_slash..].rfind(':') {
            Some(i) => {
                let split = last_slash + i;
                Self::new(&reference[..split], &reference[split + 1..])
            }
            None => Err(ToolchainError::config(format!(
                "image reference '{reference}' must have the form repository:tag"
            ))),
        }
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Canonical `repository:tag` identity string.
    pub fn canonical(&self) -> String {
        format!("{}:{}", self.repository, self.tag)
    }

    /// Same repository with `suffix` appended to the tag (e.g. the `-arm` devnet variant).
    pub fn with_tag_suffix(&self, suffix: &str) -> Self {
        Self {
            repository: self.repository.clone(),
            tag: format!("{}{}", self.tag, suffix),
        }
    }
}

/// Docker Hub hosts that `docker image ls` never prints.
const HUB_HOSTS: [&str; 2] = ["docker.io/", "index.docker.io/"];

/// Strip an explicit Docker Hub host (and the `library/` namespace it implies) so the
/// repository matches what the local image list reports.
fn hub_short_name(repository: &str) -> &str {
    for host in HUB_HOSTS {
        if let Some(rest) = repository.strip_prefix(host) {
            return match rest.strip_prefix("library/") {
                Some(name) if !name.contains('/') => name,
                _ => rest,
            };
        }
    }
    repository
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}
