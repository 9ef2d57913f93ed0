#![allow(clippy::module_name_repetitions)]
//! Remote registry access: tag existence checks over HTTP and awaited image pulls.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::StatusCode;
use url::Url;

use crate::errors::ToolchainError;
use crate::image::ImageReference;
use crate::util::exec::{ExecError, ExecRequest, ExecService, StdioMode};

pub const DEFAULT_REGISTRY_URL: &str = "https://registry.hub.docker.com";

/// Remote side of image resolution.
pub trait Registry {
    /// True when the registry reports the tag (HTTP 200); any other status means absent.
    /// Transport failures are `RegistryUnavailable`.
    fn tag_exists(&self, image: &ImageReference) -> Result<bool, ToolchainError>;

    /// Pull the image and return only once the pull has fully completed.
    fn pull(&self, image: &ImageReference) -> Result<(), ToolchainError>;
}

/// Where a repository lives and how its tags are queried.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RepositoryLocation {
    /// Docker Hub repository (official images live under `library/`).
    Hub { namespace: String, name: String },
    /// Repository on an explicit registry host (`host[:port]/path`).
    Explicit { host: String, path: String },
}

fn locate(repository: &str) -> RepositoryLocation {
    // An explicit registry is named by a first component containing '.' or ':' or "localhost".
    if let Some((first, rest)) = repository.split_once('/') {
        if first.contains('.') || first.contains(':') || first == "localhost" {
            return RepositoryLocation::Explicit {
                host: first.to_string(),
                path: rest.to_string(),
            };
        }
        return RepositoryLocation::Hub {
            namespace: first.to_string(),
            name: rest.to_string(),
        };
    }
    RepositoryLocation::Hub {
        namespace: "library".to_string(),
        name: repository.to_string(),
    }
}

/// Tag lookup URL for `image`, relative to the Docker Hub API base for hub repositories.
pub fn tag_url(hub_base: &Url, image: &ImageReference) -> Result<Url, ToolchainError> {
    let invalid = |e: url::ParseError| {
        ToolchainError::config(format!("invalid registry url for {image}: {e}"))
    };
    match locate(image.repository()) {
        RepositoryLocation::Hub { namespace, name } => {
            let base = hub_base.as_str().trim_end_matches('/');
            Url::parse(&format!(
                "{base}/v2/repositories/{namespace}/{name}/tags/{}/",
                image.tag()
            ))
            .map_err(invalid)
        }
        RepositoryLocation::Explicit { host, path } => {
            let scheme = if host == "localhost" || host.starts_with("localhost:") {
                "http"
            } else {
                "https"
            };
            Url::parse(&format!(
                "{scheme}://{host}/v2/{path}/manifests/{}",
                image.tag()
            ))
            .map_err(invalid)
        }
    }
}

/// 200 means the tag exists and other client errors mean it does not. Rate limiting and
/// server errors say nothing about the tag, so they are reported as unavailability.
fn classify_status(status: StatusCode) -> Result<bool, String> {
    if status == StatusCode::OK {
        Ok(true)
    } else if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        Err(format!("registry answered {status}"))
    } else {
        Ok(false)
    }
}

/// Docker Hub (or explicit v2 registry) lookups via HTTP; pulls via `docker pull`.
#[derive(Debug, Clone)]
pub struct DockerHubRegistry {
    http: reqwest::blocking::Client,
    base: Url,
    docker: PathBuf,
    exec: ExecService,
    pull_timeout: Duration,
}

impl DockerHubRegistry {
    pub fn new(
        base: &str,
        docker: PathBuf,
        request_timeout: Duration,
        pull_timeout: Duration,
    ) -> Result<Self, ToolchainError> {
        let base = Url::parse(base)
            .map_err(|e| ToolchainError::config(format!("invalid registry url '{base}': {e}")))?;
        let mut builder = reqwest::blocking::Client::builder().user_agent(concat!(
            "starknet-docker/",
            env!("CARGO_PKG_VERSION")
        ));
        if !request_timeout.is_zero() {
            builder = builder.timeout(request_timeout);
        }
        let http = builder
            .build()
            .map_err(|e| ToolchainError::RegistryUnavailable {
                image: base.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            http,
            base,
            docker,
            exec: ExecService::default(),
            pull_timeout,
        })
    }
}

impl Registry for DockerHubRegistry {
    #[tracing::instrument(level = "debug", skip_all, fields(image = %image))]
    fn tag_exists(&self, image: &ImageReference) -> Result<bool, ToolchainError> {
        let url = tag_url(&self.base, image)?;
        let response = self
            .http
            .get(url.clone())
            .header(
                reqwest::header::ACCEPT,
                "application/json, application/vnd.docker.distribution.manifest.v2+json",
            )
            .send()
            .map_err(|e| ToolchainError::RegistryUnavailable {
                image: image.canonical(),
                reason: e.to_string(),
            })?;
        let status = response.status();
        tracing::debug!(%url, status = status.as_u16(), "registry tag lookup");
        classify_status(status).map_err(|reason| ToolchainError::RegistryUnavailable {
            image: image.canonical(),
            reason,
        })
    }

    #[tracing::instrument(level = "info", skip_all, fields(image = %image))]
    fn pull(&self, image: &ImageReference) -> Result<(), ToolchainError> {
        let repo_tag = image.canonical();
        let request = ExecRequest::new(&self.docker)
            .arg("pull")
            .arg(&repo_tag)
            .stdio(StdioMode::Inherit);
        // `docker pull` exits only after the last layer is stored: exit 0 is the end of the
        // stream, a nonzero exit is the error event.
        match self.exec.run(request.timeout(self.pull_timeout)) {
            Ok(out) if out.status.success() => Ok(()),
            Ok(out) => Err(ToolchainError::PullFailed {
                image: repo_tag,
                reason: format!("docker pull exited with status {}", out.code()),
            }),
            Err(ExecError::TimedOut { after, .. }) => Err(ToolchainError::PullTimedOut {
                image: repo_tag,
                after,
            }),
            Err(e) => Err(ToolchainError::PullFailed {
                image: repo_tag,
                reason: e.to_string(),
            }),
        }
    }
}
