// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use crate::error::{Error, Result};
use crate::path;
use serde::{Deserialize, Serialize};

pub const SCHEME: &str = "pach";
pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 80;

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// The remote namespace an adapter is bound to.
///
/// Fixed once an adapter is built from it; every operation is relative to
/// this (project, repo, branch) on this server.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoLocation {
    project: String,
    repo: String,
    branch: String,
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default, skip_serializing)]
    auth_token: String,
}

impl RepoLocation {
    pub fn new<P, R, B>(project: P, repo: R, branch: B) -> Result<Self>
    where
        P: Into<String>,
        R: Into<String>,
        B: Into<String>,
    {
        let location = Self {
            project: project.into(),
            repo: repo.into(),
            branch: branch.into(),
            host: default_host(),
            port: default_port(),
            auth_token: String::new(),
        };
        location.validate()?;
        Ok(location)
    }

    #[must_use]
    pub fn with_host<S: Into<String>>(mut self, host: S) -> Self {
        self.host = host.into();
        self
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_auth_token<S: Into<String>>(mut self, token: S) -> Self {
        self.auth_token = token.into();
        self
    }

    /// Check the namespace components; used after deserializing too.
    pub fn validate(&self) -> Result<()> {
        for (what, value) in [
            ("project", &self.project),
            ("repo", &self.repo),
            ("branch", &self.branch),
        ] {
            if value.is_empty() {
                return Err(Error::Config(format!("{what} name must not be empty")));
            }
            if value.contains(['/', '@', ':', '\0']) {
                return Err(Error::Config(format!("invalid {what} name '{value}'")));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn project(&self) -> &str {
        &self.project
    }

    #[must_use]
    pub fn repo(&self) -> &str {
        &self.repo
    }

    #[must_use]
    pub fn branch(&self) -> &str {
        &self.branch
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub fn auth_token(&self) -> &str {
        &self.auth_token
    }

    /// `project/repo@branch`, the form Pachyderm uses for branch URIs.
    #[must_use]
    pub fn branch_uri(&self) -> String {
        format!("{}/{}@{}", self.project, self.repo, self.branch)
    }
}

impl std::fmt::Debug for RepoLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepoLocation")
            .field("project", &self.project)
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("auth_token", &if self.auth_token.is_empty() { "" } else { "***" })
            .finish()
    }
}

impl std::fmt::Display for RepoLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.branch_uri())
    }
}

/// A parsed `pach://<project>/<repo>@<branch>:/<path>?host=..&port=..&auth_token=..` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PachUrl {
    pub scheme: String,
    pub location: RepoLocation,
    /// Normalized directory inside the repository the filesystem is rooted at
    pub dir_path: String,
}

impl PachUrl {
    /// Parse without touching the network. Any malformed component fails with
    /// `InvalidUrl`.
    pub fn parse(url: &str) -> Result<Self> {
        let (scheme, rest) = split_scheme(url)?;

        let (body, query) = match rest.split_once('?') {
            Some((body, query)) => (body, Some(query)),
            None => (rest, None),
        };

        let (repo_part, resource) = body
            .split_once('@')
            .ok_or_else(|| Error::invalid_url(url, "expected <project>/<repo>@<branch>"))?;

        let (project, repo) = repo_part
            .split_once('/')
            .ok_or_else(|| Error::invalid_url(url, "missing project name"))?;

        let (branch, dir_path) = match resource.split_once(':') {
            Some((branch, dir_path)) => (branch, dir_path),
            None => (resource, "/"),
        };

        if project.is_empty() || repo.is_empty() || branch.is_empty() {
            return Err(Error::invalid_url(
                url,
                "project, repo and branch must all be named",
            ));
        }

        let mut location = RepoLocation::new(project, repo, branch)
            .map_err(|e| Error::invalid_url(url, e.to_string()))?;

        if let Some(query) = query {
            for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
                match key.as_ref() {
                    "host" => location.host = value.into_owned(),
                    "port" => {
                        location.port = value
                            .parse()
                            .map_err(|_| Error::invalid_url(url, format!("invalid port '{value}'")))?;
                    }
                    "auth_token" => location.auth_token = value.into_owned(),
                    _ => {}
                }
            }
        }

        let dir_path = path::normalize(if dir_path.is_empty() { "/" } else { dir_path })
            .map_err(|e| Error::invalid_url(url, e.to_string()))?;

        Ok(Self {
            scheme: scheme.to_string(),
            location,
            dir_path,
        })
    }
}

/// Split `scheme://rest`; the scheme is lowercased.
pub(crate) fn split_scheme(url: &str) -> Result<(String, &str)> {
    let (scheme, rest) = url
        .split_once("://")
        .ok_or_else(|| Error::invalid_url(url, "missing '<scheme>://'"))?;
    let valid = !scheme.is_empty()
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !valid {
        return Err(Error::invalid_url(url, format!("invalid scheme '{scheme}'")));
    }
    Ok((scheme.to_ascii_lowercase(), rest))
}

impl std::fmt::Display for PachUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}://{}:{}?host={}&port={}",
            self.scheme,
            self.location.branch_uri(),
            self.dir_path,
            self.location.host,
            self.location.port
        )
    }
}
