// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The build model: the job payload delivered by a runner's server and the
//! in-flight build state the supervisor tracks around it.

use crate::runner::RunnerConfig;
use crate::variables::{Variable, Variables};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

fn default_job_timeout() -> u64 {
    3600
}

/// Cache declaration attached to a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheDeclaration {
    #[serde(default)]
    pub paths: Vec<String>,
    /// Overrides the default `<name>/<ref>` cache group.
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub untracked: bool,
}

/// Artifact declaration attached to a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDeclaration {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub untracked: bool,
}

/// A job whose artifacts this build depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDependency {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artifacts_file: Option<String>,
}

/// The unit of work delivered by the network for one slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobPayload {
    pub id: u64,
    pub project_id: u64,
    /// Project name; used for the default cache group.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(default)]
    pub repo_url: String,
    #[serde(default)]
    pub ref_name: String,
    #[serde(default)]
    pub sha: String,
    #[serde(default)]
    pub before_sha: String,
    /// Tagged builds get no cache.
    #[serde(default)]
    pub tag: bool,
    #[serde(default)]
    pub allow_git_fetch: bool,
    #[serde(default = "default_job_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub variables: Variables,
    #[serde(default)]
    pub cache: Option<CacheDeclaration>,
    #[serde(default)]
    pub artifacts: Option<ArtifactDeclaration>,
    #[serde(default)]
    pub depends: Vec<JobDependency>,
}

/// Lifecycle state of a build, as reported to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildState {
    Pending,
    Running,
    Failed,
    Success,
}

impl BuildState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BuildState::Failed | BuildState::Success)
    }

    /// Wire name of the state, as the server reports and expects it.
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildState::Pending => "pending",
            BuildState::Running => "running",
            BuildState::Failed => "failed",
            BuildState::Success => "success",
        }
    }
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One in-flight build: the payload plus the state owned by its worker.
///
/// Mutated only by the worker driving it; the builds registry keeps its own
/// lightweight record for ID bookkeeping.
#[derive(Debug, Clone)]
pub struct Build {
    pub payload: JobPayload,
    pub runner: RunnerConfig,
    pub state: BuildState,

    /// Unique among all running builds in this process.
    pub global_id: usize,
    /// Unique among running builds on this runner.
    pub runner_id: usize,
    /// Unique among running builds on this runner and project.
    pub project_runner_id: usize,

    pub root_dir: PathBuf,
    pub build_dir: PathBuf,
    pub cache_dir: PathBuf,

    started_at: Option<Instant>,
    pub duration: Option<Duration>,
}

impl Build {
    pub fn new(payload: JobPayload, runner: RunnerConfig) -> Self {
        Self {
            payload,
            runner,
            state: BuildState::Pending,
            global_id: 0,
            runner_id: 0,
            project_runner_id: 0,
            root_dir: PathBuf::new(),
            build_dir: PathBuf::new(),
            cache_dir: PathBuf::new(),
            started_at: None,
            duration: None,
        }
    }

    /// Record the start of execution and derive the build/cache directories.
    pub fn start(&mut self, now: Instant, root_dir: &Path, cache_root: &Path, shared: bool) {
        self.started_at = Some(now);
        self.state = BuildState::Pending;
        self.root_dir = root_dir.to_path_buf();
        self.build_dir = root_dir.join(self.project_unique_dir(shared));
        self.cache_dir = cache_root.join(self.project_unique_dir(false));
    }

    /// Record the terminal state and total duration.
    pub fn finish(&mut self, state: BuildState, now: Instant) {
        self.state = state;
        self.duration = self.started_at.map(|started| now.duration_since(started));
    }

    /// `runner-<short>-project-<id>-concurrent-<n>`: unique name for
    /// containers, directories and the like.
    pub fn project_unique_name(&self) -> String {
        format!(
            "runner-{}-project-{}-concurrent-{}",
            self.runner.short_description(),
            self.payload.project_id,
            self.project_runner_id
        )
    }

    /// Path component derived from the repo URL, e.g.
    /// `https://host/group/repo.git` → `group/repo`.
    ///
    /// Returns `None` for URLs without a host or with suspicious paths;
    /// callers fall back to `project-<id>`.
    pub fn project_slug(&self) -> Option<String> {
        let rest = self.payload.repo_url.split_once("://").map(|(_, rest)| rest)?;
        let (host, path) = match rest.split_once('/') {
            Some((host, path)) => (host, path),
            None => (rest, ""),
        };
        if host.is_empty() {
            return None;
        }
        let path = path.strip_suffix(".git").unwrap_or(path);
        let mut segments = Vec::new();
        for segment in path.split('/') {
            match segment {
                "" | "." => continue,
                ".." => return None,
                other => segments.push(other),
            }
        }
        if segments.is_empty() {
            return None;
        }
        Some(segments.join("/"))
    }

    /// Directory for this project under the builds root.
    ///
    /// Shared builds roots get a `<runner-short>/<concurrent-id>/` prefix so
    /// parallel builds of one project cannot collide.
    pub fn project_unique_dir(&self, shared: bool) -> PathBuf {
        let dir = self
            .project_slug()
            .unwrap_or_else(|| format!("project-{}", self.payload.project_id));
        if shared {
            PathBuf::from(self.runner.short_description())
                .join(self.project_runner_id.to_string())
                .join(dir)
        } else {
            PathBuf::from(dir)
        }
    }

    /// Cache archive path for the given ref, honoring the job's cache group
    /// override. `None` when caching is not configured for this build.
    pub fn cache_file_for_ref(&self, ref_name: &str) -> Option<PathBuf> {
        if self.cache_dir.as_os_str().is_empty() {
            return None;
        }
        let group = match self.payload.cache.as_ref().and_then(|c| c.group.as_deref()) {
            Some(group) if !group.is_empty() => group.to_string(),
            _ => format!("{}/{}", self.payload.name, ref_name),
        };
        Some(self.cache_dir.join(group).join("cache.tgz"))
    }

    /// Cache archive path for this build's ref; tagged builds get none.
    pub fn cache_file(&self) -> Option<PathBuf> {
        if self.payload.tag {
            return None;
        }
        self.cache_file_for_ref(&self.payload.ref_name)
    }

    /// Variables the agent injects into every build.
    pub fn default_variables(&self) -> Variables {
        vec![
            Variable::internal("CI", "true"),
            Variable::internal("CI_BUILD_ID", self.payload.id.to_string()),
            Variable::internal("CI_BUILD_REF", self.payload.sha.as_str()),
            Variable::internal("CI_BUILD_BEFORE_SHA", self.payload.before_sha.as_str()),
            Variable::internal("CI_BUILD_REF_NAME", self.payload.ref_name.as_str()),
            Variable::internal("CI_BUILD_REPO", self.payload.repo_url.as_str()),
            Variable::internal("CI_PROJECT_ID", self.payload.project_id.to_string()),
            Variable::internal("CI_PROJECT_DIR", self.build_dir.display().to_string()),
            Variable::internal("CI_SERVER", "yes"),
            Variable::internal("CI_SERVER_NAME", "Legwork"),
        ]
        .into()
    }

    /// Full variable set: runner environment, then agent defaults, then job
    /// variables, expanded in that order so job values win.
    pub fn all_variables(&self) -> Variables {
        let mut vars = self.runner.variables();
        vars.extend(self.default_variables());
        vars.extend(self.payload.variables.clone());
        vars.expand()
    }
}

#[cfg(test)]
#[path = "build_tests.rs"]
mod tests;
