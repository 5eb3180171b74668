// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn runner() -> RunnerConfig {
    RunnerConfig {
        name: "test".into(),
        url: "https://ci.example.com".into(),
        token: "0123456789abcdef".into(),
        executor: "shell".into(),
        limit: 0,
        labels: vec![],
        environment: vec!["RUNNER_VAR=from-runner".into()],
        builds_dir: None,
        shared_builds_dir: false,
        cache_dir: None,
        shell: None,
    }
}

fn payload() -> JobPayload {
    JobPayload {
        id: 42,
        project_id: 7,
        name: "widget".into(),
        commands: vec!["echo hi".into()],
        repo_url: "https://git.example.com/group/widget.git".into(),
        ref_name: "main".into(),
        sha: "deadbeef".into(),
        before_sha: "cafebabe".into(),
        ..JobPayload::default()
    }
}

#[test]
fn project_slug_strips_git_suffix() {
    let build = Build::new(payload(), runner());
    assert_eq!(build.project_slug().as_deref(), Some("group/widget"));
}

#[test]
fn project_slug_rejects_hostless_and_dotdot_urls() {
    let mut p = payload();
    p.repo_url = ":///group/widget".into();
    assert_eq!(Build::new(p, runner()).project_slug(), None);

    let mut p = payload();
    p.repo_url = "https://git.example.com/group/../etc".into();
    assert_eq!(Build::new(p, runner()).project_slug(), None);

    let mut p = payload();
    p.repo_url = "https://git.example.com/".into();
    assert_eq!(Build::new(p, runner()).project_slug(), None);

    let mut p = payload();
    p.repo_url = "no-scheme-here".into();
    assert_eq!(Build::new(p, runner()).project_slug(), None);
}

#[test]
fn project_unique_dir_falls_back_to_project_id() {
    let mut p = payload();
    p.repo_url = "garbage".into();
    let build = Build::new(p, runner());
    assert_eq!(build.project_unique_dir(false), PathBuf::from("project-7"));
}

#[test]
fn project_unique_dir_shared_prefixes_runner_and_concurrency() {
    let mut build = Build::new(payload(), runner());
    build.project_runner_id = 2;
    assert_eq!(build.project_unique_dir(true), PathBuf::from("01234567/2/group/widget"));
}

#[test]
fn project_unique_name_includes_all_scopes() {
    let mut build = Build::new(payload(), runner());
    build.project_runner_id = 1;
    assert_eq!(build.project_unique_name(), "runner-01234567-project-7-concurrent-1");
}

#[test]
fn start_derives_directories() {
    let mut build = Build::new(payload(), runner());
    build.start(Instant::now(), Path::new("/builds"), Path::new("/cache"), false);
    assert_eq!(build.build_dir, PathBuf::from("/builds/group/widget"));
    assert_eq!(build.cache_dir, PathBuf::from("/cache/group/widget"));
    assert_eq!(build.state, BuildState::Pending);
}

#[test]
fn finish_records_duration() {
    let mut build = Build::new(payload(), runner());
    let t0 = Instant::now();
    build.start(t0, Path::new("/builds"), Path::new("/cache"), false);
    build.finish(BuildState::Success, t0 + Duration::from_secs(5));
    assert_eq!(build.state, BuildState::Success);
    assert_eq!(build.duration, Some(Duration::from_secs(5)));
}

#[test]
fn cache_file_uses_name_and_ref_by_default() {
    let mut build = Build::new(payload(), runner());
    build.start(Instant::now(), Path::new("/builds"), Path::new("/cache"), false);
    assert_eq!(
        build.cache_file(),
        Some(PathBuf::from("/cache/group/widget/widget/main/cache.tgz"))
    );
}

#[test]
fn cache_file_honors_group_override() {
    let mut p = payload();
    p.cache = Some(CacheDeclaration { group: Some("shared".into()), ..CacheDeclaration::default() });
    let mut build = Build::new(p, runner());
    build.start(Instant::now(), Path::new("/builds"), Path::new("/cache"), false);
    assert_eq!(build.cache_file(), Some(PathBuf::from("/cache/group/widget/shared/cache.tgz")));
}

#[test]
fn tagged_builds_have_no_cache() {
    let mut p = payload();
    p.tag = true;
    let mut build = Build::new(p, runner());
    build.start(Instant::now(), Path::new("/builds"), Path::new("/cache"), false);
    assert_eq!(build.cache_file(), None);
}

#[test]
fn cache_file_requires_started_build() {
    let build = Build::new(payload(), runner());
    assert_eq!(build.cache_file(), None);
}

#[test]
fn default_variables_describe_the_job() {
    let mut build = Build::new(payload(), runner());
    build.start(Instant::now(), Path::new("/builds"), Path::new("/cache"), false);
    let vars = build.default_variables();
    assert_eq!(vars.get("CI"), Some("true"));
    assert_eq!(vars.get("CI_BUILD_ID"), Some("42"));
    assert_eq!(vars.get("CI_BUILD_REF"), Some("deadbeef"));
    assert_eq!(vars.get("CI_PROJECT_DIR"), Some("/builds/group/widget"));
}

#[test]
fn all_variables_lets_job_values_win() {
    let mut p = payload();
    p.variables.push(Variable::new("RUNNER_VAR", "from-job"));
    p.variables.push(Variable::new("DERIVED", "id-$CI_BUILD_ID"));
    let build = Build::new(p, runner());
    let vars = build.all_variables();
    assert_eq!(vars.get("RUNNER_VAR"), Some("from-job"));
    assert_eq!(vars.get("DERIVED"), Some("id-42"));
}

#[test]
fn build_state_names() {
    assert_eq!(BuildState::Pending.as_str(), "pending");
    assert_eq!(BuildState::Running.to_string(), "running");
    assert_eq!(BuildState::Success.to_string(), "success");
    assert!(BuildState::Failed.is_terminal());
    assert!(!BuildState::Running.is_terminal());
}
