/*!
Test support helpers shared across integration tests.

- have_git(): check git availability on PATH
- init_repo_with_default_user(dir): initialize a git repo with default identity
- setup_ci_repo(dir): repo with .circleci templates, generate.sh, and base branches
- add_bare_remote(work, name): bare repository wired up as a named remote

These helpers do not print skip messages themselves so tests can keep their
own "skipping: ..." outputs.
*/

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

#[allow(dead_code)]
pub const TEMPLATE_DTEST_REPO: &str = "https://github.com/apache/cassandra-dtest.git";

/// Return true if `git` is available on PATH.
#[allow(dead_code)]
pub fn have_git() -> bool {
    Command::new("git")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Run git in `dir`, asserting success.
#[allow(dead_code)]
pub fn git_ok(dir: &Path, args: &[&str]) {
    let st = Command::new("git")
        .args(args)
        .current_dir(dir)
        .stdout(Stdio::null())
        .stderr(Stdio::inherit())
        .status()
        .expect("spawn git");
    assert!(st.success(), "git {args:?} failed in {}", dir.display());
}

/// Run git in `dir`, returning raw Output.
#[allow(dead_code)]
pub fn git_out(dir: &Path, args: &[&str]) -> Output {
    Command::new("git")
        .args(args)
        .current_dir(dir)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("spawn git")
}

/// Initialize a git repository at `dir` and set a default user identity.
#[allow(dead_code)]
pub fn init_repo_with_default_user(dir: &Path) -> io::Result<()> {
    std::fs::create_dir_all(dir)?;
    git_ok(dir, &["init"]);
    git_ok(dir, &["config", "user.name", "DTest CI Test"]);
    git_ok(dir, &["config", "user.email", "dtest-ci@example.com"]);
    git_ok(dir, &["config", "commit.gpgsign", "false"]);
    Ok(())
}

/// Write the CircleCI template files and a generator stub, commit everything
/// on branch `trunk`, and create a second base branch `release-3.0`.
#[allow(dead_code)]
pub fn setup_ci_repo(work: &Path) -> PathBuf {
    init_repo_with_default_user(work).expect("init repo");
    let circleci = work.join(".circleci");
    std::fs::create_dir_all(&circleci).expect("mkdir .circleci");
    std::fs::write(
        circleci.join("config.yml"),
        format!(
            "env:\n  DTEST_REPO: {TEMPLATE_DTEST_REPO}\n  DTEST_BRANCH: trunk\n  REPEATED_DTEST_NAME:\n"
        ),
    )
    .expect("write config.yml");
    std::fs::write(
        circleci.join("config-2_1.yml"),
        "env:\n  REPEATED_DTEST_VNODES: false\n",
    )
    .expect("write config-2_1.yml");
    write_generator(&circleci, "printf '# generated\\n' >> config.yml\n");

    git_ok(work, &["add", "-A"]);
    git_ok(work, &["commit", "-m", "ci templates"]);
    git_ok(work, &["branch", "-M", "trunk"]);
    git_ok(work, &["branch", "release-3.0"]);
    circleci
}

/// (Re)write .circleci/generate.sh with the given body; the stub rejects any
/// invocation without the -m flag.
#[allow(dead_code)]
pub fn write_generator(circleci: &Path, body: &str) {
    let script = circleci.join("generate.sh");
    std::fs::write(
        &script,
        format!("#!/bin/sh\nset -e\n[ \"$1\" = \"-m\" ] || exit 2\n{body}"),
    )
    .expect("write generate.sh");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))
            .expect("chmod generate.sh");
    }
}

/// Create a bare repository next to `work` and register it as remote `name`.
#[allow(dead_code)]
pub fn add_bare_remote(work: &Path, name: &str) -> PathBuf {
    let bare = work
        .parent()
        .expect("work has parent")
        .join(format!("{name}.git"));
    std::fs::create_dir_all(&bare).expect("mkdir bare");
    git_ok(&bare, &["init", "--bare"]);
    git_ok(work, &["remote", "add", name, bare.to_str().expect("utf8 path")]);
    bare
}

/// True when `refs/heads/<name>` resolves in the repository at `dir`
/// (works for bare repositories too).
#[allow(dead_code)]
pub fn branch_exists(dir: &Path, name: &str) -> bool {
    git_out(dir, &["rev-parse", "--verify", &format!("refs/heads/{name}")])
        .status
        .success()
}

/// Subject line of the branch tip commit.
#[allow(dead_code)]
pub fn head_subject(dir: &Path, branch: &str) -> String {
    let out = git_out(dir, &["log", "-1", "--pretty=%s", branch]);
    assert!(out.status.success(), "git log failed for {branch}");
    String::from_utf8_lossy(&out.stdout).trim().to_string()
}

/// Name of the currently checked-out branch.
#[allow(dead_code)]
pub fn current_branch(dir: &Path) -> String {
    let out = git_out(dir, &["rev-parse", "--abbrev-ref", "HEAD"]);
    assert!(out.status.success(), "rev-parse HEAD failed");
    String::from_utf8_lossy(&out.stdout).trim().to_string()
}

/// SHA of HEAD.
#[allow(dead_code)]
pub fn head_sha(dir: &Path) -> String {
    let out = git_out(dir, &["rev-parse", "--verify", "HEAD"]);
    assert!(out.status.success(), "rev-parse HEAD failed");
    String::from_utf8_lossy(&out.stdout).trim().to_string()
}

/// File content at `<branch>:<path>` without checking the branch out.
#[allow(dead_code)]
pub fn show_file(dir: &Path, branch: &str, path: &str) -> String {
    let out = git_out(dir, &["show", &format!("{branch}:{path}")]);
    assert!(out.status.success(), "git show {branch}:{path} failed");
    String::from_utf8_lossy(&out.stdout).to_string()
}
