use dunamai::vcs::{from_vcs_with, CommandOutput, MockRunner};
use dunamai::{ui, Concern, DunamaiError, Vcs, VcsOptions};
use std::path::Path;

// ============================================================================
// Concern Display Tests
// ============================================================================

#[test]
fn test_shallow_concern_display() {
    let msg = Concern::ShallowRepository.to_string();
    assert!(
        msg.contains("shallow repository"),
        "Message should contain 'shallow repository', got: {}",
        msg
    );
    assert!(
        msg.contains("may not produce the correct version"),
        "Message should explain the consequence, got: {}",
        msg
    );
}

#[test]
fn test_concern_warning_formatting() {
    let line = ui::format_warning(&Concern::ShallowRepository.to_string());
    let plain = console::strip_ansi_codes(&line);
    assert!(
        plain.starts_with("⚠ WARNING:"),
        "Warning should start with the warning prefix, got: {}",
        plain
    );
}

#[test]
fn test_concern_serializes_by_name() {
    let json = serde_json::to_string(&Concern::ShallowRepository).unwrap();
    assert_eq!(json, "\"ShallowRepository\"");
    let back: Concern = serde_json::from_str(&json).unwrap();
    assert_eq!(back, Concern::ShallowRepository);
}

// ============================================================================
// Concern Propagation Tests
// ============================================================================

fn shallow_repo() -> MockRunner {
    MockRunner::new()
        .with("git status", "")
        .with("git rev-parse --is-shallow-repository", "true\n")
        .with_output(
            "git symbolic-ref --short HEAD",
            CommandOutput::failed(128, "fatal: ref HEAD is not a symbolic ref"),
        )
        .with("git log -n 1 --format=%H %h", "abcdef0123456789 abcdef0")
        .with(
            "git -c log.showsignature=false log -n 1 --pretty=format:%cI",
            "2024-01-01T00:00:00Z",
        )
        .with("git status --porcelain", "")
        .with(
            "git for-each-ref refs/tags/** --merged HEAD --format %(refname)@{%(objectname)@{%(creatordate:iso-strict)@{%(*committerdate:iso-strict)@{%(taggerdate:iso-strict)",
            "refs/tags/v1.0.0@{abcdef0123456789@{2024-01-01T00:00:00Z@{@{\n",
        )
        .with("git rev-list --count refs/tags/v1.0.0..HEAD", "0")
}

#[test]
fn test_shallow_concern_reported_on_version() {
    let version = from_vcs_with(
        &shallow_repo(),
        Vcs::Git,
        &VcsOptions::default(),
        Path::new("/repo"),
    )
    .unwrap();
    assert_eq!(version.base, vec![1, 0, 0]);
    assert!(
        version.concerns.contains(&Concern::ShallowRepository),
        "Version should carry the shallow concern, got: {:?}",
        version.concerns
    );
}

#[test]
fn test_shallow_concern_fatal_when_strict() {
    let options = VcsOptions {
        strict: true,
        ..VcsOptions::default()
    };
    let err = from_vcs_with(&shallow_repo(), Vcs::Git, &options, Path::new("/repo")).unwrap_err();
    assert!(
        matches!(err, DunamaiError::ShallowRepository),
        "Strict mode should turn the concern into an error, got: {}",
        err
    );
}
