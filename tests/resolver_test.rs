// tests/resolver_test.rs
use scm_version::config::{VersionBranchType, VersionSettings};
use scm_version::domain::{BranchKind, DigitPos, NamingConfig};
use scm_version::git::{MockRepository, Repository};
use scm_version::resolver::{Resolution, VersionResolver};
use scm_version::warning::ResolutionWarning;

fn resolve(repo: &MockRepository, settings: &VersionSettings) -> Resolution {
    let naming = NamingConfig::default();
    VersionResolver::new(repo, &naming, settings).resolve()
}

fn short_id(id: &str) -> &str {
    &id[..8]
}

#[test]
fn test_minor_increment_on_changed_trunk() {
    let repo = MockRepository::new();
    let c1 = repo.commit("initial");
    repo.tag("RELEASE_2.3.1", &c1);
    repo.commit("change");

    let settings = VersionSettings {
        increment: Some(DigitPos::Minor),
        ..VersionSettings::default()
    };
    let resolution = resolve(&repo, &settings);

    assert_eq!(resolution.branch.kind, BranchKind::Trunk);
    assert!(resolution.resolved.changed);
    assert_eq!(resolution.pre_version.to_string(), "2.4.0");
    assert_eq!(resolution.version, "2.4.0-SNAPSHOT");
}

#[test]
fn test_trunk_increments_latest_component_by_default() {
    let repo = MockRepository::new();
    let c1 = repo.commit("initial");
    repo.tag("RELEASE_7.2.0", &c1);
    repo.commit("change");

    let resolution = resolve(&repo, &VersionSettings::default());
    assert_eq!(resolution.pre_version.to_string(), "7.3.0");
}

#[test]
fn test_unversioned_feature_branch_uses_major_only() {
    let repo = MockRepository::new();
    let c1 = repo.commit("initial");
    repo.tag("RELEASE_5.1.0", &c1);
    repo.checkout_branch("FB_unversioned");
    repo.commit("feature work");

    let resolution = resolve(&repo, &VersionSettings::default());
    assert_eq!(resolution.branch.kind, BranchKind::Feature);
    assert_eq!(resolution.pre_version.normal_version(), "5.0.0");
    assert_eq!(resolution.pre_version.branch_metadata(), Some("unversioned"));
    assert_eq!(resolution.version, "5.0.0-unversioned-SNAPSHOT");

    let major = VersionSettings {
        increment: Some(DigitPos::Major),
        ..VersionSettings::default()
    };
    let resolution = resolve(&repo, &major);
    assert_eq!(resolution.pre_version.normal_version(), "6.0.0");
}

#[test]
fn test_detached_dirty_head_without_tag() {
    let repo = MockRepository::new();
    let c1 = repo.commit("initial");
    repo.commit("second");
    repo.detach(&c1);
    repo.set_dirty(true);

    let resolution = resolve(&repo, &VersionSettings::default());
    assert_eq!(resolution.branch.kind, BranchKind::DetachedHead);
    assert_eq!(
        resolution.version,
        format!(
            "{}-rev.id.{}-SNAPSHOT",
            resolution.pre_version,
            short_id(&c1)
        )
    );
    assert_eq!(resolution.pre_version.to_string(), "0.0.0");
}

#[test]
fn test_clean_trunk_at_tag() {
    let repo = MockRepository::new();
    let c1 = repo.commit("initial");
    repo.tag("RELEASE_3.0.0", &c1);

    let resolution = resolve(&repo, &VersionSettings::default());
    assert_eq!(resolution.branch.kind, BranchKind::Tag);
    assert!(!resolution.resolved.changed);
    assert_eq!(resolution.version, "3.0.0");
}

#[test]
fn test_tags_resolve_unchanged_in_order() {
    let repo = MockRepository::new();
    let c1 = repo.commit("first release");
    repo.tag("RELEASE_1.0.0", &c1);
    let c2 = repo.commit("second release");
    repo.tag("RELEASE_2.0.0", &c2);

    let settings = VersionSettings::default();
    assert_eq!(resolve(&repo, &settings).version, "2.0.0");

    repo.detach(&c1);
    assert_eq!(resolve(&repo, &settings).version, "1.0.0");
}

#[test]
fn test_resolution_is_idempotent() {
    let repo = MockRepository::new();
    let c1 = repo.commit("initial");
    repo.tag("RELEASE_1.4.0", &c1);
    repo.commit("change");

    let settings = VersionSettings::default();
    let first = resolve(&repo, &settings);
    let second = resolve(&repo, &settings);
    assert_eq!(first.version, second.version);
    assert_eq!(first.pre_version, second.pre_version);
}

#[test]
fn test_stabilization_branch_uses_tag_of_its_release_line() {
    let repo = MockRepository::new();
    let c1 = repo.commit("initial");
    repo.tag("RELEASE_1.2.0", &c1);
    repo.tag("RELEASE_1.3.0", &c1);
    repo.checkout_branch("SB_1.2");
    repo.commit("fix");

    let resolution = resolve(&repo, &VersionSettings::default());
    assert_eq!(resolution.branch.kind, BranchKind::Stabilization);
    assert_eq!(resolution.resolved.version.to_string(), "1.2.0");
    assert_eq!(resolution.pre_version.to_string(), "1.2.1");
    assert_eq!(resolution.version, "1.2.1-SNAPSHOT");
}

#[test]
fn test_stabilization_version_from_branch() {
    let repo = MockRepository::new();
    repo.commit("initial");
    repo.checkout_branch("SB_1.2");
    repo.commit("stabilize");

    let settings = VersionSettings {
        version_branch_type: VersionBranchType::Branch,
        ..VersionSettings::default()
    };
    let resolution = resolve(&repo, &settings);
    assert_eq!(resolution.resolved.source_ref_name, "SB_1.2");
    assert!(resolution.resolved.from_branch_name);
    assert_eq!(resolution.pre_version.to_string(), "1.2.1");
}

#[test]
fn test_trunk_without_tags_uses_latest_stabilization_branch() {
    let repo = MockRepository::new();
    let c1 = repo.commit("initial");
    repo.create_branch_at("SB_1.1", &c1);
    let c2 = repo.commit("second");
    repo.create_branch_at("SB_1.3", &c2);
    repo.commit("third");

    let resolution = resolve(&repo, &VersionSettings::default());
    assert_eq!(resolution.branch.kind, BranchKind::Trunk);
    assert_eq!(resolution.resolved.version.to_string(), "1.3.0");
    assert_eq!(resolution.pre_version.to_string(), "1.4.0");
}

#[test]
fn test_continuous_release_appends_revision() {
    let repo = MockRepository::new();
    let c1 = repo.commit("initial");
    repo.tag("RELEASE_2.3.1", &c1);
    let c2 = repo.commit("change");

    let settings = VersionSettings {
        continuous_release: true,
        ..VersionSettings::default()
    };
    let resolution = resolve(&repo, &settings);
    assert_eq!(
        resolution.version,
        format!("2.3.2-rev.id.{}", short_id(&c2))
    );
}

#[test]
fn test_fetch_failure_is_a_warning() {
    let repo = MockRepository::new();
    let c1 = repo.commit("initial");
    repo.tag("RELEASE_1.0.0", &c1);
    repo.fail_fetch("connection refused");

    let resolution = resolve(&repo, &VersionSettings::default());
    assert_eq!(resolution.version, "1.0.0");
    assert!(!resolution.warnings.is_empty());
    assert!(repo.list_tags().is_ok());
}

#[test]
fn test_feature_name_ending_in_digits_stays_branch_metadata() {
    let repo = MockRepository::new();
    repo.commit("initial");
    repo.checkout_branch("FB_7.2-ISSUE42");
    repo.commit("feature work");

    let resolution = resolve(&repo, &VersionSettings::default());
    assert_eq!(resolution.branch.feature_name, "ISSUE42");
    assert_eq!(resolution.pre_version.branch_metadata(), Some("ISSUE42"));
    assert_eq!(resolution.pre_version.build_metadata(), None);
    assert_eq!(resolution.version, "7.0.0-ISSUE42-SNAPSHOT");
}

#[test]
fn test_feature_tag_with_digit_suffix_is_not_a_build_counter() {
    let repo = MockRepository::new();
    repo.commit("initial");
    repo.checkout_branch("FB_7.2-JIRA1234");
    let c2 = repo.commit("feature work");
    repo.tag("RELEASE_7.2.0-JIRA1234", &c2);
    repo.commit("more work");

    let settings = VersionSettings {
        major_version_only: false,
        ..VersionSettings::default()
    };
    let resolution = resolve(&repo, &settings);
    assert_eq!(resolution.resolved.version.branch_metadata(), Some("JIRA1234"));
    assert_eq!(resolution.pre_version.to_string(), "7.2.0-JIRA1234");
    assert_eq!(resolution.version, "7.2.0-JIRA1234-SNAPSHOT");
}

#[test]
fn test_branch_mode_prefers_head_tag_over_branches() {
    let repo = MockRepository::new();
    let c1 = repo.commit("initial");
    repo.tag("RELEASE_1.0.0", &c1);
    repo.create_branch_at("SB_1.1", &c1);

    let settings = VersionSettings {
        version_branch_type: VersionBranchType::Branch,
        ..VersionSettings::default()
    };
    let at_tag = resolve(&repo, &settings);
    assert_eq!(at_tag.branch.kind, BranchKind::Tag);
    assert_eq!(at_tag.version, "1.0.0");

    repo.commit("change");
    let after_tag = resolve(&repo, &settings);
    assert_eq!(after_tag.branch.kind, BranchKind::Trunk);
    assert!(!after_tag.resolved.is_default);
    assert_eq!(after_tag.resolved.version.to_string(), "1.1.0");
    assert_eq!(after_tag.pre_version.to_string(), "1.2.0");
    assert_eq!(after_tag.version, "1.2.0-SNAPSHOT");
}

#[test]
fn test_branch_listing_fetches_all_refs_first() {
    let repo = MockRepository::new();
    let c1 = repo.commit("initial");
    repo.create_branch_at("SB_2.1", &c1);
    repo.commit("change");

    let resolution = resolve(&repo, &VersionSettings::default());
    assert_eq!(resolution.pre_version.to_string(), "2.2.0");
    assert_eq!(repo.fetched(), vec!["tags", "all"]);

    repo.fail_fetch("connection refused");
    let offline = resolve(&repo, &VersionSettings::default());
    assert_eq!(offline.pre_version.to_string(), "2.2.0");
    let remote_warnings = offline
        .warnings
        .iter()
        .filter(|w| matches!(w, ResolutionWarning::RemoteUnavailable { .. }))
        .count();
    assert_eq!(remote_warnings, 2);
}

#[test]
fn test_full_versions_seed_and_increment_build_metadata() {
    let repo = MockRepository::new();
    repo.commit("initial");
    repo.checkout_branch("FB_7.2-login");
    let c2 = repo.commit("feature work");

    let settings = VersionSettings {
        major_version_only: false,
        default_build_metadata: "rc1".to_string(),
        ..VersionSettings::default()
    };
    let seeded = resolve(&repo, &settings);
    assert_eq!(seeded.pre_version.to_string(), "7.2.0-login-rc1");
    assert_eq!(seeded.version, "7.2.0-login-SNAPSHOT");

    repo.tag("RELEASE_7.2.0-login-rc1", &c2);
    repo.commit("more work");
    let incremented = resolve(&repo, &settings);
    assert_eq!(incremented.pre_version.to_string(), "7.2.0-login-rc2");
}

#[test]
fn test_build_extension_keeps_pre_version_metadata() {
    let repo = MockRepository::new();
    let c1 = repo.commit("initial");
    repo.tag("RELEASE_1.4.0", &c1);
    repo.commit("change");

    let settings = VersionSettings {
        use_build_extension: true,
        ..VersionSettings::default()
    };
    assert_eq!(resolve(&repo, &settings).version, "1.5.0-SNAPSHOT");

    repo.checkout_branch("FB_7.2-login");
    repo.commit("feature work");
    let settings = VersionSettings {
        use_build_extension: true,
        major_version_only: false,
        default_build_metadata: "rc1".to_string(),
        ..VersionSettings::default()
    };
    assert_eq!(resolve(&repo, &settings).version, "7.2.0-login-rc1-SNAPSHOT");
}

#[test]
fn test_continuous_release_branches_get_revision_extension() {
    let repo = MockRepository::new();
    repo.commit("initial");
    repo.checkout_branch("FB_7.2-login");
    let head = repo.commit("feature work");

    let listed = VersionSettings {
        continuous_release: true,
        continuous_release_branches: vec!["FB_7.2-login".to_string()],
        ..VersionSettings::default()
    };
    assert_eq!(
        resolve(&repo, &listed).version,
        format!("7.0.0-login-rev.id.{}", short_id(&head))
    );

    let feature_only = VersionSettings {
        continuous_release_branches: vec!["login".to_string()],
        ..listed.clone()
    };
    assert_eq!(resolve(&repo, &feature_only).version, "7.0.0-login-SNAPSHOT");

    let unlisted = VersionSettings {
        continuous_release_branches: Vec::new(),
        ..listed
    };
    assert_eq!(resolve(&repo, &unlisted).version, "7.0.0-login-SNAPSHOT");
}

#[test]
fn test_hotfix_branch_version_from_name() {
    let repo = MockRepository::new();
    let c1 = repo.commit("initial");
    repo.tag("RELEASE_1.0.0", &c1);
    repo.checkout_branch("HB_1.0-crash");
    repo.commit("fix crash");

    let resolution = resolve(&repo, &VersionSettings::default());
    assert_eq!(resolution.branch.kind, BranchKind::Hotfix);
    assert_eq!(resolution.resolved.version.to_string(), "1.0.0-crash");
    assert_eq!(resolution.version, "1.0.0-crash-SNAPSHOT");
}

#[test]
fn test_unversioned_bugfix_branch_uses_last_tag() {
    let repo = MockRepository::new();
    let c1 = repo.commit("initial");
    repo.tag("RELEASE_2.1.0", &c1);
    repo.checkout_branch("BB_typo");
    repo.commit("fix typo");

    let resolution = resolve(&repo, &VersionSettings::default());
    assert_eq!(resolution.branch.kind, BranchKind::Bugfix);
    assert!(resolution.resolved.from_branch_name);
    assert_eq!(resolution.pre_version.to_string(), "2.0.0-typo");
    assert_eq!(resolution.version, "2.0.0-typo-SNAPSHOT");
}

#[test]
fn test_disabled_scm_returns_initial_version_as_written() {
    let repo = MockRepository::new();
    repo.commit("initial");

    let settings = VersionSettings {
        disable_scm: true,
        initial_version: Some("1.2".to_string()),
        version_ext: Some("RELEASE".to_string()),
        ..VersionSettings::default()
    };
    assert_eq!(resolve(&repo, &settings).version, "1.2");
    assert!(repo.fetched().is_empty());
}
