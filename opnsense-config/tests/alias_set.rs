use std::fs;
use std::path::{Path, PathBuf};

use opnsense_config::alias::{FirewallAlias, FirewallAliasSet, FirewallAliasType};
use opnsense_config::registry::Upsert;
use opnsense_config::ConfigError;
use pretty_assertions::assert_eq;
use tempfile::{tempdir, TempDir};
use xml_config_core::DiffEntry;

const VERSION: &str = "OPNsense 24.1";

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join(path)
}

fn scratch_config() -> (TempDir, PathBuf) {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("config.xml");
    fs::copy(fixture("fixtures/opnsense-config.xml"), &path).expect("copy fixture");
    (dir, path)
}

fn open(path: &Path) -> FirewallAliasSet {
    FirewallAliasSet::open(path, VERSION, None).expect("open aliases")
}

fn names(set: &FirewallAliasSet) -> Vec<&str> {
    set.aliases().iter().map(|a| a.name.as_str()).collect()
}

fn test_alias(content: &[&str]) -> FirewallAlias {
    FirewallAlias::new("test_alias", FirewallAliasType::Host)
        .with_content(content.iter().copied())
        .with_description("Test Alias")
}

#[test]
fn new_host_alias_is_saved_and_found_after_reopen() {
    let (_dir, path) = scratch_config();
    let mut set = open(&path);
    assert_eq!(names(&set), vec!["host_test", "network_test"]);

    let outcome = set
        .add_or_update(test_alias(&["8.8.8.8-9.9.9.9", "TestHost", "192.168.0.0"]))
        .expect("valid host alias");
    assert_eq!(outcome, Upsert::Created);
    assert!(set.changed().expect("changed"));
    assert!(set.save().expect("save"));

    let reopened = open(&path);
    let alias = reopened
        .find(&[("name", "test_alias")])
        .expect("find")
        .expect("alias present");
    assert_eq!(
        alias.content,
        vec!["8.8.8.8-9.9.9.9", "TestHost", "192.168.0.0"]
    );
    assert!(alias.enabled);
    assert!(!alias.counters);
    assert_eq!(alias.description.as_deref(), Some("Test Alias"));

    let uuids: Vec<&str> = reopened.aliases().iter().map(|a| a.uuid.as_str()).collect();
    assert_eq!(uuids.len(), 3);
    assert!(!alias.uuid.is_empty());
    assert_ne!(uuids[0], alias.uuid);
    assert_ne!(uuids[1], alias.uuid);
}

#[test]
fn invalid_entry_aborts_before_mutation() {
    let (_dir, path) = scratch_config();
    let mut set = open(&path);

    let err = set
        .add_or_update(test_alias(&["8.8.8.8-9.9.9.9", "192.168.0.0/24", "TestHost"]))
        .expect_err("network is not a host");
    match err {
        ConfigError::ContentValidation {
            entry, alias_type, ..
        } => {
            assert_eq!(entry, "192.168.0.0/24");
            assert_eq!(alias_type, FirewallAliasType::Host);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!set.changed().expect("changed"));
    assert!(!set.save().expect("save"));

    assert_eq!(names(&open(&path)), vec!["host_test", "network_test"]);
}

#[test]
fn update_keeps_uuid_and_length() {
    let (_dir, path) = scratch_config();
    let mut set = open(&path);
    let original = set.find_by_name("host_test").expect("host_test").uuid.clone();

    let update = FirewallAlias::new("host_test", FirewallAliasType::Host)
        .with_content(["10.0.0.1", "10.0.0.2"]);
    assert_ne!(update.uuid, original);
    assert_eq!(set.add_or_update(update).expect("update"), Upsert::Updated);

    assert_eq!(set.aliases().len(), 2);
    let alias = set.find_by_name("host_test").expect("host_test");
    assert_eq!(alias.uuid, original);
    assert_eq!(alias.content, vec!["10.0.0.1", "10.0.0.2"]);
    assert_eq!(alias.description, None);

    let diff = set.diff().expect("diff");
    assert!(diff
        .iter()
        .all(|entry| entry.path().starts_with("aliases/alias[host_test]")));
    assert!(diff.iter().any(|entry| matches!(
        entry,
        DiffEntry::Modified { path, .. } if path == "aliases/alias[host_test]/content"
    )));
}

#[test]
fn save_twice_writes_once() {
    let (_dir, path) = scratch_config();
    let mut set = open(&path);

    set.add_or_update(
        FirewallAlias::new("web_ports", FirewallAliasType::Port).with_content(["80", "443", "8000:8080"]),
    )
    .expect("ports");
    assert!(set.save().expect("first save"));
    let written = fs::read_to_string(&path).expect("read");

    assert!(!set.save().expect("second save"));
    assert_eq!(fs::read_to_string(&path).expect("read"), written);
    assert!(written.contains("<content>\n80\n443\n8000:8080\n</content>"));
}

#[test]
fn delete_by_name() {
    let (_dir, path) = scratch_config();
    let mut set = open(&path);

    assert!(set.delete("network_test"));
    assert!(!set.delete("network_test"));
    assert!(set.changed().expect("changed"));
    assert!(set.save().expect("save"));
    assert_eq!(names(&open(&path)), vec!["host_test"]);
}

#[test]
fn networkgroup_members_must_be_group_eligible_aliases() {
    let (_dir, path) = scratch_config();
    let mut set = open(&path);

    let err = set
        .add_or_update(
            FirewallAlias::new("nets", FirewallAliasType::NetworkGroup)
                .with_content(["network_test", "host_test"]),
        )
        .expect_err("host aliases cannot join a network group");
    assert!(matches!(
        err,
        ConfigError::ContentValidation { ref entry, .. } if entry == "host_test"
    ));
    assert_eq!(
        err.to_string(),
        "Entry host_test is not a type NetworkAlias or InternalAlias."
    );

    set.add_or_update(
        FirewallAlias::new("nets", FirewallAliasType::NetworkGroup).with_content(["network_test"]),
    )
    .expect("network member");

    let err = set
        .add_or_update(
            FirewallAlias::new("more_nets", FirewallAliasType::NetworkGroup)
                .with_content(["missing_alias"]),
        )
        .expect_err("unknown alias");
    assert!(matches!(
        err,
        ConfigError::ContentValidation { ref entry, .. } if entry == "missing_alias"
    ));
}

#[test]
fn opnvpngroup_entries_must_name_existing_groups() {
    let (_dir, path) = scratch_config();
    let mut set = open(&path);

    set.add_or_update(
        FirewallAlias::new("vpn", FirewallAliasType::OpnVpnGroup).with_content(["vpn_users"]),
    )
    .expect("known group");

    let err = set
        .add_or_update(
            FirewallAlias::new("vpn2", FirewallAliasType::OpnVpnGroup)
                .with_content(["vpn_users", "contractors"]),
        )
        .expect_err("unknown group");
    assert!(matches!(err, ConfigError::GroupNotFound { ref name } if name == "contractors"));
    assert!(set.find_by_name("vpn2").is_none());
}

#[test]
fn interface_is_checked_before_content_is_stored() {
    let (_dir, path) = scratch_config();
    let mut set = open(&path);

    let mut alias = FirewallAlias::new("v6_host", FirewallAliasType::DynIpv6Host).with_content(["::1000"]);
    alias.interface = Some("GUEST".to_string());
    let err = set.add_or_update(alias.clone()).expect_err("no GUEST interface");
    assert!(matches!(err, ConfigError::InterfaceNotFound { ref name } if name == "GUEST"));
    assert_eq!(err.to_string(), "interface GUEST was not found on the device");

    alias.interface = Some("LAN".to_string());
    assert_eq!(set.add_or_update(alias.clone()).expect("LAN exists"), Upsert::Created);

    alias.interface = Some("opt1".to_string());
    assert_eq!(set.add_or_update(alias.clone()).expect("identifier"), Upsert::Updated);

    alias.interface = Some("em1".to_string());
    assert!(matches!(
        set.check_interface("em1"),
        Err(ConfigError::InterfaceNotFound { .. })
    ));
    assert!(set.add_or_update(alias).is_err());
    assert_eq!(
        set.find_by_name("v6_host").and_then(|a| a.interface.as_deref()),
        Some("opt1")
    );
}

#[test]
fn unvalidated_types_accept_anything() {
    let (_dir, path) = scratch_config();
    let mut set = open(&path);

    for (name, alias_type) in [
        ("blocklist", FirewallAliasType::UrlTable),
        ("countries", FirewallAliasType::GeoIp),
        ("ext", FirewallAliasType::External),
    ] {
        set.add_or_update(FirewallAlias::new(name, alias_type).with_content(["anything at all"]))
            .expect("unvalidated type");
    }
    assert_eq!(set.aliases().len(), 5);
}

#[test]
fn find_rejects_unknown_fields() {
    let (_dir, path) = scratch_config();
    let set = open(&path);

    assert!(matches!(
        set.find(&[("colour", "blue")]),
        Err(ConfigError::UnknownField(ref field)) if field == "colour"
    ));
    let found = set
        .find(&[("type", "network"), ("enabled", "1")])
        .expect("find")
        .expect("network_test");
    assert_eq!(found.name, "network_test");
}
