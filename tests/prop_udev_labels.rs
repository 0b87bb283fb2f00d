use std::collections::BTreeSet;

use proptest::prelude::*;
use snap_interfaces::backend::{udev, BackendSpecification};
use snap_interfaces::builtin::FuseSupportInterface;
use snap_interfaces::config::ReleaseInfo;
use snap_interfaces::testing::{app_snap, core_slot, plug};

fn udev_rules(snap: &str, revision: i32, apps: &BTreeSet<String>) -> Vec<String> {
    let iface = FuseSupportInterface::new(&ReleaseInfo::new("ubuntu", "16.04"));
    let info = app_snap(snap, revision);
    let apps: Vec<&str> = apps.iter().map(String::as_str).collect();
    let mut spec = udev::Specification::new(&info);
    spec.add_connected_plug(&iface, &plug(&info, "fuse-support", &apps), &core_slot("fuse-support"))
        .unwrap();
    spec.snippets()
        .flat_map(|s| s.lines())
        .filter(|l| l.starts_with("KERNEL=="))
        .map(str::to_string)
        .collect()
}

proptest! {
    /// One rule per app, each tagged with that app's own label.
    #[test]
    fn prop_one_rule_per_app(
        snap in "[a-z][a-z0-9]{1,12}",
        revision in 1i32..100_000,
        apps in prop::collection::btree_set("[a-z][a-z0-9]{0,8}", 1..6),
    ) {
        let rules = udev_rules(&snap, revision, &apps);
        prop_assert_eq!(rules.len(), apps.len());
        for (rule, app) in rules.iter().zip(&apps) {
            prop_assert_eq!(rule, &format!(r#"KERNEL=="fuse", TAG+="snap_{snap}_{app}""#));
        }
    }

    /// Same input, same rules.
    #[test]
    fn prop_rules_deterministic(
        snap in "[a-z][a-z0-9]{1,12}",
        revision in 1i32..100_000,
        apps in prop::collection::btree_set("[a-z][a-z0-9]{0,8}", 1..6),
    ) {
        prop_assert_eq!(udev_rules(&snap, revision, &apps), udev_rules(&snap, revision, &apps));
    }

    /// Distinct apps never share a label.
    #[test]
    fn prop_labels_distinct(
        snap in "[a-z][a-z0-9]{1,12}",
        apps in prop::collection::btree_set("[a-z][a-z0-9]{0,8}", 1..6),
    ) {
        let rules = udev_rules(&snap, 1, &apps);
        let unique: BTreeSet<&String> = rules.iter().collect();
        prop_assert_eq!(unique.len(), rules.len());
    }
}
