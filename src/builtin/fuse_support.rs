//!
//! `fuse-support`: lets a snap run a FUSE filesystem.
//!
//! Unprivileged FUSE mounts are not supported. The snap gets the device node,
//! `sys_admin` and a set of mount rules restricted to its own writable
//! directories, with only the default safe option sets.

use once_cell::sync::Lazy;

use crate::backend::apparmor::{self, perms, FsType, LinuxCapability, MountOptions, MountSource, Rule, SnapDir};
use crate::backend::seccomp::{self, Syscall};
use crate::backend::udev::{self, DeviceMatch, TagRule};
use crate::config::ReleaseInfo;
use crate::error::InterfaceError;
use crate::interface::{ensure_plug, ensure_slot, Interface};
use crate::metadata::MetaData;
use crate::policy::{DeclSnapType, InterfaceRule, Side};
use crate::primitives::{Attrs, Plug, Slot};

pub const NAME: &str = "fuse-support";

const SUMMARY: &str = "allows access to the FUSE file system";

const UDEV_DESCRIPTION: &str = "This file contains udev rules for FUSE filesystem.";

static CONNECTED_PLUG_APPARMOR: Lazy<apparmor::Snippet> = Lazy::new(|| {
    let mut snippet = apparmor::Snippet::new()
        .describe("Can run a FUSE filesystem. Unprivileged fuse mounts are")
        .describe("not supported at this time.")
        .rule(Rule::Comment("Allow communicating with fuse kernel driver"))
        .rule(Rule::Comment("https://www.kernel.org/doc/Documentation/filesystems/fuse.txt"))
        .rule(Rule::access("/dev/fuse", perms::READ | perms::WRITE))
        .gap()
        .rule(Rule::Comment("Required for mounts"))
        .rule(Rule::Capability(LinuxCapability::SysAdmin))
        .gap()
        .rule(Rule::Comment("Allow mounts to our snap-specific writable directories"))
        .rule(Rule::Comment("fstype is 'fuse.<command>', eg 'fuse.sshfs'. Only the default"))
        .rule(Rule::Comment("(rw,nosuid,nodev) and read-only option sets are allowed."));
    for target in SnapDir::ALL {
        for options in MountOptions::ALL {
            snippet = snippet.rule(Rule::Mount {
                fstype: FsType::AnyFuse,
                options,
                source: MountSource::Any,
                target,
            });
        }
    }
    snippet
        .gap()
        .rule(Rule::Comment("Explicitly deny reads to /etc/fuse.conf so the safe defaults"))
        .rule(Rule::Comment("enforced by the mount rules are not overridden by system options."))
        .rule(Rule::deny("/etc/fuse.conf", perms::READ))
        .gap()
        .rule(Rule::Comment("Allow read access to the fuse filesystem"))
        .rule(Rule::access("/sys/fs/fuse/", perms::READ))
        .rule(Rule::access("/sys/fs/fuse/**", perms::READ))
});

static CONNECTED_PLUG_SECCOMP: Lazy<seccomp::Snippet> = Lazy::new(|| {
    seccomp::Snippet::new()
        .describe("Can run a FUSE filesystem. Unprivileged fuse mounts are")
        .describe("not supported at this time.")
        .allow(Syscall::MOUNT)
});

/// The rule set used for every connected plug.
pub fn connected_plug_apparmor() -> &'static apparmor::Snippet {
    &CONNECTED_PLUG_APPARMOR
}

pub fn connected_plug_seccomp() -> &'static seccomp::Snippet {
    &CONNECTED_PLUG_SECCOMP
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuseSupportInterface {
    implicit_on_classic: bool,
}

impl FuseSupportInterface {
    /// Ubuntu 14.04 hosts do not get the implicit classic slot.
    pub fn new(release: &ReleaseInfo) -> Self {
        FuseSupportInterface { implicit_on_classic: !release.is("ubuntu", "14.04") }
    }

    pub fn base_declaration_rule() -> InterfaceRule {
        InterfaceRule::default()
            .installable_by(&[DeclSnapType::Core])
            .deny_auto_connection()
    }
}

impl Interface for FuseSupportInterface {
    fn name(&self) -> &'static str {
        NAME
    }

    fn metadata(&self) -> MetaData {
        MetaData {
            summary: SUMMARY.to_string(),
            implicit_on_core: true,
            implicit_on_classic: self.implicit_on_classic,
            base_declaration_slots: Self::base_declaration_rule().render(NAME, Side::Slot),
            base_declaration_plugs: String::new(),
        }
    }

    fn sanitize_slot(&self, slot: &Slot) -> Result<(), InterfaceError> {
        ensure_slot(self, slot);
        Ok(())
    }

    fn sanitize_plug(&self, plug: &Plug) -> Result<(), InterfaceError> {
        ensure_plug(self, plug);
        // Currently nothing is checked on the plug side
        Ok(())
    }

    fn auto_connect(&self, _plug: &Plug, _slot: &Slot) -> bool {
        // Allow what is allowed in the declarations
        true
    }

    fn apparmor_connected_plug(
        &self,
        spec: &mut apparmor::Specification,
        _plug: &Plug,
        _plug_attrs: &Attrs,
        _slot: &Slot,
        _slot_attrs: &Attrs,
    ) -> Result<(), InterfaceError> {
        spec.add_snippet(connected_plug_apparmor());
        Ok(())
    }

    fn seccomp_connected_plug(
        &self,
        spec: &mut seccomp::Specification,
        _plug: &Plug,
        _plug_attrs: &Attrs,
        _slot: &Slot,
        _slot_attrs: &Attrs,
    ) -> Result<(), InterfaceError> {
        spec.add_snippet(connected_plug_seccomp());
        Ok(())
    }

    fn udev_connected_plug(
        &self,
        spec: &mut udev::Specification,
        plug: &Plug,
        _plug_attrs: &Attrs,
        _slot: &Slot,
        _slot_attrs: &Attrs,
    ) -> Result<(), InterfaceError> {
        for app in &plug.apps {
            let rule = TagRule { device: DeviceMatch::Kernel("fuse"), tag: plug.snap.security_tag(app) };
            spec.add_snippet(&udev::Snippet::new(UDEV_DESCRIPTION, rule));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendSpecification;
    use crate::primitives::SnapInfo;
    use crate::types::{AppName, EndpointName, Revision, SnapName, SnapType};

    fn snap(name: &str, rev: i32, snap_type: SnapType) -> SnapInfo {
        SnapInfo::new(SnapName::new(name).unwrap(), Revision::new(rev).unwrap(), snap_type)
    }

    fn plug(apps: &[&str]) -> Plug {
        Plug {
            snap: snap("alpha", 12, SnapType::App),
            name: EndpointName::new(NAME).unwrap(),
            interface: NAME.into(),
            apps: apps.iter().map(|a| AppName::new(*a).unwrap()).collect(),
            attrs: Attrs::new(),
        }
    }

    fn slot() -> Slot {
        Slot {
            snap: snap("core", 1, SnapType::Os),
            name: EndpointName::new(NAME).unwrap(),
            interface: NAME.into(),
            apps: Default::default(),
            attrs: Attrs::new(),
        }
    }

    fn iface() -> FuseSupportInterface {
        FuseSupportInterface::new(&ReleaseInfo::new("ubuntu", "16.04"))
    }

    #[test]
    fn test_name_and_metadata() {
        let iface = iface();
        assert_eq!(iface.name(), "fuse-support");
        let md = iface.metadata();
        assert_eq!(md.summary, "allows access to the FUSE file system");
        assert!(md.implicit_on_core);
        assert!(md.implicit_on_classic);
        assert_eq!(md, iface.metadata());
        assert_eq!(
            md.base_declaration_slots,
            "  fuse-support:\n    allow-installation:\n      slot-snap-type:\n        - core\n    deny-auto-connection: true\n"
        );
    }

    #[test]
    fn test_not_implicit_on_trusty() {
        let iface = FuseSupportInterface::new(&ReleaseInfo::new("ubuntu", "14.04"));
        assert!(!iface.metadata().implicit_on_classic);
        assert!(iface.metadata().implicit_on_core);
        let other = FuseSupportInterface::new(&ReleaseInfo::new("debian", "14.04"));
        assert!(other.metadata().implicit_on_classic);
    }

    #[test]
    fn test_sanitize_accepts_any_attrs() {
        let mut p = plug(&["alpha-app"]);
        p.attrs.insert("mountpoint".into(), serde_json::json!("/etc"));
        let mut s = slot();
        s.attrs.insert("x".into(), serde_json::json!({"nested": [true, null]}));
        assert_eq!(iface().sanitize_plug(&p), Ok(()));
        assert_eq!(iface().sanitize_slot(&s), Ok(()));
    }

    #[test]
    #[should_panic(expected = "slot is not of interface \"fuse-support\"")]
    fn test_sanitize_slot_wrong_interface_panics() {
        let mut s = slot();
        s.interface = "other".into();
        let _ = iface().sanitize_slot(&s);
    }

    #[test]
    #[should_panic(expected = "plug is not of interface \"fuse-support\"")]
    fn test_sanitize_plug_wrong_interface_panics() {
        let mut p = plug(&["alpha-app"]);
        p.interface = "other".into();
        let _ = iface().sanitize_plug(&p);
    }

    #[test]
    fn test_apparmor_connected_plug() {
        let p = plug(&["alpha-app"]);
        let mut spec = apparmor::Specification::new(&p.snap);
        spec.add_connected_plug(&iface(), &p, &slot()).unwrap();
        let snippets: Vec<&String> = spec.snippets().collect();
        assert_eq!(snippets.len(), 1);
        let text = snippets[0];
        assert!(text.starts_with("# Description: Can run a FUSE filesystem."));
        for line in [
            "/dev/fuse rw,",
            "capability sys_admin,",
            "mount fstype=fuse.* options=(ro,nosuid,nodev) ** -> /home/*/snap/alpha/12/{,**/},",
            "mount fstype=fuse.* options=(rw,nosuid,nodev) ** -> /home/*/snap/alpha/12/{,**/},",
            "mount fstype=fuse.* options=(ro,nosuid,nodev) ** -> /var/snap/alpha/12/{,**/},",
            "mount fstype=fuse.* options=(rw,nosuid,nodev) ** -> /var/snap/alpha/12/{,**/},",
            "deny /etc/fuse.conf r,",
            "/sys/fs/fuse/ r,",
            "/sys/fs/fuse/** r,",
        ] {
            assert!(text.lines().any(|l| l == line), "missing {line:?} in\n{text}");
        }
        assert_eq!(text.lines().filter(|l| l.starts_with("mount ")).count(), 4);
    }

    #[test]
    fn test_seccomp_connected_plug() {
        let p = plug(&["alpha-app"]);
        let mut spec = seccomp::Specification::new(&p.snap);
        spec.add_connected_plug(&iface(), &p, &slot()).unwrap();
        let syscalls: Vec<&str> = spec
            .snippets()
            .flat_map(|s| s.lines())
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .collect();
        assert_eq!(syscalls, ["mount"]);
    }

    #[test]
    fn test_udev_connected_plug_one_rule_per_app() {
        let p = plug(&["alpha-app", "helper"]);
        let mut spec = udev::Specification::new(&p.snap);
        spec.add_connected_plug(&iface(), &p, &slot()).unwrap();
        let rules: Vec<&str> = spec
            .snippets()
            .flat_map(|s| s.lines())
            .filter(|l| l.starts_with("KERNEL=="))
            .collect();
        assert_eq!(
            rules,
            [
                r#"KERNEL=="fuse", TAG+="snap_alpha_alpha-app""#,
                r#"KERNEL=="fuse", TAG+="snap_alpha_helper""#,
            ]
        );
    }

    #[test]
    fn test_auto_connect() {
        assert!(iface().auto_connect(&plug(&["alpha-app"]), &slot()));
    }
}
