use snap_interfaces::backend::{apparmor, seccomp, udev, Backend, BackendSpecification};
use snap_interfaces::builtin::FuseSupportInterface;
use snap_interfaces::config::{InterfacesConfig, ReleaseInfo};
use snap_interfaces::connection::{CompilationPass, Connection, ConnectionState};
use snap_interfaces::error::{ConnectionError, EndpointKind, InterfaceError, RegistryError};
use snap_interfaces::policy::ConnectionDecision;
use snap_interfaces::testing::{app_snap, core_slot, plug};
use snap_interfaces::types::SnapType;
use snap_interfaces::{Interface, Registry};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn registry() -> Registry {
    Registry::with_builtins(&InterfacesConfig::new(ReleaseInfo::new("ubuntu", "16.04"), true))
        .expect("builtin registry")
}

fn rule_lines(text: &str) -> Vec<&str> {
    text.lines().filter(|l| !l.is_empty() && !l.starts_with('#')).collect()
}

// alpha / alpha-app / revision 12, plugged into the core fuse-support slot.
#[test]
fn test_fuse_support_end_to_end() {
    init_tracing();
    let registry = registry();
    let decl = registry.base_declaration().unwrap();
    let alpha = app_snap("alpha", 12);
    let mut conn = Connection::new(plug(&alpha, "fuse-support", &["alpha-app"]), core_slot("fuse-support")).unwrap();

    conn.sanitize(&registry).unwrap();
    let iface = registry.interface("fuse-support").unwrap();
    assert!(iface.auto_connect(conn.plug(), conn.slot()));
    // The base declaration still asks for consent.
    assert_eq!(conn.evaluate(&registry, &decl).unwrap(), ConnectionDecision::AwaitConsent);
    assert_eq!(conn.form().unwrap(), ConnectionState::AwaitingConsent);
    conn.grant_consent().unwrap();

    let mut pass = CompilationPass::new(&registry, &alpha);
    pass.add_plug(conn.plug()).unwrap();
    pass.add_connection(&conn).unwrap();
    let policy = pass.finish();
    conn.mark_compiled(&policy).unwrap();
    assert_eq!(conn.state(), ConnectionState::PolicyCompiled);

    // AppArmor
    assert_eq!(policy.apparmor.backend(), Backend::AppArmor);
    assert_eq!(policy.apparmor.tags().collect::<Vec<_>>(), ["snap.alpha.alpha-app"]);
    let profile: Vec<&str> = policy.apparmor.all().flat_map(rule_lines).collect();
    for (dir, opts) in [
        ("/home/*/snap/alpha/12/", "ro,nosuid,nodev"),
        ("/home/*/snap/alpha/12/", "rw,nosuid,nodev"),
        ("/var/snap/alpha/12/", "ro,nosuid,nodev"),
        ("/var/snap/alpha/12/", "rw,nosuid,nodev"),
    ] {
        let expected = format!("mount fstype=fuse.* options=({opts}) ** -> {dir}{{,**/}},");
        assert!(profile.contains(&expected.as_str()), "missing {expected}");
    }
    assert!(profile.contains(&"deny /etc/fuse.conf r,"));
    assert!(profile.contains(&"capability sys_admin,"));

    // seccomp
    let syscalls: Vec<&str> = policy.seccomp.all().flat_map(rule_lines).collect();
    assert_eq!(syscalls, ["mount"]);

    // udev
    let udev_rules: Vec<&str> = policy.udev.all().flat_map(rule_lines).collect();
    assert_eq!(udev_rules, [r#"KERNEL=="fuse", TAG+="snap_alpha_alpha-app""#]);
}

#[test]
fn test_base_declaration_text() {
    let registry = registry();
    let decl = registry.base_declaration().unwrap();
    let expected = "type: base-declaration
authority-id: canonical
series: 16
slots:
  fuse-support:
    allow-installation:
      slot-snap-type:
        - core
    deny-auto-connection: true
";
    assert_eq!(decl.text(), expected);
    assert!(decl.check_slot_installation("fuse-support", SnapType::Os).is_ok());
    assert!(decl.check_slot_installation("fuse-support", SnapType::App).is_err());
}

#[test]
fn test_unknown_interface_is_recoverable() {
    let registry = registry();
    let alpha = app_snap("alpha", 1);
    let err = registry.sanitize_plug(&plug(&alpha, "no-such-thing", &["a"])).unwrap_err();
    assert_eq!(err, RegistryError::UnknownInterface("no-such-thing".into()));

    let mut conn = Connection::new(plug(&alpha, "no-such-thing", &["a"]), core_slot("no-such-thing")).unwrap();
    assert!(matches!(conn.sanitize(&registry), Err(ConnectionError::Registry(_))));
    assert_eq!(conn.state(), ConnectionState::Declared);
}

#[test]
fn test_specs_deduplicate_repeated_connections() {
    let iface = FuseSupportInterface::new(&ReleaseInfo::new("ubuntu", "16.04"));
    let alpha = app_snap("alpha", 12);
    let p = plug(&alpha, "fuse-support", &["alpha-app"]);
    let s = core_slot("fuse-support");

    let mut aa = apparmor::Specification::new(&alpha);
    let mut sc = seccomp::Specification::new(&alpha);
    let mut ud = udev::Specification::new(&alpha);
    for _ in 0..3 {
        aa.add_connected_plug(&iface, &p, &s).unwrap();
        sc.add_connected_plug(&iface, &p, &s).unwrap();
        ud.add_connected_plug(&iface, &p, &s).unwrap();
    }
    assert_eq!(aa.snippets().count(), 1);
    assert_eq!(sc.snippets().count(), 1);
    assert_eq!(ud.snippets().count(), 1);
    // Scope is only set while a hook runs.
    assert!(aa.security_tags().is_empty());
}

#[test]
fn test_compiled_policy_serializes() {
    let registry = registry();
    let alpha = app_snap("alpha", 12);
    let mut conn = Connection::new(plug(&alpha, "fuse-support", &["alpha-app"]), core_slot("fuse-support")).unwrap();
    conn.sanitize(&registry).unwrap();
    conn.evaluate(&registry, &registry.base_declaration().unwrap()).unwrap();
    conn.form().unwrap();
    conn.grant_consent().unwrap();
    let mut pass = CompilationPass::new(&registry, &alpha);
    pass.add_connection(&conn).unwrap();
    let json = serde_json::to_value(pass.finish()).unwrap();
    assert_eq!(json["seccomp"]["backend"], "seccomp");
    assert_eq!(json["udev"]["snap"]["revision"], "12");
    assert_eq!(json["connections"][0]["plug"]["snap"], "alpha");
}

#[test]
fn test_specification_rejects_other_snaps_endpoints() {
    let iface = FuseSupportInterface::new(&ReleaseInfo::new("ubuntu", "16.04"));
    let beta = app_snap("beta", 7);
    let p = plug(&app_snap("alpha", 12), "fuse-support", &["app"]);
    let s = core_slot("fuse-support");

    let mut aa = apparmor::Specification::new(&beta);
    let err = aa.add_connected_plug(&iface, &p, &s).unwrap_err();
    assert_eq!(
        err,
        InterfaceError::ForeignEndpoint {
            endpoint: EndpointKind::Plug,
            name: "alpha:fuse-support".into(),
            owner: "alpha_12".into(),
            snap: "beta_7".into(),
        }
    );
    assert!(aa.add_permanent_plug(&iface, &p).is_err());
    assert!(aa.add_connected_slot(&iface, &p, &s).is_err());
    assert!(aa.add_permanent_slot(&iface, &s).is_err());
    assert_eq!(aa.snippets().count(), 0);
    assert!(!aa.to_string().contains("/snap/beta/7/"));

    let mut sc = seccomp::Specification::new(&beta);
    let mut ud = udev::Specification::new(&beta);
    assert!(sc.add_connected_plug(&iface, &p, &s).is_err());
    assert!(ud.add_connected_plug(&iface, &p, &s).is_err());
    assert!(sc.finish().is_empty());
    assert!(ud.finish().is_empty());
}

#[test]
fn test_specification_rejects_other_revision() {
    let iface = FuseSupportInterface::new(&ReleaseInfo::new("ubuntu", "16.04"));
    let p = plug(&app_snap("alpha", 12), "fuse-support", &["app"]);
    let mut aa = apparmor::Specification::new(&app_snap("alpha", 13));
    assert!(matches!(
        aa.add_connected_plug(&iface, &p, &core_slot("fuse-support")),
        Err(InterfaceError::ForeignEndpoint { .. })
    ));
    assert_eq!(aa.snippets().count(), 0);
}
