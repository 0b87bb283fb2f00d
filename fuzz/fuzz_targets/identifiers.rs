#![no_main]

// Harness: identifiers
// Focus: validated names either reject input or display it back unchanged.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use snap_interfaces::types::{AppName, InterfaceName, Revision, SecurityTag, SnapName, SnapType};

#[derive(Arbitrary, Debug)]
struct Input<'a> {
    snap: &'a str,
    app: &'a str,
    iface: &'a str,
    revision: &'a str,
    snap_type: &'a str,
}

fuzz_target!(|input: Input<'_>| {
    if let Ok(name) = SnapName::new(input.snap) {
        assert_eq!(name.as_str(), input.snap);
        assert!((2..=40).contains(&name.as_str().len()));
        if let Ok(app) = AppName::new(input.app) {
            let tag = SecurityTag::for_app(&name, &app);
            assert_eq!(tag.as_str(), format!("snap.{}.{}", input.snap, input.app));
            assert!(!tag.udev_tag().contains('.'));
        }
    }
    if let Ok(iface) = InterfaceName::new(input.iface) {
        assert_eq!(iface.to_string(), input.iface);
    }
    if let Ok(rev) = input.revision.parse::<Revision>() {
        assert_ne!(rev.number(), 0);
        assert_eq!(rev.to_string().parse::<Revision>().ok(), Some(rev));
    }
    if let Ok(t) = input.snap_type.parse::<SnapType>() {
        assert_eq!(t.as_str(), input.snap_type);
    }
});
