//! Fixtures for building snaps, plugs and slots in tests.

use crate::primitives::{Attrs, Plug, SnapInfo, Slot};
use crate::types::{AppName, EndpointName, Revision, SnapName, SnapType};

/// Panics on invalid input; test data only.
pub fn snap(name: &str, revision: i32, snap_type: SnapType) -> SnapInfo {
    SnapInfo::new(
        SnapName::new(name).expect("test snap name"),
        Revision::new(revision).expect("test revision"),
        snap_type,
    )
}

pub fn app_snap(name: &str, revision: i32) -> SnapInfo {
    snap(name, revision, SnapType::App)
}

/// The platform snap providing implicit slots.
pub fn core_snap() -> SnapInfo {
    snap("core", 1, SnapType::Os)
}

/// A plug named after its interface, bound to `apps`.
pub fn plug(snap: &SnapInfo, interface: &str, apps: &[&str]) -> Plug {
    Plug {
        snap: snap.clone(),
        name: EndpointName::new(interface).expect("test plug name"),
        interface: interface.to_string(),
        apps: apps.iter().map(|a| AppName::new(*a).expect("test app name")).collect(),
        attrs: Attrs::new(),
    }
}

/// The core snap's implicit slot for `interface`.
pub fn core_slot(interface: &str) -> Slot {
    Slot {
        snap: core_snap(),
        name: EndpointName::new(interface).expect("test slot name"),
        interface: interface.to_string(),
        apps: Default::default(),
        attrs: Attrs::new(),
    }
}
