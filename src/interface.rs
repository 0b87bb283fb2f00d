//!
//! The interface contract.
//!
//! An interface is a capability type. It validates the plugs and slots that
//! declare it, emits per-backend policy when a connection forms, and decides
//! whether a connection may form without explicit consent. Variants are
//! stateless values; the registry treats them uniformly through `dyn Interface`.
//!
//! Backend hooks default to emitting nothing, so a variant only overrides the
//! backends it needs.

use std::fmt;

use crate::backend::{apparmor, seccomp, udev};
use crate::error::{dispatch_fault, DispatchFault, EndpointKind, InterfaceError};
use crate::metadata::MetaData;
use crate::primitives::{Attrs, Plug, Slot};

/// A capability type mediating plug/slot pairings.
pub trait Interface: Send + Sync + fmt::Debug {
    /// Stable identifier; the registry dispatch key.
    fn name(&self) -> &'static str;

    /// Static description. Equal across calls.
    fn metadata(&self) -> MetaData;

    /// Validates a slot's attributes.
    ///
    /// # Panics
    /// If `slot.interface` is not [`Interface::name`] (see [`ensure_slot`]).
    fn sanitize_slot(&self, slot: &Slot) -> Result<(), InterfaceError>;

    /// Validates a plug's attributes.
    ///
    /// # Panics
    /// If `plug.interface` is not [`Interface::name`] (see [`ensure_plug`]).
    fn sanitize_plug(&self, plug: &Plug) -> Result<(), InterfaceError>;

    /// Whether the pairing may form without consent, absent a base
    /// declaration override. Must not consult mutable state.
    fn auto_connect(&self, plug: &Plug, slot: &Slot) -> bool;

    // --- AppArmor ---

    fn apparmor_connected_plug(
        &self,
        _spec: &mut apparmor::Specification,
        _plug: &Plug,
        _plug_attrs: &Attrs,
        _slot: &Slot,
        _slot_attrs: &Attrs,
    ) -> Result<(), InterfaceError> {
        Ok(())
    }

    fn apparmor_connected_slot(
        &self,
        _spec: &mut apparmor::Specification,
        _plug: &Plug,
        _plug_attrs: &Attrs,
        _slot: &Slot,
        _slot_attrs: &Attrs,
    ) -> Result<(), InterfaceError> {
        Ok(())
    }

    fn apparmor_permanent_plug(
        &self,
        _spec: &mut apparmor::Specification,
        _plug: &Plug,
    ) -> Result<(), InterfaceError> {
        Ok(())
    }

    fn apparmor_permanent_slot(
        &self,
        _spec: &mut apparmor::Specification,
        _slot: &Slot,
    ) -> Result<(), InterfaceError> {
        Ok(())
    }

    // --- seccomp ---

    fn seccomp_connected_plug(
        &self,
        _spec: &mut seccomp::Specification,
        _plug: &Plug,
        _plug_attrs: &Attrs,
        _slot: &Slot,
        _slot_attrs: &Attrs,
    ) -> Result<(), InterfaceError> {
        Ok(())
    }

    fn seccomp_connected_slot(
        &self,
        _spec: &mut seccomp::Specification,
        _plug: &Plug,
        _plug_attrs: &Attrs,
        _slot: &Slot,
        _slot_attrs: &Attrs,
    ) -> Result<(), InterfaceError> {
        Ok(())
    }

    fn seccomp_permanent_plug(
        &self,
        _spec: &mut seccomp::Specification,
        _plug: &Plug,
    ) -> Result<(), InterfaceError> {
        Ok(())
    }

    fn seccomp_permanent_slot(
        &self,
        _spec: &mut seccomp::Specification,
        _slot: &Slot,
    ) -> Result<(), InterfaceError> {
        Ok(())
    }

    // --- udev ---

    fn udev_connected_plug(
        &self,
        _spec: &mut udev::Specification,
        _plug: &Plug,
        _plug_attrs: &Attrs,
        _slot: &Slot,
        _slot_attrs: &Attrs,
    ) -> Result<(), InterfaceError> {
        Ok(())
    }

    fn udev_connected_slot(
        &self,
        _spec: &mut udev::Specification,
        _plug: &Plug,
        _plug_attrs: &Attrs,
        _slot: &Slot,
        _slot_attrs: &Attrs,
    ) -> Result<(), InterfaceError> {
        Ok(())
    }

    fn udev_permanent_plug(
        &self,
        _spec: &mut udev::Specification,
        _plug: &Plug,
    ) -> Result<(), InterfaceError> {
        Ok(())
    }

    fn udev_permanent_slot(
        &self,
        _spec: &mut udev::Specification,
        _slot: &Slot,
    ) -> Result<(), InterfaceError> {
        Ok(())
    }
}

impl fmt::Display for dyn Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raises a dispatch fault unless `plug` belongs to `iface`.
#[track_caller]
pub fn ensure_plug(iface: &(impl Interface + ?Sized), plug: &Plug) {
    if plug.interface != iface.name() {
        dispatch_fault(DispatchFault {
            endpoint: EndpointKind::Plug,
            expected: iface.name().to_string(),
            actual: plug.interface.clone(),
        });
    }
}

/// Raises a dispatch fault unless `slot` belongs to `iface`.
#[track_caller]
pub fn ensure_slot(iface: &(impl Interface + ?Sized), slot: &Slot) {
    if slot.interface != iface.name() {
        dispatch_fault(DispatchFault {
            endpoint: EndpointKind::Slot,
            expected: iface.name().to_string(),
            actual: slot.interface.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendSpecification;
    use crate::testing::{app_snap, core_slot, plug};

    #[derive(Debug)]
    struct Silent;

    impl Interface for Silent {
        fn name(&self) -> &'static str {
            "silent"
        }
        fn metadata(&self) -> MetaData {
            MetaData::default()
        }
        fn sanitize_slot(&self, slot: &Slot) -> Result<(), InterfaceError> {
            ensure_slot(self, slot);
            Ok(())
        }
        fn sanitize_plug(&self, plug: &Plug) -> Result<(), InterfaceError> {
            ensure_plug(self, plug);
            Ok(())
        }
        fn auto_connect(&self, _plug: &Plug, _slot: &Slot) -> bool {
            false
        }
    }

    #[test]
    fn test_default_hooks_emit_nothing() {
        let alpha = app_snap("alpha", 1);
        let p = plug(&alpha, "silent", &["app"]);
        let s = core_slot("silent");
        let mut aa = apparmor::Specification::new(&alpha);
        let mut sc = seccomp::Specification::new(&s.snap);
        let mut ud = udev::Specification::new(&alpha);
        aa.add_connected_plug(&Silent, &p, &s).unwrap();
        sc.add_permanent_slot(&Silent, &s).unwrap();
        sc.add_connected_slot(&Silent, &p, &s).unwrap();
        ud.add_permanent_plug(&Silent, &p).unwrap();
        assert!(aa.finish().is_empty());
        assert!(sc.finish().is_empty());
        assert!(ud.finish().is_empty());
    }

    #[test]
    fn test_display_is_name() {
        let iface: Box<dyn Interface> = Box::new(Silent);
        assert_eq!(iface.to_string(), "silent");
    }

    #[test]
    #[should_panic(expected = "plug is not of interface \"silent\" (declared \"other\")")]
    fn test_ensure_plug_faults() {
        let p = plug(&app_snap("alpha", 1), "other", &["app"]);
        let _ = Silent.sanitize_plug(&p);
    }
}
