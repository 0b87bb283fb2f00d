//!
//! Interface registry.
//!
//! The process-wide registry is written exactly once by [`init`], before any
//! connection processing, and is read-only afterwards. There is no mutation
//! path after init. Independent registries can still be built with
//! [`Registry::builder`], e.g. for tests or tools.

use std::collections::BTreeMap;

use once_cell::sync::OnceCell;

use crate::builtin;
use crate::config::InterfacesConfig;
use crate::error::{InterfaceError, PolicyError, RegistryError};
use crate::interface::Interface;
use crate::policy::BaseDeclaration;
use crate::primitives::{Plug, Slot};
use crate::types::InterfaceName;

static REGISTRY: OnceCell<Registry> = OnceCell::new();

/// Table of interface variants keyed by name.
#[derive(Debug)]
pub struct Registry {
    ifaces: BTreeMap<&'static str, Box<dyn Interface>>,
}

/// Collects interfaces before the registry is sealed.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    ifaces: BTreeMap<&'static str, Box<dyn Interface>>,
}

impl RegistryBuilder {
    pub fn register(mut self, iface: Box<dyn Interface>) -> Result<Self, RegistryError> {
        let name = iface.name();
        InterfaceName::new(name).map_err(InterfaceError::from)?;
        if self.ifaces.contains_key(name) {
            return Err(RegistryError::Duplicate(name.to_string()));
        }
        self.ifaces.insert(name, iface);
        Ok(self)
    }

    pub fn register_all(
        self,
        ifaces: impl IntoIterator<Item = Box<dyn Interface>>,
    ) -> Result<Self, RegistryError> {
        ifaces.into_iter().try_fold(self, |builder, iface| builder.register(iface))
    }

    pub fn build(self) -> Registry {
        Registry { ifaces: self.ifaces }
    }
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// A registry holding every built-in interface.
    pub fn with_builtins(config: &InterfacesConfig) -> Result<Self, RegistryError> {
        Ok(Registry::builder().register_all(builtin::interfaces(config))?.build())
    }

    pub fn interface(&self, name: &str) -> Option<&dyn Interface> {
        self.ifaces.get(name).map(|iface| iface.as_ref())
    }

    pub fn require(&self, name: &str) -> Result<&dyn Interface, RegistryError> {
        self.interface(name).ok_or_else(|| RegistryError::UnknownInterface(name.to_string()))
    }

    /// All interfaces, sorted by name.
    pub fn interfaces(&self) -> impl Iterator<Item = &dyn Interface> {
        self.ifaces.values().map(|iface| iface.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.ifaces.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.ifaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ifaces.is_empty()
    }

    /// Dispatches plug validation to the interface the plug declares.
    pub fn sanitize_plug(&self, plug: &Plug) -> Result<(), RegistryError> {
        let iface = self.require(&plug.interface)?;
        iface.sanitize_plug(plug).map_err(|err| {
            tracing::warn!(plug = %plug.reference(), error = %err, "plug rejected");
            RegistryError::from(err)
        })
    }

    /// Dispatches slot validation to the interface the slot declares.
    pub fn sanitize_slot(&self, slot: &Slot) -> Result<(), RegistryError> {
        let iface = self.require(&slot.interface)?;
        iface.sanitize_slot(slot).map_err(|err| {
            tracing::warn!(slot = %slot.reference(), error = %err, "slot rejected");
            RegistryError::from(err)
        })
    }

    /// Interfaces whose slot the core snap provides implicitly on this kind
    /// of system.
    pub fn implicit_slots(&self, on_classic: bool) -> impl Iterator<Item = &dyn Interface> {
        self.interfaces().filter(move |iface| iface.metadata().implicit_slot(on_classic))
    }

    pub fn base_declaration(&self) -> Result<BaseDeclaration, PolicyError> {
        BaseDeclaration::from_interfaces(self.interfaces())
    }
}

/// Populates the process-wide registry with the built-in interfaces.
///
/// Must be called once, before connections are processed. A second call
/// fails with [`RegistryError::AlreadyInitialized`] and leaves the installed
/// registry untouched.
pub fn init(config: &InterfacesConfig) -> Result<&'static Registry, RegistryError> {
    let registry = Registry::with_builtins(config)?;
    let mut installed = false;
    let registry = REGISTRY.get_or_init(|| {
        installed = true;
        registry
    });
    if !installed {
        return Err(RegistryError::AlreadyInitialized);
    }
    tracing::debug!(
        interfaces = registry.len(),
        implicit_slots = registry.implicit_slots(config.on_classic).count(),
        on_classic = config.on_classic,
        "interface registry initialized"
    );
    Ok(registry)
}

/// The process-wide registry, if [`init`] has run.
pub fn get() -> Option<&'static Registry> {
    REGISTRY.get()
}
