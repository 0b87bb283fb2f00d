//!
//! Plug/slot data model.
//!
//! These are snapshots produced by the installation subsystem when it parses a
//! snap manifest. The interface layer only reads them.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{AppName, EndpointName, Revision, SecurityTag, SnapName, SnapType};

/// Attribute payload of a plug or slot, as written in the manifest.
pub type Attrs = BTreeMap<String, serde_json::Value>;

// --- Snaps ------------------------------------------------------------------

/// Identity of an installed snap revision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapInfo {
    pub name: SnapName,
    pub revision: Revision,
    #[serde(rename = "type")]
    pub snap_type: SnapType,
}

impl SnapInfo {
    pub fn new(name: SnapName, revision: Revision, snap_type: SnapType) -> Self {
        SnapInfo { name, revision, snap_type }
    }

    pub fn name(&self) -> &SnapName {
        &self.name
    }

    pub fn security_tag(&self, app: &AppName) -> SecurityTag {
        SecurityTag::for_app(&self.name, app)
    }
}

/// `<name>_<revision>`, e.g. `alpha_12` or `alpha_x3`.
impl fmt::Display for SnapInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.name, self.revision)
    }
}

// --- Endpoints --------------------------------------------------------------

/// A snap's declared request to consume a capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plug {
    pub snap: SnapInfo,
    pub name: EndpointName,
    pub interface: String,
    #[serde(default)]
    pub apps: BTreeSet<AppName>,
    #[serde(default)]
    pub attrs: Attrs,
}

/// A declaration that a snap (or the platform) provides a capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub snap: SnapInfo,
    pub name: EndpointName,
    pub interface: String,
    #[serde(default)]
    pub apps: BTreeSet<AppName>,
    #[serde(default)]
    pub attrs: Attrs,
}

impl Plug {
    /// Security tags of every app bound to this plug, in app-name order.
    pub fn security_tags(&self) -> Vec<SecurityTag> {
        self.apps.iter().map(|app| self.snap.security_tag(app)).collect()
    }

    pub fn reference(&self) -> EndpointRef {
        EndpointRef { snap: self.snap.name.clone(), name: self.name.clone() }
    }
}

impl Slot {
    pub fn security_tags(&self) -> Vec<SecurityTag> {
        self.apps.iter().map(|app| self.snap.security_tag(app)).collect()
    }

    pub fn reference(&self) -> EndpointRef {
        EndpointRef { snap: self.snap.name.clone(), name: self.name.clone() }
    }
}

/// `<snap>:<plug-or-slot>` reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EndpointRef {
    pub snap: SnapName,
    pub name: EndpointName,
}

impl fmt::Display for EndpointRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.snap, self.name)
    }
}

/// `<plug-ref> <slot-ref>`, identifying one connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnRef {
    pub plug: EndpointRef,
    pub slot: EndpointRef,
}

impl fmt::Display for ConnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.plug, self.slot)
    }
}
