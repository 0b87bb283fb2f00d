//!
//! Per-backend policy specifications.
//!
//! A specification accumulates policy fragments for one snap during one
//! compilation pass. Interfaces append typed rules; text only appears when a
//! rule is rendered at the boundary, against the snap the pass belongs to.
//! `finish` freezes the pass into [`CompiledSnippets`], which has no mutation
//! path.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EndpointKind, InterfaceError};
use crate::interface::Interface;
use crate::primitives::{Plug, SnapInfo, Slot};
use crate::types::SecurityTag;

pub mod apparmor;
pub mod seccomp;
pub mod udev;

/// A platform security subsystem consuming generated fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    AppArmor,
    Seccomp,
    Udev,
}

impl Backend {
    pub fn name(&self) -> &'static str {
        match self {
            Backend::AppArmor => "apparmor",
            Backend::Seccomp => "seccomp",
            Backend::Udev => "udev",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Operations every backend specification offers to the compilation driver.
pub trait BackendSpecification: Sized {
    const BACKEND: Backend;

    /// The snap this pass compiles policy for.
    fn snap(&self) -> &SnapInfo;

    /// Runs the interface's connected-plug hook for this backend.
    fn add_connected_plug(
        &mut self,
        iface: &dyn Interface,
        plug: &Plug,
        slot: &Slot,
    ) -> Result<(), InterfaceError>;

    /// Runs the interface's connected-slot hook for this backend.
    fn add_connected_slot(
        &mut self,
        iface: &dyn Interface,
        plug: &Plug,
        slot: &Slot,
    ) -> Result<(), InterfaceError>;

    /// Runs the interface's permanent-plug hook for this backend.
    fn add_permanent_plug(&mut self, iface: &dyn Interface, plug: &Plug) -> Result<(), InterfaceError>;

    /// Runs the interface's permanent-slot hook for this backend.
    fn add_permanent_slot(&mut self, iface: &dyn Interface, slot: &Slot) -> Result<(), InterfaceError>;

    /// Ends the pass.
    fn finish(self) -> CompiledSnippets;
}

/// Fails unless `plug` belongs to exactly the snap revision `snap`. Snap-scoped
/// rules render against `snap`.
pub(crate) fn ensure_plug_owned(snap: &SnapInfo, plug: &Plug) -> Result<(), InterfaceError> {
    ensure_owned(snap, EndpointKind::Plug, &plug.reference().to_string(), &plug.snap)
}

/// Fails unless `slot` belongs to exactly the snap revision `snap`.
pub(crate) fn ensure_slot_owned(snap: &SnapInfo, slot: &Slot) -> Result<(), InterfaceError> {
    ensure_owned(snap, EndpointKind::Slot, &slot.reference().to_string(), &slot.snap)
}

fn ensure_owned(
    snap: &SnapInfo,
    endpoint: EndpointKind,
    name: &str,
    owner: &SnapInfo,
) -> Result<(), InterfaceError> {
    if owner != snap {
        tracing::warn!(%endpoint, name, %owner, %snap, "endpoint does not belong to this specification");
        return Err(InterfaceError::ForeignEndpoint {
            endpoint,
            name: name.to_string(),
            owner: owner.to_string(),
            snap: snap.to_string(),
        });
    }
    Ok(())
}

/// Ordered, de-duplicated snippets keyed by security tag.
///
/// Snippets added without an explicit tag go to every tag in the current
/// scope. The driver sets the scope around each hook call.
#[derive(Debug, Clone, Default)]
pub(crate) struct TaggedSnippets {
    by_tag: BTreeMap<SecurityTag, Vec<String>>,
    scope: Vec<SecurityTag>,
}

impl TaggedSnippets {
    /// Replaces the scope, returning the previous one.
    pub(crate) fn set_scope(&mut self, tags: Vec<SecurityTag>) -> Vec<SecurityTag> {
        std::mem::replace(&mut self.scope, tags)
    }

    pub(crate) fn scope(&self) -> &[SecurityTag] {
        &self.scope
    }

    pub(crate) fn add_to_scope(&mut self, snippet: String) {
        for tag in self.scope.clone() {
            self.add_for_tag(tag, snippet.clone());
        }
    }

    pub(crate) fn add_for_tag(&mut self, tag: SecurityTag, snippet: String) {
        let entries = self.by_tag.entry(tag).or_default();
        if !entries.contains(&snippet) {
            entries.push(snippet);
        }
    }

    pub(crate) fn for_tag(&self, tag: &SecurityTag) -> &[String] {
        self.by_tag.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn all(&self) -> impl Iterator<Item = &String> {
        self.by_tag.values().flatten()
    }

    pub(crate) fn freeze(self, backend: Backend, snap: &SnapInfo) -> CompiledSnippets {
        CompiledSnippets {
            backend,
            snap: snap.clone(),
            by_tag: self
                .by_tag
                .into_iter()
                .map(|(tag, snippets)| (tag.to_string(), snippets))
                .collect(),
        }
    }
}

/// Frozen output of one backend for one snap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledSnippets {
    backend: Backend,
    snap: SnapInfo,
    by_tag: BTreeMap<String, Vec<String>>,
}

impl CompiledSnippets {
    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn snap(&self) -> &SnapInfo {
        &self.snap
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.by_tag.keys().map(String::as_str)
    }

    pub fn for_tag(&self, tag: &str) -> &[String] {
        self.by_tag.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every snippet, grouped by tag in tag order.
    pub fn all(&self) -> impl Iterator<Item = &str> {
        self.by_tag.values().flatten().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.by_tag.values().all(Vec::is_empty)
    }
}
