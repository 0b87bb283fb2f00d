//!
//! Udev rule fragments.
//!
//! Each rule matches one kernel device attribute and adds a tag. The tag is
//! the only substitution point and is always derived from a [`SecurityTag`],
//! itself built from validated snap and app names.

use std::fmt;

use crate::backend::{
    ensure_plug_owned, ensure_slot_owned, Backend, BackendSpecification, CompiledSnippets,
    TaggedSnippets,
};
use crate::error::InterfaceError;
use crate::interface::Interface;
use crate::primitives::{Plug, SnapInfo, Slot};
use crate::types::SecurityTag;

const HEADER: &str = "# Do not edit this file, it will be overwritten on updates\n";

/// Device attribute a rule matches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceMatch {
    /// `KERNEL=="<name>"`
    Kernel(&'static str),
}

impl fmt::Display for DeviceMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceMatch::Kernel(name) => write!(f, "KERNEL==\"{name}\""),
        }
    }
}

/// `<match>, TAG+="<udev tag>"`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagRule {
    pub device: DeviceMatch,
    pub tag: SecurityTag,
}

impl fmt::Display for TagRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, TAG+=\"{}\"", self.device, self.tag.udev_tag())
    }
}

/// A described tag rule, rendered as one snippet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    description: &'static str,
    rule: TagRule,
}

impl Snippet {
    pub fn new(description: &'static str, rule: TagRule) -> Self {
        Snippet { description, rule }
    }

    pub fn rule(&self) -> &TagRule {
        &self.rule
    }

    pub fn render(&self) -> String {
        format!("# {}\n#\n{HEADER}\n{}\n", self.description, self.rule)
    }
}

/// Udev specification for one snap and one compilation pass.
///
/// Unlike the other backends, rules name their tag explicitly: each rule is
/// filed under the security tag it applies.
#[derive(Debug, Clone)]
pub struct Specification {
    snap: SnapInfo,
    snippets: TaggedSnippets,
}

impl Specification {
    pub fn new(snap: &SnapInfo) -> Self {
        Specification { snap: snap.clone(), snippets: TaggedSnippets::default() }
    }

    pub fn add_snippet(&mut self, snippet: &Snippet) {
        tracing::debug!(snap = %self.snap.name, tag = %snippet.rule.tag, "udev snippet");
        self.snippets.add_for_tag(snippet.rule.tag.clone(), snippet.render());
    }

    pub fn snippets_for_tag(&self, tag: &SecurityTag) -> &[String] {
        self.snippets.for_tag(tag)
    }

    pub fn snippets(&self) -> impl Iterator<Item = &String> {
        self.snippets.all()
    }
}

impl BackendSpecification for Specification {
    const BACKEND: Backend = Backend::Udev;

    fn snap(&self) -> &SnapInfo {
        &self.snap
    }

    fn add_connected_plug(
        &mut self,
        iface: &dyn Interface,
        plug: &Plug,
        slot: &Slot,
    ) -> Result<(), InterfaceError> {
        ensure_plug_owned(&self.snap, plug)?;
        iface.udev_connected_plug(self, plug, &plug.attrs, slot, &slot.attrs)
    }

    fn add_connected_slot(
        &mut self,
        iface: &dyn Interface,
        plug: &Plug,
        slot: &Slot,
    ) -> Result<(), InterfaceError> {
        ensure_slot_owned(&self.snap, slot)?;
        iface.udev_connected_slot(self, plug, &plug.attrs, slot, &slot.attrs)
    }

    fn add_permanent_plug(&mut self, iface: &dyn Interface, plug: &Plug) -> Result<(), InterfaceError> {
        ensure_plug_owned(&self.snap, plug)?;
        iface.udev_permanent_plug(self, plug)
    }

    fn add_permanent_slot(&mut self, iface: &dyn Interface, slot: &Slot) -> Result<(), InterfaceError> {
        ensure_slot_owned(&self.snap, slot)?;
        iface.udev_permanent_slot(self, slot)
    }

    fn finish(self) -> CompiledSnippets {
        self.snippets.freeze(Self::BACKEND, &self.snap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AppName, SnapName};

    #[test]
    fn test_tag_rule_render() {
        let tag = SecurityTag::for_app(
            &SnapName::new("alpha").unwrap(),
            &AppName::new("alpha-app").unwrap(),
        );
        let rule = TagRule { device: DeviceMatch::Kernel("fuse"), tag };
        assert_eq!(rule.to_string(), r#"KERNEL=="fuse", TAG+="snap_alpha_alpha-app""#);
    }

    #[test]
    fn test_snippet_has_single_rule_line() {
        let tag = SecurityTag::for_app(&SnapName::new("beta").unwrap(), &AppName::new("b").unwrap());
        let snippet = Snippet::new(
            "This file contains udev rules for tests.",
            TagRule { device: DeviceMatch::Kernel("fuse"), tag },
        );
        let text = snippet.render();
        let rules: Vec<&str> = text.lines().filter(|l| !l.is_empty() && !l.starts_with('#')).collect();
        assert_eq!(rules, [r#"KERNEL=="fuse", TAG+="snap_beta_b""#]);
    }
}
