//!
//! Seccomp filter fragments: one syscall name per line, no arguments, no
//! negation.

use std::borrow::Cow;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::backend::{
    ensure_plug_owned, ensure_slot_owned, Backend, BackendSpecification, CompiledSnippets,
    TaggedSnippets,
};
use crate::error::{IdentifierError, InterfaceError};
use crate::interface::Interface;
use crate::primitives::{Plug, SnapInfo, Slot};
use crate::types::SecurityTag;

static SYSCALL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z_][a-z0-9_]*$").expect("syscall regex"));

/// A syscall name accepted by the filter compiler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Syscall(Cow<'static, str>);

impl Syscall {
    pub const MOUNT: Syscall = Syscall(Cow::Borrowed("mount"));

    pub fn new(name: impl Into<String>) -> Result<Self, IdentifierError> {
        let name = name.into();
        if !SYSCALL_RE.is_match(&name) {
            return Err(IdentifierError::Syscall(name));
        }
        Ok(Syscall(Cow::Owned(name)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Syscall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A described list of syscalls, rendered as one snippet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snippet {
    description: Vec<&'static str>,
    syscalls: Vec<Syscall>,
}

impl Snippet {
    pub fn new() -> Self {
        Snippet::default()
    }

    pub fn describe(mut self, line: &'static str) -> Self {
        self.description.push(line);
        self
    }

    pub fn allow(mut self, syscall: Syscall) -> Self {
        self.syscalls.push(syscall);
        self
    }

    pub fn syscalls(&self) -> &[Syscall] {
        &self.syscalls
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, line) in self.description.iter().enumerate() {
            out.push_str(if i == 0 { "# Description: " } else { "# " });
            out.push_str(line);
            out.push('\n');
        }
        if !self.description.is_empty() {
            out.push('\n');
        }
        for syscall in &self.syscalls {
            out.push_str(syscall.as_str());
            out.push('\n');
        }
        out
    }
}

/// Seccomp specification for one snap and one compilation pass.
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
        tracing::debug!(snap = %self.snap.name, syscalls = snippet.syscalls.len(), "seccomp snippet");
        self.snippets.add_to_scope(snippet.render());
    }

    fn scoped<T>(&mut self, tags: Vec<SecurityTag>, f: impl FnOnce(&mut Self) -> T) -> T {
        let previous = self.snippets.set_scope(tags);
        let out = f(self);
        self.snippets.set_scope(previous);
        out
    }

    pub fn security_tags(&self) -> &[SecurityTag] {
        self.snippets.scope()
    }

    pub fn snippets_for_tag(&self, tag: &SecurityTag) -> &[String] {
        self.snippets.for_tag(tag)
    }

    pub fn snippets(&self) -> impl Iterator<Item = &String> {
        self.snippets.all()
    }
}

impl BackendSpecification for Specification {
    const BACKEND: Backend = Backend::Seccomp;

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
        self.scoped(plug.security_tags(), |spec| {
            iface.seccomp_connected_plug(spec, plug, &plug.attrs, slot, &slot.attrs)
        })
    }

    fn add_connected_slot(
        &mut self,
        iface: &dyn Interface,
        plug: &Plug,
        slot: &Slot,
    ) -> Result<(), InterfaceError> {
        ensure_slot_owned(&self.snap, slot)?;
        self.scoped(slot.security_tags(), |spec| {
            iface.seccomp_connected_slot(spec, plug, &plug.attrs, slot, &slot.attrs)
        })
    }

    fn add_permanent_plug(&mut self, iface: &dyn Interface, plug: &Plug) -> Result<(), InterfaceError> {
        ensure_plug_owned(&self.snap, plug)?;
        self.scoped(plug.security_tags(), |spec| iface.seccomp_permanent_plug(spec, plug))
    }

    fn add_permanent_slot(&mut self, iface: &dyn Interface, slot: &Slot) -> Result<(), InterfaceError> {
        ensure_slot_owned(&self.snap, slot)?;
        self.scoped(slot.security_tags(), |spec| iface.seccomp_permanent_slot(spec, slot))
    }

    fn finish(self) -> CompiledSnippets {
        self.snippets.freeze(Self::BACKEND, &self.snap)
    }
}
