//!
//! AppArmor profile fragments.
//!
//! Rules are typed records rendered to profile syntax at the boundary. Paths
//! are either compile-time literals or snap-scoped locations resolved against
//! the snap the specification belongs to, so no caller-supplied string ever
//! reaches the profile text. Mount option sets form a closed enum: only the
//! safe read-only and read-write sets exist.

use std::fmt::{self, Write as _};

use crate::backend::{
    ensure_plug_owned, ensure_slot_owned, Backend, BackendSpecification, CompiledSnippets,
    TaggedSnippets,
};
use crate::error::InterfaceError;
use crate::interface::Interface;
use crate::primitives::{Plug, SnapInfo, Slot};
use crate::types::SecurityTag;

/// Permission letter masks, combined with `|`.
pub mod perms {
    pub type Perms = u8;

    pub const READ: Perms = 1 << 0;
    pub const WRITE: Perms = 1 << 1;

    pub(super) const LETTERS: [(Perms, char); 2] =
        [(READ, 'r'), (WRITE, 'w')];
}

use perms::Perms;

fn render_perms(mask: Perms) -> String {
    perms::LETTERS
        .iter()
        .filter(|(bit, _)| mask & bit == *bit)
        .map(|(_, letter)| *letter)
        .collect()
}

/// Linux capabilities that interfaces may grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinuxCapability {
    SysAdmin,
}

impl LinuxCapability {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinuxCapability::SysAdmin => "sys_admin",
        }
    }
}

/// Filesystem type pattern of a mount rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FsType {
    /// Any FUSE filesystem (`fuse.<command>`, e.g. `fuse.sshfs`).
    AnyFuse,
}

impl FsType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FsType::AnyFuse => "fuse.*",
        }
    }
}

/// The sanctioned mount option sets. `nosuid` and `nodev` are always forced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MountOptions {
    ReadOnlySafe,
    ReadWriteSafe,
}

impl MountOptions {
    pub const ALL: [MountOptions; 2] = [MountOptions::ReadOnlySafe, MountOptions::ReadWriteSafe];

    pub fn as_str(&self) -> &'static str {
        match self {
            MountOptions::ReadOnlySafe => "ro,nosuid,nodev",
            MountOptions::ReadWriteSafe => "rw,nosuid,nodev",
        }
    }
}

/// Source side of a mount rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MountSource {
    /// Any source (`**`). Local FUSE sources are mediated on the underlying
    /// file, not on the presentation at the mount point.
    Any,
}

/// Writable locations owned by the snap being compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapDir {
    /// `/home/*/snap/<snap>/<revision>/`, the per-user data directory.
    /// `@{HOME}` cannot be used in a mount point, hence the `*`.
    UserData,
    /// `/var/snap/<snap>/<revision>/`, the system data directory.
    SystemData,
}

impl SnapDir {
    pub const ALL: [SnapDir; 2] = [SnapDir::UserData, SnapDir::SystemData];

    /// Directory path for `snap`, with trailing slash.
    pub fn path(&self, snap: &SnapInfo) -> String {
        match self {
            SnapDir::UserData => format!("/home/*/snap/{}/{}/", snap.name, snap.revision),
            SnapDir::SystemData => format!("/var/snap/{}/{}/", snap.name, snap.revision),
        }
    }
}

/// One profile rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Rule {
    /// `# <text>`, a comment line.
    Comment(&'static str),
    /// `<path> <perms>,`
    Access { path: &'static str, perms: Perms },
    /// `capability <name>,`
    Capability(LinuxCapability),
    /// `mount fstype=<fs> options=(<opts>) <src> -> <dir>{,**/},`
    Mount {
        fstype: FsType,
        options: MountOptions,
        source: MountSource,
        target: SnapDir,
    },
    /// `deny <path> <perms>,`
    Deny { path: &'static str, perms: Perms },
}

impl Rule {
    pub fn access(path: &'static str, perms: Perms) -> Self {
        Rule::Access { path, perms }
    }

    pub fn deny(path: &'static str, perms: Perms) -> Self {
        Rule::Deny { path, perms }
    }

    fn render(&self, snap: &SnapInfo) -> String {
        match self {
            Rule::Comment(text) => format!("# {text}"),
            Rule::Access { path, perms } => format!("{path} {},", render_perms(*perms)),
            Rule::Capability(cap) => format!("capability {},", cap.as_str()),
            Rule::Mount { fstype, options, source, target } => {
                let source = match source {
                    MountSource::Any => "**",
                };
                format!(
                    "mount fstype={} options=({}) {} -> {}{{,**/}},",
                    fstype.as_str(),
                    options.as_str(),
                    source,
                    target.path(snap),
                )
            }
            Rule::Deny { path, perms } => format!("deny {path} {},", render_perms(*perms)),
        }
    }
}

/// A described group of rules, rendered as one snippet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snippet {
    description: Vec<&'static str>,
    rules: Vec<Rule>,
}

impl Snippet {
    pub fn new() -> Self {
        Snippet::default()
    }

    /// Adds a line to the `# Description:` header.
    pub fn describe(mut self, line: &'static str) -> Self {
        self.description.push(line);
        self
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Blank line separator between rule groups.
    pub fn gap(self) -> Self {
        self.rule(Rule::Comment(""))
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn render(&self, snap: &SnapInfo) -> String {
        let mut out = String::new();
        for (i, line) in self.description.iter().enumerate() {
            let prefix = if i == 0 { "# Description: " } else { "# " };
            let _ = writeln!(out, "{prefix}{line}");
        }
        if !self.description.is_empty() {
            out.push('\n');
        }
        for rule in &self.rules {
            match rule {
                Rule::Comment("") => out.push('\n'),
                _ => {
                    out.push_str(&rule.render(snap));
                    out.push('\n');
                }
            }
        }
        out
    }
}

/// AppArmor specification for one snap and one compilation pass.
#[derive(Debug, Clone)]
pub struct Specification {
    snap: SnapInfo,
    snippets: TaggedSnippets,
}

impl Specification {
    pub fn new(snap: &SnapInfo) -> Self {
        Specification { snap: snap.clone(), snippets: TaggedSnippets::default() }
    }

    /// Renders `snippet` for this snap and adds it to every tag in scope.
    pub fn add_snippet(&mut self, snippet: &Snippet) {
        let text = snippet.render(&self.snap);
        tracing::debug!(snap = %self.snap.name, tags = self.snippets.scope().len(), "apparmor snippet");
        self.snippets.add_to_scope(text);
    }

    fn scoped<T>(&mut self, tags: Vec<SecurityTag>, f: impl FnOnce(&mut Self) -> T) -> T {
        let previous = self.snippets.set_scope(tags);
        let out = f(self);
        self.snippets.set_scope(previous);
        out
    }

    /// Tags the next snippet will be added to.
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
    const BACKEND: Backend = Backend::AppArmor;

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
            iface.apparmor_connected_plug(spec, plug, &plug.attrs, slot, &slot.attrs)
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
            iface.apparmor_connected_slot(spec, plug, &plug.attrs, slot, &slot.attrs)
        })
    }

    fn add_permanent_plug(&mut self, iface: &dyn Interface, plug: &Plug) -> Result<(), InterfaceError> {
        ensure_plug_owned(&self.snap, plug)?;
        self.scoped(plug.security_tags(), |spec| iface.apparmor_permanent_plug(spec, plug))
    }

    fn add_permanent_slot(&mut self, iface: &dyn Interface, slot: &Slot) -> Result<(), InterfaceError> {
        ensure_slot_owned(&self.snap, slot)?;
        self.scoped(slot.security_tags(), |spec| iface.apparmor_permanent_slot(spec, slot))
    }

    fn finish(self) -> CompiledSnippets {
        self.snippets.freeze(Self::BACKEND, &self.snap)
    }
}

impl fmt::Display for Specification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for snippet in self.snippets() {
            f.write_str(snippet)?;
        }
        Ok(())
    }
}
