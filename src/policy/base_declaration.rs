//!
//! The base declaration: default install-time and auto-connection policy.
//!
//! Every interface contributes an indentation-significant fragment through its
//! `MetaData`. Fragments are rendered from typed [`InterfaceRule`]s and the
//! assembled declaration is read back with `serde_yaml`, so what the
//! installation subsystem consults is exactly what was published.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;
use crate::interface::Interface;
use crate::types::SnapType;

const HEADER: &str = "type: base-declaration\nauthority-id: canonical\nseries: 16\n";

/// Which side of a connection a rule governs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Plug,
    Slot,
}

impl Side {
    fn section(&self) -> &'static str {
        match self {
            Side::Plug => "plugs",
            Side::Slot => "slots",
        }
    }

    fn snap_type_key(&self) -> &'static str {
        match self {
            Side::Plug => "plug-snap-type",
            Side::Slot => "slot-snap-type",
        }
    }
}

/// Snap type as written in declarations. `core` covers both the legacy core
/// snap (`os`) and `snapd`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclSnapType {
    Core,
    App,
    Gadget,
    Kernel,
    Base,
}

impl DeclSnapType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclSnapType::Core => "core",
            DeclSnapType::App => "app",
            DeclSnapType::Gadget => "gadget",
            DeclSnapType::Kernel => "kernel",
            DeclSnapType::Base => "base",
        }
    }

    pub fn matches(&self, snap_type: SnapType) -> bool {
        match self {
            DeclSnapType::Core => snap_type.is_core(),
            DeclSnapType::App => snap_type == SnapType::App,
            DeclSnapType::Gadget => snap_type == SnapType::Gadget,
            DeclSnapType::Kernel => snap_type == SnapType::Kernel,
            DeclSnapType::Base => snap_type == SnapType::Base,
        }
    }
}

/// `allow-installation` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowInstallation {
    /// `allow-installation: true`
    Any,
    /// `allow-installation: false`
    Never,
    /// `allow-installation: { <side>-snap-type: [...] }`
    SnapTypes(Vec<DeclSnapType>),
}

impl AllowInstallation {
    pub fn permits(&self, snap_type: SnapType) -> bool {
        match self {
            AllowInstallation::Any => true,
            AllowInstallation::Never => false,
            AllowInstallation::SnapTypes(types) => types.iter().any(|t| t.matches(snap_type)),
        }
    }
}

/// Base declaration rule of one interface, for one side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceRule {
    pub allow_installation: Option<AllowInstallation>,
    pub deny_auto_connection: bool,
}

impl InterfaceRule {
    /// Slot may only be installed by the given snap types.
    pub fn installable_by(mut self, types: &[DeclSnapType]) -> Self {
        self.allow_installation = Some(AllowInstallation::SnapTypes(types.to_vec()));
        self
    }

    pub fn deny_auto_connection(mut self) -> Self {
        self.deny_auto_connection = true;
        self
    }

    /// Renders the fragment carried in `MetaData`, two-space indented under
    /// the section key.
    pub fn render(&self, iface: &str, side: Side) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "  {iface}:");
        match &self.allow_installation {
            None => {}
            Some(AllowInstallation::Any) => out.push_str("    allow-installation: true\n"),
            Some(AllowInstallation::Never) => out.push_str("    allow-installation: false\n"),
            Some(AllowInstallation::SnapTypes(types)) => {
                let _ = writeln!(out, "    allow-installation:\n      {}:", side.snap_type_key());
                for t in types {
                    let _ = writeln!(out, "        - {}", t.as_str());
                }
            }
        }
        if self.deny_auto_connection {
            out.push_str("    deny-auto-connection: true\n");
        }
        out
    }
}

// --- Parsing ----------------------------------------------------------------

// Each section only accepts its own `<side>-snap-type` key.

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSlotAllow {
    Flag(bool),
    Types {
        #[serde(rename = "slot-snap-type")]
        snap_types: Vec<DeclSnapType>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPlugAllow {
    Flag(bool),
    Types {
        #[serde(rename = "plug-snap-type")]
        snap_types: Vec<DeclSnapType>,
    },
}

impl From<RawSlotAllow> for AllowInstallation {
    fn from(raw: RawSlotAllow) -> Self {
        match raw {
            RawSlotAllow::Flag(flag) => AllowInstallation::from_flag(flag),
            RawSlotAllow::Types { snap_types } => AllowInstallation::SnapTypes(snap_types),
        }
    }
}

impl From<RawPlugAllow> for AllowInstallation {
    fn from(raw: RawPlugAllow) -> Self {
        match raw {
            RawPlugAllow::Flag(flag) => AllowInstallation::from_flag(flag),
            RawPlugAllow::Types { snap_types } => AllowInstallation::SnapTypes(snap_types),
        }
    }
}

impl AllowInstallation {
    fn from_flag(flag: bool) -> Self {
        if flag {
            AllowInstallation::Any
        } else {
            AllowInstallation::Never
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawRule<A> {
    #[serde(rename = "allow-installation", default = "Option::default")]
    allow_installation: Option<A>,
    #[serde(rename = "deny-auto-connection", default)]
    deny_auto_connection: bool,
}

type RawSection<A> = Option<BTreeMap<String, Option<RawRule<A>>>>;

#[derive(Debug, Deserialize)]
struct RawDeclaration {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    plugs: RawSection<RawPlugAllow>,
    #[serde(default)]
    slots: RawSection<RawSlotAllow>,
}

impl<A: Into<AllowInstallation>> From<RawRule<A>> for InterfaceRule {
    fn from(raw: RawRule<A>) -> Self {
        InterfaceRule {
            allow_installation: raw.allow_installation.map(Into::into),
            deny_auto_connection: raw.deny_auto_connection,
        }
    }
}

fn convert<A: Into<AllowInstallation>>(section: RawSection<A>) -> BTreeMap<String, InterfaceRule> {
    section
        .unwrap_or_default()
        .into_iter()
        .map(|(name, raw)| (name, raw.map(InterfaceRule::from).unwrap_or_default()))
        .collect()
}

/// The assembled base declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseDeclaration {
    text: String,
    plugs: BTreeMap<String, InterfaceRule>,
    slots: BTreeMap<String, InterfaceRule>,
}

impl BaseDeclaration {
    /// Assembles the declaration from every interface's metadata fragments.
    pub fn from_interfaces<'a>(
        ifaces: impl IntoIterator<Item = &'a dyn Interface>,
    ) -> Result<Self, PolicyError> {
        let mut plugs = String::new();
        let mut slots = String::new();
        for iface in ifaces {
            let md = iface.metadata();
            push_fragment(&mut plugs, &md.base_declaration_plugs);
            push_fragment(&mut slots, &md.base_declaration_slots);
        }
        let mut text = String::from(HEADER);
        for (side, body) in [(Side::Plug, plugs), (Side::Slot, slots)] {
            if !body.is_empty() {
                let _ = writeln!(text, "{}:", side.section());
                text.push_str(&body);
            }
        }
        Self::parse(&text)
    }

    /// Reads a declaration published in the format produced by
    /// [`BaseDeclaration::from_interfaces`].
    pub fn parse(text: &str) -> Result<Self, PolicyError> {
        let raw: RawDeclaration =
            serde_yaml::from_str(text).map_err(|e| PolicyError::Parse(e.to_string()))?;
        if raw.kind != "base-declaration" {
            return Err(PolicyError::Parse(format!("unexpected assertion type {:?}", raw.kind)));
        }
        Ok(BaseDeclaration {
            text: text.to_string(),
            plugs: convert(raw.plugs),
            slots: convert(raw.slots),
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn rule(&self, side: Side, iface: &str) -> Option<&InterfaceRule> {
        match side {
            Side::Plug => self.plugs.get(iface),
            Side::Slot => self.slots.get(iface),
        }
    }

    pub fn slot_rule(&self, iface: &str) -> Option<&InterfaceRule> {
        self.rule(Side::Slot, iface)
    }

    pub fn plug_rule(&self, iface: &str) -> Option<&InterfaceRule> {
        self.rule(Side::Plug, iface)
    }

    /// Checks whether a snap of `snap_type` may install a slot of `iface`.
    /// Interfaces without an `allow-installation` constraint are allowed.
    pub fn check_slot_installation(&self, iface: &str, snap_type: SnapType) -> Result<(), PolicyError> {
        let allowed = match self.slot_rule(iface).and_then(|rule| rule.allow_installation.as_ref()) {
            Some(allow) => allow.permits(snap_type),
            None => true,
        };
        if !allowed {
            tracing::warn!(interface = iface, %snap_type, "slot installation denied by base declaration");
            return Err(PolicyError::InstallationDenied {
                interface: iface.to_string(),
                snap_type: snap_type.to_string(),
            });
        }
        Ok(())
    }

    /// Whether either side of `iface` carries `deny-auto-connection: true`.
    pub fn denies_auto_connection(&self, iface: &str) -> bool {
        [Side::Plug, Side::Slot]
            .iter()
            .filter_map(|side| self.rule(*side, iface))
            .any(|rule| rule.deny_auto_connection)
    }
}

fn push_fragment(body: &mut String, fragment: &str) {
    let fragment = fragment.trim_matches('\n');
    if fragment.is_empty() {
        return;
    }
    body.push_str(fragment);
    body.push('\n');
}
