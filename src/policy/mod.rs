//! Connection policy: base declaration and the auto-connect decision.

pub mod base_declaration;

pub use base_declaration::{AllowInstallation, BaseDeclaration, DeclSnapType, InterfaceRule, Side};

use crate::interface::Interface;
use crate::primitives::{Plug, Slot};

/// Outcome of evaluating whether a connection may form on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionDecision {
    /// Form the connection without asking.
    AutoConnect,
    /// Hold the connection until consent is given.
    AwaitConsent,
}

/// Decides how a plug/slot pairing may be formed.
///
/// `deny-auto-connection` in the base declaration overrides the interface.
/// Otherwise the interface's own `auto_connect` decides.
pub fn decide_connection(
    iface: &dyn Interface,
    decl: &BaseDeclaration,
    plug: &Plug,
    slot: &Slot,
) -> ConnectionDecision {
    if decl.denies_auto_connection(iface.name()) {
        tracing::debug!(interface = iface.name(), "auto-connection denied by base declaration");
        return ConnectionDecision::AwaitConsent;
    }
    if iface.auto_connect(plug, slot) {
        ConnectionDecision::AutoConnect
    } else {
        ConnectionDecision::AwaitConsent
    }
}
