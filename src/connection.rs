//!
//! Connection lifecycle and policy compilation.
//!
//! A connection moves through
//! `Declared -> Sanitized -> AutoConnectEvaluated -> {Connected | AwaitingConsent} -> PolicyCompiled`
//! and ends in `Disconnected`. `AwaitingConsent` only leaves through
//! [`Connection::grant_consent`].
//!
//! A [`CompilationPass`] owns one specification per backend for one snap and
//! runs every interface hook for that snap's connections. Passes for different
//! snaps share nothing but the read-only registry.

use std::fmt;

use serde::Serialize;

use crate::backend::{apparmor, seccomp, udev, BackendSpecification, CompiledSnippets};
use crate::error::ConnectionError;
use crate::policy::{decide_connection, BaseDeclaration, ConnectionDecision};
use crate::primitives::{ConnRef, Plug, SnapInfo, Slot};
use crate::registry::Registry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionState {
    Declared,
    Sanitized,
    AutoConnectEvaluated,
    Connected,
    AwaitingConsent,
    PolicyCompiled,
    Disconnected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Declared => "declared",
            ConnectionState::Sanitized => "sanitized",
            ConnectionState::AutoConnectEvaluated => "auto-connect-evaluated",
            ConnectionState::Connected => "connected",
            ConnectionState::AwaitingConsent => "awaiting-consent",
            ConnectionState::PolicyCompiled => "policy-compiled",
            ConnectionState::Disconnected => "disconnected",
        };
        f.write_str(s)
    }
}

/// A plug/slot pairing and where it is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    plug: Plug,
    slot: Slot,
    state: ConnectionState,
    decision: Option<ConnectionDecision>,
}

impl Connection {
    /// Pairs a plug with a slot. Both must name the same interface.
    pub fn new(plug: Plug, slot: Slot) -> Result<Self, ConnectionError> {
        if plug.interface != slot.interface {
            return Err(ConnectionError::InterfaceMismatch {
                plug: plug.interface.clone(),
                slot: slot.interface.clone(),
            });
        }
        Ok(Connection { plug, slot, state: ConnectionState::Declared, decision: None })
    }

    pub fn plug(&self) -> &Plug {
        &self.plug
    }

    pub fn slot(&self) -> &Slot {
        &self.slot
    }

    pub fn interface(&self) -> &str {
        &self.plug.interface
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn decision(&self) -> Option<ConnectionDecision> {
        self.decision
    }

    pub fn reference(&self) -> ConnRef {
        ConnRef { plug: self.plug.reference(), slot: self.slot.reference() }
    }

    fn check(&self, from: &[ConnectionState], to: ConnectionState) -> Result<(), ConnectionError> {
        if !from.contains(&self.state) {
            return Err(ConnectionError::InvalidTransition(
                self.reference().to_string(),
                self.state.to_string(),
                to.to_string(),
            ));
        }
        Ok(())
    }

    fn transition(
        &mut self,
        from: &[ConnectionState],
        to: ConnectionState,
    ) -> Result<(), ConnectionError> {
        self.check(from, to)?;
        tracing::debug!(conn = %self.reference(), from = %self.state, %to, "connection transition");
        self.state = to;
        Ok(())
    }

    /// Validates both endpoints through the registry.
    pub fn sanitize(&mut self, registry: &Registry) -> Result<(), ConnectionError> {
        self.check(&[ConnectionState::Declared], ConnectionState::Sanitized)?;
        registry.sanitize_plug(&self.plug)?;
        registry.sanitize_slot(&self.slot)?;
        self.transition(&[ConnectionState::Declared], ConnectionState::Sanitized)
    }

    /// Records whether the connection may form without consent.
    pub fn evaluate(
        &mut self,
        registry: &Registry,
        decl: &BaseDeclaration,
    ) -> Result<ConnectionDecision, ConnectionError> {
        let iface = registry.require(self.interface())?;
        self.transition(&[ConnectionState::Sanitized], ConnectionState::AutoConnectEvaluated)?;
        let decision = decide_connection(iface, decl, &self.plug, &self.slot);
        self.decision = Some(decision);
        Ok(decision)
    }

    /// Acts on the recorded decision: connects, or parks the connection until
    /// consent is given.
    pub fn form(&mut self) -> Result<ConnectionState, ConnectionError> {
        let to = match self.decision {
            Some(ConnectionDecision::AutoConnect) => ConnectionState::Connected,
            _ => ConnectionState::AwaitingConsent,
        };
        self.transition(&[ConnectionState::AutoConnectEvaluated], to)?;
        Ok(to)
    }

    /// Explicit consent for a connection that could not auto-connect.
    pub fn grant_consent(&mut self) -> Result<(), ConnectionError> {
        self.transition(&[ConnectionState::AwaitingConsent], ConnectionState::Connected)
    }

    /// Marks the connection compiled once `policy` contains it.
    pub fn mark_compiled(&mut self, policy: &CompiledPolicy) -> Result<(), ConnectionError> {
        if !policy.connections.contains(&self.reference()) {
            return Err(ConnectionError::InvalidTransition(
                self.reference().to_string(),
                self.state.to_string(),
                ConnectionState::PolicyCompiled.to_string(),
            ));
        }
        self.transition(
            &[ConnectionState::Connected, ConnectionState::PolicyCompiled],
            ConnectionState::PolicyCompiled,
        )
    }

    pub fn disconnect(&mut self) -> Result<(), ConnectionError> {
        self.transition(
            &[
                ConnectionState::Connected,
                ConnectionState::AwaitingConsent,
                ConnectionState::PolicyCompiled,
            ],
            ConnectionState::Disconnected,
        )
    }

    fn is_established(&self) -> bool {
        matches!(self.state, ConnectionState::Connected | ConnectionState::PolicyCompiled)
    }
}

/// Policy produced by one compilation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledPolicy {
    pub apparmor: CompiledSnippets,
    pub seccomp: CompiledSnippets,
    pub udev: CompiledSnippets,
    pub connections: Vec<ConnRef>,
}

/// Accumulates policy for one snap across its connections.
#[derive(Debug)]
pub struct CompilationPass<'r> {
    registry: &'r Registry,
    snap: SnapInfo,
    apparmor: apparmor::Specification,
    seccomp: seccomp::Specification,
    udev: udev::Specification,
    connections: Vec<ConnRef>,
}

impl<'r> CompilationPass<'r> {
    pub fn new(registry: &'r Registry, snap: &SnapInfo) -> Self {
        CompilationPass {
            registry,
            snap: snap.clone(),
            apparmor: apparmor::Specification::new(snap),
            seccomp: seccomp::Specification::new(snap),
            udev: udev::Specification::new(snap),
            connections: Vec::new(),
        }
    }

    pub fn snap(&self) -> &SnapInfo {
        &self.snap
    }

    /// Runs the permanent hooks for a plug of this snap.
    pub fn add_plug(&mut self, plug: &Plug) -> Result<(), ConnectionError> {
        self.check_owner(&plug.snap, || plug.reference().to_string())?;
        let iface = self.registry.require(&plug.interface)?;
        self.apparmor.add_permanent_plug(iface, plug)?;
        self.seccomp.add_permanent_plug(iface, plug)?;
        self.udev.add_permanent_plug(iface, plug)?;
        Ok(())
    }

    /// Runs the permanent hooks for a slot of this snap.
    pub fn add_slot(&mut self, slot: &Slot) -> Result<(), ConnectionError> {
        self.check_owner(&slot.snap, || slot.reference().to_string())?;
        let iface = self.registry.require(&slot.interface)?;
        self.apparmor.add_permanent_slot(iface, slot)?;
        self.seccomp.add_permanent_slot(iface, slot)?;
        self.udev.add_permanent_slot(iface, slot)?;
        Ok(())
    }

    /// Runs the connected hooks for whichever side of `conn` this snap owns.
    pub fn add_connection(&mut self, conn: &Connection) -> Result<(), ConnectionError> {
        if !conn.is_established() {
            return Err(ConnectionError::InvalidTransition(
                conn.reference().to_string(),
                conn.state().to_string(),
                ConnectionState::PolicyCompiled.to_string(),
            ));
        }
        let (plug, slot) = (conn.plug(), conn.slot());
        // Ownership is per revision: rules render against this pass's revision.
        let owns_plug = plug.snap == self.snap;
        let owns_slot = slot.snap == self.snap;
        if !owns_plug && !owns_slot {
            return Err(ConnectionError::ForeignSnap {
                conn: conn.reference().to_string(),
                plug_snap: plug.snap.to_string(),
                pass_snap: self.snap.to_string(),
            });
        }
        let iface = self.registry.require(conn.interface())?;
        tracing::debug!(snap = %self.snap.name, conn = %conn.reference(), "compiling connection");
        if owns_plug {
            self.apparmor.add_connected_plug(iface, plug, slot)?;
            self.seccomp.add_connected_plug(iface, plug, slot)?;
            self.udev.add_connected_plug(iface, plug, slot)?;
        }
        if owns_slot {
            self.apparmor.add_connected_slot(iface, plug, slot)?;
            self.seccomp.add_connected_slot(iface, plug, slot)?;
            self.udev.add_connected_slot(iface, plug, slot)?;
        }
        self.connections.push(conn.reference());
        Ok(())
    }

    pub fn apparmor(&self) -> &apparmor::Specification {
        &self.apparmor
    }

    pub fn seccomp(&self) -> &seccomp::Specification {
        &self.seccomp
    }

    pub fn udev(&self) -> &udev::Specification {
        &self.udev
    }

    /// Ends the pass. The specifications cannot be touched afterwards.
    pub fn finish(self) -> CompiledPolicy {
        CompiledPolicy {
            apparmor: self.apparmor.finish(),
            seccomp: self.seccomp.finish(),
            udev: self.udev.finish(),
            connections: self.connections,
        }
    }

    fn check_owner(&self, owner: &SnapInfo, what: impl FnOnce() -> String) -> Result<(), ConnectionError> {
        if owner != &self.snap {
            return Err(ConnectionError::ForeignSnap {
                conn: what(),
                plug_snap: owner.to_string(),
                pass_snap: self.snap.to_string(),
            });
        }
        Ok(())
    }
}
