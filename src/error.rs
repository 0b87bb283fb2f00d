//!
//! Defines error types for the interface layer.
//!
//! Two classes exist. Recoverable errors (`InterfaceError` and friends) are
//! returned to the installation subsystem, which rejects the offending
//! declaration. Dispatch faults (`DispatchFault`) mean the registry handed an
//! endpoint to the wrong interface; they are never returned, only raised
//! through [`dispatch_fault`].

use std::fmt;

/// Errors raised while validating plugs/slots or building policy fragments.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InterfaceError {
    /// An attribute has the wrong shape for the interface.
    #[error("{endpoint} {name:?} has invalid attribute {attr:?}: {reason}")]
    InvalidAttribute {
        endpoint: EndpointKind,
        name: String,
        attr: String,
        reason: String,
    },
    /// An attribute required to build the fragment is absent.
    #[error("{endpoint} {name:?} is missing required attribute {attr:?}")]
    MissingAttribute {
        endpoint: EndpointKind,
        name: String,
        attr: String,
    },
    /// An endpoint was handed to the specification of another snap revision.
    #[error("{endpoint} {name:?} belongs to {owner}, not to {snap}")]
    ForeignEndpoint {
        endpoint: EndpointKind,
        name: String,
        owner: String,
        snap: String,
    },
    /// An identifier failed validation and may not be substituted into policy.
    #[error(transparent)]
    Identifier(#[from] IdentifierError),
}

/// Plug or slot, used to label errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointKind {
    Plug,
    Slot,
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointKind::Plug => f.write_str("plug"),
            EndpointKind::Slot => f.write_str("slot"),
        }
    }
}

/// Validation failures for names and tokens that end up in policy text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    #[error("invalid snap name: {0:?}")]
    SnapName(String),
    #[error("invalid application name: {0:?}")]
    AppName(String),
    #[error("invalid snap revision: {0:?}")]
    Revision(String),
    #[error("invalid snap type: {0:?}")]
    SnapType(String),
    #[error("invalid syscall name: {0:?}")]
    Syscall(String),
    #[error("invalid interface name: {0:?}")]
    InterfaceName(String),
    #[error("invalid plug or slot name: {0:?}")]
    EndpointName(String),
}

/// Errors from building or querying the interface registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("interface {0:?} is already registered")]
    Duplicate(String),
    #[error("unknown interface {0:?}")]
    UnknownInterface(String),
    #[error("interface registry is already initialized")]
    AlreadyInitialized,
    #[error(transparent)]
    Interface(#[from] InterfaceError),
}

/// Errors from reading the base declaration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error("cannot parse base declaration: {0}")]
    Parse(String),
    #[error("snap type {snap_type} may not install a slot of interface {interface:?}")]
    InstallationDenied { interface: String, snap_type: String },
}

/// Errors from the connection lifecycle and compilation passes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    #[error("plug interface {plug:?} does not match slot interface {slot:?}")]
    InterfaceMismatch { plug: String, slot: String },
    #[error("connection {0} cannot move from {1} to {2}")]
    InvalidTransition(String, String, String),
    #[error("connection {conn} belongs to snap {plug_snap:?}, not {pass_snap:?}")]
    ForeignSnap {
        conn: String,
        plug_snap: String,
        pass_snap: String,
    },
    #[error(transparent)]
    Interface(#[from] InterfaceError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Errors from loading configuration supplied by the embedding system.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot parse configuration: {0}")]
    Parse(String),
    #[error("os-release data has no {0} field")]
    MissingField(&'static str),
}

/// A registry dispatch bug: an endpoint reached an interface it does not belong to.
///
/// Not an error value: it is only ever raised through [`dispatch_fault`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchFault {
    pub endpoint: EndpointKind,
    pub expected: String,
    pub actual: String,
}

impl fmt::Display for DispatchFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} is not of interface {:?} (declared {:?})",
            self.endpoint, self.expected, self.actual
        )
    }
}

/// Raises a dispatch fault. Does not return.
#[cold]
#[track_caller]
pub fn dispatch_fault(fault: DispatchFault) -> ! {
    tracing::error!(
        endpoint = %fault.endpoint,
        expected = %fault.expected,
        actual = %fault.actual,
        "interface dispatch fault"
    );
    panic!("{}", fault)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_fault_message() {
        let fault = DispatchFault {
            endpoint: EndpointKind::Slot,
            expected: "fuse-support".into(),
            actual: "network".into(),
        };
        assert_eq!(
            fault.to_string(),
            "slot is not of interface \"fuse-support\" (declared \"network\")"
        );
    }

    #[test]
    #[should_panic(expected = "plug is not of interface \"fuse-support\"")]
    fn test_dispatch_fault_panics() {
        dispatch_fault(DispatchFault {
            endpoint: EndpointKind::Plug,
            expected: "fuse-support".into(),
            actual: "home".into(),
        });
    }

    #[test]
    fn test_identifier_error_converts() {
        let err: InterfaceError = IdentifierError::AppName("-x".into()).into();
        assert_eq!(err.to_string(), "invalid application name: \"-x\"");
    }
}
