//!
//! Validated identifiers shared across the crate.
//!
//! Everything in here may end up substituted into policy text (profile
//! variables, udev tags, security labels), so values can only be constructed
//! through validation. Once built, a `SnapName` or `AppName` is known to contain
//! nothing but lowercase/alphanumeric characters and single hyphens.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::IdentifierError;

static SNAP_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[a-z0-9]+-?)*[a-z](?:-?[a-z0-9])*$").expect("snap name regex"));
static APP_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9](?:-?[a-zA-Z0-9])*$").expect("app name regex"));
static INTERFACE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z](?:-?[a-z0-9])*$").expect("interface name regex"));

const SNAP_NAME_MIN_LEN: usize = 2;
const SNAP_NAME_MAX_LEN: usize = 40;

/// Name of a snap, e.g. `alpha`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SnapName(String);

impl SnapName {
    pub fn new(name: impl Into<String>) -> Result<Self, IdentifierError> {
        let name = name.into();
        let len_ok = (SNAP_NAME_MIN_LEN..=SNAP_NAME_MAX_LEN).contains(&name.len());
        if !len_ok || !SNAP_NAME_RE.is_match(&name) {
            return Err(IdentifierError::SnapName(name));
        }
        Ok(SnapName(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Name of an application inside a snap, e.g. `alpha-app`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AppName(String);

impl AppName {
    pub fn new(name: impl Into<String>) -> Result<Self, IdentifierError> {
        let name = name.into();
        if !APP_NAME_RE.is_match(&name) {
            return Err(IdentifierError::AppName(name));
        }
        Ok(AppName(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Name of an interface, e.g. `fuse-support`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterfaceName(String);

impl InterfaceName {
    pub fn new(name: impl Into<String>) -> Result<Self, IdentifierError> {
        let name = name.into();
        if !INTERFACE_NAME_RE.is_match(&name) {
            return Err(IdentifierError::InterfaceName(name));
        }
        Ok(InterfaceName(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Name of a plug or slot within its snap. Often, but not necessarily, the
/// name of the interface it declares.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointName(String);

impl EndpointName {
    pub fn new(name: impl Into<String>) -> Result<Self, IdentifierError> {
        let name = name.into();
        if !INTERFACE_NAME_RE.is_match(&name) {
            return Err(IdentifierError::EndpointName(name));
        }
        Ok(EndpointName(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Snap revision.
///
/// Store revisions are positive. Locally installed (unasserted) revisions are
/// negative and rendered with an `x` prefix, so `-3` is `x3`. Zero means
/// "unset" and is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Revision(i32);

impl Revision {
    pub fn new(n: i32) -> Result<Self, IdentifierError> {
        if n == 0 {
            return Err(IdentifierError::Revision(n.to_string()));
        }
        Ok(Revision(n))
    }

    pub fn number(&self) -> i32 {
        self.0
    }

    pub fn is_local(&self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_local() {
            write!(f, "x{}", self.0.unsigned_abs())
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl FromStr for Revision {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || IdentifierError::Revision(s.to_string());
        let n = match s.strip_prefix('x') {
            // i32::MIN has no positive counterpart; reject instead of wrapping.
            Some(local) => local.parse::<i32>().ok().filter(|n| *n > 0).map(|n| -n),
            None => s.parse::<i32>().ok().filter(|n| *n > 0),
        };
        n.ok_or_else(invalid).and_then(Revision::new)
    }
}

/// Snap type, as declared in the snap manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapType {
    App,
    Gadget,
    Kernel,
    Base,
    Os,
    Snapd,
}

impl SnapType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapType::App => "app",
            SnapType::Gadget => "gadget",
            SnapType::Kernel => "kernel",
            SnapType::Base => "base",
            SnapType::Os => "os",
            SnapType::Snapd => "snapd",
        }
    }

    /// Whether this snap type provides the platform's implicit slots.
    pub fn is_core(&self) -> bool {
        matches!(self, SnapType::Os | SnapType::Snapd)
    }
}

impl fmt::Display for SnapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SnapType {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "app" => Ok(SnapType::App),
            "gadget" => Ok(SnapType::Gadget),
            "kernel" => Ok(SnapType::Kernel),
            "base" => Ok(SnapType::Base),
            "os" => Ok(SnapType::Os),
            "snapd" => Ok(SnapType::Snapd),
            _ => Err(IdentifierError::SnapType(s.to_string())),
        }
    }
}

/// Security tag of one application: `snap.<snap>.<app>`.
///
/// Profiles, filters and udev tags are all keyed by it. Only derivable from
/// validated names, never parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SecurityTag(String);

impl SecurityTag {
    pub fn for_app(snap: &SnapName, app: &AppName) -> Self {
        SecurityTag(format!("snap.{}.{}", snap.as_str(), app.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The udev flavour of the tag (`snap_<snap>_<app>`). Udev tags may not
    /// contain dots.
    pub fn udev_tag(&self) -> String {
        self.0.replace('.', "_")
    }
}

// Display/serde plumbing for the string newtypes.
macro_rules! string_identifier {
    ($($ty:ident),*) => {$(
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $ty {
            type Err = IdentifierError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $ty::new(s)
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                $ty::new(raw).map_err(serde::de::Error::custom)
            }
        }
    )*};
}

string_identifier!(SnapName, AppName, InterfaceName, EndpointName);

impl fmt::Display for SecurityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for SecurityTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl Serialize for Revision {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Revision {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snap_names() {
        for ok in ["alpha", "a1", "hello-world", "0ad", "ab"] {
            assert!(SnapName::new(ok).is_ok(), "{ok} should be valid");
        }
        for bad in ["", "a", "Alpha", "-alpha", "alpha-", "al--pha", "1234", "al_pha", "a.b", "al pha"] {
            assert!(SnapName::new(bad).is_err(), "{bad} should be invalid");
        }
        assert!(SnapName::new("a".repeat(40)).is_ok());
        assert!(SnapName::new("a".repeat(41)).is_err());
    }

    #[test]
    fn test_app_names() {
        for ok in ["alpha-app", "App1", "x", "9"] {
            assert!(AppName::new(ok).is_ok(), "{ok} should be valid");
        }
        for bad in ["", "-a", "a-", "a--b", "a_b", "a.b", "a\"b", "a b"] {
            assert!(AppName::new(bad).is_err(), "{bad} should be invalid");
        }
    }

    #[test]
    fn test_revision_parse_and_display() {
        assert_eq!("12".parse::<Revision>().unwrap(), Revision::new(12).unwrap());
        assert_eq!("x3".parse::<Revision>().unwrap().number(), -3);
        assert_eq!(Revision::new(-3).unwrap().to_string(), "x3");
        assert_eq!(Revision::new(12).unwrap().to_string(), "12");
        assert!(Revision::new(0).is_err());
        for bad in ["0", "x0", "-1", "x-1", "abc", "", "12a"] {
            assert!(bad.parse::<Revision>().is_err(), "{bad} should be invalid");
        }
    }

    #[test]
    fn test_endpoint_names() {
        assert_eq!(EndpointName::new("fuse").unwrap().as_str(), "fuse");
        assert_eq!(
            EndpointName::new("Fuse").unwrap_err(),
            IdentifierError::EndpointName("Fuse".into())
        );
        let name: EndpointName = serde_json::from_str("\"my-fuse\"").unwrap();
        assert_eq!(name.to_string(), "my-fuse");
    }

    #[test]
    fn test_security_tag_and_udev_tag() {
        let snap = SnapName::new("alpha").unwrap();
        let app = AppName::new("alpha-app").unwrap();
        let tag = SecurityTag::for_app(&snap, &app);
        assert_eq!(tag.as_str(), "snap.alpha.alpha-app");
        assert_eq!(tag.udev_tag(), "snap_alpha_alpha-app");
    }

    #[test]
    fn test_snap_type_roundtrip_and_core() {
        assert_eq!("os".parse::<SnapType>().unwrap(), SnapType::Os);
        assert!(SnapType::Os.is_core());
        assert!(SnapType::Snapd.is_core());
        assert!(!SnapType::App.is_core());
        assert!("core".parse::<SnapType>().is_err());
    }

    #[test]
    fn test_deserialize_rejects_invalid_names() {
        let res: Result<SnapName, _> = serde_json::from_str("\"Bad Name\"");
        assert!(res.is_err());
        let ok: AppName = serde_json::from_str("\"alpha-app\"").unwrap();
        assert_eq!(ok.as_str(), "alpha-app");
    }
}
