//! Built-in interface variants.

pub mod fuse_support;

pub use fuse_support::FuseSupportInterface;

use crate::config::InterfacesConfig;
use crate::interface::Interface;

/// Every built-in interface, configured for the host described by `config`.
pub fn interfaces(config: &InterfacesConfig) -> Vec<Box<dyn Interface>> {
    vec![Box::new(FuseSupportInterface::new(&config.release))]
}
