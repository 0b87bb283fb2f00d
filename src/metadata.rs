//! Static descriptive record of an interface type.

use serde::{Deserialize, Serialize};

/// Facts about one interface type. Built once by the interface constructor and
/// never mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetaData {
    /// One-line human summary.
    pub summary: String,
    /// The core snap provides an implicit slot on Ubuntu Core systems.
    pub implicit_on_core: bool,
    /// The core snap provides an implicit slot on classic systems.
    pub implicit_on_classic: bool,
    /// Slot-side base declaration fragment (indentation significant).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub base_declaration_slots: String,
    /// Plug-side base declaration fragment.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub base_declaration_plugs: String,
}

impl MetaData {
    /// Whether the core snap carries an implicit slot on this system.
    pub fn implicit_slot(&self, on_classic: bool) -> bool {
        if on_classic {
            self.implicit_on_classic
        } else {
            self.implicit_on_core
        }
    }
}
