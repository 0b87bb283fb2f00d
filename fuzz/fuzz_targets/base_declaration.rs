#![no_main]

// Harness: base_declaration
// Focus: arbitrary assertion text parses or errors, never panics.

use libfuzzer_sys::fuzz_target;
use snap_interfaces::policy::BaseDeclaration;
use snap_interfaces::types::SnapType;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else { return };
    if let Ok(decl) = BaseDeclaration::parse(text) {
        let _ = decl.check_slot_installation("fuse-support", SnapType::App);
        let _ = decl.denies_auto_connection("fuse-support");
    }
});
