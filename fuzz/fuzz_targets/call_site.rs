#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        // A found locator always ends in the line digits
        if let Ok(locator) = bt::CallSite::explicit(text).locator() {
            assert!(locator.ends_with(|c: char| c.is_ascii_digit()));
        }
        let _ = bt::StableKey::for_name(text);
    }
});
