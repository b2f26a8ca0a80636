#![no_main]

use godisk_console::detect_directives;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let script = String::from_utf8_lossy(data);
    let detected = detect_directives(&script);
    assert!(detected.len() <= 12);
    assert_eq!(detected.len(), detected.kinds().len());
    for request in detected.requests() {
        assert!(!request.id.chars().any(char::is_whitespace));
        if let Some(max) = request.max {
            assert!(max > 0);
        }
    }
});
