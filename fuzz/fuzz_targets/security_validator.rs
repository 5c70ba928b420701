#![no_main]

use libfuzzer_sys::fuzz_target;
use llm_markdown_converter::security::{SecurityValidator, is_dangerous_url, sanitize_url};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    let validator = SecurityValidator::new();
    let _ = validator.validate_input(input);

    let safe = sanitize_url(input);
    assert!(safe.is_empty() || !is_dangerous_url(&safe));
    assert!(!safe.contains(' '));
});
