#![no_main]

use libfuzzer_sys::fuzz_target;
use llm_markdown_converter::converter::{ConversionOptions, MarkdownConverter};

fuzz_target!(|data: &[u8]| {
    let Ok(html) = std::str::from_utf8(data) else {
        return;
    };

    let options = ConversionOptions {
        include_metadata: true,
        ..Default::default()
    };
    let converter = MarkdownConverter::with_options(options);

    // Errors are fine, panics are not
    if let Ok(result) = converter.convert(html)
        && let Some(metadata) = result.metadata
    {
        assert_eq!(metadata.output_size, result.markdown.len());
    }
});
