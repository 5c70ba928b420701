//! Security validation tests
//!
//! This test suite validates that the converter neutralizes malicious HTML
//! input: scripts and embedded content are dropped, dangerous URL schemes
//! never reach the output, and oversized or pathologically nested input is
//! rejected with a typed error.

use llm_markdown_converter::converter::{ConversionOptions, MarkdownConverter};
use llm_markdown_converter::error::{ConversionError, ThreatType};
use llm_markdown_converter::parser::parse_html;
use llm_markdown_converter::security::MAX_INPUT_SIZE;

fn convert(html: &str) -> String {
    MarkdownConverter::new()
        .convert(html)
        .expect("Failed to convert")
        .markdown
}

/// Test that script tags are completely removed from output
#[test]
fn test_xss_script_tag_removal() {
    let html = r#"<html><body>
        <p>Before dangerous element</p>
        <script>alert('xss')</script>
        <p>After dangerous element</p>
    </body></html>"#;

    let markdown = convert(html);

    assert!(!markdown.contains("<script"));
    assert!(!markdown.contains("alert"));
    assert!(!markdown.contains("xss"));
    assert!(markdown.contains("Before dangerous element"));
    assert!(markdown.contains("After dangerous element"));
}

/// Test that inline script tags are removed
#[test]
fn test_xss_inline_script_removal() {
    let markdown = convert(r#"<p>Text <script>malicious()</script> more text</p>"#);

    assert!(!markdown.contains("script"));
    assert!(!markdown.contains("malicious"));
    assert!(markdown.contains("Text"));
    assert!(markdown.contains("more text"));
}

/// Test that event handler attributes never leak into output
#[test]
fn test_xss_event_handler_removal() {
    let html = r#"<html><body>
        <p onclick="alert('xss')">Click me</p>
        <div onload="malicious()">Content</div>
        <a href="test.html" onmouseover="attack()">Link</a>
    </body></html>"#;

    let markdown = convert(html);

    assert!(!markdown.contains("onclick"));
    assert!(!markdown.contains("alert"));
    assert!(!markdown.contains("attack"));
    assert!(markdown.contains("Click me"));
    assert!(markdown.contains("Content"));
    assert!(markdown.contains("[Link](test.html)"));
}

/// Test that javascript: URLs are blocked in links
#[test]
fn test_xss_javascript_url_in_link() {
    let markdown = convert(r#"<a href="javascript:alert('xss')">Click</a>"#);

    assert_eq!(markdown, "Click");
}

/// Test that javascript: URLs are blocked regardless of case and whitespace
#[test]
fn test_xss_javascript_url_case_insensitive() {
    let test_cases = vec![
        r#"<a href="javascript:alert('xss')">Test1</a>"#,
        r#"<a href="JavaScript:alert('xss')">Test2</a>"#,
        r#"<a href="JAVASCRIPT:alert('xss')">Test3</a>"#,
        r#"<a href="  JaVaScRiPt:alert('xss')">Test4</a>"#,
        "<a href=\"java\tscript:alert('xss')\">Test5</a>",
    ];

    for html in test_cases {
        let markdown = convert(html);
        assert!(!markdown.to_lowercase().contains("script:"), "{html}");
        assert!(!markdown.contains("alert"), "{html}");
        assert!(markdown.starts_with("Test"), "{html}");
    }
}

/// Test that data: URLs are blocked in links
#[test]
fn test_xss_data_url_in_link() {
    let markdown = convert(r#"<a href="data:text/html,<script>alert(1)</script>">Data</a>"#);

    assert_eq!(markdown, "Data");
}

/// Test that javascript: image sources fall back to the alt text
#[test]
fn test_xss_javascript_url_in_image() {
    assert_eq!(
        convert(r#"<img src="javascript:alert(1)" alt="pic">"#),
        "[Image: pic]"
    );
}

/// Test that data: images without alt text vanish
#[test]
fn test_xss_data_url_in_image() {
    assert_eq!(convert(r#"<p>x</p><img src="data:image/png;base64,AAAA">"#), "x");
}

/// Test that safe URLs are preserved
#[test]
fn test_safe_urls_preserved() {
    let html = r##"<p><a href="https://example.com/page">Web</a>
        <a href="/relative/path">Relative</a>
        <a href="#anchor">Anchor</a>
        <a href="mailto:someone@example.com">Mail</a></p>
        <img src="https://example.com/image.png" alt="Logo">"##;

    let markdown = convert(html);

    assert!(markdown.contains("[Web](https://example.com/page)"));
    assert!(markdown.contains("[Relative](/relative/path)"));
    assert!(markdown.contains("[Anchor](#anchor)"));
    assert!(markdown.contains("[Mail](mailto:someone@example.com)"));
    assert!(markdown.contains("![Logo](https://example.com/image.png)"));
}

/// Test that protocol-relative URLs are upgraded and whitespace encoded
#[test]
fn test_url_rewriting() {
    assert_eq!(
        convert(r#"<a href="//cdn.example.com/lib.js">cdn</a>"#),
        "[cdn](https://cdn.example.com/lib.js)"
    );
    assert_eq!(
        convert(r#"<a href="/my file.html">file</a>"#),
        "[file](/my%20file.html)"
    );
}

/// Test that iframe, object and embed elements are removed
#[test]
fn test_embedded_content_removal() {
    let html = r#"<html><body>
        <p>Before dangerous element</p>
        <iframe src="https://evil.com/malicious"></iframe>
        <object data="https://evil.com/malicious.swf"><p>Fallback</p></object>
        <embed src="https://evil.com/malicious.swf">
        <p>After dangerous element</p>
    </body></html>"#;

    let markdown = convert(html);

    assert!(!markdown.contains("evil.com"));
    assert!(!markdown.contains("Fallback"));
    assert!(markdown.contains("Before dangerous element"));
    assert!(markdown.contains("After dangerous element"));
}

/// Test that form controls are removed
#[test]
fn test_form_removal() {
    let html = r#"<p>Intro.</p><form action="/steal"><input name="pw"><button>Send now</button>
        <textarea>typed</textarea><select><option>opt</option></select></form>"#;

    assert_eq!(convert(html), "Intro.");
}

/// Test that internal DOCTYPE subsets never resolve entities
#[test]
fn test_xxe_prevention_doctype() {
    let html = r#"<!DOCTYPE foo [<!ENTITY xxe SYSTEM "file:///etc/passwd">]>
    <html><body><p>&xxe;</p></body></html>"#;

    let markdown = convert(html);

    assert!(!markdown.contains("/etc/passwd"));
    assert!(!markdown.contains("root:"));
}

/// Test XXE prevention with an external entity in DOCTYPE
#[test]
fn test_xxe_prevention_external_entity() {
    let html = r#"<!DOCTYPE foo [<!ENTITY xxe SYSTEM "http://evil.com/malicious.dtd">]>
    <html><body><p>&xxe;</p></body></html>"#;

    let markdown = convert(html);

    assert!(!markdown.contains("evil.com"));
    assert!(!markdown.contains("malicious"));
}

/// Test that style, link and base tags are removed
#[test]
fn test_head_resources_removal() {
    let html = r#"<!DOCTYPE html><html><head>
        <style>body { background: url(javascript:alert(1)) }</style>
        <link rel="stylesheet" href="https://evil.com/x.css">
        <base href="https://evil.com/">
        </head><body><p>Content</p><style>p { color: red }</style></body></html>"#;

    let markdown = convert(html);

    assert_eq!(markdown, "Content");
}

/// Test deeply nested HTML within the structural limit
#[test]
fn test_deeply_nested_html() {
    let html = format!(
        "<html><body>{}<p>Deep content</p>{}</body></html>",
        "<div>".repeat(60),
        "</div>".repeat(60)
    );

    let markdown = convert(&html);

    assert!(markdown.contains("Deep content"));
}

/// Test that nesting past the structural limit is rejected
#[test]
fn test_excessive_nesting_rejected() {
    let html = format!("{}x{}", "<div>".repeat(600), "</div>".repeat(600));

    let err = MarkdownConverter::new()
        .convert(html.as_str())
        .expect_err("nesting should be rejected");

    assert_eq!(err.code(), "SECURITY_VIOLATION");
    assert!(matches!(
        err,
        ConversionError::SecurityViolation {
            threat: ThreatType::ExcessiveNesting,
            ..
        }
    ));
}

/// Test that excessive nesting in a parsed document is rejected too
#[test]
fn test_excessive_nesting_rejected_for_documents() {
    let html = format!("{}x{}", "<section>".repeat(600), "</section>".repeat(600));
    let mut doc = parse_html(&html).expect("Failed to parse HTML");

    let err = MarkdownConverter::new().convert(&mut doc).unwrap_err();

    assert_eq!(err.status_code(), 400);
}

/// Test that NUL bytes are rejected before parsing
#[test]
fn test_null_byte_injection() {
    let err = MarkdownConverter::new()
        .convert("<p>safe\0<script>x</script></p>")
        .unwrap_err();

    match err {
        ConversionError::SecurityViolation { threat, message } => {
            assert_eq!(threat, ThreatType::NullByteInjection);
            assert!(message.contains("offset 7"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

/// Test that the hard size ceiling applies even when options allow more
#[test]
fn test_hard_size_ceiling() {
    let options = ConversionOptions {
        max_input_size: MAX_INPUT_SIZE * 2,
        ..Default::default()
    };
    let html = "a".repeat(MAX_INPUT_SIZE + 1);

    let err = MarkdownConverter::with_options(options)
        .convert(html.as_str())
        .unwrap_err();

    assert!(matches!(
        err,
        ConversionError::SecurityViolation {
            threat: ThreatType::SizeLimit,
            ..
        }
    ));
}

/// Test that the configured size limit is reported exactly
#[test]
fn test_configured_size_limit() {
    let options = ConversionOptions {
        max_input_size: 1024,
        ..Default::default()
    };
    let html = format!("<p>{}</p>", "a".repeat(1024));

    let err = MarkdownConverter::with_options(options)
        .convert(html.as_str())
        .unwrap_err();

    assert_eq!(err.code(), "SIZE_LIMIT_EXCEEDED");
    assert_eq!(err.status_code(), 413);
    assert!(matches!(
        err,
        ConversionError::SizeLimitExceeded {
            actual_size: 1031,
            max_size: 1024
        }
    ));
}

/// Test multiple XSS vectors in one document
#[test]
fn test_multiple_xss_vectors() {
    let html = r#"<html><body>
        <script>alert('xss1')</script>
        <p onclick="alert('xss2')">Click</p>
        <a href="javascript:alert('xss3')">Link</a>
        <img src="javascript:alert('xss4')" alt="Image">
        <iframe src="javascript:alert('xss5')"></iframe>
        <object data="javascript:alert('xss6')"></object>
        <embed src="javascript:alert('xss7')">
        <p>Safe content</p>
    </body></html>"#;

    let markdown = convert(html);

    assert!(!markdown.contains("script"));
    assert!(!markdown.contains("javascript:"));
    assert!(!markdown.contains("alert"));
    assert!(!markdown.contains("xss"));
    assert!(markdown.contains("[Image: Image]"));
    assert!(markdown.contains("Safe content"));
    assert!(markdown.contains("Click"));
}

/// Test that vbscript:, about:, file: and chrome: URLs are blocked
#[test]
fn test_other_dangerous_schemes_blocked() {
    for (href, text) in [
        ("vbscript:msgbox('xss')", "VB"),
        ("about:blank", "About"),
        ("file:///etc/passwd", "File"),
        ("chrome://settings", "Chrome"),
        ("chrome-extension://abc/page.html", "Ext"),
    ] {
        let markdown = convert(&format!(r#"<a href="{href}">{text}</a>"#));
        assert_eq!(markdown, text, "{href}");
    }
}

/// Test that links inside tables are sanitized as well
#[test]
fn test_table_security() {
    let html = r#"<table>
        <tr><th onclick="alert('xss')">Header</th></tr>
        <tr><td><a href="javascript:alert('xss')">Link</a></td></tr>
    </table>"#;

    let markdown = convert(html);

    assert!(markdown.contains("| Header |"));
    assert!(markdown.contains("| Link |"));
    assert!(!markdown.contains("javascript:"));
    assert!(!markdown.contains("alert"));
}
