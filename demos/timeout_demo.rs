//! Demonstration of cooperative timeout mechanism
//!
//! This example shows how to use the timeout mechanism to protect against
//! slow or malicious HTML conversions.
//!
//! Run with: cargo run --example timeout_demo

use llm_markdown_converter::converter::{
    ConversionContext, ConversionOptions, MarkdownConverter, TIMEOUT_CHECK_INTERVAL,
};
use llm_markdown_converter::error::ConversionError;
use std::time::Duration;

fn main() {
    println!("=== Cooperative Timeout Mechanism Demo ===\n");

    println!("1. No timeout (Duration::ZERO)");
    run_with_context(Duration::ZERO, "<h1>Title</h1><p>Content</p>");
    println!();

    println!("2. Generous timeout (10 seconds)");
    run_with_context(
        Duration::from_secs(10),
        "<h1>Title</h1><p>Content with <strong>bold</strong> text</p>",
    );
    println!();

    println!("3. Budget already spent, large document");
    demo_timeout_detection();
    println!();

    println!("4. Timeout from options");
    demo_options_timeout();
    println!();
}

fn run_with_context(timeout: Duration, html: &str) {
    let converter = MarkdownConverter::new();
    let mut ctx = ConversionContext::new(timeout);

    match converter.convert_with_context(html, &mut ctx) {
        Ok(result) => {
            println!("   Conversion succeeded");
            println!("   Elapsed: {:?}", ctx.elapsed());
            println!("   Nodes processed: {}", ctx.node_count());
            println!("   Output: {}", result.markdown.replace('\n', " / "));
        }
        Err(e) => println!("   Error: {e}"),
    }
}

fn large_document(blocks: usize) -> String {
    let mut html = String::from("<html><body>");
    for i in 0..blocks {
        html.push_str(&format!("<div><p>Paragraph {i}.</p></div>"));
    }
    html.push_str("</body></html>");
    html
}

fn demo_timeout_detection() {
    let html = large_document(20_000);
    let converter = MarkdownConverter::new();

    let mut ctx = ConversionContext::new(Duration::from_millis(1));
    std::thread::sleep(Duration::from_millis(2));

    match converter.convert_with_context(html.as_str(), &mut ctx) {
        Ok(_) => println!("   Unexpected success"),
        Err(ConversionError::Timeout { timeout_ms }) => {
            println!("   Timed out after a {timeout_ms} ms budget");
            println!(
                "   Aborted at node {} (checks run every {} nodes)",
                ctx.node_count(),
                TIMEOUT_CHECK_INTERVAL
            );
        }
        Err(e) => println!("   Error: {e}"),
    }
}

fn demo_options_timeout() {
    let options = ConversionOptions {
        timeout_ms: 5_000,
        ..Default::default()
    };
    let converter = MarkdownConverter::with_options(options);
    let html = large_document(2_000);

    match converter.convert(html.as_str()) {
        Ok(result) => println!("   Converted {} bytes of Markdown", result.markdown.len()),
        Err(e) => println!("   Error [{}]: {e}", e.code()),
    }
}
