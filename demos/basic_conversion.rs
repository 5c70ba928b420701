//! Basic conversion example demonstrating the Markdown converter
//!
//! Run with: cargo run --example basic_conversion

use llm_markdown_converter::converter::{ConversionOptions, MarkdownConverter};

fn main() {
    println!("=== LLM Markdown Converter - Basic Examples ===\n");

    let converter = MarkdownConverter::new();

    show(
        &converter,
        "Simple heading and paragraph",
        "<h1>Welcome</h1><p>This is a <strong>test</strong> document.</p>",
    );
    show(
        &converter,
        "Nested lists",
        "<ul><li>Fruit<ul><li>Apple</li><li>Pear</li></ul></li><li>Bread</li></ul>",
    );
    show(
        &converter,
        "Repeated links and unsafe URLs",
        r#"<p><a href="https://example.com">Example</a>, again <a href="https://example.com">here</a>
           and <a href="javascript:alert(1)">not a link</a>.</p>"#,
    );
    show(
        &converter,
        "Code block language detection",
        r#"<pre><code class="lang-py">def greet():
    return "hi"</code></pre>"#,
    );
    show(
        &converter,
        "Wide table rendered as a list",
        "<table><tr><th>Id</th><th>Name</th><th>Role</th><th>Team</th><th>City</th><th>Since</th></tr>\
         <tr><td>1</td><td>Ada</td><td>Engineer</td><td>Core</td><td>Lyon</td><td>2019</td></tr></table>",
    );
    show(
        &converter,
        "Heading hierarchy repair",
        "<h1>Guide</h1><h4>Install</h4><h6>Linux</h6>",
    );

    metadata_example();
}

fn show(converter: &MarkdownConverter, title: &str, html: &str) {
    println!("Example: {title}");
    println!("Input HTML:\n{html}\n");

    match converter.convert(html) {
        Ok(result) => println!("Output Markdown:\n{}", result.markdown),
        Err(e) => println!("Error [{}]: {e}", e.code()),
    }
    println!("---\n");
}

fn metadata_example() {
    println!("Example: Metadata");
    let html = r#"<!DOCTYPE html>
<html lang="en-US">
<head>
  <title>Release 2.0</title>
  <meta name="description" content="Everything new in 2.0">
  <meta property="article:published_time" content="2024-04-02T09:30:00Z">
</head>
<body>
  <p class="byline">By Sam Rivera</p>
  <p>Version 2.0 ships a faster parser and <a href="/changelog">a full changelog</a>.</p>
</body>
</html>"#;

    let options = ConversionOptions {
        include_metadata: true,
        ..Default::default()
    };
    match MarkdownConverter::with_options(options).convert(html) {
        Ok(result) => {
            println!("Output Markdown:\n{}\n", result.markdown);
            if let Some(metadata) = result.metadata {
                println!("Title:        {:?}", metadata.title);
                println!("Author:       {:?}", metadata.author);
                println!("Published:    {:?}", metadata.publish_date);
                println!("Language:     {:?}", metadata.language);
                println!("Words:        {}", metadata.word_count);
                println!("Reading time: {} min", metadata.reading_time);
                println!("Links:        {}", metadata.link_count);
            }
        }
        Err(e) => println!("Error [{}]: {e}", e.code()),
    }
    println!("---\n");
}
