//! HTML pages: the index form and the label result view

use axum::response::Html;
use vision_common::LabelResultSet;

const PAGE_STYLE: &str = r#"
    <style>
        body {
            font-family: system-ui, -apple-system, sans-serif;
            max-width: 800px;
            margin: 40px auto;
            padding: 20px;
            line-height: 1.6;
        }
        h1 {
            color: #333;
            border-bottom: 2px solid #0066cc;
            padding-bottom: 10px;
        }
        form { margin: 16px 0; }
        input[type=text] { width: 70%; padding: 6px; }
        table { border-collapse: collapse; }
        td, th { padding: 4px 12px; border-bottom: 1px solid #ddd; text-align: left; }
        img { max-width: 100%; margin: 16px 0; }
    </style>"#;

/// GET /
pub async fn serve_index() -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Vision Gateway</title>{style}
</head>
<body>
    <h1>Vision Gateway</h1>

    <h2>Label detection</h2>
    <form action="/extractLabels" method="get">
        <input type="text" name="imageUrl" placeholder="https://... or gs://bucket/object">
        <button type="submit">Extract labels</button>
    </form>

    <h2>Text extraction</h2>
    <form action="/extractText" method="get">
        <input type="text" name="imageUrl" placeholder="https://... or gs://bucket/object">
        <button type="submit">Extract text</button>
    </form>

    <h2>Object localization</h2>
    <form action="/localizeObjects" method="get">
        <input type="text" name="gcsPath" placeholder="gs://bucket/object">
        <button type="submit">Localize objects</button>
    </form>

    <p><small>vision-web v{version}</small></p>
</body>
</html>"#,
        style = PAGE_STYLE,
        version = env!("CARGO_PKG_VERSION"),
    ))
}

/// Result view: the image followed by its labels in detection order
pub fn render_result_page(image_url: &str, annotations: &LabelResultSet) -> String {
    let rows: String = annotations
        .iter()
        .map(|(description, score)| {
            format!(
                "        <tr><td>{}</td><td>{:.1}%</td></tr>\n",
                html_escape(description),
                score * 100.0
            )
        })
        .collect();

    let table = if annotations.is_empty() {
        "    <p>No labels detected.</p>".to_string()
    } else {
        format!(
            "    <table>\n        <tr><th>Label</th><th>Certainty</th></tr>\n{}    </table>",
            rows
        )
    };

    // Only http(s) URLs can be shown by the browser
    let preview = if image_url.starts_with("http://") || image_url.starts_with("https://") {
        format!("    <img src=\"{}\" alt=\"analyzed image\">\n", html_escape(image_url))
    } else {
        String::new()
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Labels - Vision Gateway</title>{style}
</head>
<body>
    <h1>Image labels</h1>
    <p>Image: <code>{url}</code></p>
{preview}{table}
    <p><a href="/">Back</a></p>
</body>
</html>"#,
        style = PAGE_STYLE,
        url = html_escape(image_url),
        preview = preview,
        table = table,
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
