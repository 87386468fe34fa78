const UPLOAD_PAGE: &str = r#"<!DOCTYPE html>
<html lang="zh-Hant">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>葉片病害辨識</title>
    <style>
        body { font-family: sans-serif; max-width: 640px; margin: 40px auto; padding: 0 16px; }
        .upload-area { border: 2px dashed #4caf50; border-radius: 12px; padding: 40px 20px; text-align: center; }
        button { margin-top: 16px; padding: 8px 24px; }
    </style>
</head>
<body>
    <h1>🌿 葉片病害辨識</h1>
    <form method="post" action="/" enctype="multipart/form-data">
        <div class="upload-area">
            <input type="file" name="image" accept="image/*" required>
        </div>
        <button type="submit">上傳並辨識</button>
    </form>
</body>
</html>
"#;

pub fn upload_page() -> &'static str {
    UPLOAD_PAGE
}

/// Result text is escaped and keeps its line breaks.
pub fn result_page(result: &str, image_url: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="zh-Hant">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>辨識結果</title>
    <style>
        body {{ font-family: sans-serif; max-width: 640px; margin: 40px auto; padding: 0 16px; }}
        .result {{ white-space: pre-line; font-size: 1.1em; line-height: 1.6; }}
        img {{ max-width: 100%; border-radius: 12px; }}
    </style>
</head>
<body>
    <h1>辨識結果</h1>
    <img src="{image}" alt="uploaded leaf">
    <div class="result">{result}</div>
    <p><a href="/">再上傳一張</a></p>
</body>
</html>
"#,
        image = escape_html(image_url),
        result = escape_html(result),
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
