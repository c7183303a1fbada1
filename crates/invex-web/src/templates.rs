//! HTML templates for the web form.

use invex_core::{ExportColumn, ProcessOutcome, RefinementStatus};

/// Escape text for use inside HTML content and attribute values.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Base HTML template.
pub fn base_template(title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title} - invex</title>
    <style>
        body {{ font-family: system-ui, sans-serif; margin: 2rem auto; max-width: 72rem; padding: 0 1rem; color: #222; }}
        h1 {{ font-size: 1.5rem; }}
        form {{ display: flex; flex-direction: column; gap: 0.75rem; max-width: 28rem; }}
        table {{ border-collapse: collapse; width: 100%; font-size: 0.9rem; }}
        th, td {{ border: 1px solid #ccc; padding: 0.3rem 0.5rem; text-align: left; }}
        th {{ background: #f3f3f3; }}
        .status {{ font-weight: 600; }}
        .failure {{ color: #a40000; }}
        .warnings {{ color: #7a5a00; font-size: 0.9rem; }}
        .downloads a {{ margin-right: 1rem; }}
    </style>
</head>
<body>
    <h1><a href="/">invex</a></h1>
    {content}
</body>
</html>"#,
        title = html_escape(title),
        content = content
    )
}

/// Upload form. The LLM switch only appears when refinement can run.
pub fn form_page(llm_available: bool) -> String {
    let llm_switch = if llm_available {
        r#"<label><input type="checkbox" name="use_llm" checked> Refine with LLM</label>"#
    } else {
        r#"<p class="warnings">LLM refinement is not configured; rule-based extraction only.</p>"#
    };

    let content = format!(
        r#"<p>Upload an invoice (PDF, Word, spreadsheet or text) to extract its fields.</p>
    <form action="/process" method="post" enctype="multipart/form-data">
        <input type="file" name="file" required
            accept=".pdf,.docx,.doc,.xlsx,.xls,.ods,.txt">
        {llm_switch}
        <button type="submit">Extract</button>
    </form>"#
    );

    base_template("Extract invoice", &content)
}

/// Download links for the produced files, as data URLs.
pub struct Downloads {
    pub stem: String,
    pub csv_data_url: String,
    pub json_data_url: Option<String>,
}

/// Results page for one processed upload.
pub fn results_page(outcome: &ProcessOutcome, downloads: &Downloads) -> String {
    let status_class = if outcome.is_success() { "status" } else { "status failure" };
    let mut content = format!(
        r#"<p class="{status_class}">{}</p>"#,
        html_escape(&outcome.status_line())
    );

    content.push_str(&results_table(outcome));

    if !outcome.warnings.is_empty() {
        content.push_str(r#"<ul class="warnings">"#);
        for warning in &outcome.warnings {
            content.push_str(&format!("<li>{}</li>", html_escape(&warning.to_string())));
        }
        content.push_str("</ul>");
    }

    if let RefinementStatus::Applied { fields } = &outcome.refinement {
        content.push_str(&format!(
            r#"<p class="warnings">Refined fields: {}</p>"#,
            html_escape(&fields.join(", "))
        ));
    }

    content.push_str(r#"<p class="downloads">"#);
    content.push_str(&format!(
        r#"<a href="{}" download="{}.csv">Download CSV</a>"#,
        downloads.csv_data_url,
        html_escape(&downloads.stem)
    ));
    if let Some(json) = &downloads.json_data_url {
        content.push_str(&format!(
            r#"<a href="{}" download="{}.json">Download JSON</a>"#,
            json,
            html_escape(&downloads.stem)
        ));
    }
    content.push_str(r#"<a href="/">Process another file</a></p>"#);

    base_template("Results", &content)
}

fn results_table(outcome: &ProcessOutcome) -> String {
    let mut html = String::from("<table>\n<thead><tr>");
    for name in ExportColumn::names() {
        html.push_str(&format!("<th>{}</th>", name));
    }
    html.push_str("</tr></thead>\n<tbody>\n");

    for row in &outcome.export.rows {
        html.push_str("<tr>");
        for value in row.values() {
            html.push_str(&format!("<td>{}</td>", html_escape(value)));
        }
        html.push_str("</tr>\n");
    }

    html.push_str("</tbody>\n</table>");
    html
}
