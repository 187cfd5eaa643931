use crate::config::CalculatorConfig;
use axum::response::Html;

const INDEX_HTML: &str = include_str!("../../templates/index.html");

/// Render the single page, injecting the configured defaults.
pub fn render_index(config: &CalculatorConfig) -> Html<String> {
    let html = INDEX_HTML
        .replace(
            "{{ default_scale_length_mm }}",
            &config.default_scale_length_mm.to_string(),
        )
        .replace(
            "{{ default_post_diameter_mm }}",
            &config.default_post_diameter_mm.to_string(),
        )
        .replace(
            "{{ coat_both_sides }}",
            if config.coat_both_sides { "checked" } else { "" },
        )
        .replace(
            "{{ max_upload_mb }}",
            &(config.max_upload_bytes / (1024 * 1024)).to_string(),
        );
    Html(html)
}
