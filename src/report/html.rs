//! Static HTML rendering for the report page.
//!
//! One self-contained page: a div per chart plus an inline script that
//! hands the serialized traces and layout to plotly.js (loaded from CDN).

use crate::report::Chart;

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

/// Render all charts into a single HTML page.
pub fn render_page(charts: &[Chart]) -> String {
    let mut page = String::with_capacity(4096);

    page.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
    page.push_str("\t<meta charset=\"UTF-8\" />\n");
    page.push_str("\t<title>Archive Statistics | mboxscope</title>\n");
    page.push_str(&format!("\t<script src=\"{PLOTLY_CDN}\"></script>\n"));
    page.push_str("</head>\n<body style=\"max-width: 800px; margin: 0 auto;\">\n");
    page.push_str("<h1 style=\"text-align: center;\">Archive Statistics</h1>\n");

    for chart in charts {
        page.push_str(&format!("<div id=\"{}\"></div>\n", chart.name));
    }

    page.push_str("<script>\n");
    for chart in charts {
        let traces = serde_json::to_string(&chart.traces).unwrap_or_else(|_| "[]".to_string());
        let layout = serde_json::to_string(&chart.layout).unwrap_or_else(|_| "{}".to_string());
        page.push_str(&format!(
            "Plotly.newPlot('{}', {traces}, {layout});\n",
            chart.name
        ));
    }
    page.push_str("</script>\n</body>\n</html>\n");

    page
}
