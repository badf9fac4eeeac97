//! HTML page listing recent no-fly zone violators.

use std::fmt::Write;

use birdnest_core::ViolatorRecord;

/// Seconds between automatic page reloads.
pub const PAGE_REFRESH_SECS: u32 = 2;

const EMPTY_MESSAGE: &str = "No drones seen in the NFZ for 10 minutes";

/// Render the violator page. Records are shown in the order given.
pub fn render_page(records: &[ViolatorRecord]) -> String {
    let mut html = String::with_capacity(512 + records.len() * 384);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n    <head>\n");
    html.push_str("    <meta charset=\"UTF-8\">\n");
    let _ = writeln!(
        html,
        "    <meta http-equiv=\"refresh\" content=\"{}\">",
        PAGE_REFRESH_SECS
    );
    html.push_str("    <title>NFZ</title>\n    </head>\n<body>\n");
    html.push_str("    <h1 style=\"font-family: Arial\">\n");
    html.push_str("        Pilots that recently violated the NFZ\n    </h1>\n");

    if records.is_empty() {
        let _ = writeln!(html, "<p style=\"font-family: Arial\"> {} </p>", EMPTY_MESSAGE);
    }

    for record in records {
        let pilot = &record.pilot;
        let _ = writeln!(
            html,
            "<h3 style=\"font-family: Arial\"> Pilot: {} </h3>",
            escape_html(&pilot.full_name())
        );
        let _ = writeln!(
            html,
            "<p style=\"font-family: Arial\"> Phone number: {} </p>",
            escape_html(&pilot.phone_number)
        );
        let _ = writeln!(
            html,
            "<p style=\"font-family: Arial\"> Email address: {} </p>",
            escape_html(&pilot.email)
        );
        let _ = writeln!(
            html,
            "<p style=\"font-family: Arial\"> Closest distance to the nest: {} meters. </p>",
            format_distance(record.closest_distance)
        );
    }

    html.push_str("</body>\n</html>\n");
    html
}

/// Device positions are in thousandths of a metre; shown as metres, two decimals.
pub fn format_distance(distance: f64) -> String {
    format!("{:.2}", distance / 1000.0)
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
