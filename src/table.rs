//! HTML table extraction
//!
//! Pulls the cells of one `<table>` out of a fetched page. Matching is plain
//! case-insensitive marker search, not an HTML parser: it copes with the
//! sloppy markup found on real pages as long as rows and cells are closed.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashSet;

/// Opening tag of a cell in the first row, which may be a header row
static FIRST_ROW_CELL: Lazy<Regex> = Lazy::new(|| Regex::new(r"<TH>|<TH |<TD>|<TD ").unwrap());

static DATA_CELL: Lazy<Regex> = Lazy::new(|| Regex::new(r"<TD").unwrap());

/// Comments, tags and declarations; group 1 is the tag name
static MARKUP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<!--.*?-->|</?([A-Za-z][A-Za-z0-9]*)[^>]*>|<[!?][^>]*>").unwrap()
});

static TAG_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"<([A-Za-z][A-Za-z0-9]*)>").unwrap());

/// How many tags to walk back from the needle looking for `<table`
const MAX_BACKTRACK: usize = 100;

const XML_PROLOG: &str = "<?xml version=\"1.0\" standalone=\"yes\" ?>\n";

/// Position of `needle` in `haystack` at or after `from`
fn find_from(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    haystack.get(from..)?.find(needle).map(|i| i + from)
}

/// Position just past the `>` that closes the tag at `at`
fn past_tag(upper: &str, at: usize) -> Option<usize> {
    find_from(upper, ">", at).map(|i| i + 1)
}

/// Tag names listed as `"<a><b>"`, lowercased
fn allowed_set(allowed_tags: &str) -> HashSet<String> {
    TAG_NAME
        .captures_iter(allowed_tags)
        .map(|c| c[1].to_ascii_lowercase())
        .collect()
}

/// Remove markup from `fragment`, keeping tags named in `allowed`
pub fn strip_tags(fragment: &str, allowed_tags: &str) -> String {
    strip_with(fragment, &allowed_set(allowed_tags))
}

fn strip_with(fragment: &str, allowed: &HashSet<String>) -> String {
    MARKUP
        .replace_all(fragment, |caps: &Captures| match caps.get(1) {
            Some(name) if allowed.contains(&name.as_str().to_ascii_lowercase()) => {
                caps[0].to_string()
            }
            _ => String::new(),
        })
        .into_owned()
}

/// Escape text for use inside an XML element
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Where the search for the first row starts
fn search_start(upper: &str, needle: &str, needle_is_inside_table: bool) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }

    let mut idx = upper.find(&needle.to_ascii_uppercase())?;
    if needle_is_inside_table {
        let mut steps = 0;
        while steps < MAX_BACKTRACK && !upper[idx..].starts_with("<TABLE") {
            match upper[..idx].rfind('<') {
                Some(prev) => idx = prev,
                None => break,
            }
            steps += 1;
        }
    }
    Some(idx)
}

/// Cleaned cell texts of one row
///
/// `row` and `upper` cover the same bytes; `upper` is only used for matching.
fn row_cells(row: &str, open: &Regex, close: &str, allowed: &HashSet<String>) -> Vec<String> {
    let upper = row.to_ascii_uppercase();
    let mut cells = Vec::new();
    let mut pos = 0;

    while let Some(m) = open.find_at(&upper, pos) {
        let Some(start) = past_tag(&upper, m.start()) else {
            break;
        };
        let end = find_from(&upper, close, start).unwrap_or(upper.len());
        cells.push(strip_with(&row[start..end], allowed).trim().to_string());

        match past_tag(&upper, end) {
            Some(next) => pos = next,
            None => break,
        }
    }
    cells
}

/// Extract a table as rows of cell texts
///
/// The table is the first one at or after `needle` (case-insensitive); with
/// `needle_is_inside_table` the search walks back from the needle to the
/// enclosing `<table`. An empty needle starts at the top of the page. The
/// first row may use `<th>` or `<td>` cells, later rows are read as `<td>`.
/// Markup inside cells is removed except for tags listed in `allowed_tags`,
/// e.g. `"<a><b>"`. Rows without cells are skipped.
///
/// Returns `None` when the needle, a row, or the end of the table is missing.
pub fn table_into_array(
    html: &str,
    needle: &str,
    needle_is_inside_table: bool,
    allowed_tags: &str,
) -> Option<Vec<Vec<String>>> {
    let upper = html.to_ascii_uppercase();
    let allowed = allowed_set(allowed_tags);

    let start = search_start(&upper, needle, needle_is_inside_table)?;
    let first_row = find_from(&upper, "<TR", start)?;
    let first_row_end = find_from(&upper, "</TR>", first_row)?;
    let table_end = find_from(&upper, "</TABLE>", first_row_end)?;

    let mut rows = Vec::new();
    let header = row_cells(&html[first_row..first_row_end], &FIRST_ROW_CELL, "</T", &allowed);
    if !header.is_empty() {
        rows.push(header);
    }

    let body = &upper[..table_end];
    let mut pos = first_row_end + "</TR>".len();
    while let Some(row) = find_from(body, "<TR", pos) {
        let row_end = find_from(body, "</TR", row)?;
        let cells = row_cells(&html[row..row_end], &DATA_CELL, "</TD", &allowed);
        if !cells.is_empty() {
            rows.push(cells);
        }
        pos = past_tag(body, row_end).unwrap_or(table_end);
    }

    Some(rows)
}

/// Extract a table as a small XML document
///
/// ```text
/// <?xml version="1.0" standalone="yes" ?>
/// <TABLE>
///     <ROW id="0">
///         <COL id="0">cell</COL>
///     </ROW>
/// </TABLE>
/// ```
///
/// Indentation is tabs. `None` when `table_into_array` finds nothing.
pub fn table_into_xml(
    html: &str,
    needle: &str,
    needle_is_inside_table: bool,
    allowed_tags: &str,
) -> Option<String> {
    let rows = table_into_array(html, needle, needle_is_inside_table, allowed_tags)?;
    if rows.is_empty() {
        return None;
    }

    let mut xml = String::from(XML_PROLOG);
    xml.push_str("<TABLE>\n");
    for (i, row) in rows.iter().enumerate() {
        xml.push_str(&format!("\t<ROW id=\"{}\">\n", i));
        for (j, col) in row.iter().enumerate() {
            xml.push_str(&format!("\t\t<COL id=\"{}\">{}</COL>\n", j, escape_xml(col).trim()));
        }
        xml.push_str("\t</ROW>\n");
    }
    xml.push_str("</TABLE>");
    Some(xml)
}
