//! Business detail page extraction
//!
//! This module turns a detail page's HTML plus the auxiliary business document
//! into a [`BusinessRecord`]. Field locations are specific to the target site:
//! - labeled fields ("Business website", "Phone number", "Health Score",
//!   "Get Directions") are read from the element following the label
//! - opening hours come from a table whose class starts with `hours-table_`
//! - amenities and related searches come from the page-embedded state JSON
//! - highlights come from the auxiliary document
//!
//! Only the business name is required. Every other field falls back to null
//! or an empty list, except that a health score which is present but invalid
//! fails the extraction.

use crate::config::SiteConfig;
use crate::crawler::props;
use crate::model::{BusinessRecord, HealthScore, OpenHours, PriceTier};
use crate::url::redirect_target;
use crate::{ExtractError, ExtractResult};
use regex::{Captures, Regex};
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::sync::LazyLock;

/// Extracts a business record from its detail page and auxiliary document
///
/// # Arguments
///
/// * `html` - The detail page HTML
/// * `aux` - The auxiliary business document, if one was returned
/// * `site` - Origin (for resolving links) and challenge marker
///
/// # Errors
///
/// * [`ExtractError::Challenge`] / [`ExtractError::NotLoaded`] - the page has no
///   heading, with or without the challenge marker
/// * [`ExtractError::MissingField`] - the heading is empty
/// * [`ExtractError::Validation`] - a present field failed its pattern
pub fn extract_business(
    html: &str,
    aux: Option<&Value>,
    site: &SiteConfig,
) -> ExtractResult<BusinessRecord> {
    let document = Html::parse_document(html);

    let heading = match select_first(&document, "h1") {
        Some(h) => h,
        None if html.contains(&site.challenge_marker) => return Err(ExtractError::Challenge),
        None => return Err(ExtractError::NotLoaded),
    };

    let name = element_text(heading);
    if name.is_empty() {
        return Err(ExtractError::MissingField("name"));
    }

    let state = embedded_state(&document);

    let amenities = match &state {
        Some(state) if has_amenities_section(&document) => props::amenities(state),
        _ => Vec::new(),
    };

    Ok(BusinessRecord {
        name,
        website: website(&document, site.base()),
        phone_number: labeled_paragraph(&document, "Phone number"),
        open_hours: open_hours(&document),
        address: text_after_link(&document, "Get Directions"),
        food_categories: food_categories(&document),
        price_tier: price_tier(&document),
        health_score: text_after_link(&document, "Health Score")
            .map(HealthScore::try_from)
            .transpose()?,
        amenities,
        highlights: aux.map(props::highlights).unwrap_or_default(),
        related_search_terms: state
            .as_ref()
            .map(props::related_search_terms)
            .unwrap_or_default(),
    })
}

fn has_amenities_section(document: &Html) -> bool {
    select_first(document, r#"section[aria-label="Amenities and More"]"#).is_some()
}

fn select_first<'a>(document: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    document.select(&selector).next()
}

fn select_all<'a>(document: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => document.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn next_element_sibling(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element.next_siblings().find_map(ElementRef::wrap)
}

/// First `tag` element whose whole text is exactly `label`
fn find_labeled<'a>(document: &'a Html, tag: &str, label: &str) -> Option<ElementRef<'a>> {
    select_all(document, tag)
        .into_iter()
        .find(|el| element_text(*el) == label)
}

/// Text of the element following a `<p>label</p>`
fn labeled_paragraph(document: &Html, label: &str) -> Option<String> {
    let label = find_labeled(document, "p", label)?;
    next_element_sibling(label).map(element_text)
}

/// Text of the element following the parent of an `<a>label</a>`
fn text_after_link(document: &Html, label: &str) -> Option<String> {
    let link = find_labeled(document, "a", label)?;
    let parent = link.parent().and_then(ElementRef::wrap)?;
    next_element_sibling(parent).map(element_text)
}

fn website(document: &Html, origin: &str) -> Option<String> {
    let label = find_labeled(document, "p", "Business website")?;
    let container = next_element_sibling(label)?;
    let link_selector = Selector::parse("a[href]").ok()?;
    let href = container.select(&link_selector).next()?.value().attr("href")?;
    redirect_target(origin, href)
}

fn food_categories(document: &Html) -> Vec<String> {
    select_all(document, r#"[data-testid="BizHeaderCategory"]"#)
        .into_iter()
        .map(|el| element_text(el).replace(',', "").trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}

/// The first one-to-four `$` text inside the photo header
fn price_tier(document: &Html) -> Option<PriceTier> {
    let header = select_first(document, r#"[data-testid="photoHeader"]"#)?;
    header
        .text()
        .map(str::trim)
        .find_map(|text| PriceTier::try_from(text).ok())
}

fn open_hours(document: &Html) -> Vec<OpenHours> {
    let Some(container) = select_all(document, r#"[class*="hours-table_"]"#)
        .into_iter()
        .find(|el| el.value().classes().any(|c| c.starts_with("hours-table_")))
    else {
        return Vec::new();
    };

    let table = if container.value().name() == "table" {
        Some(container)
    } else {
        Selector::parse("table")
            .ok()
            .and_then(|s| container.select(&s).next())
    };

    table.and_then(parse_hours_table).unwrap_or_default()
}

/// Parses weekday/hours rows out of an hours table
///
/// Returns `None` when the table is not in the expected shape: a header row
/// with named columns, or a data row with fewer than two cells.
fn parse_hours_table(table: ElementRef<'_>) -> Option<Vec<OpenHours>> {
    let row_selector = Selector::parse("tr").ok()?;
    let cell_selector = Selector::parse("th, td").ok()?;

    let mut rows = Vec::new();
    for row in table.select(&row_selector) {
        let cells: Vec<String> = row.select(&cell_selector).map(cell_text).collect();

        if in_table_head(row) {
            if cells.iter().any(|c| !c.is_empty()) {
                return None;
            }
            continue;
        }

        if cells.iter().all(|c| c.is_empty()) {
            continue;
        }

        if cells.len() < 2 {
            return None;
        }

        rows.push(OpenHours {
            weekday: cells[0].clone(),
            hours_text: cells[1].clone(),
        });
    }

    Some(rows)
}

fn in_table_head(row: ElementRef<'_>) -> bool {
    row.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|el| el.value().name() == "thead")
}

/// A cell's text pieces trimmed and joined without separators, so a cell
/// listing two ranges reads "11:00 AM - 3:00 PM4:30 PM - 10:00 PM"
fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().map(str::trim).collect::<String>()
}

/// Parses the page's embedded state JSON
///
/// The state is HTML-escaped and wrapped in a comment (`<!--{...}-->`) inside a
/// `<script type="application/json" data-apollo-state>` tag. An unparsable
/// state reads as absent.
fn embedded_state(document: &Html) -> Option<Value> {
    let script = select_first(document, r#"script[type="application/json"][data-apollo-state]"#)?;
    let raw: String = script.text().collect();
    let decoded = decode_html_entities(&raw);
    let body = decoded.trim();
    let body = body.strip_prefix("<!--").unwrap_or(body);
    let body = body.strip_suffix("-->").unwrap_or(body);

    match serde_json::from_str(body) {
        Ok(state) => Some(state),
        Err(e) => {
            tracing::debug!("Embedded state JSON did not parse: {}", e);
            None
        }
    }
}

/// `&name;`, `&#NN;` or `&#xHH;`
static HTML_ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]+);").expect("valid entity regex")
});

/// Decodes HTML character references in one pass
///
/// Every decimal and hexadecimal reference is decoded. Named references are
/// limited to `quot`, `apos`, `amp`, `lt`, `gt` and `nbsp`; any other name,
/// or a number that is not a valid scalar value, is left as written.
fn decode_html_entities(value: &str) -> String {
    HTML_ENTITY
        .replace_all(value, |caps: &Captures<'_>| {
            let entity = &caps[1];
            let decoded = match entity.strip_prefix('#') {
                Some(number) => match number.strip_prefix(['x', 'X']) {
                    Some(hex) => u32::from_str_radix(hex, 16).ok(),
                    None => number.parse::<u32>().ok(),
                }
                .and_then(char::from_u32),
                None => match entity {
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "nbsp" => Some('\u{a0}'),
                    _ => None,
                },
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}
