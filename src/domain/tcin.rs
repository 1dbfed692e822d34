use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

/// Fixed number of results Target renders per search page.
pub const PAGE_SIZE: usize = 24;

/// Present on the page once the result grid has rendered.
pub const RESULTS_READY_SELECTOR: &str = r#"[data-test="product-card"], a[href*="/p/"]"#;

const SECONDARY_SECTION_MARKERS: [&str; 2] = ["Recommended for you", "Sponsored"];

static PRODUCT_CARD_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"[data-test="product-card"]"#).expect("valid card selector"));
static PRODUCT_LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href*="/p/"]"#).expect("valid link selector"));
static HREF_TCIN: Lazy<Regex> = Lazy::new(|| Regex::new(r"/A-(\d+)").expect("valid tcin regex"));
static PAGE_TCIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/p/[^/]+/-/A-(\d+)").expect("valid page tcin regex"));

/// Ordered, de-duplicated TCINs from the primary results region of one page.
///
/// Product cards are authoritative. Only when no card yields a TCIN does the raw
/// markup get scanned, cut short at the first recommendation/sponsored marker and
/// capped at one page worth of results.
pub fn extract_tcins(html: &str) -> Vec<String> {
    let from_cards = extract_from_product_cards(html);
    match from_cards.is_empty() {
        true => extract_from_primary_section(html),
        false => from_cards,
    }
}

fn extract_from_product_cards(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);

    document
        .select(&PRODUCT_CARD_SELECTOR)
        .filter_map(|card| {
            card.select(&PRODUCT_LINK_SELECTOR)
                .filter_map(|a_tag| a_tag.value().attr("href"))
                .find_map(tcin_from_href)
        })
        .unique()
        .collect()
}

fn extract_from_primary_section(html: &str) -> Vec<String> {
    let primary = truncate_at_secondary_sections(html);

    PAGE_TCIN
        .captures_iter(primary)
        .filter_map(|captures| captures.get(1).map(|m| m.as_str().to_string()))
        .unique()
        .take(PAGE_SIZE)
        .collect()
}

fn truncate_at_secondary_sections(html: &str) -> &str {
    SECONDARY_SECTION_MARKERS
        .iter()
        .fold(html, |section, marker| match section.split_once(marker) {
            Some((before, _)) => before,
            None => section,
        })
}

pub fn tcin_from_href(href: &str) -> Option<String> {
    HREF_TCIN
        .captures(href)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
}
