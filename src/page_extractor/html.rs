//! HTML to structured digest
//!
//! Pure functions over an HTML string, no network access.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::analysis::ExtractedText;
use crate::utils::{collapse_whitespace, truncate_chars};

/// Elements that never carry marketing copy
const STRIPPED_ELEMENTS: &str = "script, style, nav, header, footer, noscript";

const HEADING_SELECTOR: &str = "h1, h2, h3";

const CTA_SELECTOR: &str = "button, [role='button'], input[type='submit'], input[type='button'], \
     [class*='btn'], [class*='button'], [class*='cta']";

const PRICE_SELECTOR: &str = "[class*='price'], [id*='price'], [class*='amount'], \
     [class*='cost'], [class*='valor']";

/// Labels longer than this are container text, not a button caption
const MAX_LABEL_CHARS: usize = 80;

pub const NO_TITLE: &str = "no title";

static PRICE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:R\$|US\$|\$|€|£|¥)\s?\d{1,3}(?:[.,]\d{3})*(?:[.,]\d{1,2})?|\d+[.,]\d{2}\b")
        .expect("price pattern is valid")
});

/// Parse a page and reduce it to an [`ExtractedText`].
///
/// `title_hint` is used only when the page itself has no usable title.
pub fn parse_document(
    source_url: &str,
    html: &str,
    title_hint: Option<&str>,
    body_excerpt_chars: usize,
) -> ExtractedText {
    let mut document = Html::parse_document(html);
    strip_elements(&mut document, STRIPPED_ELEMENTS);

    let title = extract_title(&document)
        .or_else(|| {
            title_hint
                .map(str::trim)
                .filter(|hint| !hint.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| NO_TITLE.to_string());

    ExtractedText {
        source_url: source_url.to_string(),
        title,
        meta_description: extract_meta_description(&document).unwrap_or_default(),
        headings: extract_headings(&document),
        cta_labels: extract_cta_labels(&document),
        form_labels: extract_form_labels(&document),
        price_snippets: extract_prices(&document),
        body_excerpt: extract_body_excerpt(&document, body_excerpt_chars),
        accessible: true,
    }
}

/// Title fallback chain: `<title>`, then `og:title`, then the first `<h1>`.
pub fn extract_title(document: &Html) -> Option<String> {
    first_text(document, "title")
        .or_else(|| meta_content(document, "meta[property='og:title']"))
        .or_else(|| first_text(document, "h1"))
}

fn extract_meta_description(document: &Html) -> Option<String> {
    meta_content(document, "meta[name='description']")
        .or_else(|| meta_content(document, "meta[property='og:description']"))
}

fn extract_headings(document: &Html) -> Vec<String> {
    select_all(document, HEADING_SELECTOR)
        .into_iter()
        .map(element_text)
        .filter(|text| !text.is_empty())
        .collect()
}

fn extract_cta_labels(document: &Html) -> Vec<String> {
    let labels = select_all(document, CTA_SELECTOR).into_iter().map(|el| {
        if el.value().name() == "input" {
            collapse_whitespace(el.value().attr("value").unwrap_or_default())
        } else {
            element_text(el)
        }
    });

    dedupe(labels.filter(|label| !label.is_empty() && label.chars().count() <= MAX_LABEL_CHARS))
}

fn extract_form_labels(document: &Html) -> Vec<String> {
    let labels = select_all(document, "label")
        .into_iter()
        .map(element_text);
    let placeholders = select_all(document, "input[placeholder], textarea[placeholder]")
        .into_iter()
        .map(|el| collapse_whitespace(el.value().attr("placeholder").unwrap_or_default()));

    dedupe(labels.chain(placeholders).filter(|label| !label.is_empty()))
}

fn extract_prices(document: &Html) -> Vec<String> {
    let snippets = select_all(document, PRICE_SELECTOR)
        .into_iter()
        .flat_map(|el| {
            let text = element_text(el);
            PRICE_PATTERN
                .find_iter(&text)
                .map(|m| m.as_str().trim().to_string())
                .collect::<Vec<_>>()
        });

    dedupe(snippets)
}

fn extract_body_excerpt(document: &Html, max_chars: usize) -> String {
    let text = first_element(document, "main")
        .map(element_text)
        .filter(|text| !text.is_empty())
        .or_else(|| first_element(document, "body").map(element_text))
        .unwrap_or_else(|| element_text(document.root_element()));

    truncate_chars(&text, max_chars)
}

fn strip_elements(document: &mut Html, css: &str) {
    let ids: Vec<_> = select_all(document, css).into_iter().map(|el| el.id()).collect();
    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

/// Matches below the root element only, so detached subtrees are skipped.
fn select_all<'a>(document: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => document.root_element().select(&selector).collect(),
        Err(e) => {
            tracing::warn!("Invalid selector '{}': {:?}", css, e);
            Vec::new()
        }
    }
}

fn first_element<'a>(document: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    select_all(document, css).into_iter().next()
}

fn first_text(document: &Html, css: &str) -> Option<String> {
    first_element(document, css)
        .map(element_text)
        .filter(|text| !text.is_empty())
}

fn meta_content(document: &Html, css: &str) -> Option<String> {
    first_element(document, css)
        .and_then(|el| el.value().attr("content"))
        .map(collapse_whitespace)
        .filter(|content| !content.is_empty())
}

fn element_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

fn dedupe(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items.filter(|item| seen.insert(item.clone())).collect()
}
