//! Pulls the product name and price out of a product page.
//!
//! The page is matched with regular expressions rather than a DOM parser:
//! only two elements are needed, a `<meta name="title">` tag and the first
//! `<span class="a-offscreen">` holding the displayed price.

use regex::Regex;

use crate::models::Reading;

pub fn parse_reading(html: &str) -> Reading {
    Reading {
        product_name: extract_product_name(html),
        price: extract_price(html),
    }
}

/// `content` of the first `<meta name="title" ...>`, entity-decoded.
pub fn extract_product_name(html: &str) -> Option<String> {
    let meta_re = Regex::new(r"(?is)<meta\b([^>]*)>").ok()?;

    let name = meta_re
        .captures_iter(html)
        .map(|cap| attributes(&cap[1]))
        .find(|attrs| attribute(attrs, "name").is_some_and(|name| name.eq_ignore_ascii_case("title")))
        .and_then(|attrs| attribute(&attrs, "content").map(decode_entities))
        .filter(|name| !name.trim().is_empty());
    name
}

/// Text of the first `a-offscreen` span, reduced to digits and dots.
pub fn extract_price(html: &str) -> Option<f64> {
    // Opening tag plus the text run right after it; price spans hold no markup.
    let span_re = Regex::new(r"(?is)<span\b([^>]*)>([^<]*)").ok()?;

    let text = span_re
        .captures_iter(html)
        .find(|cap| {
            attribute(&attributes(&cap[1]), "class")
                .is_some_and(|class| class.split_whitespace().any(|c| c == "a-offscreen"))
        })
        .map(|cap| cap[2].to_string())?;

    clean_price(&text)
}

/// Drop everything except digits and `.`, then parse.
///
/// "CA$1,299.99" becomes 1299.99. Text with no digits, or with more than one
/// dot left over, is not a price.
pub fn clean_price(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

/// Split the inside of a tag into (lowercased name, raw value) pairs.
///
/// Quoted values are consumed whole, so names never match inside a value.
/// Attributes without a value come back with an empty string.
fn attributes(tag_body: &str) -> Vec<(String, String)> {
    let Ok(attr_re) = Regex::new(r#"([^\s"'>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#) else {
        return Vec::new();
    };

    attr_re
        .captures_iter(tag_body)
        .map(|cap| {
            let value = cap
                .get(2)
                .or_else(|| cap.get(3))
                .or_else(|| cap.get(4))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            (cap[1].to_ascii_lowercase(), value)
        })
        .collect()
}

/// First attribute with this exact name. Duplicates after it are ignored.
fn attribute<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Decode named and numeric character references in one pass.
///
/// Unknown names and invalid code points are left untouched.
fn decode_entities(text: &str) -> String {
    let Ok(entity_re) = Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);") else {
        return text.to_string();
    };

    entity_re
        .replace_all(text, |cap: &regex::Captures| {
            let body = &cap[1];
            let decoded = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match body {
                    "amp" => Some('&'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "nbsp" => Some('\u{a0}'),
                    _ => None,
                }
            };
            decoded.map_or_else(|| cap[0].to_string(), String::from)
        })
        .into_owned()
}
