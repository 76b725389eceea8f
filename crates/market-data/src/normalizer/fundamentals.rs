//! Fundamentals parsers: Yahoo `quoteSummary` JSON and the Screener.in
//! `#top-ratios` block.

use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

use crate::errors::MarketDataError;
use crate::models::FundamentalsMap;

/// Flatten every module of the first `quoteSummary` result into one map.
///
/// Yahoo wraps numbers as `{"raw": 25.3, "fmt": "25.30"}`; the raw value is
/// kept. Keys are converted to snake_case and the first module to define a
/// key wins.
pub(super) fn parse_quote_summary(
    provider: &str,
    body: &Value,
) -> Result<FundamentalsMap, MarketDataError> {
    let result = body
        .pointer("/quoteSummary/result/0")
        .and_then(Value::as_object)
        .ok_or_else(|| MarketDataError::malformed(provider, "quoteSummary has no result"))?;

    let mut map = FundamentalsMap::new();
    for module in result.values().filter_map(Value::as_object) {
        for (key, value) in module {
            if key == "maxAge" {
                continue;
            }
            let key = snake_case(key);
            if map.get(&key).is_some() {
                continue;
            }
            match value {
                Value::Number(n) => {
                    if let Some(n) = n.as_f64() {
                        map.insert_number(key, n);
                    }
                }
                Value::String(s) => map.insert_text(key, s.as_str()),
                Value::Object(obj) => match obj.get("raw") {
                    Some(Value::Number(n)) => {
                        if let Some(n) = n.as_f64() {
                            map.insert_number(key, n);
                        }
                    }
                    Some(Value::String(s)) => map.insert_text(key, s.as_str()),
                    _ => {}
                },
                _ => {}
            }
        }
    }

    Ok(map)
}

/// `trailingPE` -> `trailing_pe`, `fiftyTwoWeekHigh` -> `fifty_two_week_high`.
fn snake_case(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let mut out = String::with_capacity(key.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let prev_lower = i > 0 && (chars[i - 1].is_ascii_lowercase() || chars[i - 1].is_ascii_digit());
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            let prev_upper = i > 0 && chars[i - 1].is_ascii_uppercase();
            if prev_lower || (prev_upper && next_lower) {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn selector(provider: &str, css: &str) -> Result<Selector, MarketDataError> {
    Selector::parse(css)
        .map_err(|e| MarketDataError::malformed(provider, format!("selector '{}': {}", css, e)))
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Read the `#top-ratios` list of a Screener.in company page.
///
/// Each `li` carries a `span.name` and a `span.value`. Known labels map to
/// stable keys; `High / Low` splits into the 52-week range. Values that do
/// not hold a number are kept as text.
pub(super) fn parse_screener_html(
    provider: &str,
    html: &str,
) -> Result<FundamentalsMap, MarketDataError> {
    let document = Html::parse_document(html);
    let items = selector(provider, "#top-ratios li")?;
    let name_sel = selector(provider, ".name")?;
    let value_sel = selector(provider, ".value")?;

    let mut map = FundamentalsMap::new();
    for item in document.select(&items) {
        let (Some(name), Some(value)) = (
            item.select(&name_sel).next().map(element_text),
            item.select(&value_sel).next().map(element_text),
        ) else {
            continue;
        };

        if name.eq_ignore_ascii_case("High / Low") {
            let mut parts = value.split('/').filter_map(first_number);
            if let Some(high) = parts.next() {
                map.insert_number("fifty_two_week_high", high);
            }
            if let Some(low) = parts.next() {
                map.insert_number("fifty_two_week_low", low);
            }
            continue;
        }

        let key = screener_key(&name);
        match first_number(&value) {
            Some(n) => map.insert_number(key, n),
            None => map.insert_text(key, value),
        }
    }

    Ok(map)
}

fn screener_key(label: &str) -> String {
    match label.trim().to_ascii_lowercase().as_str() {
        "market cap" => "market_cap".to_string(),
        "current price" => "current_price".to_string(),
        "stock p/e" => "pe".to_string(),
        "book value" => "book_value".to_string(),
        "dividend yield" => "dividend_yield".to_string(),
        "roce" => "roce".to_string(),
        "roe" => "roe".to_string(),
        "face value" => "face_value".to_string(),
        other => slug(other),
    }
}

fn slug(label: &str) -> String {
    label
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// First number in a display string such as `₹ 1,23,456 Cr.` or `(12.5) %`.
/// Commas are group separators; parentheses around the number negate it.
fn first_number(text: &str) -> Option<f64> {
    let chars: Vec<char> = text.chars().collect();
    let start = chars.iter().position(|c| c.is_ascii_digit())?;

    let mut digits = String::new();
    let mut end = start;
    while end < chars.len() {
        let c = chars[end];
        if c.is_ascii_digit() || c == '.' {
            digits.push(c);
        } else if c != ',' {
            break;
        }
        end += 1;
    }

    let mut value: f64 = digits.trim_end_matches('.').parse().ok()?;
    let before = chars[..start].iter().rev().find(|c| !c.is_whitespace());
    let after = chars[end..].iter().find(|c| !c.is_whitespace());
    if before == Some(&'-') || (before == Some(&'(') && after == Some(&')')) {
        value = -value;
    }
    Some(value)
}
