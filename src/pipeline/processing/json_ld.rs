//! schema.org `Event` objects embedded as JSON-LD.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

use crate::pipeline::processing::field_extractor::collapse_whitespace;

static LD_JSON_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("ld+json selector")
});

/// Raw fields of one JSON-LD event, before defaults and policy are applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonLdEvent {
    pub name: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub url: Option<String>,
    pub image: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub location: Option<String>,
}

/// Every `Event`-typed object in the document's JSON-LD blocks, in document order.
pub fn extract_events(document: &Html) -> Vec<JsonLdEvent> {
    let mut events = Vec::new();
    for script in document.select(&LD_JSON_SELECTOR) {
        let text = script.text().collect::<String>();
        match serde_json::from_str::<Value>(text.trim()) {
            Ok(json) => collect(&json, &mut events),
            Err(e) => debug!("Skipping unparsable JSON-LD block: {}", e),
        }
    }
    events
}

fn is_event_type(value: &Value) -> bool {
    match value {
        Value::String(t) => t.ends_with("Event"),
        Value::Array(types) => types.iter().any(is_event_type),
        _ => false,
    }
}

fn collect(value: &Value, out: &mut Vec<JsonLdEvent>) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| collect(item, out)),
        Value::Object(map) => {
            if let Some(graph) = map.get("@graph") {
                collect(graph, out);
            }
            if let Some(Value::Array(items)) = map.get("itemListElement") {
                for item in items {
                    collect(item.get("item").unwrap_or(item), out);
                }
            }
            if map.get("@type").map_or(false, is_event_type) {
                out.push(to_event(value));
            }
        }
        _ => {}
    }
}

fn text(value: Option<&Value>) -> Option<String> {
    let raw = match value? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => return items.iter().find_map(|v| text(Some(v))),
        _ => return None,
    };
    let cleaned = collapse_whitespace(&raw);
    (!cleaned.is_empty()).then_some(cleaned)
}

fn image(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Array(items) => items.iter().find_map(|v| image(Some(v))),
        Value::Object(map) => text(map.get("url").or_else(|| map.get("contentUrl"))),
        other => text(Some(other)),
    }
}

fn location(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Array(items) => items.iter().find_map(|v| location(Some(v))),
        Value::Object(map) => text(map.get("name")),
        other => text(Some(other)),
    }
}

fn amount(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_start_matches('$').replace(',', "").parse().ok(),
        _ => None,
    }
}

fn format_amount(value: f64, currency: Option<&str>) -> String {
    let number = if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    };
    match currency {
        None | Some("USD") | Some("CAD") => format!("${}", number),
        Some(code) => format!("{} {}", number, code),
    }
}

fn price(offers: Option<&Value>) -> Option<String> {
    let offers: Vec<&Value> = match offers? {
        Value::Array(items) => items.iter().collect(),
        single => vec![single],
    };

    let mut amounts = Vec::new();
    let mut currency = None;
    for offer in offers {
        for key in ["price", "lowPrice", "highPrice"] {
            if let Some(value) = offer.get(key).and_then(amount) {
                amounts.push(value);
            }
        }
        if currency.is_none() {
            currency = offer.get("priceCurrency").and_then(Value::as_str);
        }
    }

    let min = amounts.iter().copied().reduce(f64::min)?;
    let max = amounts.iter().copied().reduce(f64::max)?;
    if max == 0.0 {
        Some("Free".to_string())
    } else if min == max {
        Some(format_amount(min, currency))
    } else {
        Some(format!(
            "{} - {}",
            format_amount(min, currency),
            format_amount(max, currency)
        ))
    }
}

fn to_event(value: &Value) -> JsonLdEvent {
    JsonLdEvent {
        name: text(value.get("name")),
        start_date: text(value.get("startDate")),
        end_date: text(value.get("endDate")),
        url: text(value.get("url")),
        image: image(value.get("image")),
        description: text(value.get("description")),
        price: price(value.get("offers")),
        location: location(value.get("location")),
    }
}
