//! Canonical normalizer: any draft shape in, [`CanonicalContent`] out.
//!
//! Total by construction. A missing or mistyped field becomes an empty
//! value, never an error.

use crate::content::{
    CanonicalContent, ContentGroup, CtaGroup, DraftShape, ExternalLink, FaqGroup, FaqItem,
    InternalLink, LinksGroup, SeoGroup,
};
use serde_json::{Map, Value};

pub fn normalize(shape: DraftShape) -> CanonicalContent {
    match shape {
        DraftShape::Canonical(content) => *content,
        DraftShape::Flat(map) => from_flat(&map),
    }
}

/// Convenience for callers holding an untyped draft.
pub fn normalize_value(draft: Value) -> CanonicalContent {
    normalize(DraftShape::classify(draft))
}

fn from_flat(map: &Map<String, Value>) -> CanonicalContent {
    CanonicalContent {
        seo: SeoGroup {
            seo_title: text(map, &["seoTitle", "seo_title", "title", "metaTitle"]),
            meta_description: text(
                map,
                &["metaDescription", "meta_description", "description"],
            ),
            focus_keyword: text(map, &["focusKeyword", "focus_keyword", "keyword"]),
            secondary_keywords: string_list(
                map,
                &["secondaryKeywords", "secondary_keywords", "keywords"],
            ),
            url_slug: text(map, &["urlSlug", "url_slug", "slug"]),
            search_intent: text(map, &["searchIntent", "search_intent", "intent"]),
        },
        content: ContentGroup {
            h1: text(map, &["h1", "heading"]),
            intro: text(map, &["intro", "introduction"]),
            benefits: text(map, &["benefits"]),
            scenarios: text(map, &["scenarios", "useCases"]),
            how_it_works: text(map, &["howItWorks", "how_it_works"]),
            assortment: text(map, &["assortment", "products"]),
            region_info: text(map, &["regionInfo", "region_info", "region"]),
            advice: text(map, &["advice", "tips"]),
            closing: text(map, &["closing", "conclusion"]),
        },
        faq: FaqGroup {
            title: text(map, &["faqTitle", "faq_title"]),
            items: faq_items(map),
        },
        cta: CtaGroup {
            title: text(map, &["ctaTitle", "cta_title"]),
            text: text(map, &["ctaText", "cta_text", "cta"]),
            suggestions: string_list(map, &["ctaSuggestions", "cta_suggestions"]),
        },
        image_seo: records(map, &["imageSEO", "imageSeo", "images"]),
        links: LinksGroup {
            internal_links: records::<InternalLink>(map, &["internalLinks", "internal_links"]),
            external_links: records::<ExternalLink>(map, &["externalLinks", "external_links"]),
        },
        clusters: string_list(map, &["clusters", "topicClusters", "topic_clusters"]),
    }
}

fn first<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find(|value| !value.is_null())
}

/// String value of the first present key. Arrays of strings are joined into
/// paragraphs so list-shaped sections are not lost.
fn text(map: &Map<String, Value>, keys: &[&str]) -> String {
    match first(map, keys) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n"),
        _ => String::new(),
    }
}

/// List of strings from an array, or a comma-separated string.
fn string_list(map: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    let raw: Vec<String> = match first(map, keys) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) => s.split(',').map(str::to_string).collect(),
        _ => Vec::new(),
    };
    raw.into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Array of typed records; entries that do not fit the record are dropped.
fn records<T: serde::de::DeserializeOwned>(map: &Map<String, Value>, keys: &[&str]) -> Vec<T> {
    match first(map, keys) {
        Some(Value::Array(items)) => items
            .iter()
            .filter(|item| item.is_object())
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect(),
        _ => Vec::new(),
    }
}

fn faq_items(map: &Map<String, Value>) -> Vec<FaqItem> {
    records::<FaqItem>(map, &["faq", "faqs", "faqItems"])
        .into_iter()
        .filter(|item| !item.question.trim().is_empty())
        .collect()
}
