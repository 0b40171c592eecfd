//! Canonical landing-page schema and the shapes a draft can arrive in.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SeoGroup {
    #[serde(alias = "title")]
    pub seo_title: String,
    #[serde(alias = "description")]
    pub meta_description: String,
    pub focus_keyword: String,
    pub secondary_keywords: Vec<String>,
    #[serde(alias = "slug")]
    pub url_slug: String,
    pub search_intent: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContentGroup {
    pub h1: String,
    pub intro: String,
    pub benefits: String,
    pub scenarios: String,
    pub how_it_works: String,
    pub assortment: String,
    pub region_info: String,
    pub advice: String,
    pub closing: String,
}

/// Named body sections, in the order they are read for counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyField {
    Intro,
    Benefits,
    Scenarios,
    HowItWorks,
    Assortment,
    RegionInfo,
    Advice,
    Closing,
}

pub const BODY_FIELDS: [BodyField; 8] = [
    BodyField::Intro,
    BodyField::Benefits,
    BodyField::Scenarios,
    BodyField::HowItWorks,
    BodyField::Assortment,
    BodyField::RegionInfo,
    BodyField::Advice,
    BodyField::Closing,
];

impl BodyField {
    pub fn key(&self) -> &'static str {
        match self {
            BodyField::Intro => "intro",
            BodyField::Benefits => "benefits",
            BodyField::Scenarios => "scenarios",
            BodyField::HowItWorks => "howItWorks",
            BodyField::Assortment => "assortment",
            BodyField::RegionInfo => "regionInfo",
            BodyField::Advice => "advice",
            BodyField::Closing => "closing",
        }
    }
}

impl ContentGroup {
    pub fn field(&self, field: BodyField) -> &str {
        match field {
            BodyField::Intro => &self.intro,
            BodyField::Benefits => &self.benefits,
            BodyField::Scenarios => &self.scenarios,
            BodyField::HowItWorks => &self.how_it_works,
            BodyField::Assortment => &self.assortment,
            BodyField::RegionInfo => &self.region_info,
            BodyField::Advice => &self.advice,
            BodyField::Closing => &self.closing,
        }
    }

    pub fn field_mut(&mut self, field: BodyField) -> &mut String {
        match field {
            BodyField::Intro => &mut self.intro,
            BodyField::Benefits => &mut self.benefits,
            BodyField::Scenarios => &mut self.scenarios,
            BodyField::HowItWorks => &mut self.how_it_works,
            BodyField::Assortment => &mut self.assortment,
            BodyField::RegionInfo => &mut self.region_info,
            BodyField::Advice => &mut self.advice,
            BodyField::Closing => &mut self.closing,
        }
    }

    /// The body sections joined with newlines.
    pub fn body_text(&self) -> String {
        BODY_FIELDS
            .iter()
            .map(|f| self.field(*f))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaqItem {
    #[serde(alias = "q")]
    pub question: String,
    #[serde(alias = "a")]
    pub answer: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaqGroup {
    pub title: String,
    #[serde(alias = "questions")]
    pub items: Vec<FaqItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CtaGroup {
    pub title: String,
    pub text: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSeo {
    pub alt: String,
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InternalLink {
    #[serde(alias = "text")]
    pub anchor: String,
    #[serde(alias = "url", alias = "href")]
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalLink {
    #[serde(alias = "text")]
    pub anchor: String,
    #[serde(alias = "href")]
    pub url: String,
    pub category: String,
    #[serde(alias = "justification")]
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LinksGroup {
    pub internal_links: Vec<InternalLink>,
    pub external_links: Vec<ExternalLink>,
}

/// The one fixed nested shape landing pages are normalized into.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanonicalContent {
    pub seo: SeoGroup,
    pub content: ContentGroup,
    pub faq: FaqGroup,
    pub cta: CtaGroup,
    #[serde(rename = "imageSEO")]
    pub image_seo: Vec<ImageSeo>,
    pub links: LinksGroup,
    pub clusters: Vec<String>,
}

/// Shape a draft object arrived in.
#[derive(Debug, Clone, PartialEq)]
pub enum DraftShape {
    Flat(Map<String, Value>),
    Canonical(Box<CanonicalContent>),
}

/// Top-level groups whose joint presence marks a canonical draft.
const CANONICAL_MARKERS: [&str; 2] = ["seo", "content"];

/// Top-level keys that may hold a nested group object.
const GROUP_KEYS: [&str; 5] = ["seo", "content", "links", "faq", "cta"];

impl DraftShape {
    /// Classify a draft. Nested or partly nested drafts that do not
    /// deserialize cleanly are flattened so the normalizer can still
    /// salvage their fields.
    pub fn classify(draft: Value) -> Self {
        let map = match draft {
            Value::Object(map) => map,
            _ => return DraftShape::Flat(Map::new()),
        };

        let is_group = |key: &str| map.get(key).map(Value::is_object).unwrap_or(false);
        let nested = CANONICAL_MARKERS.iter().all(|&key| is_group(key));
        let partly_nested = GROUP_KEYS.iter().any(|&key| is_group(key));

        if nested {
            if let Ok(canonical) =
                serde_json::from_value::<CanonicalContent>(Value::Object(map.clone()))
            {
                return DraftShape::Canonical(Box::new(canonical));
            }
        }
        if partly_nested {
            DraftShape::Flat(flatten_groups(map))
        } else {
            DraftShape::Flat(map)
        }
    }
}

/// Lift the fields of nested group objects to the top level.
fn flatten_groups(map: Map<String, Value>) -> Map<String, Value> {
    let mut flat = Map::new();
    for (key, value) in map {
        match value {
            Value::Object(inner) if matches!(key.as_str(), "seo" | "content" | "links") => {
                for (inner_key, inner_value) in inner {
                    flat.entry(inner_key).or_insert(inner_value);
                }
            }
            Value::Object(inner) if key == "faq" => {
                if let Some(title) = inner.get("title") {
                    flat.insert("faqTitle".to_string(), title.clone());
                }
                if let Some(items) = inner.get("items").or_else(|| inner.get("questions")) {
                    flat.insert("faq".to_string(), items.clone());
                }
            }
            Value::Object(inner) if key == "cta" => {
                for (inner_key, inner_value) in inner {
                    let lifted = match inner_key.as_str() {
                        "title" => "ctaTitle",
                        "text" => "ctaText",
                        "suggestions" => "ctaSuggestions",
                        _ => continue,
                    };
                    flat.insert(lifted.to_string(), inner_value);
                }
            }
            value => {
                flat.insert(key, value);
            }
        }
    }
    flat
}

/// Output of the enrichment pre-calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentResult {
    pub scenarios: Vec<String>,
    pub internal_links: Vec<InternalLink>,
    pub secondary_keywords: Vec<String>,
}
