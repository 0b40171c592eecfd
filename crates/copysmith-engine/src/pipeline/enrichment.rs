//! Best-effort enrichment calls run ahead of the draft.
//!
//! Scenario, link and keyword selection are independent of each other and
//! run concurrently. Each one swallows its own failure and yields a fixed
//! fallback, so [`enrich`] cannot fail.

use crate::llm::{extract_object, prompts, render, run_with_retry, BackendRegistry, RetryPolicy};
use copysmith_adapters::SitePage;
use copysmith_core::{
    BackendCredentials, EnrichmentResult, GenerationRequest, InternalLink, StageError,
};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Occasions a scenario list may be drawn from.
pub const SCENARIO_VOCABULARY: [&str; 12] = [
    "wedding",
    "corporate event",
    "birthday party",
    "festival",
    "conference",
    "garden party",
    "trade fair",
    "christmas party",
    "anniversary",
    "graduation",
    "product launch",
    "team outing",
];

pub const FALLBACK_SCENARIOS: [&str; 4] =
    ["wedding", "corporate event", "birthday party", "garden party"];

pub const MIN_SCENARIOS: usize = 4;
pub const MAX_SCENARIOS: usize = 8;
pub const MAX_INTERNAL_LINKS: usize = 6;
pub const MAX_SECONDARY_KEYWORDS: usize = 9;

/// Everything one enrichment pass reads. Borrowed for the duration of the run.
pub struct EnrichmentContext<'a> {
    pub registry: &'a BackendRegistry,
    pub credentials: &'a BackendCredentials,
    pub policy: RetryPolicy,
    pub request: &'a GenerationRequest,
    pub focus_keyword: &'a str,
    pub keyword_suffix: &'a str,
    pub pages: &'a [SitePage],
}

impl EnrichmentContext<'_> {
    fn fields(&self) -> BTreeMap<String, String> {
        let mut fields = self.request.fields.clone();
        fields.insert("topic".to_string(), self.request.topic().to_string());
        fields.insert("focusKeyword".to_string(), self.focus_keyword.to_string());
        fields.insert("keywordSuffix".to_string(), self.keyword_suffix.to_string());
        fields.insert("vocabulary".to_string(), SCENARIO_VOCABULARY.join(", "));
        fields.insert("pages".to_string(), page_catalogue(self.pages));
        fields
    }

    async fn ask(
        &self,
        label: &str,
        system: &str,
        user_template: &str,
    ) -> Result<Map<String, Value>, StageError> {
        let user = render(user_template, &self.fields());
        let user = user.as_str();
        run_with_retry(label, self.policy, |_| async move {
            let raw = self.registry.call(system, user, self.credentials).await?;
            Ok(extract_object(&raw)?)
        })
        .await
    }
}

fn page_catalogue(pages: &[SitePage]) -> String {
    if pages.is_empty() {
        return "(no catalogue; suggest plausible site paths)".to_string();
    }
    pages
        .iter()
        .map(|page| {
            if page.title.trim().is_empty() {
                format!("- {}", page.path)
            } else {
                format!("- {} ({})", page.path, page.title.trim())
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn array<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Vec<Value>> {
    keys.iter().find_map(|key| object.get(*key)?.as_array())
}

fn normalize_phrase(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Scenario list drawn only from [`SCENARIO_VOCABULARY`], or `None` when the
/// answer does not yield at least [`MIN_SCENARIOS`] valid entries.
pub fn pick_scenarios(object: &Map<String, Value>) -> Option<Vec<String>> {
    let mut seen = BTreeSet::new();
    let picked: Vec<String> = array(object, &["scenarios", "occasions"])?
        .iter()
        .filter_map(Value::as_str)
        .map(normalize_phrase)
        .filter(|s| SCENARIO_VOCABULARY.contains(&s.as_str()))
        .filter(|s| seen.insert(s.clone()))
        .take(MAX_SCENARIOS)
        .collect();
    (picked.len() >= MIN_SCENARIOS).then_some(picked)
}

/// Internal links with site-relative paths, restricted to the catalogue when
/// one is configured. `None` when the answer carries no link list at all.
pub fn pick_links(object: &Map<String, Value>, pages: &[SitePage]) -> Option<Vec<InternalLink>> {
    let catalogue: BTreeSet<&str> = pages.iter().map(|p| p.path.trim()).collect();
    let mut seen = BTreeSet::new();
    let links = array(object, &["links", "internalLinks"])?
        .iter()
        .filter_map(|value| serde_json::from_value::<InternalLink>(value.clone()).ok())
        .map(|link| InternalLink {
            anchor: link.anchor.trim().to_string(),
            path: link.path.trim().to_string(),
        })
        .filter(|link| !link.anchor.is_empty() && link.path.starts_with('/'))
        .filter(|link| catalogue.is_empty() || catalogue.contains(link.path.as_str()))
        .filter(|link| seen.insert(link.path.clone()))
        .take(MAX_INTERNAL_LINKS)
        .collect();
    Some(links)
}

/// Secondary keywords of 2 to 4 words, deduplicated, without the focus keyword.
pub fn pick_keywords(object: &Map<String, Value>, focus_keyword: &str) -> Option<Vec<String>> {
    let focus = normalize_phrase(focus_keyword);
    let mut seen = BTreeSet::new();
    let keywords = array(object, &["keywords", "secondaryKeywords"])?
        .iter()
        .filter_map(Value::as_str)
        .map(normalize_phrase)
        .filter(|k| (2..=4).contains(&k.split(' ').count()))
        .filter(|k| *k != focus)
        .filter(|k| seen.insert(k.clone()))
        .take(MAX_SECONDARY_KEYWORDS)
        .collect();
    Some(keywords)
}

fn fallback_scenarios() -> Vec<String> {
    FALLBACK_SCENARIOS.iter().map(|s| s.to_string()).collect()
}

/// Resolve one sub-result, logging and substituting `fallback` on any failure.
fn settle<T>(
    label: &str,
    answer: Result<Map<String, Value>, StageError>,
    shape: impl FnOnce(&Map<String, Value>) -> Option<T>,
    fallback: impl FnOnce() -> T,
) -> T {
    match answer {
        Ok(object) => match shape(&object) {
            Some(value) => value,
            None => {
                tracing::warn!(stage = label, "unexpected enrichment shape, using fallback");
                fallback()
            }
        },
        Err(err) => {
            tracing::warn!(stage = label, error = %err, "enrichment failed, using fallback");
            fallback()
        }
    }
}

pub async fn enrich(ctx: &EnrichmentContext<'_>) -> EnrichmentResult {
    let scenarios_system = prompts::scenarios_system();
    let links_system = prompts::links_system();
    let keywords_system = prompts::keywords_system();

    let (scenarios, links, keywords) = futures::join!(
        ctx.ask("scenarios", &scenarios_system, prompts::SCENARIOS_USER),
        ctx.ask("links", &links_system, prompts::LINKS_USER),
        ctx.ask("keywords", &keywords_system, prompts::KEYWORDS_USER),
    );

    EnrichmentResult {
        scenarios: settle("scenarios", scenarios, pick_scenarios, fallback_scenarios),
        internal_links: settle("links", links, |o| pick_links(o, ctx.pages), Vec::new),
        secondary_keywords: settle(
            "keywords",
            keywords,
            |o| pick_keywords(o, ctx.focus_keyword),
            Vec::new,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn scenarios_keep_only_vocabulary_entries() {
        let answer = object(json!({
            "scenarios": ["Wedding", "bar mitzvah", "Corporate  Event", "festival",
                          "wedding", "garden party", "conference", "trade fair",
                          "graduation", "anniversary", "team outing"]
        }));
        let picked = pick_scenarios(&answer).unwrap();
        assert_eq!(picked.len(), MAX_SCENARIOS);
        assert_eq!(picked[0], "wedding");
        assert_eq!(picked[1], "corporate event");
        assert!(!picked.contains(&"bar mitzvah".to_string()));
    }

    #[test]
    fn too_few_scenarios_is_a_shape_mismatch() {
        let answer = object(json!({"scenarios": ["wedding", "festival", "rave"]}));
        assert!(pick_scenarios(&answer).is_none());
        assert!(pick_scenarios(&object(json!({"other": []}))).is_none());
    }

    #[test]
    fn links_are_filtered_and_capped() {
        let answer = object(json!({"links": [
            {"anchor": "Glassware", "path": "/glassware"},
            {"anchor": "External", "path": "https://example.com"},
            {"anchor": "", "path": "/empty-anchor"},
            {"text": "Tableware", "url": "/tableware"},
            {"anchor": "Dup", "path": "/glassware"},
            {"anchor": "A", "path": "/a"}, {"anchor": "B", "path": "/b"},
            {"anchor": "C", "path": "/c"}, {"anchor": "D", "path": "/d"},
            {"anchor": "E", "path": "/e"}
        ]}));
        let links = pick_links(&answer, &[]).unwrap();
        assert_eq!(links.len(), MAX_INTERNAL_LINKS);
        assert_eq!(links[0].path, "/glassware");
        assert_eq!(links[1].anchor, "Tableware");
        assert!(links.iter().all(|l| l.path.starts_with('/')));
    }

    #[test]
    fn links_respect_the_catalogue() {
        let pages = vec![SitePage {
            path: "/tableware".to_string(),
            title: "Tableware".to_string(),
        }];
        let answer = object(json!({"links": [
            {"anchor": "Glassware", "path": "/glassware"},
            {"anchor": "Tableware", "path": "/tableware"}
        ]}));
        let links = pick_links(&answer, &pages).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].path, "/tableware");
    }

    #[test]
    fn keywords_are_shaped() {
        let answer = object(json!({"keywords": [
            "wine glass hire", "Glassware Rental", "glasses", "champagne flute rental amsterdam",
            "rent cocktail glasses for weddings now", "wine glass hire", 42
        ]}));
        let keywords = pick_keywords(&answer, "glassware rental").unwrap();
        assert_eq!(
            keywords,
            vec!["wine glass hire", "champagne flute rental amsterdam"]
        );
    }

    #[test]
    fn settle_falls_back_on_error_and_shape() {
        let err: Result<Map<String, Value>, StageError> =
            Err(copysmith_core::ParseError::NoObject.into());
        assert_eq!(
            settle("scenarios", err, pick_scenarios, fallback_scenarios),
            fallback_scenarios()
        );
        let wrong = Ok(object(json!({"scenarios": "wedding"})));
        assert_eq!(
            settle("scenarios", wrong, pick_scenarios, fallback_scenarios),
            fallback_scenarios()
        );
    }

    #[test]
    fn catalogue_lists_paths_with_titles() {
        let pages = vec![
            SitePage {
                path: "/glassware".to_string(),
                title: "Glassware".to_string(),
            },
            SitePage {
                path: "/contact".to_string(),
                title: String::new(),
            },
        ];
        assert_eq!(page_catalogue(&pages), "- /glassware (Glassware)\n- /contact");
    }
}
