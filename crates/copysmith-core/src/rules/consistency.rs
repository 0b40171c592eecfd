//! Keeps the focus keyword and the fields derived from it on-topic.
//!
//! Models occasionally answer for a neighbouring topic ("tableware rental"
//! when asked about glassware). The corrector re-asserts the expected focus
//! keyword on every pass and swaps wrong topic tokens in the headline
//! fields. Foreign topics come from a configured list plus the wrong topics
//! observed earlier in the same run, recorded in a [`TopicLedger`]. A drifted
//! keyword is only recorded when it names a configured topic.

use super::text::{collapse_whitespace, contains_phrase, replace_phrase, slugify};
use crate::content::CanonicalContent;
use std::collections::BTreeSet;

/// `"<topic> <suffix>"`, whitespace-normalized. The topic keeps its case.
pub fn expected_keyword(topic: &str, suffix: &str) -> String {
    collapse_whitespace(&format!("{} {}", topic, suffix))
}

/// Per-run record of topics that must not appear in headline fields.
#[derive(Debug, Clone, Default)]
pub struct TopicLedger {
    known: Vec<String>,
    observed: BTreeSet<String>,
}

impl TopicLedger {
    pub fn new<I, S>(known: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            known: known
                .into_iter()
                .map(|t| collapse_whitespace(t.as_ref()).to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
            observed: BTreeSet::new(),
        }
    }

    pub fn observed(&self) -> impl Iterator<Item = &str> {
        self.observed.iter().map(String::as_str)
    }

    /// Record what is left of a drifted keyword. Leftovers that name no
    /// configured topic ("wedding", "luxury") are ignored.
    fn observe(&mut self, leftover: &str, topic: &str) {
        let leftover = collapse_whitespace(leftover).to_lowercase();
        if leftover.is_empty() || contains_phrase(topic, &leftover) {
            return;
        }
        let named: Vec<String> = self
            .known
            .iter()
            .filter(|known| contains_phrase(&leftover, known) && !contains_phrase(topic, known))
            .cloned()
            .collect();
        if named.is_empty() {
            return;
        }
        self.observed.insert(leftover);
        self.observed.extend(named);
    }

    /// Candidate wrong topics, longest first so multi-word topics win.
    fn candidates(&self, include_known: bool, topic: &str) -> Vec<String> {
        let topic = topic.to_lowercase();
        let mut out: Vec<String> = self.observed.iter().cloned().collect();
        if include_known {
            for known in &self.known {
                if !out.contains(known) {
                    out.push(known.clone());
                }
            }
        }
        out.retain(|candidate| *candidate != topic && !contains_phrase(&topic, candidate));
        out.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub field: &'static str,
    pub wrong_topic: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrectionReport {
    pub keyword_drifted: bool,
    pub previous_keyword: String,
    pub replacements: Vec<Replacement>,
}

impl CorrectionReport {
    pub fn changed(&self) -> bool {
        self.keyword_drifted || !self.replacements.is_empty()
    }
}

pub fn correct_consistency(
    content: &mut CanonicalContent,
    topic: &str,
    suffix: &str,
    ledger: &mut TopicLedger,
) -> CorrectionReport {
    let topic = collapse_whitespace(topic);
    let mut report = CorrectionReport::default();
    if topic.is_empty() {
        return report;
    }

    let expected = expected_keyword(&topic, suffix);
    let current = collapse_whitespace(&content.seo.focus_keyword);
    let drifted = !(contains_phrase(&current, &topic) && contains_phrase(&current, suffix));

    if drifted {
        report.keyword_drifted = true;
        report.previous_keyword = current.clone();
        let (leftover, _) = replace_phrase(&current, suffix, "");
        ledger.observe(&leftover, &topic);
    }
    content.seo.focus_keyword = expected;

    let candidates = ledger.candidates(drifted, &topic);
    if candidates.is_empty() {
        return report;
    }

    let topic_slug = slugify(&topic);
    let seo = &mut content.seo;
    let fields: [(&'static str, &mut String, &str); 4] = [
        ("seoTitle", &mut seo.seo_title, topic.as_str()),
        ("metaDescription", &mut seo.meta_description, topic.as_str()),
        ("urlSlug", &mut seo.url_slug, topic_slug.as_str()),
        ("h1", &mut content.content.h1, topic.as_str()),
    ];
    for (name, value, replacement) in fields {
        for wrong in &candidates {
            let (updated, count) = replace_phrase(value.as_str(), wrong, replacement);
            if count > 0 {
                *value = updated;
                report.replacements.push(Replacement {
                    field: name,
                    wrong_topic: wrong.clone(),
                    count,
                });
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drifted_content() -> CanonicalContent {
        let mut content = CanonicalContent::default();
        content.seo.focus_keyword = "tableware rental".to_string();
        content.seo.seo_title = "Tableware rental Amsterdam | Best prices".to_string();
        content.seo.meta_description = "Rent tableware for any event.".to_string();
        content.seo.url_slug = "tableware-rental-amsterdam".to_string();
        content.content.h1 = "Tableware rental in Amsterdam".to_string();
        content
    }

    #[test]
    fn rewrites_drifted_keyword_and_headline_fields() {
        let mut content = drifted_content();
        let mut ledger = TopicLedger::new(["tableware"]);
        let report = correct_consistency(&mut content, "glassware", "rental", &mut ledger);

        assert!(report.keyword_drifted);
        assert_eq!(report.previous_keyword, "tableware rental");
        assert_eq!(content.seo.focus_keyword, "glassware rental");
        assert_eq!(content.seo.seo_title, "Glassware rental Amsterdam | Best prices");
        assert_eq!(content.seo.meta_description, "Rent glassware for any event.");
        assert_eq!(content.seo.url_slug, "glassware-rental-amsterdam");
        assert_eq!(content.content.h1, "Glassware rental in Amsterdam");
        assert_eq!(ledger.observed().collect::<Vec<_>>(), vec!["tableware"]);
    }

    #[test]
    fn observed_topics_are_corrected_on_later_passes() {
        let mut ledger = TopicLedger::new(["tableware"]);
        let mut first = drifted_content();
        correct_consistency(&mut first, "glassware", "rental", &mut ledger);

        // A later rewrite keeps the right keyword but drifts the title again.
        let mut second = first.clone();
        second.seo.seo_title = "Tableware rental Top 24h".to_string();
        let report = correct_consistency(&mut second, "glassware", "rental", &mut ledger);
        assert!(!report.keyword_drifted);
        assert_eq!(second.seo.seo_title, "Glassware rental Top 24h");
    }

    #[test]
    fn known_topics_are_only_used_when_the_keyword_drifted() {
        let mut content = CanonicalContent::default();
        content.seo.focus_keyword = "glassware rental".to_string();
        content.content.h1 = "Glassware and linen rental".to_string();
        let mut ledger = TopicLedger::new(["linen", "tableware"]);
        let report = correct_consistency(&mut content, "glassware", "rental", &mut ledger);
        assert!(!report.changed());
        assert_eq!(content.content.h1, "Glassware and linen rental");
    }

    #[test]
    fn known_topics_fix_fields_when_keyword_is_missing() {
        let mut content = CanonicalContent::default();
        content.seo.seo_title = "Linen rental Hoofddorp".to_string();
        let mut ledger = TopicLedger::new(["linen", "glassware"]);
        let report = correct_consistency(&mut content, "glassware", "rental", &mut ledger);
        assert!(report.keyword_drifted);
        assert_eq!(content.seo.focus_keyword, "glassware rental");
        assert_eq!(content.seo.seo_title, "Glassware rental Hoofddorp");
    }

    #[test]
    fn correct_content_is_left_alone() {
        let mut content = CanonicalContent::default();
        content.seo.focus_keyword = "Glassware Rental".to_string();
        content.seo.seo_title = "Glassware rental".to_string();
        let mut ledger = TopicLedger::new(["tableware"]);
        let report = correct_consistency(&mut content, "Glassware", "rental", &mut ledger);
        assert!(!report.changed());
        assert_eq!(content.seo.focus_keyword, "Glassware rental");
    }

    #[test]
    fn keyword_keeps_the_topic_case() {
        assert_eq!(expected_keyword(" Party   Tent ", "rental"), "Party Tent rental");

        let mut content = drifted_content();
        let mut ledger = TopicLedger::new(["tableware"]);
        correct_consistency(&mut content, "Party Tent", "rental", &mut ledger);
        assert_eq!(content.seo.focus_keyword, "Party Tent rental");
        assert_eq!(content.content.h1, "Party Tent rental in Amsterdam");
        assert_eq!(content.seo.url_slug, "party-tent-rental-amsterdam");
    }

    #[test]
    fn unknown_leftovers_are_not_treated_as_topics() {
        let mut content = CanonicalContent::default();
        content.seo.focus_keyword = "wedding rental".to_string();
        content.seo.seo_title = "Glassware for your wedding".to_string();
        content.content.h1 = "Wedding glassware".to_string();
        let mut ledger = TopicLedger::new(["tableware"]);

        let report = correct_consistency(&mut content, "glassware", "rental", &mut ledger);
        assert!(report.keyword_drifted);
        assert!(report.replacements.is_empty());
        assert_eq!(content.seo.focus_keyword, "glassware rental");
        assert_eq!(content.seo.seo_title, "Glassware for your wedding");
        assert_eq!(content.content.h1, "Wedding glassware");
        assert_eq!(ledger.observed().count(), 0);
    }

    #[test]
    fn leftovers_naming_a_known_topic_are_recorded_whole() {
        let mut content = CanonicalContent::default();
        content.seo.focus_keyword = "wedding tableware rental".to_string();
        let mut ledger = TopicLedger::new(["tableware"]);
        correct_consistency(&mut content, "glassware", "rental", &mut ledger);
        assert_eq!(
            ledger.observed().collect::<Vec<_>>(),
            vec!["tableware", "wedding tableware"]
        );
    }

    #[test]
    fn multi_word_topics_are_replaced_whole() {
        let mut content = CanonicalContent::default();
        content.seo.focus_keyword = "party tent rental".to_string();
        content.seo.url_slug = "party-tent-rental".to_string();
        let mut ledger = TopicLedger::new(["tent"]);
        correct_consistency(&mut content, "garden furniture", "rental", &mut ledger);
        assert_eq!(content.seo.url_slug, "garden-furniture-rental");
    }

    #[test]
    fn empty_topic_changes_nothing() {
        let mut content = drifted_content();
        let before = content.clone();
        let mut ledger = TopicLedger::default();
        let report = correct_consistency(&mut content, "  ", "rental", &mut ledger);
        assert!(!report.changed());
        assert_eq!(content, before);
    }
}
