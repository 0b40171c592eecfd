//! Content-type instruction templates.
//!
//! Lookup order for a content type `ct`:
//! 1. `<templates_dir>/tenants/<tenant>/<ct>.txt`
//! 2. `<templates_dir>/<ct>.txt`
//! 3. the built-in template for `ct`
//!
//! Templates use `{{name}}` placeholders filled from request fields and
//! enrichment output.

use copysmith_core::{ConfigurationError, ContentType, TemplateSource};
use std::fs;
use std::path::{Path, PathBuf};

const LANDING_PAGE: &str = r#"Write a landing page for {{topic}} rental.
Focus keyword: {{focusKeyword}}
Audience: {{audience}}
Goal: {{goal}}
Service regions: {{region1}}, {{region2}}
Occasions to cover: {{scenarios}}
Secondary keywords to weave in: {{secondaryKeywords}}
Internal pages to link: {{internalLinks}}

The body (intro, benefits, scenarios, howItWorks, assortment, regionInfo,
advice, closing) must total between {{minWords}} and {{maxWords}} words and
mention the focus keyword at least six times.

Return one JSON object with this shape and nothing else:
{
  "seo": {"seoTitle": "", "metaDescription": "", "focusKeyword": "", "secondaryKeywords": [], "urlSlug": "", "searchIntent": ""},
  "content": {"h1": "", "intro": "", "benefits": "", "scenarios": "", "howItWorks": "", "assortment": "", "regionInfo": "", "advice": "", "closing": ""},
  "faq": {"title": "", "items": [{"question": "", "answer": ""}]},
  "cta": {"title": "", "text": "", "suggestions": []},
  "imageSEO": [{"alt": "", "title": ""}],
  "links": {"internalLinks": [{"anchor": "", "path": ""}], "externalLinks": [{"anchor": "", "url": "", "category": "", "reason": ""}]},
  "clusters": []
}"#;

const BLOG_POST: &str = r#"Write a blog post about {{topic}}.
Audience: {{audience}}
Angle: {{goal}}
Occasions worth mentioning: {{scenarios}}
Related phrases: {{secondaryKeywords}}

Return one JSON object: {"title": "", "metaDescription": "", "slug": "", "intro": "", "sections": [{"heading": "", "body": ""}], "conclusion": "", "tags": []}"#;

const PRODUCT_DESCRIPTION: &str = r#"Describe the product {{topic}} for a rental catalogue.
Audience: {{audience}}
Highlights: {{goal}}
Typical occasions: {{scenarios}}

Return one JSON object: {"name": "", "shortDescription": "", "longDescription": "", "features": [], "specifications": {}}"#;

const SOCIAL_POST: &str = r#"Write a social media post about {{topic}} for {{platform}}.
Audience: {{audience}}
Goal: {{goal}}
Occasion: {{scenarios}}

Return one JSON object: {"text": "", "hashtags": [], "callToAction": "", "imageIdea": ""}"#;

const NEWSLETTER: &str = r#"Write a newsletter issue about {{topic}}.
Audience: {{audience}}
Goal: {{goal}}
Upcoming occasions: {{scenarios}}

Return one JSON object: {"subject": "", "preheader": "", "greeting": "", "sections": [{"heading": "", "body": ""}], "callToAction": "", "signOff": ""}"#;

const FAQ_PAGE: &str = r#"Write an FAQ page about {{topic}} rental.
Audience: {{audience}}
Occasions customers ask about: {{scenarios}}
Related phrases: {{secondaryKeywords}}

Return one JSON object: {"title": "", "intro": "", "items": [{"question": "", "answer": ""}]}"#;

/// Built-in template for a content type.
pub fn builtin_template(content_type: ContentType) -> &'static str {
    match content_type {
        ContentType::LandingPage => LANDING_PAGE,
        ContentType::BlogPost => BLOG_POST,
        ContentType::ProductDescription => PRODUCT_DESCRIPTION,
        ContentType::SocialPost => SOCIAL_POST,
        ContentType::Newsletter => NEWSLETTER,
        ContentType::FaqPage => FAQ_PAGE,
    }
}

#[derive(Debug, Clone, Default)]
pub struct FileTemplateStore {
    root: Option<PathBuf>,
    builtins: bool,
}

impl FileTemplateStore {
    /// Store that reads overrides from `root` and falls back to built-ins.
    pub fn new(root: Option<PathBuf>) -> Self {
        Self {
            root,
            builtins: true,
        }
    }

    /// Store limited to the files under `root`.
    pub fn files_only(root: PathBuf) -> Self {
        Self {
            root: Some(root),
            builtins: false,
        }
    }

    fn candidates(&self, tenant_id: Option<&str>, content_type: ContentType) -> Vec<PathBuf> {
        let Some(root) = &self.root else {
            return Vec::new();
        };
        let file = format!("{}.txt", content_type.tag());
        let mut paths = Vec::with_capacity(2);
        if let Some(tenant) = tenant_id.map(str::trim).filter(|t| is_safe_segment(t)) {
            paths.push(root.join("tenants").join(tenant).join(&file));
        }
        paths.push(root.join(file));
        paths
    }
}

/// Tenant ids become a path segment; anything that could escape the root is ignored.
fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\'])
}

fn read_template(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(text) if !text.trim().is_empty() => Some(text),
        Ok(_) => None,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "unreadable template file");
            None
        }
    }
}

impl TemplateSource for FileTemplateStore {
    fn template(
        &self,
        tenant_id: Option<&str>,
        content_type: ContentType,
    ) -> Result<String, ConfigurationError> {
        for path in self.candidates(tenant_id, content_type) {
            if let Some(text) = read_template(&path) {
                tracing::debug!(path = %path.display(), "using template override");
                return Ok(text);
            }
        }
        if self.builtins {
            return Ok(builtin_template(content_type).to_string());
        }
        Err(ConfigurationError::MissingTemplate(content_type.tag().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_cover_every_content_type() {
        let store = FileTemplateStore::new(None);
        for ct in ContentType::ALL {
            let template = store.template(None, ct).unwrap();
            assert!(template.contains("{{topic}}"), "{}", ct);
        }
    }

    #[test]
    fn landing_page_builtin_asks_for_canonical_groups() {
        let template = builtin_template(ContentType::LandingPage);
        for group in ["\"seo\"", "\"content\"", "\"faq\"", "\"cta\"", "\"imageSEO\"", "\"links\""] {
            assert!(template.contains(group), "missing {}", group);
        }
    }

    #[test]
    fn tenant_override_wins_over_shared_override() {
        let dir = tempfile::tempdir().unwrap();
        let tenant_dir = dir.path().join("tenants").join("acme");
        fs::create_dir_all(&tenant_dir).unwrap();
        fs::write(dir.path().join("blog-post.txt"), "shared {{topic}}").unwrap();
        fs::write(tenant_dir.join("blog-post.txt"), "acme {{topic}}").unwrap();

        let store = FileTemplateStore::new(Some(dir.path().to_path_buf()));
        assert_eq!(
            store.template(Some("acme"), ContentType::BlogPost).unwrap(),
            "acme {{topic}}"
        );
        assert_eq!(
            store.template(Some("globex"), ContentType::BlogPost).unwrap(),
            "shared {{topic}}"
        );
        assert_eq!(
            store.template(None, ContentType::SocialPost).unwrap(),
            SOCIAL_POST
        );
    }

    #[test]
    fn path_like_tenant_ids_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("newsletter.txt"), "shared").unwrap();
        let store = FileTemplateStore::new(Some(dir.path().to_path_buf()));
        assert_eq!(
            store.template(Some("../etc"), ContentType::Newsletter).unwrap(),
            "shared"
        );
    }

    #[test]
    fn files_only_store_reports_missing_template() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTemplateStore::files_only(dir.path().to_path_buf());
        let err = store.template(None, ContentType::FaqPage).unwrap_err();
        assert_eq!(err, ConfigurationError::MissingTemplate("faq-page".to_string()));
    }
}
