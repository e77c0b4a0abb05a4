//! Site-aware field extraction.
//!
//! Given a parsed page and the [`SiteRuleSet`] for its site, this module
//! resolves title, headline, body text, image source and image caption.
//!
//! # Resolution Level
//!
//! Sites with alternate templates (the BBC family) are first probed for the
//! title. Where the title is found decides the [`Layout`], and the layout's
//! level is the index used for every other field on that page:
//!
//! | Title found by | Layout | Field index |
//! |----------------|--------|-------------|
//! | `title[0]` (any match) | primary | 0 |
//! | `title[1]` | alternate | 1 |
//! | `title[2]` | alternate | 0 |
//! | nothing | alternate | 1 |
//!
//! The layout is computed once per page and passed down explicitly.
//!
//! Missing fields are empty strings. Extraction never fails; only the
//! caller decides whether an empty result is an error.

use crate::models::ExtractedFields;
use crate::sites::{BodyJoin, SiteRuleSet};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument, warn};

/// Separator placed between body paragraphs.
pub const PARAGRAPH_SEPARATOR: &str = " \n ";

/// Separator used when the body falls back to whole blocks.
const BLOCK_SEPARATOR: &str = "\n";

/// Result of resolving one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub fields: ExtractedFields,
    /// Body text or headline is non-empty.
    pub success: bool,
}

/// Template a page was rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Primary,
    Alternate { level: usize },
}

impl Layout {
    /// Selector index used for headline, body, image and caption.
    pub fn level(self) -> usize {
        match self {
            Layout::Primary => 0,
            Layout::Alternate { level } => level,
        }
    }
}

/// Resolve all five fields of `page`.
#[instrument(level = "debug", skip_all, fields(site = rules.site_id))]
pub fn extract(page: &Html, rules: &SiteRuleSet) -> Extraction {
    let (title, layout) = resolve_title(page, rules);
    debug!(?layout, "Resolved page layout");

    let fields = resolve_fields(page, rules, title, layout);
    let success = fields.has_content();
    Extraction { fields, success }
}

/// Find the title and, for sites with alternate templates, the layout.
pub fn resolve_title(page: &Html, rules: &SiteRuleSet) -> (String, Layout) {
    let primary = select_all(page, rules.title.first().copied());
    if !primary.is_empty() || !rules.family.has_alternate_layouts() {
        return (first_text_of(&primary), Layout::Primary);
    }

    let mut level = 1;
    let mut title = first_text(page, rules.title.get(1).copied());
    if title.is_empty() {
        title = first_text(page, rules.title.get(2).copied());
        // The third template shares the primary field selectors. When it
        // misses too, the level stays at 1.
        if !title.is_empty() {
            level = 0;
        }
    }
    (title, Layout::Alternate { level })
}

fn resolve_fields(
    page: &Html,
    rules: &SiteRuleSet,
    title: String,
    layout: Layout,
) -> ExtractedFields {
    let level = layout.level();
    let join = rules.family.body_join();
    let paragraphs = node_texts(page, rules.document.get(level).copied());

    let (headline, document) = if join == BodyJoin::LeadAsHeadline {
        let headline = paragraphs.first().cloned().unwrap_or_default();
        (headline, join_body(&paragraphs, join))
    } else {
        let mut document = join_body(&paragraphs, join);
        if document.is_empty() && layout == Layout::Primary && rules.family.has_block_fallback() {
            document = node_texts(page, rules.document.get(1).copied()).join(BLOCK_SEPARATOR);
        }
        (first_text(page, rules.headline.get(level).copied()), document)
    };

    ExtractedFields {
        title,
        headline,
        document,
        image_src: resolve_image(page, rules, level),
        image_caption: first_text(page, rules.image_caption.get(level).copied()),
    }
}

/// Join body paragraphs according to the family's policy.
pub fn join_body(paragraphs: &[String], join: BodyJoin) -> String {
    let kept = match (join, paragraphs) {
        (BodyJoin::All, all) => all,
        (BodyJoin::DropFirst | BodyJoin::LeadAsHeadline, [_, rest @ ..]) => rest,
        (BodyJoin::DropLast, [rest @ .., _]) => rest,
        (_, []) => paragraphs,
    };
    kept.join(PARAGRAPH_SEPARATOR)
}

/// Image `src`, trying the secondary selector and the lazy-load `data-src`.
fn resolve_image(page: &Html, rules: &SiteRuleSet, level: usize) -> String {
    let mut images = select_all(page, rules.image.get(level).copied());
    if images.is_empty() && rules.family.has_secondary_image() {
        images = select_all(page, rules.image.get(level + 1).copied());
    }

    let src = first_attr(&images, "src");
    if !src.is_empty() {
        return src;
    }

    let deferred = select_all(page, rules.lazy_image);
    first_attr(&deferred, "data-src")
}

fn select_all<'a>(page: &'a Html, css: Option<&str>) -> Vec<ElementRef<'a>> {
    let Some(css) = css else {
        return Vec::new();
    };
    match Selector::parse(css) {
        Ok(selector) => page.select(&selector).collect(),
        Err(e) => {
            warn!(selector = css, error = ?e, "Invalid selector");
            Vec::new()
        }
    }
}

fn node_texts(page: &Html, css: Option<&str>) -> Vec<String> {
    select_all(page, css)
        .into_iter()
        .map(|el| el.text().collect::<String>())
        .collect()
}

fn first_text(page: &Html, css: Option<&str>) -> String {
    first_text_of(&select_all(page, css))
}

fn first_text_of(nodes: &[ElementRef<'_>]) -> String {
    nodes
        .first()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

fn first_attr(nodes: &[ElementRef<'_>], attr: &str) -> String {
    nodes
        .first()
        .and_then(|el| el.value().attr(attr))
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::sites::rules_for;

    fn extract_html(html: &str, site_id: &str) -> Result<Extraction> {
        let rules = rules_for(site_id)?;
        let page = Html::parse_document(html);
        Ok(extract(&page, rules))
    }

    fn paras(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_join_body_policies() {
        let nodes = paras(&["zero", "one", "two"]);
        assert_eq!(join_body(&nodes, BodyJoin::All), "zero \n one \n two");
        assert_eq!(join_body(&nodes, BodyJoin::DropFirst), "one \n two");
        assert_eq!(join_body(&nodes, BodyJoin::LeadAsHeadline), "one \n two");
        assert_eq!(join_body(&nodes, BodyJoin::DropLast), "zero \n one");
    }

    #[test]
    fn test_join_body_short_inputs() {
        let single = paras(&["only"]);
        assert_eq!(join_body(&single, BodyJoin::DropFirst), "");
        assert_eq!(join_body(&single, BodyJoin::DropLast), "");
        assert_eq!(join_body(&single, BodyJoin::All), "only");
        assert_eq!(join_body(&[], BodyJoin::DropLast), "");
        assert_eq!(join_body(&[], BodyJoin::All), "");
    }

    #[test]
    fn test_voanews_lead_paragraph_is_headline() {
        let html = r#"<html><body>
            <h1 class="page-header__title"><span>  Storm hits coast </span></h1>
            <div class="article__body"><p>Headline text</p><p>Para 1</p><p>Para 2</p></div>
            <figure class="media--type-image"><img src="https://gdb.voanews.com/a.jpg"><figcaption> A caption </figcaption></figure>
        </body></html>"#;
        let ex = extract_html(html, "www.voanews.com").unwrap();
        assert_eq!(ex.fields.title, "Storm hits coast");
        assert_eq!(ex.fields.headline, "Headline text");
        assert_eq!(ex.fields.document, "Para 1 \n Para 2");
        assert_eq!(ex.fields.image_src, "https://gdb.voanews.com/a.jpg");
        assert_eq!(ex.fields.image_caption, "A caption");
        assert!(ex.success);
    }

    #[test]
    fn test_rfi_drops_last_paragraph() {
        let html = r#"<html><body><article><h1>Titre</h1>
            <p class="t-content__chapo"> Chapo </p>
            <div class="t-content__body"><p>Un</p><p>Deux</p><p>Signature</p></div>
            <figure><img class="m-figure__img" src="https://s.rfi.fr/x.jpg">
            <figcaption class="m-figure__caption"><span>Legende</span></figcaption></figure>
        </article></body></html>"#;
        let ex = extract_html(html, "rfi.fr").unwrap();
        assert_eq!(ex.fields.title, "Titre");
        assert_eq!(ex.fields.headline, "Chapo");
        assert_eq!(ex.fields.document, "Un \n Deux");
        assert_eq!(ex.fields.image_src, "https://s.rfi.fr/x.jpg");
        assert_eq!(ex.fields.image_caption, "Legende");
    }

    #[test]
    fn test_dw_keeps_all_and_uses_secondary_image() {
        let html = r#"<html><body>
            <div id="bodyContent"><div><h1>DW title</h1></div></div>
            <p class="intro">Intro</p>
            <div class="group"><div class="longText"><p>A</p><p>B</p></div></div>
            <div class="picBox"><img src="/image/1_303.jpg"><p>Pic caption</p></div>
        </body></html>"#;
        let ex = extract_html(html, "www.dw.com/fr").unwrap();
        assert_eq!(ex.fields.title, "DW title");
        assert_eq!(ex.fields.headline, "Intro");
        assert_eq!(ex.fields.document, "A \n B");
        // Still relative here; completion happens when assembling.
        assert_eq!(ex.fields.image_src, "/image/1_303.jpg");
        assert_eq!(ex.fields.image_caption, "Pic caption");
    }

    #[test]
    fn test_dw_primary_image_wins() {
        let html = r#"<html><body>
            <a class="overlayLink"><img src="/image/main.jpg"></a>
            <div class="picBox"><img src="/image/other.jpg"></div>
        </body></html>"#;
        let ex = extract_html(html, "www.dw.com/en").unwrap();
        assert_eq!(ex.fields.image_src, "/image/main.jpg");
    }

    #[test]
    fn test_voa_regional_drops_first_and_falls_back_to_block() {
        let with_paragraphs = r#"<html><body><h1 class="pg-title">Titre</h1>
            <div class="intro"><p>Intro</p></div>
            <div class="wsw"><p>Teaser</p><p>Corps 1</p><p>Corps 2</p></div>
        </body></html>"#;
        let ex = extract_html(with_paragraphs, "www.voaafrique.com").unwrap();
        assert_eq!(ex.fields.headline, "Intro");
        assert_eq!(ex.fields.document, "Corps 1 \n Corps 2");

        let block_only = r#"<html><body><h1 class="pg-title">Kichwa</h1>
            <div class="wsw">Maandishi yote</div>
        </body></html>"#;
        let ex = extract_html(block_only, "www.voaswahili.com").unwrap();
        assert_eq!(ex.fields.document, "Maandishi yote");
        assert!(ex.success);
    }

    #[test]
    fn test_bbc_primary_layout() {
        let html = r#"<html><body>
            <h1 class="story-body__h1">Story</h1>
            <p class="story-body__introduction"> Intro </p>
            <div class="story-body__inner"><p>Intro</p><p>Body 1</p><p>Body 2</p></div>
            <img class="js-image-replace" src="https://ichef.bbci.co.uk/a.jpg">
            <span class="media-caption__text">Caption</span>
        </body></html>"#;
        let page = Html::parse_document(html);
        let rules = rules_for("www.bbc.com/news").unwrap();
        let (title, layout) = resolve_title(&page, rules);
        assert_eq!(title, "Story");
        assert_eq!(layout, Layout::Primary);

        let ex = extract(&page, rules);
        assert_eq!(ex.fields.headline, "Intro");
        assert_eq!(ex.fields.document, "Body 1 \n Body 2");
        assert_eq!(ex.fields.image_src, "https://ichef.bbci.co.uk/a.jpg");
        assert_eq!(ex.fields.image_caption, "Caption");
    }

    #[test]
    fn test_bbc_primary_block_fallback() {
        let html = r#"<html><body>
            <h1 class="story-body__h1">Story</h1>
            <main><p class="Paragraph-k859h4-0">First</p><p class="Paragraph-k859h4-0">Second</p></main>
        </body></html>"#;
        let ex = extract_html(html, "www.bbc.com/swahili").unwrap();
        assert_eq!(ex.fields.document, "First\nSecond");
    }

    #[test]
    fn test_bbc_alternate_layout_shifts_every_field() {
        let html = r#"<html><body><main>
            <h1 class="Headline-sc-1kh1qhu-0">Habari</h1>
            <p class="Paragraph-k859h4-0"><b>Lead</b></p>
            <p class="Paragraph-k859h4-0">Aya 1</p>
            <p class="Paragraph-k859h4-0">Aya 2</p>
            <figure><img class="StyledImg-sc-7vx2mr-0" src="https://ichef.bbci.co.uk/b.jpg">
            <figcaption class="Caption-sc-16x70so-0"><p>Maelezo</p></figcaption></figure>
        </main></body></html>"#;
        let page = Html::parse_document(html);
        let rules = rules_for("www.bbc.com/swahili").unwrap();
        assert_eq!(resolve_title(&page, rules).1, Layout::Alternate { level: 1 });

        let ex = extract(&page, rules);
        assert_eq!(ex.fields.title, "Habari");
        assert_eq!(ex.fields.headline, "Lead");
        assert_eq!(ex.fields.document, "Aya 1 \n Aya 2");
        assert_eq!(ex.fields.image_src, "https://ichef.bbci.co.uk/b.jpg");
        assert_eq!(ex.fields.image_caption, "Maelezo");
    }

    #[test]
    fn test_bbc_third_title_uses_primary_selectors_without_block_fallback() {
        let html = r#"<html><body>
            <h2 class="unit__title">Live page</h2>
            <div class="story-body__inner"><p>Only teaser</p></div>
            <main><p class="Paragraph-k859h4-0">Not used</p><p class="Paragraph-k859h4-0">Not used</p></main>
        </body></html>"#;
        let page = Html::parse_document(html);
        let rules = rules_for("www.bbc.com/afrique").unwrap();
        assert_eq!(
            resolve_title(&page, rules),
            ("Live page".to_string(), Layout::Alternate { level: 0 })
        );
        let ex = extract(&page, rules);
        assert_eq!(ex.fields.document, "");
        assert!(!ex.success);
    }

    #[test]
    fn test_bbc_level_stays_at_one_when_no_title_matches() {
        let html = r#"<html><body><main>
            <p class="Paragraph-k859h4-0">Dropped</p>
            <p class="Paragraph-k859h4-0">Kept</p>
        </main></body></html>"#;
        let page = Html::parse_document(html);
        let rules = rules_for("www.bbc.com/news").unwrap();
        assert_eq!(
            resolve_title(&page, rules),
            (String::new(), Layout::Alternate { level: 1 })
        );
        let ex = extract(&page, rules);
        assert_eq!(ex.fields.document, "Kept");
        assert!(ex.success);
    }

    #[test]
    fn test_bbc_lazy_image_fallback() {
        let html = r#"<html><body>
            <h1 class="story-body__h1">Story</h1>
            <div class="js-delayed-image-load" data-src="https://ichef.bbci.co.uk/lazy.jpg"></div>
        </body></html>"#;
        let ex = extract_html(html, "www.bbc.com/news").unwrap();
        assert_eq!(ex.fields.image_src, "https://ichef.bbci.co.uk/lazy.jpg");
    }

    #[test]
    fn test_lazy_image_ignored_for_other_families() {
        let html = r#"<html><body><article><h1>T</h1></article>
            <div class="js-delayed-image-load" data-src="https://x/lazy.jpg"></div>
        </body></html>"#;
        let ex = extract_html(html, "rfi.fr").unwrap();
        assert_eq!(ex.fields.image_src, "");
    }

    #[test]
    fn test_title_only_page_is_not_success() {
        let html = r#"<html><body><article><h1>Just a title</h1></article></body></html>"#;
        let ex = extract_html(html, "en.rfi.fr").unwrap();
        assert_eq!(ex.fields.title, "Just a title");
        assert!(!ex.success);
        assert!(!ex.fields.is_blank());
    }

    #[test]
    fn test_empty_page_is_blank_for_every_site() {
        for site in crate::sites::site_ids() {
            let ex = extract_html("<html><body></body></html>", site).unwrap();
            assert!(ex.fields.is_blank(), "{site}");
            assert!(!ex.success, "{site}");
        }
    }

    #[test]
    fn test_success_flag_matches_document_or_headline() {
        let pages = [
            ("rfi.fr", r#"<p class="t-content__chapo">H</p>"#),
            ("sw.rfi.fr", r#"<div class="t-content__body"><p>a</p></div>"#),
            ("www.dw.com/sw", r#"<div class="group"><div class="longText"><p>a</p></div></div>"#),
            ("www.voanews.com", r#"<div class="article__body"><p>lead</p></div>"#),
            ("www.bbc.com/news", r#"<h2 class="unit__title">T</h2><p class="story-body__introduction">H</p>"#),
            ("www.bbc.com/news", r#"<h1 class="Headline-sc-1kh1qhu-0">T</h1>"#),
            ("www.voaafrique.com", r#"<h1 class="pg-title">T</h1>"#),
        ];
        for (site, body) in pages {
            let ex = extract_html(&format!("<html><body>{body}</body></html>"), site).unwrap();
            assert_eq!(
                ex.success,
                !ex.fields.document.is_empty() || !ex.fields.headline.is_empty(),
                "{site}: {body}"
            );
        }
    }

    #[test]
    fn test_unknown_site() {
        assert!(extract_html("<html></html>", "www.example.org").is_err());
    }
}
