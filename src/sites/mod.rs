//! Per-site extraction rules.
//!
//! Every supported outlet/locale pair is one row of a static table
//! ([`table::SITES`]). A row carries the ordered selector alternatives for
//! each of the five field categories plus the [`SiteFamily`] that decides how
//! those selectors are combined at extraction time.
//!
//! # Supported Sites
//!
//! | Family | Site identifiers | Body policy |
//! |--------|------------------|-------------|
//! | RFI | `sw.rfi.fr`, `rfi.fr`, `en.rfi.fr` | drop trailing paragraph |
//! | BBC | `www.bbc.com/{swahili,news,afrique}` | drop leading paragraph, alternate layouts |
//! | DW | `www.dw.com/{en,fr,sw}` | keep every paragraph |
//! | VOA News | `www.voanews.com` | leading paragraph is the headline |
//! | VOA regional | `www.voaafrique.com`, `www.voaswahili.com` | drop leading paragraph |
//!
//! Adding a site means adding a row, not a type.

pub mod table;

use crate::error::{HarvestError, Result};

/// How the paragraphs matched by the document selector become body text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyJoin {
    /// Keep every matched node.
    All,
    /// Skip node 0, a teaser that repeats the headline.
    DropFirst,
    /// Skip the final node, a signature/boilerplate line.
    DropLast,
    /// Node 0 is the headline; the rest is the body.
    LeadAsHeadline,
}

/// Group of sites rendered by the same publishing template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteFamily {
    Rfi,
    Bbc,
    Dw,
    VoaNews,
    VoaRegional,
}

impl SiteFamily {
    pub fn body_join(self) -> BodyJoin {
        match self {
            SiteFamily::Rfi => BodyJoin::DropLast,
            SiteFamily::Bbc | SiteFamily::VoaRegional => BodyJoin::DropFirst,
            SiteFamily::Dw => BodyJoin::All,
            SiteFamily::VoaNews => BodyJoin::LeadAsHeadline,
        }
    }

    /// Pages may come from an alternate template whose title sits under a
    /// different selector; finding the title there switches every other field
    /// to its alternate selector too.
    pub fn has_alternate_layouts(self) -> bool {
        matches!(self, SiteFamily::Bbc)
    }

    /// When the paragraph join is empty, retry `document[1]` as a whole block.
    pub fn has_block_fallback(self) -> bool {
        matches!(self, SiteFamily::Bbc | SiteFamily::VoaRegional)
    }

    /// Try `image[1]` when `image[0]` matches nothing.
    pub fn has_secondary_image(self) -> bool {
        matches!(self, SiteFamily::Dw)
    }

    /// Scheme and host prepended to root-relative image sources.
    pub fn image_origin(self) -> Option<&'static str> {
        match self {
            SiteFamily::Dw => Some("https://www.dw.com"),
            _ => None,
        }
    }
}

/// Selector alternatives for one site identifier.
///
/// Index `n` of each list belongs to the same page template, which is what
/// lets a single resolution level select a consistent set across fields.
/// Lists may be empty when a site never exposes the field.
#[derive(Debug)]
pub struct SiteRuleSet {
    pub site_id: &'static str,
    pub family: SiteFamily,
    pub title: &'static [&'static str],
    pub headline: &'static [&'static str],
    pub document: &'static [&'static str],
    pub image: &'static [&'static str],
    pub image_caption: &'static [&'static str],
    /// Selector for deferred images whose real source sits in `data-src`.
    pub lazy_image: Option<&'static str>,
}

/// Look up the rules for `site_id`.
///
/// # Errors
///
/// [`HarvestError::UnknownSite`] when no row matches. Site identifiers come
/// from seed-file keys, which share their vocabulary with this table.
pub fn rules_for(site_id: &str) -> Result<&'static SiteRuleSet> {
    table::SITES
        .iter()
        .find(|rules| rules.site_id == site_id)
        .ok_or_else(|| HarvestError::UnknownSite(site_id.to_string()))
}

/// Every supported site identifier, in table order.
pub fn site_ids() -> impl Iterator<Item = &'static str> {
    table::SITES.iter().map(|rules| rules.site_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Selector;

    #[test]
    fn test_every_site_resolves() {
        for id in site_ids() {
            let rules = rules_for(id).unwrap();
            assert_eq!(rules.site_id, id);
        }
        assert_eq!(site_ids().count(), 12);
    }

    #[test]
    fn test_unknown_site_is_an_error() {
        let err = rules_for("www.example.com").unwrap_err();
        assert!(matches!(err, HarvestError::UnknownSite(ref s) if s == "www.example.com"));
    }

    #[test]
    fn test_site_ids_are_unique() {
        let mut ids: Vec<_> = site_ids().collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 12);
    }

    #[test]
    fn test_every_selector_parses() {
        for rules in table::SITES.iter() {
            let all = rules
                .title
                .iter()
                .chain(rules.headline)
                .chain(rules.document)
                .chain(rules.image)
                .chain(rules.image_caption)
                .chain(rules.lazy_image.iter());
            for css in all {
                assert!(
                    Selector::parse(css).is_ok(),
                    "{}: selector `{}` does not parse",
                    rules.site_id,
                    css
                );
            }
        }
    }

    #[test]
    fn test_family_policies() {
        assert_eq!(rules_for("rfi.fr").unwrap().family.body_join(), BodyJoin::DropLast);
        assert_eq!(
            rules_for("www.voanews.com").unwrap().family.body_join(),
            BodyJoin::LeadAsHeadline
        );
        assert!(rules_for("www.bbc.com/afrique").unwrap().family.has_alternate_layouts());
        assert!(!rules_for("www.voaswahili.com").unwrap().family.has_alternate_layouts());
        assert!(rules_for("www.voaswahili.com").unwrap().family.has_block_fallback());
        assert_eq!(
            rules_for("www.dw.com/sw").unwrap().family.image_origin(),
            Some("https://www.dw.com")
        );
        assert_eq!(rules_for("en.rfi.fr").unwrap().family.image_origin(), None);
    }

    #[test]
    fn test_voanews_has_no_headline_selector() {
        assert!(rules_for("www.voanews.com").unwrap().headline.is_empty());
    }
}
