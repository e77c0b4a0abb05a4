//! The static site table.
//!
//! Selectors are tied to each outlet's current markup and break when a site
//! is redesigned; fixing one means editing its row here.

use super::{SiteFamily, SiteRuleSet};

const fn rfi(site_id: &'static str) -> SiteRuleSet {
    SiteRuleSet {
        site_id,
        family: SiteFamily::Rfi,
        title: &["article h1"],
        headline: &["p.t-content__chapo"],
        document: &["div.t-content__body p"],
        image: &["img.m-figure__img"],
        image_caption: &["figcaption.m-figure__caption span"],
        lazy_image: None,
    }
}

const fn bbc(site_id: &'static str) -> SiteRuleSet {
    SiteRuleSet {
        site_id,
        family: SiteFamily::Bbc,
        title: &[
            "h1.story-body__h1",
            "h1.Headline-sc-1kh1qhu-0",
            "h2.unit__title",
        ],
        headline: &["p.story-body__introduction", "p.Paragraph-k859h4-0 b"],
        document: &["div.story-body__inner p", "main p.Paragraph-k859h4-0"],
        image: &["img.js-image-replace", "img.StyledImg-sc-7vx2mr-0"],
        image_caption: &[
            "span.media-caption__text",
            "figcaption.Caption-sc-16x70so-0 p",
        ],
        lazy_image: Some(".js-delayed-image-load"),
    }
}

const fn dw(site_id: &'static str) -> SiteRuleSet {
    SiteRuleSet {
        site_id,
        family: SiteFamily::Dw,
        title: &["div#bodyContent div h1"],
        headline: &["p.intro"],
        document: &["div.group div.longText p"],
        image: &["a.overlayLink img", "div.picBox img"],
        image_caption: &["div.picBox p"],
        lazy_image: None,
    }
}

const fn voa_regional(site_id: &'static str) -> SiteRuleSet {
    SiteRuleSet {
        site_id,
        family: SiteFamily::VoaRegional,
        title: &["h1.pg-title"],
        headline: &["div.intro p"],
        document: &["div.wsw p", "div.wsw"],
        image: &["div.img-wrap img"],
        image_caption: &["figure.media-image span.caption"],
        lazy_image: None,
    }
}

pub static SITES: [SiteRuleSet; 12] = [
    rfi("sw.rfi.fr"),
    rfi("rfi.fr"),
    rfi("en.rfi.fr"),
    bbc("www.bbc.com/swahili"),
    bbc("www.bbc.com/news"),
    bbc("www.bbc.com/afrique"),
    dw("www.dw.com/en"),
    dw("www.dw.com/fr"),
    dw("www.dw.com/sw"),
    SiteRuleSet {
        site_id: "www.voanews.com",
        family: SiteFamily::VoaNews,
        title: &["h1.page-header__title span"],
        headline: &[],
        document: &["div.article__body p"],
        image: &["figure.media--type-image img"],
        image_caption: &["figure.media--type-image figcaption"],
        lazy_image: None,
    },
    voa_regional("www.voaafrique.com"),
    voa_regional("www.voaswahili.com"),
];
