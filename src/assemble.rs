//! Turn extracted fields into the persisted [`Document`].

use crate::models::{Document, ExtractedFields};
use crate::sites::SiteRuleSet;

/// Package `fields` for `source_url`, completing the image URL when the site
/// family serves root-relative image paths.
///
/// Validity is not checked here; callers use [`crate::extract::Extraction::success`].
pub fn assemble(fields: ExtractedFields, rules: &SiteRuleSet, source_url: &str) -> Document {
    let image = match rules.family.image_origin() {
        Some(origin) => absolutize(fields.image_src, origin),
        None => fields.image_src,
    };

    Document {
        title: fields.title,
        headline: fields.headline,
        document: fields.document,
        image,
        image_desc: fields.image_caption,
        url: source_url.to_string(),
    }
}

/// Prefix `origin` to a root-relative path; everything else is untouched.
fn absolutize(src: String, origin: &str) -> String {
    if src.starts_with('/') && !src.starts_with("//") {
        format!("{}{}", origin.trim_end_matches('/'), src)
    } else {
        src
    }
}
