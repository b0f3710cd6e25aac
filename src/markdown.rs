//! Parsing and rewriting of `![token](src)` image references.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::error::{ReconcileError, Result};
use crate::models::ImageRef;

static IMAGE_REFERENCE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"!\[([^\]]*)\]\(([^)]+)\)").expect("Image reference regex should be valid")
});

/// One `![token](src)` occurrence in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference<'a> {
    pub token: &'a str,
    pub src: &'a str,
    pub span: Range<usize>,
}

/// All well-formed image references, left to right.
///
/// Unbalanced brackets simply do not match.
pub fn references(document: &str) -> impl Iterator<Item = ImageReference<'_>> {
    IMAGE_REFERENCE_REGEX.captures_iter(document).filter_map(|caps| {
        let whole = caps.get(0)?;
        Some(ImageReference {
            token: caps.get(1)?.as_str(),
            src: caps.get(2)?.as_str(),
            span: whole.range(),
        })
    })
}

/// Index of the image a reference's `src` points at.
///
/// Ids take precedence over urls across the whole list, so an image whose id
/// equals another image's url wins the reference.
pub fn resolve_source(src: &str, images: &[ImageRef]) -> Option<usize> {
    images
        .iter()
        .position(|img| img.id == src)
        .or_else(|| images.iter().position(|img| img.url == src))
}

/// Images in the order the document first references them.
///
/// Each `src` is resolved with [`resolve_source`]. Images the document never
/// references are left out.
pub fn extract_order(document: &str, images: &[ImageRef]) -> Vec<ImageRef> {
    let mut ordered: Vec<usize> = Vec::new();

    for reference in references(document) {
        if let Some(index) = resolve_source(reference.src, images) {
            if !ordered.contains(&index) {
                ordered.push(index);
            }
        }
    }

    ordered.into_iter().map(|index| images[index].clone()).collect()
}

/// Markdown for a single image reference.
pub fn image_markdown(token: &str, src: &str) -> String {
    format!("![{}]({})", token, src)
}

/// Rewrites every reference whose `src` is one of `sources` to `![token](target)`.
pub fn rewrite_references(document: &str, sources: &[&str], token: &str, target: &str) -> Result<String> {
    rewrite_matching(document, |src| sources.contains(&src), token, target)
}

/// Rewrites every reference whose `src` satisfies `selects` to `![token](target)`.
///
/// All occurrences are replaced in one substitution. Fails if there is
/// something to replace and the replacement could not be parsed back as a
/// reference.
pub fn rewrite_matching<F>(document: &str, selects: F, token: &str, target: &str) -> Result<String>
where
    F: Fn(&str) -> bool,
{
    if !references(document).any(|r| selects(r.src)) {
        return Ok(document.to_string());
    }
    check_reference_parts(token, target)?;

    let rewritten = IMAGE_REFERENCE_REGEX.replace_all(document, |caps: &Captures| {
        let src = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        if selects(src) {
            image_markdown(token, target)
        } else {
            caps[0].to_string()
        }
    });

    Ok(rewritten.into_owned())
}

/// Deletes every `![token](src)` occurrence with exactly this token and src.
pub fn remove_references(document: &str, token: &str, src: &str) -> String {
    IMAGE_REFERENCE_REGEX
        .replace_all(document, |caps: &Captures| {
            let matches = caps.get(1).map(|m| m.as_str()) == Some(token)
                && caps.get(2).map(|m| m.as_str()) == Some(src);
            if matches {
                String::new()
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}

fn check_reference_parts(token: &str, target: &str) -> Result<()> {
    if token.contains(']') || token.contains('\n') {
        return Err(ReconcileError::ContentRewrite(format!(
            "image token {:?} cannot be embedded in a reference",
            token
        )));
    }
    if target.is_empty() || target.contains(')') || target.contains('\n') {
        return Err(ReconcileError::ContentRewrite(format!(
            "image source {:?} cannot be embedded in a reference",
            target
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn img(id: &str, url: &str) -> ImageRef {
        ImageRef::persisted(id, format!("{}.png", id), url)
    }

    #[test]
    fn test_order_follows_first_appearance() {
        let images = vec![img("a", "http://x/a"), img("b", "http://x/b"), img("c", "http://x/c")];
        let doc = "intro ![b](b) then ![a](http://x/a) and ![c](c)";

        let ordered = extract_order(doc, &images);
        let ids: Vec<&str> = ordered.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_repeated_references_are_deduplicated() {
        let images = vec![img("a", "http://x/a")];
        let doc = "![a](a) ![again](a) ![url](http://x/a)";
        assert_eq!(extract_order(doc, &images).len(), 1);
    }

    #[test]
    fn test_unreferenced_images_are_excluded() {
        let images = vec![img("a", "http://x/a"), img("b", "http://x/b")];
        let ordered = extract_order("![a](a)", &images);
        assert_eq!(ordered.len(), 1);
        assert_eq!(ordered[0].id, "a");
    }

    #[test]
    fn test_id_lookup_wins_over_url() {
        // `b`'s id collides with `a`'s url; ids are consulted first.
        let images = vec![img("a", "shared"), img("shared", "http://x/b")];
        let ordered = extract_order("![x](shared)", &images);
        assert_eq!(ordered[0].url, "http://x/b");
    }

    #[test]
    fn test_rewrite_follows_resolution_not_raw_equality() {
        let images = vec![img("shared", "http://x/a"), img("b", "shared")];
        assert_eq!(resolve_source("shared", &images), Some(0));
        assert_eq!(resolve_source("b", &images), Some(1));
        assert_eq!(resolve_source("http://x/a", &images), Some(0));
        assert_eq!(resolve_source("missing", &images), None);

        let doc = "![B](b) ![A](shared)";
        let out = rewrite_matching(doc, |src| resolve_source(src, &images) == Some(1), "t", "http://tmp/t").unwrap();
        assert_eq!(out, "![t](http://tmp/t) ![A](shared)");
    }

    #[test]
    fn test_malformed_references_are_ignored() {
        let images = vec![img("a", "http://x/a")];
        assert!(extract_order("![a(a) ![a]a) ![a](", &images).is_empty());
        assert_eq!(references("![]() ![x]()").count(), 0);
    }

    #[test]
    fn test_rewrite_replaces_every_occurrence() {
        let doc = "![foo](id1) text ![bar](id1) ![keep](other)";
        let out = rewrite_references(doc, &["id1"], "7-problem-1.jpg", "http://cdn/7-problem-1.jpg").unwrap();
        assert_eq!(
            out,
            "![7-problem-1.jpg](http://cdn/7-problem-1.jpg) text ![7-problem-1.jpg](http://cdn/7-problem-1.jpg) ![keep](other)"
        );
    }

    #[test]
    fn test_rewrite_does_not_expand_dollar_signs() {
        let out = rewrite_references("![a](a)", &["a"], "cost$1", "http://x/$0").unwrap();
        assert_eq!(out, "![cost$1](http://x/$0)");
    }

    #[test]
    fn test_rewrite_rejects_unembeddable_token() {
        let err = rewrite_references("![a](a)", &["a"], "bad]name", "http://x").unwrap_err();
        assert!(matches!(err, ReconcileError::ContentRewrite(_)));

        let err = rewrite_references("![a](a)", &["a"], "ok", "http://x/(1)").unwrap_err();
        assert!(matches!(err, ReconcileError::ContentRewrite(_)));

        // Nothing to rewrite, nothing to reject
        let out = rewrite_references("no images", &["a"], "bad]name", "http://x").unwrap();
        assert_eq!(out, "no images");
    }

    #[test]
    fn test_remove_references() {
        let doc = "a ![x.png](x.png)\nb ![y.png](x.png) ![x.png](x.png)";
        assert_eq!(remove_references(doc, "x.png", "x.png"), "a \nb ![y.png](x.png) ");
    }
}
