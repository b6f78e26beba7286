//! Path resolution for component fragments.
//!
//! Placeholders name their fragment in several historical styles; all of
//! them resolve through `resolve_component_url`. Links inside a fragment are
//! written relative to the site root and are rewritten for the depth of the
//! page that includes the fragment by `rewrite_href`.

use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Directory all component fragments live in
pub const COMPONENT_ROOT: &str = "src/components/";

static HREF_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"href="([^"]*)"|href='([^']*)'"#).expect("valid href regex")
});

static URL_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*:").expect("valid scheme regex"));

/// Resolve a `data-component` value to an absolute `/src/components/…` URL
///
/// Accepts `header`, `header.html`, `components/header.html`,
/// `./components/header.html`, `../../components/header.html`,
/// `/components/header.html` and `src/components/header.html`.
pub fn resolve_component_url(attribute: &str) -> String {
    let mut path = attribute.trim();
    loop {
        if let Some(rest) = path.strip_prefix("./") {
            path = rest;
        } else if let Some(rest) = path.strip_prefix("../") {
            path = rest;
        } else if let Some(rest) = path.strip_prefix('/') {
            path = rest;
        } else {
            break;
        }
    }

    let mut url = if path.starts_with(COMPONENT_ROOT) {
        format!("/{}", path)
    } else if let Some(rest) = path.strip_prefix("components/") {
        format!("/{}{}", COMPONENT_ROOT, rest)
    } else {
        format!("/{}{}", COMPONENT_ROOT, path)
    };

    let file = url.rsplit('/').next().unwrap_or_default();
    if !file.contains('.') {
        url.push_str(".html");
    }
    url
}

/// Component name from its resolved URL (`/src/components/header.html` → `header`)
pub fn component_name(url: &str) -> &str {
    let file = url.rsplit('/').next().unwrap_or(url);
    file.split('.').next().unwrap_or(file)
}

/// Number of directories between the site root and a page
///
/// `/index.html` is 0, `/pages/forum.html` is 1, `/pages/forum/thread.html` is 2.
pub fn page_depth(page_path: &str) -> usize {
    let end = page_path.find(|c: char| c == '?' || c == '#').unwrap_or(page_path.len());
    page_path[..end]
        .trim_start_matches('/')
        .split('/')
        .count()
        .saturating_sub(1)
}

/// True for links that must not be rewritten
pub fn is_external(href: &str) -> bool {
    href.is_empty() || href.starts_with('/') || href.starts_with('#') || URL_SCHEME.is_match(href)
}

/// Collapse `.` and `..` segments; `..` never climbs above the root
fn normalize_segments<'a>(segments: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut out: Vec<&str> = Vec::new();
    for segment in segments {
        match segment {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// Rewrite a fragment link for a page `page_depth` levels below the root
///
/// `fragment_base` is the directory the fragment's links are written against,
/// relative to the site root (`""` for the root itself).
pub fn rewrite_href(href: &str, page_depth: usize, fragment_base: &str) -> String {
    if is_external(href) {
        return href.to_string();
    }

    let (path, suffix) = match href.find(|c: char| c == '?' || c == '#') {
        Some(i) => href.split_at(i),
        None => (href, ""),
    };
    let trailing_slash = path.ends_with('/');
    let target = normalize_segments(fragment_base.split('/').chain(path.split('/')));

    let mut rewritten = "../".repeat(page_depth);
    rewritten.push_str(&target.join("/"));
    if trailing_slash && !target.is_empty() {
        rewritten.push('/');
    }
    if rewritten.is_empty() {
        rewritten.push_str("./");
    }
    rewritten.push_str(suffix);
    rewritten
}

/// Rewrite every relative `href` in a fragment
pub fn rewrite_links(html: &str, page_depth: usize, fragment_base: &str) -> String {
    HREF_ATTRIBUTE
        .replace_all(html, |caps: &Captures| match (caps.get(1), caps.get(2)) {
            (Some(href), _) => format!("href=\"{}\"", rewrite_href(href.as_str(), page_depth, fragment_base)),
            (None, Some(href)) => format!("href='{}'", rewrite_href(href.as_str(), page_depth, fragment_base)),
            (None, None) => caps[0].to_string(),
        })
        .into_owned()
}

/// Site-absolute path a page-relative link points at, `None` for external links
pub fn absolutize(page_path: &str, href: &str) -> Option<String> {
    if href.starts_with('/') {
        return Some(crate::client::modules::manifest::normalize_route(href));
    }
    if is_external(href) {
        return None;
    }

    let end = href.find(|c: char| c == '?' || c == '#').unwrap_or(href.len());
    let href = &href[..end];
    let page_dir = page_path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
    let segments = normalize_segments(page_dir.split('/').chain(href.split('/')));

    let mut path = format!("/{}", segments.join("/"));
    if href.ends_with('/') || href.is_empty() {
        if !path.ends_with('/') {
            path.push('/');
        }
        path.push_str("index.html");
    }
    Some(path)
}
