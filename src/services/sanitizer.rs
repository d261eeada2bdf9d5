//! HTML sanitizer
//!
//! Every piece of user-authored HTML passes through [`sanitize`] before it is
//! rendered. Two stages run in order:
//!
//! 1. [`clean_markup`] reshapes the document with an ammonia allow-list:
//!    unknown tags are unwrapped, `script`/`style` are removed with their
//!    contents, comments are dropped, attributes are filtered per tag, and URLs
//!    are limited to `http`, `https` and `mailto`. `data:` values and
//!    scriptable `style` values are dropped.
//! 2. [`enforce_trusted_embeds`] removes every `<iframe>` whose `src` is not an
//!    absolute URL on one of the [`TRUSTED_EMBED_HOSTS`]. Survivors are emitted
//!    empty.
//!
//! Both stages are pure string functions and never fail.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use ammonia::Builder;
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Hosts an `<iframe>` may load from. Matched exactly; subdomains of these
/// are not trusted.
pub const TRUSTED_EMBED_HOSTS: &[&str] = &[
    "www.youtube.com",
    "youtube.com",
    "www.youtube-nocookie.com",
    "player.vimeo.com",
];

const ALLOWED_TAGS: &[&str] = &[
    "h1", "h2", "h3", "h4", "h5", "h6", "p", "br", "hr", "ul", "ol", "li", "strong", "b", "em",
    "i", "u", "s", "blockquote", "pre", "code", "a", "img", "iframe", "table", "thead", "tbody",
    "tfoot", "tr", "th", "td", "caption", "div", "span", "section", "figure", "figcaption",
];

const GENERIC_ATTRIBUTES: &[&str] = &["class", "id", "style"];

const LINK_ATTRIBUTES: &[&str] = &["href", "target", "rel"];

const IMAGE_ATTRIBUTES: &[&str] = &["src", "alt", "width", "height"];

const IFRAME_ATTRIBUTES: &[&str] = &[
    "src",
    "width",
    "height",
    "allow",
    "allowfullscreen",
    "frameborder",
    "scrolling",
    "title",
    "loading",
    "referrerpolicy",
];

const URL_SCHEMES: &[&str] = &["http", "https", "mailto"];

/// Substrings that make a `style` value unsafe once whitespace is removed.
/// Backslashes and comments are included because CSS escapes and comments can
/// spell the others out in pieces.
const UNSAFE_STYLE_MARKERS: &[&str] = &["data:", "javascript:", "expression(", "\\", "/*"];

/// Upper bound on clean passes; see [`sanitize`].
const MAX_PASSES: usize = 3;

// Matches one serialized iframe element. Stage 1 output always quotes
// attribute values with `"` and always closes the element.
static IFRAME_ELEMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<iframe((?:\s+[^\s=>"]+="[^"]*")*)\s*>.*?</iframe>"#)
        .expect("valid regex literal")
});

static SRC_ATTRIBUTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\ssrc="([^"]*)""#).expect("valid regex literal"));

fn squash(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase()
}

fn has_data_scheme(value: &str) -> bool {
    squash(value).starts_with("data:")
}

fn is_unsafe_style(value: &str) -> bool {
    let squashed = squash(value);
    UNSAFE_STYLE_MARKERS.iter().any(|m| squashed.contains(m))
}

fn set(items: &'static [&'static str]) -> HashSet<&'static str> {
    items.iter().copied().collect()
}

fn builder() -> Builder<'static> {
    let mut tag_attributes = HashMap::new();
    tag_attributes.insert("a", set(LINK_ATTRIBUTES));
    tag_attributes.insert("img", set(IMAGE_ATTRIBUTES));
    tag_attributes.insert("iframe", set(IFRAME_ATTRIBUTES));

    let mut builder = Builder::default();
    builder
        .tags(set(ALLOWED_TAGS))
        .clean_content_tags(set(&["script", "style"]))
        .tag_attributes(tag_attributes)
        .generic_attributes(set(GENERIC_ATTRIBUTES))
        .url_schemes(set(URL_SCHEMES))
        // `rel` is author-controlled here; ammonia refuses to manage it too.
        .link_rel(None)
        .strip_comments(true)
        .attribute_filter(|_element, attribute, value| {
            if has_data_scheme(value) {
                return None;
            }
            if attribute == "style" && is_unsafe_style(value) {
                return None;
            }
            Some(Cow::Borrowed(value))
        });
    builder
}

/// Stage 1: allow-list cleaning.
pub fn clean_markup(raw_html: &str) -> String {
    builder().clean(raw_html).to_string()
}

fn decode_attribute(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&nbsp;", "\u{a0}")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Whether `src` is an absolute http(s) URL on a trusted embed host.
pub fn is_trusted_embed(src: &str) -> bool {
    let Ok(url) = Url::parse(src.trim()) else {
        return false;
    };
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }
    match url.host_str() {
        Some(host) => TRUSTED_EMBED_HOSTS.contains(&host),
        None => false,
    }
}

/// Stage 2: drop iframes that do not point at a trusted embed host.
///
/// Expects stage 1 output. Trusted iframes keep their attributes and lose
/// any inner content.
pub fn enforce_trusted_embeds(html: &str) -> String {
    IFRAME_ELEMENT
        .replace_all(html, |caps: &regex::Captures<'_>| {
            let attributes = caps.get(1).map_or("", |m| m.as_str());
            let trusted = SRC_ATTRIBUTE
                .captures(attributes)
                .and_then(|src| src.get(1))
                .map(|src| is_trusted_embed(&decode_attribute(src.as_str())))
                .unwrap_or(false);

            if trusted {
                format!("<iframe{}></iframe>", attributes)
            } else {
                String::new()
            }
        })
        .into_owned()
}

fn sanitize_once(raw_html: &str) -> String {
    enforce_trusted_embeds(&clean_markup(raw_html))
}

/// Sanitize user-authored HTML for rendering.
///
/// The result is a fixed point: `sanitize(sanitize(x)) == sanitize(x)`.
/// Re-parsing mis-nested input can rewrite it once more, so the stages are
/// repeated until the output stops changing.
pub fn sanitize(raw_html: &str) -> String {
    let mut current = sanitize_once(raw_html);
    for _ in 1..MAX_PASSES {
        let next = sanitize_once(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_keeps_allowed_markup() {
        let html = r#"<h2 class="lead">Title</h2><p>Some <strong>bold</strong> and <em>em</em></p>"#;
        assert_eq!(sanitize(html), html);
    }

    #[test]
    fn test_removes_script_with_contents() {
        let out = sanitize("<p>Hi</p><script>alert('x')</script>");
        assert_eq!(out, "<p>Hi</p>");
    }

    #[test]
    fn test_removes_style_element_with_contents() {
        let out = sanitize("<style>body{display:none}</style><p>ok</p>");
        assert_eq!(out, "<p>ok</p>");
    }

    #[test]
    fn test_unwraps_disallowed_tags() {
        let out = sanitize("<article><p>kept</p></article>");
        assert_eq!(out, "<p>kept</p>");
    }

    #[test]
    fn test_strips_event_handlers() {
        let out = sanitize(r#"<img src="https://cdn.example.com/a.png" onerror="alert(1)">"#);
        assert!(out.contains("https://cdn.example.com/a.png"));
        assert!(!out.contains("onerror"));
    }

    #[test]
    fn test_strips_comments() {
        assert_eq!(sanitize("<p>a<!-- secret --></p>"), "<p>a</p>");
    }

    #[test]
    fn test_drops_javascript_links() {
        let out = sanitize(r#"<a href="javascript:alert(1)">x</a>"#);
        assert!(!out.to_lowercase().contains("javascript"));
        assert!(out.contains(">x</a>"));
    }

    #[test]
    fn test_drops_data_urls() {
        let out = clean_markup(r#"<img src="  DATA:image/png;base64,AAAA" alt="x">"#);
        assert!(!out.to_lowercase().contains("data:"));
        assert!(out.contains(r#"alt="x""#));
    }

    #[test]
    fn test_drops_unsafe_style_values() {
        for style in [
            "background:url(javascript:alert(1))",
            "width: expression(alert(1))",
            "background-image: url( data:image/png;base64,AA )",
            r"background:url(\6a avascript:x)",
        ] {
            let out = clean_markup(&format!(r#"<p style="{}">x</p>"#, style));
            assert_eq!(out, "<p>x</p>", "style {:?} should be dropped", style);
        }

        let out = clean_markup(r#"<p style="color: red">x</p>"#);
        assert_eq!(out, r#"<p style="color: red">x</p>"#);
    }

    #[test]
    fn test_link_rel_is_preserved() {
        let out = sanitize(r#"<a href="https://example.com" rel="nofollow" target="_blank">x</a>"#);
        assert!(out.contains(r#"rel="nofollow""#));
        assert!(out.contains(r#"target="_blank""#));
    }

    #[test]
    fn test_trusted_embed_survives() {
        let html = r#"<iframe src="https://www.youtube.com/embed/abc123" width="560" height="315" allowfullscreen=""></iframe>"#;
        let out = sanitize(html);
        assert!(out.contains(r#"src="https://www.youtube.com/embed/abc123""#));
        assert!(out.contains(r#"width="560""#));
        assert!(out.ends_with("></iframe>"));
    }

    #[test]
    fn test_trusted_embed_with_query_string() {
        let html = r#"<iframe src="https://player.vimeo.com/video/1?h=ab&amp;title=0"></iframe>"#;
        let out = sanitize(html);
        assert!(out.contains("player.vimeo.com/video/1"));
    }

    #[test]
    fn test_untrusted_embed_removed() {
        for src in [
            "https://evil.example.com/embed",
            "https://youtube.com.evil.com/embed/x",
            "https://notyoutube.com/embed/x",
            "https://vimeo.com/123",
            "//www.youtube.com/embed/x",
            "/embed/x",
        ] {
            let out = sanitize(&format!(r#"<p>a</p><iframe src="{}"></iframe><p>b</p>"#, src));
            assert_eq!(out, "<p>a</p><p>b</p>", "iframe from {:?} should be removed", src);
        }
    }

    #[test]
    fn test_iframe_without_src_removed() {
        assert_eq!(sanitize(r#"<iframe width="1"></iframe>"#), "");
    }

    #[test]
    fn test_iframe_fallback_content_dropped() {
        let html = r#"<iframe src="https://www.youtube.com/embed/x"><script>alert(1)</script></iframe>"#;
        let out = sanitize(html);
        assert_eq!(out, r#"<iframe src="https://www.youtube.com/embed/x"></iframe>"#);
    }

    #[test]
    fn test_is_trusted_embed() {
        assert!(is_trusted_embed("https://www.youtube.com/embed/abc"));
        assert!(is_trusted_embed("https://youtube.com/embed/abc"));
        assert!(is_trusted_embed("https://www.youtube-nocookie.com/embed/abc"));
        assert!(is_trusted_embed("https://player.vimeo.com/video/1"));

        assert!(!is_trusted_embed("https://m.youtube.com/embed/abc"));
        assert!(!is_trusted_embed("javascript:alert(1)"));
        assert!(!is_trusted_embed("https://www.youtube.com@evil.com/"));
        assert!(!is_trusted_embed("not a url"));
    }

    #[test]
    fn test_stage_two_alone() {
        let html = r#"<p>x</p><iframe src="https://evil.com"></iframe>"#;
        assert_eq!(enforce_trusted_embeds(html), "<p>x</p>");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(sanitize(""), "");
    }

    fn fragment() -> impl Strategy<Value = &'static str> {
        prop::sample::select(vec![
            "<p>",
            "</p>",
            "<b>",
            "</b>",
            "<div class=\"x\">",
            "</div>",
            "<a href=\"https://example.com\">",
            "<a href=\"javascript:alert(1)\">",
            "</a>",
            "<script>alert(1)</script>",
            "<script>",
            "<style>p{}</style>",
            "<img src=x onerror=alert(1)>",
            "<img src=\"data:image/png;base64,AAAA\">",
            "<iframe src=\"https://www.youtube.com/embed/x\"></iframe>",
            "<iframe src=\"https://evil.com/x\"></iframe>",
            "<iframe src=\"https://player.vimeo.com/v/1\">",
            "<table><tr><td>",
            "</td></tr></table>",
            "<ul><li>",
            "</li></ul>",
            "<!-- c -->",
            "<span style=\"color:red\">",
            "<span onclick=\"x()\">",
            "</span>",
            "text",
            " & ",
            "<",
            ">",
            "\"",
        ])
    }

    fn markup() -> impl Strategy<Value = String> {
        prop::collection::vec(fragment(), 0..24).prop_map(|parts| parts.concat())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        #[test]
        fn prop_sanitize_is_idempotent(input in markup()) {
            let once = sanitize(&input);
            prop_assert_eq!(sanitize(&once), once);
        }

        #[test]
        fn prop_no_script_or_handlers(input in markup()) {
            let out = sanitize(&input).to_lowercase();
            prop_assert!(!out.contains("<script"));
            prop_assert!(!out.contains("onerror="));
            prop_assert!(!out.contains("onclick="));
            prop_assert!(!out.contains("javascript:"));
        }

        #[test]
        fn prop_only_trusted_iframes(input in markup()) {
            let out = sanitize(&input);
            for caps in IFRAME_ELEMENT.captures_iter(&out) {
                let attrs = caps.get(1).map_or("", |m| m.as_str());
                let src = SRC_ATTRIBUTE
                    .captures(attrs)
                    .and_then(|c| c.get(1))
                    .map(|m| decode_attribute(m.as_str()));
                prop_assert!(src.map(|s| is_trusted_embed(&s)).unwrap_or(false));
            }
        }

        #[test]
        fn prop_arbitrary_text_never_panics(input in ".{0,200}") {
            let _ = sanitize(&input);
        }
    }
}
