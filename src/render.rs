//! Content rendering for chat replies.
//!
//! Reply text is producer-controlled and may contain arbitrary markup. Rendering
//! splits it into escaped text and `{#image#<url>}` image references, then
//! assembles a fragment that is safe to insert into a document.

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;
use url::Url;

/// How much an image marker's payload is trusted before it lands in `src`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImagePolicy {
    /// Emit any `}`-free payload verbatim.
    Verbatim,
    /// Only emit absolute `http`, `https` or `data` URLs that cannot break out
    /// of a quoted attribute. Anything else stays literal text.
    #[default]
    AbsoluteUrl,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Already HTML-escaped text with `<br>` line breaks.
    Text(String),
    /// Image source, unescaped.
    Image(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderedContent {
    segments: Vec<Segment>,
}

impl RenderedContent {
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn images(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Image(src) => Some(src.as_str()),
            Segment::Text(_) => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn to_html(&self) -> String {
        let mut html = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => html.push_str(text),
                Segment::Image(src) => html.push_str(&format!(
                    r#"<img class="message-image" src="{src}" alt="image" loading="lazy" data-state="loading">"#
                )),
            }
        }
        html
    }

    /// Terminal-friendly rendering: text is unescaped again and images are
    /// shown as `[image: <url>]`.
    pub fn to_plain_text(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(&unescape_html(&text.replace("<br>", "\n"))),
                Segment::Image(src) => out.push_str(&format!("[image: {src}]")),
            }
        }
        out
    }
}

fn image_marker() -> Option<&'static Regex> {
    static MARKER: OnceLock<Option<Regex>> = OnceLock::new();
    MARKER
        .get_or_init(|| Regex::new(r"\{#image#([^}]+)\}").ok())
        .as_ref()
}

/// Render with the default [`ImagePolicy`].
pub fn render_content(input: &str) -> RenderedContent {
    render_content_with(input, ImagePolicy::default())
}

pub fn render_content_with(input: &str, policy: ImagePolicy) -> RenderedContent {
    let mut segments = Vec::new();
    // Raw text accumulated since the last emitted image; rejected markers fold into it.
    let mut pending = String::new();
    let mut last_end = 0;

    let matches = image_marker()
        .map(|re| re.captures_iter(input).collect::<Vec<_>>())
        .unwrap_or_default();

    for captures in matches {
        let (Some(whole), Some(payload)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        pending.push_str(&input[last_end..whole.start()]);
        last_end = whole.end();

        if image_allowed(payload.as_str(), policy) {
            if !pending.is_empty() {
                segments.push(Segment::Text(escape_text(&pending)));
                pending.clear();
            }
            segments.push(Segment::Image(payload.as_str().to_string()));
        } else {
            debug!("Rejected image marker payload: {}", payload.as_str());
            pending.push_str(whole.as_str());
        }
    }

    pending.push_str(&input[last_end..]);
    if !pending.is_empty() {
        segments.push(Segment::Text(escape_text(&pending)));
    }

    RenderedContent { segments }
}

fn image_allowed(payload: &str, policy: ImagePolicy) -> bool {
    match policy {
        ImagePolicy::Verbatim => true,
        ImagePolicy::AbsoluteUrl => {
            if payload
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, '"' | '<' | '>'))
            {
                return false;
            }
            Url::parse(payload)
                .map(|url| matches!(url.scheme(), "http" | "https" | "data"))
                .unwrap_or(false)
        }
    }
}

fn escape_text(text: &str) -> String {
    escape_html(text).replace("\r\n", "<br>").replace('\n', "<br>")
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn unescape_html(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
