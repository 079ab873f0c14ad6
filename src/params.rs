//! Parameter codec: flat query strings to typed card parameters and back.
//!
//! Decoding is total. Every recognized value is trimmed, values that are empty
//! after trimming count as absent, and missing or unknown values fall back to
//! the documented defaults. Unrecognized keys are ignored. When a key is given
//! more than once the first occurrence wins.
//!
//! Encoding is the inverse and keeps URLs minimal, with one asymmetry that is
//! part of the contract: the post card drops `author` when it equals
//! [`DEFAULT_AUTHOR`], while the themed card always emits `theme` and
//! `fontSize`, even at their defaults. For any query `q`,
//! `decode(encode(decode(q))) == decode(q)`.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::theme::{FontSize, Theme};
use crate::Result;

/// Title used when none is supplied
pub const DEFAULT_TITLE: &str = "Untitled";
/// Author shown on the post card when none is supplied
pub const DEFAULT_AUTHOR: &str = "Juwoong";
/// Path of the image endpoint, resolved against the base when encoding
pub const ENDPOINT_PATH: &str = "/api/og";

/// Which card a deployment serves.
///
/// The two cards have separate parameter schemas and are never mixed behind
/// one endpoint; the mode picks the schema used to decode a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TemplateMode {
    /// Post metadata card: title, date, location, tags, author
    #[default]
    Post,
    /// Themed title card: title, subtitle, author, theme, font size
    Themed,
}

/// Ordered, string-keyed query parameters as received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Parse an `application/x-www-form-urlencoded` query, with or without a
    /// leading `?`.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self {
            pairs: url::form_urlencoded::parse(query.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
        }
    }

    /// First value for `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Trimmed value for `key`, `None` when absent or blank.
    fn present(&self, key: &str) -> Option<String> {
        self.get(key).and_then(non_blank)
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn normalize_opt(value: Option<String>) -> Option<String> {
    value.as_deref().and_then(non_blank)
}

/// Split a comma-separated tag list, trimming each tag and dropping empties.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// Parameters of the post metadata card
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostParams {
    pub title: String,
    pub date: Option<String>,
    /// Ordered tags; empty means no tags line
    pub tags: Vec<String>,
    pub location: Option<String>,
    pub author: String,
}

impl Default for PostParams {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            date: None,
            tags: Vec::new(),
            location: None,
            author: DEFAULT_AUTHOR.to_string(),
        }
    }
}

impl PostParams {
    pub fn decode(query: &QueryParams) -> Self {
        Self {
            title: query
                .present("title")
                .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            date: query.present("date"),
            tags: query.get("tags").map(parse_tags).unwrap_or_default(),
            location: query.present("location"),
            author: query
                .present("author")
                .unwrap_or_else(|| DEFAULT_AUTHOR.to_string()),
        }
    }

    /// Apply the same default-filling `decode` applies.
    pub fn normalize(self) -> Self {
        Self {
            title: non_blank(&self.title).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            date: normalize_opt(self.date),
            tags: self
                .tags
                .iter()
                .flat_map(|t| parse_tags(t))
                .collect(),
            location: normalize_opt(self.location),
            author: non_blank(&self.author).unwrap_or_else(|| DEFAULT_AUTHOR.to_string()),
        }
    }

    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("title", self.title.clone())];
        if let Some(date) = &self.date {
            pairs.push(("date", date.clone()));
        }
        if !self.tags.is_empty() {
            pairs.push(("tags", self.tags.join(",")));
        }
        if let Some(location) = &self.location {
            pairs.push(("location", location.clone()));
        }
        if self.author != DEFAULT_AUTHOR {
            pairs.push(("author", self.author.clone()));
        }
        pairs
    }
}

/// Parameters of the themed title card
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThemedParams {
    pub title: String,
    pub theme: Theme,
    pub font_size: FontSize,
    pub subtitle: Option<String>,
    pub author: Option<String>,
}

impl Default for ThemedParams {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            theme: Theme::default(),
            font_size: FontSize::default(),
            subtitle: None,
            author: None,
        }
    }
}

impl ThemedParams {
    pub fn decode(query: &QueryParams) -> Self {
        let theme = match query.get("theme") {
            None => Theme::default(),
            Some(raw) => Theme::from_key(raw.trim()).unwrap_or_else(|| {
                log::warn!("unknown theme {:?}, using {}", raw, Theme::default().as_str());
                Theme::default()
            }),
        };
        let font_size = match query.get("fontSize") {
            None => FontSize::default(),
            Some(raw) => FontSize::from_key(raw.trim()).unwrap_or_else(|| {
                log::warn!("unknown fontSize {:?}, using {}", raw, FontSize::default().as_str());
                FontSize::default()
            }),
        };

        Self {
            title: query
                .present("title")
                .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            theme,
            font_size,
            subtitle: query.present("subtitle"),
            author: query.present("author"),
        }
    }

    pub fn normalize(self) -> Self {
        Self {
            title: non_blank(&self.title).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            theme: self.theme,
            font_size: self.font_size,
            subtitle: normalize_opt(self.subtitle),
            author: normalize_opt(self.author),
        }
    }

    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("title", self.title.clone()),
            ("theme", self.theme.as_str().to_string()),
            ("fontSize", self.font_size.as_str().to_string()),
        ];
        if let Some(subtitle) = &self.subtitle {
            pairs.push(("subtitle", subtitle.clone()));
        }
        if let Some(author) = &self.author {
            pairs.push(("author", author.clone()));
        }
        pairs
    }
}

/// Decoded parameters; the variant selects the template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "template", rename_all = "lowercase")]
pub enum ImageParams {
    Post(PostParams),
    Themed(ThemedParams),
}

impl ImageParams {
    pub fn mode(&self) -> TemplateMode {
        match self {
            ImageParams::Post(_) => TemplateMode::Post,
            ImageParams::Themed(_) => TemplateMode::Themed,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            ImageParams::Post(p) => &p.title,
            ImageParams::Themed(p) => &p.title,
        }
    }

    pub fn normalize(self) -> Self {
        match self {
            ImageParams::Post(p) => ImageParams::Post(p.normalize()),
            ImageParams::Themed(p) => ImageParams::Themed(p.normalize()),
        }
    }

    /// Minimal key/value pairs in emission order.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        match self {
            ImageParams::Post(p) => p.query_pairs(),
            ImageParams::Themed(p) => p.query_pairs(),
        }
    }

    /// Minimal form-urlencoded query string, without a leading `?`.
    pub fn to_query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query_pairs())
            .finish()
    }
}

impl From<PostParams> for ImageParams {
    fn from(p: PostParams) -> Self {
        ImageParams::Post(p)
    }
}

impl From<ThemedParams> for ImageParams {
    fn from(p: ThemedParams) -> Self {
        ImageParams::Themed(p)
    }
}

/// Decode a query with the schema of `mode`. Never fails.
pub fn decode(query: &QueryParams, mode: TemplateMode) -> ImageParams {
    match mode {
        TemplateMode::Post => ImageParams::Post(PostParams::decode(query)),
        TemplateMode::Themed => ImageParams::Themed(ThemedParams::decode(query)),
    }
}

/// Build the shareable image URL for `params` on the host of `base`.
pub fn encode(params: &ImageParams, base: &str) -> Result<Url> {
    encode_at(params, base, ENDPOINT_PATH)
}

/// Like [`encode`], with an explicit endpoint path.
pub fn encode_at(params: &ImageParams, base: &str, endpoint_path: &str) -> Result<Url> {
    let mut url = Url::parse(base)?.join(endpoint_path)?;
    url.query_pairs_mut()
        .clear()
        .extend_pairs(params.query_pairs());
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(q: &str) -> PostParams {
        PostParams::decode(&QueryParams::parse(q))
    }

    fn themed(q: &str) -> ThemedParams {
        ThemedParams::decode(&QueryParams::parse(q))
    }

    #[test]
    fn empty_query_yields_defaults() {
        assert_eq!(post(""), PostParams::default());
        assert_eq!(themed(""), ThemedParams::default());
        assert_eq!(post("").title, "Untitled");
        assert_eq!(post("").author, "Juwoong");
    }

    #[test]
    fn blank_values_count_as_absent() {
        let p = post("title=%20%20&date=&location=+&author=");
        assert_eq!(p, PostParams::default());

        let t = themed("?subtitle=%20&author=");
        assert_eq!(t.subtitle, None);
        assert_eq!(t.author, None);
    }

    #[test]
    fn tags_are_split_trimmed_and_filtered() {
        assert_eq!(post("tags=a,%20b%20,,c").tags, vec!["a", "b", "c"]);
        assert_eq!(post("tags=a, b ,,c").tags, vec!["a", "b", "c"]);
        assert!(post("tags=,,%20,").tags.is_empty());
    }

    #[test]
    fn first_duplicate_wins_and_unknown_keys_ignored() {
        let p = post("title=one&title=two&utm_source=x");
        assert_eq!(p.title, "one");
    }

    #[test]
    fn unknown_enum_values_fall_back() {
        let t = themed("theme=doesnotexist&fontSize=huge");
        assert_eq!(t.theme, Theme::Dark);
        assert_eq!(t.font_size, FontSize::Lg);

        let t = themed("theme=%20blog%20&fontSize=sm");
        assert_eq!(t.theme, Theme::Blog);
        assert_eq!(t.font_size, FontSize::Sm);
    }

    #[test]
    fn post_encoding_omits_default_author() {
        let p = ImageParams::Post(post("title=Hi&author=Juwoong"));
        let url = encode(&p, "https://og.example.com").unwrap();
        assert_eq!(url.as_str(), "https://og.example.com/api/og?title=Hi");

        let p = ImageParams::Post(post("title=Hi&author=Someone"));
        let url = encode(&p, "https://og.example.com").unwrap();
        assert!(url.query_pairs().any(|(k, v)| k == "author" && v == "Someone"));
    }

    #[test]
    fn themed_encoding_keeps_default_enums() {
        let p = ImageParams::Themed(themed("title=Hi"));
        assert_eq!(p.to_query_string(), "title=Hi&theme=dark&fontSize=lg");
    }

    #[test]
    fn encode_replaces_base_path_and_query() {
        let p = ImageParams::Post(PostParams::default());
        let url = encode(&p, "http://localhost:3000/editor?x=1").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/api/og?title=Untitled");

        let url = encode_at(&p, "http://localhost:3000", "/og.png").unwrap();
        assert_eq!(url.path(), "/og.png");
    }

    #[test]
    fn encode_rejects_unparseable_base() {
        let p = ImageParams::Post(PostParams::default());
        assert!(matches!(encode(&p, "not a url"), Err(crate::Error::UrlError(_))));
    }

    #[test]
    fn spaces_encode_as_plus() {
        let p = ImageParams::Post(post("title=Hello+World&tags=rust,web+dev"));
        assert_eq!(p.to_query_string(), "title=Hello+World&tags=rust%2Cweb+dev");
    }

    #[test]
    fn normalize_matches_decode_defaults() {
        let raw = PostParams {
            title: "  ".into(),
            date: Some(" 2025-01-01 ".into()),
            tags: vec![" a ".into(), "".into(), "b,c".into()],
            location: Some("".into()),
            author: " ".into(),
        };
        let n = raw.normalize();
        assert_eq!(n.title, "Untitled");
        assert_eq!(n.date.as_deref(), Some("2025-01-01"));
        assert_eq!(n.tags, vec!["a", "b", "c"]);
        assert_eq!(n.location, None);
        assert_eq!(n.author, "Juwoong");
    }
}
