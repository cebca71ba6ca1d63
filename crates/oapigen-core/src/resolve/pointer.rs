use std::cmp::Ordering;
use std::fmt;

use percent_encoding::percent_decode_str;

/// A location inside a document: the document's URL (empty for the root
/// document, otherwise relative to the root) plus a JSON pointer fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Pointer {
    url: String,
    fragment: String,
}

impl Pointer {
    pub fn new(url: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            fragment: fragment.into(),
        }
    }

    /// The root of the root document (`#`).
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a canonical pointer such as `other.yaml#/definitions/Pet`.
    pub fn parse(canonical: &str) -> Self {
        match canonical.split_once('#') {
            Some((url, fragment)) => Self::new(url, fragment),
            None => Self::new(canonical, ""),
        }
    }

    /// Build a root-document pointer from raw (unescaped) segments.
    pub fn from_segments<'a>(segments: impl IntoIterator<Item = &'a str>) -> Self {
        segments
            .into_iter()
            .fold(Self::root(), |pointer, segment| pointer.child(segment))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// Append a raw segment, escaping `~` and `/`.
    pub fn child(&self, segment: &str) -> Self {
        Self {
            url: self.url.clone(),
            fragment: format!("{}/{}", self.fragment, escape(segment)),
        }
    }

    pub fn child_segments(&self, segments: &[String]) -> Self {
        segments
            .iter()
            .fold(self.clone(), |pointer, segment| pointer.child(segment))
    }

    pub fn index(&self, index: usize) -> Self {
        self.child(&index.to_string())
    }

    pub fn parent(&self) -> Option<Self> {
        let (parent, _) = self.fragment.rsplit_once('/')?;
        Some(Self::new(self.url.clone(), parent))
    }

    /// Escaped fragment segments.
    pub fn raw_segments(&self) -> Vec<&str> {
        self.fragment
            .split('/')
            .skip(1)
            .collect()
    }

    /// Unescaped fragment segments.
    pub fn segments(&self) -> Vec<String> {
        self.raw_segments().into_iter().map(unescape).collect()
    }

    /// True when `self` is `other` or lies beneath it.
    pub fn starts_with(&self, other: &Pointer) -> bool {
        self.url == other.url
            && (self.fragment == other.fragment
                || self
                    .fragment
                    .strip_prefix(&other.fragment)
                    .is_some_and(|rest| rest.starts_with('/')))
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.url, self.fragment)
    }
}

impl Ord for Pointer {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_string().cmp(&other.to_string())
    }
}

impl PartialOrd for Pointer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// JSON pointer segment escaping.
pub fn escape(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

pub fn unescape(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Decode `%XX` sequences in a URI fragment. Malformed sequences are kept
/// verbatim.
pub fn percent_decode(fragment: &str) -> String {
    percent_decode_str(fragment).decode_utf8_lossy().into_owned()
}
