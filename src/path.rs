//! Attribute path parsing
//!
//! Paths address attributes inside nested items. Segments are separated by dots;
//! list elements are addressed with a bracketed index, either as a segment of
//! its own (`cards.[0].last4`) or attached to the field (`cards[0].last4`).

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

static INDEX_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[(\d+)\]$").expect("index segment pattern"));

static FIELD_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^\[\]#:]+)((?:\[\d+\])*)$").expect("field segment pattern")
});

static TRAILING_INDEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(\d+)\]").expect("trailing index pattern"));

/// One step of a [`Path`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Named attribute of a map (or of the item root)
    Field(String),
    /// Element of a list
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Field(name) => f.write_str(name),
            PathSegment::Index(i) => write!(f, "[{}]", i),
        }
    }
}

/// Ordered sequence of segments addressing a (possibly nested) attribute
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path {
    segments: Vec<PathSegment>,
}

impl Path {
    /// The empty path, addressing the item root
    pub fn root() -> Self {
        Self::default()
    }

    /// Single-segment path for a top-level attribute
    pub fn field(name: impl Into<String>) -> Self {
        Self {
            segments: vec![PathSegment::Field(name.into())],
        }
    }

    /// Parse a dotted path such as `address.city.name` or `cards.[0].last4`
    pub fn parse(input: &str) -> Result<Self> {
        if input.trim().is_empty() {
            return Err(Error::InvalidPath("path cannot be empty".to_string()));
        }

        let mut segments = Vec::new();
        for part in input.split('.') {
            if part.is_empty() {
                return Err(Error::InvalidPath(format!(
                    "empty segment in path '{}'",
                    input
                )));
            }

            if let Some(caps) = INDEX_SEGMENT.captures(part) {
                segments.push(PathSegment::Index(parse_index(&caps[1], input)?));
                continue;
            }

            let Some(caps) = FIELD_SEGMENT.captures(part) else {
                return Err(Error::InvalidPath(format!(
                    "segment '{}' in path '{}' is not a field name or list index",
                    part, input
                )));
            };

            segments.push(PathSegment::Field(caps[1].to_string()));
            for index in TRAILING_INDEX.captures_iter(&caps[2]) {
                segments.push(PathSegment::Index(parse_index(&index[1], input)?));
            }
        }

        if !matches!(segments.first(), Some(PathSegment::Field(_))) {
            return Err(Error::InvalidPath(format!(
                "path '{}' must start with a field name",
                input
            )));
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Name of the top-level attribute this path starts from
    pub fn first_field(&self) -> Option<&str> {
        match self.segments.first() {
            Some(PathSegment::Field(name)) => Some(name),
            _ => None,
        }
    }

    /// New path extended by a field segment
    pub fn join_field(&self, name: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Field(name.into()));
        Self { segments }
    }

    /// New path extended by an index segment
    pub fn join_index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Index(index));
        Self { segments }
    }

    /// Prefix made of the first `len` segments
    pub fn prefix(&self, len: usize) -> Self {
        Self {
            segments: self.segments[..len.min(self.segments.len())].to_vec(),
        }
    }
}

fn parse_index(digits: &str, input: &str) -> Result<usize> {
    digits
        .parse::<usize>()
        .map_err(|_| Error::InvalidPath(format!("list index out of range in '{}'", input)))
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("<root>");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Field(name) if i > 0 => write!(f, ".{}", name)?,
                other => write!(f, "{}", other)?,
            }
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Path::parse(s)
    }
}

/// Anything that can name an attribute path
pub trait IntoPath {
    fn into_path(self) -> Result<Path>;
}

impl IntoPath for Path {
    fn into_path(self) -> Result<Path> {
        Ok(self)
    }
}

impl IntoPath for &Path {
    fn into_path(self) -> Result<Path> {
        Ok(self.clone())
    }
}

impl IntoPath for &str {
    fn into_path(self) -> Result<Path> {
        Path::parse(self)
    }
}

impl IntoPath for String {
    fn into_path(self) -> Result<Path> {
        Path::parse(&self)
    }
}

impl IntoPath for &String {
    fn into_path(self) -> Result<Path> {
        Path::parse(self)
    }
}
