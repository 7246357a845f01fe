//! Path pattern parsing and matching.
//!
//! Patterns are `/`-separated; a segment is either literal text, a `{name}`
//! placeholder that binds exactly one segment, or a trailing `*name`
//! catch-all that binds the rest of the path. Empty segments are ignored on
//! both sides, so `/items/` and `/items` are the same path.

use std::fmt;

use crate::error::RouteError;
use crate::params::Params;

/// One parsed segment of a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal text that must match exactly.
    Literal(String),
    /// `{name}` placeholder.
    Param(String),
    /// `*name` catch-all, only valid as the last segment.
    CatchAll(String),
}

/// A compiled path pattern such as `/test/{id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Parses a pattern.
    ///
    /// ```rust
    /// use switchyard_router::PathPattern;
    ///
    /// let pattern = PathPattern::parse("/test/{id}").unwrap();
    /// let params = pattern.matches("/test/42").unwrap();
    /// assert_eq!(params.get("id"), Some("42"));
    /// ```
    pub fn parse(pattern: &str) -> Result<Self, RouteError> {
        let raw: Vec<&str> = split_segments(pattern).collect();
        let mut segments = Vec::with_capacity(raw.len());

        for (index, text) in raw.iter().enumerate() {
            let segment = parse_segment(pattern, text)?;
            match &segment {
                Segment::CatchAll(_) if index + 1 != raw.len() => {
                    return Err(RouteError::CatchAllNotLast {
                        pattern: pattern.to_string(),
                    });
                }
                Segment::Param(name) | Segment::CatchAll(name) => {
                    let seen = segments.iter().any(|s| {
                        matches!(s, Segment::Param(n) | Segment::CatchAll(n) if n == name)
                    });
                    if seen {
                        return Err(RouteError::DuplicatePlaceholder {
                            pattern: pattern.to_string(),
                            name: name.clone(),
                        });
                    }
                }
                Segment::Literal(_) => {}
            }
            segments.push(segment);
        }

        Ok(Self {
            raw: pattern.to_string(),
            segments,
        })
    }

    /// The pattern as declared.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Parsed segments.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Names of every placeholder, in order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(n) | Segment::CatchAll(n) => Some(n.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Matches a request path, returning the bound parameters.
    ///
    /// Segment values are percent-decoded before binding; a segment that does
    /// not decode to UTF-8 is bound verbatim.
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<Params> {
        let parts: Vec<&str> = split_segments(path).collect();
        let mut params = Params::with_capacity(self.segments.len());

        for (index, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Literal(literal) => {
                    let part = parts.get(index)?;
                    if decode(part) != *literal {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let part = parts.get(index)?;
                    params.push(name.clone(), decode(part));
                }
                Segment::CatchAll(name) => {
                    let rest = parts.get(index..).filter(|rest| !rest.is_empty())?;
                    let value = rest.iter().map(|p| decode(p)).collect::<Vec<_>>().join("/");
                    params.push(name.clone(), value);
                    return Some(params);
                }
            }
        }

        (parts.len() == self.segments.len()).then_some(params)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn parse_segment(pattern: &str, text: &str) -> Result<Segment, RouteError> {
    if let Some(name) = text.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
        if name.is_empty() {
            return Err(RouteError::EmptyPlaceholder {
                pattern: pattern.to_string(),
            });
        }
        if name.contains(['{', '}']) {
            return Err(malformed(pattern, text));
        }
        return Ok(Segment::Param(name.to_string()));
    }
    if text.contains(['{', '}']) {
        return Err(malformed(pattern, text));
    }
    if let Some(name) = text.strip_prefix('*') {
        if name.is_empty() {
            return Err(RouteError::EmptyPlaceholder {
                pattern: pattern.to_string(),
            });
        }
        return Ok(Segment::CatchAll(name.to_string()));
    }
    Ok(Segment::Literal(text.to_string()))
}

fn malformed(pattern: &str, segment: &str) -> RouteError {
    RouteError::MalformedSegment {
        pattern: pattern.to_string(),
        segment: segment.to_string(),
    }
}

fn decode(part: &str) -> String {
    urlencoding::decode(part).map_or_else(|_| part.to_string(), |s| s.into_owned())
}
