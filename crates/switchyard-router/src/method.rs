//! Route methods.
//!
//! A route is reachable through a set of methods. Besides the HTTP methods,
//! the pseudo-method `socket` marks a route as reachable only from socket
//! connections.

use std::fmt;
use std::str::FromStr;

use http::Method;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use smallvec::SmallVec;

use crate::error::RouteError;

/// The method an inbound call was made with, or that a route accepts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RouteMethod {
    /// An HTTP method.
    Http(Method),
    /// A message received over a socket connection.
    Socket,
}

impl RouteMethod {
    /// Name used in route declarations and controller tables: lowercase for
    /// the standard HTTP methods and `socket`.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Http(method) => method.as_str().to_ascii_lowercase(),
            Self::Socket => "socket".to_string(),
        }
    }

    /// Returns true for [`RouteMethod::Socket`].
    #[must_use]
    pub const fn is_socket(&self) -> bool {
        matches!(self, Self::Socket)
    }
}

impl From<Method> for RouteMethod {
    fn from(method: Method) -> Self {
        Self::Http(method)
    }
}

impl FromStr for RouteMethod {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("socket") {
            return Ok(Self::Socket);
        }
        if trimmed.is_empty() {
            return Err(RouteError::InvalidMethod(s.to_string()));
        }
        Method::from_bytes(trimmed.to_ascii_uppercase().as_bytes())
            .map(Self::Http)
            .map_err(|_| RouteError::InvalidMethod(s.to_string()))
    }
}

impl fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl Serialize for RouteMethod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name())
    }
}

impl<'de> Deserialize<'de> for RouteMethod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// The methods a route accepts. Declared as one name or a list of names.
///
/// ```rust
/// use switchyard_router::{MethodSet, RouteMethod};
///
/// let set = MethodSet::from_iter([RouteMethod::from(http::Method::GET)]);
/// assert!(set.contains(&RouteMethod::from(http::Method::GET)));
/// assert!(!set.contains(&RouteMethod::Socket));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MethodSet {
    methods: SmallVec<[RouteMethod; 2]>,
}

impl MethodSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a method unless already present.
    #[must_use]
    pub fn with(mut self, method: impl Into<RouteMethod>) -> Self {
        self.insert(method.into());
        self
    }

    /// Adds a method unless already present.
    pub fn insert(&mut self, method: RouteMethod) {
        if !self.methods.contains(&method) {
            self.methods.push(method);
        }
    }

    /// Returns true if `method` is accepted.
    #[must_use]
    pub fn contains(&self, method: &RouteMethod) -> bool {
        self.methods.contains(method)
    }

    /// Returns true if no method is accepted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Iterates in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &RouteMethod> {
        self.methods.iter()
    }
}

impl FromIterator<RouteMethod> for MethodSet {
    fn from_iter<I: IntoIterator<Item = RouteMethod>>(iter: I) -> Self {
        let mut set = Self::new();
        for method in iter {
            set.insert(method);
        }
        set
    }
}

impl From<RouteMethod> for MethodSet {
    fn from(method: RouteMethod) -> Self {
        Self::new().with(method)
    }
}

impl From<Method> for MethodSet {
    fn from(method: Method) -> Self {
        Self::new().with(method)
    }
}

impl FromStr for MethodSet {
    type Err = RouteError;

    /// Parses a single name or a comma-separated list.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(str::parse::<RouteMethod>)
            .collect::<Result<Self, _>>()
    }
}

impl Serialize for MethodSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.methods.as_slice() {
            [single] => single.serialize(serializer),
            many => many.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for MethodSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Declared {
            One(RouteMethod),
            Many(Vec<RouteMethod>),
        }

        Ok(match Declared::deserialize(deserializer)? {
            Declared::One(method) => Self::from(method),
            Declared::Many(methods) => methods.into_iter().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("get".parse::<RouteMethod>().unwrap(), RouteMethod::Http(Method::GET));
        assert_eq!("POST".parse::<RouteMethod>().unwrap(), RouteMethod::Http(Method::POST));
        assert_eq!("Socket".parse::<RouteMethod>().unwrap(), RouteMethod::Socket);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<RouteMethod>().is_err());
        assert!("ge t".parse::<RouteMethod>().is_err());
    }

    #[test]
    fn test_name_is_lowercase() {
        assert_eq!(RouteMethod::Http(Method::DELETE).name(), "delete");
        assert_eq!(RouteMethod::Socket.to_string(), "socket");
    }

    #[test]
    fn test_set_deduplicates() {
        let set: MethodSet = "get,post,get".parse().unwrap();
        assert_eq!(set.iter().count(), 2);
    }

    #[test]
    fn test_set_deserializes_string_or_list() {
        let one: MethodSet = serde_json::from_str("\"get\"").unwrap();
        assert!(one.contains(&RouteMethod::Http(Method::GET)));

        let many: MethodSet = serde_json::from_str("[\"get\", \"socket\"]").unwrap();
        assert!(many.contains(&RouteMethod::Http(Method::GET)));
        assert!(many.contains(&RouteMethod::Socket));

        assert!(serde_json::from_str::<MethodSet>("\"not a method\"").is_err());
    }

    #[test]
    fn test_set_serializes_single_as_string() {
        let one = MethodSet::from(Method::GET);
        assert_eq!(serde_json::to_value(&one).unwrap(), serde_json::json!("get"));

        let two = MethodSet::from(Method::GET).with(RouteMethod::Socket);
        assert_eq!(
            serde_json::to_value(&two).unwrap(),
            serde_json::json!(["get", "socket"])
        );
    }
}
