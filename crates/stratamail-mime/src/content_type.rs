//! MIME content type handling.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fmt;

/// Characters that may not appear in a MIME token (RFC 2045 `tspecials`).
const TSPECIALS: &str = "()<>@,;:\\\"/[]?=";

/// MIME content type with parameters.
///
/// The default value is the empty content type, used when a server reports
/// a value that cannot be parsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ContentType {
    /// Main type (e.g., "text", "image", "multipart").
    pub main_type: String,
    /// Subtype (e.g., "plain", "html", "jpeg").
    pub sub_type: String,
    /// Parameters keyed by lowercase name (e.g., charset=utf-8, name=a.pdf).
    pub parameters: HashMap<String, String>,
}

impl ContentType {
    /// Creates a new content type.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into(),
            sub_type: sub_type.into(),
            parameters: HashMap::new(),
        }
    }

    /// Builds a content type from its separate components.
    ///
    /// Types are lowercased; parameter names are lowercased and values kept
    /// as given.
    ///
    /// # Errors
    ///
    /// Returns an error if the type, subtype or a parameter name is not a
    /// valid MIME token.
    pub fn from_parts<'a>(
        main_type: &str,
        sub_type: &str,
        parameters: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self> {
        let mut content_type = Self::new(token(main_type)?, token(sub_type)?);
        for (name, value) in parameters {
            content_type
                .parameters
                .insert(token(name)?, value.to_string());
        }
        Ok(content_type)
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Returns a parameter by name, ignoring case.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Returns the charset parameter if present.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameter("charset")
    }

    /// Returns the `type/subtype` string, or an empty string for the
    /// default content type.
    #[must_use]
    pub fn mime_type(&self) -> String {
        if self.is_empty() {
            String::new()
        } else {
            format!("{}/{}", self.main_type, self.sub_type)
        }
    }

    /// Whether this is the empty fallback content type.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.main_type.is_empty() && self.sub_type.is_empty()
    }

    /// Checks if this is a multipart content type.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.main_type.eq_ignore_ascii_case("multipart")
    }

    /// Checks if this is a text content type.
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.main_type.eq_ignore_ascii_case("text")
    }

    /// Parses a content type string.
    ///
    /// Format: `type/subtype; param1=value1; param2="value 2"`
    ///
    /// # Errors
    ///
    /// Returns an error if the format is invalid.
    pub fn parse(s: &str) -> Result<Self> {
        let mut parts = split_unquoted(s, ';').into_iter();

        let type_str = parts
            .next()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::InvalidContentType("Empty content type".to_string()))?;

        let (main_type, sub_type) = type_str
            .split_once('/')
            .ok_or_else(|| Error::InvalidContentType(format!("Missing subtype in {type_str:?}")))?;

        let mut content_type = Self::new(token(main_type)?, token(sub_type)?);

        for param in parts {
            let param = param.trim();
            if param.is_empty() {
                continue;
            }
            let (key, value) = param.split_once('=').ok_or_else(|| {
                Error::InvalidContentType(format!("Parameter without value: {param:?}"))
            })?;
            let value = unquote(value.trim());
            content_type.parameters.insert(token(key)?, value);
        }

        Ok(content_type)
    }
}

/// Validates and lowercases a MIME token.
fn token(s: &str) -> Result<String> {
    let s = s.trim();
    let valid = !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_graphic() && !TSPECIALS.contains(c));
    if valid {
        Ok(s.to_ascii_lowercase())
    } else {
        Err(Error::InvalidContentType(format!("Invalid token: {s:?}")))
    }
}

fn unquote(value: &str) -> String {
    match value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        Some(inner) => inner.replace("\\\"", "\"").replace("\\\\", "\\"),
        None => value.to_string(),
    }
}

fn split_unquoted(s: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' && in_quotes {
            escaped = true;
        } else if c == '"' {
            in_quotes = !in_quotes;
        } else if c == separator && !in_quotes {
            parts.push(&s[start..i]);
            start = i + c.len_utf8();
        }
    }
    parts.push(&s[start..]);
    parts
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        let main = &self.main_type;
        let sub = &self.sub_type;
        write!(f, "{main}/{sub}")?;

        let mut keys: Vec<_> = self.parameters.keys().collect();
        keys.sort();
        for key in keys {
            let value = &self.parameters[key];
            // Quote value if it contains special characters
            if value.is_empty() || value.contains(|c: char| c.is_whitespace() || TSPECIALS.contains(c)) {
                let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "; {key}=\"{escaped}\"")?;
            } else {
                write!(f, "; {key}={value}")?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_default_is_empty() {
        let ct = ContentType::default();
        assert!(ct.is_empty());
        assert_eq!(ct.mime_type(), "");
        assert_eq!(ct.to_string(), "");
    }

    #[test]
    fn test_content_type_parse() {
        let ct = ContentType::parse("TEXT/Plain; CHARSET=utf-8").unwrap();
        assert_eq!(ct.main_type, "text");
        assert_eq!(ct.sub_type, "plain");
        assert_eq!(ct.charset(), Some("utf-8"));
        assert!(ct.is_text());
    }

    #[test]
    fn test_content_type_parse_quoted() {
        let ct = ContentType::parse("multipart/mixed; boundary=\"----=_Part;123\"").unwrap();
        assert!(ct.is_multipart());
        assert_eq!(ct.parameter("BOUNDARY"), Some("----=_Part;123"));
    }

    #[test]
    fn test_content_type_parse_rejects_garbage() {
        assert!(ContentType::parse("").is_err());
        assert!(ContentType::parse("text").is_err());
        assert!(ContentType::parse("te xt/plain").is_err());
        assert!(ContentType::parse("text/plain; charset").is_err());
    }

    #[test]
    fn test_from_parts() {
        let ct = ContentType::from_parts("APPLICATION", "PDF", [("NAME", "report 1.pdf")]).unwrap();
        assert_eq!(ct.mime_type(), "application/pdf");
        assert_eq!(ct.parameter("name"), Some("report 1.pdf"));
        assert_eq!(ct.to_string(), "application/pdf; name=\"report 1.pdf\"");

        assert!(ContentType::from_parts("", "plain", []).is_err());
        assert!(ContentType::from_parts("text", "pl\"ain", []).is_err());
    }

    #[test]
    fn test_display_roundtrip() {
        let ct = ContentType::new("text", "plain")
            .with_parameter("charset", "iso-8859-1")
            .with_parameter("format", "flowed");
        let reparsed = ContentType::parse(&ct.to_string()).unwrap();
        assert_eq!(reparsed, ct);
    }
}
