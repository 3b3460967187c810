//! Body structure projection.
//!
//! A BODYSTRUCTURE is flattened into its leaf parts, each tagged with the
//! dotted section path used to fetch it (`1`, `2`, `1.2`, ...).

use stratamail_mime::{ContentType, TransferEncoding};

use crate::parser::TokenList;

/// Number of trailing elements from the multipart subtype to the end of a
/// multipart body structure with extension data.
const MULTIPART_SUBTYPE_FROM_END: usize = 4;

/// One leaf part of a message body.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BodyPart {
    /// Section path for `BODY[<section>]`.
    pub section: String,
    /// Media type with parameters; empty if the server sent garbage.
    pub content_type: ContentType,
    /// Content-ID.
    pub content_id: Option<String>,
    /// Content-Description.
    pub description: Option<String>,
    /// Content-Transfer-Encoding as sent by the server.
    pub encoding: String,
    /// Size in octets of the encoded body.
    pub size: Option<u32>,
}

impl BodyPart {
    /// Flattens a body structure list into its leaf parts.
    ///
    /// A top-level single part gets section `1`.
    #[must_use]
    pub fn parse_structure(structure: &TokenList) -> Vec<Self> {
        let mut parts = Vec::new();
        collect_parts("", structure, &mut parts);
        parts
    }

    /// Builds a leaf part from `(type subtype (params) id description
    /// encoding size ...)`.
    #[must_use]
    pub fn from_leaf(section: impl Into<String>, list: &TokenList) -> Self {
        Self {
            section: section.into(),
            content_type: leaf_content_type(list),
            content_id: list.opt_string_at(3).map(ToString::to_string),
            description: list.opt_string_at(4).map(ToString::to_string),
            encoding: list.string_at(5).to_string(),
            size: list.string_at(6).parse().ok(),
        }
    }

    /// The transfer encoding, if it is one this library can decode.
    #[must_use]
    pub fn transfer_encoding(&self) -> Option<TransferEncoding> {
        TransferEncoding::parse(&self.encoding)
    }

    /// The `charset` parameter with surrounding quotes removed.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.content_type.charset().map(|c| c.trim_matches('"'))
    }
}

fn collect_parts(section: &str, list: &TokenList, parts: &mut Vec<BodyPart>) {
    if list.is_string_at(0) {
        let section = if section.is_empty() { "1" } else { section };
        parts.push(BodyPart::from_leaf(section, list));
        return;
    }

    let Some(subtype_index) = multipart_subtype_index(list) else {
        return;
    };

    let prefix = if section.is_empty() {
        String::new()
    } else {
        format!("{section}.")
    };

    for (i, child) in list.iter().take(subtype_index).enumerate() {
        let Some(child) = child.as_list().filter(|c| !c.is_empty()) else {
            continue;
        };
        collect_parts(&format!("{prefix}{}", i + 1), child, parts);
    }
}

/// Locates the multipart subtype.
///
/// With extension data it sits four from the end. A structure without
/// extension data (plain `BODY`) has it right after the child lists.
fn multipart_subtype_index(list: &TokenList) -> Option<usize> {
    let only_lists_before = |index: usize| list.iter().take(index).all(|t| t.as_list().is_some());

    list.len()
        .checked_sub(MULTIPART_SUBTYPE_FROM_END)
        .filter(|&i| list.is_string_at(i) && only_lists_before(i))
        .or_else(|| {
            list.iter()
                .position(|t| t.as_list().is_none())
                .filter(|&i| i > 0 && list.is_string_at(i))
        })
}

fn leaf_content_type(list: &TokenList) -> ContentType {
    let params = list.list_at(2);
    let pairs = (0..params.len())
        .step_by(2)
        .map(|i| (params.string_at(i), params.string_at(i + 1)));

    ContentType::from_parts(
        &list.string_at(0).to_ascii_lowercase(),
        &list.string_at(1).to_ascii_lowercase(),
        pairs,
    )
    .unwrap_or_else(|e| {
        tracing::warn!(error = %e, "using empty content type for body part");
        ContentType::default()
    })
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn structure(text: &str) -> Vec<BodyPart> {
        let list = parse(text);
        BodyPart::parse_structure(list.list_at(0))
    }

    #[test]
    fn test_single_part() {
        let parts = structure(
            "(\"TEXT\" \"PLAIN\" (\"CHARSET\" \"us-ascii\") NIL NIL \"7BIT\" 18 2 NIL NIL NIL)",
        );
        assert_eq!(parts.len(), 1);
        let part = &parts[0];
        assert_eq!(part.section, "1");
        assert_eq!(part.content_type.mime_type(), "text/plain");
        assert_eq!(part.charset(), Some("us-ascii"));
        assert_eq!(part.content_id, None);
        assert_eq!(part.encoding, "7BIT");
        assert_eq!(part.transfer_encoding(), Some(TransferEncoding::SevenBit));
        assert_eq!(part.size, Some(18));
    }

    #[test]
    fn test_alternative() {
        let parts = structure(
            "((\"TEXT\" \"PLAIN\" (\"CHARSET\" \"us-ascii\") NIL NIL \"7BIT\" 18 2 NIL NIL NIL)(\"TEXT\" \"HTML\" (\"CHARSET\" \"us-ascii\") NIL NIL \"QUOTED-PRINTABLE\" 1657 47 NIL NIL NIL) \"ALTERNATIVE\" (\"BOUNDARY\" \"----=_NextPart_000_00A9_01CC6F06.942DFAF0\") NIL NIL)",
        );
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].section, "1");
        assert_eq!(parts[1].section, "2");
        assert_eq!(parts[1].content_type.mime_type(), "text/html");
        assert_eq!(parts[1].size, Some(1657));
    }

    #[test]
    fn test_nested_mixed() {
        let parts = structure(
            "(((\"TEXT\" \"PLAIN\" NIL NIL NIL \"7BIT\" 10 1 NIL NIL NIL)(\"TEXT\" \"HTML\" NIL NIL NIL \"7BIT\" 20 1 NIL NIL NIL) \"ALTERNATIVE\" NIL NIL NIL)(\"APPLICATION\" \"PDF\" (\"NAME\" \"report.pdf\") \"<id1>\" \"Quarterly\" \"BASE64\" 4096 NIL NIL NIL) \"MIXED\" (\"BOUNDARY\" \"b1\") NIL NIL)",
        );
        let sections: Vec<_> = parts.iter().map(|p| p.section.as_str()).collect();
        assert_eq!(sections, vec!["1.1", "1.2", "2"]);

        let pdf = &parts[2];
        assert_eq!(pdf.content_type.parameter("name"), Some("report.pdf"));
        assert_eq!(pdf.content_id.as_deref(), Some("<id1>"));
        assert_eq!(pdf.description.as_deref(), Some("Quarterly"));
        assert_eq!(pdf.transfer_encoding(), Some(TransferEncoding::Base64));
    }

    #[test]
    fn test_multipart_without_extension_data() {
        let parts = structure(
            "((\"TEXT\" \"PLAIN\" NIL NIL NIL \"7BIT\" 10 1)(\"TEXT\" \"HTML\" NIL NIL NIL \"7BIT\" 20 1) \"ALTERNATIVE\")",
        );
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1].section, "2");
    }

    #[test]
    fn test_malformed_content_type_falls_back() {
        let parts = structure("(\"TE XT\" NIL NIL NIL NIL \"8BIT\" abc)");
        assert_eq!(parts.len(), 1);
        assert!(parts[0].content_type.is_empty());
        assert_eq!(parts[0].size, None);
        assert_eq!(parts[0].encoding, "8BIT");
    }

    #[test]
    fn test_empty_structure() {
        assert!(structure("()").is_empty());
        assert!(structure("NIL").is_empty());
    }
}
