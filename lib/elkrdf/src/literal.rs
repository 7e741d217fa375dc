use crate::named_node::{NamedNode, NamedNodeRef};
use crate::vocab::{rdf, xsd};
use oxilangtag::{LanguageTag, LanguageTagParseError};
use std::fmt;

/// An owned RDF [literal](https://www.w3.org/TR/rdf11-concepts/#dfn-literal).
///
/// A literal is a lexical form plus exactly one of a datatype IRI
/// (defaulting to `xsd:string`) or a language tag (implying
/// `rdf:langString`). Language tags are normalized to lowercase, which makes
/// equality case-insensitive on the language per BCP 47.
///
/// The default string formatter returns an N-Triples and Turtle compatible
/// representation:
/// ```
/// use elkrdf::Literal;
/// use elkrdf::vocab::xsd;
///
/// assert_eq!("\"foo\\nbar\"", Literal::from("foo\nbar").to_string());
/// assert_eq!(
///     "\"1999-01-01\"^^<http://www.w3.org/2001/XMLSchema#date>",
///     Literal::new_typed("1999-01-01", xsd::DATE).to_string()
/// );
/// assert_eq!(
///     "\"foo\"@en",
///     Literal::new_language_tagged("foo", "en")?.to_string()
/// );
/// # Result::<_, elkrdf::LanguageTagParseError>::Ok(())
/// ```
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct Literal(LiteralContent);

#[derive(Eq, PartialEq, Debug, Clone, Hash)]
enum LiteralContent {
    String(String),
    LanguageTaggedString { value: String, language: String },
    TypedLiteral { value: String, datatype: NamedNode },
}

impl Literal {
    /// Builds a plain `xsd:string` literal.
    #[inline]
    pub fn new_simple(value: impl Into<String>) -> Self {
        Self(LiteralContent::String(value.into()))
    }

    /// Builds a literal with an explicit datatype.
    #[inline]
    pub fn new_typed(value: impl Into<String>, datatype: impl Into<NamedNode>) -> Self {
        let value = value.into();
        let datatype = datatype.into();
        Self(if datatype == xsd::STRING {
            LiteralContent::String(value)
        } else {
            LiteralContent::TypedLiteral { value, datatype }
        })
    }

    /// Builds a language-tagged string, validating and lowercasing the tag.
    #[inline]
    pub fn new_language_tagged(
        value: impl Into<String>,
        language: impl Into<String>,
    ) -> Result<Self, LanguageTagParseError> {
        let mut language = language.into();
        language.make_ascii_lowercase();
        Ok(Self::new_language_tagged_unchecked(
            value,
            LanguageTag::parse(language)?.into_inner(),
        ))
    }

    /// Builds a language-tagged string from a tag already known to be a
    /// lowercase BCP 47 tag.
    #[inline]
    pub fn new_language_tagged_unchecked(
        value: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self(LiteralContent::LanguageTaggedString {
            value: value.into(),
            language: language.into(),
        })
    }

    /// The lexical form.
    #[inline]
    pub fn value(&self) -> &str {
        match &self.0 {
            LiteralContent::String(value)
            | LiteralContent::LanguageTaggedString { value, .. }
            | LiteralContent::TypedLiteral { value, .. } => value,
        }
    }

    /// The language tag, if this is a language-tagged string.
    #[inline]
    pub fn language(&self) -> Option<&str> {
        if let LiteralContent::LanguageTaggedString { language, .. } = &self.0 {
            Some(language)
        } else {
            None
        }
    }

    /// The datatype IRI; `rdf:langString` for language-tagged strings and
    /// `xsd:string` for plain literals.
    #[inline]
    pub fn datatype(&self) -> NamedNodeRef<'_> {
        match &self.0 {
            LiteralContent::String(_) => xsd::STRING,
            LiteralContent::LanguageTaggedString { .. } => rdf::LANG_STRING,
            LiteralContent::TypedLiteral { datatype, .. } => datatype.as_ref(),
        }
    }

    /// Checks if this literal is `xsd:string` typed or language-tagged.
    #[inline]
    pub fn is_plain(&self) -> bool {
        matches!(
            self.0,
            LiteralContent::String(_) | LiteralContent::LanguageTaggedString { .. }
        )
    }

    /// Splits this literal into (value, datatype, language).
    #[inline]
    pub fn destruct(self) -> (String, Option<NamedNode>, Option<String>) {
        match self.0 {
            LiteralContent::String(value) => (value, None, None),
            LiteralContent::LanguageTaggedString { value, language } => {
                (value, None, Some(language))
            }
            LiteralContent::TypedLiteral { value, datatype } => (value, Some(datatype), None),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            LiteralContent::String(value) => print_quoted_str(value, f),
            LiteralContent::LanguageTaggedString { value, language } => {
                print_quoted_str(value, f)?;
                write!(f, "@{language}")
            }
            LiteralContent::TypedLiteral { value, datatype } => {
                print_quoted_str(value, f)?;
                write!(f, "^^{datatype}")
            }
        }
    }
}

impl<'a> From<&'a str> for Literal {
    #[inline]
    fn from(value: &'a str) -> Self {
        Self(LiteralContent::String(value.into()))
    }
}

impl From<String> for Literal {
    #[inline]
    fn from(value: String) -> Self {
        Self(LiteralContent::String(value))
    }
}

impl From<bool> for Literal {
    #[inline]
    fn from(value: bool) -> Self {
        Self(LiteralContent::TypedLiteral {
            value: value.to_string(),
            datatype: xsd::BOOLEAN.into(),
        })
    }
}

impl From<i64> for Literal {
    #[inline]
    fn from(value: i64) -> Self {
        Self(LiteralContent::TypedLiteral {
            value: value.to_string(),
            datatype: xsd::INTEGER.into(),
        })
    }
}

impl From<f64> for Literal {
    #[inline]
    fn from(value: f64) -> Self {
        Self(LiteralContent::TypedLiteral {
            value: if value == f64::INFINITY {
                "INF".to_owned()
            } else if value == f64::NEG_INFINITY {
                "-INF".to_owned()
            } else {
                value.to_string()
            },
            datatype: xsd::DOUBLE.into(),
        })
    }
}

/// Writes a string in its quoted and escaped N-Triples form.
pub(crate) fn print_quoted_str(string: &str, f: &mut impl fmt::Write) -> fmt::Result {
    f.write_char('"')?;
    for c in string.chars() {
        match c {
            '\u{08}' => f.write_str("\\b"),
            '\t' => f.write_str("\\t"),
            '\n' => f.write_str("\\n"),
            '\u{0C}' => f.write_str("\\f"),
            '\r' => f.write_str("\\r"),
            '"' => f.write_str("\\\""),
            '\\' => f.write_str("\\\\"),
            c => f.write_char(c),
        }?;
    }
    f.write_char('"')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xsd_string_normalizes_to_plain() {
        assert_eq!(
            Literal::new_typed("x", xsd::STRING),
            Literal::new_simple("x")
        );
        assert!(Literal::new_simple("x").is_plain());
        assert_eq!(Literal::new_simple("x").datatype(), xsd::STRING);
    }

    #[test]
    fn language_is_case_insensitive() {
        let a = Literal::new_language_tagged("x", "EN-US").unwrap();
        let b = Literal::new_language_tagged("x", "en-us").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.language(), Some("en-us"));
        assert_eq!(a.datatype(), rdf::LANG_STRING);
    }

    #[test]
    fn escaped_display() {
        assert_eq!(
            Literal::from("say \"hi\"\n").to_string(),
            "\"say \\\"hi\\\"\\n\""
        );
    }

    #[test]
    fn from_json_style_values() {
        assert_eq!(Literal::from(42i64).datatype(), xsd::INTEGER);
        assert_eq!(Literal::from(true).value(), "true");
        assert_eq!(Literal::from(1.5f64).datatype(), xsd::DOUBLE);
    }
}
