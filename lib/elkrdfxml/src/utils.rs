/// Splits an IRI into a (namespace, local) pair usable as an XML qualified
/// name: the local part must be a non-empty
/// [NCName](https://www.w3.org/TR/xml-names/#NT-NCName).
pub(crate) fn split_iri_for_xml(iri: &str) -> Option<(&str, &str)> {
    let mut split_at = None;
    for (i, c) in iri.char_indices().rev() {
        if is_name_start_char(c) {
            split_at = Some(i);
        } else if !is_name_char(c) {
            break;
        }
    }
    let split_at = split_at?;
    if split_at == 0 {
        return None;
    }
    Some(iri.split_at(split_at))
}

pub(crate) fn is_name_start_char(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

pub(crate) fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '\u{B7}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_namespace_and_local() {
        assert_eq!(
            split_iri_for_xml("http://schema.org/Person"),
            Some(("http://schema.org/", "Person"))
        );
        assert_eq!(
            split_iri_for_xml("http://schema.org#foo"),
            Some(("http://schema.org#", "foo"))
        );
        assert_eq!(split_iri_for_xml("http://schema.org/"), None);
        // A local part starting with a digit is not an NCName.
        assert_eq!(
            split_iri_for_xml("http://example.org/item/01"),
            None
        );
    }
}
