#![doc = include_str!("../README.md")]

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// An error raised when a string is not a usable IRI reference.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid IRI: {message}")]
pub struct IriParseError {
    message: String,
}

impl IriParseError {
    fn msg(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// How aggressively [`Iri::relativize`] is allowed to shorten an IRI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RelativizationPolicy {
    /// Always keep the absolute form.
    Never,
    /// Only the empty reference and `#fragment` forms.
    SameDocument,
    /// Any relative form, including `..` segments.
    #[default]
    Full,
}

/// An absolute IRI, usable as a base for reference resolution.
///
/// ```
/// use elkiri::Iri;
///
/// let base = Iri::parse("http://example.com/a/b/c")?;
/// assert_eq!(base.resolve("../d")?.as_str(), "http://example.com/a/d");
/// # Result::<_, elkiri::IriParseError>::Ok(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Iri {
    iri: String,
}

impl Iri {
    /// Parses and validates an absolute IRI.
    pub fn parse(iri: impl Into<String>) -> Result<Self, IriParseError> {
        let iri = iri.into();
        validate_reference(&iri)?;
        if split(&iri).scheme.is_none() {
            return Err(IriParseError::msg(format!(
                "'{iri}' is relative, an absolute IRI with a scheme is required"
            )));
        }
        Ok(Self { iri })
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.iri
    }

    #[inline]
    pub fn into_inner(self) -> String {
        self.iri
    }

    pub fn scheme(&self) -> &str {
        split(&self.iri).scheme.unwrap_or("")
    }

    pub fn authority(&self) -> Option<&str> {
        split(&self.iri).authority
    }

    pub fn path(&self) -> &str {
        split(&self.iri).path
    }

    pub fn query(&self) -> Option<&str> {
        split(&self.iri).query
    }

    pub fn fragment(&self) -> Option<&str> {
        split(&self.iri).fragment
    }

    /// Resolves a reference against this base per RFC 3986 §5.2.
    ///
    /// References carrying their own scheme (`urn:…`, `doi:…`) pass through
    /// unchanged apart from dot-segment removal. A base ending in `#` carries
    /// an empty fragment, which the algorithm discards, so `foo` against
    /// `http://h/p#` resolves to `http://h/foo`.
    pub fn resolve(&self, reference: &str) -> Result<Self, IriParseError> {
        validate_reference(reference)?;
        let r = split(reference);
        let b = split(&self.iri);
        let iri = if r.scheme.is_some() {
            recompose(
                r.scheme,
                r.authority,
                &remove_dot_segments(r.path),
                r.query,
                r.fragment,
            )
        } else if r.authority.is_some() {
            recompose(
                b.scheme,
                r.authority,
                &remove_dot_segments(r.path),
                r.query,
                r.fragment,
            )
        } else if r.path.is_empty() {
            recompose(b.scheme, b.authority, b.path, r.query.or(b.query), r.fragment)
        } else {
            let path = if r.path.starts_with('/') {
                remove_dot_segments(r.path)
            } else {
                remove_dot_segments(&merge_paths(&b, r.path))
            };
            recompose(b.scheme, b.authority, &path, r.query, r.fragment)
        };
        Ok(Self { iri })
    }

    /// Computes the shortest reference that resolves back to `target`.
    ///
    /// Returns `None` when no relative form is admissible under `policy`;
    /// the caller then keeps the absolute IRI. Every returned reference is
    /// checked to re-resolve to `target` exactly.
    pub fn relativize(&self, target: &Self, policy: RelativizationPolicy) -> Option<String> {
        if policy == RelativizationPolicy::Never {
            return None;
        }
        for candidate in self.candidates(target, policy) {
            if let Ok(resolved) = self.resolve(&candidate) {
                if resolved.as_str() == target.as_str() {
                    return Some(candidate);
                }
            }
        }
        None
    }

    fn candidates(&self, target: &Self, policy: RelativizationPolicy) -> Vec<String> {
        let b = split(&self.iri);
        let t = split(target.as_str());
        let mut out = Vec::new();
        if b.scheme != t.scheme || b.authority != t.authority {
            return out;
        }
        let tail = {
            let mut tail = String::new();
            if let Some(query) = t.query {
                tail.push('?');
                tail.push_str(query);
            }
            if let Some(fragment) = t.fragment {
                tail.push('#');
                tail.push_str(fragment);
            }
            tail
        };
        if b.path == t.path && b.query == t.query {
            match t.fragment {
                None => out.push(String::new()),
                Some(fragment) => out.push(format!("#{fragment}")),
            }
        }
        if policy == RelativizationPolicy::SameDocument {
            return out;
        }
        if b.path == t.path && t.query.is_some() {
            out.push(tail.clone());
        }
        let dir = match b.path.rfind('/') {
            Some(i) => &b.path[..=i],
            None => "",
        };
        if !dir.is_empty() && t.path.starts_with(dir) {
            let rest = &t.path[dir.len()..];
            let mut candidate = if rest.is_empty() {
                ".".to_owned()
            } else if first_segment_has_colon(rest) {
                format!("./{rest}")
            } else {
                rest.to_owned()
            };
            candidate.push_str(&tail);
            out.push(candidate);
        } else if !dir.is_empty() && t.path.starts_with('/') {
            if let Some(i) = t.path.rfind('/') {
                let (t_dir, t_name) = (&t.path[..=i], &t.path[i + 1..]);
                let base_dirs: Vec<&str> = dir.split('/').collect();
                let target_dirs: Vec<&str> = t_dir.split('/').collect();
                let common = base_dirs
                    .iter()
                    .zip(&target_dirs)
                    .take_while(|(a, b)| a == b)
                    .count();
                // The split of a dir string ends with "", so common is at least 1
                // for two absolute paths and the last entries never match early.
                let ups = base_dirs.len().saturating_sub(common + 1);
                let mut candidate = "../".repeat(ups);
                for segment in &target_dirs[common.min(target_dirs.len())..] {
                    if !segment.is_empty() {
                        candidate.push_str(segment);
                        candidate.push('/');
                    }
                }
                candidate.push_str(t_name);
                if candidate.is_empty() {
                    candidate.push('.');
                }
                out.push(format!("{candidate}{tail}"));
            }
        }
        if t.path.starts_with('/') {
            out.push(format!("{}{tail}", t.path));
        }
        out
    }
}

impl fmt::Display for Iri {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.iri)
    }
}

impl AsRef<str> for Iri {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.iri
    }
}

impl FromStr for Iri {
    type Err = IriParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Checks that a string has the structure of an IRI reference (absolute or
/// relative): no whitespace, no control characters, no `<>"{}|^\``.
pub fn validate_reference(reference: &str) -> Result<(), IriParseError> {
    for (i, c) in reference.char_indices() {
        if c.is_whitespace() || c.is_control() || matches!(c, '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`' | '\\') {
            return Err(IriParseError::msg(format!(
                "character '{}' is not allowed in an IRI at byte {i}",
                c.escape_default()
            )));
        }
    }
    Ok(())
}

struct Reference<'a> {
    scheme: Option<&'a str>,
    authority: Option<&'a str>,
    path: &'a str,
    query: Option<&'a str>,
    fragment: Option<&'a str>,
}

/// Splits a reference into its five RFC 3986 components.
///
/// Never fails: a malformed scheme part is treated as path content.
fn split(reference: &str) -> Reference<'_> {
    let (before_fragment, fragment) = match reference.find('#') {
        Some(i) => (&reference[..i], Some(&reference[i + 1..])),
        None => (reference, None),
    };
    let (before_query, query) = match before_fragment.find('?') {
        Some(i) => (&before_fragment[..i], Some(&before_fragment[i + 1..])),
        None => (before_fragment, None),
    };
    let (scheme, rest) = match before_query.find(':') {
        Some(i)
            if before_query[..i].find(['/', '?', '#']).is_none()
                && is_scheme(&before_query[..i]) =>
        {
            (Some(&before_query[..i]), &before_query[i + 1..])
        }
        _ => (None, before_query),
    };
    let (authority, path) = if let Some(rest) = rest.strip_prefix("//") {
        match rest.find('/') {
            Some(i) => (Some(&rest[..i]), &rest[i..]),
            None => (Some(rest), ""),
        }
    } else {
        (None, rest)
    };
    Reference {
        scheme,
        authority,
        path,
        query,
        fragment,
    }
}

fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn first_segment_has_colon(path: &str) -> bool {
    path.split('/').next().is_some_and(|s| s.contains(':'))
}

fn recompose(
    scheme: Option<&str>,
    authority: Option<&str>,
    path: &str,
    query: Option<&str>,
    fragment: Option<&str>,
) -> String {
    let mut out = String::new();
    if let Some(scheme) = scheme {
        out.push_str(scheme);
        out.push(':');
    }
    if let Some(authority) = authority {
        out.push_str("//");
        out.push_str(authority);
    }
    out.push_str(path);
    if let Some(query) = query {
        out.push('?');
        out.push_str(query);
    }
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

/// RFC 3986 §5.2.3 path merge.
fn merge_paths(base: &Reference<'_>, reference_path: &str) -> String {
    if base.authority.is_some() && base.path.is_empty() {
        return format!("/{reference_path}");
    }
    match base.path.rfind('/') {
        Some(i) => format!("{}{reference_path}", &base.path[..=i]),
        None => reference_path.to_owned(),
    }
}

/// RFC 3986 §5.2.4 remove_dot_segments.
fn remove_dot_segments(path: &str) -> String {
    let mut input = path;
    let mut output = String::new();
    while !input.is_empty() {
        if let Some(rest) = input.strip_prefix("../") {
            input = rest;
        } else if let Some(rest) = input.strip_prefix("./") {
            input = rest;
        } else if input.starts_with("/./") {
            input = &input[2..];
        } else if input == "/." {
            input = "/";
        } else if input.starts_with("/../") {
            input = &input[3..];
            pop_segment(&mut output);
        } else if input == "/.." {
            input = "/";
            pop_segment(&mut output);
        } else if input == "." || input == ".." {
            input = "";
        } else {
            let start = usize::from(input.starts_with('/'));
            let end = input[start..]
                .find('/')
                .map_or(input.len(), |i| i + start);
            output.push_str(&input[..end]);
            input = &input[end..];
        }
    }
    output
}

fn pop_segment(output: &mut String) {
    match output.rfind('/') {
        Some(i) => output.truncate(i),
        None => output.clear(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://a/b/c/d;p?q";

    fn check(reference: &str, expected: &str) {
        let base = Iri::parse(BASE).unwrap();
        assert_eq!(
            base.resolve(reference).unwrap().as_str(),
            expected,
            "resolving {reference:?} against {BASE:?}"
        );
    }

    #[test]
    fn rfc3986_normal_examples() {
        check("g:h", "g:h");
        check("g", "http://a/b/c/g");
        check("./g", "http://a/b/c/g");
        check("g/", "http://a/b/c/g/");
        check("/g", "http://a/g");
        check("//g", "http://g");
        check("?y", "http://a/b/c/d;p?y");
        check("g?y", "http://a/b/c/g?y");
        check("#s", "http://a/b/c/d;p?q#s");
        check("g#s", "http://a/b/c/g#s");
        check("g?y#s", "http://a/b/c/g?y#s");
        check(";x", "http://a/b/c/;x");
        check("g;x", "http://a/b/c/g;x");
        check("g;x?y#s", "http://a/b/c/g;x?y#s");
        check("", "http://a/b/c/d;p?q");
        check(".", "http://a/b/c/");
        check("./", "http://a/b/c/");
        check("..", "http://a/b/");
        check("../", "http://a/b/");
        check("../g", "http://a/b/g");
        check("../..", "http://a/");
        check("../../", "http://a/");
        check("../../g", "http://a/g");
    }

    #[test]
    fn rfc3986_abnormal_examples() {
        check("../../../g", "http://a/g");
        check("../../../../g", "http://a/g");
        check("/./g", "http://a/g");
        check("/../g", "http://a/g");
        check("g.", "http://a/b/c/g.");
        check(".g", "http://a/b/c/.g");
        check("g..", "http://a/b/c/g..");
        check("..g", "http://a/b/c/..g");
        check("./../g", "http://a/b/g");
        check("./g/.", "http://a/b/c/g/");
        check("g/./h", "http://a/b/c/g/h");
        check("g/../h", "http://a/b/c/h");
        check("g;x=1/./y", "http://a/b/c/g;x=1/y");
        check("g;x=1/../y", "http://a/b/c/y");
        check("g?y/./x", "http://a/b/c/g?y/./x");
        check("g?y/../x", "http://a/b/c/g?y/../x");
        check("g#s/./x", "http://a/b/c/g#s/./x");
        check("g#s/../x", "http://a/b/c/g#s/../x");
    }

    #[test]
    fn hash_base_drops_fragment() {
        let base = Iri::parse("http://my.host/path#").unwrap();
        assert_eq!(base.resolve("foo").unwrap().as_str(), "http://my.host/foo");
        let base = Iri::parse("http://my.host/onto#").unwrap();
        assert_eq!(
            base.resolve("#term").unwrap().as_str(),
            "http://my.host/onto#term"
        );
    }

    #[test]
    fn non_http_schemes_pass_through() {
        let base = Iri::parse("http://a/b").unwrap();
        assert_eq!(
            base.resolve("urn:isbn:0451450523").unwrap().as_str(),
            "urn:isbn:0451450523"
        );
        assert_eq!(
            base.resolve("doi:10.1000/182").unwrap().as_str(),
            "doi:10.1000/182"
        );
    }

    #[test]
    fn rejects_whitespace() {
        assert!(Iri::parse("http://a/b c").is_err());
        assert!(Iri::parse("http://a/\tb").is_err());
        assert!(Iri::parse("relative/only").is_err());
    }

    #[test]
    fn relativize_same_document() {
        let base = Iri::parse("http://example.org/resource").unwrap();
        let same = Iri::parse("http://example.org/resource").unwrap();
        let frag = Iri::parse("http://example.org/resource#part").unwrap();
        let other = Iri::parse("http://example.org/other").unwrap();
        assert_eq!(
            base.relativize(&same, RelativizationPolicy::SameDocument),
            Some(String::new())
        );
        assert_eq!(
            base.relativize(&frag, RelativizationPolicy::SameDocument),
            Some("#part".to_owned())
        );
        assert_eq!(
            base.relativize(&other, RelativizationPolicy::SameDocument),
            None
        );
        assert_eq!(base.relativize(&other, RelativizationPolicy::Never), None);
    }

    #[test]
    fn relativize_full() {
        let base = Iri::parse("http://example.org/a/b/c").unwrap();
        let cases = [
            ("http://example.org/a/b/d", "d"),
            ("http://example.org/a/b/d/e", "d/e"),
            ("http://example.org/a/x", "../x"),
            ("http://example.org/x", "../../x"),
            ("http://example.org/a/b/", "."),
            ("http://example.org/a/b/c?k=v", "?k=v"),
            ("http://example.org/a/b/c#f", "#f"),
        ];
        for (target, expected) in cases {
            let target = Iri::parse(target).unwrap();
            assert_eq!(
                base.relativize(&target, RelativizationPolicy::Full)
                    .as_deref(),
                Some(expected),
                "relativizing {target}"
            );
        }
        let elsewhere = Iri::parse("https://example.org/a/b/c").unwrap();
        assert_eq!(base.relativize(&elsewhere, RelativizationPolicy::Full), None);
    }

    #[test]
    fn relativize_roundtrips() {
        let bases = [
            "http://example.org/a/b/c?q",
            "http://example.org/",
            "http://example.org/a/",
            "http://my.host/path#",
        ];
        let targets = [
            "http://example.org/a/b/c",
            "http://example.org/a/b/",
            "http://example.org/x/y#f",
            "http://example.org/?only=query",
            "urn:uuid:1234",
            "http://other.example/",
        ];
        for base in bases {
            let base = Iri::parse(base).unwrap();
            for target in targets {
                let target = Iri::parse(target).unwrap();
                if let Some(relative) = base.relativize(&target, RelativizationPolicy::Full) {
                    assert_eq!(
                        base.resolve(&relative).unwrap().as_str(),
                        target.as_str(),
                        "{relative:?} against {base}"
                    );
                }
            }
        }
    }
}
