//! Template - parsed destination template

use std::fmt;
use std::str::FromStr;

use contracts::FieldTree;

use crate::error::ResolveError;
use crate::format::{parse_segments, FormatSpec, Segment};

/// Parsed `"<skeleton>,<idx_1>,...,<idx_k>"` template
///
/// Invariant: the skeleton holds exactly as many directives as there are
/// field indices, paired left to right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    raw: String,
    skeleton: String,
    segments: Vec<Segment>,
    field_indices: Vec<u32>,
}

impl Template {
    /// Parse a raw template
    ///
    /// A template without directives parses as static and renders verbatim.
    /// Without trailing field indices, `%` followed by two hex digits is
    /// taken as URL percent-encoding rather than a directive.
    ///
    /// # Errors
    /// - `InvalidTemplate`: empty, malformed directive, or directive/index count mismatch
    /// - `EmptyTemplateConfiguration`: nothing but separators
    /// - `InvalidFieldIndex`: a trailing token is not a non-negative integer
    pub fn parse(raw: &str) -> Result<Self, ResolveError> {
        if raw.is_empty() {
            return Err(ResolveError::invalid_template(raw, "template is empty"));
        }

        let tokens: Vec<&str> = raw.split(',').collect();
        if tokens.len() > 1 && tokens.iter().all(|token| token.trim().is_empty()) {
            return Err(ResolveError::EmptyTemplateConfiguration {
                template: raw.to_string(),
            });
        }

        // indices start after the last token carrying a directive, so the
        // skeleton itself may contain commas
        let Some(last) = tokens.iter().rposition(|token| token.contains('%')) else {
            return Ok(Self::verbatim(raw));
        };

        let skeleton = tokens[..=last].join(",").trim().to_string();
        let mut index_tokens: Vec<&str> = tokens[last + 1..].iter().map(|t| t.trim()).collect();
        while index_tokens.last().is_some_and(|token| token.is_empty()) {
            index_tokens.pop();
        }
        if index_tokens.is_empty() && !has_bare_directive(&skeleton) {
            return Ok(Self::verbatim(raw));
        }

        let segments = parse_segments(&skeleton)
            .map_err(|reason| ResolveError::invalid_template(raw, reason))?;
        let directives = segments
            .iter()
            .filter(|segment| matches!(segment, Segment::Directive(_)))
            .count();
        if directives == 0 {
            return Ok(Self::verbatim(raw));
        }

        let field_indices = index_tokens
            .into_iter()
            .map(|token| {
                token
                    .parse::<u32>()
                    .map_err(|source| ResolveError::InvalidFieldIndex {
                        token: token.to_string(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if field_indices.len() != directives {
            return Err(ResolveError::invalid_template(
                raw,
                "directive count does not match field index count",
            ));
        }

        Ok(Self {
            raw: raw.to_string(),
            skeleton,
            segments,
            field_indices,
        })
    }

    fn verbatim(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            skeleton: raw.to_string(),
            segments: vec![Segment::Literal(raw.to_string())],
            field_indices: Vec::new(),
        }
    }

    /// Template as configured
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Literal portion with its directives
    pub fn skeleton(&self) -> &str {
        &self.skeleton
    }

    /// True when no field needs to be resolved
    pub fn is_static(&self) -> bool {
        self.field_indices.is_empty()
    }

    pub fn field_indices(&self) -> &[u32] {
        &self.field_indices
    }

    /// `(directive, field number)` pairs in order of appearance
    pub fn placeholders(&self) -> impl Iterator<Item = (&FormatSpec, u32)> + '_ {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Directive(spec) => Some(spec),
                Segment::Literal(_) => None,
            })
            .zip(self.field_indices.iter().copied())
    }

    /// Substitute field values from `tree` into the skeleton
    ///
    /// # Errors
    /// - `FieldNotFound`: a field number is absent from `tree`
    /// - `IncompatibleField`: a value has no view in its directive's type class
    pub fn render(&self, tree: &FieldTree) -> Result<String, ResolveError> {
        if self.is_static() {
            return Ok(self.raw.clone());
        }

        let mut out = String::with_capacity(self.skeleton.len() + 16);
        let mut indices = self.field_indices.iter().copied();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Directive(spec) => {
                    // count checked at parse time
                    let Some(index) = indices.next() else {
                        return Err(ResolveError::invalid_template(
                            self.raw.as_str(),
                            "directive count does not match field index count",
                        ));
                    };
                    let value = tree
                        .get(index)
                        .ok_or(ResolveError::FieldNotFound { index })?;
                    let rendered =
                        spec.render(value)
                            .ok_or_else(|| ResolveError::IncompatibleField {
                                index,
                                specifier: spec.to_string(),
                                kind: value.kind(),
                            })?;
                    out.push_str(&rendered);
                }
            }
        }
        Ok(out)
    }
}

/// True when some `%` is neither a `%%` escape nor a `%XX` percent-encoded octet
fn has_bare_directive(skeleton: &str) -> bool {
    let mut rest = skeleton;
    while let Some(at) = rest.find('%') {
        match &rest.as_bytes()[at + 1..] {
            [b'%', ..] => rest = &rest[at + 2..],
            [hi, lo, ..] if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => {
                rest = &rest[at + 3..]
            }
            _ => return true,
        }
    }
    false
}

impl FromStr for Template {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::FieldValue;

    fn booking_tree() -> FieldTree {
        FieldTree::new("sink.test.BookingLogMessage")
            .with_field(1, FieldValue::Str("bookingOrderNumber".into()))
            .with_field(16, FieldValue::Float(12.3))
            .with_field(52, FieldValue::Int(2000))
    }

    #[test]
    fn test_static_template() {
        let template = Template::parse("http://dummyurl.com").unwrap();
        assert!(template.is_static());
        assert_eq!(template.render(&FieldTree::default()).unwrap(), "http://dummyurl.com");

        let with_commas = Template::parse("a,b,c").unwrap();
        assert!(with_commas.is_static());
        assert_eq!(with_commas.render(&FieldTree::default()).unwrap(), "a,b,c");
    }

    #[test]
    fn test_escaped_percent_only_is_static() {
        let template = Template::parse("http://host/100%%").unwrap();
        assert!(template.is_static());
        assert_eq!(template.raw(), "http://host/100%%");
    }

    #[test]
    fn test_parse_pairs_directives_with_indices() {
        let template = Template::parse("http://dummyurl.com/%s/%.2f/%d, 1, 16 ,52").unwrap();
        assert_eq!(template.skeleton(), "http://dummyurl.com/%s/%.2f/%d");
        assert_eq!(template.field_indices(), &[1, 16, 52]);

        let pairs: Vec<_> = template
            .placeholders()
            .map(|(spec, index)| (spec.to_string(), index))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("%s".to_string(), 1),
                ("%.2f".to_string(), 16),
                ("%d".to_string(), 52)
            ]
        );

        assert_eq!(
            template.render(&booking_tree()).unwrap(),
            "http://dummyurl.com/bookingOrderNumber/12.30/2000"
        );
    }

    #[test]
    fn test_skeleton_may_contain_commas() {
        let template = Template::parse("http://host/a,b/%s,1").unwrap();
        assert_eq!(template.skeleton(), "http://host/a,b/%s");
        assert_eq!(
            template.render(&booking_tree()).unwrap(),
            "http://host/a,b/bookingOrderNumber"
        );
    }

    #[test]
    fn test_trailing_separator_ignored() {
        let template = Template::parse("http://host/%d,52,").unwrap();
        assert_eq!(template.field_indices(), &[52]);
    }

    #[test]
    fn test_empty_template() {
        let err = Template::parse("").unwrap_err();
        assert!(matches!(err, ResolveError::InvalidTemplate { .. }));
        assert_eq!(err.to_string(), "Service URL '' is invalid");
    }

    #[test]
    fn test_percent_encoded_url_is_static() {
        for raw in [
            "http://host/path%2Fx",
            "http://host/q?a%20b",
            "http://host/a%2Cb,c%3D%3d",
            "http://host/100%%/%7E",
        ] {
            let template = Template::parse(raw).unwrap();
            assert!(template.is_static(), "{raw}");
            assert_eq!(template.render(&FieldTree::default()).unwrap(), raw);
        }
    }

    #[test]
    fn test_has_bare_directive() {
        assert!(has_bare_directive("http://host/%s"));
        assert!(has_bare_directive("http://host/%2Fx/%.2f"));
        assert!(has_bare_directive("100%"));
        assert!(!has_bare_directive("http://host/%2F%20b"));
        assert!(!has_bare_directive("100%%"));
    }

    #[test]
    fn test_whitespace_only_is_static() {
        let template = Template::parse("   ").unwrap();
        assert!(template.is_static());
        assert_eq!(template.render(&FieldTree::default()).unwrap(), "   ");
    }

    #[test]
    fn test_separators_only() {
        for raw in [",,,", " , ", "  ,"] {
            let err = Template::parse(raw).unwrap_err();
            assert!(
                matches!(err, ResolveError::EmptyTemplateConfiguration { .. }),
                "{raw:?} -> {err:?}"
            );
        }
        assert_eq!(
            Template::parse(",,,").unwrap_err().to_string(),
            "Empty Service URL configuration: ',,,'"
        );
    }

    #[test]
    fn test_invalid_field_index() {
        let err = Template::parse("http://dummy.com/%s, 6a").unwrap_err();
        match &err {
            ResolveError::InvalidFieldIndex { token, .. } => assert_eq!(token, "6a"),
            other => panic!("expected InvalidFieldIndex, got {other:?}"),
        }
        assert_eq!(err.to_string(), "Invalid Proto Index");

        assert!(matches!(
            Template::parse("http://dummy.com/%s,-1").unwrap_err(),
            ResolveError::InvalidFieldIndex { .. }
        ));
    }

    #[test]
    fn test_count_mismatch() {
        for raw in ["http://host/%s", "http://host/%s,1,2", "http://host/%s/%d,1"] {
            let err = Template::parse(raw).unwrap_err();
            assert!(matches!(err, ResolveError::InvalidTemplate { .. }), "{raw}");
        }
    }

    #[test]
    fn test_malformed_directive() {
        let err = Template::parse("http://host/%q,1").unwrap_err();
        match err {
            ResolveError::InvalidTemplate { reason, .. } => {
                assert_eq!(reason, "unsupported conversion")
            }
            other => panic!("expected InvalidTemplate, got {other:?}"),
        }
    }

    #[test]
    fn test_oversized_width_rejected() {
        for raw in ["http://h/%9999999999999999999s,1", "http://h/%.999999999999f,16"] {
            match Template::parse(raw).unwrap_err() {
                ResolveError::InvalidTemplate { reason, .. } => {
                    assert_eq!(reason, "width or precision exceeds 4096", "{raw}")
                }
                other => panic!("expected InvalidTemplate, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_render_missing_field() {
        let template: Template = "http://host/%s, 1000".parse().unwrap();
        let err = template.render(&booking_tree()).unwrap_err();
        assert!(matches!(err, ResolveError::FieldNotFound { index: 1000 }));
        assert_eq!(err.to_string(), "Descriptor not found for index: 1000");
    }

    #[test]
    fn test_render_incompatible_field() {
        let template = Template::parse("http://host/%d,1").unwrap();
        let err = template.render(&booking_tree()).unwrap_err();
        match err {
            ResolveError::IncompatibleField {
                index,
                specifier,
                kind,
            } => {
                assert_eq!(index, 1);
                assert_eq!(specifier, "%d");
                assert_eq!(kind, "string");
            }
            other => panic!("expected IncompatibleField, got {other:?}"),
        }
    }

    #[test]
    fn test_display_is_raw() {
        let raw = "http://host/%s,1";
        assert_eq!(Template::parse(raw).unwrap().to_string(), raw);
    }
}
