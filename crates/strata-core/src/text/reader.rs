use logos::Logos;

use super::lexer::{ContentToken, MarkupToken};
use crate::errors::ParseError;

/// One element of the tagged-tree text
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    /// Concatenated, unescaped character data
    pub text: String,
    /// Line and column of the first non-whitespace character data
    pub text_at: Option<(usize, usize)>,
    pub line: usize,
    pub column: usize,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn required(&self, name: &str) -> Result<&str, ParseError> {
        self.attr(name)
            .ok_or_else(|| self.error(format!("missing attribute '{}'", name)))
    }

    /// `true`/`false` attribute, `default` when absent.
    pub fn flag(&self, name: &str, default: bool) -> Result<bool, ParseError> {
        match self.attr(name) {
            None => Ok(default),
            Some("true") => Ok(true),
            Some("false") => Ok(false),
            Some(other) => Err(self.error(format!(
                "attribute '{}' must be true or false, got '{}'",
                name, other
            ))),
        }
    }

    pub fn index(&self, name: &str) -> Result<usize, ParseError> {
        let raw = self.required(name)?;
        raw.parse()
            .map_err(|_| self.error(format!("attribute '{}' is not an index: '{}'", name, raw)))
    }

    pub fn uuid(&self, name: &str) -> Result<uuid::Uuid, ParseError> {
        let raw = self.required(name)?;
        uuid::Uuid::parse_str(raw)
            .map_err(|e| self.error(format!("attribute '{}' is not a uuid: {}", name, e)))
    }

    pub fn expect_name(&self, name: &str) -> Result<(), ParseError> {
        if self.name != name {
            return Err(self.error(format!("expected <{}>, found <{}>", name, self.name)));
        }
        Ok(())
    }

    /// For elements that may only contain other elements.
    pub fn expect_no_text(&self) -> Result<(), ParseError> {
        match self.text_at {
            Some((line, column)) => Err(ParseError {
                message: format!("unexpected text inside <{}>", self.name),
                line,
                column,
                context: self.name.clone(),
            }),
            None => Ok(()),
        }
    }

    pub fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            line: self.line,
            column: self.column,
            context: self.name.clone(),
        }
    }
}

/// Parse a complete document into its root element.
pub(crate) fn parse_document(source: &str) -> Result<Element, ParseError> {
    let mut reader = Reader { source, pos: 0 };
    let mut root = None;
    while let Some((token, start)) = reader.content()? {
        match token {
            ContentToken::Prolog | ContentToken::Comment => {}
            ContentToken::Text(text) if text.trim().is_empty() => {}
            ContentToken::Open if root.is_none() => root = Some(reader.element(start)?),
            _ => return Err(reader.error_at(start, "document", "content outside the root element")),
        }
    }
    root.ok_or_else(|| reader.error_at(source.len(), "document", "no root element"))
}

struct Reader<'src> {
    source: &'src str,
    pos: usize,
}

impl<'src> Reader<'src> {
    fn content(&mut self) -> Result<Option<(ContentToken<'src>, usize)>, ParseError> {
        let start = self.pos;
        let rest = &self.source[start..];
        let mut lexer = ContentToken::lexer(rest);
        match lexer.next() {
            None => Ok(None),
            Some(Ok(token)) => {
                self.pos = start + lexer.span().end;
                Ok(Some((token, start)))
            }
            Some(Err(())) => Err(self.error_at(start, "document", "unterminated markup")),
        }
    }

    fn markup(&mut self, context: &str) -> Result<(MarkupToken<'src>, usize), ParseError> {
        let rest = &self.source[self.pos..];
        let mut lexer = MarkupToken::lexer(rest);
        match lexer.next() {
            Some(Ok(token)) => {
                let start = self.pos + lexer.span().start;
                self.pos += lexer.span().end;
                Ok((token, start))
            }
            Some(Err(())) => {
                let start = self.pos + lexer.span().start;
                Err(self.error_at(start, context, "unexpected character in tag"))
            }
            None => Err(self.error_at(self.source.len(), context, "unexpected end of input in tag")),
        }
    }

    /// Parse an element whose `<` started at `open`.
    fn element(&mut self, open: usize) -> Result<Element, ParseError> {
        let (line, column) = line_col(self.source, open);
        let name = match self.markup("element")? {
            (MarkupToken::Name(name), _) => name.to_string(),
            (_, at) => return Err(self.error_at(at, "element", "expected a tag name")),
        };
        let mut element = Element {
            name,
            attributes: Vec::new(),
            children: Vec::new(),
            text: String::new(),
            text_at: None,
            line,
            column,
        };

        loop {
            match self.markup(&element.name)? {
                (MarkupToken::SelfClose, _) => return Ok(element),
                (MarkupToken::End, _) => break,
                (MarkupToken::Name(key), at) => {
                    if !matches!(self.markup(&element.name)?, (MarkupToken::Eq, _)) {
                        return Err(self.error_at(at, &element.name, format!("expected '=' after '{}'", key)));
                    }
                    let value = match self.markup(&element.name)? {
                        (MarkupToken::Quoted(raw), value_at) => unescape(raw)
                            .map_err(|msg| self.error_at(value_at, &element.name, msg))?,
                        (_, value_at) => {
                            return Err(self.error_at(value_at, &element.name, "expected a quoted value"))
                        }
                    };
                    if element.attr(key).is_some() {
                        return Err(self.error_at(at, &element.name, format!("duplicate attribute '{}'", key)));
                    }
                    element.attributes.push((key.to_string(), value));
                }
                (_, at) => return Err(self.error_at(at, &element.name, "unexpected token in tag")),
            }
        }

        loop {
            let Some((token, start)) = self.content()? else {
                return Err(self.error_at(
                    self.source.len(),
                    &element.name,
                    format!("element <{}> is not closed", element.name),
                ));
            };
            match token {
                ContentToken::Text(raw) => {
                    let text = unescape(raw).map_err(|msg| self.error_at(start, &element.name, msg))?;
                    if element.text_at.is_none() && !raw.trim().is_empty() {
                        let leading = raw.len() - raw.trim_start().len();
                        element.text_at = Some(line_col(self.source, start + leading));
                    }
                    element.text.push_str(&text);
                }
                ContentToken::Comment => {}
                ContentToken::Prolog => {
                    return Err(self.error_at(start, &element.name, "processing instruction inside element"))
                }
                ContentToken::Open => {
                    let child = self.element(start)?;
                    element.children.push(child);
                }
                ContentToken::CloseOpen => {
                    let (closing, at) = self.markup(&element.name)?;
                    if closing != MarkupToken::Name(&element.name) {
                        return Err(self.error_at(
                            at,
                            &element.name,
                            format!("mismatched closing tag for <{}>", element.name),
                        ));
                    }
                    if !matches!(self.markup(&element.name)?, (MarkupToken::End, _)) {
                        return Err(self.error_at(at, &element.name, "expected '>'"));
                    }
                    return Ok(element);
                }
            }
        }
    }

    fn error_at(&self, offset: usize, context: &str, message: impl Into<String>) -> ParseError {
        let (line, column) = line_col(self.source, offset);
        ParseError {
            message: message.into(),
            line,
            column,
            context: context.to_string(),
        }
    }
}

/// 1-based line and column (in characters) of a byte offset.
fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let before = &source[..offset.min(source.len())];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}

/// Decode the predefined entities and numeric character references.
pub(crate) fn unescape(raw: &str) -> Result<String, String> {
    if !raw.contains('&') {
        return Ok(raw.to_string());
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let semi = after
            .find(';')
            .ok_or_else(|| format!("unterminated entity in '{}'", raw))?;
        let entity = &after[..semi];
        let decoded = match entity {
            "lt" => '<',
            "gt" => '>',
            "amp" => '&',
            "quot" => '"',
            "apos" => '\'',
            _ => decode_reference(entity).ok_or_else(|| format!("unknown entity '&{};'", entity))?,
        };
        out.push(decoded);
        rest = &after[semi + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn decode_reference(entity: &str) -> Option<char> {
    let code = if let Some(hex) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
        u32::from_str_radix(hex, 16).ok()?
    } else {
        entity.strip_prefix('#')?.parse().ok()?
    };
    char::from_u32(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_document() {
        let root = parse_document(
            "<?xml version=\"1.0\"?>\n<!-- header -->\n<a x=\"1\">\n  <b y='2'>hi &amp; bye</b>\n  <c/>\n</a>\n",
        )
        .unwrap();

        assert_eq!(root.name, "a");
        assert_eq!(root.attr("x"), Some("1"));
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].text, "hi & bye");
        assert_eq!(root.children[0].line, 4);
        assert_eq!(root.children[0].column, 3);
        assert_eq!(root.children[1].name, "c");
    }

    #[test]
    fn test_text_is_preserved() {
        let root = parse_document("<v>  two  spaces\t</v>").unwrap();
        assert_eq!(root.text, "  two  spaces\t");
    }

    #[test]
    fn test_entities() {
        assert_eq!(unescape("&lt;&gt;&quot;&apos;&#65;&#x42;").unwrap(), "<>\"'AB");
        assert!(unescape("&bogus;").is_err());
        assert!(unescape("a & b").is_err());
    }

    #[test]
    fn test_mismatched_close_reports_position() {
        let err = parse_document("<a>\n  <b></c>\n</a>").unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.context, "b");
        assert!(err.message.contains("mismatched"));
    }

    #[test]
    fn test_unclosed_and_trailing_content() {
        assert!(parse_document("<a><b/>").is_err());
        assert!(parse_document("<a/><b/>").is_err());
        assert!(parse_document("   ").is_err());
        assert!(parse_document("<a x=1/>").is_err());
    }

    #[test]
    fn test_text_position_is_recorded() {
        let root = parse_document("<a>\n  <b/>\n  stray <c/></a>").unwrap();

        assert_eq!(root.text_at, Some((3, 3)));
        let err = root.expect_no_text().unwrap_err();
        assert_eq!((err.line, err.column), (3, 3));
        assert_eq!(err.context, "a");
        assert!(root.children[0].expect_no_text().is_ok());
    }

    #[test]
    fn test_duplicate_attribute() {
        let err = parse_document(r#"<a x="1" x="2"/>"#).unwrap_err();
        assert!(err.message.contains("duplicate"));
    }
}
