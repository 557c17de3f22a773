//! # N-Triples Lexing
//!
//! Line-level reader for the N-Triples syntax, shared by the graph builder and
//! the pattern query engine. Pattern queries reuse the same lexer with `?var`
//! tokens enabled.

use crate::{Literal, ParseError, Term, Triple};

/// A lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    Term(Term),
    Var(String),
    Dot,
}

/// Character cursor over one input string.
pub(crate) struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    allow_vars: bool,
}

impl<'a> Lexer<'a> {
    pub(crate) fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            allow_vars: false,
        }
    }

    /// Lexer that also accepts `?name` and `$name` variables.
    pub(crate) fn with_vars(src: &'a str) -> Self {
        Self {
            allow_vars: true,
            ..Self::new(src)
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        &self.src[start..self.pos]
    }

    fn skip_trivia(&mut self) {
        loop {
            self.take_while(char::is_whitespace);
            if self.peek() == Some('#') {
                self.take_while(|c| c != '\n');
            } else {
                return;
            }
        }
    }

    /// Next token, or `None` at end of input.
    pub(crate) fn next_token(&mut self) -> Result<Option<Token>, String> {
        self.skip_trivia();

        let Some(c) = self.peek() else {
            return Ok(None);
        };

        let token = match c {
            '<' => Token::Term(Term::Iri(self.iri()?)),
            '_' => Token::Term(self.blank()?),
            '"' => Token::Term(self.literal()?),
            '.' => {
                self.bump();
                Token::Dot
            }
            '?' | '$' if self.allow_vars => {
                self.bump();
                let name = self.take_while(is_name_char);
                if name.is_empty() {
                    return Err("empty variable name".to_string());
                }
                Token::Var(name.to_string())
            }
            other => return Err(format!("unexpected character '{other}'")),
        };

        Ok(Some(token))
    }

    fn iri(&mut self) -> Result<String, String> {
        self.bump();
        let iri = self.take_while(|c| c != '>' && !c.is_whitespace());
        if !self.eat('>') {
            return Err("unterminated IRI".to_string());
        }
        if iri.is_empty() {
            return Err("empty IRI".to_string());
        }
        Ok(iri.to_string())
    }

    fn blank(&mut self) -> Result<Term, String> {
        self.bump();
        if !self.eat(':') {
            return Err("expected ':' after '_'".to_string());
        }
        let label = self.take_while(is_name_char);
        if label.is_empty() {
            return Err("empty blank node label".to_string());
        }
        Ok(Term::Blank(label.to_string()))
    }

    fn literal(&mut self) -> Result<Term, String> {
        self.bump();
        let mut lexical = String::new();

        loop {
            match self.bump() {
                None => return Err("unterminated literal".to_string()),
                Some('"') => break,
                Some('\\') => lexical.push(self.escape()?),
                Some(c) => lexical.push(c),
            }
        }

        let mut literal = Literal::plain(lexical);
        if self.eat('@') {
            let tag = self.take_while(|c| c.is_ascii_alphanumeric() || c == '-');
            if tag.is_empty() {
                return Err("empty language tag".to_string());
            }
            literal.language = Some(tag.to_string());
        } else if self.eat('^') {
            if !self.eat('^') || self.peek() != Some('<') {
                return Err("expected '^^<datatype>'".to_string());
            }
            literal.datatype = Some(self.iri()?);
        }

        Ok(Term::Literal(literal))
    }

    fn escape(&mut self) -> Result<char, String> {
        match self.bump() {
            Some('t') => Ok('\t'),
            Some('n') => Ok('\n'),
            Some('r') => Ok('\r'),
            Some('b') => Ok('\u{8}'),
            Some('f') => Ok('\u{c}'),
            Some('"') => Ok('"'),
            Some('\'') => Ok('\''),
            Some('\\') => Ok('\\'),
            Some('u') => self.unicode(4),
            Some('U') => self.unicode(8),
            Some(other) => Err(format!("invalid escape '\\{other}'")),
            None => Err("unterminated escape".to_string()),
        }
    }

    fn unicode(&mut self, digits: usize) -> Result<char, String> {
        let end = self.pos + digits;
        let hex = self
            .src
            .get(self.pos..end)
            .ok_or_else(|| "truncated unicode escape".to_string())?;
        let code = u32::from_str_radix(hex, 16).map_err(|_| format!("invalid hex '{hex}'"))?;
        self.pos = end;
        char::from_u32(code).ok_or_else(|| format!("invalid code point {code:#x}"))
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

/// Parse one N-Triples line. Blank lines and comments yield `None`.
pub(crate) fn parse_line(line: &str) -> Result<Option<Triple>, String> {
    let mut lexer = Lexer::new(line);

    let subject = match lexer.next_token()? {
        None => return Ok(None),
        Some(Token::Term(term)) if term.is_resource() => term,
        Some(_) => return Err("subject must be an IRI or blank node".to_string()),
    };

    let predicate = match lexer.next_token()? {
        Some(Token::Term(Term::Iri(iri))) => iri,
        _ => return Err("predicate must be an IRI".to_string()),
    };

    let object = match lexer.next_token()? {
        Some(Token::Term(term)) => term,
        _ => return Err("missing object".to_string()),
    };

    if lexer.next_token()? != Some(Token::Dot) {
        return Err("expected '.' at end of statement".to_string());
    }
    if lexer.next_token()?.is_some() {
        return Err("trailing content after '.'".to_string());
    }

    Ok(Some(Triple::new(subject, predicate, object)))
}

/// Parse a whole N-Triples document, failing on the first malformed line.
pub fn parse_document(text: &str) -> Result<Vec<Triple>, ParseError> {
    let mut triples = Vec::new();
    for (index, line) in text.lines().enumerate() {
        match parse_line(line) {
            Ok(Some(triple)) => triples.push(triple),
            Ok(None) => {}
            Err(message) => {
                return Err(ParseError::Syntax {
                    line: index + 1,
                    message,
                });
            }
        }
    }
    Ok(triples)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_iri_statement() {
        let triple = parse_line("<http://a> <http://p> <http://b> .")
            .expect("parse")
            .expect("triple");
        assert_eq!(triple.subject, Term::iri("http://a"));
        assert_eq!(triple.predicate, "http://p");
        assert_eq!(triple.object, Term::iri("http://b"));
    }

    #[test]
    fn parses_typed_and_tagged_literals() {
        let triple = parse_line(r#"_:x <http://p> "3"^^<http://www.w3.org/2001/XMLSchema#int> ."#)
            .expect("parse")
            .expect("triple");
        let Term::Literal(literal) = triple.object else {
            unreachable!("object is a literal");
        };
        assert_eq!(literal.lexical, "3");
        assert_eq!(
            literal.datatype.as_deref(),
            Some("http://www.w3.org/2001/XMLSchema#int")
        );

        let triple = parse_line(r#"_:x <http://p> "chat"@fr ."#)
            .expect("parse")
            .expect("triple");
        assert_eq!(
            triple.object,
            Term::Literal(Literal {
                lexical: "chat".to_string(),
                language: Some("fr".to_string()),
                datatype: None,
            })
        );
    }

    #[test]
    fn unescapes_literal() {
        let triple = parse_line(r#"<http://a> <http://p> "a\"b\né" ."#)
            .expect("parse")
            .expect("triple");
        assert_eq!(triple.object, Term::literal("a\"b\né"));
    }

    #[test]
    fn skips_blank_and_comment_lines() {
        assert_eq!(parse_line("").expect("parse"), None);
        assert_eq!(parse_line("   # comment").expect("parse"), None);
    }

    #[test]
    fn rejects_literal_subject() {
        assert!(parse_line(r#""x" <http://p> <http://b> ."#).is_err());
    }

    #[test]
    fn rejects_missing_dot() {
        assert!(parse_line("<http://a> <http://p> <http://b>").is_err());
    }

    #[test]
    fn rejects_variables_outside_patterns() {
        assert!(parse_line("?s <http://p> <http://b> .").is_err());
    }

    #[test]
    fn variables_lex_in_pattern_mode() {
        let mut lexer = Lexer::with_vars("?who");
        assert_eq!(
            lexer.next_token().expect("lex"),
            Some(Token::Var("who".to_string()))
        );
    }

    #[test]
    fn document_error_reports_line_number() {
        let text = "<http://a> <http://p> <http://b> .\n\nnot a triple\n";
        match parse_document(text) {
            Err(ParseError::Syntax { line, .. }) => assert_eq!(line, 3),
            other => unreachable!("expected syntax error, got {other:?}"),
        }
    }
}
