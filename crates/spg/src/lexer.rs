use crate::span::Span;

/// Cursor over grammar text. Positions are byte offsets and always lie on char boundaries.
pub struct Lexer<'a> {
    str: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(str: &'a str) -> Self {
        Self { str, pos: 0 }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn span_since(&self, start: usize) -> Span {
        Span::new(start, self.pos)
    }

    pub fn is_empty(&self) -> bool {
        self.pos == self.str.len()
    }

    pub fn rest(&self) -> &'a str {
        &self.str[self.pos..]
    }

    pub fn next(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub fn consume(&mut self, value: char) -> bool {
        if self.peek() == Some(value) {
            self.next();
            true
        } else {
            false
        }
    }

    pub fn consume_while(&mut self, predicate: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if predicate(c) {
                self.next();
            } else {
                break;
            }
        }
        &self.str[start..self.pos]
    }

    pub fn skip_whitespace(&mut self) {
        self.consume_while(|c| c.is_ascii_whitespace());
    }
}

#[test]
fn test_lexer() {
    let mut lexer = Lexer::new("[or, é]");
    assert!(lexer.consume('['));
    assert_eq!(lexer.consume_while(|c| c != ','), "or");
    assert!(!lexer.consume('x'));
    assert!(lexer.consume(','));
    lexer.skip_whitespace();
    let start = lexer.pos();
    assert_eq!(lexer.next(), Some('é'));
    assert_eq!(lexer.span_since(start), Span::new(5, 7));
    assert_eq!(lexer.rest(), "]");
    assert!(!lexer.is_empty());
}
