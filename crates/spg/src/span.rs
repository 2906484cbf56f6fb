use std::{fmt::Display, ops::Deref};

/// Byte range into a grammar source.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Span {
    start: u32,
    end: u32,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Span {
        debug_assert!(start <= end);
        Self {
            start: start as u32,
            end: end as u32,
        }
    }
    pub fn at(pos: usize) -> Span {
        Self::new(pos, pos)
    }
    pub fn is_empty(self) -> bool {
        self.start >= self.end
    }
    #[track_caller]
    pub fn as_str(self, src: &str) -> &str {
        &src[self.start as usize..self.end as usize]
    }
    pub fn start(self) -> usize {
        self.start as usize
    }
    pub fn end(self) -> usize {
        self.end as usize
    }
    /// Smallest span covering both.
    pub fn join(self, other: Span) -> Span {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
    /// One-based line and column (in chars) of the span start.
    pub fn line_col(self, src: &str) -> (usize, usize) {
        let offset = (self.start as usize).min(src.len());
        let before = &src[..floor_char_boundary(src, offset)];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let column = before[line_start..].chars().count() + 1;
        (line, column)
    }
}

fn floor_char_boundary(src: &str, mut offset: usize) -> usize {
    while !src.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

impl Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Spanned<T> {
    pub inner: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(value: T, span: Span) -> Spanned<T> {
        Spanned { inner: value, span }
    }
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Spanned<U> {
        Spanned {
            inner: f(self.inner),
            span: self.span,
        }
    }
}

impl<T> Deref for Spanned<T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col() {
        let src = "A = 'a'\nB = OR[\n  A]";
        assert_eq!(Span::at(0).line_col(src), (1, 1));
        assert_eq!(Span::at(4).line_col(src), (1, 5));
        assert_eq!(Span::at(8).line_col(src), (2, 1));
        assert_eq!(Span::at(18).line_col(src), (3, 3));
    }

    #[test]
    fn test_join() {
        let span = Span::new(4, 6).join(Span::new(1, 5));
        assert_eq!(span, Span::new(1, 6));
        assert_eq!(span.as_str("0123456789"), "12345");
    }
}
