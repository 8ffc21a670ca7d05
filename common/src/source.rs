// Copyright (c) 2021 The mead authors

//! A source manager that assigns an opaque ID to each processed source
//! buffer. This keeps source locations lean and allows for simple querying
//! of path and line information.

use crate::name::RcStr;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub const INVALID_SOURCE: Source = Source(0);
pub const INVALID_LOCATION: Location = Location {
    source: INVALID_SOURCE,
    offset: 0,
};
pub const INVALID_SPAN: Span = Span {
    source: INVALID_SOURCE,
    begin: 0,
    end: 0,
};

/// An opaque handle to a source buffer registered with a [`SourceManager`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Source(pub u32);

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.0 > 0 {
            write!(f, "Source({})", self.0)
        } else {
            write!(f, "Source(INVALID)")
        }
    }
}

/// A byte position within a source buffer.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Location {
    pub source: Source,
    pub offset: u32,
}

impl Location {
    pub fn new(source: Source, offset: u32) -> Location {
        Location { source, offset }
    }
}

/// A byte range within a source buffer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Span {
    pub source: Source,
    pub begin: u32,
    pub end: u32,
}

impl Span {
    pub fn new(source: Source, begin: u32, end: u32) -> Span {
        Span { source, begin, end }
    }

    /// Form the smallest span that covers both input spans.
    pub fn union<S: Into<Span>>(a: S, b: S) -> Span {
        let (a, b) = (a.into(), b.into());
        assert_eq!(a.source, b.source);
        Span {
            source: a.source,
            begin: std::cmp::min(a.begin, b.begin),
            end: std::cmp::max(a.end, b.end),
        }
    }

    /// The location of the first byte covered by this span.
    pub fn loc(self) -> Location {
        Location {
            source: self.source,
            offset: self.begin,
        }
    }
}

/// A wrapper that associates a span with a value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Spanned<T> {
    pub value: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    /// Wrap a given value together with the span it covers.
    pub fn new(value: T, span: Span) -> Spanned<T> {
        Spanned { value, span }
    }

    /// Map the value, preserving the span.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Spanned<U> {
        Spanned::new(f(self.value), self.span)
    }
}

struct SourceFile {
    path: RcStr,
    content: Rc<String>,
}

/// Keeps track of source buffers and hands out IDs for them.
///
/// Every compilation refers to exactly one source manager; locations from
/// different managers must never be mixed. The manager owns the buffer
/// contents so that diagnostics can be mapped back to lines and columns.
pub struct SourceManager {
    files: RefCell<Vec<SourceFile>>,
}

impl SourceManager {
    /// Create a new empty source manager.
    pub fn new() -> SourceManager {
        SourceManager {
            files: RefCell::new(Vec::new()),
        }
    }

    /// Register a text buffer under the given path and return its handle.
    pub fn add_text(&self, path: &str, content: &str) -> Source {
        let mut files = self.files.borrow_mut();
        files.push(SourceFile {
            path: RcStr::new(path),
            content: Rc::new(content.to_string()),
        });
        Source(files.len() as u32)
    }

    /// Return the path a source buffer was registered under.
    pub fn get_path(&self, source: Source) -> RcStr {
        self.files.borrow()[source.0 as usize - 1].path.clone()
    }

    /// Access the contents of a source buffer.
    pub fn get_content(&self, source: Source) -> Rc<String> {
        self.files.borrow()[source.0 as usize - 1].content.clone()
    }

    /// Map a location to a 1-based line and column pair.
    pub fn line_col(&self, loc: Location) -> (usize, usize) {
        let content = self.get_content(loc.source);
        let mut line = 1;
        let mut col = 1;
        for (i, c) in content.char_indices() {
            if i as u32 >= loc.offset {
                break;
            }
            if c == '\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
        }
        (line, col)
    }
}

impl Default for SourceManager {
    fn default() -> SourceManager {
        SourceManager::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_col_mapping() {
        let sm = SourceManager::new();
        let src = sm.add_text("test.sv", "module m;\n  int x;\nendmodule\n");
        assert_eq!(sm.line_col(Location::new(src, 0)), (1, 1));
        assert_eq!(sm.line_col(Location::new(src, 12)), (2, 3));
        assert_eq!(&sm.get_path(src)[..], "test.sv");
    }

    #[test]
    fn span_union() {
        let a = Span::new(Source(1), 4, 8);
        let b = Span::new(Source(1), 6, 12);
        let u = Span::union(a, b);
        assert_eq!((u.begin, u.end), (4, 12));
        assert_eq!(u.loc().offset, 4);
    }
}
