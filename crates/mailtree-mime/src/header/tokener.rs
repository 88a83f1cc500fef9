//! Token recording with checkpoint and rollback.
//!
//! Grammar productions that name a token commit its span only once the
//! production has matched. An enclosing production that later fails restores
//! the checkpoint it took on entry, which discards everything committed since.

use std::cmp::Ordering;

/// Kinds of committed spans, in containment order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TokenKind {
    /// A parenthesized comment, including nested comments.
    Comment,
    /// A display name or other phrase.
    Phrase,
    /// A run of atext inside a phrase.
    PhraseAtom,
    /// An obsolete run of atext and dots inside a phrase.
    PhraseAtomOrDot,
    /// A named group of mailboxes.
    Group,
    /// A single mailbox (`name-addr` or `addr-spec`).
    Mailbox,
    /// A quoted string, from opening to closing quote.
    QuotedString,
    /// The local part of an address.
    LocalPart,
    /// The domain of an address.
    Domain,
}

/// A committed span of the field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    /// Production that matched.
    pub kind: TokenKind,
    /// Start byte offset.
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

impl Token {
    /// Whether `other` lies within this token's span.
    #[must_use]
    pub const fn contains(&self, other: &Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// The token's text.
    #[must_use]
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.start..self.end).unwrap_or_default()
    }
}

/// Document order: earlier start first, then the containing (longer) span,
/// then the lower kind.
fn document_order(a: &Token, b: &Token) -> Ordering {
    a.start
        .cmp(&b.start)
        .then_with(|| b.end.cmp(&a.end))
        .then_with(|| a.kind.cmp(&b.kind))
}

/// Opaque tokener state to roll back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

/// Stack of committed tokens.
#[derive(Debug, Default)]
pub struct Tokener {
    tokens: Vec<Token>,
}

impl Tokener {
    /// Creates an empty tokener.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the current stack height.
    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.tokens.len())
    }

    /// Drops every token committed after `checkpoint`.
    pub fn restore(&mut self, checkpoint: Checkpoint) {
        debug_assert!(checkpoint.0 <= self.tokens.len(), "restore cannot redo");
        self.tokens.truncate(checkpoint.0);
    }

    /// Commits a span.
    pub fn commit(&mut self, kind: TokenKind, start: usize, end: usize) {
        self.tokens.push(Token { kind, start, end });
    }

    /// Number of committed tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether nothing has been committed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Returns the committed tokens in document order, containers first.
    #[must_use]
    pub fn finish(mut self) -> Vec<Token> {
        self.tokens.sort_by(document_order);
        self.tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restore_truncates() {
        let mut tokener = Tokener::new();
        tokener.commit(TokenKind::Domain, 4, 9);
        let checkpoint = tokener.checkpoint();
        tokener.commit(TokenKind::LocalPart, 0, 3);
        tokener.commit(TokenKind::Mailbox, 0, 9);
        assert_eq!(tokener.len(), 3);
        tokener.restore(checkpoint);
        assert_eq!(tokener.len(), 1);
        tokener.restore(checkpoint);
        assert_eq!(tokener.len(), 1);
    }

    #[test]
    fn test_finish_orders_containers_first() {
        let mut tokener = Tokener::new();
        // Committed innermost first, as the grammar does.
        tokener.commit(TokenKind::PhraseAtom, 0, 3);
        tokener.commit(TokenKind::Phrase, 0, 4);
        tokener.commit(TokenKind::LocalPart, 5, 6);
        tokener.commit(TokenKind::Domain, 7, 8);
        tokener.commit(TokenKind::Mailbox, 0, 9);
        let kinds: Vec<_> = tokener.finish().into_iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            [
                TokenKind::Mailbox,
                TokenKind::Phrase,
                TokenKind::PhraseAtom,
                TokenKind::LocalPart,
                TokenKind::Domain,
            ]
        );
    }

    #[test]
    fn test_equal_spans_sort_by_kind() {
        let mut tokener = Tokener::new();
        tokener.commit(TokenKind::QuotedString, 0, 5);
        tokener.commit(TokenKind::LocalPart, 0, 5);
        tokener.commit(TokenKind::Mailbox, 0, 5);
        let tokens = tokener.finish();
        assert_eq!(tokens[0].kind, TokenKind::Mailbox);
        assert_eq!(tokens[1].kind, TokenKind::QuotedString);
        assert_eq!(tokens[2].kind, TokenKind::LocalPart);
        assert!(tokens[0].contains(&tokens[2]));
    }
}
