//! RFC 5322 header grammar as backtracking recursive descent.
//!
//! Every production has the shape `fn(&mut Parser<'_>, usize) -> Option<usize>`:
//! given a start offset it returns the offset just past its match, or `None`
//! if it does not match. A production may match the empty string. Failure is
//! ordinary control flow and allocates nothing; the combinators on [`Parser`]
//! take a tokener checkpoint before each alternative and roll it back when
//! the alternative fails, so tokens survive only inside successful matches.
//!
//! Non-ASCII characters are accepted wherever RFC 6532 extends `atext`,
//! `qtext`, `ctext` and `dtext`. Values are expected unfolded, but folding
//! white space (`CRLF WSP`) is still recognized.

use super::tokener::{Token, TokenKind, Tokener};

/// A grammar production.
pub type Rule = fn(&mut Parser<'_>, usize) -> Option<usize>;

/// Deepest comment nesting accepted.
const MAX_NESTING: usize = 64;

const DAY_NAMES: &[&str] = &["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

const MONTH_NAMES: &[&str] = &[
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Obsolete alphabetic zones, longest first where one prefixes another.
const OBS_ZONES: &[&str] = &[
    "UTC", "UT", "GMT", "EST", "EDT", "CST", "CDT", "MST", "MDT", "PST", "PDT",
];

/// Parse state for one field value.
#[derive(Debug)]
pub struct Parser<'a> {
    text: &'a str,
    tokens: Tokener,
    depth: usize,
}

impl<'a> Parser<'a> {
    /// Creates a parser over a field value.
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            tokens: Tokener::new(),
            depth: 0,
        }
    }

    /// The text being parsed.
    #[must_use]
    pub const fn text(&self) -> &'a str {
        self.text
    }

    /// Offset one past the last byte.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.text.len()
    }

    fn byte(&self, i: usize) -> Option<u8> {
        self.text.as_bytes().get(i).copied()
    }

    fn char_at(&self, i: usize) -> Option<char> {
        self.text.get(i..)?.chars().next()
    }

    /// Matches one ASCII byte.
    #[must_use]
    pub fn literal(&self, i: usize, byte: u8) -> Option<usize> {
        (self.byte(i)? == byte).then_some(i + 1)
    }

    /// Matches an ASCII word case-insensitively.
    #[must_use]
    pub fn keyword(&self, i: usize, word: &str) -> Option<usize> {
        let end = i + word.len();
        self.text
            .get(i..end)?
            .eq_ignore_ascii_case(word)
            .then_some(end)
    }

    /// Matches one character of a class.
    #[must_use]
    pub fn class(&self, i: usize, pred: fn(char) -> bool) -> Option<usize> {
        let c = self.char_at(i)?;
        pred(c).then(|| i + c.len_utf8())
    }

    /// Matches zero or more characters of a class.
    #[must_use]
    pub fn run(&self, i: usize, pred: fn(char) -> bool) -> usize {
        let mut j = i;
        while let Some(next) = self.class(j, pred) {
            j = next;
        }
        j
    }

    /// Matches one or more characters of a class.
    #[must_use]
    pub fn run1(&self, i: usize, pred: fn(char) -> bool) -> Option<usize> {
        let j = self.run(i, pred);
        (j > i).then_some(j)
    }

    /// Matches between `min` and `max` ASCII digits.
    #[must_use]
    pub fn digits(&self, i: usize, min: usize, max: usize) -> Option<usize> {
        let mut j = i;
        while j - i < max && self.byte(j).is_some_and(|b| b.is_ascii_digit()) {
            j += 1;
        }
        (j - i >= min).then_some(j)
    }

    /// Runs `rule`, discarding the tokens it committed if it fails.
    pub fn attempt(
        &mut self,
        i: usize,
        rule: impl FnOnce(&mut Self, usize) -> Option<usize>,
    ) -> Option<usize> {
        let checkpoint = self.tokens.checkpoint();
        let result = rule(self, i);
        if result.is_none() {
            self.tokens.restore(checkpoint);
        }
        result
    }

    /// Ordered choice: the first alternative that matches wins.
    pub fn alt(&mut self, i: usize, rules: &[Rule]) -> Option<usize> {
        rules.iter().find_map(|rule| self.attempt(i, *rule))
    }

    /// Optional match; returns `i` unchanged when `rule` fails.
    pub fn opt(&mut self, i: usize, rule: impl FnOnce(&mut Self, usize) -> Option<usize>) -> usize {
        self.attempt(i, rule).unwrap_or(i)
    }

    /// Zero or more repetitions, stopping at the first failure or empty match.
    pub fn many0(
        &mut self,
        i: usize,
        mut rule: impl FnMut(&mut Self, usize) -> Option<usize>,
    ) -> usize {
        let mut j = i;
        while let Some(next) = self.attempt(j, &mut rule) {
            if next == j {
                break;
            }
            j = next;
        }
        j
    }

    /// One or more non-empty repetitions.
    pub fn many1(
        &mut self,
        i: usize,
        rule: impl FnMut(&mut Self, usize) -> Option<usize>,
    ) -> Option<usize> {
        let j = self.many0(i, rule);
        (j > i).then_some(j)
    }

    /// Runs `rule` and commits its span as a token on success.
    pub fn token(
        &mut self,
        kind: TokenKind,
        i: usize,
        rule: impl FnOnce(&mut Self, usize) -> Option<usize>,
    ) -> Option<usize> {
        let j = self.attempt(i, rule)?;
        self.tokens.commit(kind, i, j);
        Some(j)
    }

    fn commit(&mut self, kind: TokenKind, start: usize, end: usize) {
        self.tokens.commit(kind, start, end);
    }

    fn nested(
        &mut self,
        i: usize,
        rule: impl FnOnce(&mut Self, usize) -> Option<usize>,
    ) -> Option<usize> {
        if self.depth >= MAX_NESTING {
            return None;
        }
        self.depth += 1;
        let result = self.attempt(i, rule);
        self.depth -= 1;
        result
    }

    /// Runs `rule` over the whole text. Returns the committed tokens in
    /// document order if it matched every byte.
    #[must_use]
    pub fn parse_all(mut self, rule: Rule) -> Option<Vec<Token>> {
        let end = self.attempt(0, rule)?;
        (end == self.text.len()).then(|| self.tokens.finish())
    }
}

/// Whether `rule` matches all of `text`.
#[must_use]
pub fn matches(text: &str, rule: Rule) -> bool {
    Parser::new(text).parse_all(rule).is_some()
}

/// Parses all of `text` with `rule`, returning the committed tokens.
#[must_use]
pub fn parse(text: &str, rule: Rule) -> Option<Vec<Token>> {
    Parser::new(text).parse_all(rule)
}

// Character classes.

/// Space or horizontal tab.
#[must_use]
pub const fn is_wsp(c: char) -> bool {
    matches!(c, ' ' | '\t')
}

/// Control characters other than white space, CR and LF.
#[must_use]
pub const fn is_obs_no_ws_ctl(c: char) -> bool {
    matches!(c, '\u{1}'..='\u{8}' | '\u{b}' | '\u{c}' | '\u{e}'..='\u{1f}' | '\u{7f}')
}

/// Atom characters.
#[must_use]
pub const fn is_atext(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            '!' | '#'
                | '$'
                | '%'
                | '&'
                | '\''
                | '*'
                | '+'
                | '-'
                | '/'
                | '='
                | '?'
                | '^'
                | '_'
                | '`'
                | '{'
                | '|'
                | '}'
                | '~'
        )
        || !c.is_ascii()
}

const fn is_atext_or_dot(c: char) -> bool {
    c == '.' || is_atext(c)
}

/// Comment text.
#[must_use]
pub const fn is_ctext(c: char) -> bool {
    matches!(c, '!'..='\'' | '*'..='[' | ']'..='~') || is_obs_no_ws_ctl(c) || !c.is_ascii()
}

/// Quoted-string text.
#[must_use]
pub const fn is_qtext(c: char) -> bool {
    matches!(c, '!' | '#'..='[' | ']'..='~') || is_obs_no_ws_ctl(c) || !c.is_ascii()
}

/// Domain-literal text.
#[must_use]
pub const fn is_dtext(c: char) -> bool {
    matches!(c, '!'..='Z' | '^'..='~') || is_obs_no_ws_ctl(c) || !c.is_ascii()
}

/// MIME `tspecials` (RFC 2045 5.1).
#[must_use]
pub const fn is_tspecial(c: char) -> bool {
    matches!(
        c,
        '(' | ')' | '<' | '>' | '@' | ',' | ';' | ':' | '\\' | '"' | '/' | '[' | ']' | '?' | '='
    )
}

/// MIME `token` characters.
#[must_use]
pub const fn is_token_char(c: char) -> bool {
    matches!(c, '!'..='~') && !is_tspecial(c)
}

/// RFC 2231 `attribute-char`.
const fn is_attribute_char(c: char) -> bool {
    is_token_char(c) && !matches!(c, '*' | '\'' | '%')
}

/// Unquoted parameter value. Covers MIME tokens and the unquoted tspecials
/// that real mailers put in boundaries.
const fn is_lenient_value_char(c: char) -> bool {
    !matches!(c, ';' | '"' | ' ' | '\t' | '\r' | '\n' | '(' | ')') && !c.is_ascii_control()
}

const fn is_ldh(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-'
}

const fn is_dkim_valchar(c: char) -> bool {
    matches!(c, '!'..=':' | '<'..='~')
}

const fn is_dkim_tag_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

const fn is_military_zone(c: char) -> bool {
    c.is_ascii_alphabetic() && !matches!(c, 'J' | 'j')
}

// White space and comments.

/// Folding white space.
pub fn fws(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let mut j = i;
    loop {
        match p.byte(j) {
            Some(b' ' | b'\t') => j += 1,
            Some(b'\r') if p.byte(j + 1) == Some(b'\n') && matches!(p.byte(j + 2), Some(b' ' | b'\t')) => {
                j += 3;
            }
            _ => break,
        }
    }
    (j > i).then_some(j)
}

fn ctext(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    p.run1(i, is_ctext)
}

fn qtext(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    p.run1(i, is_qtext)
}

fn dtext(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    p.run1(i, is_dtext)
}

/// A backslash followed by any character.
pub fn quoted_pair(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = p.literal(i, b'\\')?;
    let c = p.char_at(j)?;
    Some(j + c.len_utf8())
}

/// A parenthesized comment.
pub fn comment(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    p.nested(i, |p, i| {
        let mut j = p.literal(i, b'(')?;
        loop {
            let k = p.opt(j, fws);
            if let Some(next) = p.alt(k, &[ctext, quoted_pair, comment]) {
                j = next;
            } else {
                j = k;
                break;
            }
        }
        let end = p.literal(j, b')')?;
        p.commit(TokenKind::Comment, i, end);
        Some(end)
    })
}

/// Comments and folding white space. The comment-bearing alternative is
/// tried first.
pub fn cfws(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    p.alt(i, &[cfws_with_comments, fws])
}

fn cfws_with_comments(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = p.many1(i, fws_comment)?;
    Some(p.opt(j, fws))
}

fn fws_comment(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = p.opt(i, fws);
    comment(p, j)
}

fn ocfws(p: &mut Parser<'_>, i: usize) -> usize {
    p.opt(i, cfws)
}

// Atoms, quoted strings and phrases.

/// `[CFWS] 1*atext [CFWS]`.
pub fn atom(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let s = ocfws(p, i);
    let e = p.run1(s, is_atext)?;
    Some(ocfws(p, e))
}

/// `1*atext *("." 1*atext)`.
pub fn dot_atom_text(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = p.run1(i, is_atext)?;
    Some(p.many0(j, dot_atext))
}

fn dot_atext(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = p.literal(i, b'.')?;
    p.run1(j, is_atext)
}

/// `[CFWS] dot-atom-text [CFWS]`.
pub fn dot_atom(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let s = ocfws(p, i);
    let e = dot_atom_text(p, s)?;
    Some(ocfws(p, e))
}

fn qcontent(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    p.alt(i, &[qtext, quoted_pair])
}

/// `[CFWS] DQUOTE *([FWS] qcontent) [FWS] DQUOTE [CFWS]`; the token covers
/// the quotes and what lies between them.
pub fn quoted_string(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let start = ocfws(p, i);
    let mut j = p.literal(start, b'"')?;
    loop {
        let k = p.opt(j, fws);
        if let Some(next) = p.attempt(k, qcontent) {
            j = next;
        } else {
            j = k;
            break;
        }
    }
    let end = p.literal(j, b'"')?;
    p.commit(TokenKind::QuotedString, start, end);
    Some(ocfws(p, end))
}

/// `atom / quoted-string`.
pub fn word(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    p.alt(i, &[atom, quoted_string])
}

/// `1*word`, or the obsolete form with dots and comments between words.
pub fn phrase(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    p.attempt(i, |p, i| {
        let mut j = phrase_word(p, i)?;
        while let Some(next) = p.alt(j, &[phrase_word, phrase_dots]) {
            j = next;
        }
        p.commit(TokenKind::Phrase, i, j);
        Some(j)
    })
}

fn phrase_word(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    p.alt(i, &[phrase_atom, quoted_string])
}

fn phrase_atom(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let s = ocfws(p, i);
    let e = p.run1(s, is_atext)?;
    p.commit(TokenKind::PhraseAtom, s, e);
    Some(ocfws(p, e))
}

fn phrase_dots(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let s = ocfws(p, i);
    p.literal(s, b'.')?;
    let e = p.run(s, is_atext_or_dot);
    p.commit(TokenKind::PhraseAtomOrDot, s, e);
    Some(ocfws(p, e))
}

// Addresses.

/// Local part of an address.
pub fn local_part(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    p.token(TokenKind::LocalPart, i, |p, i| {
        p.alt(i, &[obs_local_part, dot_atom, quoted_string])
    })
}

fn obs_local_part(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = word(p, i)?;
    Some(p.many0(j, dot_word))
}

fn dot_word(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = p.literal(i, b'.')?;
    word(p, j)
}

/// Domain of an address.
pub fn domain(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    p.token(TokenKind::Domain, i, domain_inner)
}

fn domain_inner(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    p.alt(i, &[obs_domain, domain_literal, dot_atom])
}

fn obs_domain(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = atom(p, i)?;
    Some(p.many0(j, dot_atom_part))
}

fn dot_atom_part(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = p.literal(i, b'.')?;
    atom(p, j)
}

/// `[CFWS] "[" *([FWS] dtext) [FWS] "]" [CFWS]`.
pub fn domain_literal(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let s = ocfws(p, i);
    let mut j = p.literal(s, b'[')?;
    loop {
        let k = p.opt(j, fws);
        if let Some(next) = p.alt(k, &[dtext, quoted_pair]) {
            j = next;
        } else {
            j = k;
            break;
        }
    }
    let e = p.literal(j, b']')?;
    Some(ocfws(p, e))
}

/// `local-part "@" domain`.
pub fn addr_spec(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = local_part(p, i)?;
    let j = p.literal(j, b'@')?;
    domain(p, j)
}

/// `[CFWS] "<" [obs-route] addr-spec ">" [CFWS]`.
pub fn angle_addr(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let s = ocfws(p, i);
    let j = p.literal(s, b'<')?;
    let j = p.opt(j, obs_route);
    let j = addr_spec(p, j)?;
    let e = p.literal(j, b'>')?;
    Some(ocfws(p, e))
}

fn obs_route(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = obs_domain_list(p, i)?;
    p.literal(j, b':')
}

fn obs_domain_list(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = p.many0(i, cfws_or_comma);
    let j = at_domain(p, j)?;
    Some(p.many0(j, route_continuation))
}

fn comma(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    p.literal(i, b',')
}

fn cfws_or_comma(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    p.alt(i, &[cfws, comma])
}

fn at_domain(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = p.literal(i, b'@')?;
    domain_inner(p, j)
}

fn route_continuation(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = p.literal(i, b',')?;
    let j = ocfws(p, j);
    Some(p.opt(j, at_domain))
}

/// `[display-name] angle-addr`.
pub fn name_addr(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = p.opt(i, phrase);
    angle_addr(p, j)
}

/// `name-addr / addr-spec`.
pub fn mailbox(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    p.token(TokenKind::Mailbox, i, |p, i| p.alt(i, &[name_addr, addr_spec]))
}

fn cfws_comma(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = ocfws(p, i);
    p.literal(j, b',')
}

/// Comma-separated mailboxes, tolerating the obsolete empty elements.
pub fn mailbox_list(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = p.many0(i, cfws_comma);
    let j = mailbox(p, j)?;
    Some(p.many0(j, mailbox_list_tail))
}

fn mailbox_list_tail(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = p.literal(i, b',')?;
    Some(p.opt(j, mailbox_or_cfws))
}

fn mailbox_or_cfws(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    p.alt(i, &[mailbox, cfws])
}

/// `display-name ":" [group-list] ";" [CFWS]`.
pub fn group(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    p.token(TokenKind::Group, i, |p, i| {
        let j = phrase(p, i)?;
        let j = p.literal(j, b':')?;
        let j = p.opt(j, group_list);
        let j = p.literal(j, b';')?;
        Some(ocfws(p, j))
    })
}

fn group_list(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    p.alt(i, &[mailbox_list, obs_group_list, cfws])
}

fn obs_group_list(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = p.many1(i, cfws_comma)?;
    Some(ocfws(p, j))
}

/// `mailbox / group`.
pub fn address(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    p.alt(i, &[group, mailbox])
}

/// Comma-separated addresses, tolerating the obsolete empty elements.
pub fn address_list(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = p.many0(i, cfws_comma);
    let j = address(p, j)?;
    Some(p.many0(j, address_list_tail))
}

fn address_list_tail(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = p.literal(i, b',')?;
    Some(p.opt(j, address_or_cfws))
}

fn address_or_cfws(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    p.alt(i, &[address, cfws])
}

/// Address-list field body, which may also be empty or contain only CFWS
/// and commas.
pub fn address_list_field(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    Some(p.opt(i, |p, i| p.alt(i, &[address_list, obs_group_list, cfws])))
}

// Message identifiers.

fn no_fold_literal(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = p.literal(i, b'[')?;
    let j = p.run(j, is_dtext);
    p.literal(j, b']')
}

/// `[CFWS] "<" id-left "@" id-right ">" [CFWS]`.
pub fn msg_id(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let s = ocfws(p, i);
    let j = p.literal(s, b'<')?;
    let j = p.alt(j, &[dot_atom_text, obs_local_part])?;
    let j = p.literal(j, b'@')?;
    let j = p.alt(j, &[dot_atom_text, no_fold_literal, obs_domain])?;
    let e = p.literal(j, b'>')?;
    Some(ocfws(p, e))
}

/// `1*msg-id`, also accepting the obsolete phrases between identifiers.
pub fn msg_id_list(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    p.many1(i, |p, i| p.alt(i, &[msg_id, phrase]))
}

// Date and time.

fn day_name(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    DAY_NAMES.iter().find_map(|name| p.keyword(i, name))
}

fn day_of_week(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let s = ocfws(p, i);
    let e = day_name(p, s)?;
    let j = ocfws(p, e);
    p.literal(j, b',')
}

fn day(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let s = ocfws(p, i);
    let e = p.digits(s, 1, 2)?;
    Some(ocfws(p, e))
}

fn month(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    MONTH_NAMES.iter().find_map(|name| p.keyword(i, name))
}

fn year(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let s = ocfws(p, i);
    let e = p.digits(s, 2, 9)?;
    Some(ocfws(p, e))
}

fn time_unit(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let s = ocfws(p, i);
    let e = p.digits(s, 1, 2)?;
    Some(ocfws(p, e))
}

fn colon_time_unit(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = p.literal(i, b':')?;
    time_unit(p, j)
}

fn time_of_day(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = time_unit(p, i)?;
    let j = colon_time_unit(p, j)?;
    Some(p.opt(j, colon_time_unit))
}

fn numeric_zone(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = p.literal(i, b'+').or_else(|| p.literal(i, b'-'))?;
    p.digits(j, 4, 4)
}

fn named_zone(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    OBS_ZONES.iter().find_map(|name| p.keyword(i, name))
}

fn military_zone(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    p.class(i, is_military_zone)
}

fn zone(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let s = ocfws(p, i);
    p.alt(s, &[numeric_zone, named_zone, military_zone])
}

/// `[day-of-week ","] date time [CFWS]`, with the obsolete forms.
pub fn date_time(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = p.opt(i, day_of_week);
    let j = day(p, j)?;
    let j = month(p, j)?;
    let j = year(p, j)?;
    let j = time_of_day(p, j)?;
    let j = zone(p, j)?;
    Some(ocfws(p, j))
}

// MIME.

/// MIME `token`.
pub fn mime_token(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    p.run1(i, is_token_char)
}

fn mime_token_cfws(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let s = ocfws(p, i);
    let e = mime_token(p, s)?;
    Some(ocfws(p, e))
}

/// `MIME-Version` body: `1*DIGIT "." 1*DIGIT` with comments allowed.
pub fn mime_version(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = ocfws(p, i);
    let j = p.digits(j, 1, 9)?;
    let j = ocfws(p, j);
    let j = p.literal(j, b'.')?;
    let j = ocfws(p, j);
    let j = p.digits(j, 1, 9)?;
    Some(ocfws(p, j))
}

fn section(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = p.literal(i, b'*')?;
    p.digits(j, 1, 9)
}

fn star(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    p.literal(i, b'*')
}

/// Parameter attribute with the RFC 2231 `*N` section and `*` extended
/// markers.
pub fn parameter_name(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = p.run1(i, is_attribute_char)?;
    let j = p.opt(j, section);
    Some(p.opt(j, star))
}

fn lenient_value(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    p.run1(i, is_lenient_value_char)
}

/// `attribute "=" value`.
pub fn parameter(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = parameter_name(p, i)?;
    let j = ocfws(p, j);
    let j = p.literal(j, b'=')?;
    let j = ocfws(p, j);
    let j = p.alt(j, &[quoted_string, lenient_value])?;
    Some(ocfws(p, j))
}

fn parameter_clause(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = p.literal(i, b';')?;
    let j = ocfws(p, j);
    Some(p.opt(j, parameter))
}

/// `type "/" subtype *(";" parameter)`.
pub fn content_type(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = mime_token_cfws(p, i)?;
    let j = p.literal(j, b'/')?;
    let j = mime_token_cfws(p, j)?;
    Some(p.many0(j, parameter_clause))
}

/// `disposition-type *(";" parameter)`.
pub fn content_disposition(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = mime_token_cfws(p, i)?;
    Some(p.many0(j, parameter_clause))
}

/// `mechanism`.
pub fn content_transfer_encoding(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    mime_token_cfws(p, i)
}

// Keywords.

fn phrase_or_cfws(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    p.alt(i, &[phrase, cfws])
}

fn keyword_tail(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = p.literal(i, b',')?;
    Some(p.opt(j, phrase_or_cfws))
}

/// `phrase *("," phrase)`.
pub fn keywords(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = p.many0(i, cfws_comma);
    let j = phrase(p, j)?;
    Some(p.many0(j, keyword_tail))
}

// Authentication-Results (RFC 8601).

fn ldh_keyword(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    p.run1(i, is_ldh)
}

fn auth_value(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    p.alt(i, &[quoted_string, mime_token_cfws])
}

fn authres_version(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = ocfws(p, i);
    let j = p.digits(j, 1, 9)?;
    Some(ocfws(p, j))
}

fn no_result(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = ocfws(p, i);
    let j = p.literal(j, b';')?;
    let j = ocfws(p, j);
    let j = p.keyword(j, "none")?;
    Some(ocfws(p, j))
}

fn method_version(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = ocfws(p, i);
    let j = p.literal(j, b'/')?;
    let j = ocfws(p, j);
    p.digits(j, 1, 9)
}

fn methodspec(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = ocfws(p, i);
    let j = ldh_keyword(p, j)?;
    let j = p.opt(j, method_version);
    let j = ocfws(p, j);
    let j = p.literal(j, b'=')?;
    let j = ocfws(p, j);
    let j = ldh_keyword(p, j)?;
    Some(ocfws(p, j))
}

fn reasonspec(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = ocfws(p, i);
    let j = p.keyword(j, "reason")?;
    let j = ocfws(p, j);
    let j = p.literal(j, b'=')?;
    auth_value(p, j)
}

fn local_part_at(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = p.opt(i, local_part);
    p.literal(j, b'@')
}

fn pvalue_address(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let s = ocfws(p, i);
    let j = p.opt(s, local_part_at);
    let e = dot_atom_text(p, j)?;
    Some(ocfws(p, e))
}

fn propspec(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = ocfws(p, i);
    let j = ldh_keyword(p, j)?;
    let j = ocfws(p, j);
    let j = p.literal(j, b'.')?;
    let j = ocfws(p, j);
    let j = ldh_keyword(p, j)?;
    let j = ocfws(p, j);
    let j = p.literal(j, b'=')?;
    p.alt(j, &[pvalue_address, auth_value])
}

fn resinfo(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = ocfws(p, i);
    let j = p.literal(j, b';')?;
    let j = methodspec(p, j)?;
    let j = p.opt(j, reasonspec);
    Some(p.many0(j, propspec))
}

fn resinfo_list(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    p.many1(i, resinfo)
}

/// `authserv-id [CFWS authres-version] (no-result / 1*resinfo) [CFWS]`.
pub fn authentication_results(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = auth_value(p, i)?;
    let j = p.opt(j, authres_version);
    let j = p.alt(j, &[no_result, resinfo_list])?;
    Some(ocfws(p, j))
}

// DKIM-Signature tag list (RFC 6376 3.2).

fn tag_name(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = p.class(i, |c| c.is_ascii_alphabetic())?;
    Some(p.run(j, is_dkim_tag_char))
}

fn tval_continuation(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = fws(p, i)?;
    p.run1(j, is_dkim_valchar)
}

fn tag_value(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = p.run1(i, is_dkim_valchar)?;
    Some(p.many0(j, tval_continuation))
}

fn tag_spec(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = p.opt(i, fws);
    let j = tag_name(p, j)?;
    let j = p.opt(j, fws);
    let j = p.literal(j, b'=')?;
    let j = p.opt(j, fws);
    let j = p.opt(j, tag_value);
    Some(p.opt(j, fws))
}

fn tag_spec_clause(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = p.literal(i, b';')?;
    tag_spec(p, j)
}

fn trailing_semicolon(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = p.literal(i, b';')?;
    Some(p.opt(j, fws))
}

/// `tag-spec *(";" tag-spec) [";"]`.
pub fn dkim_tag_list(p: &mut Parser<'_>, i: usize) -> Option<usize> {
    let j = tag_spec(p, i)?;
    let j = p.many0(j, tag_spec_clause);
    Some(p.opt(j, trailing_semicolon))
}
