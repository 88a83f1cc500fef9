//! Structured values from committed grammar tokens.

use super::address::{Address, NamedAddress};
use super::grammar::{self, Rule};
use super::tokener::{Token, TokenKind};
use crate::error::{Error, Result};
use crate::rfc2047::{EncodedWordContext, EncodedWordEncoder, decode_encoded_words};

/// Removes comments and white space outside quoted strings.
///
/// Quoted strings are kept verbatim, quotes included, except that folding
/// line breaks inside them are dropped.
#[must_use]
pub fn without_cfws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    let mut depth = 0usize;
    let mut in_quote = false;

    while let Some(c) = chars.next() {
        if in_quote {
            match c {
                '\\' => {
                    out.push(c);
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                }
                '"' => {
                    in_quote = false;
                    out.push(c);
                }
                '\r' | '\n' => {}
                _ => out.push(c),
            }
        } else if depth > 0 {
            match c {
                '\\' => {
                    chars.next();
                }
                '(' => depth += 1,
                ')' => depth -= 1,
                _ => {}
            }
        } else {
            match c {
                '"' => {
                    in_quote = true;
                    out.push(c);
                }
                '(' => depth = 1,
                ' ' | '\t' | '\r' | '\n' => {}
                _ => out.push(c),
            }
        }
    }
    out
}

/// Returns the content of a quoted string with quoted pairs resolved and
/// folding removed. Text outside quotes is kept as it is.
#[must_use]
pub fn unquote(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    let mut in_quote = false;
    while let Some(c) = chars.next() {
        match c {
            '"' => in_quote = !in_quote,
            '\\' if in_quote => {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '\r' | '\n' if in_quote => {}
            _ => out.push(c),
        }
    }
    out
}

/// Index just past the tokens contained in `tokens[index]`.
fn span_end(tokens: &[Token], index: usize) -> usize {
    let outer = tokens[index];
    let mut j = index + 1;
    while j < tokens.len() && outer.contains(&tokens[j]) {
        j += 1;
    }
    j
}

/// Text of a phrase from the tokens inside it.
///
/// Runs of atoms are joined with single spaces and their encoded words
/// decoded; quoted strings are unquoted. Pieces that touch in the source are
/// joined without a space.
fn phrase_text(value: &str, tokens: &[Token]) -> String {
    let mut pieces: Vec<(usize, usize, String)> = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i];
        match token.kind {
            TokenKind::PhraseAtom => {
                let mut atoms = vec![token.text(value)];
                let mut end = token.end;
                let mut j = i + 1;
                while j < tokens.len()
                    && tokens[j].kind == TokenKind::PhraseAtom
                    && value[end..tokens[j].start].trim().is_empty()
                {
                    atoms.push(tokens[j].text(value));
                    end = tokens[j].end;
                    j += 1;
                }
                let decoded = decode_encoded_words(&atoms.join(" "), EncodedWordContext::Phrase);
                pieces.push((token.start, end, decoded));
                i = j;
                continue;
            }
            TokenKind::PhraseAtomOrDot => {
                pieces.push((token.start, token.end, token.text(value).to_string()));
            }
            TokenKind::QuotedString => {
                pieces.push((token.start, token.end, unquote(token.text(value))));
            }
            _ => {}
        }
        i += 1;
    }

    let mut out = String::new();
    let mut previous_end = None;
    for (start, end, text) in pieces {
        if previous_end.is_some_and(|e| e != start) {
            out.push(' ');
        }
        out.push_str(&text);
        previous_end = Some(end);
    }
    out
}

/// Semantic local part: CFWS removed, quoting resolved.
fn local_part_value(raw: &str) -> String {
    unquote(&without_cfws(raw))
}

fn mailbox_from_tokens(value: &str, tokens: &[Token]) -> Result<NamedAddress> {
    let inner = tokens.get(1..).unwrap_or_default();
    let display_name = inner
        .iter()
        .position(|t| t.kind == TokenKind::Phrase)
        .map(|p| phrase_text(value, &inner[p + 1..span_end(inner, p)]))
        .filter(|name| !name.is_empty());
    let local = inner.iter().find(|t| t.kind == TokenKind::LocalPart);
    let domain = inner.iter().find(|t| t.kind == TokenKind::Domain);
    let (Some(local), Some(domain)) = (local, domain) else {
        return Err(Error::InvalidAddress(format!(
            "mailbox without address: {}",
            tokens.first().map_or("", |t| t.text(value))
        )));
    };
    let address = Address::from_parts(
        local_part_value(local.text(value)),
        without_cfws(domain.text(value)),
    );
    Ok(NamedAddress::new(display_name, address))
}

fn named_addresses(value: &str, tokens: &[Token]) -> Result<Vec<NamedAddress>> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i];
        let end = span_end(tokens, i);
        match token.kind {
            TokenKind::Group => {
                let inner = &tokens[i + 1..end];
                let name = inner
                    .iter()
                    .position(|t| t.kind == TokenKind::Phrase)
                    .map(|p| phrase_text(value, &inner[p + 1..span_end(inner, p)]))
                    .unwrap_or_default();
                let mut members = Vec::new();
                let mut j = 0;
                while j < inner.len() {
                    let member_end = span_end(inner, j);
                    if inner[j].kind == TokenKind::Mailbox {
                        members.push(mailbox_from_tokens(value, &inner[j..member_end])?);
                        j = member_end;
                    } else {
                        j += 1;
                    }
                }
                out.push(NamedAddress::group(name, members)?);
                i = end;
            }
            TokenKind::Mailbox => {
                out.push(mailbox_from_tokens(value, &tokens[i..end])?);
                i = end;
            }
            _ => i += 1,
        }
    }
    Ok(out)
}

fn parse_with(value: &str, rule: Rule, what: &str) -> Result<Vec<NamedAddress>> {
    let tokens = grammar::parse(value, rule)
        .ok_or_else(|| Error::InvalidAddress(format!("invalid {what}: {value}")))?;
    named_addresses(value, &tokens)
}

/// Parses an address list (`To`, `Cc`, `Bcc`, `Reply-To`). An empty list is
/// allowed.
///
/// # Errors
///
/// Returns [`Error::InvalidAddress`] if the value is not an address list.
pub fn parse_address_list(value: &str) -> Result<Vec<NamedAddress>> {
    parse_with(value, grammar::address_list_field, "address list")
}

/// Parses a mailbox list (`From`).
///
/// # Errors
///
/// Returns [`Error::InvalidAddress`] if the value is not a mailbox list.
pub fn parse_mailbox_list(value: &str) -> Result<Vec<NamedAddress>> {
    parse_with(value, grammar::mailbox_list, "mailbox list")
}

/// Parses a single mailbox (`Sender`).
///
/// # Errors
///
/// Returns [`Error::InvalidAddress`] if the value is not one mailbox.
pub fn parse_mailbox(value: &str) -> Result<NamedAddress> {
    parse_with(value, grammar::mailbox, "mailbox")?
        .into_iter()
        .next()
        .ok_or_else(|| Error::InvalidAddress(format!("invalid mailbox: {value}")))
}

/// Splits an `addr-spec` into its local part and domain, each with CFWS
/// removed and quoting kept as written.
#[must_use]
pub fn split_addr_spec(s: &str) -> Option<(String, String)> {
    let tokens = grammar::parse(s, grammar::addr_spec)?;
    let local = tokens.iter().find(|t| t.kind == TokenKind::LocalPart)?;
    let domain = tokens.iter().find(|t| t.kind == TokenKind::Domain)?;
    Some((without_cfws(local.text(s)), without_cfws(domain.text(s))))
}

/// Parses an `addr-spec` into an [`Address`].
pub(crate) fn parse_addr_spec(s: &str) -> Option<Address> {
    let tokens = grammar::parse(s, grammar::addr_spec)?;
    let local = tokens.iter().find(|t| t.kind == TokenKind::LocalPart)?;
    let domain = tokens.iter().find(|t| t.kind == TokenKind::Domain)?;
    Some(Address::from_parts(
        local_part_value(local.text(s)),
        without_cfws(domain.text(s)),
    ))
}

/// Message identifiers in a `Message-ID`, `In-Reply-To` or `References`
/// value, without angle brackets.
#[must_use]
pub fn msg_ids(value: &str) -> Vec<String> {
    let stripped = without_cfws(value);
    let mut ids = Vec::new();
    let mut rest = stripped.as_str();
    while let Some(open) = rest.find('<') {
        let Some(close) = rest[open..].find('>') else {
            break;
        };
        ids.push(rest[open + 1..open + close].to_string());
        rest = &rest[open + close + 1..];
    }
    ids
}

/// Decodes the encoded words a structured value may carry: those in
/// comments and in phrase atoms. Values that do not match `rule` are
/// returned unchanged.
#[must_use]
pub fn decode_structured(value: &str, rule: Rule) -> String {
    let Some(tokens) = grammar::parse(value, rule) else {
        return value.to_string();
    };
    if !value.contains("=?") {
        return value.to_string();
    }

    let mut out = String::with_capacity(value.len());
    let mut last = 0;
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i];
        if token.start < last {
            i += 1;
            continue;
        }
        match token.kind {
            TokenKind::Comment => {
                out.push_str(&value[last..token.start]);
                out.push_str(&decode_encoded_words(
                    token.text(value),
                    EncodedWordContext::Comment,
                ));
                last = token.end;
            }
            TokenKind::PhraseAtom => {
                let mut end = token.end;
                let mut j = i + 1;
                while j < tokens.len()
                    && tokens[j].kind == TokenKind::PhraseAtom
                    && value[end..tokens[j].start].trim().is_empty()
                {
                    end = tokens[j].end;
                    j += 1;
                }
                out.push_str(&value[last..token.start]);
                out.push_str(&decode_encoded_words(
                    &value[token.start..end],
                    EncodedWordContext::Phrase,
                ));
                last = end;
                i = j;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    out.push_str(&value[last..]);
    out
}

/// Text of a comment without its parentheses, with nested comments
/// flattened and quoted pairs resolved.
fn comment_text(comment: &str) -> String {
    let inner = comment
        .strip_prefix('(')
        .and_then(|c| c.strip_suffix(')'))
        .unwrap_or(comment);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '(' | ')' | '\r' | '\n' => {}
            _ => out.push(c),
        }
    }
    out
}

/// Makes a structured value ASCII-safe: comments and phrases holding
/// non-ASCII text become encoded words. Values that do not match `rule` are
/// encoded as unstructured text.
#[must_use]
pub fn encode_structured(value: &str, rule: Rule, encoder: &EncodedWordEncoder) -> String {
    if value.is_ascii() {
        return value.to_string();
    }
    let Some(tokens) = grammar::parse(value, rule) else {
        return encoder.encode_unstructured(value);
    };

    let mut out = String::with_capacity(value.len() * 2);
    let mut last = 0;
    for (i, token) in tokens.iter().enumerate() {
        let text = token.text(value);
        if token.start < last || text.is_ascii() {
            continue;
        }
        let replacement = match token.kind {
            TokenKind::Comment => format!("({})", encoder.encode(&comment_text(text))),
            TokenKind::Phrase => {
                let name = phrase_text(value, &tokens[i + 1..span_end(&tokens, i)]);
                encoder.encode(&name)
            }
            _ => continue,
        };
        out.push_str(&value[last..token.start]);
        if text.starts_with(|c: char| c.is_whitespace()) {
            out.push(' ');
        }
        out.push_str(&replacement);
        if text.ends_with(|c: char| c.is_whitespace()) {
            out.push(' ');
        }
        last = token.end;
    }
    out.push_str(&value[last..]);
    out
}
