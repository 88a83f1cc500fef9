//! Email addresses, mailboxes and groups.

use std::fmt::{self, Write as _};
use std::str::FromStr;

use super::grammar::{self, is_atext};
use super::semantics;
use crate::error::{Error, Result};

/// An `addr-spec`: local part and domain.
///
/// The local part is held unquoted; [`fmt::Display`] re-quotes it when it is
/// not a dot-atom.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Address {
    local_part: String,
    domain: String,
}

impl Address {
    /// Creates an address from its parts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if the parts do not form a valid
    /// `addr-spec`.
    pub fn new(local_part: impl Into<String>, domain: impl Into<String>) -> Result<Self> {
        let address = Self::from_parts(local_part.into(), domain.into());
        if address.local_part.contains(['\r', '\n'])
            || address.domain.contains(|c: char| c.is_whitespace() || c == '(')
            || !grammar::matches(&address.to_string(), grammar::addr_spec)
        {
            return Err(Error::InvalidAddress(address.to_string()));
        }
        Ok(address)
    }

    pub(crate) const fn from_parts(local_part: String, domain: String) -> Self {
        Self { local_part, domain }
    }

    /// Parses an `addr-spec`, CFWS and obsolete forms included.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if `s` is not an `addr-spec`.
    pub fn parse(s: &str) -> Result<Self> {
        semantics::parse_addr_spec(s).ok_or_else(|| Error::InvalidAddress(s.to_string()))
    }

    /// The unquoted local part.
    #[must_use]
    pub fn local_part(&self) -> &str {
        &self.local_part
    }

    /// The domain, or a bracketed domain literal.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }
}

fn is_dot_atom_text(s: &str) -> bool {
    !s.is_empty() && s.split('.').all(|part| !part.is_empty() && part.chars().all(is_atext))
}

/// Writes `s` as a quoted string.
pub(crate) fn write_quoted(f: &mut impl fmt::Write, s: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in s.chars() {
        if c == '"' || c == '\\' {
            f.write_char('\\')?;
        }
        f.write_char(c)?;
    }
    f.write_char('"')
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if is_dot_atom_text(&self.local_part) {
            f.write_str(&self.local_part)?;
        } else {
            write_quoted(f, &self.local_part)?;
        }
        write!(f, "@{}", self.domain)
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
enum Inner {
    Mailbox {
        display_name: Option<String>,
        address: Address,
    },
    Group {
        name: String,
        members: Vec<NamedAddress>,
    },
}

/// A mailbox with an optional display name, or a named group of mailboxes.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NamedAddress {
    inner: Inner,
}

impl NamedAddress {
    /// Creates a mailbox.
    #[must_use]
    pub const fn new(display_name: Option<String>, address: Address) -> Self {
        Self {
            inner: Inner::Mailbox {
                display_name,
                address,
            },
        }
    }

    /// Creates a group.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if a member is itself a group.
    pub fn group(name: impl Into<String>, members: Vec<Self>) -> Result<Self> {
        let name = name.into();
        if members.iter().any(Self::is_group) {
            return Err(Error::InvalidAddress(format!("group {name} contains a group")));
        }
        Ok(Self {
            inner: Inner::Group { name, members },
        })
    }

    /// Parses an address list such as the value of a `To` field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if `s` is not an address list.
    pub fn parse_list(s: &str) -> Result<Vec<Self>> {
        semantics::parse_address_list(s)
    }

    /// Whether this is a group.
    #[must_use]
    pub const fn is_group(&self) -> bool {
        matches!(self.inner, Inner::Group { .. })
    }

    /// Display name of a mailbox.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        match &self.inner {
            Inner::Mailbox { display_name, .. } => display_name.as_deref(),
            Inner::Group { .. } => None,
        }
    }

    /// Address of a mailbox.
    #[must_use]
    pub const fn address(&self) -> Option<&Address> {
        match &self.inner {
            Inner::Mailbox { address, .. } => Some(address),
            Inner::Group { .. } => None,
        }
    }

    /// Name of a group.
    #[must_use]
    pub fn group_name(&self) -> Option<&str> {
        match &self.inner {
            Inner::Mailbox { .. } => None,
            Inner::Group { name, .. } => Some(name),
        }
    }

    /// Members of a group; empty for a mailbox.
    #[must_use]
    pub fn members(&self) -> &[Self] {
        match &self.inner {
            Inner::Mailbox { .. } => &[],
            Inner::Group { members, .. } => members,
        }
    }

    /// Every mailbox address, with group members flattened.
    #[must_use]
    pub fn addresses(&self) -> Vec<&Address> {
        match &self.inner {
            Inner::Mailbox { address, .. } => vec![address],
            Inner::Group { members, .. } => {
                members.iter().filter_map(Self::address).collect()
            }
        }
    }
}

/// Writes a display name as atoms when it is a plain phrase, quoted
/// otherwise.
pub(crate) fn write_phrase(f: &mut impl fmt::Write, name: &str) -> fmt::Result {
    let plain = !name.is_empty()
        && name
            .split(' ')
            .all(|word| !word.is_empty() && word.chars().all(is_atext));
    if plain {
        f.write_str(name)
    } else {
        write_quoted(f, name)
    }
}

impl fmt::Display for NamedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Inner::Mailbox {
                display_name: Some(name),
                address,
            } => {
                write_phrase(f, name)?;
                write!(f, " <{address}>")
            }
            Inner::Mailbox {
                display_name: None,
                address,
            } => write!(f, "{address}"),
            Inner::Group { name, members } => {
                write_phrase(f, name)?;
                f.write_char(':')?;
                for (i, member) in members.iter().enumerate() {
                    f.write_str(if i == 0 { " " } else { ", " })?;
                    write!(f, "{member}")?;
                }
                f.write_char(';')
            }
        }
    }
}

impl From<Address> for NamedAddress {
    fn from(address: Address) -> Self {
        Self::new(None, address)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_address_new_validates() {
        let address = Address::new("john.doe", "example.com").unwrap();
        assert_eq!(address.to_string(), "john.doe@example.com");

        let quoted = Address::new("john doe", "example.com").unwrap();
        assert_eq!(quoted.to_string(), "\"john doe\"@example.com");

        assert!(Address::new("john", "exa mple.com").is_err());
        assert!(Address::new("john", "").is_err());
        assert!(Address::new("a\r\nb", "example.com").is_err());
    }

    #[test]
    fn test_address_parse() {
        let address: Address = "\"a\\\"b\"@[127.0.0.1]".parse().unwrap();
        assert_eq!(address.local_part(), "a\"b");
        assert_eq!(address.domain(), "[127.0.0.1]");
        assert_eq!(address.to_string(), "\"a\\\"b\"@[127.0.0.1]");
        assert!(Address::parse("@example.com").is_err());
    }

    #[test]
    fn test_nested_group_rejected() {
        let inner = NamedAddress::group("Inner", vec![]).unwrap();
        let result = NamedAddress::group("Outer", vec![inner]);
        assert!(matches!(result, Err(Error::InvalidAddress(_))));
    }

    #[test]
    fn test_display() {
        let address = Address::new("jane", "example.org").unwrap();
        let plain = NamedAddress::new(Some("Jane Smith".into()), address.clone());
        assert_eq!(plain.to_string(), "Jane Smith <jane@example.org>");

        let quoted = NamedAddress::new(Some("Smith, Jane".into()), address.clone());
        assert_eq!(quoted.to_string(), "\"Smith, Jane\" <jane@example.org>");

        let group = NamedAddress::group("Team", vec![plain, address.into()]).unwrap();
        assert_eq!(
            group.to_string(),
            "Team: Jane Smith <jane@example.org>, jane@example.org;"
        );
        assert_eq!(group.addresses().len(), 2);

        let reparsed = NamedAddress::parse_list(&group.to_string()).unwrap();
        assert_eq!(reparsed, vec![group]);
    }
}
