//! Fixed-grammar patterns for numeric, address and port-list fields.
//!
//! Structured fields are compared with exact equality. A handful of fields
//! carry values that are only known by shape (an instance IP, an assigned
//! port), and those are matched against one of the patterns below. The
//! grammar is closed: callers pick a variant, they never supply a regex.

use std::sync::OnceLock;

use regex::Regex;

/// A value shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pattern {
    /// One or more ASCII digits.
    Digits,

    /// Dotted quad, e.g. `10.244.0.17`.
    Ipv4,

    /// A port number (digits).
    Port,

    /// Dotted quad and port, e.g. `10.244.0.17:61001`.
    HostPort,

    /// Bracketed list of port mappings, e.g.
    /// `[{"external":61001,"internal":8080}]`. Quotes may be backslash-escaped.
    PortMappings,
}

const DIGITS: &str = r"[0-9]+";
const IPV4: &str = r"[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}";
const HOST_PORT: &str = r"[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}:[0-9]+";
const PORT_MAPPINGS: &str =
    r#"\[(?:\{\\?"external\\?":[0-9]+,\\?"internal\\?":[0-9]+\},?)+\]"#;

static WHOLE: [OnceLock<Regex>; 5] = [const { OnceLock::new() }; 5];
static LEADING: [OnceLock<Regex>; 5] = [const { OnceLock::new() }; 5];

impl Pattern {
    /// All variants.
    pub const ALL: [Pattern; 5] = [
        Pattern::Digits,
        Pattern::Ipv4,
        Pattern::Port,
        Pattern::HostPort,
        Pattern::PortMappings,
    ];

    fn index(self) -> usize {
        match self {
            Pattern::Digits => 0,
            Pattern::Ipv4 => 1,
            Pattern::Port => 2,
            Pattern::HostPort => 3,
            Pattern::PortMappings => 4,
        }
    }

    fn source(self) -> &'static str {
        match self {
            Pattern::Digits | Pattern::Port => DIGITS,
            Pattern::Ipv4 => IPV4,
            Pattern::HostPort => HOST_PORT,
            Pattern::PortMappings => PORT_MAPPINGS,
        }
    }

    fn whole(self) -> &'static Regex {
        WHOLE[self.index()].get_or_init(|| {
            Regex::new(&format!("^(?:{})$", self.source())).expect("built-in pattern compiles")
        })
    }

    fn leading(self) -> &'static Regex {
        LEADING[self.index()].get_or_init(|| {
            Regex::new(&format!("^(?:{})", self.source())).expect("built-in pattern compiles")
        })
    }

    /// Returns true if the whole token has this shape.
    pub fn matches(self, token: &str) -> bool {
        self.whole().is_match(token)
    }

    /// Returns true if, at some occurrence of `prefix` in `text`, the text
    /// following it has this shape and is immediately followed by `suffix`.
    ///
    /// Used for key/value renderings such as `"CF_INSTANCE_IP"=>"10.0.0.1"`
    /// with prefix `"CF_INSTANCE_IP"=>"` and suffix `"`.
    pub fn matches_after(self, text: &str, prefix: &str, suffix: &str) -> bool {
        if prefix.is_empty() {
            return false;
        }
        text.match_indices(prefix).any(|(start, _)| {
            let rest = &text[start + prefix.len()..];
            self.leading()
                .find(rest)
                .is_some_and(|m| rest[m.end()..].starts_with(suffix))
        })
    }

    /// Short name used in predicate descriptions.
    pub fn name(self) -> &'static str {
        match self {
            Pattern::Digits => "digits",
            Pattern::Ipv4 => "ipv4",
            Pattern::Port => "port",
            Pattern::HostPort => "host:port",
            Pattern::PortMappings => "port mappings",
        }
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
