//! WireGuard configuration file parser
//!
//! Line-oriented: every trimmed line is classified into a token, and tokens
//! are folded into a [`ParseState`] that tracks the open section and the
//! peer currently being accumulated.
//!
//! Keywords are matched exactly against the left-hand side of `Key = value`.
//! A section's label is either a line whose first word (after an optional
//! `#`) is `Name`, or the first comment line after the section header before
//! any directive. Labels are stored without their leading `#`. Other
//! comments, blank lines, unknown headers and unknown keys are skipped, so
//! unknown directives do not survive a round trip.

use crate::error::ParseError;

use super::document::{InterfaceDocument, PeerEntry};

/// Section type during parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Interface,
    Peer,
}

impl Section {
    fn header(self) -> &'static str {
        match self {
            Section::Interface => "[Interface]",
            Section::Peer => "[Peer]",
        }
    }
}

/// Directives valid inside `[Interface]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InterfaceKey {
    Address,
    ListenPort,
    PrivateKey,
    Dns,
    Table,
    Mtu,
    PreUp,
    PostUp,
    PreDown,
    PostDown,
}

/// Directives valid inside `[Peer]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PeerKey {
    AllowedIps,
    Endpoint,
    PublicKey,
    PersistentKeepalive,
}

/// A recognized directive, tagged with the section it belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Directive {
    Interface(InterfaceKey),
    Peer(PeerKey),
}

impl Directive {
    fn section(self) -> Section {
        match self {
            Directive::Interface(_) => Section::Interface,
            Directive::Peer(_) => Section::Peer,
        }
    }
}

/// Directive keywords and their section affinity
const DIRECTIVES: &[(&str, Directive)] = &[
    ("Address", Directive::Interface(InterfaceKey::Address)),
    ("ListenPort", Directive::Interface(InterfaceKey::ListenPort)),
    ("PrivateKey", Directive::Interface(InterfaceKey::PrivateKey)),
    ("DNS", Directive::Interface(InterfaceKey::Dns)),
    ("Table", Directive::Interface(InterfaceKey::Table)),
    ("MTU", Directive::Interface(InterfaceKey::Mtu)),
    ("PreUp", Directive::Interface(InterfaceKey::PreUp)),
    ("PostUp", Directive::Interface(InterfaceKey::PostUp)),
    ("PreDown", Directive::Interface(InterfaceKey::PreDown)),
    ("PostDown", Directive::Interface(InterfaceKey::PostDown)),
    ("AllowedIPs", Directive::Peer(PeerKey::AllowedIps)),
    ("Endpoint", Directive::Peer(PeerKey::Endpoint)),
    ("PublicKey", Directive::Peer(PeerKey::PublicKey)),
    ("PersistentKeepalive", Directive::Peer(PeerKey::PersistentKeepalive)),
];

/// One classified line
#[derive(Debug, PartialEq, Eq)]
enum Token<'a> {
    Blank,
    /// Comment text without the leading `#`
    Comment(&'a str),
    Header(Section),
    /// Label text without the leading `#`
    Label(&'a str),
    Directive { directive: Directive, value: &'a str },
    Unknown,
}

/// Classify a trimmed line
fn tokenize(line: &str) -> Token<'_> {
    if line.is_empty() {
        return Token::Blank;
    }
    if line == "[Interface]" {
        return Token::Header(Section::Interface);
    }
    if line == "[Peer]" {
        return Token::Header(Section::Peer);
    }
    if is_label(line) {
        return Token::Label(comment_text(line));
    }
    if line.starts_with('#') {
        return Token::Comment(comment_text(line));
    }

    let Some((key, value)) = line.split_once('=') else {
        return Token::Unknown;
    };
    let key = key.trim();

    DIRECTIVES
        .iter()
        .find(|(keyword, _)| *keyword == key)
        .map(|&(_, directive)| Token::Directive {
            directive,
            value: value.trim(),
        })
        .unwrap_or(Token::Unknown)
}

/// `Name ...` or `# Name ...`, with `Name` as a whole word
fn is_label(line: &str) -> bool {
    let body = line.trim_start_matches('#').trim_start();
    match body.strip_prefix("Name") {
        Some(rest) => !rest.starts_with(|c: char| c.is_alphanumeric() || c == '_'),
        None => false,
    }
}

/// Strip one leading `#` and the whitespace after it
fn comment_text(line: &str) -> &str {
    line.strip_prefix('#').map(str::trim_start).unwrap_or(line)
}

/// Parser state threaded through the line fold
#[derive(Default)]
struct ParseState {
    doc: InterfaceDocument,
    section: Option<Section>,
    pending: Option<PeerEntry>,
    /// A leading comment may still become the section label
    label_open: bool,
}

impl ParseState {
    fn step(mut self, line_num: usize, line: &str) -> Result<Self, ParseError> {
        match tokenize(line) {
            Token::Blank => {}
            Token::Comment(text) => {
                if self.label_open && !text.is_empty() {
                    self.set_label(text, line_num, line)?;
                }
            }
            Token::Unknown => {
                tracing::debug!("Ignoring unrecognized line {}: {}", line_num, line);
            }
            Token::Header(section) => {
                self.flush_peer();
                if section == Section::Peer {
                    self.pending = Some(PeerEntry::default());
                }
                self.section = Some(section);
                self.label_open = true;
            }
            Token::Label(text) => self.set_label(text, line_num, line)?,
            Token::Directive { directive, value } => {
                let section = directive.section();
                if self.section != Some(section) {
                    return Err(ParseError::new(
                        line_num,
                        line,
                        format!("directive outside of {} section", section.header()),
                    ));
                }
                self.label_open = false;
                self.apply(directive, value, line_num, line)?;
            }
        }
        Ok(self)
    }

    fn set_label(&mut self, text: &str, line_num: usize, line: &str) -> Result<(), ParseError> {
        self.label_open = false;
        match (self.section, self.pending.as_mut()) {
            (Some(Section::Interface), _) => self.doc.label = Some(text.to_string()),
            (Some(Section::Peer), Some(peer)) => peer.label = Some(text.to_string()),
            _ => return Err(ParseError::new(line_num, line, "label outside of any section")),
        }
        Ok(())
    }

    fn apply(
        &mut self,
        directive: Directive,
        value: &str,
        line_num: usize,
        line: &str,
    ) -> Result<(), ParseError> {
        match directive {
            Directive::Interface(key) => {
                let doc = &mut self.doc;
                match key {
                    InterfaceKey::Address => doc.address = value.to_string(),
                    InterfaceKey::ListenPort => doc.listen_port = parse_number(value, line_num, line)?,
                    InterfaceKey::PrivateKey => doc.private_key = value.to_string(),
                    InterfaceKey::Dns => doc.dns_servers.extend(split_list(value)),
                    InterfaceKey::Table => doc.routing_table = non_empty(value),
                    InterfaceKey::Mtu => doc.mtu = parse_number(value, line_num, line)?,
                    InterfaceKey::PreUp => doc.pre_up = non_empty(value),
                    InterfaceKey::PostUp => doc.post_up = non_empty(value),
                    InterfaceKey::PreDown => doc.pre_down = non_empty(value),
                    InterfaceKey::PostDown => doc.post_down = non_empty(value),
                }
            }
            Directive::Peer(key) => {
                let Some(peer) = self.pending.as_mut() else {
                    return Err(ParseError::new(line_num, line, "directive outside of [Peer] section"));
                };
                match key {
                    PeerKey::AllowedIps => peer.allowed_ips.extend(split_list(value)),
                    PeerKey::Endpoint => peer.endpoint = non_empty(value),
                    PeerKey::PublicKey => peer.public_key = value.to_string(),
                    PeerKey::PersistentKeepalive => {
                        peer.persistent_keepalive_seconds = parse_number(value, line_num, line)?
                    }
                }
            }
        }
        Ok(())
    }

    fn flush_peer(&mut self) {
        if let Some(peer) = self.pending.take() {
            self.doc.peers.push(peer);
        }
    }

    fn finish(mut self) -> InterfaceDocument {
        self.flush_peer();
        self.doc
    }
}

/// Parse a WireGuard configuration from a string
pub fn parse(content: &str) -> Result<InterfaceDocument, ParseError> {
    let state = content
        .lines()
        .enumerate()
        .try_fold(ParseState::default(), |state, (idx, line)| {
            state.step(idx + 1, line.trim())
        })?;
    let doc = state.finish();
    tracing::debug!("Parsed interface {} with {} peers", doc.address, doc.peers.len());
    Ok(doc)
}

fn split_list(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_number<T: std::str::FromStr>(value: &str, line_num: usize, line: &str) -> Result<T, ParseError> {
    value
        .parse()
        .map_err(|_| ParseError::new(line_num, line, format!("invalid numeric value '{}'", value)))
}
