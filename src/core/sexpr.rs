//! Lossless S-expression trees for KiCad board files.
//!
//! Every list remembers the whitespace in front of each item and before its
//! closing paren, and every atom remembers its raw token. Serializing a parsed
//! document without edits reproduces the input byte-for-byte; edited atoms are
//! re-encoded using KiCad's quoting rules.

use std::fmt;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atom {
    text: String,
    quoted: bool,
    /// Original token, dropped once the atom is edited.
    raw: Option<String>,
}

impl Atom {
    pub fn bare(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quoted: false,
            raw: None,
        }
    }

    pub fn quoted(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quoted: true,
            raw: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_quoted(&self) -> bool {
        self.quoted
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.raw = None;
    }

    fn needs_quotes(&self) -> bool {
        self.quoted
            || self.text.is_empty()
            || self
                .text
                .chars()
                .any(|c| c.is_whitespace() || c == '(' || c == ')' || c == '"')
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(raw) = &self.raw {
            return f.write_str(raw);
        }
        if !self.needs_quotes() {
            return f.write_str(&self.text);
        }
        f.write_str("\"")?;
        for c in self.text.chars() {
            match c {
                '\\' => f.write_str("\\\\")?,
                '"' => f.write_str("\\\"")?,
                '\n' => f.write_str("\\n")?,
                '\t' => f.write_str("\\t")?,
                '\r' => f.write_str("\\r")?,
                _ => write!(f, "{}", c)?,
            }
        }
        f.write_str("\"")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Atom(Atom),
    List(List),
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Atom(atom) => atom.fmt(f),
            Node::List(list) => list.fmt(f),
        }
    }
}

/// A list entry together with the whitespace written before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub leading: String,
    pub node: Node,
}

impl Item {
    pub fn new(leading: impl Into<String>, node: Node) -> Self {
        Self {
            leading: leading.into(),
            node,
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        match &self.node {
            Node::List(list) => Some(list),
            Node::Atom(_) => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut List> {
        match &mut self.node {
            Node::List(list) => Some(list),
            Node::Atom(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct List {
    pub items: Vec<Item>,
    /// Whitespace before the closing paren.
    pub trailing: String,
}

impl List {
    /// Build a compact single-line list such as `(property "MPN" "X1")`.
    pub fn from_atoms(atoms: Vec<Atom>) -> Self {
        let items = atoms
            .into_iter()
            .enumerate()
            .map(|(i, atom)| Item::new(if i == 0 { "" } else { " " }, Node::Atom(atom)))
            .collect();
        Self {
            items,
            trailing: String::new(),
        }
    }

    /// Text of the leading atom, e.g. `footprint` for `(footprint "R_0603" ...)`.
    pub fn head(&self) -> Option<&str> {
        self.atom(0).map(Atom::text)
    }

    pub fn atom(&self, index: usize) -> Option<&Atom> {
        match &self.items.get(index)?.node {
            Node::Atom(atom) => Some(atom),
            Node::List(_) => None,
        }
    }

    pub fn atom_mut(&mut self, index: usize) -> Option<&mut Atom> {
        match &mut self.items.get_mut(index)?.node {
            Node::Atom(atom) => Some(atom),
            Node::List(_) => None,
        }
    }

    /// Direct child lists in order.
    pub fn lists(&self) -> impl Iterator<Item = &List> {
        self.items.iter().filter_map(Item::as_list)
    }

    pub fn lists_mut(&mut self) -> impl Iterator<Item = &mut List> {
        self.items.iter_mut().filter_map(Item::as_list_mut)
    }

    /// First direct child list with the given head.
    pub fn find(&self, head: &str) -> Option<&List> {
        self.lists().find(|l| l.head() == Some(head))
    }

    /// Indices (into `items`) of direct child lists with the given head.
    pub fn positions(&self, head: &str) -> Vec<usize> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.as_list().and_then(List::head) == Some(head))
            .map(|(i, _)| i)
            .collect()
    }

    /// Whitespace used in front of multi-line children, so inserted nodes line
    /// up with their siblings.
    pub fn child_indent(&self) -> String {
        self.items
            .iter()
            .rev()
            .find(|item| item.as_list().is_some() && item.leading.contains('\n'))
            .map(|item| item.leading.clone())
            .unwrap_or_else(|| " ".to_string())
    }
}

impl fmt::Display for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for item in &self.items {
            f.write_str(&item.leading)?;
            item.node.fmt(f)?;
        }
        f.write_str(&self.trailing)?;
        f.write_str(")")
    }
}

/// A whole file: one root list plus surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub leading: String,
    pub root: List,
    pub trailing: String,
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.leading)?;
        self.root.fmt(f)?;
        f.write_str(&self.trailing)
    }
}

// ============================================================================
// Parsing
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at line {}, column {}", self.message, self.line, self.column)
    }
}

impl std::error::Error for ParseError {}

/// Parse a document holding exactly one root list.
pub fn parse(input: &str) -> Result<Document, ParseError> {
    let mut parser = Parser { src: input, pos: 0 };

    let leading = parser.take_whitespace();
    match parser.peek() {
        Some('(') => {}
        Some(_) => return Err(parser.error("expected '(' at start of document")),
        None => return Err(parser.error("empty document")),
    }
    let root = parser.parse_list()?;
    let trailing = parser.take_whitespace();
    if parser.peek().is_some() {
        return Err(parser.error("unexpected content after root list"));
    }

    Ok(Document {
        leading,
        root,
        trailing,
    })
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn take_whitespace(&mut self) -> String {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
        self.src[start..self.pos].to_string()
    }

    fn parse_list(&mut self) -> Result<List, ParseError> {
        let open = self.pos;
        self.bump();

        let mut items = Vec::new();
        loop {
            let leading = self.take_whitespace();
            match self.peek() {
                None => return Err(self.error_at(open, "unclosed list")),
                Some(')') => {
                    self.bump();
                    return Ok(List {
                        items,
                        trailing: leading,
                    });
                }
                Some('(') => {
                    let list = self.parse_list()?;
                    items.push(Item::new(leading, Node::List(list)));
                }
                Some('"') => {
                    let atom = self.parse_quoted()?;
                    items.push(Item::new(leading, Node::Atom(atom)));
                }
                Some(_) => {
                    let atom = self.parse_bare();
                    items.push(Item::new(leading, Node::Atom(atom)));
                }
            }
        }
    }

    fn parse_quoted(&mut self) -> Result<Atom, ParseError> {
        let start = self.pos;
        self.bump();

        let mut text = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error_at(start, "unterminated string")),
                Some('"') => break,
                Some('\\') => match self.bump() {
                    None => return Err(self.error_at(start, "unterminated string")),
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some('r') => text.push('\r'),
                    Some(c @ ('"' | '\\')) => text.push(c),
                    Some(c) => {
                        text.push('\\');
                        text.push(c);
                    }
                },
                Some(c) => text.push(c),
            }
        }

        Ok(Atom {
            text,
            quoted: true,
            raw: Some(self.src[start..self.pos].to_string()),
        })
    }

    fn parse_bare(&mut self) -> Atom {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if !c.is_whitespace() && c != '(' && c != ')' && c != '"')
        {
            self.bump();
        }
        let token = &self.src[start..self.pos];
        Atom {
            text: token.to_string(),
            quoted: false,
            raw: Some(token.to_string()),
        }
    }

    fn error(&self, message: &str) -> ParseError {
        self.error_at(self.pos, message)
    }

    fn error_at(&self, offset: usize, message: &str) -> ParseError {
        let before = &self.src[..offset];
        let line = before.matches('\n').count() + 1;
        let column = before
            .rfind('\n')
            .map(|nl| before[nl + 1..].chars().count())
            .unwrap_or_else(|| before.chars().count())
            + 1;
        ParseError {
            message: message.to_string(),
            line,
            column,
        }
    }
}
