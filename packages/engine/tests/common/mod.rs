//! Test languages for the engine
//!
//! - A comma-list language: `a, b!, [c, d?]`. Words may end in `!` (loud)
//!   or `?` (quiet); brackets nest lists. `,` and `;` both separate items.
//! - A scripted binding whose nodes are laid out by closures, for exercising
//!   one contents variant at a time.

#![allow(dead_code)]

use anyhow::{bail, Result};
use p2pp_engine::rawsource::{fragment_from_byte_span, RawSourceFragment};
use p2pp_engine::{
    Contents, FragmentRetriever, LanguageBinding, ModelRef, NodeLayout, P2ppError, P2ppResult,
    P2ppTree,
};
use std::fmt;
use std::rc::Rc;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

// ---------------------------------------------------------------------------
// List language: AST and parser
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct WordAst {
    pub span: (usize, usize),
    pub name: String,
    pub name_span: (usize, usize),
    pub loudness: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListAst {
    pub span: (usize, usize),
    pub bracketed: bool,
    pub items: Vec<Ast>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Ast {
    Word(WordAst),
    List(ListAst),
}

impl Ast {
    pub fn span(&self) -> (usize, usize) {
        match self {
            Ast::Word(word) => word.span,
            Ast::List(list) => list.span,
        }
    }
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn parse_list(&mut self, bracketed: bool) -> Result<ListAst> {
        let open = self.pos;
        if bracketed {
            self.pos += 1;
        }

        let mut items = Vec::new();
        self.skip_whitespace();
        while let Some(byte) = self.peek() {
            if bracketed && byte == b']' {
                break;
            }
            items.push(self.parse_item()?);
            self.skip_whitespace();
            match self.peek() {
                Some(b',' | b';') => {
                    self.pos += 1;
                    self.skip_whitespace();
                }
                _ => break,
            }
        }

        let span = if bracketed {
            if self.peek() != Some(b']') {
                bail!("expected `]` at byte {}", self.pos);
            }
            self.pos += 1;
            (open, self.pos)
        } else {
            match (items.first(), items.last()) {
                (Some(first), Some(last)) => (first.span().0, last.span().1),
                _ => (self.pos, self.pos),
            }
        };

        Ok(ListAst { span, bracketed, items })
    }

    fn parse_item(&mut self) -> Result<Ast> {
        if self.peek() == Some(b'[') {
            return Ok(Ast::List(self.parse_list(true)?));
        }

        let start = self.pos;
        while matches!(self.peek(), Some(byte) if byte.is_ascii_alphanumeric() || byte == b'_') {
            self.pos += 1;
        }
        if self.pos == start {
            bail!("expected a word at byte {start}");
        }
        let name_span = (start, self.pos);

        let loudness = match self.peek() {
            Some(b'!') => Some(true),
            Some(b'?') => Some(false),
            _ => None,
        };
        if loudness.is_some() {
            self.pos += 1;
        }

        Ok(Ast::Word(WordAst {
            span: (start, self.pos),
            name: String::from_utf8_lossy(&self.bytes[name_span.0..name_span.1]).into_owned(),
            name_span,
            loudness,
        }))
    }
}

/// Parse a whole document: an unbracketed list
pub fn parse(text: &str) -> Result<Ast> {
    let mut parser = Parser {
        bytes: text.as_bytes(),
        pos: 0,
    };
    parser.skip_whitespace();
    let list = parser.parse_list(false)?;
    parser.skip_whitespace();
    if parser.pos != text.len() {
        bail!("unexpected input at byte {}", parser.pos);
    }
    Ok(Ast::List(list))
}

// ---------------------------------------------------------------------------
// List language: model and binding
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Word {
    pub name: String,
    pub loudness: Option<bool>,
    pub ast: Option<WordAst>,
}

#[derive(Debug)]
pub struct List {
    pub bracketed: bool,
    pub items: Vec<Item>,
    pub ast: Option<ListAst>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Item {
    Word(ModelRef<Word>),
    List(ModelRef<List>),
}

impl Item {
    pub fn word(name: &str) -> Self {
        Self::word_with(name, None)
    }

    pub fn word_with(name: &str, loudness: Option<bool>) -> Self {
        Item::Word(ModelRef::new(Word {
            name: name.to_string(),
            loudness,
            ast: None,
        }))
    }

    pub fn list(items: Vec<Item>) -> Self {
        Item::List(ModelRef::new(List {
            bracketed: true,
            items,
            ast: None,
        }))
    }

    pub fn as_word(&self) -> Option<&ModelRef<Word>> {
        match self {
            Item::Word(word) => Some(word),
            Item::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&ModelRef<List>> {
        match self {
            Item::List(list) => Some(list),
            Item::Word(_) => None,
        }
    }
}

fn build_item(ast: &Ast) -> Item {
    match ast {
        Ast::Word(word) => Item::Word(ModelRef::new(Word {
            name: word.name.clone(),
            loudness: word.loudness,
            ast: Some(word.clone()),
        })),
        Ast::List(list) => Item::List(ModelRef::new(List {
            bracketed: list.bracketed,
            items: list.items.iter().map(build_item).collect(),
            ast: Some(list.clone()),
        })),
    }
}

pub struct ListBinding {
    text: String,
    separator: String,
}

impl ListBinding {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            separator: ",".to_string(),
        }
    }

    pub fn with_separator(mut self, separator: &str) -> Self {
        self.separator = separator.to_string();
        self
    }

    fn fragment(&self, span: (usize, usize)) -> P2ppResult<RawSourceFragment> {
        Ok(fragment_from_byte_span(&self.text, span.0, span.1)?)
    }

    fn word_layout(&self, handle: &ModelRef<Word>) -> NodeLayout<Ast, Item> {
        let word = handle.borrow();

        let name_handle = handle.clone();
        let mut name = Contents::dynamic(move || name_handle.borrow().name.clone());
        if let Some(ast) = &word.ast {
            if let Ok(fragment) = self.fragment(ast.name_span) {
                name = name.at(fragment);
            }
        }

        let loud = handle.clone();
        let quiet = handle.clone();
        let marker = Contents::conditional(
            move || loud.borrow().loudness == Some(true),
            Contents::fixed("!"),
            Some(Contents::conditional(
                move || quiet.borrow().loudness == Some(false),
                Contents::fixed("?"),
                Some(Contents::fixed("")),
            )),
        );

        NodeLayout {
            ast: word.ast.clone().map(Ast::Word),
            contents: vec![name, marker],
        }
    }

    fn list_layout(&self, handle: &ModelRef<List>) -> NodeLayout<Ast, Item> {
        let list = handle.borrow();
        let items = handle.clone();
        let children = Contents::children(move || items.borrow().items.clone())
            .separated_by(self.separator.as_str());

        let contents = if list.bracketed {
            vec![Contents::fixed("["), children, Contents::fixed("]")]
        } else {
            vec![children]
        };

        NodeLayout {
            ast: list.ast.clone().map(Ast::List),
            contents,
        }
    }
}

impl FragmentRetriever<Ast> for ListBinding {
    fn retrieve_fragment(&self, ast: &Ast) -> P2ppResult<RawSourceFragment> {
        self.fragment(ast.span())
    }
}

impl LanguageBinding for ListBinding {
    type Ast = Ast;
    type Object = Item;

    fn fragment_retriever(&self) -> &dyn FragmentRetriever<Ast> {
        self
    }

    fn build_model_object(&self, ast: &Ast) -> Item {
        build_item(ast)
    }

    fn make_object_node(&self, object: &Item) -> Option<NodeLayout<Ast, Item>> {
        Some(match object {
            Item::Word(word) => self.word_layout(word),
            Item::List(list) => self.list_layout(list),
        })
    }
}

/// A parsed list document and its root model handle
pub struct Document {
    pub tree: P2ppTree<ListBinding>,
    pub root: ModelRef<List>,
}

impl Document {
    pub fn render(&mut self) -> Result<String> {
        Ok(self.tree.render()?)
    }

    pub fn item(&self, index: usize) -> Item {
        self.root.borrow().items[index].clone()
    }

    pub fn word(&self, index: usize) -> ModelRef<Word> {
        match self.item(index) {
            Item::Word(word) => word,
            Item::List(_) => panic!("item {index} is a list"),
        }
    }

    pub fn list(&self, index: usize) -> ModelRef<List> {
        match self.item(index) {
            Item::List(list) => list,
            Item::Word(_) => panic!("item {index} is a word"),
        }
    }
}

pub fn load(text: &str) -> Result<Document> {
    load_with(ListBinding::new(text), text)
}

pub fn load_with(binding: ListBinding, text: &str) -> Result<Document> {
    init_tracing();
    let ast = parse(text)?;
    let tree = P2ppTree::deserialize(binding, text, &ast)?;

    let root = match tree.node(tree.root())?.object() {
        Item::List(list) => list.clone(),
        Item::Word(_) => bail!("root is not a list"),
    };
    Ok(Document { tree, root })
}

// ---------------------------------------------------------------------------
// Scripted binding
// ---------------------------------------------------------------------------

pub type Layout = Rc<dyn Fn() -> Vec<Contents<PieceRef>>>;

/// Model object laid out by a closure. Pieces without a layout have no node
/// factory.
pub struct Piece {
    pub label: String,
    pub span: Option<(usize, usize)>,
    pub layout: Option<Layout>,
}

impl fmt::Debug for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Piece({}, {:?})", self.label, self.span)
    }
}

pub type PieceRef = ModelRef<Piece>;

pub fn piece(
    label: &str,
    span: Option<(usize, usize)>,
    layout: impl Fn() -> Vec<Contents<PieceRef>> + 'static,
) -> PieceRef {
    ModelRef::new(Piece {
        label: label.to_string(),
        span,
        layout: Some(Rc::new(layout)),
    })
}

pub fn unlaid_piece(label: &str) -> PieceRef {
    ModelRef::new(Piece {
        label: label.to_string(),
        span: None,
        layout: None,
    })
}

/// Piece rendering a fixed word, parsed at `span` when given
pub fn leaf(label: &str, span: Option<(usize, usize)>) -> PieceRef {
    let text = label.to_string();
    piece(label, span, move || vec![Contents::fixed(text.clone())])
}

/// Byte span of the first occurrence of `needle` in `text`
pub fn span_of(text: &str, needle: &str) -> (usize, usize) {
    let start = text.find(needle).unwrap_or_else(|| panic!("`{needle}` not in `{text}`"));
    (start, start + needle.len())
}

pub struct ScriptedBinding {
    text: String,
}

impl ScriptedBinding {
    pub fn new(text: &str) -> Self {
        Self { text: text.to_string() }
    }
}

impl FragmentRetriever<PieceRef> for ScriptedBinding {
    fn retrieve_fragment(&self, ast: &PieceRef) -> P2ppResult<RawSourceFragment> {
        let piece = ast.borrow();
        let (start, end) = piece
            .span
            .ok_or_else(|| P2ppError::Binding(format!("{} was not parsed", piece.label)))?;
        Ok(fragment_from_byte_span(&self.text, start, end)?)
    }
}

impl LanguageBinding for ScriptedBinding {
    type Ast = PieceRef;
    type Object = PieceRef;

    fn fragment_retriever(&self) -> &dyn FragmentRetriever<PieceRef> {
        self
    }

    fn build_model_object(&self, ast: &PieceRef) -> PieceRef {
        ast.clone()
    }

    fn make_object_node(&self, object: &PieceRef) -> Option<NodeLayout<PieceRef, PieceRef>> {
        let piece = object.borrow();
        let layout = piece.layout.as_ref()?;
        Some(NodeLayout {
            ast: piece.span.map(|_| object.clone()),
            contents: (layout.as_ref())(),
        })
    }
}

/// Parse-free setup: `root` must carry the span of the whole document part
/// it covers
pub fn scripted(text: &str, root: &PieceRef) -> Result<P2ppTree<ScriptedBinding>> {
    init_tracing();
    Ok(P2ppTree::deserialize(ScriptedBinding::new(text), text, root)?)
}
