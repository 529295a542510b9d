//! Values comment annotation parser: a line-by-line state machine.
//!
//! Walks the values file text once, tracking the key path of every
//! structural line by indentation, and collects comment blocks into
//! [`Annotation`]s. A block attaches to the key declared on the line right
//! after it; `# some.key -- text` blocks name their key path explicitly.

use crate::model::*;
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;
use tracing::debug;

// -- Regex patterns -----------------------------------------------------------

// `-- text`, optionally `-- (type) text`
static RE_DESC_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^--(?:[[:space:]]+(.*?))?[[:space:]]*$").unwrap());

static RE_TYPE_HINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\(([^)]*)\)[[:space:]]*(.*)$").unwrap());

// `@name -- value`, `@name: value`, `@name value`, `@name`
static RE_AT_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^@([A-Za-z][A-Za-z0-9_]*)(?:[[:space:]]*--|[[:space:]]*:|[[:space:]]|$)[[:space:]]*(.*?)[[:space:]]*$",
    )
    .unwrap()
});

// `some.key[0].path -- text`
static RE_EXPLICIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9_][A-Za-z0-9_./\[\]-]*)[[:space:]]+--(?:[[:space:]]+(.*?))?[[:space:]]*$")
        .unwrap()
});

// `name: value` where name is a known directive
static RE_PLAIN_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z][A-Za-z0-9_]*):(?:[[:space:]]+(.*?))?[[:space:]]*$").unwrap()
});

// Block mapping key, plain or quoted, with optional inline value
static RE_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^("(?:[^"\\]|\\.)*"|'(?:[^']|'')*'|[^[:space:]#"'{}\[\],][^#]*?)[[:space:]]*:(?:[[:space:]]+(.*?))?[[:space:]]*$"#,
    )
    .unwrap()
});

// `|`, `>-`, `|+2`, optionally followed by a comment
static RE_BLOCK_SCALAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[|>][-+0-9]*[[:space:]]*(?:#.*)?$").unwrap());

// -- Directive registry -------------------------------------------------------

/// A recognised annotation directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
    Description,
    Default,
    Type,
    Section,
    Hidden,
    Raw,
}

impl Directive {
    fn takes_text(self) -> bool {
        matches!(
            self,
            Directive::Description | Directive::Default | Directive::Type | Directive::Section
        )
    }
}

/// The directive names the parser recognises, mapped to their meaning.
#[derive(Debug, Clone)]
pub struct DirectiveSet {
    names: HashMap<String, Directive>,
}

impl Default for DirectiveSet {
    fn default() -> Self {
        Self::empty()
            .with("description", Directive::Description)
            .with("default", Directive::Default)
            .with("type", Directive::Type)
            .with("section", Directive::Section)
            .with("hidden", Directive::Hidden)
            .with("skip", Directive::Hidden)
            .with("ignored", Directive::Hidden)
            .with("raw", Directive::Raw)
    }
}

impl DirectiveSet {
    /// A set recognising no names at all. Only `# --` and explicit
    /// key-path descriptions are parsed.
    pub fn empty() -> Self {
        Self {
            names: HashMap::new(),
        }
    }

    /// Register `name` as spelling `directive`.
    pub fn with(mut self, name: impl Into<String>, directive: Directive) -> Self {
        self.names.insert(name.into(), directive);
        self
    }

    pub fn lookup(&self, name: &str) -> Option<Directive> {
        self.names.get(name).copied()
    }
}

// -- Output -------------------------------------------------------------------

/// Annotations keyed by full key path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationMap {
    entries: BTreeMap<String, Annotation>,
}

impl AnnotationMap {
    pub fn get(&self, path: &str) -> Option<&Annotation> {
        self.entries.get(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Annotation)> {
        self.entries.iter()
    }
}

impl FromIterator<(String, Annotation)> for AnnotationMap {
    /// First occurrence of a key path wins.
    fn from_iter<I: IntoIterator<Item = (String, Annotation)>>(iter: I) -> Self {
        let mut entries = BTreeMap::new();
        for (path, annotation) in iter {
            entries.entry(path).or_insert(annotation);
        }
        Self { entries }
    }
}

/// Extracts annotations from values file comments.
#[derive(Debug, Clone, Default)]
pub struct AnnotationParser {
    directives: DirectiveSet,
}

impl AnnotationParser {
    pub fn new(directives: DirectiveSet) -> Self {
        Self { directives }
    }

    /// Parse the comments of `source` against its parsed structure.
    ///
    /// Never fails: unknown directives are skipped and annotations naming a
    /// key path absent from `config` are dropped.
    pub fn parse(&self, source: &str, config: &ConfigNode) -> AnnotationMap {
        let mut state = ParserState::new(&self.directives);
        for line in source.lines() {
            state.process_line(line);
        }
        state.finish_detached("end of file");

        let known: HashSet<&str> = config.paths().into_iter().collect();
        // Explicit key-path blocks take precedence over positional ones
        state
            .explicit
            .into_iter()
            .chain(state.positional)
            .filter(|(path, _)| {
                let keep = known.contains(path.as_str());
                if !keep {
                    debug!(key = %path, "dropping annotation for unknown key path");
                }
                keep
            })
            .collect()
    }
}

// -- Parser state -------------------------------------------------------------

/// One open structural context: a mapping key or a sequence item.
struct Frame {
    indent: usize,
    path: String,
    item: bool,
}

#[derive(Default)]
struct Block {
    annotation: Annotation,
    explicit_path: Option<String>,
    seen: HashSet<Directive>,
    /// Directive that receives continuation lines
    current: Option<Directive>,
}

impl Block {
    fn explicit(path: &str) -> Self {
        Self {
            explicit_path: Some(path.to_string()),
            ..Default::default()
        }
    }

    fn has(&self, directive: Directive) -> bool {
        self.seen.contains(&directive)
    }

    /// `-- text` with an optional leading `(type)` hint.
    fn start_description(&mut self, text: &str) {
        match RE_TYPE_HINT.captures(text) {
            Some(caps) => {
                let hint = caps[1].trim().to_string();
                let rest = caps.get(2).map_or("", |m| m.as_str()).to_string();
                if !hint.is_empty() {
                    self.apply(Directive::Type, &hint);
                }
                self.apply(Directive::Description, &rest);
            }
            None => self.apply(Directive::Description, text),
        }
    }

    fn apply(&mut self, directive: Directive, value: &str) {
        self.current = None;
        // Repeated directives keep their first value
        if !self.seen.insert(directive) {
            return;
        }
        let value = value.trim();
        let a = &mut self.annotation;
        match directive {
            Directive::Description => a.description = value.to_string(),
            Directive::Default => a.default_override = Some(value.to_string()),
            Directive::Type => a.type_override = Some(value.to_string()),
            Directive::Section => a.section = Some(value.to_string()),
            Directive::Hidden => a.hidden = flag(value),
            Directive::Raw => a.raw = flag(value),
        }
        if directive.takes_text() {
            self.current = Some(directive);
        }
    }

    fn continue_with(&mut self, text: &str) {
        let a = &mut self.annotation;
        let field = match self.current {
            Some(Directive::Description) => &mut a.description,
            Some(Directive::Default) => a.default_override.get_or_insert_with(String::new),
            Some(Directive::Type) => a.type_override.get_or_insert_with(String::new),
            Some(Directive::Section) => a.section.get_or_insert_with(String::new),
            _ => return,
        };
        concat_str(field, text);
    }

    fn into_annotation(self) -> Annotation {
        let mut a = self.annotation;
        a.description = a.description.trim().to_string();
        a.default_override = non_empty(a.default_override);
        a.type_override = non_empty(a.type_override);
        a.section = non_empty(a.section);
        a
    }
}

struct ParserState<'d> {
    directives: &'d DirectiveSet,

    // Results, in order of completion
    positional: Vec<(String, Annotation)>,
    explicit: Vec<(String, Annotation)>,

    // Current comment block
    block: Option<Block>,

    // Structure tracking
    stack: Vec<Frame>,
    item_counters: HashMap<String, usize>,
    /// Indent of the key owning an open block scalar
    block_scalar: Option<usize>,
}

impl<'d> ParserState<'d> {
    fn new(directives: &'d DirectiveSet) -> Self {
        Self {
            directives,
            positional: Vec::new(),
            explicit: Vec::new(),
            block: None,
            stack: Vec::new(),
            item_counters: HashMap::new(),
            block_scalar: None,
        }
    }

    // -- Line processing ------------------------------------------------------

    fn process_line(&mut self, line: &str) {
        let indent = line.len() - line.trim_start_matches(' ').len();
        let content = line[indent..].trim_end();

        // 1. Block scalar content, comment-looking lines included
        if let Some(owner) = self.block_scalar {
            if content.is_empty() || indent > owner {
                return;
            }
            self.block_scalar = None;
        }

        // 2. Blank line detaches a pending block
        if content.is_empty() {
            self.finish_detached("blank line");
            return;
        }

        // 3. Comments
        if let Some(body) = content.trim_start().strip_prefix('#') {
            self.comment_line(body);
            return;
        }

        // 4. Document markers
        if content == "---" || content.starts_with("--- ") || content == "..." {
            self.finish_detached("document marker");
            self.stack.clear();
            self.item_counters.clear();
            return;
        }

        // 5. Keys and sequence items
        self.structure_line(indent, content);
    }

    fn comment_line(&mut self, body: &str) {
        let body = body.strip_prefix(' ').unwrap_or(body).trim_end();
        let trimmed = body.trim_start();

        // `# -- text` (a second description starts a new block)
        if let Some(caps) = RE_DESC_START.captures(trimmed) {
            let text = caps.get(1).map_or("", |m| m.as_str());
            if self
                .block
                .as_ref()
                .is_some_and(|b| b.explicit_path.is_some() || b.has(Directive::Description))
            {
                self.finish_detached("new description");
            }
            self.block
                .get_or_insert_with(Block::default)
                .start_description(text);
            return;
        }

        // `# @name -- value`
        if let Some(caps) = RE_AT_DIRECTIVE.captures(trimmed) {
            let name = &caps[1];
            let value = caps.get(2).map_or("", |m| m.as_str());
            match self.directives.lookup(name) {
                Some(directive) => self
                    .block
                    .get_or_insert_with(Block::default)
                    .apply(directive, value),
                None => {
                    debug!(directive = name, "ignoring unknown annotation directive");
                    if let Some(block) = self.block.as_mut() {
                        block.current = None;
                    }
                }
            }
            return;
        }

        // `# some.key -- text`, unless it continues an open positional text
        if let Some(caps) = RE_EXPLICIT.captures(trimmed) {
            let continues = self
                .block
                .as_ref()
                .is_some_and(|b| b.explicit_path.is_none() && b.current.is_some());
            if !continues {
                self.finish_detached("explicit key path");
                let mut block = Block::explicit(&caps[1]);
                block.start_description(caps.get(2).map_or("", |m| m.as_str()));
                self.block = Some(block);
                return;
            }
        }

        // `# description: text`
        if let Some(caps) = RE_PLAIN_TAG.captures(trimmed) {
            if let Some(directive) = self.directives.lookup(&caps[1]) {
                let value = caps.get(2).map_or("", |m| m.as_str());
                self.block
                    .get_or_insert_with(Block::default)
                    .apply(directive, value);
                return;
            }
        }

        // Plain comment: continuation of an open block, otherwise ignored
        if let Some(block) = self.block.as_mut() {
            block.continue_with(body);
        }
    }

    fn structure_line(&mut self, indent: usize, content: &str) {
        let mut col = indent;
        let mut rest = content;
        let mut target: Option<String> = None;

        // Leading `- ` markers, possibly nested (`- - a`)
        while rest == "-" || rest.starts_with("- ") {
            let item_col = col;
            let path = self.push_item(item_col);
            target.get_or_insert(path);
            let after = &rest[1..];
            let trimmed = after.trim_start_matches(' ');
            col += 1 + (after.len() - trimmed.len());
            rest = trimmed;
            if RE_BLOCK_SCALAR.is_match(rest) {
                self.block_scalar = Some(item_col);
            }
        }

        if !rest.is_empty() && !rest.starts_with('#') {
            if let Some(caps) = RE_KEY.captures(rest) {
                let key = unquote(&caps[1]);
                let path = self.push_key(col, &key);
                target.get_or_insert(path);
                let value = caps.get(2).map_or("", |m| m.as_str());
                if RE_BLOCK_SCALAR.is_match(value) {
                    self.block_scalar = Some(col);
                }
            }
        }

        match target {
            Some(path) => self.attach(path),
            None => self.finish_detached("not followed by a key"),
        }
    }

    fn push_item(&mut self, col: usize) -> String {
        while let Some(top) = self.stack.last() {
            if top.indent > col || (top.indent == col && top.item) {
                self.stack.pop();
            } else {
                break;
            }
        }
        let parent = self.stack.last().map(|f| f.path.clone()).unwrap_or_default();
        let counter = self.item_counters.entry(parent.clone()).or_insert(0);
        let path = index_path(&parent, *counter);
        *counter += 1;
        self.stack.push(Frame {
            indent: col,
            path: path.clone(),
            item: true,
        });
        path
    }

    fn push_key(&mut self, col: usize, key: &str) -> String {
        while self.stack.last().is_some_and(|top| top.indent >= col) {
            self.stack.pop();
        }
        let parent = self.stack.last().map_or("", |f| f.path.as_str());
        let path = child_path(parent, key);
        self.stack.push(Frame {
            indent: col,
            path: path.clone(),
            item: false,
        });
        path
    }

    // -- Block completion -----------------------------------------------------

    /// Attach the open block to the key declared on the current line.
    fn attach(&mut self, path: String) {
        let Some(block) = self.block.take() else {
            return;
        };
        match block.explicit_path.clone() {
            Some(explicit) => self.explicit.push((explicit, block.into_annotation())),
            None => self.positional.push((path, block.into_annotation())),
        }
    }

    /// Close the open block without a following key.
    ///
    /// Explicit key-path blocks are kept; positional ones are dropped.
    fn finish_detached(&mut self, reason: &str) {
        let Some(block) = self.block.take() else {
            return;
        };
        match block.explicit_path.clone() {
            Some(explicit) => self.explicit.push((explicit, block.into_annotation())),
            None => debug!(reason, "dropping annotation block not attached to a key"),
        }
    }
}

// -- Helper functions ---------------------------------------------------------

/// Concatenate strings with newline separator.
fn concat_str(dest: &mut String, text: &str) {
    if dest.is_empty() {
        *dest = text.to_string();
    } else {
        dest.push('\n');
        dest.push_str(text);
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Flag directives are on unless explicitly switched off.
fn flag(value: &str) -> bool {
    !matches!(value, "false" | "no" | "off")
}

fn unquote(key: &str) -> String {
    if key.starts_with('"') || key.starts_with('\'') {
        if let Ok(s) = serde_yaml::from_str::<String>(key) {
            return s;
        }
    }
    key.trim().to_string()
}
