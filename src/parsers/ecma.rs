use std::collections::{BTreeMap, HashMap};
use std::mem;

use tree_sitter::{Node, Parser};

use super::{field_text, first_line_signature, line_of, node_text, qualify, LanguageParser, ParseOutcome};
use crate::errors::{IndexError, Result};
use crate::types::{FileRecord, Language, Symbol, SymbolId, SymbolKind};

/// Parsing strategy for the ECMAScript dialects: TypeScript, TSX,
/// JavaScript and JSX, parameterized by grammar.
pub struct EcmaParser {
    grammar: tree_sitter::Language,
    language: Language,
}

impl EcmaParser {
    pub fn typescript() -> Result<Self> {
        Self::with_grammar(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(), Language::TypeScript)
    }

    pub fn tsx() -> Result<Self> {
        Self::with_grammar(tree_sitter_typescript::LANGUAGE_TSX.into(), Language::TypeScript)
    }

    pub fn javascript() -> Result<Self> {
        Self::with_grammar(tree_sitter_javascript::LANGUAGE.into(), Language::JavaScript)
    }

    fn with_grammar(grammar: tree_sitter::Language, language: Language) -> Result<Self> {
        let mut probe = Parser::new();
        probe
            .set_language(&grammar)
            .map_err(|e| IndexError::UnsupportedLanguage(format!("{}: {e}", language.as_str())))?;
        Ok(Self { grammar, language })
    }
}

impl LanguageParser for EcmaParser {
    fn language(&self) -> Language {
        self.language
    }

    fn parse(&self, rel_path: &str, content: &str) -> Result<ParseOutcome> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.grammar)
            .map_err(|e| IndexError::UnsupportedLanguage(format!("{}: {e}", self.language.as_str())))?;
        let tree = parser
            .parse(content, None)
            .ok_or_else(|| IndexError::ParseFailure(rel_path.to_owned()))?;

        let mut collector = EcmaCollector {
            source: content,
            rel_path,
            language: self.language,
            symbols: BTreeMap::new(),
            functions: Vec::new(),
            classes: Vec::new(),
            imports: Vec::new(),
            exports: Vec::new(),
            lookup: HashMap::new(),
            pending_calls: Vec::new(),
        };
        collector.walk(tree.root_node(), None, None);
        Ok(collector.finish())
    }
}

struct EcmaCollector<'a> {
    source: &'a str,
    rel_path: &'a str,
    language: Language,
    symbols: BTreeMap<SymbolId, Symbol>,
    functions: Vec<String>,
    classes: Vec<String>,
    imports: Vec<String>,
    exports: Vec<String>,
    lookup: HashMap<String, SymbolId>,
    pending_calls: Vec<(SymbolId, SymbolId)>,
}

impl EcmaCollector<'_> {
    fn walk(&mut self, node: Node<'_>, enclosing_type: Option<&str>, enclosing_fn: Option<&SymbolId>) {
        match node.kind() {
            "function_declaration" => {
                if let Some(name) = field_text(node, "name", self.source) {
                    let id = SymbolId::new(self.rel_path, &name);
                    let mut symbol = Symbol::new(SymbolKind::Function, self.rel_path, line_of(node));
                    symbol.signature = first_line_signature(node, self.source);
                    self.symbols.insert(id.clone(), symbol);
                    self.lookup.insert(name.clone(), id.clone());
                    self.functions.push(name);

                    let mut cursor = node.walk();
                    for child in node.children(&mut cursor) {
                        self.walk(child, enclosing_type, Some(&id));
                    }
                    return;
                }
            }
            "class_declaration" => {
                if let Some(name) = field_text(node, "name", self.source) {
                    let id = SymbolId::new(self.rel_path, &name);
                    self.symbols.insert(id.clone(), Symbol::new(SymbolKind::Class, self.rel_path, line_of(node)));
                    self.lookup.insert(name.clone(), id);
                    self.classes.push(name.clone());
                    self.declare_members(node, &name);

                    let mut cursor = node.walk();
                    for child in node.children(&mut cursor) {
                        self.walk(child, Some(name.as_str()), enclosing_fn);
                    }
                    return;
                }
            }
            "interface_declaration" => {
                if let Some(name) = field_text(node, "name", self.source) {
                    let id = SymbolId::new(self.rel_path, &name);
                    self.symbols.insert(id.clone(), Symbol::new(SymbolKind::Interface, self.rel_path, line_of(node)));
                    self.lookup.insert(name.clone(), id);
                    self.classes.push(name.clone());

                    let mut cursor = node.walk();
                    for child in node.children(&mut cursor) {
                        self.walk(child, Some(name.as_str()), enclosing_fn);
                    }
                    return;
                }
            }
            "method_definition" => {
                if let (Some(type_name), Some(name)) = (enclosing_type, field_text(node, "name", self.source)) {
                    let qualified = qualify(Some(type_name), &name);
                    let id = SymbolId::new(self.rel_path, &qualified);
                    let mut symbol = Symbol::new(SymbolKind::Method, self.rel_path, line_of(node));
                    symbol.signature = first_line_signature(node, self.source);
                    self.symbols.insert(id.clone(), symbol);
                    self.lookup.insert(qualified.clone(), id.clone());
                    self.lookup.insert(name, id.clone());
                    self.functions.push(qualified);

                    let mut cursor = node.walk();
                    for child in node.children(&mut cursor) {
                        self.walk(child, enclosing_type, Some(&id));
                    }
                    return;
                }
            }
            "call_expression" => {
                if let Some(caller) = enclosing_fn {
                    if let Some(callee) = self.called_name(node) {
                        if let Some(id) = self.lookup.get(&callee) {
                            self.pending_calls.push((id.clone(), caller.clone()));
                        }
                    }
                }
            }
            "import_statement" => {
                if let Some(text) = node_text(node, self.source) {
                    self.imports.push(text.trim().to_owned());
                }
            }
            "export_statement" => {
                if let Some(text) = node_text(node, self.source) {
                    self.exports.push(text.trim().to_owned());
                }
            }
            _ => {}
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.walk(child, enclosing_type, enclosing_fn);
        }
    }

    /// Pre-register a class body's method names so intra-class calls
    /// resolve regardless of declaration order.
    fn declare_members(&mut self, class_node: Node<'_>, class_name: &str) {
        let Some(body) = class_node.child_by_field_name("body") else {
            return;
        };
        let mut cursor = body.walk();
        for member in body.children(&mut cursor) {
            if member.kind() != "method_definition" {
                continue;
            }
            if let Some(name) = field_text(member, "name", self.source) {
                let qualified = qualify(Some(class_name), &name);
                let id = SymbolId::new(self.rel_path, &qualified);
                self.lookup.insert(qualified, id.clone());
                self.lookup.insert(name, id);
            }
        }
    }

    /// Callee name of a call expression: a bare identifier, or the property
    /// of a member expression (`this.sum()` resolves as `sum`).
    fn called_name(&self, node: Node<'_>) -> Option<String> {
        let function = node.child_by_field_name("function")?;
        match function.kind() {
            "identifier" => node_text(function, self.source).map(str::to_owned),
            "member_expression" => field_text(function, "property", self.source),
            _ => None,
        }
    }

    fn finish(mut self) -> ParseOutcome {
        for (callee, caller) in mem::take(&mut self.pending_calls) {
            if let Some(symbol) = self.symbols.get_mut(&callee) {
                symbol.called_by.insert(caller);
            }
        }
        let record = FileRecord {
            language: self.language,
            line_count: self.source.lines().count() as u32,
            functions: self.functions,
            classes: self.classes,
            imports: self.imports,
            exports: Some(self.exports),
            package: None,
        };
        ParseOutcome {
            symbols: self.symbols,
            record,
        }
    }
}
