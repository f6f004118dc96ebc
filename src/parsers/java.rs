use std::collections::{BTreeMap, HashMap};
use std::mem;

use tree_sitter::{Node, Parser};

use super::{field_text, first_line_signature, line_of, node_text, qualify, LanguageParser, ParseOutcome};
use crate::errors::{IndexError, Result};
use crate::types::{FileRecord, Language, Symbol, SymbolId, SymbolKind};

/// Java parsing strategy.
pub struct JavaParser {
    grammar: tree_sitter::Language,
}

impl JavaParser {
    pub fn new() -> Result<Self> {
        let grammar: tree_sitter::Language = tree_sitter_java::LANGUAGE.into();
        let mut probe = Parser::new();
        probe
            .set_language(&grammar)
            .map_err(|e| IndexError::UnsupportedLanguage(format!("java: {e}")))?;
        Ok(Self { grammar })
    }
}

impl LanguageParser for JavaParser {
    fn language(&self) -> Language {
        Language::Java
    }

    fn parse(&self, rel_path: &str, content: &str) -> Result<ParseOutcome> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.grammar)
            .map_err(|e| IndexError::UnsupportedLanguage(format!("java: {e}")))?;
        let tree = parser
            .parse(content, None)
            .ok_or_else(|| IndexError::ParseFailure(rel_path.to_owned()))?;

        let mut collector = JavaCollector {
            source: content,
            rel_path,
            symbols: BTreeMap::new(),
            functions: Vec::new(),
            classes: Vec::new(),
            imports: Vec::new(),
            package: None,
            lookup: HashMap::new(),
            pending_calls: Vec::new(),
        };
        collector.walk(tree.root_node(), None, None);
        Ok(collector.finish())
    }
}

struct JavaCollector<'a> {
    source: &'a str,
    rel_path: &'a str,
    symbols: BTreeMap<SymbolId, Symbol>,
    functions: Vec<String>,
    classes: Vec<String>,
    imports: Vec<String>,
    package: Option<String>,
    /// name -> id, filled in traversal order; later declarations win.
    lookup: HashMap<String, SymbolId>,
    /// (callee, caller) edges resolved at call sites, applied at the end.
    pending_calls: Vec<(SymbolId, SymbolId)>,
}

impl JavaCollector<'_> {
    fn walk(&mut self, node: Node<'_>, enclosing_type: Option<&str>, enclosing_method: Option<&SymbolId>) {
        match node.kind() {
            "class_declaration" | "interface_declaration" => {
                if let Some(name) = field_text(node, "name", self.source) {
                    let kind = if node.kind() == "class_declaration" {
                        SymbolKind::Class
                    } else {
                        SymbolKind::Interface
                    };
                    let id = SymbolId::new(self.rel_path, &name);
                    self.symbols.insert(id.clone(), Symbol::new(kind, self.rel_path, line_of(node)));
                    self.lookup.insert(name.clone(), id);
                    self.classes.push(name.clone());
                    self.declare_members(node, &name);

                    let mut cursor = node.walk();
                    for child in node.children(&mut cursor) {
                        self.walk(child, Some(name.as_str()), enclosing_method);
                    }
                    return;
                }
            }
            "method_declaration" => {
                if let Some(name) = field_text(node, "name", self.source) {
                    let qualified = qualify(enclosing_type, &name);
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
            "method_invocation" => {
                if let Some(caller) = enclosing_method {
                    if let Some(callee) = field_text(node, "name", self.source) {
                        if let Some(id) = self.lookup.get(&callee) {
                            self.pending_calls.push((id.clone(), caller.clone()));
                        }
                    }
                }
            }
            "import_declaration" => {
                if let Some(text) = node_text(node, self.source) {
                    let import = text.trim_start_matches("import").trim_end_matches(';').trim();
                    if !import.is_empty() {
                        self.imports.push(import.to_owned());
                    }
                }
            }
            "package_declaration" => {
                if self.package.is_none() {
                    self.package = self.package_name(node);
                }
            }
            _ => {}
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.walk(child, enclosing_type, enclosing_method);
        }
    }

    /// Register member method names before descending into bodies, so calls
    /// between members of the same type resolve regardless of declaration
    /// order.
    fn declare_members(&mut self, type_node: Node<'_>, type_name: &str) {
        let Some(body) = type_node.child_by_field_name("body") else {
            return;
        };
        let mut cursor = body.walk();
        for member in body.children(&mut cursor) {
            if member.kind() != "method_declaration" {
                continue;
            }
            if let Some(name) = field_text(member, "name", self.source) {
                let qualified = qualify(Some(type_name), &name);
                let id = SymbolId::new(self.rel_path, &qualified);
                self.lookup.insert(qualified, id.clone());
                self.lookup.insert(name, id);
            }
        }
    }

    fn package_name(&self, node: Node<'_>) -> Option<String> {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if matches!(child.kind(), "scoped_identifier" | "identifier") {
                return node_text(child, self.source).map(str::to_owned);
            }
        }
        None
    }

    fn finish(mut self) -> ParseOutcome {
        for (callee, caller) in mem::take(&mut self.pending_calls) {
            if let Some(symbol) = self.symbols.get_mut(&callee) {
                symbol.called_by.insert(caller);
            }
        }
        let record = FileRecord {
            language: Language::Java,
            line_count: self.source.lines().count() as u32,
            functions: self.functions,
            classes: self.classes,
            imports: self.imports,
            exports: None,
            package: self.package,
        };
        ParseOutcome {
            symbols: self.symbols,
            record,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> ParseOutcome {
        JavaParser::new().unwrap().parse("src/Sample.java", content).unwrap()
    }

    fn id(name: &str) -> SymbolId {
        SymbolId::new("src/Sample.java", name)
    }

    #[test]
    fn extracts_classes_methods_imports_and_package() {
        let outcome = parse(
            r#"
package com.example.shop;

import java.util.List;
import static java.util.Objects.requireNonNull;

public class Order {
    void confirm() { ship(); }
    void ship() {}
}
"#,
        );

        let record = &outcome.record;
        assert_eq!(record.language, Language::Java);
        assert_eq!(record.classes, vec!["Order"]);
        assert_eq!(record.functions, vec!["Order.confirm", "Order.ship"]);
        assert_eq!(
            record.imports,
            vec!["java.util.List", "static java.util.Objects.requireNonNull"]
        );
        assert_eq!(record.package.as_deref(), Some("com.example.shop"));
        assert!(record.exports.is_none());

        assert_eq!(outcome.symbols[&id("Order")].kind, SymbolKind::Class);
        assert_eq!(outcome.symbols[&id("Order.confirm")].kind, SymbolKind::Method);
    }

    #[test]
    fn records_call_edges_between_members() {
        let outcome = parse("class Order { void confirm() { ship(); } void ship() {} }");
        let ship = &outcome.symbols[&id("Order.ship")];
        let callers: Vec<_> = ship.called_by.iter().collect();
        assert_eq!(callers, vec![&id("Order.confirm")]);
    }

    #[test]
    fn call_edges_are_deduplicated() {
        let outcome = parse("class A { void run() { step(); step(); } void step() {} }");
        assert_eq!(outcome.symbols[&id("A.step")].called_by.len(), 1);
    }

    #[test]
    fn cross_type_forward_references_stay_unresolved() {
        let outcome = parse("class A { void run() { helper(); } }\nclass B { void helper() {} }");
        assert!(outcome.symbols[&id("B.helper")].called_by.is_empty());
    }

    #[test]
    fn interfaces_are_indexed() {
        let outcome = parse("interface Shippable { void ship(); }");
        assert_eq!(outcome.symbols[&id("Shippable")].kind, SymbolKind::Interface);
        assert!(outcome.record.classes.contains(&"Shippable".to_string()));
    }

    #[test]
    fn method_signature_is_first_line() {
        let outcome = parse("class A {\n    public int sum(int a, int b) {\n        return a + b;\n    }\n}");
        let sum = &outcome.symbols[&id("A.sum")];
        assert_eq!(sum.signature.as_deref(), Some("public int sum(int a, int b) {"));
        assert_eq!(sum.line, 2);
    }

    #[test]
    fn overloads_collapse_to_one_symbol() {
        let outcome = parse("class A { void m(int x) {} void m(String s) {} }");
        assert_eq!(outcome.symbols.len(), 2); // A and A.m
        assert_eq!(outcome.record.functions, vec!["A.m", "A.m"]);
    }

    #[test]
    fn malformed_source_degrades_to_partial_result() {
        let outcome = parse("class Broken { void ok() {}\n%%%%");
        assert!(outcome.record.classes.contains(&"Broken".to_string()));
    }

    #[test]
    fn parsing_is_deterministic() {
        let content = "class A { void m() { n(); } void n() {} }";
        let first = parse(content);
        let second = parse(content);
        assert_eq!(first.symbols, second.symbols);
        assert_eq!(first.record, second.record);
    }
}
