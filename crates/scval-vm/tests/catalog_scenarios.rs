//! Integration test for the catalog schema scenarios (`spec.md` §8,
//! S1-S7): compile a realistic schema once, then drive it against a
//! small in-memory document cursor for each scenario.

use std::collections::HashMap;

use scval_codegen::{generate, Bytecode};
use scval_core::hash::hash_str;
use scval_core::parser::Parser;
use scval_vm::{run, HostCursor, RunOutcome};

const CATALOG_SCHEMA: &str = "\
    @author #AUTHOR  @date #DATE  @price #PRICE\n\
    !catalog { *book[id(str)] {\n\
      !author(author) !title(str) !genre(str)\n\
      !price(price)  !publish_date(date) !description(str) } }";

/// A minimal in-memory document tree, standing in for a real XML
/// reader -- just enough structure to drive every `HostCursor`
/// operation the VM issues.
#[derive(Debug, Clone)]
struct Elem {
    name: String,
    value: Option<String>,
    attrs: Vec<(String, String)>,
    children: Vec<Elem>,
}

impl Elem {
    fn new(name: &str) -> Self {
        Elem {
            name: name.to_string(),
            value: None,
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    fn attr(mut self, k: &str, v: &str) -> Self {
        self.attrs.push((k.to_string(), v.to_string()));
        self
    }

    fn child(mut self, c: Elem) -> Self {
        self.children.push(c);
        self
    }

    fn value(mut self, v: &str) -> Self {
        self.value = Some(v.to_string());
        self
    }
}

/// Cursor over an `Elem` forest: a stack of sibling-lists (pushed by
/// `DOWN`, popped by `UP`) plus a flat index within the current level.
struct TreeCursor {
    levels: Vec<Vec<Elem>>,
    index_stack: Vec<usize>,
    attr_index: usize,
    callbacks: HashMap<u32, bool>,
}

impl TreeCursor {
    fn new(roots: Vec<Elem>, callbacks: HashMap<u32, bool>) -> Self {
        TreeCursor {
            levels: vec![roots],
            index_stack: vec![0],
            attr_index: 0,
            callbacks,
        }
    }

    fn current(&self) -> Option<&Elem> {
        let level = self.levels.last()?;
        let idx = *self.index_stack.last()?;
        level.get(idx)
    }
}

impl HostCursor for TreeCursor {
    fn element_name(&mut self) -> Option<String> {
        self.current().map(|e| e.name.clone())
    }

    fn element_value(&mut self) -> Option<String> {
        self.current().and_then(|e| e.value.clone())
    }

    fn attr_name(&mut self) -> Option<String> {
        self.current()?.attrs.get(self.attr_index).map(|a| a.0.clone())
    }

    fn attr_value(&mut self) -> Option<String> {
        self.current()?.attrs.get(self.attr_index).map(|a| a.1.clone())
    }

    fn down(&mut self) {
        let children = self.current().map(|e| e.children.clone()).unwrap_or_default();
        self.levels.push(children);
        self.index_stack.push(0);
    }

    fn up(&mut self) {
        self.levels.pop();
        self.index_stack.pop();
    }

    fn gatt(&mut self) {
        self.attr_index = 0;
    }

    fn natt(&mut self) {
        self.attr_index += 1;
    }

    fn next(&mut self) {
        if let Some(idx) = self.index_stack.last_mut() {
            *idx += 1;
        }
        self.attr_index = 0;
    }

    fn call(&mut self, type_name_hash: u32, value: &str) -> bool {
        self.callbacks
            .get(&type_name_hash)
            .copied()
            .unwrap_or(!value.is_empty())
    }
}

fn compile(src: &str) -> Bytecode {
    let tree = Parser::new(src).parse().expect("valid schema");
    generate(&tree).expect("codegen should succeed")
}

fn book_with(fields: &[(&str, &str)]) -> Elem {
    let mut book = Elem::new("book").attr("id", "978-0");
    for (name, text) in fields {
        book = book.child(Elem::new(name).value(text));
    }
    book
}

fn all_six_fields() -> Vec<(&'static str, &'static str)> {
    vec![
        ("author", "Jane Doe"),
        ("title", "A Title"),
        ("genre", "Fiction"),
        ("price", "9.99"),
        ("publish_date", "2020-01-01"),
        ("description", "A book."),
    ]
}

fn run_catalog(bc: &Bytecode, catalog: Elem) -> RunOutcome {
    let mut cursor = TreeCursor::new(vec![catalog], HashMap::new());
    run(bc, &mut cursor, false).expect("no vm fault")
}

#[test]
fn s1_empty_catalog_is_accepted() {
    let bc = compile(CATALOG_SCHEMA);
    let outcome = run_catalog(&bc, Elem::new("catalog"));
    assert!(outcome.accepted);
}

#[test]
fn s2_fully_populated_book_is_accepted() {
    let bc = compile(CATALOG_SCHEMA);
    let catalog = Elem::new("catalog").child(book_with(&all_six_fields()));
    let outcome = run_catalog(&bc, catalog);
    assert!(outcome.accepted);
}

#[test]
fn s3_missing_price_is_rejected() {
    let bc = compile(CATALOG_SCHEMA);
    let fields: Vec<_> = all_six_fields().into_iter().filter(|(n, _)| *n != "price").collect();
    let catalog = Elem::new("catalog").child(book_with(&fields));
    let outcome = run_catalog(&bc, catalog);
    assert!(!outcome.accepted);
}

#[test]
fn s4_duplicate_title_is_rejected() {
    let bc = compile(CATALOG_SCHEMA);
    let mut fields = all_six_fields();
    fields.push(("title", "Second Title"));
    let catalog = Elem::new("catalog").child(book_with(&fields));
    let outcome = run_catalog(&bc, catalog);
    assert!(!outcome.accepted);
}

#[test]
fn s5_missing_id_attribute_is_rejected() {
    let bc = compile(CATALOG_SCHEMA);
    let mut book = Elem::new("book");
    for (name, text) in all_six_fields() {
        book = book.child(Elem::new(name).value(text));
    }
    let catalog = Elem::new("catalog").child(book);
    let outcome = run_catalog(&bc, catalog);
    assert!(!outcome.accepted);
}

#[test]
fn s6_rejecting_author_callback_rejects_document() {
    let bc = compile(CATALOG_SCHEMA);
    let catalog = Elem::new("catalog").child(book_with(&all_six_fields()));
    let mut callbacks = HashMap::new();
    callbacks.insert(hash_str("AUTHOR"), false);
    let mut cursor = TreeCursor::new(vec![catalog], callbacks);
    let outcome = run(&bc, &mut cursor, false).expect("no vm fault");
    assert!(!outcome.accepted);
}

#[test]
fn s7_save_load_roundtrip_preserves_verdict_across_all_scenarios() {
    let bc = compile(CATALOG_SCHEMA);
    let blob = bc.save();
    let reloaded = Bytecode::load(&blob).expect("load should succeed");

    let scenarios: Vec<(Elem, bool)> = vec![
        (Elem::new("catalog"), true),
        (Elem::new("catalog").child(book_with(&all_six_fields())), true),
        (
            Elem::new("catalog").child(book_with(
                &all_six_fields().into_iter().filter(|(n, _)| *n != "price").collect::<Vec<_>>(),
            )),
            false,
        ),
    ];

    for (catalog, expected) in scenarios {
        let before = run_catalog(&bc, catalog.clone());
        let after = run_catalog(&reloaded, catalog);
        assert_eq!(before.accepted, expected);
        assert_eq!(before.accepted, after.accepted);
    }
}

#[test]
fn two_books_in_any_order_are_both_validated() {
    let bc = compile(CATALOG_SCHEMA);
    let catalog = Elem::new("catalog")
        .child(book_with(&all_six_fields()))
        .child(book_with(&all_six_fields()));
    let outcome = run_catalog(&bc, catalog);
    assert!(outcome.accepted);
}
