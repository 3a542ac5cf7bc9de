//! Tests for the Python representation builder.

use std::path::Path;

use cfinder_analysis::parsers::{NodeKind, ParserManager};
use cfinder_core::config::AnalysisConfig;
use cfinder_core::errors::{CfinderErrorCode, ParseError};

const VIEW: &str = r#"
from shop.models import Product

class ProductService:
    def register(self, sku, region):
        if Product.objects.filter(sku=sku, region=region).exists():
            raise ValueError("duplicate")
        product = Product.objects.create(sku=sku, region=region)
        product.stock += 1
        return product
"#;

#[test]
fn test_builds_statement_tree() {
    let parser = ParserManager::new();
    let tree = parser.parse(VIEW.as_bytes(), Path::new("shop/views.py")).unwrap();
    assert!(!tree.has_errors());

    let class = tree
        .root
        .children
        .iter()
        .find(|n| n.kind == NodeKind::Class)
        .expect("class statement");
    assert_eq!(class.text(), "ProductService");

    let function = class
        .blocks()
        .flat_map(|b| b.children.iter())
        .find(|n| n.kind == NodeKind::Function)
        .expect("method");
    assert_eq!(function.text(), "register");

    let body: Vec<NodeKind> = function
        .blocks()
        .flat_map(|b| b.children.iter())
        .map(|n| n.kind)
        .collect();
    assert_eq!(
        body,
        vec![NodeKind::If, NodeKind::Assign, NodeKind::AugAssign, NodeKind::Return]
    );
}

#[test]
fn test_call_accessors() {
    let parser = ParserManager::new();
    let tree = parser
        .parse(b"Product.objects.filter(sku=sku, region='eu')\n", Path::new("a.py"))
        .unwrap();
    let stmt = &tree.root.children[0];
    assert_eq!(stmt.kind, NodeKind::ExprStmt);
    let call = stmt.child(0).unwrap();
    assert_eq!(call.kind, NodeKind::Call);
    assert_eq!(call.callee().unwrap().text(), "filter");
    assert_eq!(call.callee().unwrap().dotted().as_deref(), Some("Product.objects.filter"));
    let keys: Vec<&str> = call.keyword_args().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["sku", "region"]);
    assert_eq!(call.positional_args().count(), 0);
}

#[test]
fn test_syntax_error_rejected_by_default() {
    let parser = ParserManager::new();
    let err = parser
        .parse(b"def broken(:\n    pass\n", Path::new("broken.py"))
        .unwrap_err();
    assert!(matches!(err, ParseError::SyntaxError { .. }));
    assert_eq!(err.error_code(), "PARSE_ERROR");
}

#[test]
fn test_partial_parse_allowed_by_config() {
    let config = AnalysisConfig {
        allow_partial_parse: Some(true),
        ..Default::default()
    };
    let parser = ParserManager::from_config(&config);
    let tree = parser
        .parse(b"def broken(:\n    pass\nx = 1\n", Path::new("broken.py"))
        .unwrap();
    assert!(tree.has_errors());
    assert!(tree.error_count > 0);
}

#[test]
fn test_unsupported_extension() {
    let parser = ParserManager::new();
    let err = parser.parse(b"puts 1", Path::new("script.rb")).unwrap_err();
    assert_eq!(err.error_code(), "UNSUPPORTED_LANGUAGE");
}

#[test]
fn test_cache_reuses_identical_content() {
    let parser = ParserManager::new();
    let a = parser.parse(VIEW.as_bytes(), Path::new("a/views.py")).unwrap();
    let b = parser.parse(VIEW.as_bytes(), Path::new("b/views.py")).unwrap();
    assert_eq!(a.content_hash, b.content_hash);
    assert_eq!(b.path, Path::new("b/views.py"));
    assert_eq!(a.root, b.root);
}

fn on_worker_thread<T: Send>(work: impl FnOnce() -> T + Send) -> T {
    rayon::ThreadPoolBuilder::new()
        .num_threads(1)
        .build()
        .unwrap()
        .install(work)
}

fn nested_calls(depth: usize, inner: &str) -> String {
    format!("VALUE = {}{inner}{}\n", "f(".repeat(depth), ")".repeat(depth))
}

#[test]
fn test_long_operator_chain_is_one_node() {
    let source = format!("TOTAL = 1{}\n", " + 1".repeat(5_000));
    let tree = on_worker_thread(|| {
        ParserManager::new()
            .parse(source.as_bytes(), Path::new("totals.py"))
            .unwrap()
    });
    let assign = &tree.root.children[0];
    assert_eq!(assign.kind, NodeKind::Assign);
    let sum = assign.child(1).unwrap();
    assert_eq!(sum.kind, NodeKind::BinaryOp);
    assert_eq!(sum.text(), "+");
    assert_eq!(sum.children.len(), 5_001);
    assert!(sum.children.iter().all(|c| c.kind == NodeKind::Number));
}

#[test]
fn test_mixed_operators_keep_precedence() {
    let parser = ParserManager::new();
    let tree = parser
        .parse(b"x = a - b - c * d\ny = p or q or r and s\n", Path::new("ops.py"))
        .unwrap();
    let diff = tree.root.children[0].child(1).unwrap();
    assert_eq!(diff.text(), "-");
    assert_eq!(diff.children.len(), 3);
    assert_eq!(diff.children[2].text(), "*");
    assert_eq!(diff.children[2].children.len(), 2);

    let any = tree.root.children[1].child(1).unwrap();
    assert_eq!(any.kind, NodeKind::BoolOp);
    assert_eq!(any.text(), "or");
    assert_eq!(any.children.len(), 3);
    assert_eq!(any.children[2].text(), "and");
}

#[test]
fn test_comparison_chain_is_one_conjunction() {
    let parser = ParserManager::new();
    let tree = parser
        .parse(b"ok = 0 < low < high <= 10\n", Path::new("range.py"))
        .unwrap();
    let cond = tree.root.children[0].child(1).unwrap();
    assert_eq!(cond.kind, NodeKind::BoolOp);
    assert_eq!(cond.text(), "and");
    let ops: Vec<&str> = cond.children.iter().map(|c| c.text()).collect();
    assert_eq!(ops, vec!["<", "<", "<="]);
    assert!(cond.children.iter().all(|c| c.kind == NodeKind::Compare));
}

#[test]
fn test_deep_nesting_is_rejected() {
    let source = nested_calls(3_000, "x");
    let err = on_worker_thread(|| {
        ParserManager::new()
            .parse(source.as_bytes(), Path::new("deep.py"))
            .unwrap_err()
    });
    match &err {
        ParseError::NestingTooDeep { path, limit } => {
            assert_eq!(path, Path::new("deep.py"));
            assert_eq!(*limit, 128);
        }
        other => panic!("expected NestingTooDeep, got {other:?}"),
    }
    assert_eq!(err.error_code(), "PARSE_ERROR");
}

#[test]
fn test_deep_broken_input_completes() {
    let config = AnalysisConfig {
        allow_partial_parse: Some(true),
        ..Default::default()
    };
    let source = nested_calls(3_000, "x +");
    let result = on_worker_thread(|| {
        ParserManager::from_config(&config).parse(source.as_bytes(), Path::new("deep.py"))
    });
    match result {
        Err(ParseError::NestingTooDeep { .. }) => {}
        Ok(tree) => assert!(tree.has_errors()),
        Err(other) => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_nesting_limit_follows_config() {
    let config = AnalysisConfig {
        max_nesting: Some(8),
        ..Default::default()
    };
    let parser = ParserManager::from_config(&config);
    assert!(parser
        .parse(nested_calls(3, "x").as_bytes(), Path::new("shallow.py"))
        .is_ok());
    let err = parser
        .parse(nested_calls(10, "x").as_bytes(), Path::new("deeper.py"))
        .unwrap_err();
    assert!(matches!(err, ParseError::NestingTooDeep { limit: 8, .. }));
}

#[test]
fn test_exhausted_budget_times_out() {
    let config = AnalysisConfig {
        file_budget_ms: Some(0),
        ..Default::default()
    };
    let source: String = (0..20_000)
        .map(|i| format!("item_{i} = Product.objects.filter(sku={i}, region='eu').first()\n"))
        .collect();
    let err = ParserManager::from_config(&config)
        .parse(source.as_bytes(), Path::new("bulk.py"))
        .unwrap_err();
    match &err {
        ParseError::Timeout { timeout_ms, .. } => assert_eq!(*timeout_ms, 0),
        other => panic!("expected Timeout, got {other:?}"),
    }
    assert_eq!(err.error_code(), "PARSE_ERROR");
}

#[test]
fn test_partial_tree_describes_its_errors() {
    let config = AnalysisConfig {
        allow_partial_parse: Some(true),
        ..Default::default()
    };
    let parser = ParserManager::from_config(&config);
    let tree = parser
        .parse(b"def broken(:\n    pass\nx = 1\n", Path::new("broken.py"))
        .unwrap();
    let err = tree.partial_error().expect("partial tree reports its errors");
    match &err {
        ParseError::PartialTree { error_count, .. } => assert_eq!(*error_count, tree.error_count),
        other => panic!("expected PartialTree, got {other:?}"),
    }
    assert_eq!(err.location().map(|(line, _)| line), Some(1));
    assert_eq!(err.error_code(), "PARSE_ERROR");

    let clean = parser.parse(b"x = 1\n", Path::new("clean.py")).unwrap();
    assert!(clean.partial_error().is_none());
}
