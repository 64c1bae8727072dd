//! Tests for request resolution
//!
//! # Test Coverage
//!
//! - Specificity precedence over content negotiation
//! - Client `q` and server `qs` tie-breaking
//! - Ambiguous dispatch reporting for HTTP and WebSocket functions
//! - Idempotent resolution against an unchanged snapshot

use http::Method;
use modroute::{ConflictTarget, DispatchError, RequestView, WebFunction, WsEvent};
use std::sync::Arc;

mod common;
use common::module_tree::ModuleTree;
use common::sources::{path_fn, producing};

fn get(path: &str, accept: &str) -> RequestView {
    RequestView::new(Method::GET, path).with_header("Accept", accept)
}

#[test]
fn test_more_specific_path_wins_regardless_of_accept() {
    let tree = ModuleTree::with_files(&[(
        "api.xqm",
        format!(
            "{}{}",
            producing("generic", "/docs/{$id}", &["text/xml"]),
            producing("latest", "/docs/latest", &["application/json;qs=0.1"])
        )
        .as_str(),
    )]);
    let d = tree.dispatcher();

    let req = get("/docs/latest", "text/xml, application/json;q=0.1");
    let f = d.resolve(&req, None).unwrap().unwrap();
    assert_eq!(f.name(), "local:latest");
}

#[test]
fn test_client_quality_selects_xml() {
    let tree = ModuleTree::with_files(&[
        ("json.xqm", producing("json", "/doc", &["application/json"]).as_str()),
        ("xml.xqm", producing("xml", "/doc", &["text/xml"]).as_str()),
    ]);
    let d = tree.dispatcher();

    let req = get("/doc", "application/json;q=0.5, text/xml;q=1.0");
    assert_eq!(d.resolve(&req, None).unwrap().unwrap().name(), "local:xml");

    let req = get("/doc", "application/json, text/xml;q=0.2");
    assert_eq!(d.resolve(&req, None).unwrap().unwrap().name(), "local:json");
}

#[test]
fn test_server_quality_then_ambiguity() {
    let tree = ModuleTree::with_files(&[
        ("a.xqm", producing("a", "/doc", &["text/xml;qs=0.5"]).as_str()),
        ("b.xqm", producing("b", "/doc", &["text/xml;qs=0.9"]).as_str()),
    ]);
    let d = tree.dispatcher();
    let req = get("/doc", "text/xml");
    assert_eq!(d.resolve(&req, None).unwrap().unwrap().name(), "local:b");

    tree.write("a.xqm", &producing("a", "/doc", &["text/xml;qs=0.90"]));
    d.invalidate();
    match d.resolve(&req, None) {
        Err(DispatchError::Ambiguous(conflict)) => {
            assert_eq!(conflict.target(), &ConflictTarget::Path("/doc".to_string()));
            assert_eq!(conflict.candidates().len(), 2);
            assert!(conflict.candidates()[0].starts_with("local:a() ["));
            assert!(conflict.candidates()[1].starts_with("local:b() ["));
        }
        other => panic!("expected ambiguity, got {:?}", other.map(|f| f.map(|f| f.name().to_string()))),
    }
}

#[test]
fn test_unacceptable_producer_is_not_a_candidate() {
    let tree = ModuleTree::with_files(&[
        ("json.xqm", producing("json", "/doc", &["application/json"]).as_str()),
        ("xml.xqm", producing("xml", "/doc", &["text/xml"]).as_str()),
    ]);
    let d = tree.dispatcher();
    let req = get("/doc", "text/xml, application/json;q=0");
    assert_eq!(d.resolve(&req, None).unwrap().unwrap().name(), "local:xml");

    let req = get("/doc", "image/png");
    assert!(d.resolve(&req, None).unwrap().is_none());
}

#[test]
fn test_method_and_consumes_constraints() {
    let tree = ModuleTree::with_files(&[(
        "items.xqm",
        r#"
declare %rest:path("/items") %rest:GET function local:list() { () };
declare %rest:path("/items") %rest:POST %rest:consumes("application/json") function local:create-json() { () };
declare %rest:path("/items") %rest:POST %rest:consumes("application/xml") function local:create-xml() { () };
"#,
    )]);
    let d = tree.dispatcher();

    let name = |req: RequestView| d.resolve(&req, None).unwrap().map(|f| f.name().to_string());
    assert_eq!(
        name(RequestView::new(Method::GET, "/items")).as_deref(),
        Some("local:list")
    );
    assert_eq!(
        name(RequestView::new(Method::POST, "/items").with_header("Content-Type", "application/json")).as_deref(),
        Some("local:create-json")
    );
    assert_eq!(
        name(RequestView::new(Method::POST, "/items").with_header("Content-Type", "application/xml")).as_deref(),
        Some("local:create-xml")
    );
    assert_eq!(name(RequestView::new(Method::DELETE, "/items")), None);
}

#[test]
fn test_path_variables_bind() {
    let tree = ModuleTree::with_files(&[(
        "users.xqm",
        r#"declare %rest:path("/users/{$user}/posts/{$post=[0-9]+}") function local:post($user, $post) { () };"#,
    )]);
    let d = tree.dispatcher();

    let req = RequestView::new(Method::GET, "/users/ada%20l/posts/17");
    let f = d.resolve(&req, None).unwrap().unwrap();
    let params = f.bind(&req);
    assert_eq!(&*params[0].0, "user");
    assert_eq!(params[0].1, "ada l");
    assert_eq!(&*params[1].0, "post");
    assert_eq!(params[1].1, "17");

    let req = RequestView::new(Method::GET, "/users/ada/posts/latest");
    assert!(d.resolve(&req, None).unwrap().is_none());
}

#[test]
fn test_websocket_ambiguity_ignores_specificity() {
    let tree = ModuleTree::with_files(&[(
        "ws.xqm",
        r#"
declare %ws:message("/chat/{$room}") function local:room($room, $message) { () };
declare %ws:message("/chat/general") function local:general($message) { () };
"#,
    )]);
    let d = tree.dispatcher();

    match d.websocket("/chat/general", WsEvent::Message) {
        Err(DispatchError::Ambiguous(conflict)) => {
            assert_eq!(conflict.candidates().len(), 2);
            assert!(conflict.candidates()[0].starts_with("local:general($message)"));
        }
        other => panic!("expected ambiguity, got {:?}", other.is_ok()),
    }
    let f = d.websocket("/chat/random", WsEvent::Message).unwrap().unwrap();
    assert_eq!(f.name(), "local:room");
}

#[test]
fn test_resolution_is_idempotent() {
    let tree = ModuleTree::with_files(&[
        ("a.xqm", path_fn("a", "/a/{$x}").as_str()),
        ("b.xqm", path_fn("b", "/a/b").as_str()),
    ]);
    let d = tree.dispatcher();
    let req = get("/a/b", "*/*");

    let first = d.resolve(&req, None).unwrap().unwrap();
    let second = d.resolve(&req, None).unwrap().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(d.store().rescan_count(), 1);
}

#[test]
fn test_parse_error_surfaces_from_resolve() {
    let tree = ModuleTree::with_files(&[(
        "bad.xqm",
        r#"declare %rest:GET function local:no-path() { () };"#,
    )]);
    let d = tree.dispatcher();
    let err = d.resolve(&get("/", "*/*"), None).unwrap_err();
    assert!(matches!(err, DispatchError::Parse(_)));
    assert!(err.to_string().contains("bad.xqm:1"));
}
