use super::{RouteMeta, Router};
use http::Method;

fn meta(method: Method, pattern: &str, handler: &str) -> RouteMeta {
    RouteMeta {
        method,
        path_pattern: pattern.to_string(),
        handler_name: handler.to_string(),
        base_path: String::new(),
    }
}

#[test]
fn test_root_path() {
    let (re, params) = Router::path_to_regex("/").unwrap();
    assert!(re.is_match("/"));
    assert!(params.is_empty());
}

#[test]
fn test_template_and_colon_params() {
    let (re, params) = Router::path_to_regex("/books/{service}/{id}").unwrap();
    assert!(re.is_match("/books/get/1"));
    assert!(!re.is_match("/books/get"));
    assert_eq!(params, vec!["service", "id"]);

    let (re, params) = Router::path_to_regex("/books/:service/:id").unwrap();
    assert!(re.is_match("/books/get/1"));
    assert_eq!(params, vec!["service", "id"]);
}

#[test]
fn test_literal_segments_are_escaped() {
    let (re, _) = Router::path_to_regex("/a.b/{id}").unwrap();
    assert!(re.is_match("/a.b/1"));
    assert!(!re.is_match("/axb/1"));
}

#[test]
fn test_method_must_match() {
    let router = Router::new(vec![meta(Method::GET, "/x/{service}/{id}", "x")]);
    assert!(router.route(Method::GET, "/x/a/b").is_some());
    assert!(router.route(Method::POST, "/x/a/b").is_none());
}

#[test]
fn test_trailing_slash_and_decoding() {
    let router = Router::new(vec![meta(Method::GET, "/x/{service}/{id}", "x")]);
    let m = router.route(Method::GET, "/x/get/my%20book/").unwrap();
    assert_eq!(m.get_path_param("id"), Some("my book"));
}

#[test]
fn test_more_literal_segments_win() {
    let router = Router::new(vec![
        meta(Method::GET, "/{service}/{id}", "root"),
        meta(Method::GET, "/books/{service}/{id}", "books"),
    ]);
    assert_eq!(
        router.route(Method::GET, "/books/get/1").unwrap().handler_name,
        "books"
    );
    assert_eq!(
        router.route(Method::GET, "/get/1").unwrap().handler_name,
        "root"
    );
}

#[test]
fn test_add_replaces_and_remove_by_handler() {
    let mut router = Router::default();
    router
        .add_route(meta(Method::GET, "/x/{service}/{id}", "old"))
        .unwrap();
    router
        .add_route(meta(Method::GET, "/x/{service}/{id}", "new"))
        .unwrap();
    router
        .add_route(meta(Method::PUT, "/x/{service}/{id}", "new"))
        .unwrap();
    assert_eq!(router.len(), 2);
    assert_eq!(router.get_all_path_patterns(), vec!["/x/{service}/{id}"]);

    assert_eq!(router.remove_handler("new"), 2);
    assert!(router.is_empty());
}
