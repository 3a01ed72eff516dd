mod common;

use common::TestServer;
use restdef::bridge::DispatchRequest;
use restdef::definition::{BindState, ServiceDefinition};
use restdef::entity::{Action, ActionContext, EntityError, MethodRegistry, ServiceEntity};
use restdef::error::{BindError, DispatchError};
use restdef::generator::{generator_for, Host, InstallStyle};
use restdef::handler::{HttpMethod, ServiceHandler, Target};
use restdef::mapper::ServiceHandlerMapper;
use restdef::media::MediaType;
use restdef::middleware::MetricsMiddleware;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct Counter {
    hits: AtomicUsize,
}

impl ServiceEntity for Counter {
    fn register(registry: &mut MethodRegistry<Self>) {
        registry
            .unary("hit", |c, id| {
                Ok::<_, EntityError>(json!({
                    "id": id,
                    "hits": c.hits.fetch_add(1, Ordering::SeqCst) + 1,
                }))
            })
            .unary("explode", |_, id: &str| -> Result<Value, EntityError> {
                panic!("boom for {id}")
            });
    }
}

struct Echo;

impl Action for Echo {
    fn name(&self) -> &str {
        "echo"
    }

    fn action(&self, ctx: &ActionContext) -> Result<Value, EntityError> {
        Ok(json!({ "service": ctx.service(), "id": ctx.path_value() }))
    }
}

fn counter_definition(host: &Host, base: &str) -> ServiceDefinition {
    ServiceDefinition::new(generator_for(InstallStyle::Resource, host))
        .with_path(base)
        .using_entity(Counter::default())
        .with_handler(ServiceHandler::get(None, "hit"))
}

#[test]
fn test_missing_path_or_entity_installs_nothing() {
    let host = Host::new();
    let mut no_path = ServiceDefinition::new(generator_for(InstallStyle::Page, &host))
        .using_entity(Counter::default())
        .with_handler(ServiceHandler::get(None, "hit"));
    assert!(matches!(no_path.bind(), Err(BindError::MissingPath)));

    let mut no_entity = ServiceDefinition::new(generator_for(InstallStyle::Page, &host))
        .with_path("/c")
        .with_handler(ServiceHandler::get(None, "hit"));
    assert!(matches!(no_entity.bind(), Err(BindError::MissingEntity)));

    assert_eq!(host.route_count(), 0);
    assert!(host.bound_paths().is_empty());
}

#[test]
fn test_unresolved_method_fails_bind() {
    let host = Host::new();
    let mut definition = counter_definition(&host, "/c")
        .with_handler(ServiceHandler::delete(None, "missing"));
    let err = definition.bind().unwrap_err();
    assert!(matches!(err, BindError::UnresolvedMethod { ref method, .. } if method == "missing"));
    assert_eq!(definition.state(), BindState::Unbound);
    assert_eq!(host.route_count(), 0);
    assert!(definition.mapper().is_empty());
}

#[test]
fn test_rebind_replaces_routes() {
    let host = Host::new();
    let mut definition = counter_definition(&host, "/c");
    let first = definition.bind().unwrap();
    let routes = host.route_count();
    let second = definition.bind().unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(host.route_count(), routes);
    assert_eq!(host.owner_of("/c"), Some(definition.id()));
}

#[test]
fn test_handler_path_and_explicit_action() {
    let host = Host::new();
    let mut definition = counter_definition(&host, "/c")
        .with_handler(ServiceHandler::get(Some("/counter/:name"), "hit"))
        .with_handler(ServiceHandler::put(None, Target::action(Echo)));
    let resource = definition.bind().unwrap();
    assert_eq!(resource.dispatch_keys(), vec!["counter", "echo", "hit"]);

    let resp = resource
        .handle(&DispatchRequest::new(HttpMethod::Get, "counter", "a"))
        .unwrap();
    assert_eq!(resp.body.as_deref(), Some(r#"{"hits":1,"id":"a"}"#));

    let resp = resource
        .handle(&DispatchRequest::new(HttpMethod::Put, "echo", "z"))
        .unwrap();
    assert_eq!(resp.status, 201);
    assert_eq!(resp.body.as_deref(), Some(r#"{"id":"z","service":"echo"}"#));
}

#[test]
fn test_shared_mapper_last_write_wins() {
    let host = Host::new();
    let mapper = Arc::new(ServiceHandlerMapper::new());
    let mut first = counter_definition(&host, "/one").with_mapper(Arc::clone(&mapper));
    let mut second = ServiceDefinition::new(generator_for(InstallStyle::Resource, &host))
        .with_path("/two")
        .using_delegate(Echo)
        .with_mapper(Arc::clone(&mapper))
        .with_handler(ServiceHandler::put(None, "hit"));
    first.bind().unwrap();
    second.bind().unwrap();

    let handler = mapper.map("hit").unwrap();
    assert_eq!(handler.http_method(), HttpMethod::Put);

    // the first resource now sees the PUT handler under its token
    let err = first
        .resource()
        .unwrap()
        .handle(&DispatchRequest::new(HttpMethod::Get, "hit", "x"))
        .unwrap_err();
    assert!(matches!(err, DispatchError::MethodNotAllowed { .. }));
}

fn shared_pair(host: &Host) -> (ServiceDefinition, ServiceDefinition) {
    let mapper = Arc::new(ServiceHandlerMapper::new());
    let mut first = counter_definition(host, "/one").with_mapper(Arc::clone(&mapper));
    let mut second = ServiceDefinition::new(generator_for(InstallStyle::Resource, host))
        .with_path("/two")
        .using_delegate(Echo)
        .with_mapper(mapper)
        .with_handler(ServiceHandler::put(None, "hit"))
        .with_handler(ServiceHandler::get(None, "onlyTwo"));
    first.bind().unwrap();
    second.bind().unwrap();
    (first, second)
}

#[test]
fn test_shared_mapper_runs_the_mapped_target() {
    let host = Host::new();
    let (first, _second) = shared_pair(&host);
    let resource = first.resource().unwrap();

    // the PUT handler came from the delegate definition, so the delegate runs
    let resp = resource
        .handle(&DispatchRequest::new(HttpMethod::Put, "hit", "x"))
        .unwrap();
    assert_eq!(resp.status, 201);
    assert_eq!(resp.body.as_deref(), Some(r#"{"id":"x","service":"hit"}"#));

    let resp = resource
        .handle(&DispatchRequest::new(HttpMethod::Get, "onlyTwo", "x"))
        .unwrap();
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body.as_deref(), Some(r#"{"id":"x","service":"onlyTwo"}"#));
}

#[test]
fn test_unbind_keeps_keys_registered_by_others() {
    let host = Host::new();
    let (mut first, second) = shared_pair(&host);
    first.unbind().unwrap();

    let resp = second
        .resource()
        .unwrap()
        .handle(&DispatchRequest::new(HttpMethod::Put, "hit", "x"))
        .unwrap();
    assert_eq!(resp.status, 201);
    assert_eq!(second.mapper().keys(), vec!["hit", "onlyTwo"]);
}

#[test]
fn test_unbound_mapper_entry_is_unresolved() {
    let host = Host::new();
    let mut definition = counter_definition(&host, "/c");
    let resource = definition.bind().unwrap();
    definition
        .mapper()
        .add_service_handler(ServiceHandler::get(None, "stray"));

    let err = resource
        .handle(&DispatchRequest::new(HttpMethod::Get, "stray", "x"))
        .unwrap_err();
    assert!(matches!(err, DispatchError::UnresolvedMethod { ref method, arity: 1 } if method == "stray"));
    assert_eq!(err.status(), 500);
}

#[test]
fn test_handler_media_overrides_definition() {
    let host = Host::new();
    let mut definition = ServiceDefinition::new(generator_for(InstallStyle::Page, &host))
        .with_path("/c")
        .using_entity(Counter::default())
        .producing(MediaType::APPLICATION_XML)
        .with_handler(ServiceHandler::get(None, "hit"))
        .with_handler(
            ServiceHandler::get(Some("/plain/:id"), "hit").producing(MediaType::TEXT_PLAIN),
        );
    let resource = definition.bind().unwrap();

    let xml = resource
        .handle(&DispatchRequest::new(HttpMethod::Get, "hit", "a"))
        .unwrap();
    assert_eq!(xml.media, Some(MediaType::APPLICATION_XML));

    let err = resource
        .handle(
            &DispatchRequest::new(HttpMethod::Get, "plain", "a")
                .with_header("accept", "application/xml"),
        )
        .unwrap_err();
    assert!(matches!(err, DispatchError::NotAcceptable { .. }));
}

#[test]
fn test_panicking_method_is_500() {
    let host = Host::new();
    let mut definition = counter_definition(&host, "/c")
        .with_handler(ServiceHandler::get(None, "explode"));
    definition.bind().unwrap();
    let server = TestServer::serve(host, Arc::new(MetricsMiddleware::new()), vec![definition]);

    let resp = server.get("/c/explode/x", "application/json");
    assert_eq!(resp.status, 500);

    // the server keeps serving
    let resp = server.get("/c/hit/x", "application/json");
    assert_eq!(resp.status, 200);
    assert_eq!(resp.json()["hits"], 1);
}
