mod common;

use common::TestServer;
use restdef::address_book::{address_book_definition, AddressBook};
use restdef::definition::BindState;
use restdef::error::BindError;
use restdef::generator::{generator_for, Host, InstallStyle};
use restdef::middleware::MetricsMiddleware;
use restdef::server::{serve, AppService};
use std::sync::Arc;

#[test]
fn test_health_endpoint() {
    let server = TestServer::start(InstallStyle::Resource, &["update"]);
    let resp = server.get("/health", "*/*");
    assert_eq!(resp.status, 200);
    assert_eq!(resp.json()["status"], "ok");
}

#[test]
fn test_metrics_endpoint_counts_requests() {
    let server = TestServer::start(InstallStyle::Resource, &["update"]);
    server.put("/addressbook/createAddressBook/m");
    server.get("/addressbook/getAddressBook/unknown", "application/json");
    server.delete("/addressbook/getAddressBook/m");

    let resp = server.get("/metrics", "text/plain");
    assert_eq!(resp.status, 200);
    assert!(resp.body.contains("restdef_requests_total 3"), "{}", resp.body);
    assert!(resp.body.contains("restdef_client_errors_total 1"), "{}", resp.body);
    assert!(resp.body.contains("restdef_server_errors_total 1"), "{}", resp.body);
    assert_eq!(server.metrics.request_count(), 3);
}

#[test]
fn test_unmatched_paths_are_404() {
    let server = TestServer::start(InstallStyle::Page, &["update"]);
    // too few segments for `{base}/:service/:id`
    let resp = server.get("/addressbook/getAddressBook", "application/json");
    assert_eq!(resp.status, 404);
    assert_eq!(resp.json()["error"], "Not Found");

    let resp = server.get("/elsewhere/getAddressBook/x", "application/json");
    assert_eq!(resp.status, 404);
}

#[test]
fn test_unbind_removes_routes() {
    let mut server = TestServer::start(InstallStyle::Resource, &["update"]);
    server.put("/addressbook/createAddressBook/b");
    assert_eq!(
        server.get("/addressbook/getAddressBook/b", "application/json").status,
        200
    );

    let definition = &mut server.definitions[0];
    definition.unbind().unwrap();
    assert_eq!(definition.state(), BindState::Unbound);

    assert_eq!(
        server.get("/addressbook/getAddressBook/b", "application/json").status,
        404
    );
    // the action-style definition is untouched
    assert_eq!(
        server
            .get("/actions/addressbook/getAddressBook/b", "application/json")
            .status,
        200
    );
}

#[test]
fn test_bind_while_serving() {
    let host = Host::new();
    let server = TestServer::serve(host.clone(), Arc::new(MetricsMiddleware::new()), Vec::new());
    assert_eq!(
        server.put("/late/createAddressBook/x").status,
        404
    );

    let mut definition = address_book_definition(
        generator_for(InstallStyle::Page, &host),
        "/late",
        AddressBook::default(),
        &["update"],
    )
    .unwrap();
    definition.bind().unwrap();
    assert_eq!(server.put("/late/createAddressBook/x").status, 201);
}

#[test]
fn test_second_definition_on_same_path_rejected() {
    let server = TestServer::start(InstallStyle::Resource, &["update"]);
    let mut intruder = address_book_definition(
        generator_for(InstallStyle::Resource, &server.host),
        "/addressbook/",
        AddressBook::default(),
        &["update"],
    )
    .unwrap();
    let err = intruder.bind().unwrap_err();
    assert!(matches!(err, BindError::PathAlreadyBound { ref base_path } if base_path == "/addressbook"));
    assert_eq!(intruder.state(), BindState::Unbound);

    // the first definition still serves
    assert_eq!(server.put("/addressbook/createAddressBook/ok").status, 201);
}

#[test]
fn test_second_listener_on_same_address_fails() {
    let server = TestServer::start(InstallStyle::Resource, &["update"]);
    let err = serve(AppService::from_host(&server.host), server.addr).err();
    assert!(err.is_some());
    assert_eq!(server.get("/health", "*/*").status, 200);
}
