use criterion::{black_box, criterion_group, criterion_main, Criterion};
use http::Method;
use restdef::address_book::{address_book_definition, AddressBook};
use restdef::bridge::DispatchRequest;
use restdef::generator::{generator_for, Host, InstallStyle};
use restdef::handler::HttpMethod;
use std::sync::Arc;

/// A host with `count` address books bound at `/books{i}`.
fn populated_host(count: usize) -> Host {
    let host = Host::new();
    let generator = generator_for(InstallStyle::Resource, &host);
    for i in 0..count {
        let mut definition = address_book_definition(
            Arc::clone(&generator),
            &format!("/books{i}"),
            AddressBook::default(),
            &["update"],
        )
        .unwrap();
        definition.bind().unwrap();
    }
    host
}

fn bench_route_match(c: &mut Criterion) {
    let host = populated_host(50);
    let router = host.router();
    let router = router.read().unwrap();
    c.bench_function("route_match_last_of_50", |b| {
        b.iter(|| {
            let _ = black_box(router.route(Method::GET, "/books49/getAddressBook/myBook"));
        })
    });
}

fn bench_bridge_get(c: &mut Criterion) {
    let host = Host::new();
    let mut definition = address_book_definition(
        generator_for(InstallStyle::Page, &host),
        "/books",
        AddressBook::default(),
        &["update"],
    )
    .unwrap();
    let resource = definition.bind().unwrap();
    resource
        .handle(&DispatchRequest::new(HttpMethod::Put, "createAddressBook", "b"))
        .unwrap();
    resource
        .handle(
            &DispatchRequest::new(HttpMethod::Post, "updateAddressBook", "b")
                .with_form(&[("update", "foo")]),
        )
        .unwrap();

    let json = DispatchRequest::new(HttpMethod::Get, "getAddressBook", "b")
        .with_header("accept", "application/json");
    let xml = DispatchRequest::new(HttpMethod::Get, "getAddressBook", "b")
        .with_header("accept", "application/xml;q=0.9, text/html;q=0.1");

    c.bench_function("bridge_get_json", |b| {
        b.iter(|| {
            let _ = black_box(resource.handle(&json));
        })
    });
    c.bench_function("bridge_get_xml_negotiated", |b| {
        b.iter(|| {
            let _ = black_box(resource.handle(&xml));
        })
    });
}

criterion_group!(benches, bench_route_match, bench_bridge_get);
criterion_main!(benches);
