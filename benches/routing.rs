//! Routing decision throughput, cached and uncached.

use criterion::{Criterion, criterion_group, criterion_main};
use serde_json::json;
use sona_core::RouterConfig;
use sona_core::router::{RequestPriority, RoutingRequest, SonaRouter};

fn bench_route(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let _guard = runtime.enter();

    let router = SonaRouter::new(RouterConfig::default()).expect("router builds");

    let mut counter = 0u64;
    c.bench_function("route_uncached", |b| {
        b.iter(|| {
            counter += 1;
            let request = RoutingRequest::new("search", json!({"q": counter}))
                .with_priority(RequestPriority::High);
            router.route(&request).expect("routes")
        });
    });

    let cached_request = RoutingRequest::new("search", json!({"q": "stable"}));
    router.route(&cached_request).expect("warms cache");
    c.bench_function("route_cached", |b| {
        b.iter(|| router.route(&cached_request).expect("routes"));
    });

    let budgeted = RoutingRequest::new("recommend", json!({"q": "latency"}))
        .with_priority(RequestPriority::High)
        .with_max_latency_ms(50.0);
    c.bench_function("route_with_latency_budget", |b| {
        b.iter(|| router.route(&budgeted).expect("routes"));
    });
}

criterion_group!(benches, bench_route);
criterion_main!(benches);
