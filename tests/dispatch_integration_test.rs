//! End-to-end tests for the webhook pipeline: routing, protected handlers,
//! load-balanced pools and handlers that publish domain events.

mod common;

use common::{failing_handler, named_handler};
use dispatch_core::config::DispatchConfig;
use dispatch_core::dispatcher::{
    handler_fn, RouteOptions, WebhookDispatcher, WebhookHandler, WebhookRequest, WebhookResponse,
};
use dispatch_core::events::{EventBus, EventPriority, EventSource, NewSystemEvent};
use dispatch_core::execution::{LoadBalancer, LoadBalancingStrategy};
use dispatch_core::resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerManager, CircuitState, ProtectedHandler,
};
use dispatch_core::routing::RouteType;
use dispatch_core::BoxError;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn post(path: &str) -> WebhookRequest {
    WebhookRequest::new("POST", path, Value::Null)
}

#[tokio::test]
async fn test_exact_route_wins_over_pattern_at_equal_priority() {
    let dispatcher = WebhookDispatcher::from_config(&DispatchConfig::default());
    dispatcher.register_route(
        "/wh/:id",
        "POST",
        named_handler("pattern"),
        RouteOptions::default().with_priority(1),
    );
    dispatcher.register_route(
        "/wh/abc",
        "POST",
        named_handler("exact"),
        RouteOptions::default().with_priority(1),
    );

    let exact = dispatcher.handle(post("/wh/abc")).await;
    assert_eq!(exact.body.data, Some(json!({ "handler": "exact" })));

    let pattern = dispatcher.handle(post("/wh/other")).await;
    assert_eq!(pattern.body.data, Some(json!({ "handler": "pattern" })));

    // Dispatched requests carry a payload and bypass the cache
    assert_eq!(dispatcher.route_table().cache_len(), 0);
    let table = dispatcher.route_table();
    let resolved = table.resolve("/wh/abc", "POST", None).unwrap();
    assert_eq!(resolved.match_score, 100);
    assert_eq!(table.resolve("/wh/other", "POST", None).unwrap().match_score, 50);
    assert_eq!(table.cache_len(), 2);
}

#[tokio::test]
async fn test_route_changes_invalidate_cached_resolutions() {
    let dispatcher = WebhookDispatcher::from_config(&DispatchConfig::default());
    dispatcher.register_route(
        "/wh/:id",
        "POST",
        named_handler("pattern"),
        RouteOptions::default(),
    );

    let first = dispatcher.handle(post("/wh/abc")).await;
    assert_eq!(first.body.data, Some(json!({ "handler": "pattern" })));
    let cached = dispatcher.route_table().resolve("/wh/abc", "POST", None).unwrap();
    assert_eq!(cached.handler.handler_name(), "pattern");
    assert_eq!(dispatcher.route_table().cache_len(), 1);

    dispatcher.register_route(
        "/wh/abc",
        "POST",
        named_handler("exact"),
        RouteOptions::default(),
    );
    assert_eq!(dispatcher.route_table().cache_len(), 0);

    let second = dispatcher.handle(post("/wh/abc")).await;
    assert_eq!(second.body.data, Some(json!({ "handler": "exact" })));

    assert_eq!(dispatcher.unregister_route("/wh/abc", "POST"), 1);
    assert_eq!(dispatcher.unregister_route("/wh/abc", "POST"), 0);
    let third = dispatcher.handle(post("/wh/abc")).await;
    assert_eq!(third.body.data, Some(json!({ "handler": "pattern" })));
}

#[tokio::test]
async fn test_protected_route_fails_fast_once_breaker_opens() {
    let mut config = DispatchConfig::default();
    config.circuit_breakers.component_configs.insert(
        "crm_sync".to_string(),
        CircuitBreakerConfig {
            failure_threshold: 2,
            open_timeout_ms: 60_000,
            half_open_probe_limit: 1,
        },
    );

    let manager = CircuitBreakerManager::from_config(&config.circuit_breakers);
    let dispatcher = WebhookDispatcher::from_config(&config);
    let calls = Arc::new(AtomicU32::new(0));

    let protected = ProtectedHandler::new(
        failing_handler("crm", Arc::clone(&calls)),
        manager.get_circuit_breaker("crm_sync"),
    );
    dispatcher.register_route(
        "/wh/crm",
        "POST",
        Arc::new(protected),
        RouteOptions::default().with_type(RouteType::Automation),
    );

    for _ in 0..2 {
        let response = dispatcher.handle(post("/wh/crm")).await;
        assert_eq!(response.status_code, 500);
        assert!(response.body.error.unwrap().contains("crm unavailable"));
    }

    let rejected = dispatcher.handle(post("/wh/crm")).await;
    assert_eq!(rejected.status_code, 500);
    assert!(rejected
        .body
        .error
        .unwrap()
        .contains("Circuit breaker is open for crm_sync"));
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let metrics = manager.get_component_metrics("crm_sync").unwrap();
    assert_eq!(metrics.current_state, CircuitState::Open);
    assert_eq!(metrics.rejected_count, 1);
}

#[tokio::test]
async fn test_panicking_protected_handler_does_not_wedge_breaker() {
    let dispatcher = WebhookDispatcher::from_config(&DispatchConfig::default());
    let healthy = Arc::new(AtomicBool::new(false));

    let inner = {
        let healthy = Arc::clone(&healthy);
        handler_fn("flaky", move |_ctx, _req| {
            let healthy = Arc::clone(&healthy);
            async move {
                if !healthy.load(Ordering::SeqCst) {
                    panic!("flaky handler crashed");
                }
                Ok(WebhookResponse::ok(json!({ "handler": "flaky" })))
            }
        })
    };
    let breaker = Arc::new(CircuitBreaker::new(
        "flaky",
        CircuitBreakerConfig {
            failure_threshold: 1,
            open_timeout_ms: 30,
            half_open_probe_limit: 1,
        },
    ));
    let protected = ProtectedHandler::new(inner, Arc::clone(&breaker));
    dispatcher.register_route("/wh/flaky", "POST", Arc::new(protected), RouteOptions::default());

    let crashed = dispatcher.handle(post("/wh/flaky")).await;
    assert_eq!(crashed.status_code, 500);
    assert_eq!(breaker.state(), CircuitState::Open);

    tokio::time::sleep(Duration::from_millis(50)).await;
    let crashed_again = dispatcher.handle(post("/wh/flaky")).await;
    assert_eq!(crashed_again.status_code, 500);
    assert_eq!(breaker.state(), CircuitState::Open);

    healthy.store(true, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(200)).await;
    let recovered = dispatcher.handle(post("/wh/flaky")).await;
    assert_eq!(recovered.status_code, 200);
    assert_eq!(breaker.state(), CircuitState::Closed);
}

#[tokio::test]
async fn test_load_balanced_route_rotates_replicas() {
    let dispatcher = WebhookDispatcher::from_config(&DispatchConfig::default());
    let pool = LoadBalancer::with_handlers(
        "analytics_pool",
        LoadBalancingStrategy::RoundRobin,
        [named_handler("replica-1"), named_handler("replica-2")],
    );
    assert_eq!(pool.handler_name(), "analytics_pool");

    dispatcher.register_route(
        "/wh/analytics",
        "POST",
        Arc::new(pool),
        RouteOptions::default().with_type(RouteType::Analytics),
    );

    let mut handlers = Vec::new();
    for _ in 0..3 {
        let response = dispatcher.handle(post("/wh/analytics")).await;
        handlers.push(response.body.data.unwrap()["handler"].clone());
    }
    assert_eq!(
        handlers,
        vec![json!("replica-1"), json!("replica-2"), json!("replica-1")]
    );
}

#[tokio::test]
async fn test_empty_pool_surfaces_as_internal_error() {
    let dispatcher = WebhookDispatcher::from_config(&DispatchConfig::default());
    dispatcher.register_route(
        "/wh/empty",
        "POST",
        Arc::new(LoadBalancer::new("empty", LoadBalancingStrategy::Random)),
        RouteOptions::default(),
    );

    let response = dispatcher.handle(post("/wh/empty")).await;
    assert_eq!(response.status_code, 500);
    assert!(response.body.error.unwrap().contains("No handlers available"));
}

#[tokio::test]
async fn test_handler_publishes_domain_events() {
    let bus = Arc::new(EventBus::default());
    let dispatcher = WebhookDispatcher::from_config(&DispatchConfig::default());

    let publisher = {
        let bus = Arc::clone(&bus);
        handler_fn("marketplace_orders", move |ctx, req| {
            let bus = Arc::clone(&bus);
            async move {
                let id = bus
                    .emit(
                        NewSystemEvent::new(
                            "marketplace.order_received",
                            EventSource::Marketplace,
                            req.body.clone(),
                        )
                        .with_priority(EventPriority::High)
                        .with_target(EventSource::Analytics),
                    )
                    .await
                    .map_err(BoxError::from)?;
                Ok(WebhookResponse::ok(json!({ "event": id.to_string() }))
                    .with_event_id(ctx.event_id))
            }
        })
    };
    dispatcher.register_route(
        "/wh/marketplace/orders",
        "POST",
        publisher,
        RouteOptions::default().with_type(RouteType::Marketplace),
    );

    let response = dispatcher
        .handle(
            WebhookRequest::new("POST", "/wh/marketplace/orders", json!({ "order": 7 }))
                .with_header("x-event-id", "evt_order_7"),
        )
        .await;

    assert!(response.success);
    assert_eq!(response.body.event_id.as_deref(), Some("evt_order_7"));

    let processed = bus.processed_events();
    assert_eq!(processed.len(), 1);
    assert_eq!(processed[0].payload, json!({ "order": 7 }));
    assert_eq!(
        response.body.data,
        Some(json!({ "event": processed[0].id.to_string() }))
    );
}
