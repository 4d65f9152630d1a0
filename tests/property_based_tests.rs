mod common;

use common::strategies::*;
use common::named_handler;
use dispatch_core::dispatcher::{handler_fn, WebhookHandler, WebhookResponse};
use dispatch_core::events::{EventBus, EventPriority, EventSource, NewSystemEvent};
use dispatch_core::resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use dispatch_core::routing::{extract_params, pattern_matches, Route, RouteTable};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;

fn labelled_handler(name: String) -> Arc<dyn WebhookHandler> {
    handler_fn(name, |_ctx, _req| async move { Ok(WebhookResponse::ok(Value::Null)) })
}

fn priority_strategy() -> impl Strategy<Value = EventPriority> {
    prop_oneof![
        Just(EventPriority::Low),
        Just(EventPriority::Medium),
        Just(EventPriority::High),
        Just(EventPriority::Critical),
    ]
}

proptest! {
    /// Property: a pattern derived from a path always matches that path
    #[test]
    fn derived_patterns_match_their_path((segments, mask) in path_with_param_mask_strategy()) {
        let path = join_path(&segments);
        let pattern = to_pattern(&segments, &mask);

        prop_assert!(pattern_matches(&pattern, &path));

        let params = extract_params(&pattern, &path).unwrap();
        prop_assert_eq!(params.len(), mask.iter().filter(|m| **m).count());
        for (index, segment) in segments.iter().enumerate() {
            if mask[index] {
                prop_assert_eq!(params.get(&format!("p{index}")), Some(segment));
            }
        }
    }

    /// Property: patterns never match paths with a different segment count
    #[test]
    fn segment_count_mismatch_never_matches(
        (segments, mask) in path_with_param_mask_strategy(),
        extra in segment_strategy(),
    ) {
        let pattern = to_pattern(&segments, &mask);
        let mut longer = segments.clone();
        longer.push(extra);

        prop_assert!(!pattern_matches(&pattern, &join_path(&longer)));
        prop_assert!(extract_params(&pattern, &join_path(&longer)).is_none());
    }

    /// Property: resolution only returns routes whose method matches, ignoring case
    #[test]
    fn methods_filter_resolution(
        segments in path_strategy(),
        registered in method_strategy(),
        requested in method_strategy(),
    ) {
        let table = RouteTable::new();
        let path = join_path(&segments);
        table.register(Route::new(path.clone(), &registered, named_handler("route")));

        let resolved = table.resolve(&path, &requested, None);
        prop_assert_eq!(resolved.is_some(), registered.eq_ignore_ascii_case(&requested));
    }

    /// Property: at equal priority an exact route beats any pattern route
    #[test]
    fn exact_route_beats_pattern_route(
        (segments, mask) in path_with_param_mask_strategy(),
        priority in -5i32..5,
        pattern_first in any::<bool>(),
    ) {
        prop_assume!(mask.iter().any(|m| *m));
        let path = join_path(&segments);
        let pattern = to_pattern(&segments, &mask);

        let table = RouteTable::new();
        let exact = Route::new(path.clone(), "POST", named_handler("exact")).with_priority(priority);
        let by_pattern = Route::new(pattern, "POST", named_handler("pattern")).with_priority(priority);
        if pattern_first {
            table.register(by_pattern);
            table.register(exact);
        } else {
            table.register(exact);
            table.register(by_pattern);
        }

        let matched = table.resolve(&path, "POST", None).unwrap();
        prop_assert_eq!(matched.handler.handler_name(), "exact");
        prop_assert_eq!(matched.match_score, 100);
    }

    /// Property: unregistering one route leaves every other (method, path) resolution unchanged
    #[test]
    fn unregister_leaves_other_resolutions_unchanged(
        exact in prop::collection::vec((method_strategy(), path_strategy()), 2..8),
        (pattern_segments, mask) in path_with_param_mask_strategy(),
        removed in any::<prop::sample::Index>(),
    ) {
        prop_assume!(mask.iter().any(|m| *m));

        let mut seen = HashSet::new();
        let exact: Vec<(String, String)> = exact
            .into_iter()
            .map(|(method, segments)| (method.to_ascii_uppercase(), join_path(&segments)))
            .filter(|key| seen.insert(key.clone()))
            .collect();

        let table = RouteTable::new();
        for (index, (method, path)) in exact.iter().enumerate() {
            table.register(Route::new(path.clone(), method, labelled_handler(format!("exact_{index}"))));
        }
        table.register(Route::new(
            to_pattern(&pattern_segments, &mask),
            "POST",
            labelled_handler("pattern".to_string()),
        ));

        let paths = exact
            .iter()
            .map(|(_, path)| path.clone())
            .chain(std::iter::once(join_path(&pattern_segments)));
        let queries: Vec<(String, String)> = paths
            .flat_map(|path| ["POST", "GET", "PUT", "DELETE"].map(|m| (m.to_string(), path.clone())))
            .collect();
        let resolve_all = |table: &RouteTable| -> Vec<Option<(String, u32)>> {
            queries
                .iter()
                .map(|(method, path)| {
                    table
                        .resolve(path, method, None)
                        .map(|m| (m.handler.handler_name().to_string(), m.match_score))
                })
                .collect()
        };

        let before = resolve_all(&table);
        let (removed_method, removed_path) = exact[removed.index(exact.len())].clone();
        prop_assert_eq!(table.unregister(&removed_path, &removed_method), 1);
        prop_assert_eq!(table.unregister(&removed_path, &removed_method), 0);
        let after = resolve_all(&table);

        for (index, (method, path)) in queries.iter().enumerate() {
            if *method == removed_method && *path == removed_path {
                prop_assert_ne!(&before[index], &after[index]);
                continue;
            }
            prop_assert_eq!(&before[index], &after[index], "{} {} changed", method, path);
        }
    }

    /// Property: drain order is by priority rank, FIFO within a rank
    #[test]
    fn drain_order_is_priority_then_fifo(priorities in prop::collection::vec(priority_strategy(), 1..30)) {
        let bus = EventBus::default();
        for (index, priority) in priorities.iter().enumerate() {
            bus.enqueue(
                NewSystemEvent::new("work", EventSource::System, json!({ "index": index }))
                    .with_priority(*priority),
            )
            .unwrap();
        }

        tokio_test::block_on(bus.process_queue());

        let drained: Vec<(u8, u64)> = bus
            .processed_events()
            .iter()
            .map(|event| (event.priority.rank(), event.payload["index"].as_u64().unwrap()))
            .collect();

        prop_assert_eq!(drained.len(), priorities.len());
        for pair in drained.windows(2) {
            let ((rank_a, index_a), (rank_b, index_b)) = (pair[0], pair[1]);
            prop_assert!(rank_a > rank_b || (rank_a == rank_b && index_a < index_b));
        }
    }

    /// Property: the breaker opens exactly when consecutive failures reach the threshold
    #[test]
    fn breaker_opens_at_threshold(threshold in 1u32..8, failures in 0u32..10) {
        let breaker = CircuitBreaker::new(
            "property",
            CircuitBreakerConfig {
                failure_threshold: threshold,
                open_timeout_ms: 60_000,
                half_open_probe_limit: 1,
            },
        );

        tokio_test::block_on(async {
            for _ in 0..failures {
                let _ = breaker.execute(|| async { Err::<(), _>("down") }).await;
            }
        });

        let expected = if failures >= threshold { CircuitState::Open } else { CircuitState::Closed };
        prop_assert_eq!(breaker.state(), expected);
    }
}
