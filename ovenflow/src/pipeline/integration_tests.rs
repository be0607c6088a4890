//! End-to-end tests for order processing.

#[cfg(test)]
mod tests {
    use crate::cancellation::CancellationToken;
    use crate::config::BakeryConfig;
    use crate::core::{Item, ProductKind, StageKind};
    use crate::intake::OrderRequest;
    use crate::observability::{names, tags, CompositeInstrumentation, Instrumentation, MetricsRecorder, Tags};
    use crate::pipeline::PipelineOrchestrator;
    use crate::testing::{InstrumentationEvent, ScriptedDurationSource, TestBakery};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;

    fn span_start(name: &str) -> InstrumentationEvent {
        InstrumentationEvent::SpanStart(name.to_string())
    }

    fn span_end(name: &str) -> InstrumentationEvent {
        InstrumentationEvent::SpanEnd(name.to_string())
    }

    fn stage(kind: StageKind) -> [InstrumentationEvent; 2] {
        [span_start(kind.span_name()), span_end(kind.span_name())]
    }

    fn pizza() -> Item {
        Item::new(ProductKind::Pizza, "client")
    }

    #[tokio::test(start_paused = true)]
    async fn test_burnt_then_success_scenario() {
        let bakery = TestBakery::new(
            ScriptedDurationSource::constant(1).with_script(StageKind::Bake, [8, 5]),
        );
        let item = pizza();

        let done = bakery
            .orchestrator
            .process(item.clone(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(done.id, item.id);

        let events: Vec<_> = bakery
            .recorder
            .events()
            .into_iter()
            .map(|e| match e {
                InstrumentationEvent::Histogram(name, value) => {
                    InstrumentationEvent::Histogram(name, value.round())
                }
                other => other,
            })
            .collect();

        let mut expected = vec![
            span_start(names::ORDER_SPAN),
            InstrumentationEvent::Gauge(names::CURRENTLY_COOKING.to_string(), 1),
            span_start(names::ATTEMPT_SPAN),
        ];
        expected.extend(stage(StageKind::Prepare));
        expected.extend(stage(StageKind::Bake));
        expected.push(InstrumentationEvent::Counter(names::PIZZA_BURNT.to_string()));
        expected.push(span_end(names::ATTEMPT_SPAN));
        expected.push(span_start(names::ATTEMPT_SPAN));
        expected.extend(stage(StageKind::Prepare));
        expected.extend(stage(StageKind::Bake));
        expected.extend(stage(StageKind::Pack));
        expected.push(span_end(names::ATTEMPT_SPAN));
        expected.push(InstrumentationEvent::Histogram(names::COOKING_TIME.to_string(), 16.0));
        expected.push(InstrumentationEvent::Gauge(names::CURRENTLY_COOKING.to_string(), -1));
        expected.push(span_end(names::ORDER_SPAN));

        assert_eq!(events, expected);

        let bake_statuses: Vec<_> = bakery
            .recorder
            .span_end_attributes(StageKind::Bake.span_name())
            .into_iter()
            .map(|attributes| attributes[names::TAG_STATUS].clone())
            .collect();
        assert_eq!(bake_statuses, vec!["burnt".to_string(), "success".to_string()]);

        let attempts: Vec<_> = bakery
            .recorder
            .span_end_attributes(names::ATTEMPT_SPAN)
            .into_iter()
            .map(|attributes| {
                (
                    attributes[names::TAG_ATTEMPT].clone(),
                    attributes[names::TAG_STATUS].clone(),
                )
            })
            .collect();
        assert_eq!(
            attempts,
            vec![
                ("1".to_string(), "burnt".to_string()),
                ("2".to_string(), "success".to_string()),
            ]
        );

        let cooking_tags = bakery.recorder.metric_tags(names::COOKING_TIME);
        assert_eq!(cooking_tags.len(), 1);
        assert_eq!(
            cooking_tags[0].get(names::TAG_PRODUCT_TYPE),
            Some(&"pizza".to_string())
        );
        let by_pizza = bakery
            .metrics
            .histogram_tagged(
                names::COOKING_TIME,
                &tags([(names::TAG_PRODUCT_TYPE, "pizza".to_string())]),
            )
            .unwrap();
        assert_eq!(by_pizza.count, 1);

        assert_eq!(bakery.registry().insertions(), 2);
        assert_eq!(bakery.registry().removals(), 2);
        assert!(bakery.registry().is_empty());
        assert_eq!(bakery.metrics.counter(names::PIZZA_BURNT), 1);
        assert_eq!(bakery.metrics.histogram(names::COOKING_TIME).unwrap().count, 1);
        assert_eq!(bakery.metrics.gauge(names::CURRENTLY_COOKING), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_bake_scenario() {
        let bakery = TestBakery::new(ScriptedDurationSource::constant(1).with_script(StageKind::Bake, [8]));
        let item = pizza();
        let token = CancellationToken::new();
        token.cancel_after(Duration::from_secs(3), "client hung up");

        let failure = bakery
            .orchestrator
            .process(item.clone(), &token)
            .await
            .unwrap_err();

        assert_eq!(failure.item_id, item.id);
        assert_eq!(failure.stage, StageKind::Bake);
        assert_eq!(failure.attempt, 1);
        assert_eq!(failure.reason, "client hung up");

        assert!(!bakery.registry().contains(&item.id));
        assert_eq!(bakery.registry().removals(), 1);
        assert_eq!(
            bakery.recorder.started_spans(),
            vec![
                names::ORDER_SPAN.to_string(),
                names::ATTEMPT_SPAN.to_string(),
                StageKind::Prepare.span_name().to_string(),
                StageKind::Bake.span_name().to_string(),
            ]
        );
        assert_eq!(bakery.durations.draws(StageKind::Pack), 0);
        assert_eq!(bakery.durations.draws(StageKind::Bake), 1);
        assert_eq!(bakery.metrics.counter(names::ORDER_CANCELED), 1);
        assert_eq!(bakery.metrics.counter(names::PIZZA_BURNT), 0);
        assert!(bakery.metrics.histogram(names::COOKING_TIME).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_registry_holds_item_only_while_baking() {
        let bakery = TestBakery::new(ScriptedDurationSource::constant(1).with_script(StageKind::Bake, [5]));
        let item = pizza();
        let registry = Arc::clone(bakery.registry());

        let handle = {
            let orchestrator = Arc::clone(&bakery.orchestrator);
            let item = item.clone();
            tokio::spawn(async move { orchestrator.process(item, &CancellationToken::new()).await })
        };

        // Prepare 0-1s, Bake 1-6s, Pack 6-7s.
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(!registry.contains(&item.id));

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(registry.contains(&item.id));
        assert_eq!(bakery.orchestrator.currently_baking(), 1);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!registry.contains(&item.id));

        assert!(handle.await.unwrap().is_ok());
        assert!(!registry.contains(&item.id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_at_every_stage_cleans_registry() {
        // Prepare 0-1s, Bake 1-6s, Pack 6-7s.
        for (cancel_at_ms, expected_stage) in [
            (500, StageKind::Prepare),
            (3000, StageKind::Bake),
            (6500, StageKind::Pack),
        ] {
            let bakery =
                TestBakery::new(ScriptedDurationSource::constant(1).with_script(StageKind::Bake, [5]));
            let item = pizza();
            let token = CancellationToken::new();
            token.cancel_after(Duration::from_millis(cancel_at_ms), "stop");

            let failure = bakery.orchestrator.process(item.clone(), &token).await.unwrap_err();

            assert_eq!(failure.stage, expected_stage);
            assert!(!bakery.registry().contains(&item.id));
            assert_eq!(bakery.metrics.gauge(names::CURRENTLY_COOKING), 0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_orders_balance_gauge() {
        const ORDERS: usize = 24;
        let mut script = Vec::new();
        for i in 0..ORDERS * 2 {
            script.push(if i % 3 == 0 { 8 } else { 5 });
        }
        let bakery = TestBakery::new(ScriptedDurationSource::constant(1).with_script(StageKind::Bake, script));
        let items: Vec<_> = (0..ORDERS).map(|_| pizza()).collect();

        let handles: Vec<_> = items
            .iter()
            .cloned()
            .map(|item| {
                let orchestrator = Arc::clone(&bakery.orchestrator);
                tokio::spawn(async move { orchestrator.process(item, &CancellationToken::new()).await })
            })
            .collect();

        // Everyone finishes Prepare at 1s and bakes for at least 5s.
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(bakery.registry().len(), ORDERS);

        let results = futures::future::join_all(handles).await;
        let mut finished: Vec<_> = results
            .into_iter()
            .map(|r| r.unwrap().unwrap().id)
            .collect();
        let mut expected: Vec<_> = items.iter().map(|i| i.id).collect();
        finished.sort();
        expected.sort();
        assert_eq!(finished, expected);

        let gauge = bakery.metrics.gauge_snapshot(names::CURRENTLY_COOKING);
        assert_eq!(gauge.increments, ORDERS as u64);
        assert_eq!(gauge.decrements, ORDERS as u64);
        assert_eq!(gauge.value, 0);

        let burnt = bakery.metrics.counter(names::PIZZA_BURNT);
        assert_eq!(bakery.durations.draws(StageKind::Bake) as u64, ORDERS as u64 + burnt);
        assert_eq!(bakery.registry().insertions(), bakery.registry().removals());
        assert!(bakery.registry().is_empty());
        assert_eq!(
            bakery.metrics.histogram(names::COOKING_TIME).unwrap().count,
            ORDERS as u64
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelling_one_order_leaves_others_alone() {
        let bakery = TestBakery::new(ScriptedDurationSource::constant(1).with_fallback(StageKind::Bake, 5));
        let victim = pizza();
        let victim_token = CancellationToken::new();
        victim_token.cancel_after(Duration::from_secs(3), "only this one");

        let others: Vec<_> = (0..5)
            .map(|_| {
                let orchestrator = Arc::clone(&bakery.orchestrator);
                tokio::spawn(async move { orchestrator.process(pizza(), &CancellationToken::new()).await })
            })
            .collect();

        let failure = bakery
            .orchestrator
            .process(victim.clone(), &victim_token)
            .await
            .unwrap_err();
        assert_eq!(failure.item_id, victim.id);

        for handle in others {
            assert!(handle.await.unwrap().is_ok());
        }
        assert_eq!(bakery.metrics.counter(names::ORDER_CANCELED), 1);
        assert_eq!(bakery.metrics.gauge(names::CURRENTLY_COOKING), 0);
        assert!(bakery.registry().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_intake_counts_and_processes() {
        let bakery = TestBakery::new(ScriptedDurationSource::constant(1));
        let intake = bakery.intake();

        let item = intake
            .place_order(OrderRequest::new("demo", ProductKind::Focaccia), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(item.kind, ProductKind::Focaccia);
        assert_eq!(bakery.recorder.counter_count(names::PRODUCT_TYPE), 1);
        assert_eq!(bakery.metrics.counter(names::PRODUCT_TYPE), 1);
    }

    struct ExplodingSink;

    impl Instrumentation for ExplodingSink {
        fn span_start(&self, _name: &str, _attributes: &Tags) {
            panic!("collector offline");
        }
        fn span_end(&self, _name: &str, _duration_ms: f64, _attributes: &Tags) {
            panic!("collector offline");
        }
        fn increment_counter(&self, _name: &str, _tags: &Tags) {
            panic!("collector offline");
        }
        fn record_histogram(&self, _name: &str, _value: f64, _tags: &Tags) {
            panic!("collector offline");
        }
        fn adjust_gauge(&self, _name: &str, _delta: i64) {
            panic!("collector offline");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_broken_instrumentation_does_not_block_cooking() {
        let orchestrator = PipelineOrchestrator::builder(BakeryConfig::default())
            .durations(Arc::new(
                ScriptedDurationSource::constant(1).with_script(StageKind::Bake, [8, 4]),
            ))
            .instrumentation(Arc::new(ExplodingSink))
            .build()
            .unwrap();
        let item = pizza();

        let done = orchestrator.process(item.clone(), &CancellationToken::new()).await;

        assert_eq!(done.unwrap().id, item.id);
        assert!(orchestrator.registry().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_broken_sink_does_not_starve_later_sinks() {
        let metrics = Arc::new(MetricsRecorder::new());
        let sink = CompositeInstrumentation::new()
            .with(Arc::new(ExplodingSink))
            .with(metrics.clone());
        let orchestrator = PipelineOrchestrator::builder(BakeryConfig::default())
            .durations(Arc::new(
                ScriptedDurationSource::constant(1).with_script(StageKind::Bake, [8, 4]),
            ))
            .instrumentation(Arc::new(sink))
            .build()
            .unwrap();

        orchestrator
            .process(pizza(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(metrics.counter(names::PIZZA_BURNT), 1);
        assert_eq!(metrics.histogram(names::COOKING_TIME).unwrap().count, 1);
        assert_eq!(metrics.gauge_snapshot(names::CURRENTLY_COOKING).decrements, 1);
    }
}
