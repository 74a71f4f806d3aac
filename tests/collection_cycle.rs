//! Collection cycles from scripted HTTP through to the measurement log

use chrono::NaiveDate;
use serde_json::json;
use std::sync::Arc;

use quality_collector::config::CollectorConfig;
use quality_collector::collector::{FetchOrchestrator, RetryPolicy};
use quality_collector::measurement_log::MeasurementLog;
use quality_collector::model::{EntityAnnotation, EntityStatus, Metric};
use quality_collector::pipeline::Collector;
use quality_collector::status::Status;
use quality_collector::storage::MemoryBackend;
use quality_collector::testing::{
    source, test_registry, Fixtures, MetricBuilder, StubFetcher, StubReply,
};

const ONE: &str = "https://tools.example.org/one.json";
const TWO: &str = "https://tools.example.org/two.json";
const REPORT: &str = "https://scanner.example.org/report.json";

fn collector(fetcher: Arc<StubFetcher>) -> Collector {
    let config = CollectorConfig {
        retry: RetryPolicy::none(),
        ..CollectorConfig::default()
    };
    let orchestrator = FetchOrchestrator::new(Arc::new(test_registry()), fetcher, config);
    Collector::new(
        orchestrator,
        MeasurementLog::new(Arc::new(MemoryBackend::new()), 3),
    )
}

fn two_source_metric() -> Metric {
    MetricBuilder::new()
        .with_source(Fixtures::value_source("s1", ONE))
        .with_source(Fixtures::value_source("s2", TWO))
        .build()
}

#[tokio::test]
async fn test_identical_polls_extend_and_errors_append() {
    let fetcher = Arc::new(StubFetcher::new());
    for _ in 0..3 {
        fetcher.push(ONE, StubReply::json(200, &Fixtures::value_document("3", "10")));
    }
    fetcher.push(TWO, StubReply::json(200, &Fixtures::value_document("4", "10")));
    fetcher.push(TWO, StubReply::json(200, &Fixtures::value_document("4", "10")));
    fetcher.push(TWO, StubReply::status(500, "internal error"));
    let collector = collector(fetcher);
    let metric = two_source_metric();

    // First poll: count 7 of 20
    let first = collector.collect("m", &metric).await.unwrap();
    assert!(first.appended);
    let block = first.measurement.count.clone().unwrap();
    assert_eq!(block.value.as_deref(), Some("7"));
    assert_eq!(block.total.as_deref(), Some("20"));

    // Identical poll: same row, later end
    let second = collector.collect("m", &metric).await.unwrap();
    assert!(!second.appended);
    assert_eq!(second.measurement.id, first.measurement.id);
    assert!(second.measurement.end >= first.measurement.end);
    assert_eq!(collector.log().history("m").await.unwrap().len(), 1);

    // Source 2 fails: new row with only source 1 counted
    let third = collector.collect("m", &metric).await.unwrap();
    assert!(third.appended);
    assert_eq!(third.value(), Some("3"));
    let failed = third.measurement.source("s2").unwrap();
    assert!(failed
        .connection_error
        .as_deref()
        .unwrap()
        .contains("500"));
    assert_eq!(failed.value, None);

    let history = collector.log().history("m").await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(
        history.iter().map(|m| m.last).collect::<Vec<_>>(),
        vec![false, true]
    );
}

#[tokio::test]
async fn test_all_sources_failing_is_unknown_and_still_logged() {
    let fetcher = Arc::new(StubFetcher::new());
    fetcher.set_default(ONE, StubReply::status(404, "gone"));
    fetcher.set_default(TWO, StubReply::json(200, "not json"));
    let collector = collector(fetcher);

    let outcome = collector.collect("m", &two_source_metric()).await.unwrap();
    assert_eq!(outcome.status(), Status::Unknown);
    assert_eq!(outcome.value(), None);
    assert!(outcome.measurement.sources[0].connection_error.is_some());
    assert!(outcome.measurement.sources[1].parse_error.is_some());
    assert_eq!(collector.log().history("m").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_status_thresholds_through_the_pipeline() {
    let cases = [
        ("5", None, Status::TargetMet),
        ("15", None, Status::NearTargetMet),
        ("25", None, Status::TargetNotMet),
        ("30", Some(None), Status::DebtTargetMet),
        (
            "30",
            Some(Some(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap())),
            Status::TargetNotMet,
        ),
    ];

    for (value, debt, expected) in cases {
        let fetcher = Arc::new(StubFetcher::new());
        fetcher.set_default(ONE, StubReply::json(200, &Fixtures::value_document(value, "100")));
        let mut builder = MetricBuilder::new().with_source(Fixtures::value_source("s1", ONE));
        if let Some(end) = debt {
            builder = builder.with_debt("30", end);
        }

        let outcome = collector(fetcher)
            .collect("m", &builder.build())
            .await
            .unwrap();
        assert_eq!(outcome.status(), expected, "value {value}, debt {debt:?}");
    }
}

fn report(titles: &[&str]) -> String {
    json!({
        "vulnerabilities": titles
            .iter()
            .map(|t| json!({"title": t, "description": "", "severity": "high"}))
            .collect::<Vec<_>>()
    })
    .to_string()
}

#[tokio::test]
async fn test_annotations_follow_entities_across_cycles() {
    let fetcher = Arc::new(StubFetcher::new());
    fetcher.push(REPORT, StubReply::json(200, &report(&["sql injection", "xss"])));
    fetcher.push(REPORT, StubReply::json(200, &report(&["sql injection", "xss", "csrf"])));
    fetcher.push(REPORT, StubReply::json(200, &report(&["xss", "csrf"])));
    let collector = collector(fetcher);
    let metric = MetricBuilder::new()
        .with_source(source("scan", "generic_json", json!({"url": REPORT})))
        .build();

    let first = collector.collect("vulns", &metric).await.unwrap();
    assert_eq!(first.value(), Some("2"));
    let sql_key = first.measurement.sources[0]
        .entities
        .iter()
        .find(|e| e.attributes["title"] == "sql injection")
        .map(|e| e.key.clone())
        .unwrap();

    let annotated = collector
        .log()
        .annotate(
            "vulns",
            &metric,
            "scan",
            &sql_key,
            EntityAnnotation {
                status: EntityStatus::FalsePositive,
                ..Default::default()
            },
            chrono::Utc::now(),
        )
        .await
        .unwrap();
    assert_eq!(
        annotated.measurement().count.as_ref().unwrap().value.as_deref(),
        Some("1")
    );

    // New finding: annotation carried forward, false positive not counted
    let second = collector.collect("vulns", &metric).await.unwrap();
    assert!(second.appended);
    assert_eq!(second.value(), Some("2"));
    assert_eq!(
        second.measurement.sources[0].entity_user_data[&sql_key].status,
        EntityStatus::FalsePositive
    );

    // Annotated entity gone: annotation dropped
    let third = collector.collect("vulns", &metric).await.unwrap();
    assert_eq!(third.value(), Some("2"));
    assert!(third.measurement.sources[0].entity_user_data.is_empty());
}
