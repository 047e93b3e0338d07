//! End-to-end comparisons through canned query executors.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use dbrecon::core::{END_DATE_PARAM, START_DATE_PARAM};
use dbrecon::{
    ColumnMeta, ColumnSelection, Comparator, ComparatorOptions, ComparisonStatus, CountRequest,
    CustomQueryRequest, DateRange, DialectCatalog, KeySpec, QueryExecutor, QueryParams, RawValue,
    ReconError, Reconciler, Result, RowSet, SampleRequest, Side, TableRef,
};

/// Returns fixed rows and records every query it receives.
struct CannedExecutor {
    side: Side,
    data: RowSet,
    primary_key: Option<Vec<&'static str>>,
    queries: Mutex<Vec<(String, QueryParams)>>,
}

impl CannedExecutor {
    fn new(side: Side, data: RowSet) -> Arc<Self> {
        Arc::new(Self {
            side,
            data,
            primary_key: None,
            queries: Mutex::new(Vec::new()),
        })
    }

    fn with_primary_key(side: Side, data: RowSet, key: Vec<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            side,
            data,
            primary_key: Some(key),
            queries: Mutex::new(Vec::new()),
        })
    }

    fn queries(&self) -> Vec<(String, QueryParams)> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryExecutor for CannedExecutor {
    async fn fetch(&self, sql: &str, params: &QueryParams) -> Result<RowSet> {
        self.queries
            .lock()
            .unwrap()
            .push((sql.to_string(), params.clone()));

        if sql.contains("pg_index") {
            return match &self.primary_key {
                Some(key) => RowSet::new(
                    self.side,
                    vec![ColumnMeta::new("column_name")],
                    key.iter().map(|k| vec![RawValue::from(*k)]).collect(),
                ),
                None => Err(ReconError::query(self.side, "postgres", "relation has no index")),
            };
        }
        Ok(self.data.clone())
    }
}

fn rows(side: Side, columns: &[&str], data: Vec<Vec<RawValue>>) -> RowSet {
    RowSet::new(
        side,
        columns.iter().map(|c| ColumnMeta::new(*c)).collect(),
        data,
    )
    .unwrap()
}

fn reconciler(tolerance: f64) -> Reconciler {
    Reconciler::from_catalog(
        &DialectCatalog::with_builtins(),
        "postgres",
        "clickhouse",
        ComparatorOptions {
            tolerance,
            memory_limit_bytes: Some(64 * 1024 * 1024),
            ..Default::default()
        },
    )
    .unwrap()
}

fn tables() -> (TableRef, TableRef) {
    (TableRef::new("orders", "public"), TableRef::new("orders", "dwh"))
}

#[tokio::test]
async fn test_sample_uses_source_primary_key() {
    let source = CannedExecutor::with_primary_key(
        Side::Source,
        rows(
            Side::Source,
            &["order_no", "amount"],
            vec![
                vec![RawValue::Int(10), RawValue::from("1.50")],
                vec![RawValue::Int(11), RawValue::from("2.00")],
            ],
        ),
        vec!["ORDER_NO"],
    );
    let target = CannedExecutor::new(
        Side::Target,
        rows(
            Side::Target,
            &["order_no", "amount"],
            vec![
                vec![RawValue::Int(10), RawValue::from("1.50")],
                vec![RawValue::Int(11), RawValue::from("2.00")],
            ],
        ),
    );

    let comparator = Comparator::new(reconciler(0.0), source.clone(), target.clone());
    let (source_table, target_table) = tables();
    let outcome = comparator
        .compare_sample(&SampleRequest::new(source_table, target_table))
        .await
        .unwrap();

    assert_eq!(outcome.status(), ComparisonStatus::Success);
    assert_eq!(outcome.stats().unwrap().common_pk_rows, 2);
    assert!(outcome.report().unwrap().contains("order_no"));
    // metadata lookup, then the sample itself
    assert_eq!(source.queries().len(), 2);
    assert_eq!(target.queries().len(), 1);
}

#[tokio::test]
async fn test_sample_falls_back_to_inferred_key() {
    let data = || {
        vec![
            vec![RawValue::from("a"), RawValue::Int(1)],
            vec![RawValue::from("b"), RawValue::Int(2)],
        ]
    };
    let source = CannedExecutor::new(Side::Source, rows(Side::Source, &["code", "qty"], data()));
    let target = CannedExecutor::new(Side::Target, rows(Side::Target, &["code", "qty"], data()));

    let comparator = Comparator::new(reconciler(0.0), source, target);
    let (source_table, target_table) = tables();
    let outcome = comparator
        .compare_sample(&SampleRequest::new(source_table, target_table))
        .await
        .unwrap();

    assert_eq!(outcome.status(), ComparisonStatus::Success);
    assert!(outcome.report().unwrap().contains("Key:                  code"));
}

#[tokio::test]
async fn test_sample_binds_date_range_and_drops_recent_rows() {
    let source = CannedExecutor::new(
        Side::Source,
        rows(
            Side::Source,
            &["id", "status", "xrecently_changed"],
            vec![
                vec![RawValue::Int(1), RawValue::from("open"), RawValue::from("n")],
                vec![RawValue::Int(2), RawValue::from("open"), RawValue::from("y")],
            ],
        ),
    );
    let target = CannedExecutor::new(
        Side::Target,
        rows(
            Side::Target,
            &["id", "status", "xrecently_changed"],
            vec![
                vec![RawValue::Int(1), RawValue::from("open"), RawValue::from("n")],
                vec![RawValue::Int(2), RawValue::from("closed"), RawValue::from("n")],
            ],
        ),
    );

    let comparator = Comparator::new(reconciler(0.0), source.clone(), target.clone());
    let (source_table, target_table) = tables();
    let mut req = SampleRequest::new(source_table, target_table);
    req.key = KeySpec::explicit(["id"]);
    req.date_column = Some("created_at".into());
    req.date_range = Some(
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        )
        .unwrap(),
    );
    req.update_column = Some("updated_at".into());
    req.exclude_recent_hours = Some(6);

    let outcome = comparator.compare_sample(&req).await.unwrap();

    // Row 2 changed recently on the source, so only row 1 is compared
    assert_eq!(outcome.status(), ComparisonStatus::Success);
    let stats = outcome.stats().unwrap();
    assert_eq!(stats.total_source_rows, 1);
    assert_eq!(stats.total_target_rows, 1);

    let (sql, params) = &target.queries()[0];
    assert!(sql.contains("xrecently_changed"));
    assert!(params.get(START_DATE_PARAM).is_some());
    assert!(params.get(END_DATE_PARAM).is_some());
    assert!(outcome.report().unwrap().contains("2024-03-01 .. 2024-03-31"));
}

#[tokio::test]
async fn test_sample_date_column_without_range_is_rejected() {
    let empty = || CannedExecutor::new(Side::Source, RowSet::empty());
    let comparator = Comparator::new(reconciler(0.0), empty(), empty());
    let (source_table, target_table) = tables();
    let mut req = SampleRequest::new(source_table, target_table);
    req.date_column = Some("created_at".into());

    let err = comparator.compare_sample(&req).await.unwrap_err();
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn test_sample_date_range_without_column_is_rejected() {
    let source = CannedExecutor::new(Side::Source, RowSet::empty());
    let target = CannedExecutor::new(Side::Target, RowSet::empty());
    let comparator = Comparator::new(reconciler(0.0), source.clone(), target);
    let (source_table, target_table) = tables();
    let mut req = SampleRequest::new(source_table, target_table);
    req.key = KeySpec::explicit(["id"]);
    req.date_range = Some(
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        )
        .unwrap(),
    );

    let err = comparator.compare_sample(&req).await.unwrap_err();
    assert!(err.to_string().contains("date column"));
    // Rejected before any query runs
    assert!(source.queries().is_empty());
}

#[tokio::test]
async fn test_daily_counts_cross_filled() {
    let day = |d: u32| RawValue::Date(NaiveDate::from_ymd_opt(2024, 5, d).unwrap());
    let source = CannedExecutor::new(
        Side::Source,
        rows(
            Side::Source,
            &["dt", "cnt"],
            vec![vec![day(1), RawValue::Int(10)], vec![day(2), RawValue::Int(20)]],
        ),
    );
    let target = CannedExecutor::new(
        Side::Target,
        rows(
            Side::Target,
            &["dt", "cnt"],
            vec![vec![day(1), RawValue::Int(10)], vec![day(3), RawValue::Int(5)]],
        ),
    );

    let comparator = Comparator::new(reconciler(0.0), source, target.clone());
    let (source_table, target_table) = tables();
    let outcome = comparator
        .compare_counts(&CountRequest {
            source_table,
            target_table,
            date_column: "created_at".into(),
            date_range: DateRange::new(
                NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 5, 3).unwrap(),
            )
            .unwrap(),
        })
        .await
        .unwrap();

    assert_eq!(outcome.status(), ComparisonStatus::Failed);
    let stats = outcome.stats().unwrap();
    assert_eq!(stats.total_source_rows, 30);
    assert_eq!(stats.total_target_rows, 15);
    assert_eq!(stats.common_pk_rows, 10);
    assert_eq!(stats.only_source_rows, 20);
    assert_eq!(stats.only_target_rows, 5);

    let details = outcome.details().unwrap();
    assert_eq!(details.mismatches_per_column["row_count"], 2);
    assert!(target.queries()[0].0.contains("GROUP BY"));
}

#[tokio::test]
async fn test_custom_query_failure_propagates() {
    struct Failing;

    #[async_trait]
    impl QueryExecutor for Failing {
        async fn fetch(&self, _sql: &str, _params: &QueryParams) -> Result<RowSet> {
            Err(ReconError::query(Side::Target, "clickhouse", "connection refused"))
        }
    }

    let source = CannedExecutor::new(Side::Source, RowSet::empty());
    let comparator = Comparator::new(reconciler(0.0), source, Arc::new(Failing));
    let err = comparator
        .compare_custom_query(&CustomQueryRequest {
            source_sql: "SELECT 1".into(),
            source_params: QueryParams::new(),
            target_sql: "SELECT 1".into(),
            target_params: QueryParams::new(),
            key: KeySpec::Inferred,
            selection: ColumnSelection::default(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.exit_code(), 6);
}

#[tokio::test]
async fn test_custom_query_passes_params_through() {
    let data = || vec![vec![RawValue::Int(1), RawValue::from("x")]];
    let source = CannedExecutor::new(Side::Source, rows(Side::Source, &["id", "v"], data()));
    let target = CannedExecutor::new(Side::Target, rows(Side::Target, &["id", "v"], data()));

    let comparator = Comparator::new(reconciler(0.0), source.clone(), target);
    let outcome = comparator
        .compare_custom_query(&CustomQueryRequest {
            source_sql: "SELECT id, v FROM t WHERE region = $1".into(),
            source_params: QueryParams::new().with("region", "eu"),
            target_sql: "SELECT id, v FROM t WHERE region = {region:String}".into(),
            target_params: QueryParams::new().with("region", "eu"),
            key: KeySpec::Inferred,
            selection: ColumnSelection::default(),
        })
        .await
        .unwrap();

    assert_eq!(outcome.status(), ComparisonStatus::Success);
    assert_eq!(
        source.queries()[0].1.get("region"),
        Some(&RawValue::from("eu"))
    );
    assert!(outcome.report().unwrap().contains("(custom query)"));
}
