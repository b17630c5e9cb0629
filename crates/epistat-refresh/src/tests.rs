//! Refresh-pass tests against an in-memory store and scripted upstream.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex},
  time::Duration,
};

use epistat_core::{
  chart::ChartStore,
  series::{CatalogEntry, SeriesResponse, TimeSeriesPoint},
  snapshot::{CountrySnapshot, GLOBAL_CODE},
  store::SnapshotStore,
  upstream::Upstream,
};
use epistat_store_sqlite::SqliteStore;
use serde_json::json;
use tokio::sync::Notify;

use crate::{
  DerivationPolicy, RefreshOutcome, RefreshReport, Refresher, Scheduler, SkipReason,
};

// ─── Fakes ───────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct FakeError(String);

enum Script {
  Series(SeriesResponse),
  Fail,
}

#[derive(Default)]
struct FakeUpstream {
  catalog:   Option<Vec<CatalogEntry>>,
  series:    HashMap<String, Script>,
  /// When set, `fetch_catalog` signals `entered` and then waits on `gate`.
  hold:      Option<(Arc<Notify>, Arc<Notify>)>,
}

impl FakeUpstream {
  fn with_country(mut self, country: &str, slug: &str, iso2: &str, script: Script) -> Self {
    self.catalog.get_or_insert_with(Vec::new).push(CatalogEntry {
      country: country.into(),
      slug:    slug.into(),
      iso2:    iso2.into(),
    });
    self.series.insert(slug.into(), script);
    self
  }
}

impl Upstream for FakeUpstream {
  type Error = FakeError;

  async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>, FakeError> {
    if let Some((entered, gate)) = &self.hold {
      entered.notify_one();
      gate.notified().await;
    }
    self.catalog.clone().ok_or_else(|| FakeError("catalog down".into()))
  }

  async fn fetch_series(&self, slug: &str) -> Result<SeriesResponse, FakeError> {
    match self.series.get(slug) {
      Some(Script::Series(s)) => Ok(s.clone()),
      Some(Script::Fail) | None => Err(FakeError(format!("{slug} unreachable"))),
    }
  }
}

#[derive(Default)]
struct FakeCharts {
  published: Mutex<Vec<String>>,
  fail_for:  Option<String>,
}

impl ChartStore for FakeCharts {
  type Error = FakeError;

  async fn publish(&self, code: &str, _series: &[TimeSeriesPoint]) -> Result<(), FakeError> {
    if self.fail_for.as_deref() == Some(code) {
      return Err(FakeError("disk full".into()));
    }
    self.published.lock().unwrap().push(code.to_owned());
    Ok(())
  }

  async fn load(&self, _code: &str) -> Result<Option<Vec<u8>>, FakeError> { Ok(None) }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn point(country: &str, confirmed: i64, deaths: i64, active: i64, day: u32) -> TimeSeriesPoint {
  TimeSeriesPoint {
    country:   Some(country.into()),
    confirmed: Some(confirmed),
    deaths:    Some(deaths),
    recovered: Some(0),
    active:    Some(active),
    date:      Some(format!("2021-01-{day:02}T00:00:00Z")),
  }
}

fn series(points: Vec<TimeSeriesPoint>) -> Script {
  Script::Series(SeriesResponse(serde_json::to_value(points).unwrap()))
}

fn testland() -> Script {
  series(vec![point("Testland", 100, 5, 10, 1), point("Testland", 120, 6, 15, 2)])
}

struct Harness {
  refresher: Arc<Refresher<FakeUpstream, SqliteStore, FakeCharts>>,
  store:     Arc<SqliteStore>,
  charts:    Arc<FakeCharts>,
}

async fn harness(upstream: FakeUpstream, charts: FakeCharts, policy: DerivationPolicy) -> Harness {
  let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
  let charts = Arc::new(charts);
  let refresher = Arc::new(Refresher::new(
    Arc::new(upstream),
    store.clone(),
    charts.clone(),
    policy,
  ));
  Harness { refresher, store, charts }
}

async fn run(h: &Harness) -> RefreshReport {
  match h.refresher.run_refresh().await {
    RefreshOutcome::Completed(report) => report,
    RefreshOutcome::Busy => panic!("unexpected busy"),
  }
}

fn figures(row: &CountrySnapshot) -> (i64, i64, i64, i64) {
  (row.confirmed_total, row.deaths_total, row.recovered_total, row.active_delta)
}

// ─── End to end ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn single_country_pass_writes_row_global_and_chart() {
  let upstream = FakeUpstream::default().with_country("Testland", "testland", "TL", testland());
  let h = harness(upstream, FakeCharts::default(), DerivationPolicy::Abort).await;

  let report = run(&h).await;
  assert_eq!(report.updated, ["TL"]);
  assert!(report.skipped.is_empty());

  let row = h.store.get("TL").await.unwrap().expect("TL row");
  assert_eq!(row.name, "Testland");
  assert_eq!(figures(&row), (120, 6, 109, 5));

  let global = h.store.get(GLOBAL_CODE).await.unwrap().expect("global row");
  assert_eq!(global.name, "Global");
  assert_eq!(figures(&global), (120, 6, 109, 5));
  assert_eq!(report.global, Some(global));

  assert_eq!(*h.charts.published.lock().unwrap(), ["TL"]);
}

#[tokio::test]
async fn global_row_is_the_sum_of_rows_written_in_the_pass() {
  let upstream = FakeUpstream::default()
    .with_country("Testland", "testland", "TL", testland())
    .with_country(
      "Otherland",
      "otherland",
      "OL",
      series(vec![
        point("Otherland", 1000, 10, 300, 1),
        point("Otherland", 1100, 12, 250, 2),
        point("Otherland", 1300, 15, 280, 3),
      ]),
    );
  let h = harness(upstream, FakeCharts::default(), DerivationPolicy::Abort).await;
  run(&h).await;

  let rows: Vec<_> = h
    .store
    .list()
    .await
    .unwrap()
    .into_iter()
    .filter(|r| r.code != GLOBAL_CODE)
    .collect();
  assert_eq!(rows.len(), 2);

  let sum = rows.iter().fold((0, 0, 0, 0), |acc, r| {
    let (c, d, rc, a) = figures(r);
    (acc.0 + c, acc.1 + d, acc.2 + rc, acc.3 + a)
  });
  let global = h.store.get(GLOBAL_CODE).await.unwrap().unwrap();
  assert_eq!(figures(&global), sum);
}

#[tokio::test]
async fn catalog_is_processed_in_name_order() {
  let upstream = FakeUpstream::default()
    .with_country("Zedland", "zedland", "ZD", testland())
    .with_country("Abland", "abland", "AB", testland())
    .with_country("Midland", "midland", "MD", testland());
  let h = harness(upstream, FakeCharts::default(), DerivationPolicy::Abort).await;

  let report = run(&h).await;
  assert_eq!(report.updated, ["AB", "MD", "ZD"]);
}

#[tokio::test]
async fn second_pass_replaces_rows_in_place() {
  let upstream = FakeUpstream::default().with_country("Testland", "testland", "TL", testland());
  let h = harness(upstream, FakeCharts::default(), DerivationPolicy::Abort).await;

  run(&h).await;
  let first = h.store.list().await.unwrap();
  run(&h).await;
  let second = h.store.list().await.unwrap();

  assert_eq!(first, second);
  assert_eq!(second.len(), 2);
}

// ─── Skips ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_and_unrecognised_series_are_skipped() {
  let upstream = FakeUpstream::default()
    .with_country("Aland", "aland", "AX", series(vec![]))
    .with_country(
      "Bland",
      "bland",
      "BX",
      Script::Series(SeriesResponse(json!({"message": "Not Found"}))),
    )
    .with_country("Testland", "testland", "TL", testland());
  let h = harness(upstream, FakeCharts::default(), DerivationPolicy::Abort).await;

  let report = run(&h).await;
  assert_eq!(report.updated, ["TL"]);
  assert_eq!(report.skipped.len(), 2);
  assert!(report.skipped.iter().all(|s| s.reason == SkipReason::NoData));
  assert!(report.aborted_at.is_none());
  assert!(h.store.get("AX").await.unwrap().is_none());
}

#[tokio::test]
async fn fetch_failures_skip_the_country_and_continue() {
  let upstream = FakeUpstream::default()
    .with_country("Aland", "aland", "AX", Script::Fail)
    .with_country("Testland", "testland", "TL", testland());
  let h = harness(upstream, FakeCharts::default(), DerivationPolicy::Abort).await;

  let report = run(&h).await;
  assert_eq!(report.updated, ["TL"]);
  assert_eq!(report.skipped[0].slug, "aland");
  assert!(matches!(report.skipped[0].reason, SkipReason::FetchFailed(_)));
}

#[tokio::test]
async fn chart_failure_keeps_the_row() {
  let upstream = FakeUpstream::default().with_country("Testland", "testland", "TL", testland());
  let charts = FakeCharts { fail_for: Some("TL".into()), ..Default::default() };
  let h = harness(upstream, charts, DerivationPolicy::Abort).await;

  let report = run(&h).await;
  assert_eq!(report.chart_failures, ["TL"]);
  assert!(h.store.get("TL").await.unwrap().is_some());
  assert_eq!(figures(&report.global.unwrap()), (120, 6, 109, 5));
}

// ─── Derivation failures ─────────────────────────────────────────────────────

fn catalog_with_short_series_in_the_middle() -> FakeUpstream {
  FakeUpstream::default()
    .with_country("Aland", "aland", "AX", testland())
    .with_country("Bland", "bland", "BX", series(vec![point("Bland", 1, 0, 1, 1)]))
    .with_country("Cland", "cland", "CX", testland())
}

#[tokio::test]
async fn abort_policy_stops_the_pass_but_writes_global() {
  let h = harness(
    catalog_with_short_series_in_the_middle(),
    FakeCharts::default(),
    DerivationPolicy::Abort,
  )
  .await;

  let report = run(&h).await;
  assert_eq!(report.updated, ["AX"]);
  assert_eq!(report.aborted_at.as_deref(), Some("bland"));
  assert_eq!(
    report.skipped[0].reason,
    SkipReason::DeriveFailed(epistat_core::Error::TooShort { len: 1 })
  );
  assert!(h.store.get("CX").await.unwrap().is_none());

  let global = h.store.get(GLOBAL_CODE).await.unwrap().unwrap();
  assert_eq!(figures(&global), (120, 6, 109, 5));
}

#[tokio::test]
async fn skip_policy_continues_after_derivation_failure() {
  let h = harness(
    catalog_with_short_series_in_the_middle(),
    FakeCharts::default(),
    DerivationPolicy::Skip,
  )
  .await;

  let report = run(&h).await;
  assert_eq!(report.updated, ["AX", "CX"]);
  assert!(report.aborted_at.is_none());

  let global = h.store.get(GLOBAL_CODE).await.unwrap().unwrap();
  assert_eq!(figures(&global), (240, 12, 218, 10));
}

#[tokio::test]
async fn missing_field_counts_as_derivation_failure() {
  let mut last = point("Testland", 120, 6, 15, 2);
  last.confirmed = None;
  let upstream = FakeUpstream::default().with_country(
    "Testland",
    "testland",
    "TL",
    series(vec![point("Testland", 100, 5, 10, 1), last]),
  );
  let h = harness(upstream, FakeCharts::default(), DerivationPolicy::Abort).await;

  let report = run(&h).await;
  assert_eq!(report.aborted_at.as_deref(), Some("testland"));
  assert!(matches!(
    report.skipped[0].reason,
    SkipReason::DeriveFailed(epistat_core::Error::MissingField { field: "Confirmed", .. })
  ));
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
  fn contents(&self) -> String { String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned() }
}

impl std::io::Write for LogBuffer {
  fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
    self.0.lock().unwrap().extend_from_slice(buf);
    Ok(buf.len())
  }

  fn flush(&mut self) -> std::io::Result<()> { Ok(()) }
}

#[tokio::test]
async fn derivation_failure_logs_the_payload_as_received() {
  let raw = json!([{
    "Country": "Bland", "CountryCode": "BX", "Lat": "12.5", "Lon": "-3",
    "Confirmed": 1, "Deaths": 0, "Recovered": 0, "Active": 1,
    "Date": "2021-01-01T00:00:00Z"
  }]);
  let upstream = FakeUpstream::default().with_country(
    "Bland",
    "bland",
    "BX",
    Script::Series(SeriesResponse(raw)),
  );
  let h = harness(upstream, FakeCharts::default(), DerivationPolicy::Abort).await;

  let logs = LogBuffer::default();
  let subscriber = tracing_subscriber::fmt()
    .with_ansi(false)
    .with_writer({
      let logs = logs.clone();
      move || logs.clone()
    })
    .finish();
  let report = {
    let _guard = tracing::subscriber::set_default(subscriber);
    run(&h).await
  };

  assert_eq!(report.aborted_at.as_deref(), Some("bland"));
  let output = logs.contents();
  assert!(output.contains("cannot derive metrics"));
  assert!(output.contains(r#""CountryCode":"BX""#), "{output}");
  assert!(output.contains(r#""Lat":"12.5""#), "{output}");
}

// ─── Catalog failure ─────────────────────────────────────────────────────────

#[tokio::test]
async fn catalog_failure_leaves_global_row_untouched() {
  let h = harness(FakeUpstream::default(), FakeCharts::default(), DerivationPolicy::Abort).await;
  let previous = CountrySnapshot {
    code:            GLOBAL_CODE.into(),
    name:            "Global".into(),
    confirmed_total: 42,
    deaths_total:    1,
    recovered_total: 40,
    active_delta:    1,
  };
  h.store.upsert(previous.clone()).await.unwrap();

  let report = run(&h).await;
  assert!(report.catalog_failed);
  assert!(report.global.is_none());
  assert_eq!(h.store.get(GLOBAL_CODE).await.unwrap(), Some(previous));
}

// ─── Concurrency ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn overlapping_refresh_is_rejected() {
  let entered = Arc::new(Notify::new());
  let gate = Arc::new(Notify::new());
  let mut upstream = FakeUpstream::default().with_country("Testland", "testland", "TL", testland());
  upstream.hold = Some((entered.clone(), gate.clone()));
  let h = harness(upstream, FakeCharts::default(), DerivationPolicy::Abort).await;

  let first = {
    let refresher = h.refresher.clone();
    tokio::spawn(async move { refresher.run_refresh().await })
  };
  entered.notified().await;

  assert!(matches!(h.refresher.run_refresh().await, RefreshOutcome::Busy));

  gate.notify_one();
  assert!(matches!(first.await.unwrap(), RefreshOutcome::Completed(_)));
}

#[tokio::test]
async fn scheduler_runs_immediately_and_stops() {
  let upstream = FakeUpstream::default().with_country("Testland", "testland", "TL", testland());
  let h = harness(upstream, FakeCharts::default(), DerivationPolicy::Abort).await;

  let scheduler = Scheduler::start(h.refresher.clone(), Duration::from_secs(3600));

  let store = h.store.clone();
  tokio::time::timeout(Duration::from_secs(5), async move {
    while store.get(GLOBAL_CODE).await.unwrap().is_none() {
      tokio::time::sleep(Duration::from_millis(10)).await;
    }
  })
  .await
  .expect("first pass should run without waiting for the interval");

  tokio::time::timeout(Duration::from_secs(5), scheduler.stop())
    .await
    .expect("scheduler should stop");
}

#[tokio::test]
async fn stop_cancels_a_pass_in_flight() {
  let entered = Arc::new(Notify::new());
  let gate = Arc::new(Notify::new());
  let mut upstream = FakeUpstream::default().with_country("Testland", "testland", "TL", testland());
  upstream.hold = Some((entered.clone(), gate));
  let h = harness(upstream, FakeCharts::default(), DerivationPolicy::Abort).await;

  let scheduler = Scheduler::start(h.refresher.clone(), Duration::from_secs(3600));
  entered.notified().await;

  tokio::time::timeout(Duration::from_secs(5), scheduler.stop())
    .await
    .expect("stop should not wait for the blocked pass");
  assert!(h.store.get(GLOBAL_CODE).await.unwrap().is_none());
}
