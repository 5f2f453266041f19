//! Remote source, orchestrator and coordinator tests against a mock HTTP
//! server and an in-memory store.

use std::{
  collections::HashMap,
  sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  },
  time::Duration,
};

use chrono::{DateTime, TimeZone as _, Utc};
use muster_core::{store::DatasetStore, tables::{Table, source_files}};
use muster_store_sqlite::SqliteStore;
use wiremock::{
  Mock, MockServer, ResponseTemplate,
  matchers::{method, path},
};

use crate::{
  DownloadOptions, Error, LocalState, MarkerSource, Population, PopulationReport, Populator,
  RemoteSource, Result, UpdateCoordinator, UpdateOutcome, remote::parse_marker,
};

fn fast() -> DownloadOptions {
  DownloadOptions {
    max_retries: 3,
    retry_delay: Duration::from_millis(1),
    rate_limit:  Duration::from_millis(1),
    timeout:     Duration::from_secs(5),
  }
}

fn csv_body(body: &str) -> ResponseTemplate {
  ResponseTemplate::new(200).set_body_raw(body.to_owned(), "text/csv; charset=utf-8")
}

async fn serve(server: &MockServer, file: &str, response: ResponseTemplate) {
  Mock::given(method("GET"))
    .and(path(format!("/{file}")))
    .respond_with(response)
    .mount(server)
    .await;
}

fn remote_for(server: &MockServer) -> RemoteSource {
  RemoteSource::from_base_url(format!("{}/", server.uri()), fast()).unwrap()
}

fn may_first() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap() }

// ─── Remote marker ───────────────────────────────────────────────────────────

#[tokio::test]
async fn remote_marker_is_parsed() {
  let server = MockServer::start().await;
  serve(&server, "Last_update.csv", csv_body("header\n2024-05-01T00:00:00Z")).await;

  assert_eq!(remote_for(&server).fetch_remote_marker().await, Some(may_first()));
}

#[tokio::test]
async fn malformed_remote_marker_is_unknown() {
  let server = MockServer::start().await;
  serve(&server, "Last_update.csv", csv_body("header\n")).await;

  assert_eq!(remote_for(&server).fetch_remote_marker().await, None);
}

#[tokio::test]
async fn unreachable_remote_marker_is_unknown_after_retries() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/Last_update.csv"))
    .respond_with(ResponseTemplate::new(503))
    .expect(3)
    .mount(&server)
    .await;

  assert_eq!(remote_for(&server).fetch_remote_marker().await, None);
}

// ─── Batch download ──────────────────────────────────────────────────────────

#[tokio::test]
async fn batch_fails_when_one_file_exhausts_retries() {
  let server = MockServer::start().await;
  serve(&server, "a.csv", csv_body("id|\n1|\n")).await;
  Mock::given(method("GET"))
    .and(path("/b.csv"))
    .respond_with(ResponseTemplate::new(500))
    .expect(3)
    .mount(&server)
    .await;
  serve(&server, "c.csv", csv_body("id|\n3|\n")).await;

  let dir = tempfile::tempdir().unwrap();
  let err = remote_for(&server)
    .fetch_all(&["a.csv", "b.csv", "c.csv"], dir.path())
    .await
    .unwrap_err();

  match err {
    Error::BatchFailed { failed, total } => {
      assert_eq!(total, 3);
      assert_eq!(failed.len(), 1);
      assert_eq!(failed[0].file, "b.csv");
    }
    other => panic!("expected BatchFailed, got {other:?}"),
  }
  assert!(dir.path().join("a.csv").exists());
  assert!(!dir.path().join("b.csv").exists());
  assert!(dir.path().join("c.csv").exists());
}

#[tokio::test]
async fn wrong_content_type_is_retried_then_fails() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/Factions.csv"))
    .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
    .expect(3)
    .mount(&server)
    .await;

  let dir = tempfile::tempdir().unwrap();
  let err = remote_for(&server)
    .fetch_all(&["Factions.csv"], dir.path())
    .await
    .unwrap_err();
  let Error::BatchFailed { failed, .. } = err else {
    panic!("expected BatchFailed");
  };
  assert!(failed[0].reason.contains("content type"), "{}", failed[0].reason);
}

#[tokio::test]
async fn empty_batch_is_an_error() {
  let server = MockServer::start().await;
  let dir = tempfile::tempdir().unwrap();
  let err = remote_for(&server).fetch_all(&[], dir.path()).await.unwrap_err();
  assert!(matches!(err, Error::EmptyBatch));
}

// ─── Coordinator with fakes ──────────────────────────────────────────────────

struct FixedMarker(Option<DateTime<Utc>>);

impl MarkerSource for FixedMarker {
  async fn remote_marker(&self) -> Option<DateTime<Utc>> { self.0 }
}

#[derive(Clone, Default)]
struct FakePopulation {
  fail:  bool,
  calls: Arc<AtomicUsize>,
}

impl Population for FakePopulation {
  async fn populate(&self, _marker: Option<DateTime<Utc>>) -> Result<PopulationReport> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if self.fail {
      Err(Error::EmptyBatch)
    } else {
      Ok(PopulationReport::default())
    }
  }
}

fn local_in(dir: &tempfile::TempDir) -> LocalState { LocalState::new(dir.path().join("last_update.local")) }

#[tokio::test]
async fn unknown_remote_touches_nothing() {
  let dir = tempfile::tempdir().unwrap();
  let population = FakePopulation::default();
  let calls = Arc::clone(&population.calls);
  let coordinator = UpdateCoordinator::new(FixedMarker(None), population, local_in(&dir));

  assert_eq!(coordinator.check_for_updates().await.unwrap(), UpdateOutcome::RemoteUnknown);
  assert_eq!(calls.load(Ordering::SeqCst), 0);
  assert!(coordinator.local_state().get().await.is_none());
}

#[tokio::test]
async fn absent_local_marker_triggers_population() {
  let dir = tempfile::tempdir().unwrap();
  let population = FakePopulation::default();
  let calls = Arc::clone(&population.calls);
  let coordinator = UpdateCoordinator::new(FixedMarker(Some(may_first())), population, local_in(&dir));

  let outcome = coordinator.check_for_updates().await.unwrap();
  assert!(matches!(outcome, UpdateOutcome::Updated { marker, .. } if marker == may_first()));
  assert_eq!(calls.load(Ordering::SeqCst), 1);
  assert_eq!(coordinator.local_state().get().await, Some(may_first()));
}

#[tokio::test]
async fn equal_or_older_remote_is_up_to_date() {
  let dir = tempfile::tempdir().unwrap();
  let local = local_in(&dir);
  local.set(may_first()).await.unwrap();

  let population = FakePopulation::default();
  let calls = Arc::clone(&population.calls);
  let older = may_first() - chrono::Duration::days(1);

  let same = UpdateCoordinator::new(FixedMarker(Some(may_first())), population.clone(), local.clone());
  assert!(matches!(same.check_for_updates().await.unwrap(), UpdateOutcome::UpToDate { .. }));

  let stale = UpdateCoordinator::new(FixedMarker(Some(older)), population, local.clone());
  assert!(matches!(stale.check_for_updates().await.unwrap(), UpdateOutcome::UpToDate { .. }));

  assert_eq!(calls.load(Ordering::SeqCst), 0);
  assert_eq!(local.get().await, Some(may_first()));
}

#[tokio::test]
async fn failed_population_keeps_local_marker() {
  let dir = tempfile::tempdir().unwrap();
  let local = local_in(&dir);
  local.set(may_first()).await.unwrap();

  let newer = may_first() + chrono::Duration::days(7);
  let population = FakePopulation { fail: true, ..Default::default() };
  let coordinator = UpdateCoordinator::new(FixedMarker(Some(newer)), population, local.clone());

  assert!(coordinator.check_for_updates().await.is_err());
  assert_eq!(local.get().await, Some(may_first()));
}

#[tokio::test]
async fn successful_population_stores_exactly_the_remote_marker() {
  let dir = tempfile::tempdir().unwrap();
  let local = local_in(&dir);
  local.set(may_first()).await.unwrap();

  let newer = Utc.with_ymd_and_hms(2024, 6, 12, 9, 41, 7).unwrap();
  let coordinator =
    UpdateCoordinator::new(FixedMarker(Some(newer)), FakePopulation::default(), local.clone());

  coordinator.check_for_updates().await.unwrap();
  assert_eq!(local.get().await, Some(newer));
}

#[tokio::test]
async fn sub_millisecond_marker_populates_only_once() {
  let dir = tempfile::tempdir().unwrap();
  let remote = parse_marker("last_update|\n2024-05-01T00:00:00.123456Z|\n").unwrap();
  let population = FakePopulation::default();
  let calls = Arc::clone(&population.calls);
  let coordinator = UpdateCoordinator::new(FixedMarker(Some(remote)), population, local_in(&dir));

  let first = coordinator.check_for_updates().await.unwrap();
  assert!(matches!(first, UpdateOutcome::Updated { marker, .. } if marker == remote));
  assert_eq!(coordinator.local_state().get().await, Some(remote));

  let second = coordinator.check_for_updates().await.unwrap();
  assert_eq!(second, UpdateOutcome::UpToDate { local: remote, remote });
  assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// ─── End to end ──────────────────────────────────────────────────────────────

fn dataset() -> HashMap<&'static str, &'static str> {
  HashMap::from([
    ("Factions.csv", "id|name|link|\nSM|Space Marines||\nAE|Aeldari||\n"),
    ("Source.csv", "id|name|type|edition|version|errata_date|errata_link|\n1|Codex|Codex|10th||||\n"),
    ("Abilities.csv", "id|faction_id|name|legend|description|\n1||Deep Strike|||\n"),
    (
      "Datasheets.csv",
      "id|name|faction_id|source_id|role|legend|loadout|transport|virtual|leader_head|leader_footer|damaged_w|damaged_description|link|\n\
       100|Captain|SM|1|Characters||||false||||||\n\
       101|Stray|XY|1|Characters||||false||||||\n",
    ),
    ("Datasheets_models.csv", "datasheet_id|line|name|inv_sv|\n100|1|Captain|-|\n"),
    ("Datasheets_abilities.csv", "datasheet_id|line|ability_id|\n100|1|1|\n"),
    ("Datasheets_leader.csv", "leader_id|attached_id|\n100|100|\n"),
    (
      "Stratagems.csv",
      "faction_id|name|id|type|cp_cost|legend|turn|phase|detachment|description|\n\
       SM|Armour of Contempt|1|Battle Tactic|1||Either|Shooting|Gladius Task Force||\n",
    ),
    (
      "Enhancements.csv",
      "faction_id|id|name|cost|detachment|legend|description|\nSM|10|Artificer Armour|10|Gladius Task Force|||\n",
    ),
    (
      "Detachment_abilities.csv",
      "id|faction_id|name|legend|description|detachment|\n20|SM|Combat Doctrines|||Gladius Task Force|\n",
    ),
    ("Datasheets_stratagems.csv", "datasheet_id|stratagem_id|\n100|1|\n100|2|\n"),
    ("Datasheets_enhancements.csv", "datasheet_id|enhancement_id|\n100|10|\n"),
    ("Datasheets_detachment_abilities.csv", "datasheet_id|detachment_ability_id|\n100|20|\n"),
  ])
}

/// Serve every source file once (header-only where `dataset` has nothing)
/// plus the marker.
/// Serve the dataset, expecting each source file to be fetched `runs` times.
async fn mount_dataset(server: &MockServer, marker: &str, runs: u64) {
  let files = dataset();
  for file in source_files() {
    let body = files.get(file).copied().unwrap_or("datasheet_id|line|\n");
    Mock::given(method("GET"))
      .and(path(format!("/{file}")))
      .respond_with(csv_body(body))
      .expect(runs)
      .mount(server)
      .await;
  }
  serve(server, "Last_update.csv", csv_body(&format!("last_update|\n{marker}|\n"))).await;
}

#[tokio::test]
async fn populator_loads_everything_in_order() {
  let server = MockServer::start().await;
  mount_dataset(&server, "2024-05-01 00:00:00", 1).await;
  let dir = tempfile::tempdir().unwrap();

  let store = SqliteStore::open_in_memory().await.unwrap();
  let populator = Populator::new(store.clone(), remote_for(&server), dir.path().join("data"));
  let report = populator.run(Some(may_first())).await.unwrap();

  assert_eq!(report.tables.len(), 18);
  assert_eq!(report.detachments, 1);
  assert_eq!(report.table(Table::Datasheets).unwrap().skipped, 1);
  assert_eq!(report.table(Table::DatasheetsStratagems).unwrap().skipped, 1);
  assert_eq!(report.skipped(), 2);

  assert!(store.foreign_keys_enabled().await.unwrap());
  assert_eq!(store.last_update().await.unwrap(), Some(may_first()));

  let stratagem = store.get_by_id(Table::Stratagems, "1").await.unwrap().unwrap();
  let detachment = store.get_by_id(Table::Detachments, "1").await.unwrap().unwrap();
  assert_eq!(stratagem["detachment_id"], detachment["id"]);
  assert_eq!(detachment["name"], "Gladius Task Force");
  assert_eq!(store.count(Table::DatasheetsDetachmentsAbilities).await.unwrap(), 1);
  assert!(dir.path().join("data").join("Factions.csv").exists());
}

#[tokio::test]
async fn coordinator_populates_once_then_reports_up_to_date() {
  let server = MockServer::start().await;
  mount_dataset(&server, "2024-05-01T00:00:00Z", 1).await;
  let dir = tempfile::tempdir().unwrap();

  let store = SqliteStore::open_in_memory().await.unwrap();
  let remote = remote_for(&server);
  let populator = Populator::new(store.clone(), remote.clone(), dir.path().join("data"));
  let coordinator = UpdateCoordinator::new(remote, populator, local_in(&dir));

  let first = coordinator.check_for_updates().await.unwrap();
  assert!(matches!(first, UpdateOutcome::Updated { marker, .. } if marker == may_first()));
  assert_eq!(store.count(Table::Factions).await.unwrap(), 2);

  // Every source file expects exactly one request, so a second population
  // would fail verification when the server drops.
  let second = coordinator.check_for_updates().await.unwrap();
  assert!(matches!(second, UpdateOutcome::UpToDate { .. }));
}

#[tokio::test]
async fn repopulating_yields_identical_tables() {
  let server = MockServer::start().await;
  mount_dataset(&server, "2024-05-01T00:00:00Z", 2).await;
  let dir = tempfile::tempdir().unwrap();

  let store = SqliteStore::open_in_memory().await.unwrap();
  let populator = Populator::new(store.clone(), remote_for(&server), dir.path().join("data"));

  let mut snapshots = Vec::new();
  for _ in 0..2 {
    populator.run(Some(may_first())).await.unwrap();
    let mut tables = Vec::new();
    for table in Table::ALL {
      tables.push((table, store.rows(table).await.unwrap()));
    }
    snapshots.push(tables);
  }

  let (first, second) = (&snapshots[0], &snapshots[1]);
  for ((table, before), (_, after)) in first.iter().zip(second) {
    assert_eq!(before, after, "{table} differs after repopulating");
  }
  let detachments = &first.iter().find(|(t, _)| *t == Table::Detachments).unwrap().1;
  assert_eq!(detachments.len(), 1);
  assert!(!first.iter().find(|(t, _)| *t == Table::Stratagems).unwrap().1.is_empty());
}
