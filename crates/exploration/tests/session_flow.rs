use aoi::{ActionOrigin, AoiEvent, AoiPhase, SyncDecision};
use chrono::NaiveDate;
use exploration::{
    AnalysisState, DatasetConfig, ExplorationConfig, ExplorationSession, MapCall, RecordingMap,
};
use foundation::{DateDomain, TimeDensity};
use pretty_assertions::assert_eq;
use urlstate::{MemoryKeyValueStore, MemoryLocation, UrlPort};

type Session = ExplorationSession<MemoryLocation, RecordingMap, MemoryKeyValueStore>;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn dom(a: NaiveDate, b: NaiveDate) -> DateDomain {
    DateDomain::new(a, b).unwrap()
}

fn open(search: &str) -> Session {
    ExplorationSession::new(
        ExplorationConfig::default(),
        MemoryLocation::new(search),
        RecordingMap::new(),
        MemoryKeyValueStore::new(),
    )
    .unwrap()
}

fn loaded(search: &str) -> Session {
    let mut s = open(search);
    let h = s.add_dataset("no2", TimeDensity::Day).unwrap();
    s.complete_load(&h, Ok(dom(d(2018, 1, 1), d(2022, 12, 1))))
        .unwrap();
    s
}

#[test]
fn two_datasets_clamp_and_release_the_cursor() {
    let mut s = open("");
    let no2 = s.add_dataset("no2", TimeDensity::Day).unwrap();
    let co2 = s.add_dataset("co2", TimeDensity::Month).unwrap();

    // Completion order is arbitrary.
    s.complete_load(&co2, Ok(dom(d(2020, 1, 1), d(2023, 1, 1))))
        .unwrap();
    s.complete_load(&no2, Ok(dom(d(2018, 1, 1), d(2022, 12, 1))))
        .unwrap();
    assert_eq!(
        s.combined_domain(),
        Some(dom(d(2020, 1, 1), d(2022, 12, 1)))
    );

    let selection = s.select_date(d(2025, 1, 1));
    assert!(selection.clamped);
    assert_eq!(s.cursor().selected_date(), Some(d(2022, 12, 1)));

    let clamps_before = s.events().count("cursor.clamped");
    s.remove_dataset("co2").unwrap();
    assert_eq!(
        s.combined_domain(),
        Some(dom(d(2018, 1, 1), d(2022, 12, 1)))
    );
    assert_eq!(s.cursor().selected_date(), Some(d(2022, 12, 1)));
    assert_eq!(s.events().count("cursor.clamped"), clamps_before);
    assert_eq!(s.map().layer_ids(), vec!["no2".to_string()]);
}

#[test]
fn unknown_ids_leave_the_registry_untouched() {
    let mut s = loaded("");
    let domain = s.combined_domain();
    let search = s.url().search();
    assert!(s.remove_dataset("ghost").is_err());
    assert!(
        s.set_status("ghost", timeline::LoadState::Failed { error: "x".into() })
            .is_err()
    );
    assert_eq!(s.combined_domain(), domain);
    assert_eq!(s.registry().len(), 1);
    assert_eq!(s.url().search(), search);
}

#[test]
fn permalink_restores_a_full_session() {
    let mut first = loaded("");
    first.set_selected_date(d(2021, 3, 4)).unwrap();
    first.apply_aoi_preset("world").unwrap();
    first.fly_to([12.5, 41.9], 5.0);
    first.set_color_map("magma");

    let link = first.url().search();
    let mut second = open(&link);
    // Feature ids are not part of the link; compare geometry separately.
    let (mut restored, mut original) = (second.snapshot(), first.snapshot());
    assert!(restored.aoi.take().is_some());
    assert!(original.aoi.take().is_some());
    assert_eq!(restored, original);
    assert_eq!(second.cursor().selected_date(), Some(d(2021, 3, 4)));
    assert_eq!(second.aoi_center(), first.aoi_center());
    assert_eq!(second.aoi_state().phase(), AoiPhase::Committed);
    // Opening a permalink writes nothing.
    assert_eq!(second.url().replace_count(), 0);

    let loads = second.begin_pending_loads();
    assert_eq!(loads.len(), 1);
    second
        .complete_load(&loads[0], Ok(dom(d(2018, 1, 1), d(2022, 12, 1))))
        .unwrap();
    assert_eq!(second.cursor().selected_date(), Some(d(2021, 3, 4)));
    assert_eq!(second.url().search(), link);
}

#[test]
fn back_navigation_moves_cursor_and_map_without_writing() {
    let mut s = loaded("");
    s.set_selected_date(d(2020, 6, 1)).unwrap();
    let earlier = s.url().search();
    s.set_selected_date(d(2021, 6, 1)).unwrap();
    let writes = s.url().replace_count();

    s.url_mut().navigate(format!("{earlier}&zoom=3"));
    s.map_mut().take();
    let nav = s.handle_navigation();
    assert!(nav.changes.dates);
    assert!(nav.changes.viewport);
    assert!(!nav.changes.datasets);
    assert!(nav.loads.is_empty());
    assert_eq!(s.cursor().selected_date(), Some(d(2020, 6, 1)));
    assert_eq!(
        s.map().calls().last(),
        Some(&MapCall::FlyTo {
            center: [0.0, 0.0],
            zoom: 3.0
        })
    );
    assert_eq!(s.url().replace_count(), writes);
    assert!(!s.handle_navigation().changes.any());
}

#[test]
fn navigation_to_an_out_of_domain_date_writes_the_clamp() {
    let mut s = loaded("");
    let writes = s.url().replace_count();
    let search = s.url().search().replace("date=2022-12-01", "date=2030-01-01");
    s.url_mut().navigate(search);

    s.handle_navigation();
    assert_eq!(s.cursor().selected_date(), Some(d(2022, 12, 1)));
    assert_eq!(s.url().replace_count(), writes + 1);
    assert!(s.url().search().contains("date=2022-12-01"));
}

#[test]
fn navigation_drops_and_restores_datasets() {
    let mut s = loaded("");
    let with_no2 = s.url().search();
    s.remove_dataset("no2").unwrap();
    assert!(s.registry().is_empty());

    s.url_mut().navigate(with_no2);
    let nav = s.handle_navigation();
    assert!(nav.changes.datasets);
    assert_eq!(nav.loads.len(), 1);
    assert!(s.registry().contains("no2"));
    assert_eq!(s.map().layer_ids(), vec!["no2".to_string()]);

    s.complete_load(&nav.loads[0], Ok(dom(d(2018, 1, 1), d(2022, 12, 1))))
        .unwrap();
    assert_eq!(s.cursor().selected_date(), Some(d(2022, 12, 1)));
}

#[test]
fn aoi_edits_sync_between_surfaces() {
    let mut s = loaded("");
    let map_seen = s.aoi_revision();
    s.apply_aoi_preset("world").unwrap();
    assert_eq!(
        s.aoi_sync(ActionOrigin::Map, map_seen),
        SyncDecision::Reinitialize
    );
    assert_eq!(
        s.aoi_sync(ActionOrigin::Panel, map_seen),
        SyncDecision::IgnoreEcho
    );

    s.set_analysis_interval(Some(dom(d(2020, 1, 1), d(2020, 6, 1))))
        .unwrap();
    let run = s.start_analysis().unwrap();
    assert_eq!(s.analysis().state(), AnalysisState::Running { run_id: run });

    let writes = s.url().replace_count();
    s.dispatch_aoi(ActionOrigin::Map, AoiEvent::SelectClick)
        .unwrap();
    // Selecting is not an edit.
    assert_eq!(s.url().replace_count(), writes);
    assert_eq!(s.analysis().state(), AnalysisState::Running { run_id: run });

    s.dispatch_aoi(ActionOrigin::Map, AoiEvent::TrashClick { ids: vec![] })
        .unwrap();
    assert_eq!(s.aoi_state().phase(), AoiPhase::Empty);
    assert_eq!(s.url().replace_count(), writes + 1);
    assert!(!s.url().search().contains("aoi="));
    assert_eq!(s.analysis().state(), AnalysisState::Obsolete);
}

#[test]
fn configured_datasets_survive_navigation() {
    let config = ExplorationConfig {
        datasets: vec![DatasetConfig {
            id: "no2".into(),
            time_density: TimeDensity::Month,
        }],
        ..ExplorationConfig::default()
    };
    let mut s = ExplorationSession::new(
        config,
        MemoryLocation::new(""),
        RecordingMap::new(),
        MemoryKeyValueStore::new(),
    )
    .unwrap();
    assert!(s.registry().contains("no2"));
    assert!(!s.begin_pending_loads().is_empty());
    assert_eq!(s.url().search(), "");

    s.url_mut().navigate("zoom=3");
    let nav = s.handle_navigation();
    assert!(nav.changes.viewport);
    assert!(!nav.changes.datasets);
    assert!(s.registry().contains("no2"));
    assert_eq!(s.url().replace_count(), 0);

    // Removing the configured dataset is recorded explicitly.
    s.remove_dataset("no2").unwrap();
    assert_eq!(s.url().search(), "zoom=3&datasets=%5B%5D");
    s.url_mut().navigate("zoom=3");
    let nav = s.handle_navigation();
    assert!(nav.changes.datasets);
    assert_eq!(nav.loads.len(), 1);
    assert_eq!(s.registry().ids(), vec!["no2".into()]);
}
