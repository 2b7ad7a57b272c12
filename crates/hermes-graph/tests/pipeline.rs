//! Full-pipeline test over the weather-station fixture: scan, annotate,
//! match, bucket, walk, emit.

use hermes_classifier::scan_modules;
use hermes_core::test_utils::weather_fixture;
use hermes_graph::{
    build_message_map, emit_message_graph, walk_message_path, DotWriter, MessageGraph,
};
use hermes_inspect::{annotate_sites, match_sites};
use hermes_types::{CancelToken, NullSink, UsageType};

#[test]
fn weather_station_end_to_end() {
    let fixture = weather_fixture();
    let cancel = CancelToken::new();

    // discover
    let mut sites = scan_modules(&fixture.set, &mut NullSink);
    assert_eq!((sites.sends.len(), sites.receives.len()), (1, 1));

    // annotate
    annotate_sites(&fixture.set, &mut sites, &mut NullSink, &cancel);
    assert_eq!(sites.sends[0].assignment(), Some(3));
    let usage = sites.receives[0].usage();
    assert_eq!(usage.class, UsageType::UnwrappedToSwitch);
    assert_eq!(usage.at, Some(fixture.switch_site));

    // match across modules under the namespace-suffix rule
    let pairs = match_sites(&sites.sends, &sites.receives, true);
    assert_eq!(pairs.len(), 1);
    let (send, recv) = pairs[0];
    assert_eq!(send.carried_type, "weatherstation::Weather");
    assert_eq!(recv.carried_type, "Weather");

    // bucket by sending scope; the receive-only scope still shows up
    let mmap = build_message_map(&pairs);
    assert_eq!(mmap.get("src/weatherstation.rs").map(Vec::len), Some(1));
    assert_eq!(mmap.get("src/dispatch.rs").map(Vec::len), Some(0));

    // the guided walk yields the chosen pair and dead-ends in the dispatcher
    let path = walk_message_path(&fixture.set, &mmap, pairs[0], None, &cancel);
    assert_eq!(path.len(), 1);
    assert_eq!(path[0].0.site, fixture.send_site);

    // the assembled graph and its rendering
    let graph = MessageGraph::from_pairs(&fixture.set, &pairs);
    assert_eq!(graph.node_count(), 2);
    assert_eq!(graph.edge_count(), 1);

    let mut writer = DotWriter::new(Vec::new());
    emit_message_graph(&fixture.set, &pairs, &mut writer).unwrap();
    let rendered = String::from_utf8(writer.into_inner()).unwrap();
    assert!(rendered.contains("weatherstation::Weather: 3"));
    assert!(rendered.contains("handled at line 12"));
}

#[test]
fn pipeline_is_deterministic() {
    let fixture = weather_fixture();
    let cancel = CancelToken::new();

    let mut first = scan_modules(&fixture.set, &mut NullSink);
    annotate_sites(&fixture.set, &mut first, &mut NullSink, &cancel);
    let mut second = scan_modules(&fixture.set, &mut NullSink);
    annotate_sites(&fixture.set, &mut second, &mut NullSink, &cancel);
    assert_eq!(first, second);

    let render = |sites: &hermes_types::ScannedSites| {
        let pairs = match_sites(&sites.sends, &sites.receives, true);
        let mut writer = DotWriter::new(Vec::new());
        emit_message_graph(&fixture.set, &pairs, &mut writer).unwrap();
        String::from_utf8(writer.into_inner()).unwrap()
    };
    assert_eq!(render(&first), render(&second));
}
