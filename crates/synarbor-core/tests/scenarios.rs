//! End-to-end arbor scenarios with hand-checked outcomes

use synarbor_core::{
    engine, BoundsState, ConnectionType, GenerationContext, Loc, ModeSource, PrimaryRule,
    SecondaryRule, SourceGeometry, TargetGeometry,
};
use synarbor_storage::ConnTypeId;

/// Ten candidates drawn from a 3 × 2 window that always lies inside the
/// source array, one bin of the window per candidate.
fn six_position_window() -> ConnectionType {
    ConnectionType::builder(
        ConnTypeId::new(1),
        SourceGeometry::new(6, 4, 1),
        TargetGeometry::new(2, 2, 1),
        10,
    )
    .with_primary(PrimaryRule::Uniform {
        wx: 3,
        wy: 2,
        ox: 0,
        oy: 0,
    })
    .with_partitioned(true)
    .build()
    .unwrap()
}

#[test]
fn small_window_fills_six_and_skips_four() {
    let ct = six_position_window();
    for cell in 0..ct.cell_count() {
        let run = engine::generate_arbor(&ct, cell, true).unwrap();
        assert_eq!(run.nuk(), 6, "cell {}", cell);
        assert_eq!(run.skipped, 4);

        let buffer = run.buffer.as_ref().unwrap();
        assert_eq!(buffer.accepted(), 6);
        assert_eq!(buffer.skipped(), 4);
        assert!(buffer.is_complete());

        let jsyn: Vec<u32> = run.synapses.iter().map(|s| s.jsyn).collect();
        assert_eq!(jsyn, vec![1, 3, 4, 6, 8, 9]);
        assert_eq!(buffer.skips().collect::<Vec<_>>(), vec![0, 2, 5, 7]);
    }
}

#[test]
fn small_window_visits_every_position_once() {
    let ct = six_position_window();
    let run = engine::generate_arbor(&ct, 0, false).unwrap();
    // Cell 0 projects to (1, 1); the window spans columns 0..=2, rows 0..=1.
    let locs: Vec<Loc> = run
        .synapses
        .iter()
        .map(|s| ct.source().locate(s.lij))
        .collect();
    assert_eq!(
        locs,
        vec![
            Loc::new(0, 0, 0),
            Loc::new(1, 0, 0),
            Loc::new(2, 0, 0),
            Loc::new(0, 1, 0),
            Loc::new(1, 1, 0),
            Loc::new(2, 1, 0),
        ]
    );
}

#[test]
fn small_window_regenerates_identically() {
    let ct = six_position_window();
    for cell in 0..ct.cell_count() {
        let generated = engine::generate_arbor(&ct, cell, true).unwrap();
        let mut buffer = generated.buffer.clone().unwrap();
        buffer.compact();

        let regenerated = engine::regenerate_arbor(&ct, cell, &buffer).unwrap();
        assert_eq!(regenerated.synapses, generated.synapses);
        assert_eq!(regenerated.skipped, 4);
    }
}

/// Box two columns wide and three rows tall, anchored one row above the
/// projected target, on a source only two rows tall.
fn overhanging_box() -> ConnectionType {
    ConnectionType::builder(
        ConnTypeId::new(2),
        SourceGeometry::new(4, 2, 1),
        TargetGeometry::new(4, 2, 1),
        6,
    )
    .with_primary(PrimaryRule::Aligned { ox: 0, oy: -1 })
    .with_secondary(SecondaryRule::Box { bx: 2, by: 3 })
    .build()
    .unwrap()
}

#[test]
fn box_above_top_edge_exhausts_arbor() {
    let ct = overhanging_box();
    let mut ctx = GenerationContext::new(&ct, 0, ModeSource::Generate { record: true }).unwrap();
    assert!(ctx.next_lij().unwrap().is_none());
    assert_eq!(ctx.bounds_state(), BoundsState::ArborExhausted);
    assert_eq!(ctx.jsyn(), 5);

    let summary = ctx.finish();
    assert_eq!(summary.accepted, 0);
    assert_eq!(summary.skipped, 6);
    assert_eq!(summary.buffer.unwrap().skips().collect::<Vec<_>>(), (0..6).collect::<Vec<_>>());
}

#[test]
fn box_past_bottom_edge_skips_remainder() {
    let ct = overhanging_box();
    // Cell 4 sits on the second row; its anchor is row 0 and the box's third
    // row falls off the array at candidate 4.
    let run = engine::generate_arbor(&ct, 4, true).unwrap();
    assert_eq!(run.nuk(), 4);
    assert_eq!(run.skipped, 2);
    let locs: Vec<Loc> = run
        .synapses
        .iter()
        .map(|s| ct.source().locate(s.lij))
        .collect();
    assert_eq!(
        locs,
        vec![
            Loc::new(0, 0, 0),
            Loc::new(1, 0, 0),
            Loc::new(0, 1, 0),
            Loc::new(1, 1, 0),
        ]
    );

    let buffer = run.buffer.unwrap();
    assert_eq!(buffer.skips().collect::<Vec<_>>(), vec![4, 5]);
    let regenerated = engine::regenerate_arbor(&ct, 4, &buffer).unwrap();
    assert_eq!(regenerated.synapses, run.synapses);
}

#[test]
fn exhausted_arbors_replay_in_every_mode() {
    let ct = overhanging_box();
    let store = engine::generate_store(&ct, false).unwrap();
    for cell in 0..ct.cell_count() {
        let generated = engine::generate_arbor(&ct, cell, false).unwrap();
        let buffer = store.get(synarbor_storage::CellId::new(cell)).unwrap();
        let fetched = engine::fetch_arbor(&ct, cell, buffer).unwrap();
        let regenerated = engine::regenerate_arbor(&ct, cell, buffer).unwrap();
        assert_eq!(fetched.synapses, generated.synapses);
        assert_eq!(regenerated.synapses, generated.synapses);
        assert_eq!(fetched.skipped, generated.skipped);
    }
}
