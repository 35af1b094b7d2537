//! Property tests over randomly shaped connection types

use proptest::prelude::*;

use synarbor_core::{
    engine, round_cij, ConnectionType, PrimaryRule, Prng, SecondaryRule, Seed, Seeds,
    SourceGeometry, StrengthRule, StrengthSpec, SubarborMode, TargetGeometry,
};
use synarbor_storage::{CellId, ConnTypeId};

#[derive(Debug, Clone)]
struct Shape {
    source: (u32, u32, u32),
    target: (u32, u32, u32),
    nsa: u32,
    subarbors: u32,
    rules: usize,
    layout: usize,
    seed: i64,
}

fn arb_shape() -> impl Strategy<Value = Shape> {
    (
        (1u32..9, 1u32..9, 1u32..4),
        (1u32..5, 1u32..5, 1u32..3),
        1u32..6,
        1u32..4,
        0usize..7,
        0usize..4,
        any::<i64>(),
    )
        .prop_map(|(source, target, nsa, subarbors, rules, layout, seed)| Shape {
            source,
            target,
            nsa,
            subarbors,
            rules,
            layout,
            seed,
        })
}

fn rules(index: usize) -> (PrimaryRule, SecondaryRule) {
    match index {
        0 => (PrimaryRule::Diffuse, SecondaryRule::Independent),
        1 => (
            PrimaryRule::Uniform {
                wx: 3,
                wy: 3,
                ox: 0,
                oy: 0,
            },
            SecondaryRule::Independent,
        ),
        2 => (PrimaryRule::Topographic, SecondaryRule::Independent),
        3 => (
            PrimaryRule::Aligned { ox: 0, oy: 0 },
            SecondaryRule::Adjacent,
        ),
        4 => (
            PrimaryRule::Diffuse,
            SecondaryRule::CrowsFoot { rx: 1, ry: 2 },
        ),
        5 => (
            PrimaryRule::Hypergroup { hx: 2, hy: 2 },
            SecondaryRule::RandomBox { bx: 3, by: 2 },
        ),
        _ => (
            PrimaryRule::Systematic { stride: 5 },
            SecondaryRule::Annulus {
                outer_x: 2,
                outer_y: 2,
                inner_x: 0,
                inner_y: 0,
            },
        ),
    }
}

fn build(shape: &Shape) -> ConnectionType {
    let (primary, secondary) = rules(shape.rules);
    let nc = shape.nsa * shape.subarbors;
    let subarbor = match shape.layout {
        0 => SubarborMode::None,
        1 if secondary.is_anchored() => SubarborMode::Clone {
            nsa: shape.nsa,
            row_width: 2,
        },
        2 => SubarborMode::Independent { nsa: shape.nsa },
        3 => SubarborMode::Repeat { nsa: shape.nsa },
        _ => SubarborMode::None,
    };
    let (sx, sy, nel) = shape.source;
    let (tx, ty, cpg) = shape.target;
    ConnectionType::builder(
        ConnTypeId::new(1),
        SourceGeometry::new(sx, sy, nel),
        TargetGeometry::new(tx, ty, cpg),
        nc,
    )
    .with_primary(primary)
    .with_secondary(secondary)
    .with_subarbor(subarbor)
    .with_seeds(Seeds::new(shape.seed, shape.seed ^ 0x5555, shape.seed >> 3))
    .with_strength(StrengthSpec::new(
        StrengthRule::Random { mixed_sign: true },
        1.0,
        12,
        0.0,
    ))
    .build()
    .unwrap()
}

proptest! {
    #[test]
    fn prop_candidates_are_conserved(shape in arb_shape()) {
        let ct = build(&shape);
        for cell in 0..ct.cell_count() {
            let run = engine::generate_arbor(&ct, cell, true).unwrap();
            prop_assert_eq!(run.nuk() + run.skipped, ct.nc());
            let buffer = run.buffer.as_ref().unwrap();
            prop_assert!(buffer.is_complete());
            prop_assert_eq!(buffer.accepted(), run.nuk());
        }
    }

    #[test]
    fn prop_sources_stay_in_bounds(shape in arb_shape()) {
        let ct = build(&shape);
        for cell in 0..ct.cell_count() {
            let run = engine::generate_arbor(&ct, cell, false).unwrap();
            for synapse in &run.synapses {
                prop_assert!((synapse.lij as u64) < ct.source().size());
            }
        }
    }

    #[test]
    fn prop_regenerate_matches_generate(shape in arb_shape()) {
        let ct = build(&shape);
        let store = engine::generate_store(&ct, true).unwrap();
        for cell in 0..ct.cell_count() {
            let generated = engine::generate_arbor(&ct, cell, false).unwrap();
            let regenerated =
                engine::regenerate_arbor(&ct, cell, store.get(CellId::new(cell)).unwrap()).unwrap();
            prop_assert_eq!(regenerated.synapses, generated.synapses);
        }
    }

    #[test]
    fn prop_self_avoidance(nx in 1u32..6, ny in 1u32..6, nel in 1u32..3, seed in any::<i64>()) {
        let ct = ConnectionType::builder(
            ConnTypeId::new(2),
            SourceGeometry::new(nx, ny, nel),
            TargetGeometry::new(nx, ny, nel),
            6,
        )
        .with_same_layer(true)
        .with_self_avoidance(true)
        .with_seeds(Seeds::new(seed, 1, 1))
        .build()
        .unwrap();
        for cell in 0..ct.cell_count() {
            let run = engine::generate_arbor(&ct, cell, false).unwrap();
            prop_assert!(run.synapses.iter().all(|s| s.lij != cell));
        }
    }

    #[test]
    fn prop_rounding_saturates(value in any::<i64>(), nbc in 2u8..=16) {
        let max = (1u32 << 31) - (1u32 << (32 - nbc as u32));
        let cij = round_cij(value, nbc);
        prop_assert!(cij.magnitude() <= max);
        if value < 0 {
            prop_assert!(cij.is_negative());
        } else {
            prop_assert!(!cij.is_negative());
        }
        // The kept bits are exactly the top nbc.
        prop_assert_eq!(cij.magnitude() & ((1u32 << (32 - nbc as u32)) - 1), 0);
    }

    #[test]
    fn prop_skip_matches_stepping(raw in any::<i64>(), n in 0u64..200) {
        let seed = Seed::new(raw);
        let mut prng = Prng::new(seed);
        for _ in 0..n {
            prng.next_u31();
        }
        prop_assert_eq!(prng.seed(), seed.skip(n));
    }
}
