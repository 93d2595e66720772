// Multiblock matching integration tests
//
// Drives authoring JSON through detection, placement and the lazy predicate
// binding using only the public API.

use std::sync::Arc;

use codex_engine::multiblock::from_json;
use codex_engine::{
    BlockState, BlockWorld, LookupError, MatchContext, Multiblock, PredicateRegistry, ResourceId,
    Rotation, SparseWorld, StateMatcher, TagRegistry, VoxelPos,
};
use serde_json::json;

fn id(s: &str) -> ResourceId {
    ResourceId::parse(s).expect("valid id")
}

fn state(s: &str) -> BlockState {
    BlockState::parse(s).expect("valid state")
}

fn multiblock(name: &str, json: serde_json::Value) -> Multiblock {
    from_json(id(name), &json).expect("valid multiblock")
}

#[test]
fn single_exact_cell_matches_only_its_state() {
    let mb = multiblock(
        "codex:lamp",
        json!({"blocks": [{"x": 0, "y": 0, "z": 0, "matcher": "redstone_lamp[lit=true]"}]}),
    );
    let ctx = MatchContext::builtin();
    let pos = VoxelPos::new(12, 70, -5);
    let mut world = SparseWorld::new();

    assert_eq!(mb.validate(&ctx, &world, pos), None);

    for other in ["redstone_lamp[lit=false]", "redstone_lamp", "stone", "air"] {
        world.set_state(pos, state(other));
        assert!(!mb.validate_rotation(&ctx, &world, pos, Rotation::None), "{} matched", other);
    }

    world.set_state(pos, state("redstone_lamp[lit=true]"));
    assert!(mb.validate_rotation(&ctx, &world, pos, Rotation::None));
    assert!(mb.validate(&ctx, &world, pos).is_some());
}

#[test]
fn symmetrical_stone_square_validates_from_its_center() {
    let mb = multiblock(
        "codex:slab",
        json!({
            "pattern": [["###", "#0#", "###"]],
            "legend": {"#": "stone", "0": "stone"},
            "symmetrical": true,
        }),
    );
    let ctx = MatchContext::builtin();
    let center = VoxelPos::new(0, 64, 0);

    for rotation in Rotation::ALL {
        let mut world = SparseWorld::new();
        mb.place(&mut world, center, rotation);
        assert_eq!(world.len(), 9);
        assert_eq!(
            mb.validate(&ctx, &world, center),
            Some(Rotation::None),
            "placed at {}",
            rotation
        );
    }
}

#[test]
fn asymmetric_structure_reports_its_rotation() {
    let mb = multiblock(
        "codex:forge",
        json!({
            "pattern": [["A0F"]],
            "legend": {"A": "anvil[facing=north]", "0": "iron_block", "F": "furnace[facing=north]"},
        }),
    );
    let ctx = MatchContext::builtin();
    let anchor = VoxelPos::new(3, 10, 3);

    for rotation in Rotation::ALL {
        let mut world = SparseWorld::new();
        mb.place(&mut world, anchor, rotation);
        assert_eq!(mb.validate(&ctx, &world, anchor), Some(rotation));
        // validate never mutates the world, so asking again gives the same answer
        assert_eq!(mb.validate(&ctx, &world, anchor), Some(rotation));
    }
}

#[test]
fn every_rotation_simulates_every_cell_once() {
    let mb = multiblock(
        "codex:stairs",
        json!({
            "pattern": [["  S", "  S"], [" SS", " SS"], ["SSS", "SSS"]],
            "legend": {"S": "cobblestone"},
            "offset": [-1, 0, -1],
            "view_offset": [0, 1, 0],
        }),
    );
    assert_eq!(mb.cell_count(), 12);

    for rotation in Rotation::ALL {
        for for_view in [false, true] {
            let (_, results) = mb.simulate(VoxelPos::new(-7, 0, 9), rotation, for_view);
            let mut positions: Vec<_> = results.iter().map(|r| r.world_position()).collect();
            positions.sort_by_key(|p| (p.x, p.y, p.z));
            positions.dedup();
            assert_eq!(positions.len(), mb.cell_count());
        }
    }
}

#[test]
fn fine_grained_test_highlights_the_missing_block() {
    let mb = multiblock(
        "codex:pylon",
        json!({"pattern": [["G"], ["G"], ["0"]], "legend": {"G": "glass", "0": "beacon"}}),
    );
    let ctx = MatchContext::builtin();
    let anchor = VoxelPos::new(0, 0, 0);
    let mut world = SparseWorld::new();
    mb.place(&mut world, anchor, Rotation::Clockwise90);

    let (_, results) = mb.simulate(anchor, Rotation::Clockwise90, false);
    let missing = results.last().expect("three cells").world_position();
    world.set_state(missing, BlockState::air());

    let failing: Vec<_> = (0..3)
        .filter(|&y| !mb.test(&ctx, &world, anchor, 0, y, 0, Rotation::Clockwise90))
        .collect();
    assert_eq!(failing, vec![2]);
    assert_eq!(mb.validate(&ctx, &world, anchor), None);
}

#[test]
fn unregistered_predicate_fails_only_when_queried() {
    let json = json!({"blocks": [{"x": 0, "y": 0, "z": 0, "matcher":
        {"type": "codex:predicate", "display": "glowstone", "predicate": "othermod:glowing"}}]});

    // parsing succeeds even though nothing provides the predicate yet
    let mb = multiblock("codex:beacon_base", json.clone());
    let matcher = mb.matcher_at(glam::IVec3::ZERO).expect("occupied");

    let world = SparseWorld::new();
    let observed = state("glowstone");
    let ctx = MatchContext::builtin();
    assert_eq!(
        matcher.try_matches(&ctx, &world, VoxelPos::ORIGIN, &observed),
        Err(LookupError::Predicate(id("othermod:glowing")))
    );
    assert!(!matcher.matches(&ctx, &world, VoxelPos::ORIGIN, &observed));

    // the next data generation has it registered
    let mut predicates = PredicateRegistry::with_builtins();
    predicates.register(id("othermod:glowing"), |_, _, state| state.block().path() == "glowstone");
    let ctx = MatchContext::new(Arc::new(predicates), Arc::new(TagRegistry::new()));
    let fresh = multiblock("codex:beacon_base", json);
    let matcher = fresh.matcher_at(glam::IVec3::ZERO).expect("occupied");
    assert_eq!(matcher.try_matches(&ctx, &world, VoxelPos::ORIGIN, &observed), Ok(true));
}

#[test]
fn unknown_tag_degrades_to_no_match() {
    let mb = multiblock(
        "codex:woodpile",
        json!({"blocks": [{"x": 0, "y": 0, "z": 0, "matcher":
            {"type": "codex:tag", "display": "oak_log", "tag": "minecraft:logs"}}]}),
    );
    let mut world = SparseWorld::new();
    world.set_state(VoxelPos::ORIGIN, state("oak_log"));

    let ctx = MatchContext::builtin();
    assert_eq!(mb.validate(&ctx, &world, VoxelPos::ORIGIN), None);

    let matcher = mb.matcher_at(glam::IVec3::ZERO).expect("occupied");
    assert!(matches!(
        matcher.try_matches(&ctx, &world, VoxelPos::ORIGIN, &state("oak_log")),
        Err(LookupError::Tag(_))
    ));

    let mut tags = TagRegistry::new();
    tags.extend(id("minecraft:logs"), [id("oak_log")]);
    let ctx = MatchContext::new(Arc::new(PredicateRegistry::with_builtins()), Arc::new(tags));
    assert_eq!(mb.validate(&ctx, &world, VoxelPos::ORIGIN), Some(Rotation::None));
}

#[test]
fn preview_shows_rotated_display_states() {
    let mb = multiblock(
        "codex:kiln",
        json!({
            "pattern": [["0F"]],
            "legend": {"0": {"type": "codex:any"}, "F": "furnace[facing=north]"},
            "view_offset": [0, 2, 0],
        }),
    );
    let ghosts = mb.preview(VoxelPos::ORIGIN, Rotation::Clockwise90, 0);
    assert_eq!(ghosts, vec![(VoxelPos::new(-1, 2, 0), state("furnace[facing=east]"))]);
    assert!(matches!(mb.matcher_at(glam::IVec3::ZERO), Some(StateMatcher::Any)));
}
