//! Building multiblocks from construction parameters, dense legend patterns
//! and sparse block lists
//!
//! Dense JSON:
//!
//! ```json
//! {
//!   "pattern": [["###", "###", "###"], ["#0#", "# #", "###"]],
//!   "legend": {"#": "minecraft:stone", "0": {"type": "codex:any"}},
//!   "symmetrical": true
//! }
//! ```
//!
//! Layer 0 is the top layer. Within a layer each string is one x row and each
//! character one z column. `' '` leaves the cell empty, `'_'` means air and
//! `'0'` marks the cell that sits on the anchor.
//!
//! Sparse JSON:
//!
//! ```json
//! {"blocks": [{"x": 0, "y": 0, "z": 0, "matcher": "minecraft:stone"}]}
//! ```

use glam::IVec3;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::error::ParseError;
use crate::multiblock::multiblock::cell_key;
use crate::multiblock::{Multiblock, StateMatcher, MAX_DIMENSION, MAX_VOLUME};
use crate::world::{BlockState, ResourceId};

/// Symbol for an empty (don't care) cell
pub const EMPTY_SYMBOL: char = ' ';
/// Symbol for air
pub const AIR_SYMBOL: char = '_';
/// Symbol marking the anchor cell
pub const CENTER_SYMBOL: char = '0';

/// One occupied cell handed to [`build`]
#[derive(Debug, Clone)]
pub struct CellSpec {
    pub pos: IVec3,
    pub matcher: Arc<StateMatcher>,
    pub symbol: Option<char>,
}

impl CellSpec {
    pub fn new(pos: IVec3, matcher: Arc<StateMatcher>) -> Self {
        Self { pos, matcher, symbol: None }
    }
}

/// Everything needed to construct a [`Multiblock`]
#[derive(Debug, Clone)]
pub struct MultiblockParams {
    pub id: ResourceId,
    pub kind: ResourceId,
    pub size: IVec3,
    pub cells: Vec<CellSpec>,
    pub offset: IVec3,
    pub view_offset: IVec3,
    pub symmetrical: bool,
}

impl MultiblockParams {
    pub fn new(id: ResourceId, size: IVec3) -> Self {
        Self {
            id,
            kind: default_kind(),
            size,
            cells: Vec::new(),
            offset: IVec3::ZERO,
            view_offset: IVec3::ZERO,
            symmetrical: false,
        }
    }
}

pub(crate) fn default_kind() -> ResourceId {
    ResourceId::codex("multiblock")
}

/// Hands out one shared `Arc` per distinct matcher
#[derive(Debug, Default)]
pub struct MatcherInterner {
    seen: HashMap<StateMatcher, Arc<StateMatcher>>,
}

impl MatcherInterner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, matcher: StateMatcher) -> Arc<StateMatcher> {
        if let Some(shared) = self.seen.get(&matcher) {
            return Arc::clone(shared);
        }
        let shared = Arc::new(matcher.clone());
        self.seen.insert(matcher, Arc::clone(&shared));
        shared
    }

    /// Number of distinct matchers seen
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// The single construction path. Checks size limits, offsets, bounds and
/// duplicates.
pub fn build(params: MultiblockParams) -> Result<Multiblock, ParseError> {
    let size = params.size;
    if size.cmplt(IVec3::ZERO).any() || size.cmpgt(IVec3::splat(MAX_DIMENSION)).any() {
        return Err(ParseError::Size {
            size: size.to_array(),
            reason: format!("every dimension must be within 0..={}", MAX_DIMENSION),
        });
    }
    let volume = (size.x as usize) * (size.y as usize) * (size.z as usize);
    if volume > MAX_VOLUME {
        return Err(ParseError::Size {
            size: size.to_array(),
            reason: format!("{} cells exceeds the limit of {}", volume, MAX_VOLUME),
        });
    }

    check_offset("offset", params.offset)?;
    check_offset("view_offset", params.view_offset)?;

    let mut cells = BTreeMap::new();
    let mut symbols = BTreeMap::new();

    for cell in params.cells {
        let pos = cell.pos;
        if pos.cmplt(IVec3::ZERO).any() || pos.cmpge(size).any() {
            return Err(ParseError::Cell {
                pos: pos.to_array(),
                reason: format!("outside the size box {:?}", size.to_array()),
            });
        }
        let key = cell_key(pos);
        if cells.insert(key, cell.matcher).is_some() {
            return Err(ParseError::Cell {
                pos: pos.to_array(),
                reason: "defined more than once".to_string(),
            });
        }
        if let Some(symbol) = cell.symbol {
            symbols.insert(key, symbol);
        }
    }

    Ok(Multiblock {
        id: params.id,
        kind: params.kind,
        size,
        cells,
        symbols,
        offset: params.offset,
        view_offset: params.view_offset,
        symmetrical: params.symmetrical,
    })
}

fn check_offset(what: &'static str, offset: IVec3) -> Result<(), ParseError> {
    let limit = IVec3::splat(MAX_DIMENSION);
    if offset.cmplt(-limit).any() || offset.cmpgt(limit).any() {
        return Err(ParseError::Offset {
            what,
            offset: offset.to_array(),
            limit: MAX_DIMENSION,
        });
    }
    Ok(())
}

/// Cells and geometry extracted from a dense pattern
#[derive(Debug)]
pub struct DenseLayout {
    pub size: IVec3,
    pub cells: Vec<CellSpec>,
    /// Pattern position of the `'0'` marker, if present
    pub center: Option<IVec3>,
}

/// Resolve a dense pattern against its legend.
///
/// Every layer must have the same number of rows and every row the same
/// length; every symbol must resolve. Nothing is padded or skipped.
pub fn parse_dense(
    layers: &[Vec<String>],
    legend: &HashMap<char, Arc<StateMatcher>>,
) -> Result<DenseLayout, ParseError> {
    let height = layers.len();
    let rows = layers.first().map_or(0, Vec::len);
    let columns = layers
        .first()
        .and_then(|layer| layer.first())
        .map_or(0, |row| row.chars().count());

    let air = Arc::new(StateMatcher::exact(BlockState::air()));
    let mut cells = Vec::new();
    let mut center = None;

    for (layer_index, layer) in layers.iter().enumerate() {
        if layer.len() != rows {
            return Err(ParseError::structure(
                layer_index,
                None,
                format!("has {} rows, expected {}", layer.len(), rows),
            ));
        }

        let y = (height - 1 - layer_index) as i32;
        for (x, row) in layer.iter().enumerate() {
            let length = row.chars().count();
            if length != columns {
                return Err(ParseError::structure(
                    layer_index,
                    Some(x),
                    format!("has length {}, expected {}", length, columns),
                ));
            }

            for (z, symbol) in row.chars().enumerate() {
                let pos = IVec3::new(x as i32, y, z as i32);
                if symbol == CENTER_SYMBOL {
                    if center.is_some() {
                        return Err(ParseError::structure(
                            layer_index,
                            Some(x),
                            format!("second `{}` anchor marker", CENTER_SYMBOL),
                        ));
                    }
                    center = Some(pos);
                }

                let matcher = match legend.get(&symbol) {
                    Some(matcher) => Arc::clone(matcher),
                    None => match symbol {
                        EMPTY_SYMBOL | CENTER_SYMBOL => continue,
                        AIR_SYMBOL => Arc::clone(&air),
                        _ => {
                            return Err(ParseError::structure(
                                layer_index,
                                Some(x),
                                format!("symbol `{}` at column {} has no legend entry", symbol, z),
                            ))
                        }
                    },
                };
                cells.push(CellSpec {
                    pos,
                    matcher,
                    symbol: Some(symbol),
                });
            }
        }
    }

    Ok(DenseLayout {
        size: IVec3::new(rows as i32, height as i32, columns as i32),
        cells,
        center,
    })
}

/// Size of a sparse cell list: the bounding box from the origin, not from the
/// lowest entry. A list whose cells all sit at `y >= 3` still carries three
/// empty layers underneath.
pub fn sparse_size(cells: &[CellSpec]) -> IVec3 {
    cells
        .iter()
        .fold(IVec3::ZERO, |size, cell| size.max(cell.pos + IVec3::ONE))
}

#[derive(Debug, Deserialize)]
struct MultiblockJson {
    #[serde(rename = "type")]
    kind: Option<String>,
    pattern: Option<Vec<Vec<String>>>,
    #[serde(alias = "mapping")]
    legend: Option<Map<String, Value>>,
    blocks: Option<Vec<SparseBlockJson>>,
    #[serde(default)]
    symmetrical: bool,
    offset: Option<[i32; 3]>,
    view_offset: Option<[i32; 3]>,
}

#[derive(Debug, Deserialize)]
struct SparseBlockJson {
    x: i32,
    y: i32,
    z: i32,
    matcher: Value,
}

/// Parse a multiblock definition. `id` becomes its registry id.
pub fn from_json(id: ResourceId, json: &Value) -> Result<Multiblock, ParseError> {
    let raw = MultiblockJson::deserialize(json)
        .map_err(|e| ParseError::json(id.to_string(), e.to_string()))?;

    let kind = match &raw.kind {
        Some(kind) => ResourceId::parse(kind).map_err(|e| e.at(format!("{}.type", id)))?,
        None => default_kind(),
    };
    let mut interner = MatcherInterner::new();

    let (size, cells, center) = match (&raw.pattern, &raw.blocks) {
        (Some(pattern), None) => {
            let legend = parse_legend(&id, raw.legend.as_ref(), &mut interner)?;
            let layout = parse_dense(pattern, &legend)?;
            (layout.size, layout.cells, layout.center)
        }
        (None, Some(blocks)) => {
            let cells = parse_sparse(&id, blocks, &mut interner)?;
            (sparse_size(&cells), cells, None)
        }
        (Some(_), Some(_)) => {
            return Err(ParseError::json(
                id.to_string(),
                "use either `pattern` or `blocks`, not both",
            ));
        }
        (None, None) => {
            return Err(ParseError::json(
                id.to_string(),
                "expected a `pattern` with `legend`, or `blocks`",
            ));
        }
    };

    let offset = match (raw.offset, center) {
        (Some(offset), _) => IVec3::from_array(offset),
        (None, Some(center)) => -center,
        (None, None) => IVec3::ZERO,
    };

    build(MultiblockParams {
        id,
        kind,
        size,
        cells,
        offset,
        view_offset: raw.view_offset.map_or(IVec3::ZERO, IVec3::from_array),
        symmetrical: raw.symmetrical,
    })
}

fn parse_legend(
    id: &ResourceId,
    legend: Option<&Map<String, Value>>,
    interner: &mut MatcherInterner,
) -> Result<HashMap<char, Arc<StateMatcher>>, ParseError> {
    let mut resolved = HashMap::new();
    for (key, value) in legend.into_iter().flatten() {
        let location = format!("{}.legend.{}", id, key);
        let mut chars = key.chars();
        let (Some(symbol), None) = (chars.next(), chars.next()) else {
            return Err(ParseError::json(location, "legend keys must be a single character"));
        };
        let matcher = StateMatcher::from_json(value, &location)?;
        resolved.insert(symbol, interner.intern(matcher));
    }
    Ok(resolved)
}

fn parse_sparse(
    id: &ResourceId,
    blocks: &[SparseBlockJson],
    interner: &mut MatcherInterner,
) -> Result<Vec<CellSpec>, ParseError> {
    blocks
        .iter()
        .enumerate()
        .map(|(i, block)| {
            let pos = IVec3::new(block.x, block.y, block.z);
            if pos.cmplt(IVec3::ZERO).any() {
                return Err(ParseError::Cell {
                    pos: pos.to_array(),
                    reason: format!("{}.blocks[{}]: coordinates must not be negative", id, i),
                });
            }
            if pos.cmpge(IVec3::splat(MAX_DIMENSION)).any() {
                return Err(ParseError::Cell {
                    pos: pos.to_array(),
                    reason: format!(
                        "{}.blocks[{}]: coordinates must be below {}",
                        id, i, MAX_DIMENSION
                    ),
                });
            }
            let location = format!("{}.blocks[{}].matcher", id, i);
            let matcher = StateMatcher::from_json(&block.matcher, &location)?;
            Ok(CellSpec::new(pos, interner.intern(matcher)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn id(s: &str) -> ResourceId {
        ResourceId::parse(s).expect("valid id")
    }

    fn layers(raw: &[&[&str]]) -> Vec<Vec<String>> {
        raw.iter()
            .map(|layer| layer.iter().map(|row| row.to_string()).collect())
            .collect()
    }

    fn stone_legend() -> HashMap<char, Arc<StateMatcher>> {
        let stone = StateMatcher::exact(BlockState::parse("stone").expect("valid state"));
        HashMap::from([('#', Arc::new(stone))])
    }

    fn stone_pattern(raw: &[&[&str]]) -> Result<DenseLayout, ParseError> {
        parse_dense(&layers(raw), &stone_legend())
    }

    #[test]
    fn dense_layers_stack_top_down() {
        let layout = stone_pattern(&[&["#  "], &["  #"]]).expect("valid pattern");
        assert_eq!(layout.size, IVec3::new(1, 2, 3));
        let positions: Vec<_> = layout.cells.iter().map(|cell| cell.pos).collect();
        assert_eq!(positions, vec![IVec3::new(0, 1, 0), IVec3::new(0, 0, 2)]);
    }

    #[test]
    fn dense_builtins_and_center() {
        let layout = parse_dense(&layers(&[&["_0#"]]), &stone_legend()).expect("valid pattern");
        assert_eq!(layout.center, Some(IVec3::new(0, 0, 1)));
        assert_eq!(layout.cells.len(), 2);
        assert_eq!(layout.cells[0].symbol, Some('_'));
        assert!(layout.cells[0].matcher.display_state(0).is_air());
    }

    #[test]
    fn dense_rejects_ragged_rows_naming_layer_and_row() {
        let err = stone_pattern(&[&["###", "###"], &["###", "##"]]).expect_err("ragged");
        assert_eq!(
            err,
            ParseError::Structure {
                layer: 1,
                row: Some(1),
                reason: "has length 2, expected 3".to_string(),
            }
        );
    }

    #[test]
    fn dense_rejects_layers_with_different_row_counts() {
        let err = stone_pattern(&[&["#", "#"], &["#"]]).expect_err("short layer");
        assert!(matches!(err, ParseError::Structure { layer: 1, row: None, .. }));
    }

    #[test]
    fn dense_rejects_unknown_symbols() {
        let err = parse_dense(&layers(&[&["#X"]]), &stone_legend()).expect_err("unknown symbol");
        assert!(matches!(err, ParseError::Structure { layer: 0, row: Some(0), .. }));
        assert!(err.to_string().contains("`X`"));
    }

    #[test]
    fn dense_rejects_two_centers() {
        let err = stone_pattern(&[&["0"], &["0"]]).expect_err("two centers");
        assert!(matches!(err, ParseError::Structure { layer: 1, .. }));
    }

    #[test]
    fn legend_overrides_builtin_symbols() {
        let mut legend = stone_legend();
        legend.insert(' ', Arc::new(StateMatcher::Any));
        let layout = parse_dense(&layers(&[&["# "]]), &legend).expect("valid pattern");
        assert_eq!(layout.cells.len(), 2);
        assert!(layout.cells[1].matcher.is_any());
    }

    #[test]
    fn build_rejects_out_of_bounds_and_duplicates() {
        let stone = Arc::new(StateMatcher::exact(BlockState::parse("stone").expect("valid state")));

        let mut params = MultiblockParams::new(id("codex:test"), IVec3::ONE);
        params.cells.push(CellSpec::new(IVec3::X, Arc::clone(&stone)));
        assert!(matches!(build(params), Err(ParseError::Cell { .. })));

        let mut params = MultiblockParams::new(id("codex:test"), IVec3::ONE);
        params.cells.push(CellSpec::new(IVec3::ZERO, Arc::clone(&stone)));
        params.cells.push(CellSpec::new(IVec3::ZERO, stone));
        assert!(matches!(build(params), Err(ParseError::Cell { .. })));

        let params = MultiblockParams::new(id("codex:test"), IVec3::new(1, MAX_DIMENSION + 1, 1));
        assert!(matches!(build(params), Err(ParseError::Size { .. })));
    }

    #[test]
    fn interner_shares_equal_matchers() {
        let mut interner = MatcherInterner::new();
        let a = interner.intern(StateMatcher::Any);
        let b = interner.intern(StateMatcher::Any);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn json_dense_sets_offset_from_center() {
        let mb = from_json(
            id("codex:altar"),
            &json!({
                "pattern": [["###", "#0#", "###"]],
                "mapping": {"#": "stone"},
            }),
        )
        .expect("valid multiblock");
        assert_eq!(mb.size(), IVec3::new(3, 1, 3));
        assert_eq!(mb.offset(), IVec3::new(-1, 0, -1));
        assert_eq!(mb.cell_count(), 8);
        assert_eq!(mb.symbol_at(IVec3::ZERO), Some('#'));
    }

    #[test]
    fn json_explicit_offset_wins() {
        let mb = from_json(
            id("codex:altar"),
            &json!({
                "pattern": [["0"]],
                "legend": {},
                "offset": [2, 0, 2],
                "view_offset": [0, 1, 0],
            }),
        )
        .expect("valid multiblock");
        assert_eq!(mb.offset(), IVec3::new(2, 0, 2));
        assert_eq!(mb.view_offset(), IVec3::Y);
        assert_eq!(mb.cell_count(), 0);
    }

    #[test]
    fn json_sparse_size_is_bounding_box() {
        let mb = from_json(
            id("codex:pillar"),
            &json!({"blocks": [
                {"x": 0, "y": 0, "z": 0, "matcher": "stone"},
                {"x": 0, "y": 3, "z": 1, "matcher": {"type": "codex:any"}},
            ]}),
        )
        .expect("valid multiblock");
        assert_eq!(mb.size(), IVec3::new(1, 4, 2));
        assert_eq!(mb.cell_count(), 2);
        assert_eq!(mb.symbol_at(IVec3::ZERO), None);
    }

    #[test]
    fn json_shape_errors() {
        let both = json!({"pattern": [["#"]], "legend": {"#": "stone"}, "blocks": []});
        assert!(matches!(from_json(id("codex:x"), &both), Err(ParseError::Json { .. })));

        let neither = json!({"symmetrical": true});
        assert!(matches!(from_json(id("codex:x"), &neither), Err(ParseError::Json { .. })));

        let negative = json!({"blocks": [{"x": -1, "y": 0, "z": 0, "matcher": "stone"}]});
        assert!(matches!(from_json(id("codex:x"), &negative), Err(ParseError::Cell { .. })));

        let long_key = json!({"pattern": [["#"]], "legend": {"##": "stone"}});
        let err = from_json(id("codex:x"), &long_key).expect_err("bad legend key");
        assert!(err.to_string().contains("codex:x.legend.##"));
    }

    #[test]
    fn sparse_coordinates_past_the_dimension_limit_are_errors() {
        for x in [MAX_DIMENSION, i32::MAX] {
            let json = json!({"blocks": [{"x": x, "y": 0, "z": 0, "matcher": "stone"}]});
            let err = from_json(id("codex:far"), &json).expect_err("coordinate too large");
            assert!(matches!(err, ParseError::Cell { pos: [px, 0, 0], .. } if px == x));
        }

        let last = MAX_DIMENSION - 1;
        let edge = json!({"blocks": [{"x": last, "y": 0, "z": 0, "matcher": "stone"}]});
        let mb = from_json(id("codex:edge"), &edge).expect("last slot is fine");
        assert_eq!(mb.size(), IVec3::new(MAX_DIMENSION, 1, 1));
    }

    #[test]
    fn offsets_are_bounded() {
        let json = json!({
            "pattern": [["#"]],
            "legend": {"#": "stone"},
            "offset": [i32::MIN, 0, 0],
        });
        let err = from_json(id("codex:far"), &json).expect_err("offset out of range");
        assert!(matches!(err, ParseError::Offset { what: "offset", .. }));

        let json = json!({
            "pattern": [["#"]],
            "legend": {"#": "stone"},
            "view_offset": [0, MAX_DIMENSION + 1, 0],
        });
        let err = from_json(id("codex:far"), &json).expect_err("view offset out of range");
        assert!(matches!(err, ParseError::Offset { what: "view_offset", .. }));
    }

    #[test]
    fn offset_at_the_limit_validates_under_every_rotation() {
        let limit = MAX_DIMENSION;
        let mb = from_json(
            id("codex:edge"),
            &json!({"pattern": [["#"]], "legend": {"#": "stone"}, "offset": [-limit, 0, limit]}),
        )
        .expect("offset on the limit");
        let ctx = crate::multiblock::MatchContext::builtin();
        let world = crate::world::SparseWorld::new();
        for rotation in crate::world::Rotation::ALL {
            assert!(!mb.validate_rotation(&ctx, &world, crate::world::VoxelPos::ORIGIN, rotation));
        }
    }

    #[test]
    fn symbols_are_kept_only_for_dense_cells() {
        let ring = json!({"pattern": [["# #"]], "legend": {"#": "stone"}});
        let mb = from_json(id("codex:ring"), &ring).expect("valid multiblock");
        assert_eq!(mb.symbols.len(), 2);
        assert_eq!(mb.symbol_at(IVec3::new(0, 0, 1)), None);
    }

    #[test]
    fn bad_state_in_legend_reports_literal_and_location() {
        let json = json!({"pattern": [["#"]], "legend": {"#": "minecraft:stone[variant"}});
        match from_json(id("codex:broken"), &json) {
            Err(ParseError::BlockState { literal, location, .. }) => {
                assert_eq!(literal, "minecraft:stone[variant");
                assert_eq!(location, "codex:broken.legend.#");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
