pub mod builder;
pub mod lookup;
pub mod matcher;
#[allow(clippy::module_inception)]
pub mod multiblock;
pub mod registry;

pub use builder::{
    build, from_json, parse_dense, CellSpec, DenseLayout, MatcherInterner, MultiblockParams,
};
pub use lookup::{
    BlockPredicate, MatchContext, PredicateLookup, PredicateRegistry, PredicateResolver, TagLookup,
    TagRegistry,
};
pub use matcher::{StateMatcher, ANY_TYPE, EXACT_STATE_TYPE, PREDICATE_TYPE, TAG_TYPE};
pub use multiblock::{Multiblock, SimulateResult, DEFAULT_KIND, MAX_DIMENSION, MAX_VOLUME};
pub use registry::MultiblockRegistry;
