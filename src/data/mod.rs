pub mod errors;
pub mod loader;

pub use errors::LoadErrors;
pub use loader::{self_check, MultiblockDataManager};
