//! tally-core: task list state machine, persistence contract, and the pure
//! half of the AI suggestion layer.

pub mod store;
pub mod suggest;
pub mod task;

pub use store::{CategoryOutcome, Storage, TaskStore};
pub use suggest::{
    FALLBACK_CATEGORY, MAX_CATEGORY_CANDIDATES, SUGGESTION_COUNT, category_candidates_prompt,
    category_prompt, parse_string_array, sanitize_category, suggestion_prompt,
};
pub use task::{Filter, Task, Theme};
