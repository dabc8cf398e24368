//! Language resolution.
//!
//! Given an ordered candidate list, the resolver:
//!
//! 1. Loads the first shipped default bundle through a [`BundleLoader`]
//! 2. Requests every region-qualified candidate's override bundle through the
//!    resource pool, concurrently with step 1
//! 3. Overlays overrides onto the defaults, most specific override last
//!
//! A query with no shipped bundle among its candidates resolves to `None`.

mod candidates;
mod loader;
mod query;
mod resolver;

pub use candidates::{
    base_language, candidate_languages, is_region_qualified, normalize_candidates, normalize_tag,
    REGION_TAG_MIN_LEN, TERMINAL_LANGUAGES,
};
pub use loader::{BundleLoader, DirectoryBundleLoader, LoadError, StaticBundleLoader};
pub use query::{BundleFormatter, LanguageFilter, ResourceQuery};
pub use resolver::{merge_resources, override_path, LanguageResolver};
