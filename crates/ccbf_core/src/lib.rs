pub mod consts;
pub mod errors;
pub mod hash;
pub mod params;
pub mod filter;
pub mod codec;
pub mod spell;

pub use errors::{CcbfError, Result};
pub use filter::Bloom;
pub use params::FilterParams;
pub use codec::FilterHeader;
pub use spell::{build_filter, build_filter_file, check_words, load_filter, load_filter_file, read_words, BuildReport, WordCheck};
