//! Output generation.
//!
//! # Submodules
//!
//! - [`json`]: Writes batch results and error buckets to JSON files
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── www.dw.com-en-3f1c…-success.json
//! └── www.dw.com-en-3f1c…-error.json
//! ```

pub mod json;
