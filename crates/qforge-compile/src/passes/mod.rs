//! Built-in compilation passes.
//!
//! | Stage | Passes |
//! |-------|--------|
//! | compile | [`ValidateStructure`] |
//! | enrich | [`CheckGateVocabulary`], [`AddStandardInclude`] |
//! | postprocess | [`NormalizeIncludes`] |

mod gate_vocabulary;
mod normalize_includes;
mod standard_include;
mod validate;

pub use gate_vocabulary::CheckGateVocabulary;
pub use normalize_includes::NormalizeIncludes;
pub use standard_include::{AddStandardInclude, QELIB1_INC, STDGATES_INC};
pub use validate::ValidateStructure;
