// src/stages/mod.rs

//! One function per pipeline stage.
//!
//! Each function builds the full command line for its tool from typed
//! parameters, hands it to a [`CommandRunner`], and turns a non-zero exit
//! code into the matching [`StageError`](crate::errors::StageError).
//!
//! - [`convert`]: DICOM → NIfTI and NIfTI → DICOM (native converters).
//! - [`mask`]: segmentation masks (container).
//! - [`bias`]: bias-field correction (container). Not part of the default
//!   five-stage run; invoked separately.
//! - [`reconstruct`]: super-resolution volume reconstruction (container).
//! - [`toolset`]: tool locations and invocation prefixes.

use crate::exec::CommandRunner;
use crate::fs::FileSystem;

pub mod bias;
pub mod convert;
pub mod mask;
pub mod reconstruct;
pub mod toolset;

pub use bias::correct_bias_field;
pub use convert::{convert_to_dicom, convert_to_nifti};
pub use mask::generate_masks;
pub use reconstruct::{reconstruct_volume, ReconstructionParams};
pub use toolset::Toolset;

/// Everything a stage function needs besides its own parameters.
#[derive(Clone, Copy)]
pub struct StageEnv<'a> {
    pub runner: &'a dyn CommandRunner,
    pub fs: &'a dyn FileSystem,
    pub tools: &'a Toolset,
}
