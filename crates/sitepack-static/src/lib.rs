//! Packaging for fixed multi-page sites.
//!
//! Compiles a set of HTML entry points into an output directory, stages
//! favicon and root files once the output is durably written, and verifies
//! the result is a non-empty directory.

pub mod assets;
pub mod builder;
pub mod hooks;
pub mod html;
pub mod output;
pub mod refs;
pub mod stager;
pub mod status;
pub mod verify;

pub use builder::{BuildConfig, BuildError, BuildResult, EntryPoint, SiteBuilder};
pub use hooks::{BuildHook, HookError, WriteComplete};
pub use stager::{StageConfig, StageError, StageReport, StaticAssetStager};
pub use verify::{inspect_output, OutputListing, VerifyError};
