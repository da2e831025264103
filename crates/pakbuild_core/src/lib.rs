//! Asset ownership, cook-exception and staging engine for preset-driven pak builds.
//!
//! Given a [`BuildConfig`](pakbuild_presets::BuildConfig), this crate decides
//! which cooked content files belong to which output package, rejects
//! ambiguous ownership, computes the directory exclusions handed to the
//! cooker, and drives per-preset staging and archive creation:
//!
//! - **Expansion**: `{name}` variables and `@alias` path lists ([`expand`])
//! - **Patterns**: bare names, directories and globs to files ([`pattern`])
//! - **Cook exceptions**: "never cook X except X/Y" to a flat list ([`cook::exceptions`])
//! - **Ownership**: include/shared/exclude rules per preset, conflicts ([`ownership`])
//! - **Staging**: access checks, build directories, overrides, packing ([`stage`])
//! - **Processes**: streamed external tools and error summaries ([`process`])
//!
//! # Example
//!
//! ```no_run
//! use camino::{Utf8Path, Utf8PathBuf};
//! use pakbuild_core::{pipeline, BuildContext, UnrealPak};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = pakbuild_presets::load_config(Utf8Path::new("build_presets.yaml"))?;
//! // Relative paths in the file are anchored at the working directory
//! let ctx = BuildContext::new(&config, Utf8PathBuf::from("."));
//! let packer = UnrealPak::from_context(&ctx);
//! let summary = pipeline::pack_all(&ctx, &config, &[], &packer)?;
//! println!("Packed {} preset(s)", summary.packed().count());
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod cook;
pub mod error;
pub mod expand;
pub mod ownership;
pub mod packer;
pub mod pattern;
pub mod pipeline;
pub mod process;
pub mod stage;
pub mod utils;

#[cfg(test)]
mod test_support;

// Re-export main types
pub use context::{BuildContext, DEFAULT_STAGING_NAME};
pub use cook::{cook_all, run_single_cook};
pub use error::{Error, Result};
pub use expand::Expander;
pub use ownership::{resolve_ownership, OwnershipResolution, ResolvedAssets, RuleKind};
pub use packer::{Packer, UnrealPak};
pub use pipeline::{pack_all, plan, PackSummary, PresetPlan, PresetSelection};
pub use stage::{stage_and_pack, PackOutcome};
