//! Dynamic version strings from version control tags.
//!
//! Dunamai reads the most recent version tag reachable from the current
//! commit, counts the commits made since, and renders the result in a
//! versioning style such as PEP 440, Semantic Versioning or PVP.
//!
//! ```no_run
//! use dunamai::{SerializeOptions, Style, Vcs, VcsOptions, Version};
//!
//! # fn main() -> dunamai::Result<()> {
//! let version = Version::from_vcs(Vcs::Any, &VcsOptions::default(), ".".as_ref())?;
//! println!("{}", version.serialize(&SerializeOptions::with_style(Style::SemVer))?);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod concern;
pub mod config;
pub mod domain;
pub mod error;
pub mod fallback;
pub mod pattern;
pub mod serialize;
pub mod style;
pub mod ui;
pub mod vcs;

pub use concern::Concern;
pub use domain::{bump_version, Bump, Stage, Version};
pub use error::{DunamaiError, Result};
pub use fallback::VersionLookup;
pub use pattern::{Pattern, DEFAULT_PATTERN};
pub use serialize::{serialize_pep440, serialize_pvp, serialize_semver, Pep440Parts, SerializeOptions};
pub use style::{check_version, Style};
pub use vcs::{from_any_vcs, from_vcs, Vcs, VcsOptions};
