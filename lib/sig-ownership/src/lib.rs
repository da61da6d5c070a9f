//! Resolve which SIG owns a repository and who in it should greet newcomers.

pub mod documents;
pub mod owners;
pub mod pattern;
pub mod platform;
pub mod sigs;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use owners::{
    OwnerResolution, OwnershipError, OwnershipPolicy, OwnershipResolver, OwnershipResult,
    PathRules, ResolvedOwners,
};
pub use platform::{Collaborator, GovernancePlatform, PlatformError, PlatformResult};
pub use sigs::{GovernanceRepo, SigCache, SigError, SigResolver, SigResult};
