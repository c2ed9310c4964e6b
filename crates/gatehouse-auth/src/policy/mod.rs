//! Authorization policies.
//!
//! - [`OwnershipPolicy`]: owners may always act on their resources; everyone
//!   else needs a role at least as privileged as the one the route requires.

mod ownership;

pub use ownership::OwnershipPolicy;
