// handlers/mod.rs - two handler tiers
//
// Public (no auth) → Protected (bearer auth via middleware::require_user)
pub mod public;
pub mod protected;
