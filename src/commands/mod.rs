// ABOUTME: Command module aggregator for the bitswan-gitops CLI.
// ABOUTME: Re-exports deploy, status, route and prune command handlers.

mod deploy;
mod prune;
mod route;
mod status;

pub use deploy::deploy;
pub use prune::prune;
pub use route::route;
pub use status::status;
