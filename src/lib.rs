// ============================================================================
// Linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![warn(missing_docs)]                // Public items should be documented
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # DWS Deploy
//!
//! Create and delete GPU instances and CPU deployments on a cloud provider
//! whose API authenticates every request with an AWS Signature V4 style
//! signature.
//!
//! ## Overview
//!
//! Each command is a single short-lived invocation:
//!
//! 1. **Sign**: every request is signed with the configured key pair, or with
//!    a fixed anonymous identity when no key pair is configured
//! 2. **Call**: create, get or delete the resource
//! 3. **Poll**: GPU instances provision asynchronously, so the create waits
//!    until the instance reports `running`, a terminal status, or the attempt
//!    budget runs out
//! 4. **Report**: the outcome is written to a `key=value` result file that the
//!    calling automation reads back
//!
//! ## Modules
//!
//! - [`config`]: Credentials, client settings and request bodies
//! - [`dws`]: Request signing, API client and provisioning poll
//! - [`report`]: Outcomes and the result file
//! - [`deployer`]: Command runner tying the above together
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```text
//! deploy gpu create --name RTX_2080 --ssh-key "ssh-ed25519 AAAA..."
//! cat result
//! uuid=3f1c...
//! host=ssh.example.com
//! port=40022
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod deployer;
pub mod dws;
pub mod error;
pub mod report;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ClientConfig, ConfigValidator, Credentials, DeploymentConfig, GpuConfig, PollPolicy};
pub use deployer::{CommandResult, Deployer};
pub use dws::{DwsClient, ProvisioningPoller, RequestSigner, ResourceKind};
pub use error::{DeployError, Result};
pub use report::{Outcome, ResultReporter};
