//! Stub Server
//!
//! The matching and bookkeeping core of an RPC test double. Tests register
//! stubs describing how to recognize a call and what to answer; the server
//! resolves each incoming call to at most one stub and records it so call
//! counts can be verified afterwards.
//!
//! # Features
//!
//! - **Exact Matching** (`equals`): payload must equal the configured mapping
//! - **Partial Matching** (`contains`): payload must contain the configured entries
//! - **Pattern Matching** (`matches`): field values checked against regular expressions
//! - **Failure Responses**: stubs can answer with an error message and/or status code
//! - **Call Verification**: every lookup is logged and counted per method
//!
//! # Example Configuration
//!
//! ```yaml
//! stubs:
//!   - service: Greeter
//!     method: sayHello
//!     input:
//!       equals:
//!         name: tokopedia
//!     output:
//!       data:
//!         message: "Hello Tokopedia"
//! ```

pub mod config;
pub mod error;
pub mod matcher;
pub mod requests;
pub mod server;
pub mod store;
pub mod stub;

pub use config::{StubDefinition, StubServerConfig};
pub use error::StubError;
pub use server::{StubServer, StubService};
pub use stub::{FindRequest, Output, Stub};
