//! Conformance test engine for DAB devices driven over an MQTT broker.
//!
//! The engine publishes JSON requests to `dab/<deviceId>/<operation>`,
//! correlates each response by its echoed request identifier, classifies
//! every exchange into a verdict, and assembles a batch report. The shipped
//! case catalog covers the mandatory operation set per protocol version,
//! the optional telemetry and voice operations, and a handful of negative
//! cases a conforming device must reject.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dab_tester::{AppConfig, CancelHandle, Correlator, Registry, Runner, Scope, SessionOptions};
//!
//! #[tokio::main]
//! async fn main() -> dab_tester::Result<()> {
//!     let config = AppConfig::default();
//!     let registry = Registry::standard(&config)?;
//!
//!     let cancel = CancelHandle::default();
//!     let options = SessionOptions::new("localhost", "living-room-tv");
//!     let correlator = Correlator::connect(options, cancel).await?;
//!
//!     let runner = Runner::new(correlator, registry, config);
//!     let report = runner.run(&Scope::All, None).await?;
//!     print!("{}", report.render_text());
//!
//!     runner.shutdown().await;
//!     std::process::exit(i32::from(report.has_failures()));
//! }
//! ```
//!
//! A single suite or hand-picked cases run the same way through
//! [`Scope::Suite`] and [`Scope::Cases`]; `Ctrl-C` style cancellation goes
//! through the [`CancelHandle`] handed to the correlator.

#![warn(clippy::pedantic)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

pub mod cancel;
mod cases;
pub mod classify;
pub mod config;
pub mod correlator;
pub mod device;
pub mod error;
pub mod registry;
pub mod report;
pub mod runner;
pub mod transport;
pub mod validate;

pub use cancel::CancelHandle;
pub use classify::{classify, CheckOutcome, Classification, Expectation, Verdict};
pub use config::{AppConfig, DEFAULT_STORE_URL};
pub use correlator::{Correlator, Exchange, ExchangeOutcome, SessionOptions};
pub use device::DeviceProfile;
pub use error::{DabError, Result};
pub use registry::{CaseBody, CaseContext, Precheck, Registry, Scope, ScriptHalt, TestCase};
pub use report::{BatchReport, ResultSummary, TestRun};
pub use runner::Runner;
pub use validate::{Finding, Severity};
