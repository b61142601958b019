//! Vitrina: browser end-to-end testing harness for a storefront
//!
//! Vitrina (Spanish: "shop window") drives an e-commerce storefront through
//! page models over an abstract automation capability, with a hardened
//! session core: a readiness prober for freshly navigated pages, a price
//! stabilization poller for asynchronously updating displays, and a
//! fixture lifecycle that captures a screenshot and trace for every failed
//! test.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  scenarios (tests/)                                          │
//! │     │                                                        │
//! │  page models (pages/)          session core                  │
//! │     │                  readiness · poll · wait · session     │
//! │     └───────────────► Automation capability ◄────────────────│
//! │                        │                    │                │
//! │                  CdpAutomation       ScriptedAutomation      │
//! │                  (feature "browser")   (unit tests)          │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The default build has no browser dependency at all; everything above the
//! capability seam is exercised against the scripted double with a paused
//! tokio clock.

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::float_cmp))]

pub mod artifacts;
pub mod capability;
pub mod config;
pub mod credentials;
pub mod locator;
pub mod mock;
pub mod pages;
pub mod poll;
pub mod readiness;
pub mod result;
pub mod session;
pub mod wait;

#[cfg(feature = "browser")]
pub mod cdp;

pub use artifacts::{ArtifactPaths, ArtifactRecord};
pub use capability::{Automation, LoadCondition, WaitState};
pub use config::{BrowserKind, EnvOverrides, RunConfiguration, Viewport};
pub use credentials::{CredentialStore, Credentials};
pub use locator::{ElementQuery, Refinement};
pub use poll::{await_stable_price, parse_price};
pub use readiness::{ReadinessProber, ReadinessTimeouts};
pub use result::{VitrinaError, VitrinaResult};
pub use session::{Engine, RunContext, Session, TestOutcome};
pub use wait::{first_of, quickly_visible, WaitGoal};

#[cfg(feature = "browser")]
pub use cdp::ChromiumEngine;
