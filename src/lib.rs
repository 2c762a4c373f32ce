//! Sequential multi-party signature workflow for requirements and quotation requests.
//!
//! A document carries an [`chain::ApprovalChain`]: one to four role slots that
//! must be signed strictly in order. [`policy::SignatureRequirementPolicy`]
//! decides which slots a new document gets, [`engine::ApprovalStateMachine`]
//! decides who may sign next, [`adapter::DocumentAdapter`] maps concrete
//! documents onto chains and [`service::ApprovalService`] persists them in sled.

pub mod adapter;
pub mod chain;
pub mod config;
pub mod engine;
pub mod error;
pub mod permission;
pub mod policy;
pub mod service;
pub mod types;
pub mod utils;
