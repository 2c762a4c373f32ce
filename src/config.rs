//! Signature configuration loaded from TOML.
//!
//! ```toml
//! amount_threshold = 500000
//!
//! [requirement]
//! roles = ["requester", "technical-office", "administration", "management"]
//! signed_capabilities = ["requirement-view-signed1", "requirement-view-signed2", "requirement-view-signed3"]
//!
//! [quotation]
//! roles = ["requester", "logistics", "administration"]
//! signed_capabilities = ["quotation-view-signed1", "quotation-view-signed2"]
//! ```
use super::chain::SlotGate;
use super::error::ApprovalError;
use super::types::{DocumentKind, RoleTag};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

pub const MAX_SLOTS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalConfig {
    /// Requirements whose amount exceeds this value get a trailing management slot
    pub amount_threshold: u64,
    pub requirement: ChainConfig,
    pub quotation: ChainConfig,
}

/// Canonical role order and per-transition capabilities for one document kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub roles: Vec<RoleTag>,
    /// `signed_capabilities[n - 1]` gates the slot signed once `n` slots are filled
    pub signed_capabilities: Vec<String>,
}

impl ApprovalConfig {
    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        let config: ApprovalConfig =
            toml::from_str(s).context("failed to parse approval configuration")?;
        config.validate()?;

        debug!(
            amount_threshold = config.amount_threshold,
            requirement_roles = config.requirement.roles.len(),
            quotation_roles = config.quotation.roles.len(),
            "loaded approval configuration"
        );
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read approval config '{}'", path.display()))?;
        Self::from_toml_str(&contents)
    }

    pub fn chain(&self, kind: DocumentKind) -> &ChainConfig {
        match kind {
            DocumentKind::Requirement => &self.requirement,
            DocumentKind::Quotation => &self.quotation,
        }
    }

    pub fn validate(&self) -> Result<(), ApprovalError> {
        for kind in [DocumentKind::Requirement, DocumentKind::Quotation] {
            let chain = self.chain(kind);
            chain.validate(kind)?;

            let longest = self.longest_chain(kind);
            if longest > MAX_SLOTS {
                return Err(ApprovalError::InvalidConfiguration(format!(
                    "{kind} chains may reach {longest} slots, at most {MAX_SLOTS} are allowed"
                )));
            }
            if chain.signed_capabilities.len() < longest - 1 {
                return Err(ApprovalError::InvalidConfiguration(format!(
                    "{kind} needs {} signed capabilities, {} configured",
                    longest - 1,
                    chain.signed_capabilities.len()
                )));
            }
        }
        Ok(())
    }

    // the forced management slot counts towards requirement length
    fn longest_chain(&self, kind: DocumentKind) -> usize {
        let roles = &self.chain(kind).roles;
        match kind {
            DocumentKind::Requirement if !roles.contains(&RoleTag::Management) => roles.len() + 1,
            _ => roles.len(),
        }
    }
}

impl ChainConfig {
    fn validate(&self, kind: DocumentKind) -> Result<(), ApprovalError> {
        if self.roles.is_empty() {
            return Err(ApprovalError::InvalidConfiguration(format!(
                "{kind} has no canonical roles"
            )));
        }
        for (i, role) in self.roles.iter().enumerate() {
            if !kind.allowed_roles().contains(role) {
                return Err(ApprovalError::InvalidConfiguration(format!(
                    "role {role} cannot sign a {kind}"
                )));
            }
            if self.roles[..i].contains(role) {
                return Err(ApprovalError::InvalidConfiguration(format!(
                    "role {role} listed twice for {kind}"
                )));
            }
        }
        if self.signed_capabilities.iter().any(|c| c.trim().is_empty()) {
            return Err(ApprovalError::InvalidConfiguration(format!(
                "{kind} has a blank signed capability"
            )));
        }
        Ok(())
    }

    /// Position of `role` in canonical order
    pub fn rank(&self, role: RoleTag) -> Option<usize> {
        self.roles.iter().position(|r| *r == role)
    }

    /// How the slot at `position` is authorized.
    ///
    /// The first slot belongs to the document's initiator. Every later slot
    /// is gated by the capability keyed to how many slots precede it, not by
    /// the slot's own role.
    pub fn gate_for(&self, position: usize) -> Result<SlotGate, ApprovalError> {
        if position == 0 {
            return Ok(SlotGate::Initiator);
        }
        self.signed_capabilities
            .get(position - 1)
            .map(|capability| SlotGate::Capability(capability.clone()))
            .ok_or_else(|| {
                ApprovalError::InvalidConfiguration(format!(
                    "no capability configured for signing after {position} signatures"
                ))
            })
    }
}
