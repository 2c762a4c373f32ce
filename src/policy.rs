//! Decides which signature slots a new document needs
use super::chain::{ApprovalChain, SignatureSlot};
use super::config::ApprovalConfig;
use super::error::ApprovalError;
use super::types::{DocumentKind, RoleTag, UserId};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SignatureRequirementPolicy {
    config: Arc<ApprovalConfig>,
}

impl SignatureRequirementPolicy {
    pub fn new(config: Arc<ApprovalConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ApprovalConfig {
        &self.config
    }

    /// Build the unsigned chain for a new document.
    ///
    /// `subset` selects roles out of the kind's canonical set; `None` means all
    /// of them. Roles always come out in canonical order whatever order the
    /// caller listed them in. A requirement whose `amount` exceeds the
    /// configured threshold always ends with a management slot.
    pub fn build_chain(
        &self,
        kind: DocumentKind,
        subset: Option<&[RoleTag]>,
        amount: Option<u64>,
        initiator: UserId,
    ) -> Result<ApprovalChain, ApprovalError> {
        let chain_config = self.config.chain(kind);

        let mut roles: Vec<RoleTag> = match subset {
            None => chain_config.roles.clone(),
            Some([]) => {
                return Err(ApprovalError::InvalidConfiguration(format!(
                    "empty signature subset for {kind}"
                )));
            }
            Some(subset) => {
                if let Some(unknown) = subset.iter().find(|r| chain_config.rank(**r).is_none()) {
                    return Err(ApprovalError::InvalidConfiguration(format!(
                        "role {unknown} is not part of the {kind} signature chain"
                    )));
                }
                chain_config
                    .roles
                    .iter()
                    .copied()
                    .filter(|role| subset.contains(role))
                    .collect()
            }
        };

        let special_condition = kind == DocumentKind::Requirement
            && amount.is_some_and(|amount| amount > self.config.amount_threshold);
        if special_condition && !roles.contains(&RoleTag::Management) {
            roles.push(RoleTag::Management);
        }

        let slots = roles
            .iter()
            .enumerate()
            .map(|(position, role)| -> Result<SignatureSlot, ApprovalError> {
                Ok(SignatureSlot::new(*role, chain_config.gate_for(position)?, None))
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            %kind,
            slots = slots.len(),
            special_condition,
            "built signature chain"
        );

        ApprovalChain::from_parts(kind, initiator, slots, special_condition)
    }
}
