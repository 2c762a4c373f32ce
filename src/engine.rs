//! Approval state machine.
//!
//! The engine decides over an in-memory chain snapshot and never performs I/O.
//! Loading, persisting and the conditional write that settles races between
//! signers live in [`crate::service`].
use super::chain::{ApprovalChain, Signature, SignatureSlot, SlotGate};
use super::error::ApprovalError;
use super::permission::PermissionOracle;
use super::types::{TimeStamp, UserId};
use tracing::{debug, info, warn};

pub struct ApprovalStateMachine<O> {
    oracle: O,
}

impl<O: PermissionOracle> ApprovalStateMachine<O> {
    pub fn new(oracle: O) -> Self {
        Self { oracle }
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// True iff the chain has a next slot and `user` may fill it
    pub fn can_advance(&self, user: &UserId, chain: &ApprovalChain) -> bool {
        chain
            .next_slot()
            .is_some_and(|slot| self.may_sign(user, chain, slot))
    }

    /// Sign the next unsigned slot
    pub fn record_signature(
        &self,
        user: &UserId,
        chain: &ApprovalChain,
    ) -> Result<ApprovalChain, ApprovalError> {
        let target = chain.next_slot_index().ok_or(ApprovalError::AlreadyTerminal)?;
        self.record_signature_at(user, chain, target)
    }

    /// Sign slot `target`, which must still be the next unsigned slot.
    ///
    /// A target behind the chain's progress means someone else signed first
    /// and is reported as `OutOfOrder`, even when the chain is now complete.
    pub fn record_signature_at(
        &self,
        user: &UserId,
        chain: &ApprovalChain,
        target: usize,
    ) -> Result<ApprovalChain, ApprovalError> {
        let next = chain.next_slot_index();
        match next {
            None if target >= chain.slots().len() => return Err(ApprovalError::AlreadyTerminal),
            Some(next) if next == target => {}
            _ => {
                warn!(
                    user = %user,
                    expected = ?next,
                    attempted = target,
                    "signature targets a slot that is not next"
                );
                return Err(ApprovalError::OutOfOrder {
                    expected: next,
                    attempted: target,
                });
            }
        }

        let slot = &chain.slots()[target];
        if !self.may_sign(user, chain, slot) {
            warn!(
                user = %user,
                slot = target,
                role = %slot.role(),
                "user is not authorized to sign"
            );
            return Err(ApprovalError::NotAuthorized {
                user: user.clone(),
                slot: target,
                role: slot.role(),
            });
        }

        let mut signed = chain.clone();
        signed.fill(target, Signature::new(user.clone(), TimeStamp::new()));

        info!(
            kind = %signed.kind(),
            user = %user,
            slot = target,
            status = %signed.status(),
            "signature recorded"
        );
        Ok(signed)
    }

    fn may_sign(&self, user: &UserId, chain: &ApprovalChain, slot: &SignatureSlot) -> bool {
        let allowed = match slot.gate() {
            SlotGate::Initiator => chain.initiator() == user,
            SlotGate::Capability(capability) => self.oracle.has_capability(user, capability),
        };
        debug!(user = %user, role = %slot.role(), allowed, "checked signing gate");
        allowed
    }
}
