//! Ordered signature slots and the status derived from them
use super::config::MAX_SLOTS;
use super::error::ApprovalError;
use super::types::{DocumentKind, RoleTag, TimeStamp, UserId};
use chrono::Utc;
use std::fmt;

/// Who signed a slot and when. Both are set together or not at all.
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct Signature {
    #[n(0)]
    pub signed_by: UserId,
    #[n(1)]
    pub signed_at: TimeStamp<Utc>,
}

impl Signature {
    pub fn new(signed_by: UserId, signed_at: TimeStamp<Utc>) -> Self {
        Self {
            signed_by,
            signed_at,
        }
    }
}

/// Authorization rule for one slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotGate {
    /// Only the user who created the document
    Initiator,
    /// Any user holding the named capability
    Capability(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureSlot {
    role: RoleTag,
    gate: SlotGate,
    signature: Option<Signature>,
}

impl SignatureSlot {
    pub fn new(role: RoleTag, gate: SlotGate, signature: Option<Signature>) -> Self {
        Self {
            role,
            gate,
            signature,
        }
    }
    pub fn role(&self) -> RoleTag {
        self.role
    }
    pub fn gate(&self) -> &SlotGate {
        &self.gate
    }
    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }
    pub fn signed_by(&self) -> Option<&UserId> {
        self.signature.as_ref().map(|s| &s.signed_by)
    }
    pub fn signed_at(&self) -> Option<&TimeStamp<Utc>> {
        self.signature.as_ref().map(|s| &s.signed_at)
    }
    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }
}

/// Derived from how many slots are filled; never stored on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ChainStatus {
    Draft,
    Signed1,
    Signed2,
    Signed3,
    Approved,
}

impl ChainStatus {
    fn derive(filled: usize, len: usize) -> Self {
        match filled {
            n if n >= len => ChainStatus::Approved,
            0 => ChainStatus::Draft,
            1 => ChainStatus::Signed1,
            2 => ChainStatus::Signed2,
            _ => ChainStatus::Signed3,
        }
    }
}

impl fmt::Display for ChainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChainStatus::Draft => "draft",
            ChainStatus::Signed1 => "signed-1",
            ChainStatus::Signed2 => "signed-2",
            ChainStatus::Signed3 => "signed-3",
            ChainStatus::Approved => "approved",
        };
        f.write_str(label)
    }
}

/// The per-document approval chain.
///
/// Slots are filled strictly front to back. The composition (which roles, in
/// which order) is fixed when the chain is built; only signatures change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalChain {
    kind: DocumentKind,
    initiator: UserId,
    slots: Vec<SignatureSlot>,
    special_condition: bool,
}

impl ApprovalChain {
    /// Assemble a chain, rejecting anything a document of `kind` could not
    /// store: lengths outside 1..=4, repeated or foreign roles, signature gaps,
    /// and the over-threshold flag on kinds without a threshold.
    pub fn from_parts(
        kind: DocumentKind,
        initiator: UserId,
        slots: Vec<SignatureSlot>,
        special_condition: bool,
    ) -> Result<Self, ApprovalError> {
        if slots.is_empty() || slots.len() > MAX_SLOTS {
            return Err(ApprovalError::Inconsistent(format!(
                "{kind} chain has {} slots",
                slots.len()
            )));
        }
        if special_condition && kind != DocumentKind::Requirement {
            return Err(ApprovalError::Inconsistent(format!(
                "{kind} chain cannot be over threshold"
            )));
        }
        for (i, slot) in slots.iter().enumerate() {
            if !kind.allowed_roles().contains(&slot.role) {
                return Err(ApprovalError::Inconsistent(format!(
                    "{} is not a {kind} role",
                    slot.role
                )));
            }
            if slots[..i].iter().any(|earlier| earlier.role == slot.role) {
                return Err(ApprovalError::Inconsistent(format!(
                    "{kind} chain repeats the {} slot",
                    slot.role
                )));
            }
        }
        let filled = slots.iter().take_while(|slot| slot.is_signed()).count();
        if let Some(gap) = slots[filled..].iter().position(|slot| slot.is_signed()) {
            return Err(ApprovalError::Inconsistent(format!(
                "slot {} is signed while slot {filled} is not",
                filled + gap
            )));
        }

        Ok(Self {
            kind,
            initiator,
            slots,
            special_condition,
        })
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }
    pub fn initiator(&self) -> &UserId {
        &self.initiator
    }
    pub fn slots(&self) -> &[SignatureSlot] {
        &self.slots
    }
    pub fn special_condition(&self) -> bool {
        self.special_condition
    }
    pub fn roles(&self) -> impl Iterator<Item = RoleTag> + '_ {
        self.slots.iter().map(|slot| slot.role)
    }
    pub fn filled_count(&self) -> usize {
        // slots are a signed prefix followed by unsigned ones
        self.slots.iter().take_while(|slot| slot.is_signed()).count()
    }
    pub fn next_slot_index(&self) -> Option<usize> {
        let filled = self.filled_count();
        (filled < self.slots.len()).then_some(filled)
    }
    pub fn next_slot(&self) -> Option<&SignatureSlot> {
        self.next_slot_index().map(|i| &self.slots[i])
    }
    pub fn is_terminal(&self) -> bool {
        self.next_slot_index().is_none()
    }
    pub fn status(&self) -> ChainStatus {
        ChainStatus::derive(self.filled_count(), self.slots.len())
    }

    /// Label for the sign action, e.g. "Sign (2nd Signature)"
    pub fn signature_label(&self) -> Option<String> {
        self.next_slot_index()
            .map(|i| format!("Sign ({} Signature)", ordinal(i + 1)))
    }

    // caller has already checked `index` is the next unsigned slot
    pub(crate) fn fill(&mut self, index: usize, signature: Signature) {
        debug_assert_eq!(self.next_slot_index(), Some(index));
        self.slots[index].signature = Some(signature);
    }
}

fn ordinal(n: usize) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(role: RoleTag, signer: Option<&str>) -> SignatureSlot {
        SignatureSlot::new(
            role,
            SlotGate::Initiator,
            signer.map(|s| Signature::new(UserId::from(s), TimeStamp::new())),
        )
    }

    #[test]
    fn status_follows_filled_prefix() {
        let chain = ApprovalChain::from_parts(
            DocumentKind::Requirement,
            UserId::from("user_a"),
            vec![
                slot(RoleTag::Requester, Some("user_a")),
                slot(RoleTag::Administration, Some("user_b")),
                slot(RoleTag::Management, None),
            ],
            true,
        )
        .unwrap();

        assert_eq!(chain.filled_count(), 2);
        assert_eq!(chain.next_slot_index(), Some(2));
        assert_eq!(chain.status(), ChainStatus::Signed2);
        assert_eq!(chain.signature_label().as_deref(), Some("Sign (3rd Signature)"));
        assert!(!chain.is_terminal());
    }

    #[test]
    fn single_slot_chain_goes_straight_to_approved() {
        let draft = ApprovalChain::from_parts(
            DocumentKind::Quotation,
            UserId::from("user_a"),
            vec![slot(RoleTag::Requester, None)],
            false,
        )
        .unwrap();
        assert_eq!(draft.status(), ChainStatus::Draft);
        assert_eq!(draft.signature_label().as_deref(), Some("Sign (1st Signature)"));

        let signed = ApprovalChain::from_parts(
            DocumentKind::Quotation,
            UserId::from("user_a"),
            vec![slot(RoleTag::Requester, Some("user_a"))],
            false,
        )
        .unwrap();
        assert_eq!(signed.status(), ChainStatus::Approved);
        assert!(signed.is_terminal());
        assert_eq!(signed.signature_label(), None);
    }

    #[test]
    fn rejects_signature_gap() {
        let result = ApprovalChain::from_parts(
            DocumentKind::Requirement,
            UserId::from("user_a"),
            vec![
                slot(RoleTag::Requester, Some("user_a")),
                slot(RoleTag::TechnicalOffice, None),
                slot(RoleTag::Administration, Some("user_c")),
            ],
            false,
        );
        assert!(matches!(result, Err(ApprovalError::Inconsistent(_))));
    }

    #[test]
    fn rejects_empty_and_oversized_chains() {
        let initiator = UserId::from("user_a");
        assert!(
            ApprovalChain::from_parts(DocumentKind::Requirement, initiator.clone(), vec![], false)
                .is_err()
        );

        let five = vec![slot(RoleTag::Requester, None); 5];
        assert!(ApprovalChain::from_parts(DocumentKind::Requirement, initiator, five, false).is_err());
    }

    #[test]
    fn rejects_repeated_role() {
        let result = ApprovalChain::from_parts(
            DocumentKind::Requirement,
            UserId::from("user_a"),
            vec![
                slot(RoleTag::Requester, Some("user_a")),
                slot(RoleTag::Requester, None),
            ],
            false,
        );
        assert!(matches!(result, Err(ApprovalError::Inconsistent(_))));
    }

    #[test]
    fn rejects_role_of_other_kind() {
        let result = ApprovalChain::from_parts(
            DocumentKind::Quotation,
            UserId::from("user_a"),
            vec![
                slot(RoleTag::Requester, None),
                slot(RoleTag::TechnicalOffice, None),
            ],
            false,
        );
        assert!(matches!(result, Err(ApprovalError::Inconsistent(_))));
    }

    #[test]
    fn only_requirements_carry_the_threshold_flag() {
        let quotation = ApprovalChain::from_parts(
            DocumentKind::Quotation,
            UserId::from("user_a"),
            vec![slot(RoleTag::Requester, None)],
            true,
        );
        assert!(matches!(quotation, Err(ApprovalError::Inconsistent(_))));

        let requirement = ApprovalChain::from_parts(
            DocumentKind::Requirement,
            UserId::from("user_a"),
            vec![slot(RoleTag::Requester, None)],
            true,
        );
        assert!(requirement.is_ok());
    }

    #[test]
    fn ordinals() {
        assert_eq!(ordinal(1), "1st");
        assert_eq!(ordinal(2), "2nd");
        assert_eq!(ordinal(3), "3rd");
        assert_eq!(ordinal(4), "4th");
        assert_eq!(ordinal(12), "12th");
    }
}
