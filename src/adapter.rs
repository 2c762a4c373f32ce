//! Mapping between concrete documents and the generic slot model.
//!
//! Each document kind keeps one signature field per role plus its own status
//! enum. An adapter reads those fields into an [`ApprovalChain`] and writes a
//! chain back, so that `read_chain(write_chain(chain)) == chain`.
use super::chain::{ApprovalChain, ChainStatus, Signature, SignatureSlot};
use super::config::ApprovalConfig;
use super::error::ApprovalError;
use super::types::{DocumentKind, RoleTag, UserId};
use std::sync::Arc;

pub trait DocumentAdapter {
    type Document: minicbor::Encode<()> + for<'b> minicbor::Decode<'b, ()>;

    fn kind(&self) -> DocumentKind;
    fn document_id<'a>(&self, document: &'a Self::Document) -> &'a str;
    /// The creator, who alone may fill the first slot
    fn initiator<'a>(&self, document: &'a Self::Document) -> &'a UserId;
    /// Amount checked against the configured threshold, if the kind has one
    fn amount(&self, document: &Self::Document) -> Option<u64>;

    fn read_chain(&self, document: &Self::Document) -> Result<ApprovalChain, ApprovalError>;
    /// Store slot state and the derived status together
    fn write_chain(
        &self,
        document: &mut Self::Document,
        chain: &ApprovalChain,
    ) -> Result<(), ApprovalError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum RequirementStatus {
    #[n(0)]
    Draft,
    #[n(1)]
    Signed1,
    #[n(2)]
    Signed2,
    #[n(3)]
    Signed3,
    #[n(4)]
    Approved,
}

impl From<ChainStatus> for RequirementStatus {
    fn from(value: ChainStatus) -> Self {
        match value {
            ChainStatus::Draft => RequirementStatus::Draft,
            ChainStatus::Signed1 => RequirementStatus::Signed1,
            ChainStatus::Signed2 => RequirementStatus::Signed2,
            ChainStatus::Signed3 => RequirementStatus::Signed3,
            ChainStatus::Approved => RequirementStatus::Approved,
        }
    }
}

/// Purchase or expense requirement
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct Requirement {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub title: String,
    #[n(2)]
    pub created_by: UserId,
    #[n(3)]
    pub amount: u64, // minor currency units
    // chain composition, fixed when the requirement is opened
    #[n(4)]
    pub signature_roles: Vec<RoleTag>,
    #[n(5)]
    pub over_threshold: bool,
    #[n(6)]
    pub requester_signature: Option<Signature>,
    #[n(7)]
    pub technical_office_signature: Option<Signature>,
    #[n(8)]
    pub administration_signature: Option<Signature>,
    #[n(9)]
    pub management_signature: Option<Signature>,
    #[n(10)]
    pub status: RequirementStatus,
}

impl Requirement {
    pub fn new(id: String, title: &str, created_by: UserId, amount: u64) -> Self {
        Self {
            id,
            title: title.to_string(),
            created_by,
            amount,
            signature_roles: vec![],
            over_threshold: false,
            requester_signature: None,
            technical_office_signature: None,
            administration_signature: None,
            management_signature: None,
            status: RequirementStatus::Draft,
        }
    }

    fn signature_field(&mut self, role: RoleTag) -> Option<&mut Option<Signature>> {
        match role {
            RoleTag::Requester => Some(&mut self.requester_signature),
            RoleTag::TechnicalOffice => Some(&mut self.technical_office_signature),
            RoleTag::Administration => Some(&mut self.administration_signature),
            RoleTag::Management => Some(&mut self.management_signature),
            RoleTag::Logistics => None,
        }
    }

    fn signature(&self, role: RoleTag) -> Option<&Option<Signature>> {
        match role {
            RoleTag::Requester => Some(&self.requester_signature),
            RoleTag::TechnicalOffice => Some(&self.technical_office_signature),
            RoleTag::Administration => Some(&self.administration_signature),
            RoleTag::Management => Some(&self.management_signature),
            RoleTag::Logistics => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum QuotationStatus {
    #[n(0)]
    Pending,
    #[n(1)]
    FirstSignature,
    #[n(2)]
    SecondSignature,
    #[n(3)]
    ThirdSignature,
    #[n(4)]
    Authorized,
}

impl From<ChainStatus> for QuotationStatus {
    fn from(value: ChainStatus) -> Self {
        match value {
            ChainStatus::Draft => QuotationStatus::Pending,
            ChainStatus::Signed1 => QuotationStatus::FirstSignature,
            ChainStatus::Signed2 => QuotationStatus::SecondSignature,
            ChainStatus::Signed3 => QuotationStatus::ThirdSignature,
            ChainStatus::Approved => QuotationStatus::Authorized,
        }
    }
}

/// Request for supplier quotations
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct Quotation {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub subject: String,
    #[n(2)]
    pub requested_by: UserId,
    #[n(3)]
    pub signature_roles: Vec<RoleTag>,
    #[n(4)]
    pub requester_signature: Option<Signature>,
    #[n(5)]
    pub logistics_signature: Option<Signature>,
    #[n(6)]
    pub administration_signature: Option<Signature>,
    #[n(7)]
    pub management_signature: Option<Signature>,
    #[n(8)]
    pub status: QuotationStatus,
}

impl Quotation {
    pub fn new(id: String, subject: &str, requested_by: UserId) -> Self {
        Self {
            id,
            subject: subject.to_string(),
            requested_by,
            signature_roles: vec![],
            requester_signature: None,
            logistics_signature: None,
            administration_signature: None,
            management_signature: None,
            status: QuotationStatus::Pending,
        }
    }

    fn signature_field(&mut self, role: RoleTag) -> Option<&mut Option<Signature>> {
        match role {
            RoleTag::Requester => Some(&mut self.requester_signature),
            RoleTag::Logistics => Some(&mut self.logistics_signature),
            RoleTag::Administration => Some(&mut self.administration_signature),
            RoleTag::Management => Some(&mut self.management_signature),
            RoleTag::TechnicalOffice => None,
        }
    }

    fn signature(&self, role: RoleTag) -> Option<&Option<Signature>> {
        match role {
            RoleTag::Requester => Some(&self.requester_signature),
            RoleTag::Logistics => Some(&self.logistics_signature),
            RoleTag::Administration => Some(&self.administration_signature),
            RoleTag::Management => Some(&self.management_signature),
            RoleTag::TechnicalOffice => None,
        }
    }
}

// Builds slots for `roles`, pulling each signature from `signature_of`.
// Signatures on roles outside the chain are rejected by the caller.
fn assemble_chain<'a>(
    config: &ApprovalConfig,
    kind: DocumentKind,
    initiator: &UserId,
    roles: &[RoleTag],
    special_condition: bool,
    signature_of: impl Fn(RoleTag) -> Option<&'a Option<Signature>>,
) -> Result<ApprovalChain, ApprovalError> {
    let gates = config.chain(kind);
    let slots = roles
        .iter()
        .enumerate()
        .map(|(position, role)| -> Result<SignatureSlot, ApprovalError> {
            let signature = signature_of(*role).ok_or_else(|| {
                ApprovalError::Inconsistent(format!("{kind} has no signature field for {role}"))
            })?;
            Ok(SignatureSlot::new(
                *role,
                gates.gate_for(position)?,
                signature.clone(),
            ))
        })
        .collect::<Result<Vec<_>, _>>()?;

    for role in kind.allowed_roles() {
        let signed = signature_of(*role).is_some_and(|s| s.is_some());
        if signed && !roles.contains(role) {
            return Err(ApprovalError::Inconsistent(format!(
                "{kind} carries a {role} signature outside its chain"
            )));
        }
    }

    ApprovalChain::from_parts(kind, initiator.clone(), slots, special_condition)
}

// Pairs each slot's signature with its role, refusing to fill a role twice.
fn signature_assignments(
    kind: DocumentKind,
    slots: &[SignatureSlot],
) -> Result<Vec<(RoleTag, Option<Signature>)>, ApprovalError> {
    let mut assignments: Vec<(RoleTag, Option<Signature>)> = Vec::with_capacity(slots.len());
    for slot in slots {
        if assignments.iter().any(|(role, _)| *role == slot.role()) {
            return Err(ApprovalError::Inconsistent(format!(
                "{kind} chain would write the {} signature twice",
                slot.role()
            )));
        }
        assignments.push((slot.role(), slot.signature().cloned()));
    }
    Ok(assignments)
}

fn check_kind(expected: DocumentKind, chain: &ApprovalChain) -> Result<(), ApprovalError> {
    if chain.kind() != expected {
        return Err(ApprovalError::Inconsistent(format!(
            "cannot store a {} chain on a {expected}",
            chain.kind()
        )));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct RequirementAdapter {
    config: Arc<ApprovalConfig>,
}

impl RequirementAdapter {
    pub fn new(config: Arc<ApprovalConfig>) -> Self {
        Self { config }
    }
}

impl DocumentAdapter for RequirementAdapter {
    type Document = Requirement;

    fn kind(&self) -> DocumentKind {
        DocumentKind::Requirement
    }
    fn document_id<'a>(&self, document: &'a Requirement) -> &'a str {
        &document.id
    }
    fn initiator<'a>(&self, document: &'a Requirement) -> &'a UserId {
        &document.created_by
    }
    fn amount(&self, document: &Requirement) -> Option<u64> {
        Some(document.amount)
    }

    fn read_chain(&self, document: &Requirement) -> Result<ApprovalChain, ApprovalError> {
        let chain = assemble_chain(
            &self.config,
            DocumentKind::Requirement,
            &document.created_by,
            &document.signature_roles,
            document.over_threshold,
            |role| document.signature(role),
        )?;

        let derived = RequirementStatus::from(chain.status());
        if derived != document.status {
            return Err(ApprovalError::Inconsistent(format!(
                "requirement {} is stored as {:?} but its signatures say {:?}",
                document.id, document.status, derived
            )));
        }
        Ok(chain)
    }

    fn write_chain(
        &self,
        document: &mut Requirement,
        chain: &ApprovalChain,
    ) -> Result<(), ApprovalError> {
        check_kind(DocumentKind::Requirement, chain)?;
        let assignments = signature_assignments(DocumentKind::Requirement, chain.slots())?;
        if let Some((role, _)) = assignments
            .iter()
            .find(|(role, _)| document.signature(*role).is_none())
        {
            return Err(ApprovalError::Inconsistent(format!(
                "requirement has no {role} signature"
            )));
        }

        for role in DocumentKind::Requirement.allowed_roles() {
            if let Some(field) = document.signature_field(*role) {
                *field = None;
            }
        }
        for (role, signature) in assignments {
            if let Some(field) = document.signature_field(role) {
                *field = signature;
            }
        }

        document.created_by = chain.initiator().clone();
        document.signature_roles = chain.roles().collect();
        document.over_threshold = chain.special_condition();
        document.status = chain.status().into();
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct QuotationAdapter {
    config: Arc<ApprovalConfig>,
}

impl QuotationAdapter {
    pub fn new(config: Arc<ApprovalConfig>) -> Self {
        Self { config }
    }
}

impl DocumentAdapter for QuotationAdapter {
    type Document = Quotation;

    fn kind(&self) -> DocumentKind {
        DocumentKind::Quotation
    }
    fn document_id<'a>(&self, document: &'a Quotation) -> &'a str {
        &document.id
    }
    fn initiator<'a>(&self, document: &'a Quotation) -> &'a UserId {
        &document.requested_by
    }
    fn amount(&self, _: &Quotation) -> Option<u64> {
        None
    }

    fn read_chain(&self, document: &Quotation) -> Result<ApprovalChain, ApprovalError> {
        let chain = assemble_chain(
            &self.config,
            DocumentKind::Quotation,
            &document.requested_by,
            &document.signature_roles,
            false,
            |role| document.signature(role),
        )?;

        let derived = QuotationStatus::from(chain.status());
        if derived != document.status {
            return Err(ApprovalError::Inconsistent(format!(
                "quotation {} is stored as {:?} but its signatures say {:?}",
                document.id, document.status, derived
            )));
        }
        Ok(chain)
    }

    fn write_chain(
        &self,
        document: &mut Quotation,
        chain: &ApprovalChain,
    ) -> Result<(), ApprovalError> {
        check_kind(DocumentKind::Quotation, chain)?;
        let assignments = signature_assignments(DocumentKind::Quotation, chain.slots())?;
        if let Some((role, _)) = assignments
            .iter()
            .find(|(role, _)| document.signature(*role).is_none())
        {
            return Err(ApprovalError::Inconsistent(format!(
                "quotation has no {role} signature"
            )));
        }

        for role in DocumentKind::Quotation.allowed_roles() {
            if let Some(field) = document.signature_field(*role) {
                *field = None;
            }
        }
        for (role, signature) in assignments {
            if let Some(field) = document.signature_field(role) {
                *field = signature;
            }
        }

        document.requested_by = chain.initiator().clone();
        document.signature_roles = chain.roles().collect();
        document.status = chain.status().into();
        Ok(())
    }
}
