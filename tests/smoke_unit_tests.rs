//! Smoke Screen Unit tests for the document approval components
//!
//! These tests span the public API of the crate and exercise each component
//! in isolation from storage. They mostly cover the happy path.

use document_approval::{
    adapter::{DocumentAdapter, Quotation, QuotationAdapter, Requirement, RequirementAdapter},
    chain::{ChainStatus, SlotGate},
    config::ApprovalConfig,
    engine::ApprovalStateMachine,
    error::ApprovalError,
    permission::{CapabilityTable, PermissionOracle},
    policy::SignatureRequirementPolicy,
    types::{DocumentKind, RoleTag, UserId},
    utils::new_uuid_to_bech32,
};
use std::sync::Arc;

fn config() -> Arc<ApprovalConfig> {
    Arc::new(ApprovalConfig::from_toml_str(include_str!("../config/approval.toml")).unwrap())
}

// UTILS MODULE TESTS
#[cfg(test)]
mod utils_tests {
    use super::*;

    /// Test that new_uuid_to_bech32 generates valid bech32-encoded strings
    /// with the correct human-readable prefix
    #[test]
    fn generates_valid_bech32_with_hrp() {
        let encoded = new_uuid_to_bech32("req_").unwrap();

        assert!(encoded.starts_with("req_1"));
        assert!(encoded.len() > 10);
    }

    /// Test that the function handles empty strings appropriately
    #[test]
    fn handles_empty_hrp() {
        assert!(new_uuid_to_bech32("").is_err());
    }
}

// CONFIG MODULE TESTS
#[cfg(test)]
mod config_tests {
    use super::*;

    /// The shipped sample configuration is valid
    #[test]
    fn sample_file_loads_from_disk() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("config/approval.toml");
        let config = ApprovalConfig::from_file(&path).unwrap();

        assert_eq!(config, *super::config());
    }

    /// Missing files surface as errors rather than defaults
    #[test]
    fn missing_file_is_an_error() {
        let path = std::path::Path::new("does/not/exist.toml");
        assert!(ApprovalConfig::from_file(path).is_err());
    }

    /// Malformed TOML is rejected
    #[test]
    fn malformed_toml_is_rejected() {
        assert!(ApprovalConfig::from_toml_str("amount_threshold = \"lots\"").is_err());
    }
}

// POLICY AND ENGINE TESTS
#[cfg(test)]
mod engine_tests {
    use super::*;

    /// A full requirement chain is signed by four different people in order
    #[test]
    fn four_slot_requirement_signs_in_order() {
        let policy = SignatureRequirementPolicy::new(config());
        let creator = UserId::from("user_creator");
        let technical = UserId::from("user_technical");
        let admin = UserId::from("user_admin");
        let manager = UserId::from("user_manager");
        let oracle = CapabilityTable::new()
            .grant(&technical, "requirement-view-signed1")
            .grant(&admin, "requirement-view-signed2")
            .grant(&manager, "requirement-view-signed3");
        let engine = ApprovalStateMachine::new(oracle);

        let mut chain = policy
            .build_chain(DocumentKind::Requirement, None, Some(1), creator.clone())
            .unwrap();
        assert_eq!(chain.slots().len(), 4);

        let expected = [
            (&creator, ChainStatus::Signed1),
            (&technical, ChainStatus::Signed2),
            (&admin, ChainStatus::Signed3),
            (&manager, ChainStatus::Approved),
        ];
        for (signer, status) in expected {
            // nobody else in the pool may take this step
            for other in [&creator, &technical, &admin, &manager] {
                if other != signer {
                    assert!(!engine.can_advance(other, &chain));
                }
            }
            chain = engine.record_signature(signer, &chain).unwrap();
            assert_eq!(chain.status(), status);
        }
    }

    /// Gates follow position in the chain, not the role signing it
    #[test]
    fn gate_depends_on_position_not_role() {
        let policy = SignatureRequirementPolicy::new(config());
        let creator = UserId::from("user_creator");

        let short = policy
            .build_chain(
                DocumentKind::Requirement,
                Some(&[RoleTag::Requester, RoleTag::Management]),
                None,
                creator.clone(),
            )
            .unwrap();
        let full = policy
            .build_chain(DocumentKind::Requirement, None, None, creator)
            .unwrap();

        assert_eq!(
            short.slots()[1].gate(),
            &SlotGate::Capability("requirement-view-signed1".into())
        );
        assert_eq!(
            full.slots()[3].gate(),
            &SlotGate::Capability("requirement-view-signed3".into())
        );
    }

    /// Engine consults the oracle through any reference
    #[test]
    fn engine_accepts_shared_oracle() {
        let creator = UserId::from("user_creator");
        let logistics = UserId::from("user_logistics");
        let oracle = Arc::new(CapabilityTable::new().grant(&logistics, "quotation-view-signed1"));
        let engine = ApprovalStateMachine::new(oracle.clone());

        let chain = SignatureRequirementPolicy::new(config())
            .build_chain(DocumentKind::Quotation, None, None, creator.clone())
            .unwrap();
        let chain = engine.record_signature(&creator, &chain).unwrap();

        assert!(engine.can_advance(&logistics, &chain));
        assert!(engine.oracle().has_capability(&logistics, "quotation-view-signed1"));
    }

    /// Errors are typed and render a readable message
    #[test]
    fn errors_display() {
        let err = ApprovalError::OutOfOrder {
            expected: Some(1),
            attempted: 2,
        };
        assert!(err.is_conflict());
        assert!(err.to_string().contains("slot 2"));
        assert!(!ApprovalError::AlreadyTerminal.is_conflict());
    }
}

// ADAPTER TESTS
#[cfg(test)]
mod adapter_tests {
    use super::*;

    /// Opening a requirement with a draft chain leaves every signature empty
    #[test]
    fn draft_requirement_has_no_signatures() {
        let config = config();
        let adapter = RequirementAdapter::new(config.clone());
        let creator = UserId::from("user_creator");
        let mut requirement = Requirement::new("req_1".into(), "Desks", creator.clone(), 10);

        let chain = SignatureRequirementPolicy::new(config)
            .build_chain(
                adapter.kind(),
                None,
                adapter.amount(&requirement),
                adapter.initiator(&requirement).clone(),
            )
            .unwrap();
        adapter.write_chain(&mut requirement, &chain).unwrap();

        assert_eq!(requirement.signature_roles.len(), 4);
        assert!(requirement.requester_signature.is_none());
        assert!(requirement.management_signature.is_none());
        assert_eq!(adapter.read_chain(&requirement).unwrap(), chain);
    }

    /// Quotations never carry a threshold amount
    #[test]
    fn quotation_has_no_amount() {
        let adapter = QuotationAdapter::new(config());
        let quotation = Quotation::new("quo_1".into(), "Pallets", UserId::from("user_a"));

        assert_eq!(adapter.amount(&quotation), None);
        assert_eq!(adapter.kind(), DocumentKind::Quotation);
    }

    /// A stored document with an empty role list is rejected on read
    #[test]
    fn unopened_document_has_no_chain() {
        let adapter = RequirementAdapter::new(config());
        let requirement = Requirement::new("req_2".into(), "Fans", UserId::from("user_a"), 10);

        assert!(matches!(
            adapter.read_chain(&requirement),
            Err(ApprovalError::Inconsistent(_))
        ));
    }
}
