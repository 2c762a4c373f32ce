//! Service layer API for signing stored documents
use super::adapter::DocumentAdapter;
use super::chain::ApprovalChain;
use super::config::ApprovalConfig;
use super::engine::ApprovalStateMachine;
use super::error::ApprovalError;
use super::permission::PermissionOracle;
use super::policy::SignatureRequirementPolicy;
use super::types::{RoleTag, UserId};
use sled::{IVec, Tree};
use std::sync::Arc;
use tracing::{debug, info};

pub struct ApprovalService<A, O> {
    instance: Arc<sled::Db>,
    documents: Tree,
    adapter: A,
    policy: SignatureRequirementPolicy,
    engine: ApprovalStateMachine<O>,
}

impl<A: DocumentAdapter, O: PermissionOracle> ApprovalService<A, O> {
    /// Documents of the adapter's kind live in their own tree
    pub fn new(
        instance: Arc<sled::Db>,
        config: Arc<ApprovalConfig>,
        adapter: A,
        oracle: O,
    ) -> Result<Self, ApprovalError> {
        let documents = instance.open_tree(adapter.kind().tree_name())?;
        Ok(Self {
            instance,
            documents,
            adapter,
            policy: SignatureRequirementPolicy::new(config),
            engine: ApprovalStateMachine::new(oracle),
        })
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn engine(&self) -> &ApprovalStateMachine<O> {
        &self.engine
    }

    /// Build the document's chain, attach it and store the document as a draft
    pub fn open(
        &self,
        mut document: A::Document,
        subset: Option<&[RoleTag]>,
    ) -> Result<ApprovalChain, ApprovalError> {
        let chain = self.policy.build_chain(
            self.adapter.kind(),
            subset,
            self.adapter.amount(&document),
            self.adapter.initiator(&document).clone(),
        )?;
        self.adapter.write_chain(&mut document, &chain)?;

        let id = self.adapter.document_id(&document).to_string();
        let encoded = minicbor::to_vec(&document)?;
        // only succeeds when nothing is stored under this id yet
        if self
            .documents
            .compare_and_swap(id.as_bytes(), None::<&[u8]>, Some(encoded))?
            .is_err()
        {
            return Err(ApprovalError::AlreadyExists(id));
        }
        self.instance.flush()?;

        info!(
            kind = %self.adapter.kind(),
            document = %id,
            slots = chain.slots().len(),
            "opened document for signatures"
        );
        Ok(chain)
    }

    pub fn load(&self, id: &str) -> Result<A::Document, ApprovalError> {
        let (_, document) = self.load_raw(id)?;
        Ok(document)
    }

    pub fn chain(&self, id: &str) -> Result<ApprovalChain, ApprovalError> {
        let document = self.load(id)?;
        self.adapter.read_chain(&document)
    }

    pub fn can_advance(&self, user: &UserId, id: &str) -> Result<bool, ApprovalError> {
        let chain = self.chain(id)?;
        Ok(self.engine.can_advance(user, &chain))
    }

    /// Label for the sign action, only when `user` may take it
    pub fn action_label(&self, user: &UserId, id: &str) -> Result<Option<String>, ApprovalError> {
        let chain = self.chain(id)?;
        if !self.engine.can_advance(user, &chain) {
            return Ok(None);
        }
        Ok(chain.signature_label())
    }

    /// Sign the slot at `expected_slot`.
    ///
    /// The caller passes the slot index it saw when it loaded the document.
    /// The decision is re-run against the freshest stored bytes and committed
    /// with a compare-and-swap on those bytes; if another writer got in first
    /// the loop reloads and re-validates, so a signer who lost the race gets
    /// `OutOfOrder`.
    pub fn sign(
        &self,
        user: &UserId,
        id: &str,
        expected_slot: usize,
    ) -> Result<ApprovalChain, ApprovalError> {
        loop {
            let (current, document) = self.load_raw(id)?;
            if let Some(signed) = self.commit_signature(user, id, expected_slot, &current, document)? {
                return Ok(signed);
            }
            debug!(document = %id, "document changed during signing, re-validating");
        }
    }

    // One attempt: validate against `document` and swap it in only if the
    // stored bytes still equal `current`. `None` means another writer won.
    fn commit_signature(
        &self,
        user: &UserId,
        id: &str,
        expected_slot: usize,
        current: &IVec,
        mut document: A::Document,
    ) -> Result<Option<ApprovalChain>, ApprovalError> {
        let chain = self.adapter.read_chain(&document)?;
        let signed = self.engine.record_signature_at(user, &chain, expected_slot)?;

        self.adapter.write_chain(&mut document, &signed)?;
        let encoded = minicbor::to_vec(&document)?;

        if self
            .documents
            .compare_and_swap(id.as_bytes(), Some(current), Some(encoded))?
            .is_err()
        {
            return Ok(None);
        }
        self.instance.flush()?;
        info!(
            document = %id,
            user = %user,
            slot = expected_slot,
            status = %signed.status(),
            "signature committed"
        );
        Ok(Some(signed))
    }

    /// Sign whatever slot is next in the stored chain
    pub fn sign_next(&self, user: &UserId, id: &str) -> Result<ApprovalChain, ApprovalError> {
        let chain = self.chain(id)?;
        let next = chain.next_slot_index().ok_or(ApprovalError::AlreadyTerminal)?;
        self.sign(user, id, next)
    }

    /// Ids of stored documents `user` may sign right now
    pub fn awaiting(&self, user: &UserId) -> Result<Vec<String>, ApprovalError> {
        let mut ids = vec![];
        for entry in self.documents.iter() {
            let (key, value) = entry?;
            let document: A::Document = minicbor::decode(&value)?;
            let chain = self.adapter.read_chain(&document)?;

            if self.engine.can_advance(user, &chain) {
                ids.push(String::from_utf8_lossy(&key).into_owned());
            }
        }
        Ok(ids)
    }

    fn load_raw(&self, id: &str) -> Result<(IVec, A::Document), ApprovalError> {
        let raw = self
            .documents
            .get(id.as_bytes())?
            .ok_or_else(|| ApprovalError::NotFound(id.to_string()))?;
        let document = minicbor::decode(&raw)?;
        Ok((raw, document))
    }
}
