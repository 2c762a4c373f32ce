//! Opens a requirement above the management threshold and walks it through
//! every signature, printing the chain after each step.
//!
//! RUST_LOG=debug cargo run --example walkthrough

use document_approval::{
    adapter::{Requirement, RequirementAdapter},
    config::ApprovalConfig,
    error::ApprovalError,
    permission::CapabilityTable,
    service::ApprovalService,
    types::{RoleTag, UserId},
    utils,
};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Arc::new(ApprovalConfig::from_file(Path::new("config/approval.toml"))?);
    let dir = tempfile::tempdir()?;
    let db = Arc::new(sled::open(dir.path().join("walkthrough.db"))?);

    let creator = UserId::new(utils::new_uuid_to_bech32("user_")?);
    let administrator = UserId::new(utils::new_uuid_to_bech32("user_")?);
    let manager = UserId::new(utils::new_uuid_to_bech32("user_")?);
    let oracle = CapabilityTable::new()
        .grant(&administrator, "requirement-view-signed1")
        .grant(&manager, "requirement-view-signed2");

    let service = ApprovalService::new(
        db,
        config.clone(),
        RequirementAdapter::new(config.clone()),
        oracle,
    )?;

    let id = utils::new_uuid_to_bech32("req_")?;
    let requirement = Requirement::new(
        id.clone(),
        "Replacement compressor",
        creator.clone(),
        config.amount_threshold + 1,
    );
    let chain = service.open(
        requirement,
        Some(&[RoleTag::Requester, RoleTag::Administration]),
    )?;
    println!(
        "opened {id} with roles {:?}",
        chain.roles().collect::<Vec<_>>()
    );

    for signer in [&creator, &administrator, &manager] {
        if let Some(label) = service.action_label(signer, &id)? {
            println!("{signer}: {label}");
        }
        let chain = service.sign_next(signer, &id)?;
        println!("  -> {}", chain.status());
    }

    match service.sign_next(&manager, &id) {
        Err(ApprovalError::AlreadyTerminal) => println!("chain is complete"),
        other => println!("unexpected: {other:?}"),
    }
    println!("{:#?}", service.load(&id)?);

    Ok(())
}
