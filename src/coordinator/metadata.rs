//! Claim metadata document assembly
//!
//! Derives the display/attestation document served at
//! `/api/metadata/{claim_id}`. Only populated claim fields are emitted:
//! the attribute list is built through an explicit field-presence filter
//! so the document is stable and never carries null entries. This
//! document is what the proving service fetches and attests.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::storage::ClaimRecord;

/// One display attribute of a capture
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Attribute {
    pub trait_type: String,
    pub value: Value,
}

/// Display/attestation document for a claim
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataDocument {
    pub name: String,
    pub description: String,
    /// Storage pointer for the captured asset
    pub image: String,
    pub attributes: Vec<Attribute>,
    pub properties: Map<String, Value>,
}

fn push_if_set(attributes: &mut Vec<Attribute>, trait_type: &str, value: &Option<String>) {
    if let Some(v) = value {
        if !v.is_empty() {
            attributes.push(Attribute {
                trait_type: trait_type.to_string(),
                value: Value::String(v.clone()),
            });
        }
    }
}

/// Build the metadata document for a claim
pub fn build_metadata(claim: &ClaimRecord) -> MetadataDocument {
    let short_id: String = claim.claim_id.chars().take(8).collect();

    // Ordered attribute list: fixed order, populated fields only
    let mut attributes = Vec::new();
    push_if_set(&mut attributes, "Device ID", &claim.device_id);
    push_if_set(&mut attributes, "Camera ID", &claim.camera_id);
    push_if_set(&mut attributes, "Image Hash", &claim.image_hash);
    push_if_set(&mut attributes, "Device Address", &claim.device_address);
    if let Some(ts) = chrono::DateTime::from_timestamp(claim.created_at, 0) {
        attributes.push(Attribute {
            trait_type: "Capture Time".to_string(),
            value: Value::String(ts.to_rfc3339()),
        });
    }
    if let Some(token_id) = claim.token_id {
        attributes.push(Attribute {
            trait_type: "Token ID".to_string(),
            value: Value::Number(token_id.into()),
        });
    }

    let mut properties = Map::new();
    properties.insert("claim_id".to_string(), Value::String(claim.claim_id.clone()));
    properties.insert("cid".to_string(), Value::String(claim.cid.clone()));
    properties.insert(
        "status".to_string(),
        Value::String(claim.status.to_string()),
    );
    if let Some(metadata_cid) = &claim.metadata_cid {
        properties.insert("metadata_cid".to_string(), Value::String(metadata_cid.clone()));
    }
    if let Some(signature) = &claim.signature {
        properties.insert("signature".to_string(), Value::String(signature.clone()));
    }
    if let Some(tx_hash) = &claim.tx_hash {
        properties.insert("tx_hash".to_string(), Value::String(tx_hash.clone()));
    }

    MetadataDocument {
        name: format!("Capture #{}", short_id),
        description: format!(
            "Hardware-attested capture, claim {}",
            claim.claim_id
        ),
        image: format!("ipfs://{}", claim.cid),
        attributes,
        properties,
    }
}
