//! Invocation data model
//!
//! The event a caller hands to the handler, the descriptor the handler returns, and the
//! rule that turns a source key into the destination key.

use serde::{Deserialize, Serialize};

use crate::constants::OUTPUT_EXTENSION;

/// Source and destination buckets of one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketPair {
    pub input: String,
    pub output: String,
}

/// The object to resize and the box to resize it into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSpec {
    pub key: String,
    pub width: u32,
    pub height: u32,
}

/// Event received by the handler, consumed once per invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationEvent {
    pub bucket: BucketPair,
    pub object: ObjectSpec,
}

impl InvocationEvent {
    /// Destination key for this event's object.
    pub fn upload_key(&self) -> String {
        derive_upload_key(&self.object.key)
    }
}

/// Location of the written thumbnail. Serializes to exactly `{"bucket": .., "key": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultDescriptor {
    pub bucket: String,
    pub key: String,
}

/// Replace the final extension of `key` with `.png`.
///
/// Everything from the last `.` in the whole key onwards is dropped; a key without any `.`
/// keeps its full text. The search is not limited to the last path segment.
pub fn derive_upload_key(key: &str) -> String {
    let base = match key.rfind('.') {
        Some(pos) => &key[..pos],
        None => key,
    };
    format!("{}{}", base, OUTPUT_EXTENSION)
}
