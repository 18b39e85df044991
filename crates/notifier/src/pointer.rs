use serde::{Deserialize, Serialize};

/// Class marker understood by the AWS extended client libraries on the consumer side.
pub const MESSAGE_POINTER_CLASS: &str = "software.amazon.payloadoffloading.PayloadS3Pointer";

/// Reference to a message body stored in blob storage.
///
/// On the wire this is the two-element JSON array
/// `["software.amazon.payloadoffloading.PayloadS3Pointer", {"s3BucketName": .., "s3Key": ..}]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OffloadPointer {
    pub s3_bucket_name: String,
    pub s3_key: String,
}

impl OffloadPointer {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            s3_bucket_name: bucket.into(),
            s3_key: key.into(),
        }
    }

    /// Serialize as a queue message body.
    pub fn to_body(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&(MESSAGE_POINTER_CLASS, self))
    }

    /// Parse a queue message body. Returns `None` for inline bodies.
    pub fn from_body(body: &str) -> Option<Self> {
        let (marker, pointer): (String, OffloadPointer) = serde_json::from_str(body).ok()?;
        (marker == MESSAGE_POINTER_CLASS).then_some(pointer)
    }
}

/// Whether a message body is an offload pointer rather than an inline payload.
pub fn is_pointer_body(body: &str) -> bool {
    OffloadPointer::from_body(body).is_some()
}
