/// Attribute holding the creation time of every message.
pub const MESSAGE_CREATED_AT: &str = "message_created_at";

/// Caller-supplied attribute naming the blob key prefix for offloaded bodies.
pub const S3_KEY_ATTRIBUTE_NAME: &str = "S3Key";

/// Attribute recording the original body size of an offloaded message.
pub const RESERVED_ATTRIBUTE_NAME: &str = "ExtendedPayloadSize";

/// SQS accepts at most ten attributes per message.
pub const MAX_MESSAGE_ATTRIBUTES: usize = 10;

/// A typed message attribute, using the queue's data type vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageAttribute {
    String(String),
    /// Numbers travel as their decimal string representation.
    Number(String),
    Binary(Vec<u8>),
}

impl MessageAttribute {
    pub fn string(value: impl Into<String>) -> Self {
        MessageAttribute::String(value.into())
    }

    pub fn number(value: impl std::fmt::Display) -> Self {
        MessageAttribute::Number(value.to_string())
    }

    /// The queue-level data type name.
    pub fn data_type(&self) -> &'static str {
        match self {
            MessageAttribute::String(_) => "String",
            MessageAttribute::Number(_) => "Number",
            MessageAttribute::Binary(_) => "Binary",
        }
    }

    /// String value for `String` and `Number` attributes.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MessageAttribute::String(v) | MessageAttribute::Number(v) => Some(v),
            MessageAttribute::Binary(_) => None,
        }
    }
}
