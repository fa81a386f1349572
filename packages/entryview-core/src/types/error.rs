/// Error type for class registration and validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("Class '{class}' has invalid alignment: {align}")]
    InvalidAlignment { class: String, align: usize },

    #[error("Class '{class}' size {size} not divisible by alignment {align}")]
    SizeAlignmentMismatch {
        class: String,
        size: usize,
        align: usize,
    },

    #[error("Member '{member}' of class '{class}' (offset={offset}, size={size}) exceeds class size {class_size}")]
    MemberExceedsClassSize {
        class: String,
        member: String,
        offset: i64,
        size: usize,
        class_size: usize,
    },

    #[error("Member '{member}' of class '{class}' has size {size}, expected {expected} for its type")]
    MemberSizeMismatch {
        class: String,
        member: String,
        size: usize,
        expected: usize,
    },

    #[error("Member '{member}' declared twice in class '{class}'")]
    DuplicateMember { class: String, member: String },

    #[error("Class '{class}' already registered")]
    AlreadyRegistered { class: String },

    #[error("Class '{class}' not found")]
    NotFound { class: String },

    #[error("Class validation failed: {message}")]
    ValidationFailed { class: String, message: String },
}
