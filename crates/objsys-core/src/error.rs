use crate::symbol::Symbol;

/// Every way a dispatch, enumeration, or definition mutation in this crate
/// can fail. The host interpreter renders these to its own result channel;
/// `Custom` lets the (out-of-scope) method-body evaluator thread its own
/// errors through [`invoke`](crate) without this crate knowing their shape.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("unknown method {0:?}")]
    NoSuchMethod(Symbol),

    #[error("method {0:?} already exists")]
    RenameCollision(Symbol),

    #[error("cannot rename method {0:?} to itself")]
    RenameToSelf(Symbol),

    #[error("object is not a class")]
    NotAClass,

    #[error("an object's classness cannot change after creation")]
    ClassnessImmutable,

    #[error("superclass graph would contain a cycle")]
    CircularSuperclass,

    #[error("mixin graph would contain a cycle")]
    CircularMixin,

    #[error("superclass listed more than once")]
    DuplicateSuperclass,

    #[error("the root object or class-of-classes cannot be reclassed or resuperclassed")]
    RootModification,

    #[error("next called with no further method in the chain")]
    NoNextMethod,

    #[error("operation is only valid on a class")]
    MisuseApi,

    #[error(transparent)]
    Custom(Box<dyn std::error::Error + Send + Sync>),
}

impl DispatchError {
    pub fn custom(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Custom(Box::new(error))
    }
}

pub type Result<T> = std::result::Result<T, DispatchError>;
