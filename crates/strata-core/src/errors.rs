use strata_core_types::InvocationId;
use thiserror::Error;
use uuid::Uuid;

use crate::property::PropertyKind;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Every area error of the object model maps onto one of these kinds, and
/// every kind maps to a stable code that collaborators (CLI, undo stacks,
/// log pipelines) can match on without knowing the area enums.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Property
    ReadOnlyViolation,
    TypeMismatch,
    OutOfBounds,
    InvalidEnumValue,

    // Tree structure
    NotFound,
    PropertyNotFound,
    DuplicateProperty,
    CycleDetected,

    // Factory / restore
    UnknownType,
    AlreadyRegistered,
    MalformedProperty,

    // Text form
    Parse,

    // Diff / patch
    IdentityMismatch,
    ClassMismatch,
    AmbiguousChild,
    TargetNotFound,
    TypeConflict,
    AlreadyExists,
    UnsupportedEdit,
    RollbackFailed,

    // Containers
    NotCloneable,

    // Integration
    Io,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::ReadOnlyViolation => "ERR_READ_ONLY_VIOLATION",
            ExErrorKind::TypeMismatch => "ERR_TYPE_MISMATCH",
            ExErrorKind::OutOfBounds => "ERR_OUT_OF_BOUNDS",
            ExErrorKind::InvalidEnumValue => "ERR_INVALID_ENUM_VALUE",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::PropertyNotFound => "ERR_PROPERTY_NOT_FOUND",
            ExErrorKind::DuplicateProperty => "ERR_DUPLICATE_PROPERTY",
            ExErrorKind::CycleDetected => "ERR_CYCLE_DETECTED",
            ExErrorKind::UnknownType => "ERR_UNKNOWN_TYPE",
            ExErrorKind::AlreadyRegistered => "ERR_ALREADY_REGISTERED",
            ExErrorKind::MalformedProperty => "ERR_MALFORMED_PROPERTY",
            ExErrorKind::Parse => "ERR_PARSE",
            ExErrorKind::IdentityMismatch => "ERR_IDENTITY_MISMATCH",
            ExErrorKind::ClassMismatch => "ERR_CLASS_MISMATCH",
            ExErrorKind::AmbiguousChild => "ERR_AMBIGUOUS_CHILD",
            ExErrorKind::TargetNotFound => "ERR_TARGET_NOT_FOUND",
            ExErrorKind::TypeConflict => "ERR_TYPE_CONFLICT",
            ExErrorKind::AlreadyExists => "ERR_ALREADY_EXISTS",
            ExErrorKind::UnsupportedEdit => "ERR_UNSUPPORTED_EDIT",
            ExErrorKind::RollbackFailed => "ERR_ROLLBACK_FAILED",
            ExErrorKind::NotCloneable => "ERR_NOT_CLONEABLE",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries the classification plus optional context (operation, node uuid,
/// property ident, invocation id) for programmatic handling and diagnostics.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    node_uuid: Option<Uuid>,
    property: Option<String>,
    invocation_id: Option<InvocationId>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            node_uuid: None,
            property: None,
            invocation_id: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add the uuid of the node the error refers to
    pub fn with_node_uuid(mut self, uuid: Uuid) -> Self {
        self.node_uuid = Some(uuid);
        self
    }

    /// Add the ident of the property the error refers to
    pub fn with_property(mut self, ident: impl Into<String>) -> Self {
        self.property = Some(ident.into());
        self
    }

    /// Add invocation correlation
    pub fn with_invocation_id(mut self, id: InvocationId) -> Self {
        self.invocation_id = Some(id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the node uuid context, if any
    pub fn node_uuid(&self) -> Option<Uuid> {
        self.node_uuid
    }

    /// Get the property ident context, if any
    pub fn property(&self) -> Option<&str> {
        self.property.as_deref()
    }

    /// Get the invocation id, if any
    pub fn invocation_id(&self) -> Option<&InvocationId> {
        self.invocation_id.as_ref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(uuid) = &self.node_uuid {
            write!(f, " (node: {})", uuid.braced())?;
        }
        if let Some(property) = &self.property {
            write!(f, " (property: {})", property)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Errors raised by a single property
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PropertyError {
    /// Write to a read-only property through the user-facing setters
    #[error("Property '{ident}' is read-only")]
    ReadOnly { ident: String },

    /// Value or entry of a different kind than the property stores
    #[error("Property '{ident}' expects {expected}, got {found}")]
    TypeMismatch {
        ident: String,
        expected: PropertyKind,
        found: String,
    },

    /// Value outside the configured bounds
    #[error("Value {value} is out of bounds for property '{ident}'")]
    OutOfBounds { ident: String, value: String },

    /// Enumeration value that is not one of the declared options
    #[error("'{value}' is not an option of enum property '{ident}'")]
    InvalidEnumValue { ident: String, value: String },

    /// Struct value naming a member that does not exist
    #[error("Struct property '{ident}' has no member '{member}'")]
    UnknownMember { ident: String, member: String },

    /// Stored text could not be parsed as the declared kind
    #[error("Cannot read '{text}' as {kind} for property '{ident}'")]
    Malformed {
        ident: String,
        kind: PropertyKind,
        text: String,
    },
}

impl PropertyError {
    /// Ident of the property the error refers to
    pub fn ident(&self) -> &str {
        match self {
            PropertyError::ReadOnly { ident }
            | PropertyError::TypeMismatch { ident, .. }
            | PropertyError::OutOfBounds { ident, .. }
            | PropertyError::InvalidEnumValue { ident, .. }
            | PropertyError::UnknownMember { ident, .. }
            | PropertyError::Malformed { ident, .. } => ident,
        }
    }
}

/// Errors raised by tree and node operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Node id is not (or no longer) part of the tree
    #[error("Node not found: {node}")]
    NodeNotFound { node: String },

    /// Property ident is not declared on the node
    #[error("Property '{ident}' not found on node {node}")]
    PropertyNotFound { node: String, ident: String },

    /// Property ident already used on the node
    #[error("Property '{ident}' already exists on node {node}")]
    DuplicateProperty { node: String, ident: String },

    /// Reparenting would make a node its own ancestor
    #[error("Cycle detected: node {child} cannot be placed below {parent}")]
    CycleDetected { parent: String, child: String },

    /// Child is not a direct child of the given parent
    #[error("Node {child} is not a child of {parent}")]
    NotAChild { parent: String, child: String },

    /// Property level failure while writing through the tree
    #[error(transparent)]
    Property(#[from] PropertyError),
}

/// Errors raised by the object factory
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FactoryError {
    /// No constructor registered under that class name
    #[error("Unknown object type: {class_name}")]
    UnknownType { class_name: String },

    /// Class name already registered
    #[error("Object type already registered: {class_name}")]
    AlreadyRegistered { class_name: String },

    /// The constructor itself failed
    #[error("Construction of {class_name} failed: {source}")]
    Construction {
        class_name: String,
        #[source]
        source: ModelError,
    },

    /// The new node could not be linked to its parent
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Malformed tagged-tree text
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Parse error at line {line}, column {column} in <{context}>: {message}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
    pub context: String,
}

/// Errors raised while rebuilding a live tree from a memento
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RestoreError {
    /// Memento names a class the factory does not know
    #[error("Unknown object type '{class_name}' for node {uuid}")]
    UnknownType { class_name: String, uuid: Uuid },

    /// Stored property value cannot be applied to the declared property
    #[error("Malformed property '{ident}' on node {uuid}: {reason}")]
    MalformedProperty {
        uuid: Uuid,
        ident: String,
        reason: String,
    },

    /// Constructor or tree failure
    #[error(transparent)]
    Factory(#[from] FactoryError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Errors raised while computing a diff
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DiffError {
    /// The two mementos do not describe the same logical object
    #[error("Identity mismatch: {left} vs {right}")]
    IdentityMismatch { left: Uuid, right: Uuid },

    /// Same uuid, different class
    #[error("Class mismatch for {uuid}: {left} vs {right}")]
    ClassMismatch {
        uuid: Uuid,
        left: String,
        right: String,
    },

    /// Two siblings share a uuid, so children cannot be matched
    #[error("Ambiguous child {uuid} below {parent}")]
    AmbiguousChild { parent: Uuid, uuid: Uuid },
}

/// Errors raised while applying a diff
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PatchError {
    /// Edit references a node that is absent in the target
    #[error("Patch target not found: {uuid}")]
    TargetNotFound { uuid: Uuid },

    /// Edit references a property that is absent on the target node
    #[error("Property '{ident}' not found on {uuid}")]
    PropertyNotFound { uuid: Uuid, ident: String },

    /// Recorded kind differs from the live property kind
    #[error("Type conflict for '{ident}' on {uuid}: expected {expected}, got {found}")]
    TypeConflict {
        uuid: Uuid,
        ident: String,
        expected: String,
        found: String,
    },

    /// Recorded value cannot be applied
    #[error("Malformed property '{ident}' on {uuid}: {reason}")]
    MalformedProperty {
        uuid: Uuid,
        ident: String,
        reason: String,
    },

    /// Insert of a node or property that already exists
    #[error("{what} already exists on {uuid}")]
    AlreadyExists { uuid: Uuid, what: String },

    /// Edit that cannot be expressed on a live tree
    #[error("Unsupported edit on {uuid}: {reason}")]
    UnsupportedEdit { uuid: Uuid, reason: String },

    /// Rebuilding an inserted subtree failed
    #[error(transparent)]
    Restore(#[from] RestoreError),

    #[error(transparent)]
    Model(#[from] ModelError),

    /// Diff computation failed (merge)
    #[error(transparent)]
    Diff(#[from] DiffError),

    /// The atomic layer could not bring the tree back to its snapshot
    #[error("Rollback after '{cause}' failed: {rollback}")]
    RollbackFailed { cause: String, rollback: String },
}

/// Errors raised by the heterogeneous container
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolyVectorError {
    /// Element was inserted without a clone capability
    #[error("Element {index} ({type_name}) cannot be cloned")]
    NotCloneable {
        index: usize,
        type_name: &'static str,
    },
}

impl From<PropertyError> for ExError {
    fn from(err: PropertyError) -> Self {
        let kind = match &err {
            PropertyError::ReadOnly { .. } => ExErrorKind::ReadOnlyViolation,
            PropertyError::TypeMismatch { .. } => ExErrorKind::TypeMismatch,
            PropertyError::OutOfBounds { .. } => ExErrorKind::OutOfBounds,
            PropertyError::InvalidEnumValue { .. } => ExErrorKind::InvalidEnumValue,
            PropertyError::UnknownMember { .. } => ExErrorKind::PropertyNotFound,
            PropertyError::Malformed { .. } => ExErrorKind::MalformedProperty,
        };
        ExError::new(kind)
            .with_property(err.ident().to_string())
            .with_message(err.to_string())
    }
}

impl From<ModelError> for ExError {
    fn from(err: ModelError) -> Self {
        let kind = match &err {
            ModelError::NodeNotFound { .. } | ModelError::NotAChild { .. } => {
                ExErrorKind::NotFound
            }
            ModelError::PropertyNotFound { .. } => ExErrorKind::PropertyNotFound,
            ModelError::DuplicateProperty { .. } => ExErrorKind::DuplicateProperty,
            ModelError::CycleDetected { .. } => ExErrorKind::CycleDetected,
            ModelError::Property(inner) => return inner.clone().into(),
        };
        ExError::new(kind).with_message(err.to_string())
    }
}

impl From<FactoryError> for ExError {
    fn from(err: FactoryError) -> Self {
        match err {
            FactoryError::UnknownType { .. } => {
                ExError::new(ExErrorKind::UnknownType).with_message(err.to_string())
            }
            FactoryError::AlreadyRegistered { .. } => {
                ExError::new(ExErrorKind::AlreadyRegistered).with_message(err.to_string())
            }
            FactoryError::Construction { ref source, .. } => {
                ExError::from(source.clone()).with_message(err.to_string())
            }
            FactoryError::Model(inner) => inner.into(),
        }
    }
}

impl From<ParseError> for ExError {
    fn from(err: ParseError) -> Self {
        ExError::new(ExErrorKind::Parse).with_message(err.to_string())
    }
}

impl From<RestoreError> for ExError {
    fn from(err: RestoreError) -> Self {
        match err {
            RestoreError::UnknownType { uuid, .. } => ExError::new(ExErrorKind::UnknownType)
                .with_node_uuid(uuid)
                .with_message(err.to_string()),
            RestoreError::MalformedProperty {
                uuid, ref ident, ..
            } => ExError::new(ExErrorKind::MalformedProperty)
                .with_node_uuid(uuid)
                .with_property(ident.clone())
                .with_message(err.to_string()),
            RestoreError::Factory(inner) => inner.into(),
            RestoreError::Model(inner) => inner.into(),
        }
    }
}

impl From<DiffError> for ExError {
    fn from(err: DiffError) -> Self {
        let (kind, uuid) = match &err {
            DiffError::IdentityMismatch { left, .. } => (ExErrorKind::IdentityMismatch, *left),
            DiffError::ClassMismatch { uuid, .. } => (ExErrorKind::ClassMismatch, *uuid),
            DiffError::AmbiguousChild { uuid, .. } => (ExErrorKind::AmbiguousChild, *uuid),
        };
        ExError::new(kind)
            .with_node_uuid(uuid)
            .with_message(err.to_string())
    }
}

impl From<PatchError> for ExError {
    fn from(err: PatchError) -> Self {
        let (kind, uuid, property) = match &err {
            PatchError::TargetNotFound { uuid } => (ExErrorKind::TargetNotFound, Some(*uuid), None),
            PatchError::PropertyNotFound { uuid, ident } => (
                ExErrorKind::PropertyNotFound,
                Some(*uuid),
                Some(ident.clone()),
            ),
            PatchError::TypeConflict { uuid, ident, .. } => {
                (ExErrorKind::TypeConflict, Some(*uuid), Some(ident.clone()))
            }
            PatchError::MalformedProperty { uuid, ident, .. } => (
                ExErrorKind::MalformedProperty,
                Some(*uuid),
                Some(ident.clone()),
            ),
            PatchError::AlreadyExists { uuid, .. } => {
                (ExErrorKind::AlreadyExists, Some(*uuid), None)
            }
            PatchError::UnsupportedEdit { uuid, .. } => {
                (ExErrorKind::UnsupportedEdit, Some(*uuid), None)
            }
            PatchError::RollbackFailed { .. } => (ExErrorKind::RollbackFailed, None, None),
            PatchError::Restore(inner) => return inner.clone().into(),
            PatchError::Model(inner) => return inner.clone().into(),
            PatchError::Diff(inner) => return inner.clone().into(),
        };
        let mut ex = ExError::new(kind).with_message(err.to_string());
        if let Some(uuid) = uuid {
            ex = ex.with_node_uuid(uuid);
        }
        if let Some(property) = property {
            ex = ex.with_property(property);
        }
        ex
    }
}

impl From<PolyVectorError> for ExError {
    fn from(err: PolyVectorError) -> Self {
        ExError::new(ExErrorKind::NotCloneable).with_message(err.to_string())
    }
}

impl From<std::io::Error> for ExError {
    fn from(err: std::io::Error) -> Self {
        ExError::new(ExErrorKind::Io).with_message(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ExErrorKind::UnknownType.code(), "ERR_UNKNOWN_TYPE");
        assert_eq!(
            ExErrorKind::MalformedProperty.code(),
            "ERR_MALFORMED_PROPERTY"
        );
        assert_eq!(ExErrorKind::IdentityMismatch.code(), "ERR_IDENTITY_MISMATCH");
        assert_eq!(ExErrorKind::TargetNotFound.code(), "ERR_TARGET_NOT_FOUND");
        assert_eq!(
            ExErrorKind::ReadOnlyViolation.code(),
            "ERR_READ_ONLY_VIOLATION"
        );
        assert_eq!(ExErrorKind::Parse.code(), "ERR_PARSE");
    }

    #[test]
    fn test_display_includes_context() {
        let uuid = Uuid::nil();
        let err = ExError::new(ExErrorKind::TargetNotFound)
            .with_op("patch")
            .with_node_uuid(uuid)
            .with_message("missing");
        let text = err.to_string();
        assert!(text.starts_with("[ERR_TARGET_NOT_FOUND] in operation 'patch': missing"));
        assert!(text.contains(&uuid.braced().to_string()));
    }

    #[test]
    fn test_nested_model_error_keeps_property_kind() {
        let err = ModelError::Property(PropertyError::ReadOnly {
            ident: "value".to_string(),
        });
        let ex: ExError = err.into();
        assert_eq!(ex.kind(), ExErrorKind::ReadOnlyViolation);
        assert_eq!(ex.property(), Some("value"));
    }

    #[test]
    fn test_patch_error_carries_uuid() {
        let uuid = Uuid::new_v4();
        let ex: ExError = PatchError::TargetNotFound { uuid }.into();
        assert_eq!(ex.code(), "ERR_TARGET_NOT_FOUND");
        assert_eq!(ex.node_uuid(), Some(uuid));
    }
}
