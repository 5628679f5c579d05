//! Static ownership declarations of resource types.
//!
//! A [`ResourceType`] lists which ownership fields its documents carry. This
//! declaration is the contract the scope resolver consults: a field that is
//! not declared is never used for scoping, and a scope class whose required
//! field is not declared cannot be resolved.

/// Ownership dimension of a document field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnershipKind {
    /// Owning company (tenant).
    Tenant,
    /// Owning department (single-valued).
    Department,
    /// Departments a document targets (multi-valued).
    TargetDepartments,
    /// Principals a document is assigned to (multi-valued).
    AssignedTo,
    /// Principal who created the document.
    CreatedBy,
    /// Principal the document belongs to.
    UserId,
}

impl OwnershipKind {
    /// True if documents store a list of values in this field.
    #[inline]
    #[must_use]
    pub const fn is_multi_valued(self) -> bool {
        matches!(
            self,
            OwnershipKind::TargetDepartments | OwnershipKind::AssignedTo
        )
    }

    /// True for principal-level ownership (`assigned_to`, `created_by`, `user_id`).
    #[inline]
    #[must_use]
    pub const fn is_identity(self) -> bool {
        matches!(
            self,
            OwnershipKind::AssignedTo | OwnershipKind::CreatedBy | OwnershipKind::UserId
        )
    }

    /// True for department-level ownership.
    #[inline]
    #[must_use]
    pub const fn is_department_level(self) -> bool {
        matches!(
            self,
            OwnershipKind::Department | OwnershipKind::TargetDepartments
        )
    }
}

/// An ownership kind bound to a concrete document field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OwnershipField {
    pub kind: OwnershipKind,
    pub field: &'static str,
}

impl OwnershipField {
    pub const COMPANY_ID: Self = Self::new(OwnershipKind::Tenant, "company_id");
    pub const DEPARTMENT_ID: Self = Self::new(OwnershipKind::Department, "department_id");
    pub const TARGET_DEPARTMENTS: Self =
        Self::new(OwnershipKind::TargetDepartments, "target_departments");
    pub const ASSIGNED_TO: Self = Self::new(OwnershipKind::AssignedTo, "assigned_to");
    pub const CREATED_BY: Self = Self::new(OwnershipKind::CreatedBy, "created_by");
    pub const USER_ID: Self = Self::new(OwnershipKind::UserId, "user_id");

    #[must_use]
    pub const fn new(kind: OwnershipKind, field: &'static str) -> Self {
        Self { kind, field }
    }
}

/// Static descriptor for a resource type and its declared ownership fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceType {
    /// Resource type name (e.g. `"action_plans"`).
    pub name: &'static str,
    /// Store collection holding the documents.
    pub collection: &'static str,
    /// Declared ownership fields.
    pub ownership: &'static [OwnershipField],
}

impl ResourceType {
    /// Declared fields of the given kind, in declaration order.
    pub fn fields_of(&self, kind: OwnershipKind) -> impl Iterator<Item = &'static OwnershipField> {
        self.ownership.iter().filter(move |f| f.kind == kind)
    }

    /// First declared field of the given kind.
    #[must_use]
    pub fn field_for(&self, kind: OwnershipKind) -> Option<&'static OwnershipField> {
        self.fields_of(kind).next()
    }

    #[must_use]
    pub fn declares(&self, kind: OwnershipKind) -> bool {
        self.field_for(kind).is_some()
    }

    /// Department-level fields (`Department` and `TargetDepartments`).
    pub fn department_fields(&self) -> impl Iterator<Item = &'static OwnershipField> {
        self.ownership
            .iter()
            .filter(|f| f.kind.is_department_level())
    }

    /// Identity fields (`AssignedTo`, `CreatedBy`, `UserId`).
    pub fn identity_fields(&self) -> impl Iterator<Item = &'static OwnershipField> {
        self.ownership.iter().filter(|f| f.kind.is_identity())
    }

    /// True if the type declares no ownership fields at all.
    #[inline]
    #[must_use]
    pub fn is_unowned(&self) -> bool {
        self.ownership.is_empty()
    }
}
