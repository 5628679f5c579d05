//! Resource types of the climate product and their ownership declarations.

use crate::resource::{OwnershipField, OwnershipKind, ResourceType};

pub const USERS: ResourceType = ResourceType {
    name: "users",
    collection: "users",
    ownership: &[
        OwnershipField::COMPANY_ID,
        OwnershipField::DEPARTMENT_ID,
        OwnershipField::new(OwnershipKind::UserId, "_id"),
    ],
};

pub const COMPANIES: ResourceType = ResourceType {
    name: "companies",
    collection: "companies",
    ownership: &[OwnershipField::new(OwnershipKind::Tenant, "_id")],
};

pub const DEPARTMENTS: ResourceType = ResourceType {
    name: "departments",
    collection: "departments",
    ownership: &[
        OwnershipField::COMPANY_ID,
        OwnershipField::new(OwnershipKind::Department, "_id"),
    ],
};

pub const SURVEYS: ResourceType = ResourceType {
    name: "surveys",
    collection: "surveys",
    ownership: &[
        OwnershipField::COMPANY_ID,
        OwnershipField::TARGET_DEPARTMENTS,
        OwnershipField::CREATED_BY,
    ],
};

pub const SURVEY_RESPONSES: ResourceType = ResourceType {
    name: "survey_responses",
    collection: "responses",
    ownership: &[
        OwnershipField::COMPANY_ID,
        OwnershipField::DEPARTMENT_ID,
        OwnershipField::USER_ID,
    ],
};

pub const MICROCLIMATES: ResourceType = ResourceType {
    name: "microclimates",
    collection: "microclimates",
    ownership: &[
        OwnershipField::COMPANY_ID,
        OwnershipField::TARGET_DEPARTMENTS,
        OwnershipField::CREATED_BY,
    ],
};

pub const ACTION_PLANS: ResourceType = ResourceType {
    name: "action_plans",
    collection: "action_plans",
    ownership: &[
        OwnershipField::COMPANY_ID,
        OwnershipField::DEPARTMENT_ID,
        OwnershipField::ASSIGNED_TO,
        OwnershipField::CREATED_BY,
    ],
};

pub const BENCHMARKS: ResourceType = ResourceType {
    name: "benchmarks",
    collection: "benchmarks",
    ownership: &[
        OwnershipField::COMPANY_ID,
        OwnershipField::DEPARTMENT_ID,
        OwnershipField::CREATED_BY,
    ],
};

/// Global question bank. Declares no ownership, so only unrestricted
/// principals can query it.
pub const QUESTIONS: ResourceType = ResourceType {
    name: "questions",
    collection: "questions",
    ownership: &[],
};

pub const ALL: &[ResourceType] = &[
    USERS,
    COMPANIES,
    DEPARTMENTS,
    SURVEYS,
    SURVEY_RESPONSES,
    MICROCLIMATES,
    ACTION_PLANS,
    BENCHMARKS,
    QUESTIONS,
];
