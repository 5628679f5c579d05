//! Role hierarchy model.
//!
//! Every capability and scope decision funnels through a [`RoleHierarchy`]
//! lookup. Lookups are total: a role the table does not define (including any
//! [`Role::Unrecognized`] value) resolves to no capabilities and the most
//! restrictive scope class.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use crate::capabilities::{Capability, names};

/// Principal role.
///
/// Parsing never fails: unknown role strings become [`Role::Unrecognized`] so
/// that the lookup layer can deny them explicitly.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    SuperAdmin,
    CompanyAdmin,
    DepartmentAdmin,
    Leader,
    Supervisor,
    Employee,
    /// A role string outside the hierarchy. Always fails closed.
    Unrecognized(String),
}

impl Role {
    /// All roles of the hierarchy, most privileged first.
    #[must_use]
    pub fn known() -> [Role; 6] {
        [
            Role::SuperAdmin,
            Role::CompanyAdmin,
            Role::DepartmentAdmin,
            Role::Leader,
            Role::Supervisor,
            Role::Employee,
        ]
    }

    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "super_admin" => Role::SuperAdmin,
            "company_admin" => Role::CompanyAdmin,
            "department_admin" => Role::DepartmentAdmin,
            "leader" => Role::Leader,
            "supervisor" => Role::Supervisor,
            "employee" => Role::Employee,
            other => Role::Unrecognized(other.to_owned()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::CompanyAdmin => "company_admin",
            Role::DepartmentAdmin => "department_admin",
            Role::Leader => "leader",
            Role::Supervisor => "supervisor",
            Role::Employee => "employee",
            Role::Unrecognized(s) => s,
        }
    }

    #[must_use]
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Role::Unrecognized(_))
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        Role::parse(s)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl serde::Serialize for Role {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Role::parse(&s))
    }
}

/// Granularity at which a role's visibility is restricted.
///
/// Ordered from most to least restrictive, so `a >= b` means `a` sees at
/// least everything `b` sees.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ScopeClass {
    Individual,
    Department,
    Tenant,
    Unrestricted,
}

impl ScopeClass {
    pub const MOST_RESTRICTIVE: ScopeClass = ScopeClass::Individual;

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ScopeClass::Individual => "individual",
            ScopeClass::Department => "department",
            ScopeClass::Tenant => "tenant",
            ScopeClass::Unrestricted => "unrestricted",
        }
    }
}

impl fmt::Display for ScopeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scope class and capability set of one role.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoleDefinition {
    pub scope_class: ScopeClass,
    pub capabilities: BTreeSet<Capability>,
}

impl RoleDefinition {
    fn new(scope_class: ScopeClass, capabilities: &[&str]) -> Self {
        Self {
            scope_class,
            capabilities: capabilities.iter().map(|c| Capability::from(*c)).collect(),
        }
    }
}

static NO_CAPABILITIES: BTreeSet<Capability> = BTreeSet::new();

/// Immutable role table: role -> scope class + capability set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoleHierarchy {
    roles: HashMap<Role, RoleDefinition>,
}

impl RoleHierarchy {
    /// The product's default role table.
    #[must_use]
    pub fn builtin() -> Self {
        use names::{
            BENCHMARK_CREATE, BENCHMARK_DELETE, BENCHMARK_READ, BENCHMARK_UPDATE, EXPORT_REPORTS,
            GLOBAL_SETTINGS, MANAGE_ACTION_PLANS, MANAGE_COMPANIES, MANAGE_DEPARTMENTS,
            MANAGE_QUESTIONS, MANAGE_SURVEYS, MANAGE_USERS, RESPOND_SURVEYS, VIEW_ACTION_PLANS,
            VIEW_DASHBOARD,
        };

        let mut roles = HashMap::new();
        roles.insert(
            Role::SuperAdmin,
            RoleDefinition::new(
                ScopeClass::Unrestricted,
                &[
                    GLOBAL_SETTINGS,
                    MANAGE_COMPANIES,
                    MANAGE_USERS,
                    MANAGE_DEPARTMENTS,
                    MANAGE_QUESTIONS,
                    MANAGE_SURVEYS,
                    MANAGE_ACTION_PLANS,
                    VIEW_ACTION_PLANS,
                    EXPORT_REPORTS,
                    VIEW_DASHBOARD,
                    BENCHMARK_READ,
                    BENCHMARK_CREATE,
                    BENCHMARK_UPDATE,
                    BENCHMARK_DELETE,
                ],
            ),
        );
        roles.insert(
            Role::CompanyAdmin,
            RoleDefinition::new(
                ScopeClass::Tenant,
                &[
                    MANAGE_USERS,
                    MANAGE_DEPARTMENTS,
                    MANAGE_SURVEYS,
                    MANAGE_ACTION_PLANS,
                    VIEW_ACTION_PLANS,
                    EXPORT_REPORTS,
                    VIEW_DASHBOARD,
                    BENCHMARK_READ,
                    BENCHMARK_CREATE,
                    BENCHMARK_UPDATE,
                ],
            ),
        );
        roles.insert(
            Role::DepartmentAdmin,
            RoleDefinition::new(
                ScopeClass::Department,
                &[
                    MANAGE_USERS,
                    MANAGE_SURVEYS,
                    MANAGE_ACTION_PLANS,
                    VIEW_ACTION_PLANS,
                    EXPORT_REPORTS,
                    VIEW_DASHBOARD,
                ],
            ),
        );
        roles.insert(
            Role::Leader,
            RoleDefinition::new(
                ScopeClass::Department,
                &[
                    MANAGE_ACTION_PLANS,
                    VIEW_ACTION_PLANS,
                    RESPOND_SURVEYS,
                    VIEW_DASHBOARD,
                    BENCHMARK_READ,
                ],
            ),
        );
        roles.insert(
            Role::Supervisor,
            RoleDefinition::new(
                ScopeClass::Department,
                &[VIEW_ACTION_PLANS, RESPOND_SURVEYS, VIEW_DASHBOARD],
            ),
        );
        roles.insert(
            Role::Employee,
            RoleDefinition::new(
                ScopeClass::Individual,
                &[RESPOND_SURVEYS, VIEW_ACTION_PLANS],
            ),
        );
        Self { roles }
    }

    /// Build a role table from configuration data.
    ///
    /// # Errors
    ///
    /// Returns [`RoleConfigError`] if the table names a role outside the
    /// hierarchy, omits a known role, grants `unrestricted` to anything but
    /// `super_admin`, restricts `super_admin`, or contains a malformed
    /// capability name.
    pub fn from_config(config: &RoleTableConfig) -> Result<Self, RoleConfigError> {
        let mut roles = HashMap::with_capacity(config.roles.len());

        for (name, entry) in &config.roles {
            let role = Role::parse(name);
            if !role.is_recognized() {
                return Err(RoleConfigError::UnknownRole(name.clone()));
            }

            match (&role, entry.scope) {
                (Role::SuperAdmin, ScopeClass::Unrestricted) => {}
                (Role::SuperAdmin, other) => {
                    return Err(RoleConfigError::SuperAdminRestricted(other));
                }
                (_, ScopeClass::Unrestricted) => {
                    return Err(RoleConfigError::UnrestrictedNotAllowed(name.clone()));
                }
                _ => {}
            }

            let mut capabilities = BTreeSet::new();
            for cap in &entry.capabilities {
                if !Capability::is_valid_name(cap) {
                    return Err(RoleConfigError::InvalidCapability {
                        role: name.clone(),
                        capability: cap.clone(),
                    });
                }
                capabilities.insert(Capability::from(cap.as_str()));
            }

            roles.insert(
                role,
                RoleDefinition {
                    scope_class: entry.scope,
                    capabilities,
                },
            );
        }

        if let Some(missing) = Role::known().into_iter().find(|r| !roles.contains_key(r)) {
            return Err(RoleConfigError::MissingRole(missing.as_str().to_owned()));
        }

        Ok(Self { roles })
    }

    /// Render this table as configuration data (inverse of [`Self::from_config`]).
    #[must_use]
    pub fn to_config(&self) -> RoleTableConfig {
        let roles = self
            .roles
            .iter()
            .map(|(role, def)| {
                (
                    role.as_str().to_owned(),
                    RoleEntryConfig {
                        scope: def.scope_class,
                        capabilities: def
                            .capabilities
                            .iter()
                            .map(|c| c.as_str().to_owned())
                            .collect(),
                    },
                )
            })
            .collect();
        RoleTableConfig { roles }
    }

    #[must_use]
    pub fn definition(&self, role: &Role) -> Option<&RoleDefinition> {
        self.roles.get(role)
    }

    /// Scope class of `role`; undefined roles get [`ScopeClass::MOST_RESTRICTIVE`].
    #[must_use]
    pub fn scope_class_of(&self, role: &Role) -> ScopeClass {
        self.definition(role)
            .map_or(ScopeClass::MOST_RESTRICTIVE, |d| d.scope_class)
    }

    /// Capability set of `role`; undefined roles get the empty set.
    #[must_use]
    pub fn capabilities_of(&self, role: &Role) -> &BTreeSet<Capability> {
        self.definition(role)
            .map_or(&NO_CAPABILITIES, |d| &d.capabilities)
    }

    #[must_use]
    pub fn role_grants(&self, role: &Role, capability: &str) -> bool {
        self.capabilities_of(role).contains(capability)
    }
}

impl Default for RoleHierarchy {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Reviewable, serde-friendly form of a role table.
///
/// ```yaml
/// roles:
///   super_admin:
///     scope: unrestricted
///     capabilities: [GLOBAL_SETTINGS, "benchmark:read"]
///   employee:
///     scope: individual
///     capabilities: [respond_surveys]
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleTableConfig {
    pub roles: BTreeMap<String, RoleEntryConfig>,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleEntryConfig {
    pub scope: ScopeClass,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

/// Errors raised while building a [`RoleHierarchy`] from configuration.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RoleConfigError {
    #[error("role table names unknown role '{0}'")]
    UnknownRole(String),

    #[error("role table does not define role '{0}'")]
    MissingRole(String),

    #[error("role '{0}' may not have unrestricted scope")]
    UnrestrictedNotAllowed(String),

    #[error("super_admin must be unrestricted, got {0}")]
    SuperAdminRestricted(ScopeClass),

    #[error("role '{role}' has invalid capability name '{capability}'")]
    InvalidCapability { role: String, capability: String },
}
