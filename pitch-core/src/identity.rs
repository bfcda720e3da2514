use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::{CoreError, CoreResult};

/// Capabilities a role can grant inside a tenant
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Permission {
    #[serde(rename = "fields:read")]
    FieldsRead,
    #[serde(rename = "fields:write")]
    FieldsWrite,
    #[serde(rename = "schedules:write")]
    SchedulesWrite,
    #[serde(rename = "reservations:read")]
    ReservationsRead,
    #[serde(rename = "reservations:write")]
    ReservationsWrite,
    #[serde(rename = "payments:write")]
    PaymentsWrite,
    #[serde(rename = "roles:manage")]
    RolesManage,
    #[serde(rename = "users:manage")]
    UsersManage,
    #[serde(rename = "tenant:manage")]
    TenantManage,
}

impl Permission {
    pub const ALL: [Permission; 9] = [
        Permission::FieldsRead,
        Permission::FieldsWrite,
        Permission::SchedulesWrite,
        Permission::ReservationsRead,
        Permission::ReservationsWrite,
        Permission::PaymentsWrite,
        Permission::RolesManage,
        Permission::UsersManage,
        Permission::TenantManage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::FieldsRead => "fields:read",
            Permission::FieldsWrite => "fields:write",
            Permission::SchedulesWrite => "schedules:write",
            Permission::ReservationsRead => "reservations:read",
            Permission::ReservationsWrite => "reservations:write",
            Permission::PaymentsWrite => "payments:write",
            Permission::RolesManage => "roles:manage",
            Permission::UsersManage => "users:manage",
            Permission::TenantManage => "tenant:manage",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| CoreError::ValidationError(format!("unknown permission {}", s)))
    }
}

/// Named permission set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Role {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub permissions: BTreeSet<Permission>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: BTreeSet<Permission>,
}

impl Role {
    pub fn new(tenant_id: Uuid, input: RoleInput) -> CoreResult<Self> {
        validate_role_name(&input.name)?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            tenant_id,
            name: input.name.trim().to_string(),
            description: input.description,
            permissions: input.permissions,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply(&mut self, input: RoleInput) -> CoreResult<()> {
        validate_role_name(&input.name)?;
        self.name = input.name.trim().to_string();
        self.description = input.description;
        self.permissions = input.permissions;
        self.updated_at = Utc::now();
        Ok(())
    }
}

fn validate_role_name(name: &str) -> CoreResult<()> {
    if name.trim().is_empty() {
        return Err(CoreError::ValidationError("role name is required".to_string()));
    }
    Ok(())
}

/// Dashboard account inside a tenant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role_ids: Vec<Uuid>,
    /// Owners hold every permission regardless of roles.
    pub is_owner: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(tenant_id: Uuid, email: &str, name: &str, password_hash: String, is_owner: bool) -> CoreResult<Self> {
        let email = normalize_email(email)?;
        if name.trim().is_empty() {
            return Err(CoreError::ValidationError("user name is required".to_string()));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            tenant_id,
            email,
            name: name.trim().to_string(),
            password_hash,
            role_ids: Vec::new(),
            is_owner,
            created_at: Utc::now(),
        })
    }
}

pub fn normalize_email(email: &str) -> CoreResult<String> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(CoreError::ValidationError(format!("invalid email {}", email))),
    }
}

/// Resolved identity of an authenticated dashboard request
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub email: String,
    pub is_owner: bool,
    pub permissions: BTreeSet<Permission>,
}

impl Principal {
    /// Union of the permissions of `roles` that belong to the user's tenant.
    pub fn resolve(user: &User, roles: &[Role]) -> Self {
        let permissions = if user.is_owner {
            Permission::ALL.iter().copied().collect()
        } else {
            roles
                .iter()
                .filter(|r| r.tenant_id == user.tenant_id && user.role_ids.contains(&r.id))
                .flat_map(|r| r.permissions.iter().copied())
                .collect()
        };

        Self {
            user_id: user.id,
            tenant_id: user.tenant_id,
            email: user.email.clone(),
            is_owner: user.is_owner,
            permissions,
        }
    }

    pub fn has(&self, permission: Permission) -> bool {
        self.is_owner || self.permissions.contains(&permission)
    }

    pub fn require(&self, permission: Permission) -> CoreResult<()> {
        if self.has(permission) {
            Ok(())
        } else {
            tracing::debug!(user_id = %self.user_id, %permission, "permission denied");
            Err(CoreError::PermissionDenied(permission.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(tenant_id: Uuid, permissions: &[Permission]) -> Role {
        Role::new(
            tenant_id,
            RoleInput {
                name: "Front desk".to_string(),
                description: None,
                permissions: permissions.iter().copied().collect(),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_permission_wire_format() {
        assert_eq!(serde_json::to_string(&Permission::FieldsWrite).unwrap(), "\"fields:write\"");
        assert_eq!("roles:manage".parse::<Permission>().unwrap(), Permission::RolesManage);
        assert!("fields:delete".parse::<Permission>().is_err());
    }

    #[test]
    fn test_principal_resolves_assigned_roles() {
        let tenant_id = Uuid::new_v4();
        let desk = role(tenant_id, &[Permission::ReservationsRead, Permission::ReservationsWrite]);
        let unassigned = role(tenant_id, &[Permission::FieldsWrite]);
        let foreign = role(Uuid::new_v4(), &[Permission::TenantManage]);

        let mut user = User::new(tenant_id, "Desk@Example.com", "Desk", "hash".to_string(), false).unwrap();
        user.role_ids = vec![desk.id, foreign.id];
        assert_eq!(user.email, "desk@example.com");

        let principal = Principal::resolve(&user, &[desk, unassigned, foreign]);
        assert!(principal.has(Permission::ReservationsWrite));
        assert!(!principal.has(Permission::FieldsWrite));
        assert!(!principal.has(Permission::TenantManage));
        assert_eq!(
            principal.require(Permission::FieldsWrite),
            Err(CoreError::PermissionDenied("fields:write".to_string()))
        );
    }

    #[test]
    fn test_owner_has_everything() {
        let user = User::new(Uuid::new_v4(), "owner@example.com", "Owner", "hash".to_string(), true).unwrap();
        let principal = Principal::resolve(&user, &[]);
        assert!(Permission::ALL.iter().all(|p| principal.has(*p)));
    }

    #[test]
    fn test_user_validation() {
        assert!(User::new(Uuid::new_v4(), "nope", "X", String::new(), false).is_err());
        assert!(User::new(Uuid::new_v4(), "a@b.co", " ", String::new(), false).is_err());
    }

    #[test]
    fn test_password_hash_is_not_serialized() {
        let user = User::new(Uuid::new_v4(), "a@b.co", "A", "secret-hash".to_string(), false).unwrap();
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
    }
}
