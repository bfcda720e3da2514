use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pitch_core::repository::{RepoResult, RoleRepository, UserRepository};
use pitch_core::{Permission, RepositoryError, Role, User};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::database::{corrupt, db_error};

/// Users and roles share the `user_roles` link table, so one repository serves both.
pub struct StoreIdentityRepository {
    pool: PgPool,
}

impl StoreIdentityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    tenant_id: Uuid,
    email: String,
    name: String,
    password_hash: String,
    is_owner: bool,
    role_ids: Vec<Uuid>,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            tenant_id: row.tenant_id,
            email: row.email,
            name: row.name,
            password_hash: row.password_hash,
            role_ids: row.role_ids,
            is_owner: row.is_owner,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RoleRow {
    id: Uuid,
    tenant_id: Uuid,
    name: String,
    description: Option<String>,
    permissions: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RoleRow> for Role {
    type Error = RepositoryError;

    fn try_from(row: RoleRow) -> Result<Self, Self::Error> {
        let permissions = row
            .permissions
            .iter()
            .map(|p| p.parse::<Permission>())
            .collect::<Result<_, _>>()
            .map_err(|e| corrupt("role permissions", e))?;

        Ok(Role {
            id: row.id,
            tenant_id: row.tenant_id,
            name: row.name,
            description: row.description,
            permissions,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const USER_SELECT: &str = r#"
    SELECT u.id, u.tenant_id, u.email, u.name, u.password_hash, u.is_owner, u.created_at,
           COALESCE(array_agg(ur.role_id) FILTER (WHERE ur.role_id IS NOT NULL), '{}') AS role_ids
    FROM users u
    LEFT JOIN user_roles ur ON ur.user_id = u.id
"#;

const ROLE_COLUMNS: &str = "id, tenant_id, name, description, permissions, created_at, updated_at";

fn permission_names(role: &Role) -> Vec<String> {
    role.permissions.iter().map(|p| p.as_str().to_string()).collect()
}

/// Inserts the user and its role links on an open connection or transaction.
pub(crate) async fn insert_user(conn: &mut PgConnection, user: &User) -> RepoResult<()> {
    sqlx::query(
        r#"
        INSERT INTO users (id, tenant_id, email, name, password_hash, is_owner, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(user.id)
    .bind(user.tenant_id)
    .bind(&user.email)
    .bind(&user.name)
    .bind(&user.password_hash)
    .bind(user.is_owner)
    .bind(user.created_at)
    .execute(&mut *conn)
    .await
    .map_err(db_error)?;

    for role_id in &user.role_ids {
        sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2)")
            .bind(user.id)
            .bind(role_id)
            .execute(&mut *conn)
            .await
            .map_err(db_error)?;
    }
    Ok(())
}

#[async_trait]
impl UserRepository for StoreIdentityRepository {
    async fn create_user(&self, user: &User) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        insert_user(&mut tx, user).await?;
        tx.commit().await.map_err(db_error)?;
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!("{} WHERE u.id = $1 GROUP BY u.id", USER_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(row.map(User::from))
    }

    async fn find_user_by_email(&self, tenant_id: Uuid, email: &str) -> RepoResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "{} WHERE u.tenant_id = $1 AND u.email = $2 GROUP BY u.id",
            USER_SELECT
        ))
        .bind(tenant_id)
        .bind(email.trim().to_lowercase())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(User::from))
    }

    async fn list_users(&self, tenant_id: Uuid) -> RepoResult<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "{} WHERE u.tenant_id = $1 GROUP BY u.id ORDER BY u.created_at",
            USER_SELECT
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn set_user_roles(&self, user_id: Uuid, role_ids: &[Uuid]) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?;
        if exists.is_none() {
            return Err(RepositoryError::NotFound(format!("user {}", user_id)));
        }

        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        for role_id in role_ids {
            sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
                .bind(user_id)
                .bind(role_id)
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)?;
        Ok(())
    }
}

#[async_trait]
impl RoleRepository for StoreIdentityRepository {
    async fn create_role(&self, role: &Role) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO roles (id, tenant_id, name, description, permissions, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(role.id)
        .bind(role.tenant_id)
        .bind(&role.name)
        .bind(&role.description)
        .bind(permission_names(role))
        .bind(role.created_at)
        .bind(role.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn get_role(&self, id: Uuid) -> RepoResult<Option<Role>> {
        let row: Option<RoleRow> = sqlx::query_as(&format!("SELECT {} FROM roles WHERE id = $1", ROLE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        row.map(Role::try_from).transpose()
    }

    async fn list_roles(&self, tenant_id: Uuid) -> RepoResult<Vec<Role>> {
        let rows: Vec<RoleRow> = sqlx::query_as(&format!(
            "SELECT {} FROM roles WHERE tenant_id = $1 ORDER BY name",
            ROLE_COLUMNS
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(Role::try_from).collect()
    }

    async fn update_role(&self, role: &Role) -> RepoResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE roles
            SET name = $2, description = $3, permissions = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(role.id)
        .bind(&role.name)
        .bind(&role.description)
        .bind(permission_names(role))
        .bind(role.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("role {}", role.id)));
        }
        Ok(())
    }

    async fn delete_role(&self, id: Uuid) -> RepoResult<()> {
        // user_roles rows go with it via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("role {}", id)));
        }
        Ok(())
    }
}
