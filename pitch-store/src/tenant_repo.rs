use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pitch_core::repository::{RepoResult, TenantRepository};
use pitch_core::{RepositoryError, Tenant, TenantSettings, User};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::database::db_error;
use crate::identity_repo::insert_user;

pub struct StoreTenantRepository {
    pool: PgPool,
}

impl StoreTenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct TenantRow {
    id: Uuid,
    name: String,
    slug: String,
    currency: String,
    utc_offset_minutes: i32,
    contact_email: Option<String>,
    contact_phone: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<TenantRow> for Tenant {
    fn from(row: TenantRow) -> Self {
        Tenant {
            id: row.id,
            name: row.name,
            slug: row.slug,
            settings: TenantSettings {
                currency: row.currency.trim().to_string(),
                utc_offset_minutes: row.utc_offset_minutes,
                contact_email: row.contact_email,
                contact_phone: row.contact_phone,
            },
            created_at: row.created_at,
        }
    }
}

async fn insert_tenant(conn: &mut PgConnection, tenant: &Tenant) -> RepoResult<()> {
    sqlx::query(
        r#"
        INSERT INTO tenants (id, name, slug, currency, utc_offset_minutes, contact_email, contact_phone, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(tenant.id)
    .bind(&tenant.name)
    .bind(&tenant.slug)
    .bind(&tenant.settings.currency)
    .bind(tenant.settings.utc_offset_minutes)
    .bind(&tenant.settings.contact_email)
    .bind(&tenant.settings.contact_phone)
    .bind(tenant.created_at)
    .execute(conn)
    .await
    .map_err(db_error)?;

    Ok(())
}

const TENANT_COLUMNS: &str =
    "id, name, slug, currency, utc_offset_minutes, contact_email, contact_phone, created_at";

#[async_trait]
impl TenantRepository for StoreTenantRepository {
    async fn create_tenant(&self, tenant: &Tenant) -> RepoResult<()> {
        let mut conn = self.pool.acquire().await.map_err(db_error)?;
        insert_tenant(&mut conn, tenant).await
    }

    async fn register_tenant(&self, tenant: &Tenant, owner: &User) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        insert_tenant(&mut tx, tenant).await?;
        insert_user(&mut tx, owner).await?;
        tx.commit().await.map_err(db_error)?;
        Ok(())
    }

    async fn get_tenant(&self, id: Uuid) -> RepoResult<Option<Tenant>> {
        let row: Option<TenantRow> =
            sqlx::query_as(&format!("SELECT {} FROM tenants WHERE id = $1", TENANT_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;

        Ok(row.map(Tenant::from))
    }

    async fn get_tenant_by_slug(&self, slug: &str) -> RepoResult<Option<Tenant>> {
        let row: Option<TenantRow> =
            sqlx::query_as(&format!("SELECT {} FROM tenants WHERE slug = $1", TENANT_COLUMNS))
                .bind(slug)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;

        Ok(row.map(Tenant::from))
    }

    async fn update_settings(&self, id: Uuid, settings: &TenantSettings) -> RepoResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE tenants
            SET currency = $2, utc_offset_minutes = $3, contact_email = $4, contact_phone = $5
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&settings.currency)
        .bind(settings.utc_offset_minutes)
        .bind(&settings.contact_email)
        .bind(&settings.contact_phone)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("tenant {}", id)));
        }
        Ok(())
    }
}
