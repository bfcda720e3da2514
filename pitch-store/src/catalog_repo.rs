use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pitch_catalog::{DayOfWeek, Field, Schedule, SportType};
use pitch_core::repository::{FieldRepository, RepoResult};
use pitch_core::RepositoryError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::{corrupt, db_error};

pub struct StoreFieldRepository {
    pool: PgPool,
}

impl StoreFieldRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct FieldRow {
    id: Uuid,
    tenant_id: Uuid,
    owner_id: Option<Uuid>,
    name: String,
    sport_type: String,
    price_per_hour: i64,
    night_price_per_hour: Option<i64>,
    address: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    images: Vec<String>,
    is_available: bool,
    features: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<FieldRow> for Field {
    type Error = RepositoryError;

    fn try_from(row: FieldRow) -> Result<Self, Self::Error> {
        Ok(Field {
            id: row.id,
            tenant_id: row.tenant_id,
            owner_id: row.owner_id,
            name: row.name,
            sport_type: row.sport_type.parse().map_err(|e| corrupt("field sport_type", e))?,
            price_per_hour: row.price_per_hour,
            night_price_per_hour: row.night_price_per_hour,
            address: row.address,
            latitude: row.latitude,
            longitude: row.longitude,
            images: row.images,
            is_available: row.is_available,
            features: row.features,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ScheduleRow {
    id: Uuid,
    field_id: Uuid,
    day_of_week: String,
    start_time: String,
    end_time: String,
}

impl TryFrom<ScheduleRow> for Schedule {
    type Error = RepositoryError;

    fn try_from(row: ScheduleRow) -> Result<Self, Self::Error> {
        Schedule::from_parts(row.id, row.field_id, &row.day_of_week, &row.start_time, &row.end_time)
            .map_err(|e| corrupt("schedule", e))
    }
}

const FIELD_COLUMNS: &str = "id, tenant_id, owner_id, name, sport_type, price_per_hour, night_price_per_hour, \
     address, latitude, longitude, images, is_available, features, created_at, updated_at";

#[async_trait]
impl FieldRepository for StoreFieldRepository {
    async fn create_field(&self, field: &Field) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO fields (id, tenant_id, owner_id, name, sport_type, price_per_hour, night_price_per_hour,
                                address, latitude, longitude, images, is_available, features, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(field.id)
        .bind(field.tenant_id)
        .bind(field.owner_id)
        .bind(&field.name)
        .bind(field.sport_type.as_str())
        .bind(field.price_per_hour)
        .bind(field.night_price_per_hour)
        .bind(&field.address)
        .bind(field.latitude)
        .bind(field.longitude)
        .bind(&field.images)
        .bind(field.is_available)
        .bind(&field.features)
        .bind(field.created_at)
        .bind(field.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn get_field(&self, id: Uuid) -> RepoResult<Option<Field>> {
        let row: Option<FieldRow> = sqlx::query_as(&format!("SELECT {} FROM fields WHERE id = $1", FIELD_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        row.map(Field::try_from).transpose()
    }

    async fn list_fields(&self, tenant_id: Uuid, sport_type: Option<SportType>) -> RepoResult<Vec<Field>> {
        let rows: Vec<FieldRow> = sqlx::query_as(&format!(
            "SELECT {} FROM fields WHERE tenant_id = $1 AND ($2::TEXT IS NULL OR sport_type = $2) ORDER BY name",
            FIELD_COLUMNS
        ))
        .bind(tenant_id)
        .bind(sport_type.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(Field::try_from).collect()
    }

    async fn update_field(&self, field: &Field) -> RepoResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE fields
            SET owner_id = $2, name = $3, sport_type = $4, price_per_hour = $5, night_price_per_hour = $6,
                address = $7, latitude = $8, longitude = $9, images = $10, is_available = $11,
                features = $12, updated_at = $13
            WHERE id = $1
            "#,
        )
        .bind(field.id)
        .bind(field.owner_id)
        .bind(&field.name)
        .bind(field.sport_type.as_str())
        .bind(field.price_per_hour)
        .bind(field.night_price_per_hour)
        .bind(&field.address)
        .bind(field.latitude)
        .bind(field.longitude)
        .bind(&field.images)
        .bind(field.is_available)
        .bind(&field.features)
        .bind(field.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("field {}", field.id)));
        }
        Ok(())
    }

    async fn delete_field(&self, id: Uuid) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let (live,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM reservations WHERE field_id = $1 AND status IN ('PENDING', 'CONFIRMED')",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;
        if live > 0 {
            return Err(RepositoryError::Conflict(format!("field {} has {} live reservations", id, live)));
        }

        let result = sqlx::query("DELETE FROM fields WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("field {}", id)));
        }

        tx.commit().await.map_err(db_error)?;
        Ok(())
    }

    async fn list_schedules(&self, field_id: Uuid) -> RepoResult<Vec<Schedule>> {
        let rows: Vec<ScheduleRow> = sqlx::query_as(
            "SELECT id, field_id, day_of_week, start_time, end_time FROM schedules WHERE field_id = $1",
        )
        .bind(field_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        let mut schedules = rows.into_iter().map(Schedule::try_from).collect::<RepoResult<Vec<_>>>()?;
        schedules.sort_by_key(|s| s.day_of_week);
        Ok(schedules)
    }

    async fn replace_schedules(&self, field_id: Uuid, schedules: &[Schedule]) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        sqlx::query("DELETE FROM schedules WHERE field_id = $1")
            .bind(field_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        for schedule in schedules {
            sqlx::query(
                r#"
                INSERT INTO schedules (id, field_id, day_of_week, start_time, end_time)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(schedule.id)
            .bind(field_id)
            .bind(schedule.day_of_week.as_str())
            .bind(schedule.start_time.to_string())
            .bind(schedule.end_time.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)?;
        Ok(())
    }

    async fn delete_schedule(&self, field_id: Uuid, day: DayOfWeek) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM schedules WHERE field_id = $1 AND day_of_week = $2")
            .bind(field_id)
            .bind(day.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("{} schedule of field {}", day, field_id)));
        }
        Ok(())
    }
}
