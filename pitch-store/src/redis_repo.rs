use pitch_booking::SlotKey;
use redis::{AsyncCommands, RedisResult};
use tracing::debug;
use uuid::Uuid;

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

pub fn slot_hold_key(field_id: Uuid, slot: &SlotKey) -> String {
    format!("hold:{}:{}", field_id, slot)
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        // Fail at startup rather than on the first request
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(Self { client })
    }

    /// Short-lived exclusive hold on one slot while its reservation is committed.
    pub async fn acquire_slot_hold(&self, key: &str, holder: &str, ttl_seconds: u64) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        // SET NX: Only set if key does not exist
        let result: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(holder)
            .arg("NX")
            .arg("EX")
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await?;

        debug!("Slot hold {} for {}: {}", key, holder, result.is_some());
        Ok(result.is_some())
    }

    /// Deletes the hold only if `holder` still owns it.
    pub async fn release_slot_hold(&self, key: &str, holder: &str) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let script = redis::Script::new(r#"
            if redis.call("GET", KEYS[1]) == ARGV[1] then
                return redis.call("DEL", KEYS[1])
            else
                return 0
            end
        "#);

        let _: i64 = script.key(key).arg(holder).invoke_async(&mut conn).await?;
        Ok(())
    }

    pub async fn publish(&self, channel: &str, payload: &str) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: i64 = conn.publish(channel, payload).await?;
        Ok(())
    }

    pub async fn check_rate_limit(&self, key: &str, limit: i64, window_seconds: i64) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let (count,): (i64,) = redis::pipe()
            .atomic()
            .incr(key, 1)
            .expire(key, window_seconds)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(count <= limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_hold_key_format() {
        let field_id = Uuid::nil();
        let slot = SlotKey::new(NaiveDate::from_ymd_opt(2030, 1, 7).unwrap(), "08:00".parse().unwrap());
        assert_eq!(
            slot_hold_key(field_id, &slot),
            "hold:00000000-0000-0000-0000-000000000000:2030-01-07-08:00"
        );
    }
}
