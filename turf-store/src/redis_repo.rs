use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use redis::AsyncCommands;
use tracing::{debug, info};
use turf_core::repository::{HoldAttempt, HoldStore};
use turf_core::slot::{self, Slot};
use turf_core::{Hold, StoreError};
use uuid::Uuid;

/// Redis drops a key this long after its hold lapses. Liveness is always
/// decided from the stored expiry, never from the key's presence.
const EXPIRY_GRACE_MS: i64 = 1_000;

const PLACE_SCRIPT: &str = r#"
local n = tonumber(ARGV[4])
local now = tonumber(ARGV[2])
local contended = {}
for i = 1, n do
    local v = redis.call('GET', KEYS[i])
    if v then
        local sep = string.find(v, '|', 1, true)
        if sep then
            local holder = string.sub(v, 1, sep - 1)
            local expires = tonumber(string.sub(v, sep + 1))
            if holder ~= ARGV[1] and expires and now <= expires then
                table.insert(contended, KEYS[i])
                table.insert(contended, v)
            end
        end
    end
end
if #contended > 0 then
    return contended
end
local value = ARGV[1] .. '|' .. ARGV[3]
for i = 1, n do
    redis.call('SET', KEYS[i], value, 'PX', ARGV[5])
    redis.call('SADD', KEYS[n + 1], KEYS[i])
    redis.call('SADD', KEYS[n + 1 + i], KEYS[i])
end
return {}
"#;

const RELEASE_SCRIPT: &str = r#"
local n = tonumber(ARGV[2])
local released = 0
for i = 1, n do
    local v = redis.call('GET', KEYS[i + 1])
    if v and string.sub(v, 1, string.len(ARGV[1]) + 1) == ARGV[1] .. '|' then
        redis.call('DEL', KEYS[i + 1])
        redis.call('SREM', KEYS[n + 1 + i], KEYS[i + 1])
        released = released + 1
    end
end
redis.call('DEL', KEYS[1])
return released
"#;

const PRUNE_SCRIPT: &str = r#"
local v = redis.call('GET', KEYS[1])
if v and v ~= ARGV[1] then
    return 0
end
if v then
    redis.call('DEL', KEYS[1])
end
redis.call('SREM', KEYS[2], KEYS[1])
return 1
"#;

pub fn hold_key(facility_id: Uuid, slot: &Slot) -> String {
    format!(
        "hold:{}:{}:{}-{}",
        facility_id,
        slot.date,
        slot.start_time.format("%H:%M"),
        slot.end_time.format("%H:%M")
    )
}

pub fn customer_index_key(facility_id: Uuid, customer_id: Uuid) -> String {
    format!("holds:{}:customer:{}", facility_id, customer_id)
}

pub fn date_index_key(facility_id: Uuid, date: NaiveDate) -> String {
    format!("holds:{}:date:{}", facility_id, date)
}

pub fn hold_value(customer_id: Uuid, expires_at: DateTime<Utc>) -> String {
    format!("{}|{}", customer_id, expires_at.timestamp_millis())
}

/// Inverse of [`hold_key`].
pub fn parse_hold_key(key: &str) -> Option<(Uuid, Slot)> {
    let rest = key.strip_prefix("hold:")?;
    let (facility, rest) = rest.split_once(':')?;
    let (date, range) = rest.split_once(':')?;
    let (start, end) = range.split_once('-')?;

    let facility_id = Uuid::parse_str(facility).ok()?;
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    Some((facility_id, Slot::new(date, slot::parse_clock(start)?, slot::parse_clock(end)?)))
}

/// Inverse of [`hold_value`].
pub fn parse_hold_value(value: &str) -> Option<(Uuid, DateTime<Utc>)> {
    let (customer, expires) = value.split_once('|')?;
    let customer_id = Uuid::parse_str(customer).ok()?;
    let expires_at = DateTime::from_timestamp_millis(expires.parse().ok()?)?;
    Some((customer_id, expires_at))
}

fn decode_hold(key: &str, value: &str) -> Result<Hold, StoreError> {
    let (facility_id, slot) =
        parse_hold_key(key).ok_or_else(|| StoreError::corrupt(format!("unreadable hold key '{}'", key)))?;
    let (customer_id, expires_at) =
        parse_hold_value(value).ok_or_else(|| StoreError::corrupt(format!("unreadable hold at '{}'", key)))?;
    Ok(Hold { facility_id, customer_id, slot, expires_at })
}

#[derive(Clone)]
pub struct RedisHoldStore {
    client: redis::Client,
    place_script: redis::Script,
    release_script: redis::Script,
    prune_script: redis::Script,
}

impl RedisHoldStore {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self {
            client,
            place_script: redis::Script::new(PLACE_SCRIPT),
            release_script: redis::Script::new(RELEASE_SCRIPT),
            prune_script: redis::Script::new(PRUNE_SCRIPT),
        })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, StoreError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(StoreError::backend)
    }

    /// Reads the given hold keys and keeps the ones still live at `now`.
    async fn live_at(
        &self,
        conn: &mut redis::aio::MultiplexedConnection,
        keys: &[String],
        now: DateTime<Utc>,
    ) -> Result<Vec<Hold>, StoreError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let values: Vec<Option<String>> = redis::cmd("MGET")
            .arg(keys)
            .query_async(conn)
            .await
            .map_err(StoreError::backend)?;

        let mut live = Vec::new();
        for (key, value) in keys.iter().zip(values) {
            if let Some(value) = value {
                let hold = decode_hold(key, &value)?;
                if hold.is_live(now) {
                    live.push(hold);
                }
            }
        }
        Ok(live)
    }

    /// Prunes dead members of one index set. Returns how many went.
    async fn prune_index(
        &self,
        conn: &mut redis::aio::MultiplexedConnection,
        index_key: &str,
        now: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let members: Vec<String> = conn.smembers(index_key).await.map_err(StoreError::backend)?;
        if members.is_empty() {
            return Ok(0);
        }

        let values: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&members)
            .query_async(&mut *conn)
            .await
            .map_err(StoreError::backend)?;

        let mut pruned = 0;
        for (member, value) in members.iter().zip(values) {
            let dead = match value.as_deref().and_then(parse_hold_value) {
                Some((_, expires_at)) => now > expires_at,
                None => true,
            };
            if !dead {
                continue;
            }
            let removed: i64 = self
                .prune_script
                .key(member)
                .key(index_key)
                .arg(value.unwrap_or_default())
                .invoke_async(&mut *conn)
                .await
                .map_err(StoreError::backend)?;
            pruned += removed as usize;
        }
        Ok(pruned)
    }
}

#[async_trait]
impl HoldStore for RedisHoldStore {
    async fn place(
        &self,
        facility_id: Uuid,
        customer_id: Uuid,
        slots: &[Slot],
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<HoldAttempt, StoreError> {
        let mut conn = self.connection().await?;
        let hold_keys: Vec<String> = slots.iter().map(|s| hold_key(facility_id, s)).collect();
        let ttl_ms = (expires_at - now).num_milliseconds().max(0) + EXPIRY_GRACE_MS;

        let mut invocation = self.place_script.prepare_invoke();
        for key in &hold_keys {
            invocation.key(key);
        }
        invocation.key(customer_index_key(facility_id, customer_id));
        for s in slots {
            invocation.key(date_index_key(facility_id, s.date));
        }
        invocation
            .arg(customer_id.to_string())
            .arg(now.timestamp_millis())
            .arg(expires_at.timestamp_millis())
            .arg(slots.len())
            .arg(ttl_ms);

        let contended: Vec<String> = invocation.invoke_async(&mut conn).await.map_err(StoreError::backend)?;
        if contended.is_empty() {
            info!("Holds placed: {} slots on {} for {}", slots.len(), facility_id, customer_id);
            let holds = slots
                .iter()
                .map(|s| Hold { facility_id, customer_id, slot: *s, expires_at })
                .collect();
            return Ok(HoldAttempt::Placed(holds));
        }

        let holds = contended
            .chunks(2)
            .filter_map(|pair| match pair {
                [key, value] => Some(decode_hold(key, value)),
                _ => None,
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(HoldAttempt::Contended(holds))
    }

    async fn live_on(&self, facility_id: Uuid, date: NaiveDate, now: DateTime<Utc>) -> Result<Vec<Hold>, StoreError> {
        let mut conn = self.connection().await?;
        let keys: Vec<String> = conn
            .smembers(date_index_key(facility_id, date))
            .await
            .map_err(StoreError::backend)?;
        self.live_at(&mut conn, &keys, now).await
    }

    async fn live_among(&self, facility_id: Uuid, slots: &[Slot], now: DateTime<Utc>) -> Result<Vec<Hold>, StoreError> {
        let mut conn = self.connection().await?;
        let keys: Vec<String> = slots.iter().map(|s| hold_key(facility_id, s)).collect();
        self.live_at(&mut conn, &keys, now).await
    }

    async fn release(&self, facility_id: Uuid, customer_id: Uuid) -> Result<usize, StoreError> {
        let mut conn = self.connection().await?;
        let index_key = customer_index_key(facility_id, customer_id);
        let members: Vec<String> = conn.smembers(&index_key).await.map_err(StoreError::backend)?;
        if members.is_empty() {
            return Ok(0);
        }

        let mut invocation = self.release_script.prepare_invoke();
        invocation.key(&index_key);
        for member in &members {
            invocation.key(member);
        }
        for member in &members {
            let date = parse_hold_key(member)
                .map(|(_, s)| s.date)
                .ok_or_else(|| StoreError::corrupt(format!("unreadable hold key '{}'", member)))?;
            invocation.key(date_index_key(facility_id, date));
        }
        invocation.arg(customer_id.to_string()).arg(members.len());

        let released: i64 = invocation.invoke_async(&mut conn).await.map_err(StoreError::backend)?;
        Ok(released as usize)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut conn = self.connection().await?;
        let mut cursor: u64 = 0;
        let mut purged = 0;

        loop {
            let (next, index_keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg("holds:*")
                .arg("COUNT")
                .arg(200)
                .query_async(&mut conn)
                .await
                .map_err(StoreError::backend)?;

            for index_key in &index_keys {
                let pruned = self.prune_index(&mut conn, index_key, now).await?;
                // Each hold sits in one date set, so those alone give the count.
                if index_key.contains(":date:") {
                    purged += pruned;
                }
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        debug!("Hold purge pass removed {} entries", purged);
        Ok(purged)
    }
}
