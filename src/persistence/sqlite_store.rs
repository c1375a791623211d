//! SQLite implementation of the LocationStore trait

use super::{LocationStore, StoreError};
use crate::models::{GeoLocation, LoginAttempt};
use ipnetwork::{IpNetwork, Ipv4Network, Ipv6Network};
use rusqlite::{params, Connection, OptionalExtension};
use std::net::IpAddr;
use std::path::Path;
use std::sync::Mutex;
use uuid::Uuid;

/// SQLite-backed login history and network-block store
///
/// All access goes through one shared connection, opened once at process
/// start. A single serialized connection reads its own committed writes, so
/// the read-your-writes requirement of [`LocationStore`] holds under
/// concurrent requests.
pub struct SqliteLocationStore {
    conn: Mutex<Connection>,
}

/// Rank the user's logins by time descending, anchor on the row matching the
/// current IP, and pull the rows within rank distance 1 of the anchor.
const ADJACENT_LOGINS_SQL: &str = "\
WITH ranked AS (
    SELECT row_number() OVER (ORDER BY time_stamp DESC) AS row_num,
           user_name, time_stamp, event_uuid, ip_address
      FROM logins
     WHERE user_name = ?1
),
anchor AS (
    SELECT row_num FROM ranked WHERE ip_address = ?2
)
SELECT ranked.user_name, ranked.time_stamp, ranked.event_uuid, ranked.ip_address
  FROM ranked, anchor
 WHERE abs(ranked.row_num - anchor.row_num) <= 1
 ORDER BY ranked.time_stamp DESC";

impl SqliteLocationStore {
    /// Open (or create) a store at the specified path and initialize the
    /// schema if needed.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(db_path)?;
        let store = SqliteLocationStore {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (useful for testing)
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = SqliteLocationStore {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(())
    }

    /// Insert or replace a network block.
    ///
    /// Reference data is normally bulk-loaded from a GeoLite2 CSV; this
    /// exists for seeding small databases and tests.
    pub fn add_block(
        &self,
        network: &str,
        latitude: f64,
        longitude: f64,
        accuracy_radius: i64,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO blocks (network, latitude, longitude, accuracy_radius)
             VALUES (?, ?, ?, ?)",
            params![network, latitude, longitude, accuracy_radius],
        )?;
        Ok(())
    }

    /// Helper to parse an event UUID from a database string
    fn parse_event_uuid(raw: &str) -> Result<Uuid, StoreError> {
        Uuid::parse_str(raw)
            .map_err(|_| StoreError::InvalidData(format!("Invalid event UUID: {}", raw)))
    }
}

/// Address an IP string resolves through: a plain address as itself, a CIDR
/// range through its network address.
fn lookup_addr(ip_address: &str) -> Option<IpAddr> {
    if let Ok(addr) = ip_address.parse::<IpAddr>() {
        return Some(addr);
    }
    ip_address
        .parse::<IpNetwork>()
        .ok()
        .map(|network| network.network())
}

/// Candidate block keys for an address, most specific prefix first.
///
/// Probing these as point lookups on the unique `network` index gives
/// longest-prefix matching without scanning the blocks table.
fn candidate_networks(addr: IpAddr) -> Vec<String> {
    match addr {
        IpAddr::V4(v4) => (0..=32)
            .rev()
            .filter_map(|prefix| Ipv4Network::new(v4, prefix).ok())
            .map(|network| format!("{}/{}", network.network(), network.prefix()))
            .collect(),
        IpAddr::V6(v6) => (0..=128)
            .rev()
            .filter_map(|prefix| Ipv6Network::new(v6, prefix).ok())
            .map(|network| format!("{}/{}", network.network(), network.prefix()))
            .collect(),
    }
}

impl LocationStore for SqliteLocationStore {
    fn persist(&self, login: &LoginAttempt) -> Result<bool, StoreError> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "INSERT INTO logins (user_name, time_stamp, event_uuid, ip_address)
             VALUES (?, ?, ?, ?)",
            params![
                login.username,
                login.unix_timestamp,
                login.event_uuid.to_string(),
                login.ip_address
            ],
        )?;
        Ok(rows > 0)
    }

    fn locate(&self, ip_address: &str) -> Result<GeoLocation, StoreError> {
        let addr = match lookup_addr(ip_address) {
            Some(addr) => addr,
            None => {
                log::debug!("Unparseable lookup address: {}", ip_address);
                return Ok(GeoLocation::default());
            }
        };

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT latitude, longitude, accuracy_radius FROM blocks WHERE network = ?",
        )?;

        for network in candidate_networks(addr) {
            let block = stmt
                .query_row(params![network], |row| {
                    Ok(GeoLocation {
                        lat: row.get(0)?,
                        lon: row.get(1)?,
                        radius: row.get(2)?,
                        ..GeoLocation::default()
                    })
                })
                .optional()?;

            if let Some(location) = block {
                return Ok(location);
            }
        }

        Ok(GeoLocation::default())
    }

    fn find_adjacent(
        &self,
        username: &str,
        current_ip: &str,
        current_timestamp: i64,
    ) -> Result<(Option<LoginAttempt>, Option<LoginAttempt>), StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(ADJACENT_LOGINS_SQL)?;

        let rows = stmt.query_map(params![username, current_ip], |row| {
            let user_name: String = row.get(0)?;
            let time_stamp: i64 = row.get(1)?;
            let event_uuid: String = row.get(2)?;
            let ip_address: String = row.get(3)?;
            Ok((user_name, time_stamp, event_uuid, ip_address))
        })?;

        let mut previous = None;
        let mut future = None;

        for row in rows {
            let (user_name, time_stamp, event_uuid, ip_address) = row?;
            if ip_address == current_ip {
                continue;
            }

            let attempt = LoginAttempt {
                username: user_name,
                unix_timestamp: time_stamp,
                event_uuid: Self::parse_event_uuid(&event_uuid)?,
                ip_address,
            };

            if attempt.unix_timestamp < current_timestamp {
                previous = Some(attempt);
            } else if attempt.unix_timestamp > current_timestamp {
                future = Some(attempt);
            }
        }

        Ok((previous, future))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_store() -> SqliteLocationStore {
        SqliteLocationStore::in_memory().expect("Failed to create in-memory store")
    }

    fn create_attempt(user: &str, timestamp: i64, ip: &str) -> LoginAttempt {
        LoginAttempt {
            username: user.to_string(),
            unix_timestamp: timestamp,
            event_uuid: Uuid::new_v4(),
            ip_address: ip.to_string(),
        }
    }

    #[test]
    fn test_persist_reports_rows_written() {
        let store = create_test_store();
        let attempt = create_attempt("alice", 1700000000, "1.1.1.1");

        assert!(store.persist(&attempt).unwrap());
    }

    #[test]
    fn test_duplicate_logins_permitted() {
        let store = create_test_store();
        let attempt = create_attempt("alice", 1700000000, "1.1.1.1");

        assert!(store.persist(&attempt).unwrap());
        assert!(store.persist(&attempt).unwrap());
    }

    #[test]
    fn test_locate_exact_block() {
        let store = create_test_store();
        store.add_block("1.32.196.0/24", 1.23, -4.56, 20).unwrap();

        let location = store.locate("1.32.196.0/24").unwrap();
        assert_eq!(location.lat, 1.23);
        assert_eq!(location.lon, -4.56);
        assert_eq!(location.radius, 20);
    }

    #[test]
    fn test_locate_address_inside_block() {
        let store = create_test_store();
        store.add_block("1.32.196.0/24", 1.23, -4.56, 20).unwrap();

        let location = store.locate("1.32.196.57").unwrap();
        assert_eq!(location.lat, 1.23);
        assert_eq!(location.lon, -4.56);
    }

    #[test]
    fn test_locate_longest_prefix_wins() {
        let store = create_test_store();
        store.add_block("1.32.0.0/16", 9.0, 9.0, 500).unwrap();
        store.add_block("1.32.196.0/24", 1.23, -4.56, 20).unwrap();

        // Inside the /24: the narrower block must win over the /16.
        let narrow = store.locate("1.32.196.7").unwrap();
        assert_eq!(narrow.lat, 1.23);
        assert_eq!(narrow.radius, 20);

        // Inside the /16 only.
        let wide = store.locate("1.32.5.5").unwrap();
        assert_eq!(wide.lat, 9.0);
        assert_eq!(wide.radius, 500);
    }

    #[test]
    fn test_locate_no_match_is_unknown_not_error() {
        let store = create_test_store();
        store.add_block("1.32.196.0/24", 1.23, -4.56, 20).unwrap();

        let location = store.locate("9.9.9.9").unwrap();
        assert!(location.is_unknown());
    }

    #[test]
    fn test_locate_unparseable_address_is_unknown() {
        let store = create_test_store();

        let location = store.locate("not-an-ip").unwrap();
        assert!(location.is_unknown());
    }

    #[test]
    fn test_locate_is_idempotent() {
        let store = create_test_store();
        store.add_block("203.0.113.0/24", 51.5074, -0.1278, 10).unwrap();

        let first = store.locate("203.0.113.9").unwrap();
        let second = store.locate("203.0.113.9").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_locate_ipv6_block() {
        let store = create_test_store();
        store.add_block("2001:db8::/32", 35.6762, 139.6503, 50).unwrap();

        let location = store.locate("2001:db8::1").unwrap();
        assert_eq!(location.lat, 35.6762);
        assert_eq!(location.lon, 139.6503);
    }

    #[test]
    fn test_find_adjacent_picks_rank_neighbors() {
        let store = create_test_store();
        store.persist(&create_attempt("carol", 1000, "1.1.1.1")).unwrap();
        store.persist(&create_attempt("carol", 2000, "2.2.2.2")).unwrap();
        store.persist(&create_attempt("carol", 3000, "3.3.3.3")).unwrap();
        store.persist(&create_attempt("carol", 4000, "4.4.4.4")).unwrap();

        let (previous, future) = store.find_adjacent("carol", "3.3.3.3", 3000).unwrap();

        let previous = previous.unwrap();
        assert_eq!(previous.ip_address, "2.2.2.2");
        assert_eq!(previous.unix_timestamp, 2000);
        assert!(previous.unix_timestamp < 3000);

        let future = future.unwrap();
        assert_eq!(future.ip_address, "4.4.4.4");
        assert_eq!(future.unix_timestamp, 4000);
        assert!(future.unix_timestamp > 3000);
    }

    #[test]
    fn test_find_adjacent_never_returns_current_ip() {
        let store = create_test_store();
        store.persist(&create_attempt("dave", 1000, "5.5.5.5")).unwrap();
        store.persist(&create_attempt("dave", 2000, "7.7.7.7")).unwrap();
        store.persist(&create_attempt("dave", 3000, "7.7.7.7")).unwrap();

        let (previous, future) = store.find_adjacent("dave", "7.7.7.7", 2000).unwrap();

        if let Some(ref attempt) = previous {
            assert_ne!(attempt.ip_address, "7.7.7.7");
        }
        if let Some(ref attempt) = future {
            assert_ne!(attempt.ip_address, "7.7.7.7");
        }
        assert_eq!(previous.unwrap().ip_address, "5.5.5.5");
    }

    #[test]
    fn test_find_adjacent_no_history() {
        let store = create_test_store();

        let (previous, future) = store.find_adjacent("nobody", "1.1.1.1", 1000).unwrap();
        assert!(previous.is_none());
        assert!(future.is_none());
    }

    #[test]
    fn test_find_adjacent_current_not_in_window() {
        let store = create_test_store();
        store.persist(&create_attempt("erin", 1000, "1.1.1.1")).unwrap();
        store.persist(&create_attempt("erin", 2000, "2.2.2.2")).unwrap();

        // The current IP was never persisted for this user, so the anchor
        // row does not exist and both sides must come back empty.
        let (previous, future) = store.find_adjacent("erin", "9.9.9.9", 1500).unwrap();
        assert!(previous.is_none());
        assert!(future.is_none());
    }

    #[test]
    fn test_find_adjacent_edge_of_history() {
        let store = create_test_store();
        store.persist(&create_attempt("frank", 1000, "1.1.1.1")).unwrap();
        store.persist(&create_attempt("frank", 2000, "2.2.2.2")).unwrap();

        // Newest attempt: a previous neighbor exists, no future one.
        let (previous, future) = store.find_adjacent("frank", "2.2.2.2", 2000).unwrap();
        assert_eq!(previous.unwrap().ip_address, "1.1.1.1");
        assert!(future.is_none());
    }

    #[test]
    fn test_find_adjacent_users_are_independent() {
        let store = create_test_store();
        store.persist(&create_attempt("gail", 1000, "1.1.1.1")).unwrap();
        store.persist(&create_attempt("hank", 2000, "2.2.2.2")).unwrap();
        store.persist(&create_attempt("gail", 3000, "3.3.3.3")).unwrap();

        let (previous, future) = store.find_adjacent("gail", "3.3.3.3", 3000).unwrap();
        assert_eq!(previous.unwrap().ip_address, "1.1.1.1");
        assert!(future.is_none());
    }

    #[test]
    fn test_on_disk_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("heimdall.db");

        {
            let store = SqliteLocationStore::new(&db_path).unwrap();
            store.persist(&create_attempt("ivy", 1000, "1.1.1.1")).unwrap();
            store.persist(&create_attempt("ivy", 2000, "2.2.2.2")).unwrap();
        }

        let store = SqliteLocationStore::new(&db_path).unwrap();
        let (previous, _) = store.find_adjacent("ivy", "2.2.2.2", 2000).unwrap();
        assert_eq!(previous.unwrap().ip_address, "1.1.1.1");
    }
}
