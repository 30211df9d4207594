/// All entity primary keys are UUID strings (`gen_random_uuid()` in Postgres,
/// `uuid::Uuid::new_v4()` in the in-memory store).
pub type Id = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Generate a fresh entity id.
pub fn new_id() -> Id {
    uuid::Uuid::new_v4().to_string()
}
