//! The data Fabric Cache fetches and caches: managed servers grouped into
//! HA groups, and shards mapping a key range onto a group.

/// The mode a [`ManagedServer`] was registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerMode {
    /// Not currently serving traffic.
    Offline,
    /// Read-only.
    ReadOnly,
    /// Write-only.
    WriteOnly,
    /// Read-write.
    ReadWrite,
}

/// The health status a [`ManagedServer`] was registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    /// Unreachable or reporting errors.
    Faulty,
    /// Healthy but not currently assigned a role.
    Spare,
    /// Healthy secondary/replica.
    Secondary,
    /// Healthy primary.
    Primary,
    /// Still joining the group.
    Configuring,
}

/// One server Fabric reports as belonging to an HA group.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedServer {
    /// Fabric's UUID for this server.
    pub server_uuid: String,
    /// The HA group this server belongs to.
    pub group_id: String,
    /// Hostname or IP Fabric reports for this server.
    pub host: String,
    /// Port the server listens for MySQL client connections on.
    pub port: u16,
    /// This server's current mode.
    pub mode: ServerMode,
    /// This server's current status.
    pub status: ServerStatus,
    /// Relative routing weight; higher values receive proportionally more
    /// connections among servers in the same mode.
    pub weight: f32,
}

/// The comparator used to order a shard table's lower bounds, and to
/// compare an incoming key against them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShardType {
    /// Integer range sharding.
    Integer,
    /// `DateTime` range sharding (`YYYY-MM-DD HH:MM:SS`).
    DateTime,
    /// Lexicographic string range sharding.
    String,
    /// Sharding by the MD5 hash (as lowercase hex) of the key.
    Hash,
}

/// One entry of a sharding table: the group a range of keys maps to.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedShard {
    /// Schema (database) the sharded table lives in.
    pub schema_name: String,
    /// Name of the sharded table.
    pub table_name: String,
    /// Column the shard key is drawn from.
    pub column_name: String,
    /// This shard's lower bound, in the representation [`ShardType`]
    /// dictates (decimal integer, `YYYY-MM-DD HH:MM:SS`, a raw string, or a
    /// hex MD5 digest).
    pub lower_bound: String,
    /// Fabric's unique ID for this shard.
    pub shard_id: i64,
    /// How `lower_bound` and incoming keys are compared.
    pub shard_type: ShardType,
    /// The HA group this shard's rows live on.
    pub group_id: String,
    /// The group holding schema-wide metadata replicated to every shard.
    pub global_group: String,
}
