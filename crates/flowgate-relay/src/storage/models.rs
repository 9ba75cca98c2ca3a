//! Data models for flowgate relay storage.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Node {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing)]
    pub secret: String,
    pub server_ip: Option<String>,
    pub version: Option<String>,
    pub http: i64,
    pub tls: i64,
    pub socks: i64,
    pub status: i64,
    pub created_time: i64,
    pub updated_time: Option<i64>,
}

impl Node {
    pub const fn is_online(&self) -> bool {
        self.status == NodeStatus::Online.as_i64()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    #[sqlx(rename = "user")]
    pub username: String,
    pub flow: i64,
    pub in_flow: i64,
    pub out_flow: i64,
    pub status: i64,
    pub created_time: i64,
    pub updated_time: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tunnel {
    pub id: i64,
    pub name: String,
    pub traffic_ratio: f64,
    pub status: i64,
    pub created_time: i64,
    pub updated_time: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserTunnel {
    pub id: i64,
    pub user_id: i64,
    pub tunnel_id: i64,
    pub flow: i64,
    pub in_flow: i64,
    pub out_flow: i64,
    pub status: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Forward {
    pub id: i64,
    pub user_id: i64,
    pub tunnel_id: i64,
    pub name: String,
    pub remote_addr: String,
    pub in_flow: i64,
    pub out_flow: i64,
    pub status: i64,
    pub created_time: i64,
}

/// Persisted liveness of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    Offline,
    Online,
}

impl NodeStatus {
    pub const fn as_i64(self) -> i64 {
        match self {
            Self::Offline => 0,
            Self::Online => 1,
        }
    }
}

/// Capabilities a node reports when it connects.
///
/// The listener flags are stored as integers (`1` enabled, `0` disabled).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeCapabilities {
    pub version: String,
    pub http: i64,
    pub tls: i64,
    pub socks: i64,
}
