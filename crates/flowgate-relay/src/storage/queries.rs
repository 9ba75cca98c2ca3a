//! Database queries for the flowgate relay.

use flowgate_core::db::{DatabaseError, unix_millis};

use super::db::RelayDatabase;
use super::models::{Forward, Node, NodeCapabilities, NodeStatus, Tunnel, User, UserTunnel};

impl RelayDatabase {
    // =========================================================================
    // Node queries
    // =========================================================================

    /// Register a node with its shared secret.
    pub async fn create_node(&self, name: &str, secret: &str) -> Result<Node, DatabaseError> {
        let result = sqlx::query("INSERT INTO node (name, secret, created_time) VALUES (?, ?, ?)")
            .bind(name)
            .bind(secret)
            .bind(unix_millis())
            .execute(self.pool())
            .await?;

        self.get_node(result.last_insert_rowid()).await
    }

    /// Get a node by ID.
    pub async fn get_node(&self, id: i64) -> Result<Node, DatabaseError> {
        sqlx::query_as::<_, Node>("SELECT * FROM node WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Node {id}")))
    }

    /// Resolve the node that owns `secret`, if any.
    pub async fn get_node_by_secret(&self, secret: &str) -> Result<Option<Node>, DatabaseError> {
        let node = sqlx::query_as::<_, Node>("SELECT * FROM node WHERE secret = ? LIMIT 1")
            .bind(secret)
            .fetch_optional(self.pool())
            .await?;

        Ok(node)
    }

    /// Mark a node online and record the capabilities it reported.
    pub async fn set_node_online(
        &self,
        id: i64,
        caps: &NodeCapabilities,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "UPDATE node SET status = ?, version = ?, http = ?, tls = ?, socks = ?, updated_time = ? WHERE id = ?",
        )
        .bind(NodeStatus::Online.as_i64())
        .bind(&caps.version)
        .bind(caps.http)
        .bind(caps.tls)
        .bind(caps.socks)
        .bind(unix_millis())
        .bind(id)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Update node status only.
    pub async fn set_node_status(&self, id: i64, status: NodeStatus) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE node SET status = ?, updated_time = ? WHERE id = ?")
            .bind(status.as_i64())
            .bind(unix_millis())
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(())
    }

    // =========================================================================
    // Account queries
    // =========================================================================

    /// Create a user with zeroed traffic counters.
    pub async fn create_user(&self, username: &str, flow_quota: i64) -> Result<User, DatabaseError> {
        let result = sqlx::query("INSERT INTO user (user, flow, created_time) VALUES (?, ?, ?)")
            .bind(username)
            .bind(flow_quota)
            .bind(unix_millis())
            .execute(self.pool())
            .await?;

        self.get_user(result.last_insert_rowid()).await
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: i64) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>("SELECT * FROM user WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("User {id}")))
    }

    /// Create a tunnel.
    pub async fn create_tunnel(&self, name: &str) -> Result<Tunnel, DatabaseError> {
        let result = sqlx::query("INSERT INTO tunnel (name, created_time) VALUES (?, ?)")
            .bind(name)
            .bind(unix_millis())
            .execute(self.pool())
            .await?;

        sqlx::query_as::<_, Tunnel>("SELECT * FROM tunnel WHERE id = ?")
            .bind(result.last_insert_rowid())
            .fetch_one(self.pool())
            .await
            .map_err(Into::into)
    }

    /// Allocate a tunnel to a user with its own traffic counters.
    pub async fn create_user_tunnel(
        &self,
        user_id: i64,
        tunnel_id: i64,
        flow_quota: i64,
    ) -> Result<UserTunnel, DatabaseError> {
        let result =
            sqlx::query("INSERT INTO user_tunnel (user_id, tunnel_id, flow) VALUES (?, ?, ?)")
                .bind(user_id)
                .bind(tunnel_id)
                .bind(flow_quota)
                .execute(self.pool())
                .await?;

        self.get_user_tunnel(result.last_insert_rowid()).await
    }

    /// Get a user-tunnel allocation by ID.
    pub async fn get_user_tunnel(&self, id: i64) -> Result<UserTunnel, DatabaseError> {
        sqlx::query_as::<_, UserTunnel>("SELECT * FROM user_tunnel WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("UserTunnel {id}")))
    }

    /// Create a forward endpoint owned by `user_id` on `tunnel_id`.
    pub async fn create_forward(
        &self,
        user_id: i64,
        tunnel_id: i64,
        name: &str,
        remote_addr: &str,
    ) -> Result<Forward, DatabaseError> {
        let result = sqlx::query(
            "INSERT INTO forward (user_id, tunnel_id, name, remote_addr, created_time) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(tunnel_id)
        .bind(name)
        .bind(remote_addr)
        .bind(unix_millis())
        .execute(self.pool())
        .await?;

        self.get_forward(result.last_insert_rowid()).await
    }

    /// Get a forward by ID.
    pub async fn get_forward(&self, id: i64) -> Result<Forward, DatabaseError> {
        sqlx::query_as::<_, Forward>("SELECT * FROM forward WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Forward {id}")))
    }
}
