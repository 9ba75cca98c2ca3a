//! SQLite database handle for the flowgate relay.

flowgate_core::define_database!(RelayDatabase, "Relay database migrations complete");
