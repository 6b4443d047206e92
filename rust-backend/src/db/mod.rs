// src/db/mod.rs
//
// The Persistence Gateway (§3, §6): typed CRUD over the relational schema,
// plus the Redis-backed cache the adapter discovery layer and copier
// supervisor lean on for cheap cross-request state.

pub mod accounts;
pub mod audit;
pub mod copiers;
pub mod models;
pub mod pool;
pub mod redis;
pub mod trades;
