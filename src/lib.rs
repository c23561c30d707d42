//! policydb - storage and execution core of an embedded policy database.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            policydb                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │         Execution Layer (plan/, expr/, executor/)        │   │
//! │  │     PlanNode → ExecutorBuilder → Volcano executors       │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │          Session Layer (session/, catalog/)              │   │
//! │  │   KV txn + catalog txn + schema txn, watermark commit    │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │         Data Layer (kv/, schema/, codec/, sketch/)       │   │
//! │  │    MVCC KV contract, tuples, row / index keys, stats     │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                Buffer Pool (buffer/)                     │   │
//! │  │  Partitions + Swip + free list + LRU + cooling walker    │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Storage Layer (storage/)                    │   │
//! │  │          DiskManager + PageHeader + SlottedPage          │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, FrameId, Error, config)
//! - [`storage`] - Disk I/O and page formats
//! - [`buffer`] - Buffer pool and eviction
//! - [`codec`] - Tuple layouts, KV keys, object ids
//! - [`schema`] - Table schemas and typed values
//! - [`kv`] - KV engine contract and the in-memory engine
//! - [`catalog`] - Database / table / index metadata
//! - [`session`] - Session context and commit watermark
//! - [`expr`], [`plan`], [`executor`] - Query execution
//! - [`sketch`] - Count-min sketch
//!
//! # Quick Start
//! ```no_run
//! use policydb::{BufferPool, BufferPoolConfig, DiskManager};
//!
//! let disk = DiskManager::create("policy.db").unwrap();
//! let pool = BufferPool::new(BufferPoolConfig::with_frames(64), disk).unwrap();
//!
//! let mut page = pool.new_page().unwrap();
//! page.as_mut_slice()[..5].copy_from_slice(b"hello");
//! ```

pub mod buffer;
pub mod catalog;
pub mod codec;
pub mod common;
pub mod executor;
pub mod expr;
pub mod kv;
pub mod plan;
pub mod schema;
pub mod session;
pub mod sketch;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::PAGE_SIZE;
pub use common::{BufferPoolConfig, CancelToken, Error, FrameId, PageId, Result};

pub use buffer::{BufferPool, BufferPoolStats, PageReadGuard, PageWriteGuard, StatsSnapshot};
pub use codec::{ObjectId, Tuple};
pub use storage::page::{PageHeader, PageType};
pub use storage::DiskManager;
