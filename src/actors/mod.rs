//! Task-based monitoring engine
//!
//! Each probe runs as an independent async task; all of them publish into a
//! single bounded mpsc channel drained by one consumer.
//!
//! ## Architecture Overview
//!
//! ```text
//!        ┌──────────────┐             ┌──────────────┐
//!        │ ProbeWorker-1│     ...     │ ProbeWorker-N│──┐ anomaly
//!        │  (target A)  │             │  (target N)  │  ├─► Notifier
//!        └──────┬───────┘             └──────┬───────┘  └─► DiagnosticTrigger (detached)
//!               │        HealthEvent         │
//!               └─────────────┬──────────────┘
//!                             ▼
//!                   ┌────────────────────┐
//!                   │  mpsc (bounded)    │  back-pressure on every worker
//!                   └─────────┬──────────┘
//!                             ▼
//!                   ┌────────────────────┐
//!                   │   EventConsumer    │──► EventSinks (stdout, log)
//!                   └────────────────────┘
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Events**: workers publish HealthEvents into the shared fan-in channel
//! 2. **Commands**: each worker has an mpsc command channel for out of schedule probes
//! 3. **Request/Response**: oneshot channels answer those commands

pub mod consumer;
pub mod messages;
pub mod probe;
