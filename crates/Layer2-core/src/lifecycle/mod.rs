//! # Lifecycle
//!
//! 플러그인 상태 머신
//!
//! ```text
//! ABSENT ──install──▶ INSTALLED ──reload──▶ RUNNING ──uninstall──▶ ABSENT
//!                          ▲                   │
//!                          └──── reset ────────┘ (설정/데이터만 삭제, 코드 유지)
//! ```
//!
//! 라우트를 바꾸는 모든 작업은 `RouteSynchronizer`의 단일 writer 구간을 거친다.

mod collaborators;
mod orchestrator;
mod response;

pub use collaborators::{CommandRegistry, JobScheduler, LocalCommandRegistry, LocalScheduler};
pub use orchestrator::{DashboardEntry, PluginLifecycle, RemoteEntry, REMOTES_TOKEN};
pub use response::OpResponse;
