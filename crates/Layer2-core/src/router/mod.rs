//! # Router
//!
//! 플러그인 라우트를 공유 라우트 테이블에 등록/제거한다.
//!
//! ```text
//! PluginRegistry (ApiSurfaceSource)
//!        │  routes()
//!        ▼
//! RouteSynchronizer ── snapshot ──► RouteSnapshot
//!        │  add / remove / rebuild       │ restore
//!        ▼                               │
//!   RouteTable (MemoryRouteTable) ◄──────┘
//!        │  resolve → Authenticator → RouteHandler
//!        ▼
//!    dispatch
//! ```

mod route;
mod snapshot;
mod sync;
mod table;

pub use route::{
    handler_fn, AuthMode, Authenticator, BindingId, FnHandler, Method, RouteBinding,
    RouteDependency, RouteDescriptor, RouteHandler, RouteRequest, RouteResponse,
    StaticAuthenticator,
};
pub use snapshot::{RestoreResult, RouteSnapshot};
pub use sync::{ApiSurfaceSource, RouteSynchronizer, SyncAction, SyncReport, PLUGIN_ROUTE_TAG};
pub use table::{MemoryRouteTable, RouteTable};
