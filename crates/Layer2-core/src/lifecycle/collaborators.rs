//! 외부 협력자 계약 - 백그라운드 작업 스케줄러, 명령 레지스트리
//!
//! 두 계약 모두 멱등이며, 호출 측은 실패를 로그로만 남긴다.

use async_trait::async_trait;
use parking_lot::Mutex;
use reel_foundation::Result;
use std::collections::BTreeSet;
use tracing::debug;

/// 백그라운드 작업 스케줄러
#[async_trait]
pub trait JobScheduler: Send + Sync {
    /// 플러그인 작업 등록/갱신
    async fn update_plugin_job(&self, plugin_id: &str) -> Result<()>;

    /// 플러그인 작업 제거
    async fn remove_plugin_job(&self, plugin_id: &str) -> Result<()>;
}

/// 명령 레지스트리
#[async_trait]
pub trait CommandRegistry: Send + Sync {
    /// 플러그인 명령 초기화
    async fn init_commands(&self, plugin_id: &str) -> Result<()>;
}

// ============================================================================
// 프로세스 내 구현
// ============================================================================

/// 등록된 플러그인 작업만 기억하는 스케줄러
#[derive(Default)]
pub struct LocalScheduler {
    jobs: Mutex<BTreeSet<String>>,
}

impl LocalScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn jobs(&self) -> Vec<String> {
        self.jobs.lock().iter().cloned().collect()
    }
}

#[async_trait]
impl JobScheduler for LocalScheduler {
    async fn update_plugin_job(&self, plugin_id: &str) -> Result<()> {
        self.jobs.lock().insert(plugin_id.to_string());
        debug!("Scheduled jobs for plugin {}", plugin_id);
        Ok(())
    }

    async fn remove_plugin_job(&self, plugin_id: &str) -> Result<()> {
        if self.jobs.lock().remove(plugin_id) {
            debug!("Removed jobs for plugin {}", plugin_id);
        }
        Ok(())
    }
}

/// 초기화된 플러그인만 기억하는 명령 레지스트리
#[derive(Default)]
pub struct LocalCommandRegistry {
    initialized: Mutex<BTreeSet<String>>,
}

impl LocalCommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initialized(&self) -> Vec<String> {
        self.initialized.lock().iter().cloned().collect()
    }
}

#[async_trait]
impl CommandRegistry for LocalCommandRegistry {
    async fn init_commands(&self, plugin_id: &str) -> Result<()> {
        self.initialized.lock().insert(plugin_id.to_string());
        Ok(())
    }
}
