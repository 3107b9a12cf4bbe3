//! Plugin Events - 라이프사이클 이벤트 버스

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

// ============================================================================
// PluginEvent - 플러그인 이벤트 타입
// ============================================================================

/// 플러그인 라이프사이클 이벤트
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginEvent {
    /// 이벤트 타입
    pub event_type: EventType,

    /// 대상 플러그인 (전역 이벤트면 None)
    pub plugin_id: Option<String>,

    /// 이벤트 데이터
    pub data: Value,

    /// 타임스탬프
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl PluginEvent {
    /// 새 이벤트 생성
    pub fn new(event_type: EventType, plugin_id: Option<&str>, data: Value) -> Self {
        Self {
            event_type,
            plugin_id: plugin_id.map(str::to_string),
            data,
            timestamp: chrono::Utc::now(),
        }
    }

    /// 플러그인 대상 이벤트
    pub fn for_plugin(event_type: EventType, plugin_id: &str) -> Self {
        Self::new(event_type, Some(plugin_id), Value::Null)
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}

/// 이벤트 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    PluginInstalled,
    PluginReloaded,
    PluginUninstalled,
    PluginCloned,
    PluginReset,
    ConfigChanged,
    RoutesChanged,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PluginInstalled => write!(f, "plugin_installed"),
            Self::PluginReloaded => write!(f, "plugin_reloaded"),
            Self::PluginUninstalled => write!(f, "plugin_uninstalled"),
            Self::PluginCloned => write!(f, "plugin_cloned"),
            Self::PluginReset => write!(f, "plugin_reset"),
            Self::ConfigChanged => write!(f, "config_changed"),
            Self::RoutesChanged => write!(f, "routes_changed"),
        }
    }
}

// ============================================================================
// PluginEventHandler - 이벤트 핸들러 트레이트
// ============================================================================

/// 이벤트 핸들러 트레이트
#[async_trait]
pub trait PluginEventHandler: Send + Sync {
    /// 핸들러 이름
    fn name(&self) -> &str;

    /// 관심 있는 이벤트 타입들
    fn interested_events(&self) -> Vec<EventType>;

    /// 이벤트 처리
    async fn handle(&self, event: &PluginEvent);
}

// ============================================================================
// EventBus - 이벤트 버스 (발행/구독)
// ============================================================================

/// 이벤트 버스
///
/// 발행된 이벤트는 브로드캐스트 구독자, 관심 타입이 맞는 핸들러, 최근 히스토리로 전달된다.
pub struct EventBus {
    sender: broadcast::Sender<PluginEvent>,
    handlers: RwLock<Vec<Arc<dyn PluginEventHandler>>>,
    recent: RwLock<VecDeque<PluginEvent>>,
    history_limit: usize,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(256, 100)
    }

    /// 채널 용량과 히스토리 한도 지정
    pub fn with_capacity(channel_capacity: usize, history_limit: usize) -> Self {
        let (sender, _) = broadcast::channel(channel_capacity);
        Self {
            sender,
            handlers: RwLock::new(Vec::new()),
            recent: RwLock::new(VecDeque::with_capacity(history_limit)),
            history_limit,
        }
    }

    /// 핸들러 등록 - 같은 이름이면 교체
    pub async fn register_handler(&self, handler: Arc<dyn PluginEventHandler>) {
        let mut handlers = self.handlers.write().await;
        handlers.retain(|h| h.name() != handler.name());
        handlers.push(handler);
    }

    pub async fn publish(&self, event: PluginEvent) {
        debug!("Event {} ({:?})", event.event_type, event.plugin_id);

        {
            let mut recent = self.recent.write().await;
            while recent.len() >= self.history_limit.max(1) {
                recent.pop_front();
            }
            recent.push_back(event.clone());
        }

        // 수신자가 없으면 send가 실패하지만 무시한다
        let _ = self.sender.send(event.clone());

        let handlers = self.handlers.read().await.clone();
        for handler in handlers
            .iter()
            .filter(|h| h.interested_events().contains(&event.event_type))
        {
            handler.handle(&event).await;
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PluginEvent> {
        self.sender.subscribe()
    }

    /// 최근 이벤트 (오래된 순)
    pub async fn history(&self) -> Vec<PluginEvent> {
        self.recent.read().await.iter().cloned().collect()
    }

    pub async fn history_by_type(&self, event_type: EventType) -> Vec<PluginEvent> {
        self.recent
            .read()
            .await
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandler {
        seen: AtomicUsize,
    }

    #[async_trait]
    impl PluginEventHandler for CountingHandler {
        fn name(&self) -> &str {
            "counter"
        }

        fn interested_events(&self) -> Vec<EventType> {
            vec![EventType::PluginReloaded]
        }

        async fn handle(&self, _event: &PluginEvent) {
            self.seen.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_handler_filtering() {
        let bus = EventBus::new();
        let handler = Arc::new(CountingHandler {
            seen: AtomicUsize::new(0),
        });
        bus.register_handler(handler.clone()).await;

        bus.publish(PluginEvent::for_plugin(EventType::PluginReloaded, "demo"))
            .await;
        bus.publish(PluginEvent::for_plugin(EventType::PluginReset, "demo"))
            .await;

        assert_eq!(handler.seen.load(Ordering::SeqCst), 1);
        assert_eq!(bus.history().await.len(), 2);
        assert_eq!(bus.history_by_type(EventType::PluginReset).await.len(), 1);
    }

    #[tokio::test]
    async fn test_history_bounded() {
        let bus = EventBus::with_capacity(16, 3);
        for i in 0..5 {
            bus.publish(PluginEvent::for_plugin(
                EventType::ConfigChanged,
                &format!("p{}", i),
            ))
            .await;
        }
        let history = bus.history().await;
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].plugin_id.as_deref(), Some("p2"));
    }

    #[tokio::test]
    async fn test_subscribe() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();
        bus.publish(PluginEvent::for_plugin(EventType::PluginInstalled, "demo"))
            .await;

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.event_type, EventType::PluginInstalled);
        assert_eq!(event.plugin_id.as_deref(), Some("demo"));
    }
}
