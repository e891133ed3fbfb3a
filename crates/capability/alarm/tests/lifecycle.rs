use async_trait::async_trait;
use domain::{AlarmSeverity, AlarmStatus, ManualClock};
use greenhouse_alarm::{AlarmError, AlarmLifecycle};
use greenhouse_storage::{
    AlarmQuery, AlarmRecord, AlarmStore, AuditLogStore, AuditQuery, InMemoryAlarmStore,
    InMemoryAuditLogStore, StorageError,
};
use std::sync::Arc;

fn active_alarm(alarm_id: &str) -> AlarmRecord {
    AlarmRecord {
        alarm_id: alarm_id.to_string(),
        ts_ms: 1_000,
        device_id: Some("device-1".to_string()),
        alarm_type: "Sensor Threshold Exceeded".to_string(),
        severity: AlarmSeverity::Warning,
        status: AlarmStatus::Active,
        details: "air_temperature observed 35 > threshold 30".to_string(),
        triggered_by_rule_id: Some("rule-1".to_string()),
        acknowledged_at_ms: None,
        cleared_at_ms: None,
        updated_at_ms: 1_000,
    }
}

async fn setup() -> (AlarmLifecycle, Arc<InMemoryAuditLogStore>, Arc<ManualClock>) {
    let alarms = Arc::new(InMemoryAlarmStore::new());
    alarms
        .create_alarm(active_alarm("alarm-1"))
        .await
        .expect("alarm");
    let audit = Arc::new(InMemoryAuditLogStore::new());
    let clock = Arc::new(ManualClock::new(10_000));
    let lifecycle = AlarmLifecycle::new(alarms, audit.clone(), clock.clone());
    (lifecycle, audit, clock)
}

#[tokio::test]
async fn acknowledge_then_clear() {
    let (lifecycle, audit, clock) = setup().await;
    let acknowledged = lifecycle
        .transition("alarm-1", AlarmStatus::Acknowledged, "operator")
        .await
        .expect("ack");
    assert_eq!(acknowledged.status, AlarmStatus::Acknowledged);
    assert_eq!(acknowledged.acknowledged_at_ms, Some(10_000));

    clock.advance(5_000);
    let cleared = lifecycle
        .transition("alarm-1", AlarmStatus::Cleared, "operator")
        .await
        .expect("clear");
    assert_eq!(cleared.status, AlarmStatus::Cleared);
    assert_eq!(cleared.cleared_at_ms, Some(15_000));
    assert_eq!(cleared.acknowledged_at_ms, Some(10_000));

    let logs = audit.list_audit_logs(&AuditQuery::recent(10)).await.expect("audit");
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].action, "ALARM.STATUS.UPDATE");
    assert_eq!(logs[0].resource, "alarm:alarm-1");
    assert_eq!(logs[0].result, "cleared");
    assert_eq!(logs[0].actor, "operator");
}

#[tokio::test]
async fn reactivation_is_rejected_and_state_unchanged() {
    let (lifecycle, _audit, _clock) = setup().await;
    lifecycle
        .transition("alarm-1", AlarmStatus::Cleared, "operator")
        .await
        .expect("clear");
    let err = lifecycle
        .transition("alarm-1", AlarmStatus::Active, "operator")
        .await
        .expect_err("reactivate");
    assert!(matches!(err, AlarmError::InvalidTransition(_)));
    assert_eq!(
        err.to_string(),
        "invalid status transition from cleared to active"
    );
    let err = lifecycle
        .transition("alarm-1", AlarmStatus::Acknowledged, "operator")
        .await
        .expect_err("cleared to acknowledged");
    assert!(matches!(err, AlarmError::InvalidTransition(_)));

    let current = lifecycle.get("alarm-1").await.expect("alarm");
    assert_eq!(current.status, AlarmStatus::Cleared);
}

#[tokio::test]
async fn repeating_current_status_is_noop() {
    let (lifecycle, audit, _clock) = setup().await;
    let unchanged = lifecycle
        .transition("alarm-1", AlarmStatus::Active, "operator")
        .await
        .expect("noop");
    assert_eq!(unchanged.status, AlarmStatus::Active);
    assert_eq!(unchanged.updated_at_ms, 1_000);
    assert!(audit.list_audit_logs(&AuditQuery::recent(10)).await.expect("audit").is_empty());
}

#[tokio::test]
async fn unknown_alarm_is_not_found() {
    let (lifecycle, _audit, _clock) = setup().await;
    let err = lifecycle
        .transition("missing", AlarmStatus::Cleared, "operator")
        .await
        .expect_err("missing");
    assert!(matches!(err, AlarmError::NotFound(_)));
}

/// 每次条件写入都失败，模拟另一个进程抢先修改了状态。
struct ContendedAlarmStore {
    inner: InMemoryAlarmStore,
}

#[async_trait]
impl AlarmStore for ContendedAlarmStore {
    async fn create_alarm(&self, record: AlarmRecord) -> Result<AlarmRecord, StorageError> {
        self.inner.create_alarm(record).await
    }

    async fn find_alarm(&self, alarm_id: &str) -> Result<Option<AlarmRecord>, StorageError> {
        self.inner.find_alarm(alarm_id).await
    }

    async fn list_alarms(&self, query: &AlarmQuery) -> Result<Vec<AlarmRecord>, StorageError> {
        self.inner.list_alarms(query).await
    }

    async fn list_open_alarms_for_rule(
        &self,
        rule_id: &str,
    ) -> Result<Vec<AlarmRecord>, StorageError> {
        self.inner.list_open_alarms_for_rule(rule_id).await
    }

    async fn transition_status(
        &self,
        _alarm_id: &str,
        _from: AlarmStatus,
        _to: AlarmStatus,
        _ts_ms: i64,
    ) -> Result<Option<AlarmRecord>, StorageError> {
        Ok(None)
    }
}

#[tokio::test]
async fn persistent_conflict_surfaces_after_retry() {
    let store = Arc::new(ContendedAlarmStore {
        inner: InMemoryAlarmStore::new(),
    });
    store
        .create_alarm(active_alarm("alarm-1"))
        .await
        .expect("alarm");
    let lifecycle = AlarmLifecycle::new(
        store,
        Arc::new(InMemoryAuditLogStore::new()),
        Arc::new(ManualClock::new(0)),
    );
    let err = lifecycle
        .transition("alarm-1", AlarmStatus::Acknowledged, "operator")
        .await
        .expect_err("conflict");
    assert!(matches!(err, AlarmError::Conflict(_)));
}
