use async_trait::async_trait;
use domain::{
    AlarmCondition, AlarmSeverity, AlarmStatus, DevicePurpose, DeviceType, ManualClock,
    SensorMetric, SensorReading,
};
use greenhouse_alarm::{
    AlarmLifecycle, CooldownTracker, PipelineConfig, RuleErrorKind, RuleEvaluator,
};
use greenhouse_storage::{
    AlarmQuery, AlarmRecord, AlarmRuleRecord, AlarmRuleStore, AlarmRuleUpdate, AlarmStore,
    CooldownStore, DEVICE_STATUS_UNKNOWN, DeviceRecord, DeviceStore, InMemoryAlarmRuleStore,
    InMemoryAlarmStore, InMemoryAuditLogStore, InMemoryCooldownStore, InMemoryDeviceStore,
    StorageError,
};
use std::sync::Arc;

const SECOND_MS: i64 = 1_000;

struct Harness {
    rules: Arc<InMemoryAlarmRuleStore>,
    alarms: Arc<dyn AlarmStore>,
    cooldowns: Arc<InMemoryCooldownStore>,
    evaluator: RuleEvaluator,
    device: DeviceRecord,
}

impl Harness {
    async fn new(config: PipelineConfig) -> Self {
        Self::with_alarm_store(config, Arc::new(InMemoryAlarmStore::new())).await
    }

    async fn with_alarm_store(config: PipelineConfig, alarms: Arc<dyn AlarmStore>) -> Self {
        let devices = Arc::new(InMemoryDeviceStore::new());
        let device = devices
            .create_device(DeviceRecord {
                device_id: "device-1".to_string(),
                control_id: "fan-1".to_string(),
                name: "Ventilation fan".to_string(),
                device_type: DeviceType::Fan,
                purpose: DevicePurpose::General,
                status: DEVICE_STATUS_UNKNOWN.to_string(),
                is_enabled: true,
                last_status_update_ms: None,
                version: 0,
            })
            .await
            .expect("device");
        let rules = Arc::new(InMemoryAlarmRuleStore::new());
        let cooldowns = Arc::new(InMemoryCooldownStore::new());
        let lifecycle = AlarmLifecycle::new(
            alarms.clone(),
            Arc::new(InMemoryAuditLogStore::new()),
            Arc::new(ManualClock::new(0)),
        );
        let evaluator = RuleEvaluator::new(
            rules.clone(),
            devices,
            alarms.clone(),
            Arc::new(CooldownTracker::new(cooldowns.clone())),
            lifecycle,
            config,
        );
        Self {
            rules,
            alarms,
            cooldowns,
            evaluator,
            device,
        }
    }

    async fn add_rule(&self, rule_id: &str, metric: &str, threshold: f64, cooldown: u32) {
        self.rules
            .create_rule(AlarmRuleRecord {
                rule_id: rule_id.to_string(),
                name: format!("rule {rule_id}"),
                device_id: self.device.device_id.clone(),
                sensor_metric: metric.to_string(),
                condition: AlarmCondition::GreaterThan,
                threshold_value: threshold,
                severity: AlarmSeverity::Critical,
                is_active: true,
                cooldown_period_seconds: cooldown,
            })
            .await
            .expect("rule");
    }

    async fn stored_alarms(&self) -> Vec<AlarmRecord> {
        self.alarms
            .list_alarms(&AlarmQuery::default())
            .await
            .expect("alarms")
    }
}

fn air_temperature(reading_id: &str, ts_ms: i64, value: f64) -> SensorReading {
    SensorReading::new(reading_id, ts_ms).with_metric(SensorMetric::AirTemperature, value)
}

#[tokio::test]
async fn cooldown_suppresses_within_window() {
    let harness = Harness::new(PipelineConfig::default()).await;
    harness.add_rule("rule-1", "air_temperature", 30.0, 300).await;

    let first = harness
        .evaluator
        .evaluate_reading(&air_temperature("r-0", 0, 35.0))
        .await
        .expect("t=0");
    let second = harness
        .evaluator
        .evaluate_reading(&air_temperature("r-100", 100 * SECOND_MS, 35.0))
        .await
        .expect("t=100");
    let third = harness
        .evaluator
        .evaluate_reading(&air_temperature("r-400", 400 * SECOND_MS, 35.0))
        .await
        .expect("t=400");

    assert_eq!(first.alarms.len(), 1);
    assert_eq!(second.alarms.len(), 0);
    assert_eq!(second.suppressed, 1);
    assert_eq!(third.alarms.len(), 1);

    let alarm = &first.alarms[0];
    assert_eq!(alarm.status, AlarmStatus::Active);
    assert_eq!(alarm.severity, AlarmSeverity::Critical);
    assert_eq!(alarm.ts_ms, 0);
    assert_eq!(alarm.alarm_type, "Sensor Threshold Exceeded");
    assert_eq!(alarm.triggered_by_rule_id.as_deref(), Some("rule-1"));
    assert!(alarm.details.contains("air_temperature"));
    assert!(alarm.details.contains("35"));
    assert_eq!(harness.stored_alarms().await.len(), 2);
}

#[tokio::test]
async fn cooldown_boundary_allows_fire() {
    let harness = Harness::new(PipelineConfig::default()).await;
    harness.add_rule("rule-1", "air_temperature", 30.0, 300).await;
    harness
        .evaluator
        .evaluate_reading(&air_temperature("r-1", 1_000, 35.0))
        .await
        .expect("first");
    let at_boundary = harness
        .evaluator
        .evaluate_reading(&air_temperature("r-2", 1_000 + 300 * SECOND_MS, 35.0))
        .await
        .expect("boundary");
    assert_eq!(at_boundary.alarms.len(), 1);
}

#[tokio::test]
async fn reevaluating_same_reading_is_idempotent() {
    let harness = Harness::new(PipelineConfig::default()).await;
    harness.add_rule("rule-1", "air_temperature", 30.0, 0).await;
    let reading = air_temperature("r-1", 5_000, 40.0);

    let first = harness
        .evaluator
        .evaluate_reading(&reading)
        .await
        .expect("first");
    let replay = harness
        .evaluator
        .evaluate_reading(&reading)
        .await
        .expect("replay");
    assert_eq!(first.alarms.len(), 1);
    assert!(replay.alarms.is_empty());
    assert_eq!(harness.stored_alarms().await.len(), 1);
}

#[tokio::test]
async fn unknown_metric_is_reported_and_other_rules_fire() {
    let harness = Harness::new(PipelineConfig::default()).await;
    harness.add_rule("rule-bad", "nonexistent_metric", 1.0, 300).await;
    harness.add_rule("rule-good", "air_temperature", 30.0, 300).await;

    let outcome = harness
        .evaluator
        .evaluate_reading(&air_temperature("r-1", 1_000, 35.0))
        .await
        .expect("evaluate");

    assert_eq!(outcome.alarms.len(), 1);
    assert_eq!(
        outcome.alarms[0].triggered_by_rule_id.as_deref(),
        Some("rule-good")
    );
    assert_eq!(outcome.errors.len(), 1);
    let error = &outcome.errors[0];
    assert_eq!(error.rule_id, "rule-bad");
    assert_eq!(error.kind, RuleErrorKind::Configuration);
    assert!(error.message.contains("nonexistent_metric"));
}

#[tokio::test]
async fn missing_metric_never_fires() {
    let harness = Harness::new(PipelineConfig::default()).await;
    harness.add_rule("rule-1", "water_ph", 8.0, 300).await;
    let outcome = harness
        .evaluator
        .evaluate_reading(&air_temperature("r-1", 1_000, 35.0))
        .await
        .expect("evaluate");
    assert!(outcome.alarms.is_empty());
    assert!(outcome.errors.is_empty());
}

#[tokio::test]
async fn rules_keep_independent_cooldowns() {
    let harness = Harness::new(PipelineConfig::default()).await;
    harness.add_rule("rule-warm", "air_temperature", 30.0, 300).await;
    harness.add_rule("rule-hot", "air_temperature", 40.0, 300).await;

    let warm = harness
        .evaluator
        .evaluate_reading(&air_temperature("r-1", 1_000, 35.0))
        .await
        .expect("warm");
    assert_eq!(warm.alarms.len(), 1);

    // rule-warm 在冷却中，rule-hot 首次触发
    let hot = harness
        .evaluator
        .evaluate_reading(&air_temperature("r-2", 2_000, 45.0))
        .await
        .expect("hot");
    assert_eq!(hot.alarms.len(), 1);
    assert_eq!(hot.alarms[0].triggered_by_rule_id.as_deref(), Some("rule-hot"));
    assert_eq!(hot.suppressed, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_evaluation_creates_single_alarm() {
    let harness = Arc::new(Harness::new(PipelineConfig::default()).await);
    harness.add_rule("rule-1", "air_temperature", 30.0, 300).await;

    let mut handles = Vec::new();
    for index in 0..8 {
        let harness = harness.clone();
        handles.push(tokio::spawn(async move {
            let reading = air_temperature(&format!("r-{index}"), 10_000 + index, 35.0);
            harness
                .evaluator
                .evaluate_reading(&reading)
                .await
                .expect("evaluate")
        }));
    }
    let mut raised = 0;
    for handle in handles {
        raised += handle.await.expect("join").alarms.len();
    }
    assert_eq!(raised, 1);
    assert_eq!(harness.stored_alarms().await.len(), 1);
}

#[tokio::test]
async fn auto_clear_closes_open_alarms() {
    let harness = Harness::new(PipelineConfig { auto_clear: true }).await;
    harness.add_rule("rule-1", "air_temperature", 30.0, 300).await;
    let raised = harness
        .evaluator
        .evaluate_reading(&air_temperature("r-1", 1_000, 35.0))
        .await
        .expect("raise");
    assert_eq!(raised.alarms.len(), 1);

    // 指标缺失不清除
    let offline = harness
        .evaluator
        .evaluate_reading(&SensorReading::new("r-2", 2_000))
        .await
        .expect("offline");
    assert!(offline.auto_cleared.is_empty());

    let recovered = harness
        .evaluator
        .evaluate_reading(&air_temperature("r-3", 3_000, 25.0))
        .await
        .expect("recovered");
    assert_eq!(recovered.auto_cleared.len(), 1);
    assert_eq!(recovered.auto_cleared[0].status, AlarmStatus::Cleared);
}

#[tokio::test]
async fn alarms_stay_open_without_auto_clear() {
    let harness = Harness::new(PipelineConfig::default()).await;
    harness.add_rule("rule-1", "air_temperature", 30.0, 300).await;
    harness
        .evaluator
        .evaluate_reading(&air_temperature("r-1", 1_000, 35.0))
        .await
        .expect("raise");
    let recovered = harness
        .evaluator
        .evaluate_reading(&air_temperature("r-2", 2_000, 25.0))
        .await
        .expect("recovered");
    assert!(recovered.auto_cleared.is_empty());
    let stored = harness.stored_alarms().await;
    assert_eq!(stored[0].status, AlarmStatus::Active);
}

#[tokio::test]
async fn inactive_rules_are_skipped() {
    let harness = Harness::new(PipelineConfig::default()).await;
    harness.add_rule("rule-1", "air_temperature", 30.0, 300).await;
    harness
        .rules
        .update_rule(
            "rule-1",
            greenhouse_storage::AlarmRuleUpdate {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .expect("update")
        .expect("rule");
    let outcome = harness
        .evaluator
        .evaluate_reading(&air_temperature("r-1", 1_000, 35.0))
        .await
        .expect("evaluate");
    assert!(outcome.alarms.is_empty());
}

struct FailingAlarmStore {
    inner: InMemoryAlarmStore,
}

#[async_trait]
impl AlarmStore for FailingAlarmStore {
    async fn create_alarm(&self, _record: AlarmRecord) -> Result<AlarmRecord, StorageError> {
        Err(StorageError::new("disk full"))
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
        alarm_id: &str,
        from: AlarmStatus,
        to: AlarmStatus,
        ts_ms: i64,
    ) -> Result<Option<AlarmRecord>, StorageError> {
        self.inner.transition_status(alarm_id, from, to, ts_ms).await
    }
}

#[tokio::test]
async fn failed_alarm_write_rolls_back_cooldown() {
    let harness = Harness::with_alarm_store(
        PipelineConfig::default(),
        Arc::new(FailingAlarmStore {
            inner: InMemoryAlarmStore::new(),
        }),
    )
    .await;
    harness.add_rule("rule-1", "air_temperature", 30.0, 300).await;

    let outcome = harness
        .evaluator
        .evaluate_reading(&air_temperature("r-1", 1_000, 35.0))
        .await
        .expect("evaluate");
    assert!(outcome.alarms.is_empty());
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].kind, RuleErrorKind::Storage);
    assert_eq!(
        harness
            .cooldowns
            .last_fired_at_ms("rule-1")
            .await
            .expect("cooldown"),
        None
    );
}

#[tokio::test]
async fn on_new_reading_scopes_to_device() {
    let harness = Harness::new(PipelineConfig::default()).await;
    harness.add_rule("rule-1", "air_temperature", 30.0, 300).await;
    let outcome = harness
        .evaluator
        .on_new_reading(&air_temperature("r-1", 1_000, 35.0), &harness.device)
        .await
        .expect("evaluate");
    assert_eq!(outcome.alarms.len(), 1);
    assert_eq!(outcome.alarms[0].device_id.as_deref(), Some("device-1"));
}

/// 读取指定设备的规则时失败，其余设备正常。
struct BrokenDeviceRuleStore {
    inner: InMemoryAlarmRuleStore,
    broken_device_id: String,
}

#[async_trait]
impl AlarmRuleStore for BrokenDeviceRuleStore {
    async fn list_rules(&self) -> Result<Vec<AlarmRuleRecord>, StorageError> {
        self.inner.list_rules().await
    }

    async fn list_active_rules_for_device(
        &self,
        device_id: &str,
    ) -> Result<Vec<AlarmRuleRecord>, StorageError> {
        if device_id == self.broken_device_id {
            return Err(StorageError::new(format!("backend down for {device_id}")));
        }
        self.inner.list_active_rules_for_device(device_id).await
    }

    async fn find_rule(&self, rule_id: &str) -> Result<Option<AlarmRuleRecord>, StorageError> {
        self.inner.find_rule(rule_id).await
    }

    async fn create_rule(&self, record: AlarmRuleRecord) -> Result<AlarmRuleRecord, StorageError> {
        self.inner.create_rule(record).await
    }

    async fn update_rule(
        &self,
        rule_id: &str,
        update: AlarmRuleUpdate,
    ) -> Result<Option<AlarmRuleRecord>, StorageError> {
        self.inner.update_rule(rule_id, update).await
    }

    async fn delete_rule(&self, rule_id: &str) -> Result<bool, StorageError> {
        self.inner.delete_rule(rule_id).await
    }

    async fn count_rules_for_device(&self, device_id: &str) -> Result<usize, StorageError> {
        self.inner.count_rules_for_device(device_id).await
    }
}

fn fan(device_id: &str, name: &str) -> DeviceRecord {
    DeviceRecord {
        device_id: device_id.to_string(),
        control_id: format!("{device_id}-ctl"),
        name: name.to_string(),
        device_type: DeviceType::Fan,
        purpose: DevicePurpose::General,
        status: DEVICE_STATUS_UNKNOWN.to_string(),
        is_enabled: true,
        last_status_update_ms: None,
        version: 0,
    }
}

#[tokio::test]
async fn failing_device_does_not_block_other_devices() {
    let devices = Arc::new(InMemoryDeviceStore::new());
    // 按名称排序，出错的设备先被评估
    devices
        .create_device(fan("a-broken", "A broken fan"))
        .await
        .expect("broken device");
    devices
        .create_device(fan("b-ok", "B healthy fan"))
        .await
        .expect("healthy device");
    let rules = Arc::new(BrokenDeviceRuleStore {
        inner: InMemoryAlarmRuleStore::new(),
        broken_device_id: "a-broken".to_string(),
    });
    rules
        .create_rule(AlarmRuleRecord {
            rule_id: "rule-ok".to_string(),
            name: "healthy fan hot".to_string(),
            device_id: "b-ok".to_string(),
            sensor_metric: "air_temperature".to_string(),
            condition: AlarmCondition::GreaterThan,
            threshold_value: 30.0,
            severity: AlarmSeverity::Warning,
            is_active: true,
            cooldown_period_seconds: 300,
        })
        .await
        .expect("rule");
    let alarms: Arc<dyn AlarmStore> = Arc::new(InMemoryAlarmStore::new());
    let evaluator = RuleEvaluator::new(
        rules,
        devices,
        alarms.clone(),
        Arc::new(CooldownTracker::new(Arc::new(InMemoryCooldownStore::new()))),
        AlarmLifecycle::new(
            alarms.clone(),
            Arc::new(InMemoryAuditLogStore::new()),
            Arc::new(ManualClock::new(0)),
        ),
        PipelineConfig::default(),
    );

    let outcome = evaluator
        .evaluate_reading(&air_temperature("r-1", 1_000, 35.0))
        .await
        .expect("evaluate");
    assert_eq!(outcome.alarms.len(), 1);
    assert_eq!(outcome.alarms[0].device_id.as_deref(), Some("b-ok"));
    assert_eq!(outcome.errors.len(), 1);
    let error = &outcome.errors[0];
    assert_eq!(error.device_id, "a-broken");
    assert_eq!(error.kind, RuleErrorKind::Storage);
    assert!(error.rule_id.is_empty());
    assert!(error.message.contains("backend down for a-broken"));
    assert_eq!(
        alarms
            .list_alarms(&AlarmQuery::default())
            .await
            .expect("alarms")
            .len(),
        1
    );
}
