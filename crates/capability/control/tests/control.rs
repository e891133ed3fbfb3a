use async_trait::async_trait;
use domain::{
    DeviceAction, DevicePurpose, DeviceType, ManualClock, SensorMetric, SensorReading,
};
use greenhouse_config::InterlockConfig;
use greenhouse_control::{ControlError, DeviceControlService, InterlockEngine};
use greenhouse_storage::{
    AuditLogStore, AuditQuery, DEVICE_STATUS_UNKNOWN, DeviceRecord, DeviceStore, DeviceUpdate,
    InMemoryAuditLogStore, InMemoryDeviceStore, InMemoryReadingStore, ReadingStore, StorageError,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

fn device(
    device_id: &str,
    control_id: &str,
    device_type: DeviceType,
    purpose: DevicePurpose,
) -> DeviceRecord {
    DeviceRecord {
        device_id: device_id.to_string(),
        control_id: control_id.to_string(),
        name: format!("{} {}", purpose, device_type),
        device_type,
        purpose,
        status: DEVICE_STATUS_UNKNOWN.to_string(),
        is_enabled: true,
        last_status_update_ms: None,
        version: 0,
    }
}

struct Harness {
    devices: Arc<dyn DeviceStore>,
    readings: Arc<InMemoryReadingStore>,
    audit: Arc<InMemoryAuditLogStore>,
    service: DeviceControlService,
}

impl Harness {
    async fn new() -> Self {
        Self::with_device_store(Arc::new(InMemoryDeviceStore::new())).await
    }

    async fn with_device_store(devices: Arc<dyn DeviceStore>) -> Self {
        for record in [
            device("pump-1", "main-pump", DeviceType::Pump, DevicePurpose::Water),
            device("valve-1", "drain-valve", DeviceType::Valve, DevicePurpose::Drain),
            device("fan-1", "vent-fan", DeviceType::Fan, DevicePurpose::General),
        ] {
            devices.create_device(record).await.expect("device");
        }
        let readings = Arc::new(InMemoryReadingStore::new());
        let audit = Arc::new(InMemoryAuditLogStore::new());
        let service = DeviceControlService::new(
            devices.clone(),
            readings.clone(),
            audit.clone(),
            Arc::new(InterlockEngine::with_defaults(&InterlockConfig::default())),
            Arc::new(ManualClock::new(42_000)),
        );
        Self {
            devices,
            readings,
            audit,
            service,
        }
    }

    async fn push_reading(&self, ts_ms: i64, metric: SensorMetric, value: f64) {
        self.readings
            .insert_reading(
                SensorReading::new(format!("r-{}", ts_ms), ts_ms).with_metric(metric, value),
            )
            .await
            .expect("reading");
    }
}

#[tokio::test]
async fn water_pump_blocked_on_low_tank() {
    let harness = Harness::new().await;
    harness
        .push_reading(1_000, SensorMetric::TankWaterVolume, 5.0)
        .await;

    let err = harness
        .service
        .control_device("main-pump", DeviceAction::On, "operator")
        .await
        .expect_err("blocked");
    match err {
        ControlError::Interlock {
            reason, verdict, ..
        } => {
            assert_eq!(reason, "Insufficient water level in tank");
            assert!(verdict.blocked);
            assert_eq!(
                verdict.conditions.get("tank_water_volume"),
                Some(&serde_json::json!(5.0))
            );
        }
        other => panic!("unexpected error: {other}"),
    }

    let pump = harness
        .devices
        .find_device("pump-1")
        .await
        .expect("find")
        .expect("pump");
    assert_eq!(pump.status, DEVICE_STATUS_UNKNOWN);
    let logs = harness.audit.list_audit_logs(&AuditQuery::recent(10)).await.expect("audit");
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].result, "blocked");
}

#[tokio::test]
async fn water_pump_allowed_with_full_tank() {
    let harness = Harness::new().await;
    harness
        .push_reading(1_000, SensorMetric::TankWaterVolume, 50.0)
        .await;

    let outcome = harness
        .service
        .control_device("main-pump", DeviceAction::On, "operator")
        .await
        .expect("control");
    assert!(!outcome.verdict.blocked);
    assert_eq!(outcome.device.status, "ON");
    assert_eq!(outcome.device.last_status_update_ms, Some(42_000));
    assert_eq!(outcome.device.version, 1);
    assert_eq!(
        outcome.message,
        "Device WATER PUMP (main-pump) ON command sent successfully"
    );

    let logs = harness.audit.list_audit_logs(&AuditQuery::recent(10)).await.expect("audit");
    assert_eq!(logs[0].action, "DEVICE.CONTROL");
    assert_eq!(logs[0].resource, "device:main-pump");
    assert_eq!(logs[0].result, "success");
}

#[tokio::test]
async fn drain_valve_checks_latest_ph() {
    let harness = Harness::new().await;
    harness.push_reading(1_000, SensorMetric::WaterPh, 7.0).await;
    harness.push_reading(2_000, SensorMetric::WaterPh, 3.0).await;

    let err = harness
        .service
        .control_device("drain-valve", DeviceAction::Open, "operator")
        .await
        .expect_err("blocked");
    assert_eq!(
        err.to_string(),
        "safety interlock active: Water pH level unsafe: 3"
    );

    harness.push_reading(3_000, SensorMetric::WaterPh, 7.0).await;
    let outcome = harness
        .service
        .control_device("drain-valve", DeviceAction::Open, "operator")
        .await
        .expect("control");
    assert_eq!(outcome.device.status, "OPEN");

    let outcome = harness
        .service
        .control_device("drain-valve", DeviceAction::Close, "operator")
        .await
        .expect("close");
    assert_eq!(outcome.device.status, "CLOSED");
    assert_eq!(outcome.device.version, 2);
}

#[tokio::test]
async fn no_reading_allows_with_warning() {
    let harness = Harness::new().await;
    let outcome = harness
        .service
        .control_device("main-pump", DeviceAction::On, "operator")
        .await
        .expect("control");
    assert!(!outcome.verdict.blocked);
    assert!(outcome.verdict.conditions.contains_key("warning"));
}

#[tokio::test]
async fn rejects_unknown_disabled_and_unsupported() {
    let harness = Harness::new().await;

    let err = harness
        .service
        .control_device("missing", DeviceAction::On, "operator")
        .await
        .expect_err("missing");
    assert!(matches!(err, ControlError::NotFound(_)));

    let err = harness
        .service
        .control_device("vent-fan", DeviceAction::Open, "operator")
        .await
        .expect_err("unsupported");
    assert_eq!(
        err.to_string(),
        "invalid action OPEN for device type FAN, valid actions are: ON, OFF"
    );

    harness
        .devices
        .update_device(
            "fan-1",
            DeviceUpdate {
                is_enabled: Some(false),
                ..DeviceUpdate::default()
            },
        )
        .await
        .expect("update")
        .expect("fan");
    let err = harness
        .service
        .control_device("vent-fan", DeviceAction::On, "operator")
        .await
        .expect_err("disabled");
    assert!(matches!(err, ControlError::DeviceDisabled(_)));
}

#[tokio::test]
async fn preview_uses_default_action() {
    let harness = Harness::new().await;
    harness.push_reading(1_000, SensorMetric::WaterPh, 10.0).await;

    let previews = harness.service.preview_interlocks().await.expect("preview");
    assert_eq!(previews.len(), 3);
    let valve = previews
        .iter()
        .find(|preview| preview.device.control_id == "drain-valve")
        .expect("valve");
    assert_eq!(valve.action, DeviceAction::Open);
    assert!(valve.interlock.blocked);
    let fan = previews
        .iter()
        .find(|preview| preview.device.control_id == "vent-fan")
        .expect("fan");
    assert_eq!(fan.action, DeviceAction::On);
    assert!(!fan.interlock.blocked);
}

/// 前 `conflicts` 次状态写入返回版本冲突。
struct ContendedDeviceStore {
    inner: InMemoryDeviceStore,
    conflicts: AtomicU32,
}

impl ContendedDeviceStore {
    fn new(conflicts: u32) -> Self {
        Self {
            inner: InMemoryDeviceStore::new(),
            conflicts: AtomicU32::new(conflicts),
        }
    }
}

#[async_trait]
impl DeviceStore for ContendedDeviceStore {
    async fn list_devices(&self) -> Result<Vec<DeviceRecord>, StorageError> {
        self.inner.list_devices().await
    }

    async fn find_device(&self, device_id: &str) -> Result<Option<DeviceRecord>, StorageError> {
        self.inner.find_device(device_id).await
    }

    async fn find_by_control_id(
        &self,
        control_id: &str,
    ) -> Result<Option<DeviceRecord>, StorageError> {
        self.inner.find_by_control_id(control_id).await
    }

    async fn create_device(&self, record: DeviceRecord) -> Result<DeviceRecord, StorageError> {
        self.inner.create_device(record).await
    }

    async fn update_device(
        &self,
        device_id: &str,
        update: DeviceUpdate,
    ) -> Result<Option<DeviceRecord>, StorageError> {
        self.inner.update_device(device_id, update).await
    }

    async fn update_status(
        &self,
        device_id: &str,
        expected_version: i64,
        status: &str,
        ts_ms: i64,
    ) -> Result<Option<DeviceRecord>, StorageError> {
        let remaining = self.conflicts.load(Ordering::SeqCst);
        if remaining > 0 {
            self.conflicts.store(remaining - 1, Ordering::SeqCst);
            return Ok(None);
        }
        self.inner
            .update_status(device_id, expected_version, status, ts_ms)
            .await
    }

    async fn delete_device(&self, device_id: &str) -> Result<bool, StorageError> {
        self.inner.delete_device(device_id).await
    }
}

#[tokio::test]
async fn single_conflict_is_retried() {
    let harness = Harness::with_device_store(Arc::new(ContendedDeviceStore::new(1))).await;
    let outcome = harness
        .service
        .control_device("vent-fan", DeviceAction::On, "operator")
        .await
        .expect("retried");
    assert_eq!(outcome.device.status, "ON");
}

#[tokio::test]
async fn persistent_conflict_surfaces() {
    let harness = Harness::with_device_store(Arc::new(ContendedDeviceStore::new(5))).await;
    let err = harness
        .service
        .control_device("vent-fan", DeviceAction::On, "operator")
        .await
        .expect_err("conflict");
    assert!(matches!(err, ControlError::Conflict(_)));
    let fan = harness
        .devices
        .find_device("fan-1")
        .await
        .expect("find")
        .expect("fan");
    assert_eq!(fan.status, DEVICE_STATUS_UNKNOWN);
}

#[tokio::test]
async fn concurrent_commands_serialize_per_device() {
    let harness = Arc::new(Harness::new().await);
    let mut handles = Vec::new();
    for index in 0..6 {
        let harness = harness.clone();
        let action = if index % 2 == 0 {
            DeviceAction::On
        } else {
            DeviceAction::Off
        };
        handles.push(tokio::spawn(async move {
            harness
                .service
                .control_device("vent-fan", action, "operator")
                .await
        }));
    }
    for handle in handles {
        handle.await.expect("join").expect("control");
    }
    let fan = harness
        .devices
        .find_device("fan-1")
        .await
        .expect("find")
        .expect("fan");
    assert_eq!(fan.version, 6);
}
