use domain::{
    AlarmCondition, AlarmStatus, DeviceAction, DeviceClass, DevicePurpose, DeviceType,
    DomainError, SensorMetric,
};

#[test]
fn legacy_labels_resolve_to_interlock_classes() {
    let cases = [
        ("PUMP water main", DeviceType::Pump, DevicePurpose::Water),
        ("VALVE drain north", DeviceType::Valve, DevicePurpose::Drain),
        ("vent FAN", DeviceType::Fan, DevicePurpose::General),
        ("grow lights", DeviceType::Generic, DevicePurpose::General),
    ];
    for (label, device_type, purpose) in cases {
        let class = DeviceClass::from_label(label).expect("class");
        assert_eq!(class, DeviceClass::new(device_type, purpose), "{label}");
    }
}

#[test]
fn pumped_is_not_a_pump() {
    let class = DeviceClass::from_label("PUMPED_STORAGE").expect("class");
    assert_eq!(class.device_type, DeviceType::Generic);
}

#[test]
fn valve_actions_differ_from_switches() {
    assert!(DeviceType::Valve.supports(DeviceAction::Open));
    assert!(!DeviceType::Valve.supports(DeviceAction::On));
    assert!(DeviceType::Heater.supports(DeviceAction::Off));
    assert_eq!(DeviceAction::Close.resulting_status(), "CLOSED");
    assert_eq!("open".parse::<DeviceAction>(), Ok(DeviceAction::Open));
    assert!(matches!(
        "toggle".parse::<DeviceAction>(),
        Err(DomainError::UnknownAction(_))
    ));
}

#[test]
fn rule_inputs_parse_from_api_strings() {
    assert_eq!(" > ".parse::<AlarmCondition>(), Ok(AlarmCondition::GreaterThan));
    assert_eq!("EQUALS".parse::<AlarmCondition>(), Ok(AlarmCondition::Equals));
    assert_eq!("Air_Temperature".parse::<SensorMetric>(), Ok(SensorMetric::AirTemperature));
    assert_eq!(SensorMetric::ALL.len(), 30);
    assert!(AlarmStatus::Acknowledged.is_open());
    assert!(!AlarmStatus::Cleared.is_open());
}
