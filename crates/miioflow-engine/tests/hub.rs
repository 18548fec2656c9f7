mod common;

use std::sync::Arc;

use anyhow::Result;

use miioflow_core::config::{Config, PollingConfig};
use miioflow_core::types::{Id, Value};
use miioflow_devices::devices::{fryer, kettle};
use miioflow_devices::ModelRegistry;
use miioflow_engine::{DeviceHub, Error, PropertyNaming};

use common::{device_config, properties, scheduler_config, MockClient, MockFactory};

fn kitchen_config() -> Config {
    Config {
        scheduler: scheduler_config(),
        devices: vec![
            device_config("kettle-1", kettle::MODEL, PollingConfig::default()),
            device_config("fryer-1", fryer::MODEL, PollingConfig::default()),
        ],
        ..Config::default()
    }
}

#[test_log::test(tokio::test)]
async fn test_hub_builds_independent_schedulers() -> Result<()> {
    let kettle_client = Arc::new(
        MockClient::new().with_snapshots(vec![properties(&[(kettle::TEMPERATURE, Value::Integer(42))])]),
    );
    let fryer_client = Arc::new(MockClient::new().failing_connect());
    let factory = MockFactory::default()
        .with_client("kettle-1", kettle_client.clone())
        .with_client("fryer-1", fryer_client.clone());

    let hub = DeviceHub::from_config(&kitchen_config(), &factory, ModelRegistry::builtin())?;
    assert_eq!(hub.len(), 2);
    assert_eq!(hub.ids(), vec![Id::from_string("fryer-1"), Id::from_string("kettle-1")]);

    // An unreachable fryer has no effect on the kettle
    let fryer = hub.get(&Id::from_string("fryer-1")).expect("fryer scheduler");
    assert!(fryer.fetch(PropertyNaming::Raw).await.is_err());

    let kettle = hub.get(&Id::from_string("kettle-1")).expect("kettle scheduler");
    let fetched = kettle.fetch(PropertyNaming::Friendly).await?;
    assert_eq!(fetched.get("Temperature"), Some(&Value::Integer(42)));
    assert_eq!(kettle.model().model, kettle::MODEL);

    hub.shutdown().await;
    assert!(kettle_client.disconnects() > 0);
    assert!(fryer_client.disconnects() > 0);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_hub_rejects_unknown_model() -> Result<()> {
    let mut config = kitchen_config();
    config.devices[1].model = "acme.toaster.v1".to_string();

    let factory = MockFactory::default()
        .with_client("kettle-1", Arc::new(MockClient::new()))
        .with_client("fryer-1", Arc::new(MockClient::new()));

    let err = DeviceHub::from_config(&config, &factory, ModelRegistry::builtin()).unwrap_err();
    match err {
        Error::Config(message) => {
            assert_eq!(message, "Unknown model acme.toaster.v1 for device fryer-1");
        }
        other => panic!("expected a configuration error, got {:?}", other),
    }
    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_hub_reports_missing_client() -> Result<()> {
    let factory = MockFactory::default().with_client("kettle-1", Arc::new(MockClient::new()));

    let err = DeviceHub::from_config(&kitchen_config(), &factory, ModelRegistry::builtin()).unwrap_err();
    assert!(matches!(err, Error::Protocol { ref label, .. } if label == "client"));
    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_hub_validates_configuration() -> Result<()> {
    let mut config = kitchen_config();
    config.devices[1].id = "kettle-1".to_string();

    let err = DeviceHub::from_config(&config, &MockFactory::default(), ModelRegistry::builtin()).unwrap_err();
    assert!(matches!(err, Error::Core(_)));
    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_start_all_runs_initial_refresh() -> Result<()> {
    let kettle_client = Arc::new(MockClient::new());
    let fryer_client = Arc::new(MockClient::new());
    let factory = MockFactory::default()
        .with_client("kettle-1", kettle_client.clone())
        .with_client("fryer-1", fryer_client.clone());

    let hub = DeviceHub::from_config(&kitchen_config(), &factory, ModelRegistry::builtin())?;
    hub.start_all().await;

    for id in hub.ids() {
        let scheduler = hub.get(&id).expect("scheduler");
        assert!(scheduler.last_snapshot().await?.is_some());
    }
    assert_eq!(kettle_client.connect_attempts(), 1);
    assert_eq!(fryer_client.connect_attempts(), 1);

    hub.shutdown().await;
    Ok(())
}
