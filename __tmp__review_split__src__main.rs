use anyhow::Result;
use tokio::sync::mpsc;
use tracing::info;

use gatt_probe::logging;
use gatt_probe::mock::MockAdapter;
use gatt_probe::models::{PeripheralHandle, SessionEvent};
use gatt_probe::session::PeripheralSession;
use gatt_probe::settings::SettingsService;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let settings = SettingsService::new()?;
    let _logging_guard = logging::init_logger(&settings.get().log_settings)?;
    if !settings.path().exists() {
        settings.save()?;
    }

    info!("Starting GATT probe demo");

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let event_printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                SessionEvent::StateChanged(state) => println!("state: {:?}", state),
                SessionEvent::SignalStrength(rssi) => println!("signal: {} dBm", rssi),
                SessionEvent::TextRead(text) => println!("text: {}", text),
                SessionEvent::Status(status) => {
                    println!("[{:?}] {}", status.severity, status.message)
                }
            }
        }
    });

    // No platform radio driver ships with this crate; the demo runs one
    // full session cycle against the scripted adapter.
    let adapter = MockAdapter::new();
    let peripheral = PeripheralHandle {
        id: "demo-0001".to_string(),
        name: "Demo Peripheral".to_string(),
    };
    let session = PeripheralSession::new(
        adapter,
        peripheral,
        settings.session_config(),
        event_tx,
    );

    session.connect().await?;
    if let Some(topology) = session.topology().await {
        println!(
            "discovered {} services, {} characteristics",
            topology.services.len(),
            topology.characteristics.len()
        );
    }

    let text = session.read().await?;
    println!("peripheral answered: {}", text);

    session.write(&settings.get().write_payload).await?;
    session.disconnect().await;

    drop(session);
    event_printer.await?;

    info!("Demo complete");
    Ok(())
}


