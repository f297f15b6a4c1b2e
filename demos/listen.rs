use bluetune::{device::Device, event::Event, listener::Handler, Config, Manager};

struct Printer {
    json: bool,
}

impl Handler for Printer {
    fn on_device_discovered(&mut self, device: &Device) {
        println!(
            "{} {:<24} connected: {}, paired: {}",
            device.identifier(),
            device.display_name(),
            device.is_connected(),
            device.is_paired(),
        );
    }

    fn on_property_changed(&mut self, event: &Event) {
        if !self.json {
            println!("{}", event);
            return;
        }

        match event.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("failed to encode event: {}", e),
        }
    }
}

#[pollster::main]
async fn main() -> bluetune::Result<()> {
    env_logger::builder()
        .filter_module(env!("CARGO_PKG_NAME"), log::LevelFilter::Debug)
        .init();

    let debug = std::env::args().any(|arg| arg == "--debug");
    let scan = std::env::args().any(|arg| arg == "--scan");
    let mut printer = Printer {
        json: std::env::args().any(|arg| arg == "--json"),
    };

    let manager = Manager::system(Config::default().debug(debug)).await?;
    let count = manager.refresh_with(&mut printer).await?;
    println!("{} known devices", count);

    match manager.resolve_active().await {
        Ok(device) => println!("playing: {}", device.display_name()),
        Err(e) => println!("{}", e),
    }

    let listener = manager.listener().await?;
    if scan {
        manager.start_discovery().await?;
        println!("device discovery started...");
    }

    listener.run(printer).await;

    eprintln!("bus connection closed, exiting");
    Ok(())
}
