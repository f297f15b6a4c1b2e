use std::process;

use bluetune::{control::MediaAction, Config, Manager};

#[pollster::main]
async fn main() -> bluetune::Result<()> {
    env_logger::builder()
        .filter_module(env!("CARGO_PKG_NAME"), log::LevelFilter::Debug)
        .init();

    let mut args = std::env::args().skip(1);
    let Some(action) = args.next() else {
        let actions = MediaAction::ALL.map(|a| a.method_name()).join("|");
        eprintln!("usage: control <{}> [address]", actions);
        process::exit(1);
    };

    let manager = Manager::system(Config::default()).await?;
    match args.next() {
        Some(address) => {
            manager.control_media(&action, &address).await?;
            println!("{} sent to {}", action, address);
        }
        None => {
            let device = manager.control_active(&action).await?;
            println!(
                "{} sent to {} ({})",
                action,
                device.display_name(),
                device.identifier()
            );
        }
    }

    Ok(())
}
