//! Small command-line tool for poking a ZenseHome controller.
//!
//! ```text
//! cargo run --example zense -- <host> <code> [port] [command]
//!
//! commands:
//!   list              discover devices and print their levels (default)
//!   on <id>           switch a device on
//!   off <id>          switch a device off
//!   fade <id> <level> fade a device to 0-100
//! ```

use std::process::ExitCode;

use zensehome::adapter::{entity_kind, level_to_brightness, EntityKind};
use zensehome::{ClientConfig, DeviceId, DiscoveryOrder, Level, ZenseClient, DEFAULT_PORT};

fn usage() -> ExitCode {
    eprintln!("usage: zense <host> <code> [port] [list | on <id> | off <id> | fade <id> <level>]");
    ExitCode::FAILURE
}

fn parse<T: std::str::FromStr>(arg: Option<&String>) -> Option<T> {
    arg.and_then(|s| s.parse().ok())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (Some(host), Some(code)) = (args.first(), parse::<u32>(args.get(1))) else {
        return usage();
    };

    let mut rest = &args[2..];
    let port = match rest.first().and_then(|p| p.parse::<u16>().ok()) {
        Some(port) => {
            rest = &rest[1..];
            port
        }
        None => DEFAULT_PORT,
    };

    let client = ZenseClient::new(ClientConfig::new(host.clone(), port, code));
    if !client.test_connection().await {
        eprintln!("Could not log in to {}:{}", host, port);
        return ExitCode::FAILURE;
    }

    let command = rest.first().map(String::as_str).unwrap_or("list");
    let id: Option<DeviceId> = parse(rest.get(1));
    let ok = match (command, id) {
        ("list", _) => {
            list(&client).await;
            true
        }
        ("on", Some(id)) => client.set_on(id).await,
        ("off", Some(id)) => client.set_off(id).await,
        ("fade", Some(id)) => match parse::<Level>(rest.get(2)) {
            Some(level) => client.fade(id, level).await,
            None => return usage(),
        },
        _ => return usage(),
    };

    client.logout().await;
    if ok {
        ExitCode::SUCCESS
    } else {
        eprintln!("Controller did not answer");
        ExitCode::FAILURE
    }
}

async fn list(client: &ZenseClient) {
    let devices = client.discover(DiscoveryOrder::Ascending).await;
    let ids: Vec<DeviceId> = devices.iter().map(|d| d.id).collect();
    let levels = client.get_levels(&ids).await;
    let overrides = Default::default();

    println!("{:>6}  {:<7} {:>5} {:>5}  name", "id", "kind", "level", "bri");
    for device in &devices {
        let kind = match entity_kind(device, &overrides) {
            EntityKind::Light => "light",
            EntityKind::Switch => "switch",
        };
        match levels.get(&device.id).copied().flatten() {
            Some(level) => println!(
                "{:>6}  {:<7} {:>5} {:>5}  {}",
                device.id,
                kind,
                level,
                level_to_brightness(level),
                device.name
            ),
            None => println!("{:>6}  {:<7} {:>5} {:>5}  {}", device.id, kind, "?", "?", device.name),
        }
    }
}
