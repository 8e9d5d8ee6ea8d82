//! Line-oriented command console
//!
//! One command per line, one JSON object per reply:
//!
//! ```text
//! world <player>
//! refresh <player> <sw_lat> <sw_lng> <ne_lat> <ne_lng>
//! battle <player> <location>
//! summary <player> <location> <true|false>
//! energy <player> <location>
//! chest <player> <location>
//! player <player>
//! wipe <player>
//! reference
//! ```

use roam_core::{GeoPoint, Outcome};
use roam_net::PoiTransport;
use roam_services::{GameService, ServiceResult};
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    World { player: String },
    Refresh {
        player: String,
        southwest: GeoPoint,
        northeast: GeoPoint,
    },
    Battle { player: String, location: String },
    Summary {
        player: String,
        location: String,
        winner: bool,
    },
    Energy { player: String, location: String },
    Chest { player: String, location: String },
    Player { player: String },
    Wipe { player: String },
    /// Static item definitions clients need to render the world.
    Reference,
}

pub fn parse_command(input: &str) -> Option<Command> {
    let mut parts = input.split_whitespace();
    let verb = parts.next()?;
    if verb == "reference" {
        return parts.next().is_none().then_some(Command::Reference);
    }
    let player = parts.next()?.to_string();
    let command = match verb {
        "world" => Command::World { player },
        "player" => Command::Player { player },
        "wipe" => Command::Wipe { player },
        "refresh" => {
            let mut coord = || parts.next()?.parse::<f64>().ok();
            let southwest = GeoPoint::new(coord()?, coord()?);
            let northeast = GeoPoint::new(coord()?, coord()?);
            Command::Refresh {
                player,
                southwest,
                northeast,
            }
        }
        "battle" | "energy" | "chest" => {
            let location = parts.next()?.to_string();
            match verb {
                "battle" => Command::Battle { player, location },
                "energy" => Command::Energy { player, location },
                _ => Command::Chest { player, location },
            }
        }
        "summary" => {
            let location = parts.next()?.to_string();
            let winner = parts.next()?.parse().ok()?;
            Command::Summary {
                player,
                location,
                winner,
            }
        }
        _ => return None,
    };
    if parts.next().is_some() {
        return None;
    }
    Some(command)
}

/// Run one command and render its reply.
pub fn execute<T: PoiTransport>(service: &GameService<T>, command: &Command) -> Value {
    let result = match command {
        Command::World { player } => service.world(player).map(|world| completed(&world)),
        Command::Refresh {
            player,
            southwest,
            northeast,
        } => service
            .refresh_world(player, *southwest, *northeast)
            .map(|(world, _)| completed(&world)),
        Command::Battle { player, location } => {
            service.start_battle(player, location).map(reply)
        }
        Command::Summary {
            player,
            location,
            winner,
        } => service.battle_summary(player, location, *winner).map(reply),
        Command::Energy { player, location } => {
            service.drain_energy_station(player, location).map(reply)
        }
        Command::Chest { player, location } => service.open_chest(player, location).map(reply),
        Command::Player { player } => service.player(player).map(|data| completed(&data)),
        Command::Wipe { player } => service
            .remove_world(player)
            .map(|removed| completed(&json!({ "removed": removed }))),
        Command::Reference => {
            let items: Vec<_> = service.assets().reference.iter().collect();
            Ok(completed(&items))
        }
    };
    render(result)
}

fn completed<T: Serialize>(value: &T) -> Value {
    json!({ "status": "ok", "result": value })
}

fn reply<T: Serialize>(outcome: Outcome<T>) -> Value {
    match outcome {
        Outcome::Completed(value) => completed(&value),
        Outcome::Rejected(rejection) => json!({ "status": "not_yet", "rejection": rejection }),
    }
}

fn render(result: ServiceResult<Value>) -> Value {
    result.unwrap_or_else(|err| {
        tracing::warn!(error = %err, "Command failed");
        json!({
            "status": "error",
            "error": err.to_string(),
            "transient": err.is_transient(),
        })
    })
}
