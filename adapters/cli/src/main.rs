#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays geotoken sessions headlessly.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use geotoken_cli::{map::ascii_map, trace::read_trace, Action, Session, Settings, TraceFeed};
use geotoken_core::Event;
use geotoken_persistence::FileStore;
use geotoken_world::query;

#[derive(Debug, Parser)]
#[command(name = "geotoken", version)]
#[command(about = "Collect and merge tokens scattered over a map grid")]
struct Cli {
    /// TOML file with game settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the save file
    #[arg(long, global = true)]
    save_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Apply actions in order: n|s|e|w, move:DR,DC, click:ROW,COL, tap:DR,DC, trace:FILE
    Play {
        /// Actions to perform
        #[arg(required = true, allow_hyphen_values = true)]
        actions: Vec<String>,
    },
    /// Print the map around the player
    Show,
    /// Discard all progress and start over at the anchor
    NewGame,
    /// Print a save code for the current session
    Export,
    /// Replace the current session with a save code
    Import {
        /// Code printed by `export`
        code: String,
    },
}

type CliSession = Session<FileStore, TraceFeed>;

/// Entry point for the geotoken command-line interface.
fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref())?;
    let store = FileStore::new(settings.save_dir(cli.save_dir.as_deref()));
    let mut session = Session::start(settings.game, store, TraceFeed::new())?;

    match cli.command {
        CliCommand::Play { actions } => {
            let actions = actions
                .iter()
                .map(|text| Action::parse(text))
                .collect::<Result<Vec<_>>>()?;
            for action in actions {
                let events = perform(&mut session, action)?;
                print_events(&events);
            }
            print_status(&session);
        }
        CliCommand::Show => print_status(&session),
        CliCommand::NewGame => {
            print_events(&session.new_game()?);
            print_status(&session);
        }
        CliCommand::Export => println!("{}", session.export_code()?),
        CliCommand::Import { code } => {
            print_events(&session.import_code(&code)?);
            print_status(&session);
        }
    }
    Ok(())
}

fn perform(session: &mut CliSession, action: Action) -> Result<Vec<Event>> {
    match action {
        Action::Step(direction) => session.press(direction),
        Action::Move {
            delta_row,
            delta_col,
        } => session.push_delta(delta_row, delta_col),
        Action::Click(cell) => session.click(cell),
        Action::Tap {
            delta_row,
            delta_col,
        } => {
            let player = query::player_cell(session.world());
            session.click(player.offset(delta_row, delta_col));
        }
        Action::Trace(path) => return session.replay_trace(read_trace(&path)?),
    }
    session.pump()
}

fn print_events(events: &[Event]) {
    for event in events {
        println!("{}", describe(event));
    }
}

fn describe(event: &Event) -> String {
    match event {
        Event::PlayerMoved { to, .. } => format!("moved to {to}"),
        Event::TokenPickedUp { cell, value } => format!("picked up {value} from {cell}"),
        Event::TokenDropped { cell, value } => format!("dropped {value} on {cell}"),
        Event::TokensMerged { cell, value } => format!("merged into {value} at {cell}"),
        Event::InteractionRejected { cell, reason } => format!("cannot use {cell}: {reason}"),
        Event::WinReached { value } => format!("*** reached {value}! ***"),
        Event::GameReset => "new game started".to_owned(),
        Event::StateRestored => "session restored".to_owned(),
    }
}

fn print_status(session: &CliSession) {
    let world = session.world();
    let player = query::player_cell(world);
    print!(
        "{}",
        ascii_map(session.scene().surface(), player, session.view_radius())
    );
    let held = query::held_token(world)
        .map_or_else(|| "nothing".to_owned(), |value| value.to_string());
    println!("player at {player}, holding {held}");
    println!("{} modified cells", query::modified_count(world));
    if let Some(best) = session.best_win() {
        println!("best win this session: {best}");
    }
}
