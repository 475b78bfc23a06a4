//! Media Player
//!
//! This example demonstrates a hierarchical media player.
//!
//! Key concepts:
//! - Composite states with default children (Active -> Running)
//! - Events bubbling from a leaf to its ancestors
//! - Entry and exit actions mutating application context
//! - Data-carrying events keyed by a separate kind enum
//! - Transition history inspection
//!
//! Run with: cargo run --example media_player

use hsm_engine::{
    state_ids, Dispatched, Event, Machine, Model, Response, StateBuilder, StateTree,
};
use std::sync::Arc;

state_ids! {
    enum Player {
        Top,
        Idle,
        Active,
        Running,
        Paused,
    }
}

#[derive(Clone, Debug)]
enum Command {
    Load(String),
    Play,
    Pause,
    Stop,
    Tick(u32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum CommandKind {
    Load,
    Play,
    Pause,
    Stop,
    Tick,
}

impl Event for Command {
    type Kind = CommandKind;

    fn kind(&self) -> CommandKind {
        match self {
            Self::Load(_) => CommandKind::Load,
            Self::Play => CommandKind::Play,
            Self::Pause => CommandKind::Pause,
            Self::Stop => CommandKind::Stop,
            Self::Tick(_) => CommandKind::Tick,
        }
    }
}

// Application data owned by the machine
#[derive(Debug, Default)]
struct Deck {
    track: Option<String>,
    position: u32,
    spinning: bool,
}

struct MediaPlayer;

impl Model for MediaPlayer {
    type Context = Deck;
    type Event = Command;
    type Error = String;
}

fn build_tree() -> Result<StateTree<MediaPlayer>, hsm_engine::BuildError> {
    StateTree::builder()
        .state(
            StateBuilder::<MediaPlayer>::composite(Player::Top, Player::Idle)
                .named("Top")
                .on(CommandKind::Load, |cx, event| {
                    if let Command::Load(track) = event {
                        println!("  [Top] loading {track}");
                        cx.context_mut().track = Some(track.clone());
                        cx.context_mut().position = 0;
                    }
                    Ok(Response::Handled)
                }),
        )
        .state(
            StateBuilder::<MediaPlayer>::leaf(Player::Idle)
                .named("Idle")
                .parent(Player::Top)
                .on_entry(|deck: &mut Deck| {
                    deck.position = 0;
                    Ok(())
                })
                .on(CommandKind::Play, |cx, _| {
                    if cx.context().track.is_none() {
                        return Err("nothing loaded".to_string());
                    }
                    cx.transition(Player::Active);
                    Ok(Response::Handled)
                }),
        )
        .state(
            StateBuilder::<MediaPlayer>::composite(Player::Active, Player::Running)
                .named("Active")
                .parent(Player::Top)
                .on_entry(|deck: &mut Deck| {
                    println!("  [Active] spinning up");
                    deck.spinning = true;
                    Ok(())
                })
                .on_exit(|deck: &mut Deck| {
                    println!("  [Active] spinning down");
                    deck.spinning = false;
                    Ok(())
                })
                .on(CommandKind::Stop, |cx, _| {
                    cx.transition(Player::Idle);
                    Ok(Response::Handled)
                }),
        )
        .state(
            StateBuilder::<MediaPlayer>::leaf(Player::Running)
                .named("Running")
                .parent(Player::Active)
                .on(CommandKind::Tick, |cx, event| {
                    if let Command::Tick(seconds) = event {
                        cx.context_mut().position += seconds;
                    }
                    Ok(Response::Handled)
                })
                .on(CommandKind::Pause, |cx, _| {
                    cx.transition(Player::Paused);
                    Ok(Response::Handled)
                }),
        )
        .state(
            StateBuilder::<MediaPlayer>::leaf(Player::Paused)
                .named("Paused")
                .parent(Player::Active)
                .on(CommandKind::Play, |cx, _| {
                    cx.transition(Player::Running);
                    Ok(Response::Handled)
                }),
        )
        .build()
}

fn describe(outcome: &Dispatched) -> String {
    match outcome {
        Dispatched::Ignored => "ignored".to_string(),
        Dispatched::Handled { by } => format!("handled by {}", name(*by)),
        Dispatched::Transitioned { by, from, to } => {
            format!("{} -> {} (handled by {})", name(*from), name(*to), name(*by))
        }
    }
}

fn name(id: hsm_engine::StateId) -> &'static str {
    Player::from_id(id).map_or("?", Player::name)
}

fn main() {
    println!("=== Media Player ===\n");

    let tree = match build_tree() {
        Ok(tree) => Arc::new(tree),
        Err(error) => {
            eprintln!("invalid tree: {error}");
            return;
        }
    };
    println!("State tree built with {} states", tree.len());

    let mut machine = Machine::new(Arc::clone(&tree), Deck::default());
    match machine.initialize() {
        Ok(leaf) => println!("Initialized in {}\n", name(leaf)),
        Err(error) => {
            eprintln!("initialization failed: {error}");
            return;
        }
    }

    // Play before loading: the handler fails and the machine stays put
    match machine.inject(&Command::Play) {
        Ok(outcome) => println!("Play: {}", describe(&outcome)),
        Err(error) => println!("Play rejected: {error}"),
    }
    println!("Still in {}\n", name(machine.current_state_id()));

    let script = [
        Command::Load("Blue in Green".to_string()),
        Command::Play,
        Command::Tick(30),
        Command::Pause,
        Command::Tick(5),
        Command::Play,
        Command::Tick(12),
        Command::Stop,
    ];

    for command in &script {
        match machine.inject(command) {
            Ok(outcome) => println!("{command:?}: {}", describe(&outcome)),
            Err(error) => println!("{command:?} failed: {error}"),
        }
        println!(
            "  state={} active={} spinning={} position={}s",
            name(machine.current_state_id()),
            machine.is_in(Player::Active),
            machine.context().spinning,
            machine.context().position
        );
    }

    println!("\n=== Transition History ===");
    for record in machine.history().transitions() {
        let exited: Vec<&str> = record.exited.iter().map(|id| name(*id)).collect();
        let entered: Vec<&str> = record.entered.iter().map(|id| name(*id)).collect();
        println!(
            "{:>8} -> {:<8} exited {:?} entered {:?}",
            record.from.map_or("(init)", name),
            name(record.to),
            exited,
            entered
        );
    }

    let path: Vec<&str> = machine.history().get_path().into_iter().map(name).collect();
    println!("\nPath: {}", path.join(" -> "));
    println!("Deck: {:?}", machine.into_context());
}
