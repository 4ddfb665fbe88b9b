//! Zombie Level
//!
//! This example wires three universes together and runs them from one tick loop.
//!
//! Key concepts:
//! - A game flow machine bootstrapping through nested transitions
//! - A level machine driving every zombie machine from its hooks
//! - Zombies chasing the player with polled background work
//! - Pausing cancels every zombie's polling on exit
//!
//! Run with: RUST_LOG=debug cargo run --example zombie_level

use statewright::agents::{FollowPreferences, FollowState, IdleState, NavAgent, Position, Tracked};
use statewright::background::Scheduler;
use statewright::core::{BaseState, State};
use statewright::engine::{MachineConfig, MachineHandle, StateMachine, TransitionError};
use statewright::registry::{BuildError, RegistryBuilder};
use statewright::state_ids;
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

state_ids! {
    enum GameState {
        Bootstrap,
        LoadLevel,
        GameLoop,
    }
    universe: "game"
}

state_ids! {
    enum LevelState {
        Start,
        Loop,
        Pause,
    }
    universe: "level"
}

state_ids! {
    enum ZombieState {
        Idle,
        Follow,
    }
    universe: "zombie"
}

// Navigation agent printing its commands
struct ConsoleAgent {
    name: String,
}

impl NavAgent for ConsoleAgent {
    fn set_destination(&self, destination: Position) {
        println!(
            "  {} heads to ({:.1}, {:.1}, {:.1})",
            self.name, destination.x, destination.y, destination.z
        );
    }

    fn set_stopped(&self, stopped: bool) {
        println!("  {} {}", self.name, if stopped { "stops" } else { "resumes" });
    }
}

struct Player {
    at: Cell<Position>,
}

impl Tracked for Player {
    fn position(&self) -> Position {
        self.at.get()
    }
}

// Game flow: each state hands over to the next
struct Forward {
    label: &'static str,
    game: MachineHandle<GameState>,
    next: Option<GameState>,
}

impl BaseState for Forward {}

impl State for Forward {
    fn enter(&self) -> Result<(), TransitionError> {
        println!("[game] {}", self.label);
        match self.next {
            Some(next) => self.game.enter(next),
            None => Ok(()),
        }
    }
}

struct Start {
    level: MachineHandle<LevelState>,
    zombies: Rc<Vec<StateMachine<ZombieState>>>,
    player: Rc<Player>,
}

impl BaseState for Start {}

impl State for Start {
    fn enter(&self) -> Result<(), TransitionError> {
        println!("[level] start: zombies wake up");
        for zombie in self.zombies.iter() {
            let target: Rc<dyn Tracked> = self.player.clone();
            zombie.enter_with(ZombieState::Follow, target)?;
        }
        self.level.enter(LevelState::Loop)
    }
}

struct Running;

impl BaseState for Running {}

impl State for Running {
    fn enter(&self) -> Result<(), TransitionError> {
        println!("[level] loop");
        Ok(())
    }
}

struct Pause {
    zombies: Rc<Vec<StateMachine<ZombieState>>>,
}

impl BaseState for Pause {}

impl State for Pause {
    fn enter(&self) -> Result<(), TransitionError> {
        println!("[level] pause: zombies freeze");
        for zombie in self.zombies.iter() {
            zombie.enter(ZombieState::Idle)?;
        }
        Ok(())
    }
}

fn spawn_zombie(index: usize, scheduler: &Scheduler) -> Result<StateMachine<ZombieState>, BuildError> {
    let agent = Rc::new(ConsoleAgent {
        name: format!("zombie-{index}"),
    });
    let (idle, follow) = (Rc::clone(&agent), agent);
    let scheduler = scheduler.clone();
    let preferences = FollowPreferences {
        position_threshold: 0.5,
        update_interval: 0.25,
    };

    let registry = RegistryBuilder::new()
        .state(ZombieState::Idle, move || IdleState::new(Rc::clone(&idle)))
        .payloaded(ZombieState::Follow, move || {
            FollowState::new(Rc::clone(&follow), scheduler.clone(), preferences.clone())
        })
        .build()?;

    let machine = StateMachine::new(MachineConfig::default().with_label(format!("zombie-{index}")));
    machine.install(registry)?;
    Ok(machine)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    println!("=== Zombie Level Example ===\n");

    let scheduler = Scheduler::new();
    let player = Rc::new(Player {
        at: Cell::new(Position::default()),
    });
    let zombies = Rc::new(
        (0..3)
            .map(|index| spawn_zombie(index, &scheduler))
            .collect::<Result<Vec<_>, _>>()?,
    );

    let level = StateMachine::build(MachineConfig::default(), |handle| {
        let (start_zombies, pause_zombies) = (Rc::clone(&zombies), Rc::clone(&zombies));
        let start_player = Rc::clone(&player);
        RegistryBuilder::new()
            .state(LevelState::Start, move || Start {
                level: handle.clone(),
                zombies: Rc::clone(&start_zombies),
                player: Rc::clone(&start_player),
            })
            .state(LevelState::Loop, || Running)
            .state(LevelState::Pause, move || Pause {
                zombies: Rc::clone(&pause_zombies),
            })
            .build()
    })?;

    let game = StateMachine::build(MachineConfig::default(), |handle| {
        let (bootstrap, load) = (handle.clone(), handle.clone());
        RegistryBuilder::new()
            .state(GameState::Bootstrap, move || Forward {
                label: "bootstrap",
                game: bootstrap.clone(),
                next: Some(GameState::LoadLevel),
            })
            .state(GameState::LoadLevel, move || Forward {
                label: "load level",
                game: load.clone(),
                next: Some(GameState::GameLoop),
            })
            .state(GameState::GameLoop, move || Forward {
                label: "game loop",
                game: handle.clone(),
                next: None,
            })
            .build()
    })?;

    game.enter(GameState::Bootstrap)?;
    level.enter(LevelState::Start)?;

    println!("\n--- ticking ---");
    let tick = Duration::from_millis(100);
    for frame in 1..=10 {
        let at = player.at.get();
        player.at.set(Position::new(at.x + 0.2, at.y, at.z + 0.1));
        scheduler.advance(tick)?;

        if frame == 6 {
            level.enter(LevelState::Pause)?;
        }
    }

    println!("\n--- summary ---");
    println!("game:  {:?}", game.current());
    println!("level: {:?}", level.current());
    for zombie in zombies.iter() {
        println!("{}: {:?}", zombie.label(), zombie.current());
    }
    println!("pending background tasks: {}", scheduler.pending());
    println!("\nlevel history:\n{}", level.history().to_json()?);

    Ok(())
}
