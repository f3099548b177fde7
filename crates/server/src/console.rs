//! Line-oriented operator console.
//!
//! Simulates players against the reference host: `join`/`leave` drive the
//! session tracker, `goto` moves a player, and `as <player> <command>` runs a
//! scroll command on that player's behalf. Scroll uses run as background
//! requests so the console keeps reading lines during a warmup; every reply
//! goes out through the channel returned by [`Console::new`].
use std::str::FromStr;
use std::sync::Arc;

use scroll_content::MessageCatalog;
use scroll_core::{PlayerId, SavedLocation, parse_location};
use scroll_runtime::{
    Command, CommandError, CommandOutcome, Event, RegistryError, ScrollRuntime, Shared,
    TeleportEvent, Topic,
};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::world::ReferenceHost;

const CONSOLE_USAGE: &str =
    "join <player> | leave <player> | goto <player> <world,x,y,z> | as <player> <command> | help | quit";

#[derive(Clone, Debug, PartialEq)]
pub enum ConsoleLine {
    Join(PlayerId),
    Leave(PlayerId),
    Goto(PlayerId, SavedLocation),
    As(PlayerId, Command),
    Help,
    Quit,
}

/// A console line that did not parse, rendered as a usage hint.
#[derive(Debug)]
pub enum ConsoleError {
    Usage(&'static str),
    Command(CommandError),
}

impl FromStr for ConsoleLine {
    type Err = ConsoleError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (name, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        let player = |raw: &str| {
            raw.parse()
                .map(PlayerId)
                .map_err(|_| ConsoleError::Usage(CONSOLE_USAGE))
        };

        match name.to_ascii_lowercase().as_str() {
            "join" => Ok(ConsoleLine::Join(player(rest)?)),
            "leave" => Ok(ConsoleLine::Leave(player(rest)?)),
            "goto" => {
                let (id, destination) = rest
                    .split_once(char::is_whitespace)
                    .ok_or(ConsoleError::Usage(CONSOLE_USAGE))?;
                let location = parse_location(destination.trim())
                    .map_err(|error| ConsoleError::Command(error.into()))?;
                Ok(ConsoleLine::Goto(player(id)?, location))
            }
            "as" => {
                let (id, command) = rest
                    .split_once(char::is_whitespace)
                    .ok_or(ConsoleError::Usage(CONSOLE_USAGE))?;
                let command = command.parse().map_err(ConsoleError::Command)?;
                Ok(ConsoleLine::As(player(id)?, command))
            }
            "help" | "?" => Ok(ConsoleLine::Help),
            "quit" | "exit" => Ok(ConsoleLine::Quit),
            _ => Err(ConsoleError::Usage(CONSOLE_USAGE)),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Console {
    runtime: ScrollRuntime,
    host: ReferenceHost,
    render: Render,
    output: mpsc::UnboundedSender<String>,
    /// The warmup announcer plus every scroll use still in flight.
    tasks: JoinSet<()>,
}

impl Console {
    pub fn new(
        runtime: ScrollRuntime,
        host: ReferenceHost,
        messages: Arc<Shared<MessageCatalog>>,
    ) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (output, lines) = mpsc::unbounded_channel();
        let render = Render { messages };

        let mut tasks = JoinSet::new();
        tasks.spawn(announce_warmups(
            runtime.events().subscribe(Topic::Teleport),
            render.clone(),
            output.clone(),
        ));

        let console = Self {
            runtime,
            host,
            render,
            output,
            tasks,
        };
        (console, lines)
    }

    pub async fn handle(&mut self, line: &str) -> Flow {
        self.reap();
        if line.trim().is_empty() {
            return Flow::Continue;
        }
        let parsed = match line.parse::<ConsoleLine>() {
            Ok(parsed) => parsed,
            Err(ConsoleError::Usage(usage)) => {
                self.emit(self.render.message("usage", &[("usage", usage)]));
                return Flow::Continue;
            }
            Err(ConsoleError::Command(error)) => {
                self.emit(self.render.error(&error));
                return Flow::Continue;
            }
        };

        match parsed {
            ConsoleLine::Join(player) => {
                self.host.admit(player);
                self.runtime.sessions().join(player);
                tracing::info!(player = %player, "Player joined");
                self.emit(format!("{} joined", player));
            }
            ConsoleLine::Leave(player) => {
                self.runtime.sessions().leave(player);
                tracing::info!(player = %player, "Player left");
                self.emit(format!("{} left", player));
            }
            ConsoleLine::Goto(player, location) => {
                if !self.runtime.sessions().is_online(player) {
                    self.emit(self.render.error(&CommandError::PlayerOffline(player)));
                    return Flow::Continue;
                }
                let description = location.describe();
                self.host.mover.place(player, location);
                self.runtime.sessions().moved(player);
                self.emit(format!("{} moved to {}", player, description));
            }
            ConsoleLine::As(player, Command::Use) => self.spawn_use(player),
            ConsoleLine::As(player, command) => {
                let reply = match self.runtime.execute(player, command).await {
                    Ok(outcome) => self.render.outcome(&outcome),
                    Err(error) => self.render.error(&error),
                };
                self.emit(reply);
            }
            ConsoleLine::Help => {
                self.emit(self.render.message("usage", &[("usage", CONSOLE_USAGE)]));
            }
            ConsoleLine::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    /// Run a scroll use in the background; its reply arrives when it ends.
    fn spawn_use(&mut self, player: PlayerId) {
        let runtime = self.runtime.clone();
        let render = self.render.clone();
        let output = self.output.clone();
        self.tasks.spawn(async move {
            let reply = match runtime.execute(player, Command::Use).await {
                Ok(outcome) => render.outcome(&outcome),
                Err(error) => render.error(&error),
            };
            let _ = output.send(reply);
        });
    }

    fn reap(&mut self) {
        while let Some(result) = self.tasks.try_join_next() {
            if let Err(error) = result {
                tracing::warn!("Console task failed: {}", error);
            }
        }
    }

    fn emit(&self, line: String) {
        if self.output.send(line).is_err() {
            tracing::debug!("Console output closed");
        }
    }
}

async fn announce_warmups(
    mut events: broadcast::Receiver<Event>,
    render: Render,
    output: mpsc::UnboundedSender<String>,
) {
    loop {
        match events.recv().await {
            Ok(Event::Teleport(TeleportEvent::WarmingUp { seconds, .. })) => {
                let line = render.message("warmup", &[("seconds", &seconds.to_string())]);
                if output.send(line).is_err() {
                    break;
                }
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!("Warmup announcer lagged, skipped {} events", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// Renders outcomes through the live message catalog.
#[derive(Clone)]
struct Render {
    messages: Arc<Shared<MessageCatalog>>,
}

impl Render {
    fn message(&self, key: &str, args: &[(&str, &str)]) -> String {
        self.messages.load().render(key, args)
    }

    fn outcome(&self, outcome: &CommandOutcome) -> String {
        match outcome {
            CommandOutcome::Bound { key, destination } => self.message(
                "bound",
                &[("key", key.as_str()), ("destination", &destination.describe())],
            ),
            CommandOutcome::Unbound { key, existed: true } => {
                self.message("unbound", &[("key", key.as_str())])
            }
            CommandOutcome::Unbound { key, existed: false } => {
                self.message("not_bound", &[("key", key.as_str())])
            }
            CommandOutcome::Listed(keys) => {
                let keys = if keys.is_empty() {
                    "(none)".to_owned()
                } else {
                    keys.iter().map(|key| key.as_str()).collect::<Vec<_>>().join(", ")
                };
                self.message("listed", &[("keys", &keys)])
            }
            CommandOutcome::Given {
                target,
                key,
                charges,
                ..
            } => self.message(
                "given",
                &[
                    ("player", &target.0.to_string()),
                    ("key", key.as_str()),
                    ("charges", &charges.to_string()),
                ],
            ),
            CommandOutcome::Teleported(receipt) => {
                let destination = format!(
                    "{} in {}",
                    receipt.destination.feet, receipt.destination.world
                );
                self.message("teleported", &[("destination", &destination)])
            }
            CommandOutcome::Reloaded => self.message("reloaded", &[]),
        }
    }

    fn error(&self, error: &CommandError) -> String {
        match error {
            CommandError::Teleport(aborted) => self.messages.load().teleport(&aborted.reason),
            CommandError::Usage(usage) => self.message("usage", &[("usage", *usage)]),
            CommandError::MissingCapability(capability) => {
                self.message(error.key(), &[("capability", *capability)])
            }
            CommandError::UnknownKey(key) | CommandError::Registry(RegistryError::NotFound(key)) => {
                self.message(error.key(), &[("key", key.as_str())])
            }
            CommandError::InvalidCharges { max, .. } => {
                self.message(error.key(), &[("max", &max.to_string())])
            }
            CommandError::PlayerOffline(player) => {
                self.message(error.key(), &[("player", &player.0.to_string())])
            }
            CommandError::UnknownScroll(scroll) => {
                self.message(error.key(), &[("scroll", scroll.as_str())])
            }
            CommandError::Registry(RegistryError::InvalidLocation(reason)) => {
                self.message(error.key(), &[("reason", &reason.to_string())])
            }
            CommandError::Reload(reason) => {
                tracing::warn!("Reload failed: {}", reason);
                self.message(error.key(), &[("reason", &reason.to_string())])
            }
            CommandError::Key(inner) => self.message("usage", &[("usage", &inner.to_string())]),
            CommandError::Destination(inner) => {
                self.message("usage", &[("usage", &inner.to_string())])
            }
            CommandError::Item(inner) => self.message("usage", &[("usage", &inner.to_string())]),
            CommandError::Registry(_) | CommandError::Host(_) | CommandError::NoScrollHeld(_) => {
                tracing::warn!("Command failed: {}", error);
                self.message(error.key(), &[])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use scroll_core::{BindingKey, ScrollConfig, WorldId};
    use scroll_runtime::InMemoryLocationRepo;

    use super::*;
    use crate::world::OPERATOR;

    struct Harness {
        console: Console,
        lines: mpsc::UnboundedReceiver<String>,
    }

    impl Harness {
        fn new(config: ScrollConfig) -> Self {
            let host = ReferenceHost::new();
            let runtime = host
                .install(ScrollRuntime::builder().config(config))
                .repository(Arc::new(InMemoryLocationRepo::new()))
                .build()
                .unwrap();
            let mut messages = MessageCatalog::default();
            messages.set_prefix("");
            let (console, lines) = Console::new(runtime, host, Arc::new(Shared::new(messages)));
            Self { console, lines }
        }

        /// Lines a command replies with immediately.
        async fn say(&mut self, line: &str) -> Vec<String> {
            assert_eq!(self.console.handle(line).await, Flow::Continue, "{line:?}");
            let mut replies = Vec::new();
            while let Ok(reply) = self.lines.try_recv() {
                replies.push(reply);
            }
            replies
        }

        /// The next line, waiting for background requests.
        async fn next(&mut self) -> String {
            tokio::time::timeout(Duration::from_secs(30), self.lines.recv())
                .await
                .expect("line in time")
                .expect("console open")
        }
    }

    #[test]
    fn parses_console_lines() {
        assert_eq!("join 7".parse::<ConsoleLine>().unwrap(), ConsoleLine::Join(PlayerId(7)));
        assert_eq!(
            "goto 7 nether,1,40,2".parse::<ConsoleLine>().unwrap(),
            ConsoleLine::Goto(PlayerId(7), SavedLocation::at_block(WorldId::new("nether"), 1, 40, 2))
        );
        assert_eq!(
            "as 1 bind Home".parse::<ConsoleLine>().unwrap(),
            ConsoleLine::As(
                PlayerId(1),
                Command::Bind {
                    key: BindingKey::parse("home").unwrap()
                }
            )
        );
        assert_eq!("EXIT".parse::<ConsoleLine>().unwrap(), ConsoleLine::Quit);
        assert!(matches!("join alex".parse::<ConsoleLine>(), Err(ConsoleError::Usage(_))));
        assert!(matches!("as 1 fly".parse::<ConsoleLine>(), Err(ConsoleError::Command(_))));
        assert!(matches!(
            "goto 7 nether,0,inf,0".parse::<ConsoleLine>(),
            Err(ConsoleError::Command(CommandError::Destination(_)))
        ));
        assert!(matches!(
            "goto 7 random".parse::<ConsoleLine>(),
            Err(ConsoleError::Command(CommandError::Destination(_)))
        ));
    }

    #[tokio::test]
    async fn bind_give_and_use_round_trip() {
        let mut harness = Harness::new(ScrollConfig {
            cooldown_seconds: 0,
            max_charges: 3,
            ..ScrollConfig::default()
        });

        harness.say("join 1").await;
        harness.say("join 2").await;
        harness.say("goto 1 nether,5,32,5").await;

        assert_eq!(
            harness.say("as 1 bind hub").await,
            vec!["Bound 'hub' to 5, 32, 5 in nether.".to_owned()]
        );
        assert_eq!(
            harness.say("as 1 give 2 hub 2").await,
            vec!["Gave 2 a scroll to 'hub' with 2 charges.".to_owned()]
        );

        harness.console.handle("as 2 use").await;
        let reply = harness.next().await;
        assert!(reply.starts_with("You have been teleported to"), "{reply}");
        assert!(reply.ends_with("in nether!"), "{reply}");
    }

    #[tokio::test]
    async fn renders_failures_from_the_catalog() {
        let mut harness = Harness::new(ScrollConfig::default());
        harness.say("join 2").await;

        assert_eq!(
            harness.say("as 2 bind home").await,
            vec!["You need the 'scroll.bind' permission to do that.".to_owned()]
        );
        harness.console.handle("as 2 use").await;
        assert_eq!(harness.next().await, "You are not holding a scroll.");
        assert_eq!(
            harness.say(&format!("as {} unbind nowhere", OPERATOR.0)).await,
            vec!["No binding named 'nowhere' exists.".to_owned()]
        );
        assert_eq!(
            harness.say("goto 9 overworld,0,64,0").await,
            vec!["Player 9 is not online.".to_owned()]
        );
        assert_eq!(
            harness.say(&format!("as {} give 2 nowhere 1 swift", OPERATOR.0)).await,
            vec!["Unknown scroll kind 'swift'.".to_owned()]
        );
        assert_eq!(
            harness.say(&format!("as {} reload", OPERATOR.0)).await,
            vec!["Reload failed: runtime has no config source to reload from".to_owned()]
        );
    }

    #[tokio::test]
    async fn random_bindings_are_described() {
        let mut harness = Harness::new(ScrollConfig::default());
        assert_eq!(
            harness
                .say(&format!(
                    "as {} bindat wilds random_radius(point=overworld,0,64,0 radius=50)",
                    OPERATOR.0
                ))
                .await,
            vec!["Bound 'wilds' to a random spot within 50 blocks of 0, 64, 0 in overworld.".to_owned()]
        );
    }

    /// The console keeps reading lines while a scroll warms up, so moving
    /// the player cancels the teleport.
    #[tokio::test(start_paused = true)]
    async fn goto_during_warmup_cancels() {
        let mut harness = Harness::new(ScrollConfig {
            warmup_seconds: 3,
            ..ScrollConfig::default()
        });
        harness.say("join 2").await;
        harness
            .say(&format!("as {} bindat home overworld,5,64,5", OPERATOR.0))
            .await;
        harness.say(&format!("as {} give 2 home 1", OPERATOR.0)).await;

        harness.console.handle("as 2 use").await;
        assert_eq!(harness.next().await, "Teleporting in 3 seconds...");

        assert_eq!(
            harness.say("goto 2 overworld,1,64,1").await,
            vec!["2 moved to 1, 64, 1 in overworld".to_owned()]
        );
        assert_eq!(harness.next().await, "Teleportation cancelled because you moved.");
    }

    #[tokio::test]
    async fn quit_ends_the_session() {
        let mut harness = Harness::new(ScrollConfig::default());
        assert_eq!(harness.console.handle("quit").await, Flow::Quit);
    }
}
