//! Administrative control surface.
//!
//! Commands arrive as text from whatever console the host offers, are parsed
//! into [`Command`], and run against a [`ScrollRuntime`] on behalf of an
//! invoking player.

use std::str::FromStr;

use scroll_core::{BindingKey, Destination, ItemId, PlayerId, ScrollItem, parse_destination};

use crate::api::{CommandError, capability};
use crate::pipeline::{TeleportReceipt, TeleportRequest};
use crate::runtime::ScrollRuntime;

const USAGE_BIND: &str = "bind <key>";
const USAGE_BINDAT: &str =
    "bindat <key> <world,x,y,z[,yaw,pitch] | random [world] | random_radius(point=world,x,y,z radius=N)>";
const USAGE_UNBIND: &str = "unbind <key>";
const USAGE_LIST: &str = "list";
const USAGE_GIVE: &str = "give <player> <key> <charges> [scroll]";
const USAGE_USE: &str = "use";
const USAGE_RELOAD: &str = "reload";
const USAGE: &str = "bind | bindat | unbind | list | give | use | reload";

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Bind the invoker's current location.
    Bind { key: BindingKey },
    BindAt {
        key: BindingKey,
        destination: Destination,
    },
    Unbind { key: BindingKey },
    List,
    Give {
        target: PlayerId,
        key: BindingKey,
        charges: u32,
        /// Name of a configured scroll template.
        scroll: Option<String>,
    },
    /// Use the scroll the invoker is holding.
    Use,
    /// Re-read the config from the runtime's config source.
    Reload,
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let name = words.next().ok_or(CommandError::Usage(USAGE))?;
        let args: Vec<&str> = words.collect();

        let command = match (name.to_ascii_lowercase().as_str(), args.as_slice()) {
            ("bind", [key]) => Command::Bind {
                key: BindingKey::parse(key)?,
            },
            ("bind", _) => return Err(CommandError::Usage(USAGE_BIND)),
            ("bindat", [key, destination @ ..]) if !destination.is_empty() => Command::BindAt {
                key: BindingKey::parse(key)?,
                destination: parse_destination(&destination.join(" "))?,
            },
            ("bindat", _) => return Err(CommandError::Usage(USAGE_BINDAT)),
            ("unbind", [key]) => Command::Unbind {
                key: BindingKey::parse(key)?,
            },
            ("unbind", _) => return Err(CommandError::Usage(USAGE_UNBIND)),
            ("list", []) => Command::List,
            ("list", _) => return Err(CommandError::Usage(USAGE_LIST)),
            ("give", [target, key, charges, scroll @ ..]) if scroll.len() <= 1 => Command::Give {
                target: target
                    .parse()
                    .map(PlayerId)
                    .map_err(|_| CommandError::Usage(USAGE_GIVE))?,
                key: BindingKey::parse(key)?,
                charges: charges
                    .parse()
                    .map_err(|_| CommandError::Usage(USAGE_GIVE))?,
                scroll: scroll.first().map(|name| (*name).to_owned()),
            },
            ("give", _) => return Err(CommandError::Usage(USAGE_GIVE)),
            ("use", []) => Command::Use,
            ("use", _) => return Err(CommandError::Usage(USAGE_USE)),
            ("reload", []) => Command::Reload,
            ("reload", _) => return Err(CommandError::Usage(USAGE_RELOAD)),
            _ => return Err(CommandError::Usage(USAGE)),
        };
        Ok(command)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum CommandOutcome {
    Bound {
        key: BindingKey,
        destination: Destination,
    },
    Unbound {
        key: BindingKey,
        /// False when the key was not bound.
        existed: bool,
    },
    Listed(Vec<BindingKey>),
    Given {
        target: PlayerId,
        key: BindingKey,
        charges: u32,
        item: ItemId,
    },
    Teleported(TeleportReceipt),
    Reloaded,
}

impl ScrollRuntime {
    /// Parse and run one console line.
    pub async fn execute_line(
        &self,
        invoker: PlayerId,
        line: &str,
    ) -> Result<CommandOutcome, CommandError> {
        let command = line.parse()?;
        self.execute(invoker, command).await
    }

    #[tracing::instrument(skip(self, invoker), fields(invoker = %invoker))]
    pub async fn execute(
        &self,
        invoker: PlayerId,
        command: Command,
    ) -> Result<CommandOutcome, CommandError> {
        match command {
            Command::Bind { key } => {
                self.require(invoker, capability::BIND)?;
                let location = self
                    .host()
                    .mover
                    .location_of(invoker)
                    .ok_or(CommandError::PlayerOffline(invoker))?;
                let destination = Destination::Fixed(location);
                self.registry().bind(key.clone(), destination.clone())?;
                Ok(CommandOutcome::Bound { key, destination })
            }
            Command::BindAt { key, destination } => {
                self.require(invoker, capability::BIND)?;
                self.registry().bind(key.clone(), destination.clone())?;
                Ok(CommandOutcome::Bound { key, destination })
            }
            Command::Unbind { key } => {
                self.require(invoker, capability::BIND)?;
                let existed = self.registry().unbind(&key)?;
                Ok(CommandOutcome::Unbound { key, existed })
            }
            Command::List => {
                self.require(invoker, capability::BIND)?;
                Ok(CommandOutcome::Listed(self.registry().keys()?))
            }
            Command::Give {
                target,
                key,
                charges,
                scroll,
            } => {
                self.give(invoker, target, key, charges, scroll.as_deref())
                    .await
            }
            Command::Use => {
                let item = self
                    .host()
                    .inventory
                    .held_scroll(invoker)
                    .await?
                    .ok_or(CommandError::NoScrollHeld(invoker))?;
                let receipt = self.submit(TeleportRequest::new(invoker, item)).await?;
                Ok(CommandOutcome::Teleported(receipt))
            }
            Command::Reload => {
                self.require(invoker, capability::ADMIN)?;
                self.reload()?;
                Ok(CommandOutcome::Reloaded)
            }
        }
    }

    async fn give(
        &self,
        invoker: PlayerId,
        target: PlayerId,
        key: BindingKey,
        charges: u32,
        scroll: Option<&str>,
    ) -> Result<CommandOutcome, CommandError> {
        self.require(invoker, capability::ADMIN)?;

        let config = self.config();
        let template = match scroll {
            Some(name) => Some(
                config
                    .template(name)
                    .ok_or_else(|| CommandError::UnknownScroll(name.to_owned()))?,
            ),
            None => None,
        };
        let max = config.max_charges;
        if charges == 0 || charges > max {
            return Err(CommandError::InvalidCharges {
                requested: charges,
                max,
            });
        }
        if !self.registry().contains(&key)? {
            return Err(CommandError::UnknownKey(key));
        }
        if !self.sessions().is_online(target) {
            return Err(CommandError::PlayerOffline(target));
        }

        // Built through the item model so the tag always satisfies its invariants.
        let mut scroll = ScrollItem::with_charges(ItemId(0), charges, max)?.bind(key.clone());
        if let Some(template) = template {
            scroll = scroll.with_template(template);
        }
        let tag = scroll.to_tag();
        let item = self.host().inventory.issue(target, &tag).await?;

        tracing::info!(target = %target, key = %key, "Issued {} with {} charges", item, charges);
        Ok(CommandOutcome::Given {
            target,
            key,
            charges,
            item,
        })
    }

    fn require(&self, invoker: PlayerId, capability: &'static str) -> Result<(), CommandError> {
        if self.host().permissions.has_capability(invoker, capability) {
            Ok(())
        } else {
            Err(CommandError::MissingCapability(capability))
        }
    }
}

#[cfg(test)]
mod tests {
    use scroll_core::{SavedLocation, WorldId};

    use super::*;

    fn key(raw: &str) -> BindingKey {
        BindingKey::parse(raw).unwrap()
    }

    #[test]
    fn parses_each_command() {
        assert_eq!(
            "bind Home".parse::<Command>().unwrap(),
            Command::Bind { key: key("home") }
        );
        assert_eq!(
            "bindat spawn overworld,0,70,0".parse::<Command>().unwrap(),
            Command::BindAt {
                key: key("spawn"),
                destination: SavedLocation::at_block(WorldId::new("overworld"), 0, 70, 0).into(),
            }
        );
        assert_eq!(
            "bindat wilds random_radius(point=overworld,0,70,0 radius=500)"
                .parse::<Command>()
                .unwrap(),
            Command::BindAt {
                key: key("wilds"),
                destination: Destination::RandomRadius {
                    center: SavedLocation::at_block(WorldId::new("overworld"), 0, 70, 0),
                    radius: 500,
                },
            }
        );
        assert_eq!(
            "bindat anywhere random".parse::<Command>().unwrap(),
            Command::BindAt {
                key: key("anywhere"),
                destination: Destination::Random { world: None },
            }
        );
        assert_eq!(
            "unbind home".parse::<Command>().unwrap(),
            Command::Unbind { key: key("home") }
        );
        assert_eq!("LIST".parse::<Command>().unwrap(), Command::List);
        assert_eq!(
            "give 42 home 3".parse::<Command>().unwrap(),
            Command::Give {
                target: PlayerId(42),
                key: key("home"),
                charges: 3,
                scroll: None,
            }
        );
        assert_eq!(
            "give 42 home 3 Swift".parse::<Command>().unwrap(),
            Command::Give {
                target: PlayerId(42),
                key: key("home"),
                charges: 3,
                scroll: Some("Swift".to_owned()),
            }
        );
        assert_eq!("use".parse::<Command>().unwrap(), Command::Use);
        assert_eq!("reload".parse::<Command>().unwrap(), Command::Reload);
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(matches!(
            "".parse::<Command>(),
            Err(CommandError::Usage(USAGE))
        ));
        assert!(matches!(
            "give alex home 1".parse::<Command>(),
            Err(CommandError::Usage(USAGE_GIVE))
        ));
        assert!(matches!(
            "give 1 home -2".parse::<Command>(),
            Err(CommandError::Usage(USAGE_GIVE))
        ));
        assert!(matches!(
            "give 1 home 2 swift extra".parse::<Command>(),
            Err(CommandError::Usage(USAGE_GIVE))
        ));
        assert!(matches!(
            "bindat home overworld,1,2".parse::<Command>(),
            Err(CommandError::Destination(_))
        ));
        assert!(matches!(
            "bindat home overworld,0,3000000000,0".parse::<Command>(),
            Err(CommandError::Destination(_))
        ));
        assert!(matches!(
            "bindat home".parse::<Command>(),
            Err(CommandError::Usage(USAGE_BINDAT))
        ));
        assert!(matches!(
            "reload now".parse::<Command>(),
            Err(CommandError::Usage(USAGE_RELOAD))
        ));
        assert!(matches!(
            "teleport".parse::<Command>(),
            Err(CommandError::Usage(USAGE))
        ));
    }
}
