//! The teleport request state machine.
//!
//! A request moves through `Validating`, `ResolvingDestination`, an optional
//! `WarmingUp`, `CheckingGates`, and `Executing`. Everything before
//! `CheckingGates` is read-only and runs without locks. From `CheckingGates`
//! on, the request holds its player's lock and then its item's lock, so the
//! cooldown and charge checks and their commits are one atomic step per key.
//! Lock order is always player then item. Each request reads one config
//! snapshot when it starts, so a reload never changes a request mid-flight.

mod stage;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use scroll_core::{
    BindingKey, ItemId, PlayerId, SafeLocation, ScrollConfig, ScrollItem, TeleportError,
};
use tracing::Instrument;

pub use stage::{Aborted, Stage, TeleportReceipt, TeleportRequest};

use crate::api::{Host, RegistryError, capability};
use crate::cooldown::{CooldownTracker, remaining_secs};
use crate::events::{EventBus, TeleportEvent};
use crate::registry::LocationRegistry;
use crate::resolver::SafeDestinationResolver;
use crate::session::{Interrupt, SessionTracker, SessionWatch};
use crate::utils::{KeyedLocks, Shared};

type StageResult<T> = Result<T, TeleportError>;

pub struct TeleportPipeline {
    config: Arc<Shared<ScrollConfig>>,
    host: Host,
    registry: Arc<LocationRegistry>,
    cooldowns: Arc<CooldownTracker>,
    sessions: Arc<SessionTracker>,
    resolver: SafeDestinationResolver,
    events: EventBus,
    players: KeyedLocks<PlayerId>,
    items: KeyedLocks<ItemId>,
    next_request: AtomicU64,
}

/// State carried from the lock-free stages into the gated ones.
struct Prepared {
    key: BindingKey,
    destination: SafeLocation,
    presence: SessionWatch,
}

impl TeleportPipeline {
    pub fn new(
        config: Arc<Shared<ScrollConfig>>,
        host: Host,
        resolver: SafeDestinationResolver,
        registry: Arc<LocationRegistry>,
        cooldowns: Arc<CooldownTracker>,
        sessions: Arc<SessionTracker>,
        events: EventBus,
    ) -> Self {
        Self {
            config,
            host,
            registry,
            cooldowns,
            sessions,
            resolver,
            events,
            players: KeyedLocks::new(),
            items: KeyedLocks::new(),
            next_request: AtomicU64::new(1),
        }
    }

    /// Run one request to completion or abort.
    ///
    /// Every outcome is published on [`crate::events::Topic::Teleport`].
    pub async fn submit(&self, request: TeleportRequest) -> Result<TeleportReceipt, Aborted> {
        let id = self.next_request.fetch_add(1, Ordering::Relaxed);
        let span = tracing::info_span!(
            "teleport",
            request = id,
            player = %request.player,
            item = %request.item
        );

        let outcome = self.run(id, request).instrument(span.clone()).await;

        let _entered = span.enter();
        match &outcome {
            Ok(receipt) => {
                tracing::info!(
                    key = %receipt.key,
                    "Teleported to {} ({} charges left)",
                    receipt.destination.feet,
                    receipt.charges_left
                );
                self.events.publish(TeleportEvent::Completed {
                    request: id,
                    player: request.player,
                    item: request.item,
                    key: receipt.key.clone(),
                    destination: receipt.destination.clone(),
                    charges_left: receipt.charges_left,
                });
            }
            Err(aborted) => {
                match &aborted.reason {
                    TeleportError::InvalidState(detail) => {
                        tracing::error!(stage = %aborted.stage, "Invariant violated: {}", detail)
                    }
                    TeleportError::ExecutionFailed(detail) => {
                        tracing::warn!(stage = %aborted.stage, "Host failure: {}", detail)
                    }
                    reason => tracing::debug!(stage = %aborted.stage, "Aborted: {}", reason.key()),
                }
                self.events.publish(TeleportEvent::Aborted {
                    request: id,
                    player: request.player,
                    item: request.item,
                    stage: aborted.stage,
                    reason: aborted.reason.clone(),
                });
            }
        }
        outcome
    }

    async fn run(&self, id: u64, request: TeleportRequest) -> Result<TeleportReceipt, Aborted> {
        let TeleportRequest { player, item } = request;
        let config = self.config.load();

        tracing::debug!(stage = %Stage::Validating);
        let Some(mut presence) = self.sessions.watch(player) else {
            return Err(Aborted::new(Stage::Validating, TeleportError::Abandoned));
        };
        let (key, scroll) = self
            .validate(item, &config)
            .await
            .map_err(|reason| Aborted::new(Stage::Validating, reason))?;

        tracing::debug!(stage = %Stage::ResolvingDestination, key = %key);
        let destination = tokio::select! {
            biased;
            _ = presence.disconnected() => {
                return Err(Aborted::new(Stage::ResolvingDestination, TeleportError::Abandoned));
            }
            resolved = self.resolve(&key, &config) => {
                resolved.map_err(|reason| Aborted::new(Stage::ResolvingDestination, reason))?
            }
        };

        let warmup = scroll.warmup(config.warmup());
        if !warmup.is_zero() {
            tracing::debug!(stage = %Stage::WarmingUp, "Waiting {}s", warmup.as_secs());
            self.events.publish(TeleportEvent::WarmingUp {
                request: id,
                player,
                item,
                seconds: warmup.as_secs(),
            });
            let cancel_on_move = scroll.cancels_on_move(config.cancel_on_move);
            tokio::select! {
                biased;
                interrupt = presence.interrupted(cancel_on_move) => {
                    let reason = match interrupt {
                        Interrupt::Moved => TeleportError::Cancelled,
                        Interrupt::Disconnected => TeleportError::Abandoned,
                    };
                    return Err(Aborted::new(Stage::WarmingUp, reason));
                }
                _ = tokio::time::sleep(warmup) => {}
            }
        }

        let prepared = Prepared {
            key,
            destination,
            presence,
        };
        self.gate_and_execute(id, request, prepared, &config).await
    }

    /// Bound key and state of a scroll that still has a charge.
    async fn validate(
        &self,
        item: ItemId,
        config: &ScrollConfig,
    ) -> StageResult<(BindingKey, ScrollItem)> {
        let scroll = self.load_item(item, config).await?;
        let key = scroll.bound_key().cloned().ok_or(TeleportError::NoBinding)?;
        if !scroll.can_consume() {
            return Err(TeleportError::NoCharges);
        }
        Ok((key, scroll))
    }

    async fn resolve(&self, key: &BindingKey, config: &ScrollConfig) -> StageResult<SafeLocation> {
        let destination = self.registry.resolve(key).map_err(|error| {
            if let RegistryError::Repository(inner) = &error {
                tracing::warn!(key = %key, "Registry read failed: {}", inner);
            }
            TeleportError::DestinationUnavailable(key.to_string())
        })?;
        self.resolver.resolve(key, &destination, config).await
    }

    async fn gate_and_execute(
        &self,
        id: u64,
        request: TeleportRequest,
        prepared: Prepared,
        config: &ScrollConfig,
    ) -> Result<TeleportReceipt, Aborted> {
        let TeleportRequest { player, item } = request;
        let Prepared {
            key,
            destination,
            mut presence,
        } = prepared;
        let gated = |reason: TeleportError| Aborted::new(Stage::CheckingGates, reason);

        // A player who leaves while queued behind another request stops waiting.
        let locked = async {
            let player_guard = self.players.lock(player).await;
            let item_guard = self.items.lock(item).await;
            (player_guard, item_guard)
        };
        let (_player_guard, _item_guard) = tokio::select! {
            biased;
            _ = presence.disconnected() => return Err(gated(TeleportError::Abandoned)),
            guards = locked => guards,
        };

        tracing::debug!(stage = %Stage::CheckingGates);
        // Another request may have spent the scroll while this one resolved.
        let scroll = self.load_item(item, config).await.map_err(gated)?;
        if scroll.bound_key().is_none() {
            return Err(gated(TeleportError::NoBinding));
        }
        if !scroll.can_consume() {
            return Err(gated(TeleportError::NoCharges));
        }
        if !self.sessions.is_online(player) {
            return Err(gated(TeleportError::Abandoned));
        }
        if let Some(remaining) = self.cooldowns.remaining(player) {
            return Err(gated(TeleportError::OnCooldown {
                remaining_secs: remaining_secs(remaining),
            }));
        }
        if !self.host.permissions.has_capability(player, capability::USE) {
            return Err(gated(TeleportError::Forbidden));
        }
        let charged = self.charge(player, config).await.map_err(gated)?;

        tracing::debug!(stage = %Stage::Executing, "Relocating to {}", destination.feet);
        if let Err(error) = self.host.mover.relocate(player, &destination).await {
            self.refund(player, charged).await;
            return Err(Aborted::new(
                Stage::Executing,
                TeleportError::ExecutionFailed(error.to_string()),
            ));
        }

        let spent = scroll
            .consume()
            .map_err(|reason| Aborted::new(Stage::Executing, reason))?;
        let item_removed = spent.charges() == 0 && config.consume_on_empty;
        let committed = if item_removed {
            self.host.inventory.remove(item).await
        } else {
            self.host.inventory.store(item, &spent.to_tag()).await
        };
        if let Err(error) = committed {
            return Err(Aborted::new(
                Stage::Executing,
                TeleportError::InvalidState(format!(
                    "relocated but could not save spent charge on {}: {}",
                    item, error
                )),
            ));
        }
        self.cooldowns
            .mark_used(player, scroll.cooldown(config.cooldown()));

        tracing::debug!(stage = %Stage::Completed);
        Ok(TeleportReceipt {
            request: id,
            key,
            destination,
            charges_left: spent.charges(),
            item_removed,
        })
    }

    /// Decode the item's tag against the snapshot's `maxCharges`.
    async fn load_item(&self, item: ItemId, config: &ScrollConfig) -> StageResult<ScrollItem> {
        let tag = self
            .host
            .inventory
            .load(item)
            .await
            .map_err(|error| TeleportError::ExecutionFailed(error.to_string()))?
            .ok_or(TeleportError::NoCharges)?;
        ScrollItem::from_tag(item, &tag, config.max_charges)
            .map_err(|error| TeleportError::InvalidState(format!("{} has a bad tag: {}", item, error)))
    }

    /// Deduct the configured cost. Returns the amount actually charged.
    async fn charge(&self, player: PlayerId, config: &ScrollConfig) -> StageResult<u64> {
        let cost = config.teleport_cost;
        if cost == 0 {
            return Ok(0);
        }
        let economy = self.host.economy.as_ref().ok_or_else(|| {
            TeleportError::InvalidState("teleport cost configured without an economy".into())
        })?;
        match economy.try_charge(player, cost).await {
            Ok(true) => Ok(cost),
            Ok(false) => Err(TeleportError::InsufficientCost { cost }),
            Err(error) => Err(TeleportError::ExecutionFailed(error.to_string())),
        }
    }

    async fn refund(&self, player: PlayerId, amount: u64) {
        if amount == 0 {
            return;
        }
        if let Some(economy) = &self.host.economy
            && let Err(error) = economy.refund(player, amount).await
        {
            tracing::error!(player = %player, "Refund of {} failed: {}", amount, error);
        }
    }
}
