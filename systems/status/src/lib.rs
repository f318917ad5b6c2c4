#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Buff and debuff bookkeeping for a single unit.
//!
//! A [`StatusAggregator`] owns at most one active [`Buff`] per [`BuffId`] and
//! folds their effects into a [`StatusSummary`] that movement and skill logic
//! consult each frame. Timers keep running even while the unit is frozen.

use std::{
    collections::{btree_map::Entry, BTreeMap},
    time::Duration,
};

use skirmish_core::{BuffId, DamageInfo, RemovalReason, StackRule, StatusEvent};

mod buff;
pub mod catalogue;

pub use buff::{Buff, Effect, Lifetime};

/// Upper bound for the aggregated speed and damage-taken multipliers.
const MAX_MULTIPLIER: f32 = 99.0;

/// Aggregate permissions and multipliers derived from the active effects.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StatusSummary {
    /// Whether the unit may start moving.
    pub can_move: bool,
    /// Whether the unit may cast skills.
    pub can_cast: bool,
    /// Movement speed multiplier in `0.0..=99.0`.
    pub speed_multiplier: f32,
    /// Incoming damage multiplier in `0.0..=99.0`.
    pub damage_taken_multiplier: f32,
    /// Whether incoming damage is ignored.
    pub invincible: bool,
}

impl Default for StatusSummary {
    fn default() -> Self {
        Self {
            can_move: true,
            can_cast: true,
            speed_multiplier: 1.0,
            damage_taken_multiplier: 1.0,
            invincible: false,
        }
    }
}

/// Active effects of one unit, keyed by identifier.
#[derive(Clone, Debug, Default)]
pub struct StatusAggregator {
    active: BTreeMap<BuffId, Buff>,
    summary: StatusSummary,
}

impl StatusAggregator {
    /// Creates an aggregator without active effects.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `buff`, merging it into an active effect with the same
    /// identifier according to the incoming effect's stack rule.
    pub fn add(&mut self, buff: Buff, out: &mut Vec<StatusEvent>) {
        match self.active.entry(buff.id().clone()) {
            Entry::Vacant(slot) => {
                tracing::debug!(id = %buff.id(), lifetime = ?buff.lifetime(), "buff applied");
                out.push(StatusEvent::Applied {
                    id: buff.id().clone(),
                    cue: buff.cue_key(),
                });
                let _ = slot.insert(buff);
            }
            Entry::Occupied(mut slot) => {
                let id = buff.id().clone();
                let rule = buff.stack_rule();
                match rule {
                    StackRule::IgnoreIfExists => {
                        tracing::trace!(%id, "buff ignored");
                        out.push(StatusEvent::Ignored { id });
                        return;
                    }
                    StackRule::Replace => {
                        tracing::debug!(%id, "buff replaced");
                        out.push(StatusEvent::Removed {
                            id: id.clone(),
                            reason: RemovalReason::Replaced,
                        });
                        out.push(StatusEvent::Applied {
                            id,
                            cue: buff.cue_key(),
                        });
                        let _ = slot.insert(buff);
                    }
                    StackRule::RefreshDuration => {
                        let existing = slot.get_mut();
                        existing.lifetime = existing.lifetime.refreshed(buff.lifetime());
                        existing.intensity = existing.intensity.max(buff.intensity());
                        out.push(StatusEvent::Stacked { id, rule });
                    }
                    StackRule::AddDuration => {
                        // An endless effect has nothing to extend and keeps its intensity.
                        let existing = slot.get_mut();
                        if !existing.lifetime.is_infinite() {
                            existing.lifetime = existing.lifetime.extended(buff.lifetime());
                            existing.intensity = existing.intensity.max(buff.intensity());
                        }
                        out.push(StatusEvent::Stacked { id, rule });
                    }
                    StackRule::AddIntensity => {
                        let existing = slot.get_mut();
                        existing.lifetime = existing.lifetime.refreshed(buff.lifetime());
                        existing.intensity += buff.intensity();
                        out.push(StatusEvent::Stacked { id, rule });
                    }
                }
            }
        }
        self.recompute();
    }

    /// Removes the effect with identifier `id`, returning it when it was
    /// active.
    pub fn remove(&mut self, id: &BuffId, out: &mut Vec<StatusEvent>) -> Option<Buff> {
        let removed = self.active.remove(id)?;
        tracing::debug!(%id, "buff removed");
        out.push(StatusEvent::Removed {
            id: id.clone(),
            reason: RemovalReason::Removed,
        });
        self.recompute();
        Some(removed)
    }

    /// Whether an effect with identifier `id` is active.
    #[must_use]
    pub fn has(&self, id: &BuffId) -> bool {
        self.active.contains_key(id)
    }

    /// Active effect with identifier `id`.
    #[must_use]
    pub fn get(&self, id: &BuffId) -> Option<&Buff> {
        self.active.get(id)
    }

    /// Active effects in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &Buff> + '_ {
        self.active.values()
    }

    /// Number of active effects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Whether no effect is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Advances every finite lifetime by `dt`, removes the effects that ran
    /// out and refreshes the summary.
    pub fn tick(&mut self, dt: Duration, out: &mut Vec<StatusEvent>) {
        self.active.retain(|id, buff| {
            buff.lifetime = buff.lifetime.elapsed(dt);
            if buff.lifetime.is_expired() {
                tracing::debug!(%id, "buff expired");
                out.push(StatusEvent::Removed {
                    id: id.clone(),
                    reason: RemovalReason::Expired,
                });
                false
            } else {
                true
            }
        });
        self.recompute();
    }

    /// Rebuilds the summary from the active effects.
    ///
    /// The strongest slow and the strongest haste are multiplied together;
    /// neutral contributions of exactly one are ignored.
    pub fn recompute(&mut self) {
        let mut summary = StatusSummary::default();
        let mut slowest = 1.0_f32;
        let mut fastest = 1.0_f32;
        let mut damage = 1.0_f32;

        for effect in self.active.values().flat_map(Buff::effects) {
            match *effect {
                Effect::Invincible => summary.invincible = true,
                Effect::MovementBlock => summary.can_move = false,
                Effect::CastBlock => summary.can_cast = false,
                Effect::SpeedModifier(multiplier) if multiplier < 1.0 => {
                    slowest = slowest.min(multiplier);
                }
                Effect::SpeedModifier(multiplier) if multiplier > 1.0 => {
                    fastest = fastest.max(multiplier);
                }
                Effect::SpeedModifier(_) => {}
                Effect::DamageModifier(multiplier) if multiplier.is_finite() => {
                    damage *= multiplier;
                }
                Effect::DamageModifier(_) => {}
            }
        }

        summary.speed_multiplier = (slowest * fastest).clamp(0.0, MAX_MULTIPLIER);
        summary.damage_taken_multiplier = damage.clamp(0.0, MAX_MULTIPLIER);
        self.summary = summary;
    }

    /// Aggregate state as of the last change.
    #[must_use]
    pub const fn summary(&self) -> StatusSummary {
        self.summary
    }

    /// Whether the unit may start moving.
    #[must_use]
    pub const fn can_move(&self) -> bool {
        self.summary.can_move
    }

    /// Whether the unit may cast skills.
    #[must_use]
    pub const fn can_cast(&self) -> bool {
        self.summary.can_cast
    }

    /// Movement speed multiplier.
    #[must_use]
    pub const fn speed_multiplier(&self) -> f32 {
        self.summary.speed_multiplier
    }

    /// Incoming damage multiplier.
    #[must_use]
    pub const fn damage_taken_multiplier(&self) -> f32 {
        self.summary.damage_taken_multiplier
    }

    /// Whether incoming damage is ignored.
    #[must_use]
    pub fn is_invincible(&self) -> bool {
        self.summary.invincible
    }

    /// Lets every active effect react to a hit. Effects that break on the
    /// hit's element run out and are removed on the next tick.
    pub fn notify_damaged(&mut self, info: &DamageInfo) {
        for buff in self.active.values_mut() {
            if buff.breaks_on() == Some(info.kind) {
                tracing::debug!(id = %buff.id(), kind = ?info.kind, "buff broken by damage");
                buff.lifetime = Lifetime::Remaining(Duration::ZERO);
            }
        }
    }

    /// Resolves an incoming hit, returning the damage to apply or `None`
    /// while invincible.
    pub fn intercept_damage(&mut self, info: &DamageInfo) -> Option<f32> {
        if self.is_invincible() {
            return None;
        }
        self.notify_damaged(info);
        Some(info.amount * self.summary.damage_taken_multiplier)
    }

    /// Whether any active effect carries a modifier matching `predicate`.
    #[must_use]
    pub fn any_effect(&self, predicate: impl Fn(&Effect) -> bool + Copy) -> bool {
        self.active.values().any(|buff| buff.has_effect(predicate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_core::{BuffCategory, DamageKind};

    fn secs(secs: u64) -> Lifetime {
        Lifetime::Remaining(Duration::from_secs(secs))
    }

    fn poison(lifetime: Lifetime, intensity: f32, rule: StackRule) -> Buff {
        Buff::new(BuffId::from_static("poison"), BuffCategory::Debuff, lifetime)
            .with_intensity(intensity)
            .with_stack_rule(rule)
    }

    #[test]
    fn refresh_keeps_longest_time_and_strongest_intensity() {
        let mut status = StatusAggregator::new();
        let mut events = Vec::new();

        status.add(catalogue::chill(secs(3), 0.5).with_intensity(0.5), &mut events);
        status.add(catalogue::chill(secs(6), 0.3).with_intensity(0.3), &mut events);

        let chill = status.get(&catalogue::CHILL).expect("chill active");
        assert_eq!(chill.lifetime(), secs(6));
        assert_eq!(chill.intensity(), 0.5);
        assert_eq!(chill.effects(), &[Effect::SpeedModifier(0.5)]);
        assert_eq!(status.len(), 1);
        assert_eq!(
            events,
            vec![
                StatusEvent::Applied {
                    id: catalogue::CHILL,
                    cue: Some(catalogue::CHILL_CUE.into()),
                },
                StatusEvent::Stacked {
                    id: catalogue::CHILL,
                    rule: StackRule::RefreshDuration,
                },
            ]
        );
    }

    #[test]
    fn add_duration_accumulates_time() {
        let mut status = StatusAggregator::new();
        let mut events = Vec::new();

        status.add(poison(secs(2), 1.0, StackRule::AddDuration), &mut events);
        status.add(poison(secs(5), 3.0, StackRule::AddDuration), &mut events);

        let poison = status.get(&BuffId::from_static("poison")).expect("active");
        assert_eq!(poison.lifetime(), secs(7));
        assert_eq!(poison.intensity(), 3.0);
    }

    #[test]
    fn add_duration_leaves_endless_effects_untouched() {
        let mut status = StatusAggregator::new();
        let mut events = Vec::new();

        status.add(poison(Lifetime::Infinite, 1.0, StackRule::AddDuration), &mut events);
        status.add(poison(secs(5), 4.0, StackRule::AddDuration), &mut events);

        let poison = status.get(&BuffId::from_static("poison")).expect("active");
        assert!(poison.lifetime().is_infinite());
        assert_eq!(poison.intensity(), 1.0);
        assert_eq!(
            events.last(),
            Some(&StatusEvent::Stacked {
                id: BuffId::from_static("poison"),
                rule: StackRule::AddDuration,
            })
        );
    }

    #[test]
    fn infinite_incoming_lifetime_absorbs_finite_ones() {
        for rule in [StackRule::RefreshDuration, StackRule::AddDuration] {
            let mut status = StatusAggregator::new();
            let mut events = Vec::new();

            status.add(poison(secs(4), 1.0, rule), &mut events);
            status.add(poison(Lifetime::from_secs(-1.0), 1.0, rule), &mut events);

            let poison = status.get(&BuffId::from_static("poison")).expect("active");
            assert!(poison.lifetime().is_infinite(), "{rule:?} kept a finite lifetime");
        }
    }

    #[test]
    fn add_intensity_accumulates_magnitude() {
        let mut status = StatusAggregator::new();
        let mut events = Vec::new();

        status.add(poison(secs(2), 1.5, StackRule::AddIntensity), &mut events);
        status.add(poison(secs(1), 2.0, StackRule::AddIntensity), &mut events);

        let poison = status.get(&BuffId::from_static("poison")).expect("active");
        assert_eq!(poison.intensity(), 3.5);
        assert_eq!(poison.lifetime(), secs(2));
    }

    #[test]
    fn replace_fires_removal_then_application() {
        let mut status = StatusAggregator::new();
        let mut events = Vec::new();
        let id = BuffId::from_static("poison");

        status.add(poison(secs(9), 4.0, StackRule::Replace), &mut events);
        events.clear();
        status.add(poison(secs(1), 1.0, StackRule::Replace), &mut events);

        assert_eq!(
            events,
            vec![
                StatusEvent::Removed {
                    id: id.clone(),
                    reason: RemovalReason::Replaced,
                },
                StatusEvent::Applied {
                    id: id.clone(),
                    cue: None,
                },
            ]
        );
        let poison = status.get(&id).expect("active");
        assert_eq!(poison.lifetime(), secs(1));
        assert_eq!(poison.intensity(), 1.0);
    }

    #[test]
    fn ignore_if_exists_leaves_the_active_effect_untouched() {
        let mut status = StatusAggregator::new();
        let mut events = Vec::new();
        let id = BuffId::from_static("poison");

        status.add(poison(secs(2), 1.0, StackRule::IgnoreIfExists), &mut events);
        events.clear();
        status.add(poison(secs(8), 5.0, StackRule::IgnoreIfExists), &mut events);

        assert_eq!(events, vec![StatusEvent::Ignored { id: id.clone() }]);
        let poison = status.get(&id).expect("active");
        assert_eq!(poison.lifetime(), secs(2));
        assert_eq!(poison.intensity(), 1.0);
    }

    #[test]
    fn unknown_rule_names_stack_like_refresh() {
        let mut status = StatusAggregator::new();
        let mut events = Vec::new();
        let rule = StackRule::from_name("stack_forever");

        status.add(poison(secs(3), 2.0, rule), &mut events);
        status.add(poison(secs(1), 1.0, rule), &mut events);

        let poison = status.get(&BuffId::from_static("poison")).expect("active");
        assert_eq!(poison.lifetime(), secs(3));
        assert_eq!(poison.intensity(), 2.0);
    }

    #[test]
    fn expired_effects_leave_within_the_same_tick() {
        let mut status = StatusAggregator::new();
        let mut events = Vec::new();

        status.add(catalogue::freeze(Lifetime::from_secs(0.5)), &mut events);
        status.add(catalogue::invincible(Lifetime::Infinite), &mut events);
        assert!(!status.can_move());
        events.clear();

        status.tick(Duration::from_millis(250), &mut events);
        assert!(events.is_empty());
        assert!(!status.can_move());

        status.tick(Duration::from_millis(250), &mut events);
        assert_eq!(
            events,
            vec![StatusEvent::Removed {
                id: catalogue::FREEZE,
                reason: RemovalReason::Expired,
            }]
        );
        assert!(status.can_move());
        assert!(status.can_cast());
        assert!(status.has(&catalogue::INVINCIBLE));
    }

    #[test]
    fn remove_reports_only_active_effects() {
        let mut status = StatusAggregator::new();
        let mut events = Vec::new();

        status.add(catalogue::silence(secs(5)), &mut events);
        assert!(!status.can_cast());
        events.clear();

        assert!(status.remove(&catalogue::SILENCE, &mut events).is_some());
        assert!(status.remove(&catalogue::SILENCE, &mut events).is_none());
        assert_eq!(
            events,
            vec![StatusEvent::Removed {
                id: catalogue::SILENCE,
                reason: RemovalReason::Removed,
            }]
        );
        assert!(status.can_cast());
        assert!(status.is_empty());
    }

    #[test]
    fn strongest_slow_and_strongest_haste_multiply() {
        let mut status = StatusAggregator::new();
        let mut events = Vec::new();

        status.add(catalogue::chill(secs(5), 0.5), &mut events);
        status.add(catalogue::speedboost(secs(5), 1.5), &mut events);
        status.add(
            Buff::new(BuffId::from_static("mild"), BuffCategory::Debuff, secs(5))
                .with_effect(Effect::SpeedModifier(0.8)),
            &mut events,
        );
        status.add(
            Buff::new(BuffId::from_static("neutral"), BuffCategory::Buff, secs(5))
                .with_effect(Effect::SpeedModifier(1.0)),
            &mut events,
        );

        assert_eq!(status.speed_multiplier(), 0.75);
    }

    #[test]
    fn multipliers_are_clamped() {
        let mut status = StatusAggregator::new();
        let mut events = Vec::new();

        status.add(catalogue::speedboost(secs(5), 500.0), &mut events);
        status.add(catalogue::vulnerability(secs(5), 20.0), &mut events);
        status.add(
            Buff::new(BuffId::from_static("exposed"), BuffCategory::Debuff, secs(5))
                .with_effect(Effect::DamageModifier(10.0)),
            &mut events,
        );

        assert_eq!(status.speed_multiplier(), 99.0);
        assert_eq!(status.damage_taken_multiplier(), 99.0);
    }

    #[test]
    fn recompute_is_idempotent() {
        let mut status = StatusAggregator::new();
        let mut events = Vec::new();

        status.add(catalogue::chill(secs(5), 0.4), &mut events);
        status.add(catalogue::vulnerability(secs(5), 1.25), &mut events);
        status.add(catalogue::silence(secs(5)), &mut events);
        let first = status.summary();

        for _ in 0..10 {
            status.recompute();
            assert_eq!(status.summary(), first);
        }
        assert_eq!(first.speed_multiplier, 0.4);
        assert_eq!(first.damage_taken_multiplier, 1.25);
        assert!(first.can_move);
        assert!(!first.can_cast);
    }

    #[test]
    fn fire_thaws_freeze_on_the_next_tick() {
        let mut status = StatusAggregator::new();
        let mut events = Vec::new();

        status.add(catalogue::freeze(secs(10)), &mut events);
        status.notify_damaged(&DamageInfo::new(5.0).with_kind(DamageKind::Ice));
        status.tick(Duration::from_millis(100), &mut events);
        assert!(status.has(&catalogue::FREEZE));

        status.notify_damaged(&DamageInfo::new(5.0).with_kind(DamageKind::Fire));
        assert!(status.has(&catalogue::FREEZE));
        assert!(!status.can_move());

        status.tick(Duration::from_millis(100), &mut events);
        assert!(!status.has(&catalogue::FREEZE));
        assert!(status.can_move());
        assert_eq!(status.speed_multiplier(), 1.0);
    }

    #[test]
    fn invincibility_swallows_hits_before_any_hook() {
        let mut status = StatusAggregator::new();
        let mut events = Vec::new();
        let fire = DamageInfo::new(10.0).with_kind(DamageKind::Fire);

        status.add(catalogue::chill(secs(5), 0.5), &mut events);
        status.add(catalogue::vulnerability(secs(5), 1.5), &mut events);
        status.add(catalogue::invincible(secs(1)), &mut events);

        assert_eq!(status.intercept_damage(&fire), None);
        status.tick(Duration::from_millis(500), &mut events);
        assert!(status.has(&catalogue::CHILL));

        status.tick(Duration::from_millis(500), &mut events);
        assert!(!status.is_invincible());
        assert_eq!(status.intercept_damage(&fire), Some(15.0));
        status.tick(Duration::from_millis(1), &mut events);
        assert!(!status.has(&catalogue::CHILL));
    }

    #[test]
    fn timers_run_while_frozen() {
        let mut status = StatusAggregator::new();
        let mut events = Vec::new();

        status.add(catalogue::freeze(secs(2)), &mut events);
        status.add(catalogue::chill(secs(1), 0.5), &mut events);
        assert_eq!(status.speed_multiplier(), 0.0);

        status.tick(Duration::from_secs(1), &mut events);
        assert!(!status.has(&catalogue::CHILL));
        assert!(status.any_effect(|effect| *effect == Effect::MovementBlock));
    }
}
