//! Timed effects and their lifetimes.

use std::{borrow::Cow, time::Duration};

use skirmish_core::{BuffCategory, BuffId, DamageKind, StackRule};

/// Remaining lifetime of an effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// Never expires on its own.
    Infinite,
    /// Expires once the remaining time reaches zero.
    Remaining(Duration),
}

impl Lifetime {
    /// Interprets a duration in seconds; zero, negative, non-finite and
    /// unrepresentably large values mean the effect never expires.
    #[must_use]
    pub fn from_secs(secs: f32) -> Self {
        if secs > 0.0 {
            Duration::try_from_secs_f32(secs).map_or(Self::Infinite, Self::Remaining)
        } else {
            Self::Infinite
        }
    }

    /// Whether the lifetime never runs out.
    #[must_use]
    pub const fn is_infinite(self) -> bool {
        matches!(self, Self::Infinite)
    }

    /// Remaining time, or `None` when infinite.
    #[must_use]
    pub const fn remaining(self) -> Option<Duration> {
        match self {
            Self::Infinite => None,
            Self::Remaining(remaining) => Some(remaining),
        }
    }

    /// Whether a finite lifetime has run out.
    #[must_use]
    pub fn is_expired(self) -> bool {
        matches!(self, Self::Remaining(remaining) if remaining.is_zero())
    }

    /// Longer of the two lifetimes; infinity absorbs any finite value.
    #[must_use]
    pub fn refreshed(self, incoming: Lifetime) -> Lifetime {
        match (self, incoming) {
            (Self::Remaining(current), Self::Remaining(incoming)) => {
                Self::Remaining(current.max(incoming))
            }
            _ => Self::Infinite,
        }
    }

    /// Sum of the two lifetimes; infinity absorbs any finite value.
    #[must_use]
    pub fn extended(self, incoming: Lifetime) -> Lifetime {
        match (self, incoming) {
            (Self::Remaining(current), Self::Remaining(incoming)) => {
                Self::Remaining(current.saturating_add(incoming))
            }
            _ => Self::Infinite,
        }
    }

    pub(crate) fn elapsed(self, dt: Duration) -> Lifetime {
        match self {
            Self::Infinite => Self::Infinite,
            Self::Remaining(remaining) => Self::Remaining(remaining.saturating_sub(dt)),
        }
    }
}

/// Modifier contributed by an active effect to the unit's aggregate status.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Effect {
    /// Incoming damage is ignored entirely.
    Invincible,
    /// Scales movement speed; below one slows, above one hastes.
    SpeedModifier(f32),
    /// Forbids starting new movement.
    MovementBlock,
    /// Forbids casting skills.
    CastBlock,
    /// Scales incoming damage.
    DamageModifier(f32),
}

/// A timed effect applied to a unit.
///
/// At most one effect per [`BuffId`] is active on a unit at a time; the
/// incoming effect's [`StackRule`] decides how a duplicate is merged.
#[derive(Clone, Debug, PartialEq)]
pub struct Buff {
    id: BuffId,
    category: BuffCategory,
    stack_rule: StackRule,
    pub(crate) lifetime: Lifetime,
    pub(crate) intensity: f32,
    effects: Vec<Effect>,
    breaks_on: Option<DamageKind>,
    cue: Option<Cow<'static, str>>,
}

impl Buff {
    /// Creates an effect without modifiers that refreshes on re-application.
    #[must_use]
    pub fn new(id: BuffId, category: BuffCategory, lifetime: Lifetime) -> Self {
        Self {
            id,
            category,
            stack_rule: StackRule::default(),
            lifetime,
            intensity: 0.0,
            effects: Vec::new(),
            breaks_on: None,
            cue: None,
        }
    }

    /// Sets the rule applied when this effect lands on a unit that already
    /// has one with the same identifier.
    #[must_use]
    pub fn with_stack_rule(mut self, rule: StackRule) -> Self {
        self.stack_rule = rule;
        self
    }

    /// Sets the generic magnitude carried by the effect.
    #[must_use]
    pub fn with_intensity(mut self, intensity: f32) -> Self {
        self.intensity = intensity;
        self
    }

    /// Adds a modifier.
    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    /// Makes the effect end at the next tick after damage of `kind` lands.
    #[must_use]
    pub fn breaking_on(mut self, kind: DamageKind) -> Self {
        self.breaks_on = Some(kind);
        self
    }

    /// Attaches a presentation cue reported when the effect is applied.
    #[must_use]
    pub fn with_cue(mut self, cue: impl Into<Cow<'static, str>>) -> Self {
        self.cue = Some(cue.into());
        self
    }

    /// Identifier shared by every instance of this effect.
    #[must_use]
    pub fn id(&self) -> &BuffId {
        &self.id
    }

    /// Whether the effect helps or harms.
    #[must_use]
    pub const fn category(&self) -> BuffCategory {
        self.category
    }

    /// Rule used when this effect is applied on top of an existing one.
    #[must_use]
    pub const fn stack_rule(&self) -> StackRule {
        self.stack_rule
    }

    /// Remaining lifetime.
    #[must_use]
    pub const fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// Generic magnitude, such as damage per second.
    #[must_use]
    pub const fn intensity(&self) -> f32 {
        self.intensity
    }

    /// Modifiers contributed to the aggregate status.
    #[must_use]
    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    /// Damage kind that ends the effect early.
    #[must_use]
    pub const fn breaks_on(&self) -> Option<DamageKind> {
        self.breaks_on
    }

    /// Presentation cue reported on application.
    #[must_use]
    pub fn cue(&self) -> Option<&str> {
        self.cue.as_deref()
    }

    pub(crate) fn cue_key(&self) -> Option<Cow<'static, str>> {
        self.cue.clone()
    }

    pub(crate) fn has_effect(&self, predicate: impl Fn(&Effect) -> bool) -> bool {
        self.effects.iter().any(predicate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_positive_seconds_mean_infinite() {
        assert_eq!(Lifetime::from_secs(0.0), Lifetime::Infinite);
        assert_eq!(Lifetime::from_secs(-1.0), Lifetime::Infinite);
        assert_eq!(Lifetime::from_secs(f32::NAN), Lifetime::Infinite);
        assert_eq!(Lifetime::from_secs(f32::INFINITY), Lifetime::Infinite);
        assert_eq!(Lifetime::from_secs(1.0e20), Lifetime::Infinite);
        assert_eq!(Lifetime::from_secs(f32::MAX), Lifetime::Infinite);
        assert_eq!(
            Lifetime::from_secs(1.5).remaining(),
            Some(Duration::from_millis(1500))
        );
    }

    #[test]
    fn infinity_absorbs_finite_lifetimes() {
        let finite = Lifetime::Remaining(Duration::from_secs(3));

        assert_eq!(finite.refreshed(Lifetime::Infinite), Lifetime::Infinite);
        assert_eq!(Lifetime::Infinite.refreshed(finite), Lifetime::Infinite);
        assert_eq!(finite.extended(Lifetime::Infinite), Lifetime::Infinite);
        assert_eq!(Lifetime::Infinite.extended(finite), Lifetime::Infinite);
    }

    #[test]
    fn elapsed_time_saturates_and_never_touches_infinity() {
        let lifetime = Lifetime::Remaining(Duration::from_millis(300));

        let ticked = lifetime.elapsed(Duration::from_millis(100));
        assert_eq!(ticked.remaining(), Some(Duration::from_millis(200)));
        assert!(!ticked.is_expired());

        assert!(ticked.elapsed(Duration::from_secs(9)).is_expired());
        assert_eq!(
            Lifetime::Infinite.elapsed(Duration::from_secs(9)),
            Lifetime::Infinite
        );
    }

    #[test]
    fn builder_collects_modifiers_in_order() {
        let buff = Buff::new(
            BuffId::from_static("bulwark"),
            BuffCategory::Buff,
            Lifetime::Infinite,
        )
        .with_effect(Effect::DamageModifier(0.5))
        .with_effect(Effect::CastBlock)
        .with_intensity(2.0)
        .with_cue("SE_Bulwark");

        assert_eq!(
            buff.effects(),
            &[Effect::DamageModifier(0.5), Effect::CastBlock]
        );
        assert_eq!(buff.intensity(), 2.0);
        assert_eq!(buff.cue(), Some("SE_Bulwark"));
        assert_eq!(buff.stack_rule(), StackRule::RefreshDuration);
    }
}
