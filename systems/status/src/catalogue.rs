//! Built-in effects shared by skills and scenarios.

use skirmish_core::{BuffCategory, BuffId, DamageKind, StackRule};

use crate::{Buff, Effect, Lifetime};

/// Identifier of [`invincible`].
pub const INVINCIBLE: BuffId = BuffId::from_static("invincible");
/// Identifier of [`speedboost`].
pub const SPEEDBOOST: BuffId = BuffId::from_static("speedboost");
/// Identifier of [`chill`].
pub const CHILL: BuffId = BuffId::from_static("chill");
/// Identifier of [`freeze`].
pub const FREEZE: BuffId = BuffId::from_static("freeze");
/// Identifier of [`silence`].
pub const SILENCE: BuffId = BuffId::from_static("silence");
/// Identifier of [`vulnerability`].
pub const VULNERABILITY: BuffId = BuffId::from_static("vulnerability");

/// Audio cue played when a chill lands.
pub const CHILL_CUE: &str = "SE_Debuff_IceBlock";

const CHILL_SLOWEST: f32 = 0.05;

/// Ignores all incoming damage.
#[must_use]
pub fn invincible(lifetime: Lifetime) -> Buff {
    Buff::new(INVINCIBLE, BuffCategory::Buff, lifetime)
        .with_stack_rule(StackRule::RefreshDuration)
        .with_effect(Effect::Invincible)
}

/// Multiplies movement speed, e.g. `1.5` for half again as fast.
#[must_use]
pub fn speedboost(lifetime: Lifetime, multiplier: f32) -> Buff {
    Buff::new(SPEEDBOOST, BuffCategory::Buff, lifetime)
        .with_stack_rule(StackRule::RefreshDuration)
        .with_effect(Effect::SpeedModifier(multiplier))
}

/// Slows movement; `slow_multiplier` is clamped to `0.05..=1.0`. Fire damage
/// thaws it.
#[must_use]
pub fn chill(lifetime: Lifetime, slow_multiplier: f32) -> Buff {
    let multiplier = if slow_multiplier.is_nan() {
        1.0
    } else {
        slow_multiplier.clamp(CHILL_SLOWEST, 1.0)
    };
    Buff::new(CHILL, BuffCategory::Debuff, lifetime)
        .with_stack_rule(StackRule::RefreshDuration)
        .with_effect(Effect::SpeedModifier(multiplier))
        .breaking_on(DamageKind::Fire)
        .with_cue(CHILL_CUE)
}

/// Stops movement and casting entirely. Fire damage thaws it.
#[must_use]
pub fn freeze(lifetime: Lifetime) -> Buff {
    Buff::new(FREEZE, BuffCategory::Debuff, lifetime)
        .with_stack_rule(StackRule::RefreshDuration)
        .with_effect(Effect::MovementBlock)
        .with_effect(Effect::CastBlock)
        .with_effect(Effect::SpeedModifier(0.0))
        .breaking_on(DamageKind::Fire)
}

/// Forbids casting.
#[must_use]
pub fn silence(lifetime: Lifetime) -> Buff {
    Buff::new(SILENCE, BuffCategory::Debuff, lifetime).with_effect(Effect::CastBlock)
}

/// Scales incoming damage, e.g. `1.25` for a quarter more.
#[must_use]
pub fn vulnerability(lifetime: Lifetime, multiplier: f32) -> Buff {
    Buff::new(VULNERABILITY, BuffCategory::Debuff, lifetime)
        .with_effect(Effect::DamageModifier(multiplier))
}
