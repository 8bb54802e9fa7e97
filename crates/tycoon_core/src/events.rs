//! Random narrative events.
//!
//! Each turn has a chance to draw one [`EventTemplate`] uniformly from the
//! catalog, together with a uniformly drawn target resource. The template's
//! [`EventEffect`] is then applied deterministically to the target or to
//! capital. Price effects do not append to the price history; the changed
//! price becomes the base of the next turn's drift.

use std::collections::VecDeque;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::economy::EconomyState;
use crate::math::round_cents;

/// Placeholder replaced by the target resource's display name.
pub const RESOURCE_PLACEHOLDER: &str = "{resource}";

/// Whether an event helps or hurts the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// Favourable event.
    Bonus,
    /// Unfavourable event.
    Penalty,
    /// Flavour only.
    Neutral,
}

/// State change caused by an event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EventEffect {
    /// Multiply the target resource's price, rounding to cents.
    ScalePrice {
        /// Price multiplier.
        factor: f64,
        /// Lowest price the effect may produce.
        #[serde(default)]
        floor: Option<f64>,
    },
    /// Add to capital (negative amounts are a cost).
    AdjustCapital(f64),
    /// No state change.
    None,
}

/// Catalog definition of an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventTemplate {
    /// Bonus, penalty or neutral.
    pub category: EventCategory,
    /// Headline.
    pub title: String,
    /// Body text; may contain [`RESOURCE_PLACEHOLDER`].
    pub description: String,
    /// Effect applied when the event fires.
    pub effect: EventEffect,
}

impl EventTemplate {
    /// Create an event template.
    #[must_use]
    pub fn new(
        category: EventCategory,
        title: impl Into<String>,
        description: impl Into<String>,
        effect: EventEffect,
    ) -> Self {
        Self {
            category,
            title: title.into(),
            description: description.into(),
            effect,
        }
    }

    /// Whether the description names the target resource.
    #[must_use]
    pub fn mentions_resource(&self) -> bool {
        self.description.contains(RESOURCE_PLACEHOLDER)
    }

    /// Apply this template against `state`, targeting the resource at
    /// `target`, and return the resulting event record.
    ///
    /// A `target` outside the resource list leaves resources untouched.
    /// Scaled prices never fall below `price_floor`, nor below the
    /// effect's own floor.
    pub fn apply(&self, state: &mut EconomyState, target: usize, price_floor: f64) -> Event {
        let mut description = self.description.clone();
        if self.mentions_resource() {
            if let Some(resource) = state.resources.get(target) {
                description = description.replace(RESOURCE_PLACEHOLDER, &resource.name);
            }
        }

        match self.effect {
            EventEffect::ScalePrice { factor, floor } => {
                if let Some(resource) = state.resources.get_mut(target) {
                    let floor = floor.map_or(price_floor, |f| f.max(price_floor));
                    resource.price = round_cents(resource.price * factor).max(floor);
                }
            }
            EventEffect::AdjustCapital(amount) if amount >= 0.0 => state.earn(amount),
            EventEffect::AdjustCapital(amount) => state.spend(-amount),
            EventEffect::None => {}
        }

        Event {
            turn: state.turn,
            title: self.title.clone(),
            description,
            category: self.category,
        }
    }

    /// The built-in event table.
    #[must_use]
    pub fn standard_table() -> Vec<Self> {
        use EventCategory::{Bonus, Neutral, Penalty};

        vec![
            Self::new(
                Bonus,
                "Boom de Mercado!",
                "O preço de {resource} subiu 60%!",
                EventEffect::ScalePrice {
                    factor: 1.6,
                    floor: None,
                },
            ),
            Self::new(
                Bonus,
                "Doação Recebida",
                "Você recebeu R$ 2.000 de um investidor!",
                EventEffect::AdjustCapital(2_000.0),
            ),
            Self::new(
                Bonus,
                "Eficiência Energética",
                "Sua produção de energia dobrou este turno!",
                EventEffect::None,
            ),
            Self::new(
                Penalty,
                "Crise no Setor",
                "O preço de {resource} caiu 40%!",
                EventEffect::ScalePrice {
                    factor: 0.6,
                    floor: Some(0.5),
                },
            ),
            Self::new(
                Penalty,
                "Manutenção Extra",
                "Reparos emergenciais custaram R$ 1.000!",
                EventEffect::AdjustCapital(-1_000.0),
            ),
            Self::new(
                Penalty,
                "Clima Adverso",
                "A produção de café foi afetada!",
                EventEffect::None,
            ),
            Self::new(
                Neutral,
                "Mercado Estável",
                "Não houve grandes mudanças hoje.",
                EventEffect::None,
            ),
            Self::new(
                Neutral,
                "Flutuação Normal",
                "Os mercados operaram normalmente.",
                EventEffect::None,
            ),
        ]
    }
}

/// An event that occurred.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Event {
    /// Turn the event occurred on.
    pub turn: u64,
    /// Headline.
    pub title: String,
    /// Body text with the target resource filled in.
    pub description: String,
    /// Bonus, penalty or neutral.
    pub category: EventCategory,
}

/// Bounded log of recent events, most recent first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    entries: VecDeque<Event>,
    capacity: usize,
}

impl EventLog {
    /// Create an empty log holding at most `capacity` events.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Rebuild a log from events listed most recent first.
    #[must_use]
    pub fn from_recent(events: Vec<Event>, capacity: usize) -> Self {
        let mut entries: VecDeque<Event> = events.into();
        entries.truncate(capacity);
        Self { entries, capacity }
    }

    /// Record an event, evicting the oldest beyond capacity.
    pub fn record(&mut self, event: Event) {
        self.entries.push_front(event);
        self.entries.truncate(self.capacity);
    }

    /// Iterate from most recent to oldest.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.entries.iter()
    }

    /// The most recent event.
    #[must_use]
    pub fn latest(&self) -> Option<&Event> {
        self.entries.front()
    }

    /// Number of events held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of events held.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Roll for a random event and apply it.
///
/// With probability `chance`, draws a template and a target resource
/// uniformly, applies the effect, records the event in the state's log and
/// counts it in the statistics. Returns the event, or `None` if the roll
/// failed or there is nothing to draw from.
pub fn roll_event<R: Rng + ?Sized>(
    templates: &[EventTemplate],
    state: &mut EconomyState,
    chance: f64,
    price_floor: f64,
    rng: &mut R,
) -> Option<Event> {
    if templates.is_empty() || state.resources.is_empty() {
        return None;
    }
    if rng.random::<f64>() >= chance {
        return None;
    }

    let template = &templates[rng.random_range(0..templates.len())];
    let target = rng.random_range(0..state.resources.len());
    let event = template.apply(state, target, price_floor);

    state.events.record(event.clone());
    state.statistics.events_occurred += 1;
    tracing::info!(
        turn = event.turn,
        category = ?event.category,
        title = %event.title,
        "Event occurred"
    );

    Some(event)
}
