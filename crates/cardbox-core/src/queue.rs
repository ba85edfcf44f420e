//! Review queue selection and dashboard counts.

use serde::Serialize;
use uuid::Uuid;

use crate::card::{Card, CardState};
use crate::daily::DailyLimits;
use crate::settings::Settings;
use crate::time::DayNumber;

/// Which cards a queue or count looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    Deck(Uuid),
}

impl Scope {
    pub fn contains(&self, card: &Card) -> bool {
        self.contains_deck(card.deck_id())
    }

    pub fn contains_deck(&self, deck_id: Uuid) -> bool {
        match self {
            Scope::All => true,
            Scope::Deck(id) => *id == deck_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueReason {
    Ok,
    /// Today's quota was already used up.
    Limit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltQueue {
    pub card_ids: Vec<Uuid>,
    pub reason: QueueReason,
}

impl BuiltQueue {
    pub fn is_empty(&self) -> bool {
        self.card_ids.is_empty()
    }
}

/// Due review cards (oldest due first, at most `reviews_per_day`) followed by
/// new cards (oldest created first, at most `new_per_day`), cut to the
/// remaining daily quota. The order is fixed once built.
pub fn build_queue<'a>(
    cards: impl IntoIterator<Item = &'a Card>,
    scope: &Scope,
    today: DayNumber,
    settings: &Settings,
    limits: &DailyLimits,
) -> BuiltQueue {
    if limits.exhausted() {
        return BuiltQueue {
            card_ids: Vec::new(),
            reason: QueueReason::Limit,
        };
    }

    let (mut due, mut fresh): (Vec<&Card>, Vec<&Card>) = cards
        .into_iter()
        .filter(|c| scope.contains(c))
        .filter(|c| c.is_new() || c.is_review_due(today))
        .partition(|c| c.state() == CardState::Review);

    // stable sorts: ties keep collection order
    due.sort_by_key(|c| c.due());
    due.truncate(settings.reviews_per_day as usize);

    fresh.sort_by(|a, b| a.created_at().cmp(b.created_at()));
    fresh.truncate(settings.new_per_day as usize);

    let card_ids = due
        .into_iter()
        .chain(fresh)
        .take(limits.remaining as usize)
        .map(Card::id)
        .collect();

    BuiltQueue {
        card_ids,
        reason: QueueReason::Ok,
    }
}

/// Badge counts for a scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    /// Cards whose due day has arrived, new cards included.
    pub due: usize,
    pub new: usize,
    pub total: usize,
}

pub fn compute_counts<'a>(
    cards: impl IntoIterator<Item = &'a Card>,
    scope: &Scope,
    today: DayNumber,
) -> Counts {
    cards
        .into_iter()
        .filter(|c| scope.contains(c))
        .fold(Counts::default(), |mut acc, c| {
            acc.total += 1;
            if c.is_new() {
                acc.new += 1;
            }
            if c.is_due(today) {
                acc.due += 1;
            }
            acc
        })
}
