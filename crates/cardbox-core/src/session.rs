//! Review session: walks a built queue one card at a time.
//!
//! ```text
//! AwaitingQueue --start--> ShowingQuestion --reveal--> ShowingAnswer
//!                               ^                           |
//!                               +----------rate-------------+
//!                                         (or Finished)
//! ```
//!
//! A session owns no cards. Every call that reads or rates takes the
//! collection explicitly, so dropping a session loses nothing but its
//! position in the queue.

use std::collections::VecDeque;
use std::fmt;

use uuid::Uuid;

use crate::card::Card;
use crate::collection::Collection;
use crate::error::{CoreError, Result};
use crate::note::Note;
use crate::queue::{QueueReason, Scope};
use crate::rating::Rating;
use crate::scheduler::RatingEvent;
use crate::time::Clock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingQueue,
    ShowingQuestion,
    ShowingAnswer,
    Finished,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::AwaitingQueue => "awaiting_queue",
            SessionState::ShowingQuestion => "showing_question",
            SessionState::ShowingAnswer => "showing_answer",
            SessionState::Finished => "finished",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side of the active card is visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Question,
    Answer,
}

#[derive(Debug, Clone)]
pub struct ReviewSession {
    scope: Scope,
    /// Front entry is the active card while a card is showing.
    queue: VecDeque<Uuid>,
    state: SessionState,
    reason: QueueReason,
    rated: usize,
    skipped: usize,
}

impl ReviewSession {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            queue: VecDeque::new(),
            state: SessionState::AwaitingQueue,
            reason: QueueReason::Ok,
            rated: 0,
            skipped: 0,
        }
    }

    fn expect_state(&self, operation: &'static str, expected: SessionState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(CoreError::InvalidSessionState {
                operation,
                state: self.state,
            })
        }
    }

    /// Build the queue for today and show the first card.
    pub fn start(&mut self, collection: &Collection, clock: &impl Clock) -> Result<()> {
        self.expect_state("start", SessionState::AwaitingQueue)?;
        let built = collection.build_queue(&self.scope, clock.today());
        self.reason = built.reason;
        self.queue = built.card_ids.into();
        self.settle(collection);
        Ok(())
    }

    pub fn reveal(&mut self) -> Result<()> {
        self.expect_state("reveal", SessionState::ShowingQuestion)?;
        self.state = SessionState::ShowingAnswer;
        Ok(())
    }

    /// Rate the active card and move on. Returns `None` when the card was
    /// deleted while it was showing; nothing is rated in that case.
    pub fn rate(
        &mut self,
        collection: &mut Collection,
        rating: Rating,
        clock: &impl Clock,
    ) -> Result<Option<RatingEvent>> {
        self.expect_state("rate", SessionState::ShowingAnswer)?;
        let Some(card_id) = self.queue.front().copied() else {
            self.state = SessionState::Finished;
            return Ok(None);
        };

        if collection.card(card_id).is_none() {
            self.queue.pop_front();
            self.skipped += 1;
            self.settle(collection);
            return Ok(None);
        }

        let event = collection.rate_card(card_id, rating, clock)?;
        self.queue.pop_front();
        self.rated += 1;

        if collection.limits(clock.today()).exhausted() {
            self.queue.clear();
            self.reason = QueueReason::Limit;
            self.state = SessionState::Finished;
        } else {
            self.settle(collection);
        }
        Ok(Some(event))
    }

    /// Drop queue entries whose card is gone, then show the next card or finish.
    fn settle(&mut self, collection: &Collection) {
        while let Some(id) = self.queue.front() {
            if collection.card(*id).is_some() {
                self.state = SessionState::ShowingQuestion;
                return;
            }
            self.queue.pop_front();
            self.skipped += 1;
        }
        self.state = SessionState::Finished;
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn face(&self) -> Option<Face> {
        match self.state {
            SessionState::ShowingQuestion => Some(Face::Question),
            SessionState::ShowingAnswer => Some(Face::Answer),
            _ => None,
        }
    }

    pub fn active_card_id(&self) -> Option<Uuid> {
        match self.state {
            SessionState::ShowingQuestion | SessionState::ShowingAnswer => {
                self.queue.front().copied()
            }
            _ => None,
        }
    }

    /// Cards left in the queue, the active one included.
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Why the session stopped or started empty.
    pub fn reason(&self) -> QueueReason {
        self.reason
    }

    pub fn rated_count(&self) -> usize {
        self.rated
    }

    /// Queue entries dropped because their card no longer exists.
    pub fn skipped_count(&self) -> usize {
        self.skipped
    }

    pub fn is_finished(&self) -> bool {
        self.state == SessionState::Finished
    }

    /// Active card with its note.
    pub fn current<'c>(&self, collection: &'c Collection) -> Option<(&'c Card, &'c Note)> {
        let card = collection.card(self.active_card_id()?)?;
        let note = collection.note(card.note_id())?;
        Some((card, note))
    }
}
