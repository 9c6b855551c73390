use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use super::PlayerId;
use crate::error::{Result, ScoreboardError};

/// A participant of a game with one score per score line.
///
/// Players are owned by their [`Game`](super::Game); every mutation goes
/// through the game so that the score columns stay equally long.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    id: PlayerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default)]
    scores: Vec<i64>,
}

impl Player {
    pub(crate) fn new(id: PlayerId, name: Option<String>, scores: Vec<i64>) -> Self {
        Self { id, name, scores }
    }

    /// Identifier, unique within the owning game.
    pub fn id(&self) -> PlayerId {
        self.id
    }

    /// Name as entered by the user, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name to show for the player at `position` in the header row.
    ///
    /// Blank names fall back to `Player N`, counting from one.
    pub fn display_name(&self, position: usize) -> Cow<'_, str> {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => Cow::Borrowed(name),
            _ => Cow::Owned(format!("Player {}", position + 1)),
        }
    }

    /// Score column, index `i` being the `i`-th score line.
    pub fn scores(&self) -> &[i64] {
        &self.scores
    }

    /// Sum of all scores, wrapping on overflow.
    pub fn total_score(&self) -> i64 {
        wrapping_sum(&self.scores)
    }

    /// Prefix sum of the scores up to and including `index`.
    pub fn sub_total_at(&self, index: usize) -> Result<i64> {
        if index >= self.scores.len() {
            return Err(ScoreboardError::LineOutOfRange {
                index,
                len: self.scores.len(),
            });
        }
        Ok(wrapping_sum(&self.scores[..=index]))
    }

    pub(crate) fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    pub(crate) fn scores_mut(&mut self) -> &mut Vec<i64> {
        &mut self.scores
    }
}

fn wrapping_sum(scores: &[i64]) -> i64 {
    scores.iter().fold(0i64, |acc, score| acc.wrapping_add(*score))
}
