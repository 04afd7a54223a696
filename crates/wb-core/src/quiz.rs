//! Self-test over a list's words: show a word, the user says whether they
//! knew it, the answer is revealed, move on. Only a running score is kept.

use crate::error::{AppError, Result};
use crate::models::Word;

#[derive(Debug, Clone)]
pub struct QuizSession {
    words: Vec<Word>,
    position: usize,
    score: usize,
    revealed: bool,
    finished: bool,
}

impl QuizSession {
    /// Starts a session; at least one word is needed.
    pub fn new(words: Vec<Word>) -> Result<Self> {
        if words.is_empty() {
            return Err(AppError::ValidationError(
                "a test needs at least one word".into(),
            ));
        }
        Ok(Self {
            words,
            position: 0,
            score: 0,
            revealed: false,
            finished: false,
        })
    }

    /// The word being asked, `None` once finished.
    pub fn current(&self) -> Option<&Word> {
        if self.finished {
            None
        } else {
            self.words.get(self.position)
        }
    }

    /// Records the self-assessment and reveals the answer. Ignored when the
    /// answer is already revealed. Returns whether it was recorded.
    pub fn answer(&mut self, known: bool) -> bool {
        if self.finished || self.revealed {
            return false;
        }
        if known {
            self.score += 1;
        }
        self.revealed = true;
        true
    }

    /// Moves to the next word after a reveal; finishes after the last one.
    pub fn next(&mut self) {
        if self.finished || !self.revealed {
            return;
        }
        self.revealed = false;
        if self.position + 1 < self.words.len() {
            self.position += 1;
        } else {
            self.finished = true;
        }
    }

    pub fn restart(&mut self) {
        self.position = 0;
        self.score = 0;
        self.revealed = false;
        self.finished = false;
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn score(&self) -> usize {
        self.score
    }

    /// `(question number, total)`, 1-based.
    pub fn progress(&self) -> (usize, usize) {
        (self.position + 1, self.words.len())
    }
}
