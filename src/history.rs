//! Bounded append-only logs kept by each agent

use std::collections::VecDeque;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One executed task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord
{   pub task: String
  , pub context: Option<serde_json::Value>
  , pub result: String
  , pub timestamp: DateTime<Utc>
}

/// What a reasoning call was asked to do
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReasoningKind
{   StepByStep
    {   problem: String
      , steps: usize
    }
  , Correction
    {   original: String
      , feedback: String
    }
  , Decomposition
    {   task: String
    }
}

/// One reasoning call and the model's text for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningRecord
{   pub kind: ReasoningKind
  , pub result: String
  , pub timestamp: DateTime<Utc>
}

/// FIFO log that keeps only the most recent `max` entries
#[derive(Debug, Clone)]
pub struct History<T>
{   entries: VecDeque<T>
  , max: usize
}

impl<T: Clone> History<T>
{   pub fn new(max: usize) -> Self
    {   History
        {   entries: VecDeque::new()
          , max: max.max(1)
        }
    }

    pub fn max(&self) -> usize
    {   self.max
    }

    /// Append, then evict from the front past the bound
    pub fn push(&mut self, entry: T)
    {   self.entries.push_back(entry);
        self.evict();
    }

    /// Change the bound, trimming immediately when it shrinks
    pub fn set_max(&mut self, max: usize)
    {   self.max = max.max(1);
        self.evict();
    }

    fn evict(&mut self)
    {   while self.entries.len() > self.max
        {   self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize
    {   self.entries.len()
    }

    pub fn is_empty(&self) -> bool
    {   self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&T>
    {   self.entries.back()
    }

    /// Oldest first
    pub fn snapshot(&self) -> Vec<T>
    {   self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn keeps_most_recent_entries()
    {   let mut log = History::new(1000);
        for i in 0..1500
        {   log.push(i);
        }
        let entries = log.snapshot();
        assert_eq!(entries.len(), 1000);
        assert_eq!(entries[0], 500);
        assert_eq!(entries[999], 1499);
    }

    #[test]
    fn shrinking_trims_oldest()
    {   let mut log = History::new(10);
        for i in 0..10
        {   log.push(i);
        }
        log.set_max(4);
        assert_eq!(log.snapshot(), vec![6, 7, 8, 9]);
        log.push(10);
        assert_eq!(log.snapshot(), vec![7, 8, 9, 10]);
    }

    #[test]
    fn zero_bound_is_clamped()
    {   let mut log = History::new(0);
        log.push("a");
        log.push("b");
        assert_eq!(log.max(), 1);
        assert_eq!(log.last(), Some(&"b"));
    }
}
