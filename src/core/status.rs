//! Per-endpoint block status and the toggle decision rules.

use serde::{Deserialize, Serialize};

use crate::core::endpoint::Direction;

/// Which directions of an endpoint are blocked. Default: neither.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockStatus {
    pub in_blocked: bool,
    pub out_blocked: bool,
}

/// Direction argument of a toggle request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleDirection {
    In,
    Out,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Block,
    Unblock,
}

impl ToggleDirection {
    /// Firewall directions touched by this toggle, inbound first.
    pub fn directions(self) -> &'static [Direction] {
        match self {
            ToggleDirection::In => &[Direction::In],
            ToggleDirection::Out => &[Direction::Out],
            ToggleDirection::Both => &[Direction::In, Direction::Out],
        }
    }

    /// Human-readable direction text for messages.
    pub fn text(self) -> &'static str {
        match self {
            ToggleDirection::In => "IN",
            ToggleDirection::Out => "OUT",
            ToggleDirection::Both => "IN and OUT",
        }
    }
}

impl std::str::FromStr for ToggleDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "in" => Ok(ToggleDirection::In),
            "out" => Ok(ToggleDirection::Out),
            "both" => Ok(ToggleDirection::Both),
            other => Err(format!("unknown direction '{other}' (expected in, out or both)")),
        }
    }
}

impl Action {
    pub fn past_tense(self) -> &'static str {
        match self {
            Action::Block => "blocked",
            Action::Unblock => "unblocked",
        }
    }
}

impl BlockStatus {
    pub fn is_blocked(self, direction: Direction) -> bool {
        match direction {
            Direction::In => self.in_blocked,
            Direction::Out => self.out_blocked,
        }
    }

    /// Decide what a toggle does from the current status.
    ///
    /// `Both` unblocks only when both bits are set; a partially blocked entry
    /// goes to fully blocked.
    pub fn next_action(self, direction: ToggleDirection) -> Action {
        let blocked = match direction {
            ToggleDirection::In => self.in_blocked,
            ToggleDirection::Out => self.out_blocked,
            ToggleDirection::Both => self.in_blocked && self.out_blocked,
        };
        if blocked {
            Action::Unblock
        } else {
            Action::Block
        }
    }

    /// Status after `action` was applied to `direction`. Untouched bits keep their value.
    pub fn with_action(self, direction: ToggleDirection, action: Action) -> Self {
        let value = action == Action::Block;
        let mut next = self;
        for dir in direction.directions() {
            match dir {
                Direction::In => next.in_blocked = value,
                Direction::Out => next.out_blocked = value,
            }
        }
        next
    }

    /// Directions that currently have a block rule.
    pub fn blocked_directions(self) -> Vec<Direction> {
        [Direction::In, Direction::Out]
            .into_iter()
            .filter(|d| self.is_blocked(*d))
            .collect()
    }

    pub fn label(self) -> &'static str {
        match (self.in_blocked, self.out_blocked) {
            (true, true) => "Fully blocked",
            (false, false) => "Not blocked",
            _ => "Partially blocked",
        }
    }
}
