//! Two-player zero-sum matrix game.

use multiagent::env::{EnvInfo, MultiAgentEnv, MultiAgentStepResult};
use multiagent::spaces::{Box as BoxSpace, Discrete, Tuple};
use multiagent::{MultiAgentError, Result};
use ndarray::{ArrayD, IxDyn};

/// Matching pennies, played for a fixed number of rounds.
///
/// Agent 0 wins a round when both coins match, agent 1 when they differ.
/// Each agent observes the opponent's previous coin.
pub struct MatchingPennies {
    rounds: u32,
    round: u32,
    last: [f32; 2],
    /// Running return of agent 0
    score: f32,
}

impl MatchingPennies {
    pub fn new(rounds: u32) -> Self {
        Self {
            rounds,
            round: 0,
            last: [0.0; 2],
            score: 0.0,
        }
    }

    fn observe(&self) -> Vec<ArrayD<f32>> {
        vec![
            ArrayD::from_elem(IxDyn(&[1]), self.last[1]),
            ArrayD::from_elem(IxDyn(&[1]), self.last[0]),
        ]
    }
}

impl Default for MatchingPennies {
    fn default() -> Self {
        Self::new(10)
    }
}

impl MultiAgentEnv for MatchingPennies {
    fn num_agents(&self) -> usize {
        2
    }

    fn observation_space(&self) -> Tuple {
        Tuple::repeat(BoxSpace::uniform(&[1], 0.0, 1.0), 2)
    }

    fn action_space(&self) -> Tuple {
        Tuple::repeat(Discrete::new(2), 2)
    }

    fn reset(&mut self, _seed: Option<u64>) -> Result<(Vec<ArrayD<f32>>, EnvInfo)> {
        self.round = 0;
        self.last = [0.0; 2];
        self.score = 0.0;
        Ok((self.observe(), EnvInfo::new()))
    }

    fn step(&mut self, actions: &[ArrayD<f32>]) -> Result<MultiAgentStepResult> {
        let coin = Discrete::new(2);
        let decoded = match actions {
            [a, b] => coin.decode(a).zip(coin.decode(b)),
            _ => None,
        };
        let (a, b) = match decoded {
            Some((a, b)) => (a as f32, b as f32),
            None => {
                return Err(MultiAgentError::InvalidAction(
                    "matching pennies expects one coin (0 or 1) per player".into(),
                ))
            }
        };

        self.round += 1;
        self.last = [a, b];
        let payoff = if a == b { 1.0 } else { -1.0 };
        self.score += payoff;
        let done = self.round >= self.rounds;

        let mut info = EnvInfo::new();
        if done {
            info = info.with_episode_stats(self.score, self.round);
        }

        Ok(MultiAgentStepResult {
            observations: self.observe(),
            rewards: vec![payoff, -payoff],
            terminated: done,
            truncated: false,
            info,
        })
    }

    fn render(&self) -> Option<String> {
        Some(format!(
            "round {}/{}: {} vs {}",
            self.round, self.rounds, self.last[0], self.last[1]
        ))
    }
}
