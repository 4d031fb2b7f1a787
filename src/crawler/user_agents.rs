use crate::config::{Rotation, UserAgentConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Desktop browser agents used when the configuration lists none
const BUILTIN_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.4; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.0.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
];

/// Pool of User-Agent strings handed out one per request
///
/// The pool and its cursor live with the fetcher that owns it; there is no
/// process-wide rotation state.
#[derive(Debug)]
pub struct UserAgentPool {
    agents: Vec<String>,
    rotation: Rotation,
    cursor: usize,
    rng: StdRng,
}

impl UserAgentPool {
    /// Builds the pool from configuration, falling back to the built-in list
    pub fn from_config(config: &UserAgentConfig) -> Self {
        let agents = if config.agents.is_empty() {
            BUILTIN_AGENTS.iter().map(|a| a.to_string()).collect()
        } else {
            config.agents.iter().map(|a| a.trim().to_string()).collect()
        };

        Self::new(agents, config.rotation)
    }

    /// Builds a pool from explicit agents
    ///
    /// An empty list falls back to the built-in agents.
    pub fn new(agents: Vec<String>, rotation: Rotation) -> Self {
        let agents = if agents.is_empty() {
            BUILTIN_AGENTS.iter().map(|a| a.to_string()).collect()
        } else {
            agents
        };

        Self {
            agents,
            rotation,
            cursor: 0,
            rng: StdRng::from_entropy(),
        }
    }

    /// Returns the agent for the next request
    pub fn next_agent(&mut self) -> &str {
        let index = match self.rotation {
            Rotation::Random => self.rng.gen_range(0..self.agents.len()),
            Rotation::Sequential => {
                let index = self.cursor % self.agents.len();
                self.cursor = self.cursor.wrapping_add(1);
                index
            }
        };
        &self.agents[index]
    }

    /// Number of agents in the pool
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Always false; an empty configuration falls back to the built-in list
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
