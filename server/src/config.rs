use crate::error::ConfigError;
use snake_shared::{
    DEFAULT_HEIGHT, DEFAULT_MAX_FOODS, DEFAULT_PORT, DEFAULT_TICK_MS, DEFAULT_WIDTH, SPAWN_MARGIN,
};
use std::time::Duration;

/// Runtime settings for [`crate::network::Server`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub width: i32,
    pub height: i32,
    /// Food count the tick loop refills towards.
    pub max_foods: usize,
    pub tick_duration: Duration,
    pub max_players: usize,
    pub handshake_timeout: Duration,
    /// Drops sessions that send nothing for this long. `None` waits forever.
    pub idle_timeout: Option<Duration>,
    /// Fixed RNG seed for reproducible runs.
    pub seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            max_foods: DEFAULT_MAX_FOODS,
            tick_duration: Duration::from_millis(DEFAULT_TICK_MS),
            max_players: 32,
            handshake_timeout: Duration::from_secs(10),
            idle_timeout: None,
            seed: None,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Number of non-border cells.
    pub fn interior_cells(&self) -> usize {
        ((self.width - 2).max(0) as usize) * ((self.height - 2).max(0) as usize)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let min = 2 * SPAWN_MARGIN;
        if self.width < min || self.height < min {
            return Err(ConfigError::ArenaTooSmall {
                width: self.width,
                height: self.height,
                min,
            });
        }

        // Refill only terminates if every food item can get its own cell.
        let interior = self.interior_cells();
        if self.max_foods > interior {
            return Err(ConfigError::TooMuchFood {
                max_foods: self.max_foods,
                interior,
            });
        }

        if self.tick_duration.is_zero() {
            return Err(ConfigError::ZeroTick);
        }

        if self.max_players == 0 {
            return Err(ConfigError::NoPlayerSlots);
        }

        Ok(())
    }
}
