use flow_lab_abstract::{RunConfig, TcpVariant};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

pub const LINK_DELAY_MS: (u64, u64) = (2, 4);
pub const PAYLOAD_SIZE: (u32, u32) = (1000, 2400);
pub const CLIENT_START_S: (u64, u64) = (1, 4);
pub const CLIENT_STOP_S: (u64, u64) = (15, 20);

/// Draws a reproducible [`RunConfig`] from a single seed.
///
/// The generator is owned by the configurator; nothing else draws from it,
/// so the same seed always yields the same configuration.
pub struct Configurator {
    seed: u64,
    rng: StdRng,
}

impl Configurator {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn configure(mut self) -> RunConfig {
        let variant = TcpVariant::ALL[self.rng.random_range(0..TcpVariant::ALL.len())];
        let link_delay_ms = self.rng.random_range(LINK_DELAY_MS.0..=LINK_DELAY_MS.1);
        let payload_size = self.rng.random_range(PAYLOAD_SIZE.0..=PAYLOAD_SIZE.1);
        let client_start_s = self.rng.random_range(CLIENT_START_S.0..=CLIENT_START_S.1);
        let client_stop_s = self.rng.random_range(CLIENT_STOP_S.0..=CLIENT_STOP_S.1);

        let config = RunConfig {
            variant,
            link_delay_ms,
            payload_size,
            client_start_s,
            client_stop_s,
            seed: self.seed,
        };
        info!(
            "Run configured: variant={} delay={}ms payload={}B client={}s..{}s seed={}",
            config.variant,
            config.link_delay_ms,
            config.payload_size,
            config.client_start_s,
            config.client_stop_s,
            config.seed
        );
        config
    }
}

/// Shorthand for `Configurator::new(seed).configure()`.
pub fn configure(seed: u64) -> RunConfig {
    Configurator::new(seed).configure()
}
