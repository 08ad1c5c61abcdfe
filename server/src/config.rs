use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::engine::EngineConfig;
use crate::lobby::DEFAULT_MAX_PLAYERS;
use crate::ws::Keepalive;

#[derive(Debug, Clone, Parser)]
#[command(name = "sketchparty-server")]
#[command(about = "Lobby and game-flow server for the sketchparty drawing game")]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "BIND", default_value = "0.0.0.0")]
    pub bind: IpAddr,
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 8000)]
    pub port: u16,
    /// Roster ceiling per lobby
    #[arg(long, env = "MAX_PLAYERS", default_value_t = DEFAULT_MAX_PLAYERS)]
    pub max_players: usize,
    /// Smallest lobby code handed out
    #[arg(long, default_value_t = 1000)]
    pub code_min: u32,
    /// Largest lobby code handed out
    #[arg(long, default_value_t = 999_999)]
    pub code_max: u32,
    /// Seconds between websocket pings
    #[arg(long, default_value_t = 5)]
    pub ping_interval_secs: u64,
    /// Seconds of silence after a ping before the connection is dropped
    #[arg(long, default_value_t = 8)]
    pub ping_timeout_secs: u64,
}

impl Config {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    pub fn engine(&self) -> EngineConfig {
        let (lo, hi) = if self.code_min <= self.code_max {
            (self.code_min, self.code_max)
        } else {
            (self.code_max, self.code_min)
        };
        EngineConfig {
            max_players: self.max_players.max(1),
            code_range: lo..=hi,
        }
    }

    pub fn keepalive(&self) -> Keepalive {
        Keepalive {
            interval: Duration::from_secs(self.ping_interval_secs.max(1)),
            timeout: Duration::from_secs(self.ping_timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let cfg = Config::try_parse_from([
            "sketchparty-server",
            "--bind",
            "127.0.0.1",
            "--port",
            "9100",
            "--max-players",
            "4",
            "--ping-interval-secs",
            "2",
        ])
        .unwrap();

        assert_eq!(cfg.addr(), "127.0.0.1:9100".parse().unwrap());
        assert_eq!(cfg.engine().max_players, 4);
        assert_eq!(cfg.keepalive().interval, Duration::from_secs(2));
    }

    #[test]
    fn inverted_code_range_is_normalised() {
        let cfg = Config::try_parse_from([
            "sketchparty-server",
            "--code-min",
            "500",
            "--code-max",
            "100",
        ])
        .unwrap();
        assert_eq!(cfg.engine().code_range, 100..=500);
    }
}
