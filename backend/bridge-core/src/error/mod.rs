pub mod channel;
pub mod command;
pub mod config;
pub mod protocol;
pub mod spawn;
pub mod surface;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Channel(#[from] channel::ChannelError),

    #[error(transparent)]
    Command(#[from] command::CommandError),

    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Spawn(#[from] spawn::SpawnError),

    #[error(transparent)]
    Surface(#[from] surface::SurfaceError),
}
