pub(crate) mod bootstrap;
mod level;
pub(crate) mod loop_runner;
mod scenes;
