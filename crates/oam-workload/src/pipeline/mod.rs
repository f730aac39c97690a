//! Internal compilation pipeline stages

pub(crate) mod config;
pub(crate) mod containers;
pub(crate) mod mysql;
pub(crate) mod service;
