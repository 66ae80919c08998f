//! Core stylecrate library (session store, gateway, storage, survey, config).

pub mod config;
pub mod cookies;
pub mod gateway;
pub mod graphql;
pub mod session;
pub mod storage;
pub mod survey;
