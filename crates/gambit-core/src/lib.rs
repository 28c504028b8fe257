// Library root: card catalog, pack draws, and the persistent
// economy/collection/roster stores that make up a player session.

pub mod catalog;
pub mod collection;
pub mod config;
pub mod db;
pub mod draw;
pub mod economy;
pub mod matches;
pub mod pack;
pub mod player;
pub mod pricing;
pub mod roster;
pub mod session;
pub mod store;
pub mod tier;
