//! Drivers that feed commands from some input into a [`crate::ledger::Ledger`].

pub mod simple;
