//! `surdumpcli` command-line front end for the `surdump` backup engine.
//!
//! ## Getting started
//!
//! ```doc
//! ❯ surdumpcli full --namespace demo --database main --output-dir ./backups --seed seed.json
//! ❯ surdumpcli incremental --namespace demo --database main --output-dir ./backups --since 400
//! ❯ surdumpcli chains ./backups
//! ```

pub mod command;
pub mod config;
pub mod seed;
pub mod trace;
