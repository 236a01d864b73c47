//! On-disk container for recorded device sessions.
//!
//! Sessions are persisted in the LapViz delimited text format ([`lapviz`]),
//! optionally wrapped in a single-entry zip ([`archive`]), alongside a small
//! JSON `.info` sidecar ([`info`]) kept for fast listing. [`FsSessionContainer`]
//! wires this onto the event bus as a [`module_core::Module`].

pub mod archive;
pub mod fs_container;
pub mod info;
pub mod lapviz;

pub use fs_container::FsSessionContainer;

#[cfg(test)]
mod tests;
