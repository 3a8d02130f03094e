//! # Protocol Layer
//!
//! Revision catalog, per-revision id tables and the packet model.
//!
//! ## Components
//! - **Version**: ordered catalog of supported revisions
//! - **Resource**: block and item ids per revision
//! - **Registry**: packet ids per revision
//! - **Packets**: typed inbound and outbound packets
//! - **Component**: chat text in JSON or tag form
//! - **Dispatcher**: routes inbound frames to packet decoders
//!
//! Every table is validated when it is built, so a revision without an id is a
//! startup error rather than a failure on a live connection.

pub mod component;
pub mod dispatcher;
pub mod packets;
pub mod registry;
pub mod resource;
pub mod version;
