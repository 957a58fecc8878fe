// Interface adapters: HTTP surface, rendering and collaborator adapters.

pub mod catalog;
pub mod clients;
pub mod guest_store;
pub mod handlers;
pub mod protocol;
pub mod render;
pub mod routes;
pub mod state;
