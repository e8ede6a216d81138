//! models/mod.rs
//! Módulo raíz para modelos/estructuras compartidas.

pub mod channel_model;
pub mod communication_model;
pub mod credentials_model;
pub mod directory_model;
pub mod webhook_model;
