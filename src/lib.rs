//! Gestor de conexión y sesión de streaming para gafas con cámara.
//!
//! - `domain`: tipos y máquinas de estado puras.
//! - `application`: puertos, coordinadores de conexión/stream y servicios.
//! - `adapters`: dashboard HTTP, gafas simuladas y almacenamiento de ajustes.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
