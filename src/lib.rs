pub mod accumulator;
pub mod config;
pub mod db;
pub mod finalizer;
pub mod importers;
pub mod services;
