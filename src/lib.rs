//! IEP Evidence Server Library
//!
//! OCR extraction of IEP documents and verification of the evidence quotes
//! an LLM cites for each extracted value. The server binary is in main.rs.
//!
//! # Modules
//!
//! - `text`: canonicalization and edit-distance similarity
//! - `verify`: tiered quote verification
//! - `extraction`: chunked OCR pipeline and completeness tracking
//! - `evidence`: citation verification against stored page text
//! - `orchestrator`: whole-run retries and per-document exclusivity

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod evidence;
pub mod extraction;
pub mod ocr;
pub mod orchestrator;
pub mod routes;
pub mod state;
pub mod storage;
pub mod text;
pub mod verify;
