//! Core library for Credit Commons.
//!
//! Contains the envelope cipher, content hasher, presentation signer, consent
//! lifecycle, credential issuance and disclosure pipelines, borrower
//! discovery, and the audit trail. This crate depends on
//! `credcommons-storage` for the storage trait and knows nothing about HTTP.

pub mod audit;
pub mod audit_file;
pub mod consent;
pub mod crypto;
pub mod disclosure;
pub mod discovery;
pub mod error;
pub mod issuance;
pub mod presentation;
pub mod registry;
pub mod vc;
