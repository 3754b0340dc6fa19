//! Payroll Calculation Engine for public-sector back-office payroll.
//!
//! This crate turns per-employee configuration (work regime, holiday
//! calendars, leave rules, compensatory-time banking) into expected
//! attendance figures, and evaluates ordered earning/deduction rules
//! ("rubricas") plus progressive tax bracket tables into a computed
//! payroll run with a strict lifecycle and a full audit trail.

#![warn(missing_docs)]

pub mod api;
pub mod calculation;
pub mod config;
pub mod error;
pub mod models;
