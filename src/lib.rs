//! # single-markers
//!
//! Fluorescent marker assignment and embedding summary statistics for single-cell data, part of
//! the single-rust ecosystem.
//!
//! Reporter genes (e.g. GFP variants) mark lineages in time-course experiments. This crate
//! derives an expression threshold per reporter and time point from the density of its log1p
//! expression, aligns the thresholds, and labels every cell with its dominant reporter or as
//! unassigned. Two standalone utilities summarise cell embeddings and per-cell measurements.
//!
//! ## Core Features
//!
//! - **Density thresholds**: Gaussian KDE peak detection with background-peak skipping and a
//!   percentile fallback
//! - **Marker assignment**: per-time-point threshold alignment and per-cell labeling on a
//!   sparse `CsrMatrix` backed [`markers::CellTable`]
//! - **Embedding similarity**: average pairwise Euclidean similarity of `ndarray` embeddings
//! - **Bootstrap intervals**: parallel, reproducible percentile bootstrap for the mean
//!
//! ## Quick Start
//!
//! Build a [`markers::CellTable`], then call [`markers::assign_markers`] with a
//! [`markers::MarkerConfig`]. The default configuration describes a six time-point experiment
//! with the reporters act15GFP, mCherry, mCerulean and mNeonG.
//!
//! ## Module Organization
//!
//! - **[`markers`]**: Cell table, density thresholds and marker assignment
//! - **[`metrics`]**: Pairwise similarity and bootstrap confidence intervals

pub mod markers;
pub mod metrics;
