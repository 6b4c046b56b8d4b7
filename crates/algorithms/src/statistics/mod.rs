//! Focal statistics for raster data

pub mod focal;

pub use focal::{focal_statistics, FocalParams, FocalStatistic, FocalStatistics};
