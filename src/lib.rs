//! Reads photographed multiple-choice answer sheets: finds the answer grid,
//! splits it into question regions, classifies every printed bubble as filled
//! or empty, and scores the answers against a key.

pub mod answer_key;
pub mod bubbles;
pub mod composite;
pub mod config;
pub mod error;
pub mod extract;
pub mod geometry;
pub mod image_utils;
pub mod interpret;
pub mod layout;
pub mod report;
pub mod resolve;
pub mod score;
pub mod segment;
pub mod sheet;
pub mod types;

#[cfg(test)]
mod test_utils;
