//! Runs every hierarchical estimator on a small synthetic histogram
//!
//! Run with: RUST_LOG=privhist_tree=debug cargo run -p privhist-tree --example hierarchy_demo

use anyhow::Result;
use privhist_tree::{Domain, EstimationEngine, HierarchicalEngine};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // A bimodal 1-D histogram
    let counts: Vec<u32> = (0..300)
        .map(|i| {
            let a = (-((i as f64 - 80.0) / 20.0).powi(2)).exp();
            let b = (-((i as f64 - 210.0) / 35.0).powi(2)).exp();
            (200.0 * a + 120.0 * b).round() as u32
        })
        .collect();
    let line = Domain::one_d(&counts)?;

    println!("=== 1-D estimators (N = {}, total = {}) ===", line.len(), line.total());
    for engine in [HierarchicalEngine::hb(), HierarchicalEngine::h2()] {
        let report = engine.run_with_report(&line, 0.1, Some(2024))?;
        println!(
            "{:8} arity {:3} height {:2} nodes {:5} total {:9.1} mean abs error {:.2}",
            engine.name(),
            report.arity,
            report.height,
            report.tree.len(),
            report.estimate.total(),
            mean_abs_error(report.estimate.values(), line.values()),
        );
    }

    // A 2-D grid with one dense corner
    let rows: Vec<Vec<u32>> = (0..48)
        .map(|r| (0..48).map(|c| if r < 12 && c < 12 { 40 } else { (r + c) % 3 }).collect())
        .collect();
    let grid = Domain::two_d(&rows)?;

    println!("\n=== 2-D estimators ({}x{}, total = {}) ===", 48, 48, grid.total());
    for engine in [HierarchicalEngine::quadtree(), HierarchicalEngine::hb2d(0)?] {
        let report = engine.run_with_report(&grid, 0.1, Some(2024))?;
        println!(
            "{:8} arity {:3} height {:2} nodes {:5} total {:9.1} mean abs error {:.2}",
            engine.name(),
            report.arity,
            report.height,
            report.tree.len(),
            report.estimate.total(),
            mean_abs_error(report.estimate.values(), grid.values()),
        );
    }

    Ok(())
}

fn mean_abs_error(estimate: &[f64], truth: &[f64]) -> f64 {
    let total: f64 = estimate.iter().zip(truth).map(|(e, t)| (e - t).abs()).sum();
    total / truth.len() as f64
}
