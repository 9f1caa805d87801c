use std::path::PathBuf;

use anyhow::{Context, Result};
use rusty_unmix::synth::{SyntheticMap, SyntheticParams};
use rusty_unmix::{fit_spectrum, Diagnostics, FitOptions};

/// Fit a synthetic 16×16 map with known weights and report how well the
/// configured solver recovers them.
///
/// Usage: `rusty-unmix [options.json]` (set `RUST_LOG=debug` for solver traces).
fn main() -> Result<()> {
    env_logger::init();

    let options = match std::env::args_os().nth(1) {
        Some(path) => FitOptions::from_json_file(&PathBuf::from(path))?,
        None => FitOptions::default(),
    };
    log::info!("fit options: {}", serde_json::to_string(&options)?);

    let params = SyntheticParams {
        n_references: 4,
        pixel_dims: vec![16, 16],
        axis: options.axis,
        noise: 0.002,
        ..Default::default()
    };
    let map = SyntheticMap::generate(&params).context("building synthetic map")?;
    log::info!(
        "synthetic map: data {:?}, references {:?}",
        map.data.shape(),
        map.references.shape()
    );

    let fit = fit_spectrum(map.data.view(), map.references.view(), &options)
        .context("fitting synthetic map")?;

    let rf_mean = fit.rfactor.mean().unwrap_or(f64::NAN);
    let rf_max = fit.rfactor.iter().copied().fold(0.0, f64::max);
    let weight_error = (&fit.weights - &map.weights)
        .mapv(f64::abs)
        .mean()
        .unwrap_or(f64::NAN);

    println!("method:              {}", fit.method());
    println!("weights shape:       {:?}", fit.weights.shape());
    println!("R-factor mean / max: {rf_mean:.3e} / {rf_max:.3e}");
    println!("mean |weight error|: {weight_error:.3e}");
    match &fit.diagnostics {
        Diagnostics::Nnls { residual } => {
            let mean = residual.mean().unwrap_or(f64::NAN);
            println!("mean residual norm:  {mean:.3e}");
        }
        Diagnostics::Admm {
            convergence,
            feasibility,
        } => {
            let n = convergence.len();
            println!("ADMM iterations:     {n}");
            if n > 0 {
                println!(
                    "final convergence:   {:.3e} (feasibility {:.3e})",
                    convergence[n - 1],
                    feasibility[n - 1]
                );
            }
        }
    }

    Ok(())
}
