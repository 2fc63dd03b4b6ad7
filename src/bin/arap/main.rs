//! ARAP CLI - as-rigid-as-possible mesh deformation tool.
//!
//! Usage: arap <COMMAND> [OPTIONS] <INPUT> ...
//!
//! Run `arap --help` for available commands. Set `RUST_LOG=debug` to see
//! solver details.

use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};

use arap_deform::algo::deform::{deform, ArapOptions};
use arap_deform::algo::Progress;
use arap_deform::io;
use arap_deform::linalg::FactorMethod;
use arap_deform::mesh::TriMesh;

#[derive(Parser)]
#[command(name = "arap")]
#[command(author, version, about = "As-rigid-as-possible mesh deformation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display mesh information
    Info {
        /// Input mesh file
        input: PathBuf,
    },

    /// Deform a mesh so that constrained vertices reach their targets
    Deform {
        /// Input mesh file
        input: PathBuf,

        /// Constraint file (`index x y z` or `index` per line)
        constraints: PathBuf,

        /// Output mesh file
        output: PathBuf,

        /// Maximum number of ARAP iterations
        #[arg(short, long, default_value = "10")]
        iterations: usize,

        /// Relative energy change at which to stop
        #[arg(short, long, default_value = "1e-8")]
        tolerance: f64,

        /// Sparse factorization
        #[arg(short, long, value_enum, default_value = "cholesky")]
        method: Method,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Method {
    /// Sparse Cholesky (LLᵀ)
    Cholesky,
    /// Sparse LU with pivoting
    Lu,
}

impl From<Method> for FactorMethod {
    fn from(method: Method) -> Self {
        match method {
            Method::Cholesky => FactorMethod::Cholesky,
            Method::Lu => FactorMethod::Lu,
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Info { input } => {
            cmd_info(&input)?;
        }

        Commands::Deform {
            input,
            constraints,
            output,
            iterations,
            tolerance,
            method,
        } => {
            cmd_deform(&input, &constraints, &output, iterations, tolerance, method)?;
        }
    }

    Ok(())
}

/// Create a progress reporter that prints the energy on one terminal line.
fn create_progress() -> Progress {
    Progress::new(move |iteration, max_iterations, energy| {
        eprint!("\r[{:>4}/{}] energy {:.6e}", iteration, max_iterations, energy);
        let _ = std::io::stderr().flush();
    })
}

fn cmd_info(input: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let mesh: TriMesh = io::load(input)?;

    println!("File: {}", input.display());
    println!("Vertices: {}", mesh.num_vertices());
    println!("Faces: {}", mesh.num_faces());

    let mut min_area = f64::MAX;
    let mut max_area = 0.0_f64;
    for f in 0..mesh.num_faces() {
        let area = mesh.face_area(f);
        min_area = min_area.min(area);
        max_area = max_area.max(area);
    }

    println!("Surface area: {:.6}", mesh.surface_area());
    println!("Face area range: [{:.6}, {:.6}]", min_area, max_area);

    if let Some((min, max)) = mesh.bounding_box() {
        println!(
            "Bounding box: ({:.3}, {:.3}, {:.3}) to ({:.3}, {:.3}, {:.3})",
            min.x, min.y, min.z, max.x, max.y, max.z
        );
        let diag = max - min;
        println!("Dimensions: {:.3} x {:.3} x {:.3}", diag.x, diag.y, diag.z);
    }

    println!("Average edge length: {:.6}", mesh.average_edge_length());

    Ok(())
}

fn cmd_deform(
    input: &PathBuf,
    constraints: &PathBuf,
    output: &PathBuf,
    iterations: usize,
    tolerance: f64,
    method: Method,
) -> Result<(), Box<dyn std::error::Error>> {
    let mesh: TriMesh = io::load(input)?;
    println!("Loaded: {} vertices, {} faces", mesh.num_vertices(), mesh.num_faces());

    let constraints = io::constraints::load(constraints, &mesh)?;
    println!("Constraints: {} fixed vertices", constraints.fixed.len());

    let options = ArapOptions::default()
        .with_iterations(iterations)
        .with_energy_tolerance(tolerance)
        .with_factor_method(method.into());
    let progress = create_progress();

    println!("Running ARAP (up to {} iterations, tolerance={})...", iterations, tolerance);
    let start = Instant::now();
    let result = deform(&mesh, &constraints.fixed, &constraints.targets, &options, &progress)?;
    let elapsed = start.elapsed();
    if result.iterations > 0 {
        eprintln!();
    }

    println!(
        "Energy: {:.6e} -> {:.6e} after {} iterations ({})",
        result.energies[0],
        result.final_energy(),
        result.iterations,
        if result.converged { "converged" } else { "iteration cap reached" }
    );

    let deformed = mesh.with_positions(result.positions)?;
    io::save(&deformed, output)?;
    println!("Saved: {} ({:.2?})", output.display(), elapsed);

    Ok(())
}
