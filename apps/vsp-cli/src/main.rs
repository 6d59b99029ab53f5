use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};
use vsp_aerostruct::{AeroStructError, AeroStructManager, AeroStructSettings, StaticCatalog};
use vsp_groups::{GroupError, read_groups, write_groups};
use vsp_optimizer::{OptimizerError, VspOptimizer};
use vsp_results::{
    ResultsError, RunCaseSummary, RunManifest, RunStore, RunType, compute_run_id,
    records_from_histories,
};
use vsp_solver::InputVariable;

const SOLVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Optimizer(#[from] OptimizerError),
    #[error(transparent)]
    Results(#[from] ResultsError),
    #[error(transparent)]
    AeroStruct(#[from] AeroStructError),
    #[error(transparent)]
    Group(#[from] GroupError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Check(String),
}

type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "vsp-cli")]
#[command(about = "VSPAERO-RS CLI - vortex-lattice analysis with adjoint gradients", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a parsed case file as YAML
    Config {
        /// Path to the case file
        case_path: PathBuf,
    },
    /// Solve every run case and store the run
    Solve {
        /// Path to the case file
        case_path: PathBuf,
        /// Skip cache and force re-run
        #[arg(long)]
        no_cache: bool,
    },
    /// Solve forward and adjoint, print values and gradients
    Gradients {
        /// Path to the case file
        case_path: PathBuf,
        /// Write node gradients of every function as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List stored runs of a case
    Runs {
        /// Path to the case file
        case_path: PathBuf,
    },
    /// Read a group file, write it back and compare
    GroupRoundtrip {
        /// Path to the group file
        group_path: PathBuf,
        /// Where to write the re-serialized groups (optional)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Transfer loads onto an FEA mesh and optionally run CalculiX
    Aerostruct {
        /// Aerodynamic database file
        #[arg(long)]
        adb: PathBuf,
        /// CalculiX mesh exported for the structure
        #[arg(long)]
        mesh: PathBuf,
        /// Dynamic pressure
        #[arg(long)]
        dynp: f64,
        /// Directory holding the load-transfer program
        #[arg(long)]
        loads_dir: Option<PathBuf>,
        /// Directory holding ccx
        #[arg(long)]
        ccx_dir: Option<PathBuf>,
        /// Run the structural solve after the load transfer
        #[arg(long)]
        solve: bool,
        /// Persisted settings, read if present and written back
        #[arg(long)]
        settings: Option<PathBuf>,
    },
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { case_path } => cmd_config(&case_path),
        Commands::Solve {
            case_path,
            no_cache,
        } => cmd_solve(&case_path, !no_cache),
        Commands::Gradients { case_path, output } => cmd_gradients(&case_path, output.as_deref()),
        Commands::Runs { case_path } => cmd_runs(&case_path),
        Commands::GroupRoundtrip { group_path, output } => {
            cmd_group_roundtrip(&group_path, output.as_deref())
        }
        Commands::Aerostruct {
            adb,
            mesh,
            dynp,
            loads_dir,
            ccx_dir,
            solve,
            settings,
        } => cmd_aerostruct(
            &adb,
            &mesh,
            dynp,
            loads_dir,
            ccx_dir.as_deref(),
            solve,
            settings.as_deref(),
        ),
    }
}

fn case_name(case_path: &Path) -> String {
    case_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "case".to_string())
}

fn cmd_config(case_path: &Path) -> CliResult<()> {
    let opt = VspOptimizer::setup(case_path)?;
    print!("{}", opt.config().to_yaml()?);
    Ok(())
}

fn cmd_solve(case_path: &Path, use_cache: bool) -> CliResult<()> {
    println!("Solving case: {}", case_path.display());
    let start = Instant::now();
    let mut opt = VspOptimizer::setup(case_path)?;
    let store = RunStore::for_case(case_path)?;
    let run_id = compute_run_id(opt.config(), opt.solver().mesh(), SOLVER_VERSION)?;
    debug!(%run_id, cached = store.has_run(&run_id), "resolved run id");

    let manifest = if use_cache && store.has_run(&run_id) {
        println!("✓ Loaded from cache: {run_id}");
        store.load_manifest(&run_id)?
    } else {
        opt.solve_forward()?;
        let histories = opt.histories()?;
        let run_type = if opt.config().unsteady {
            RunType::Unsteady {
                time_step: opt.config().time_step,
                steps: opt.config().number_of_time_steps,
                start_averaging_time: opt.config().start_averaging_time,
            }
        } else {
            RunType::Steady
        };
        let manifest = RunManifest {
            run_id: run_id.clone(),
            case_name: case_name(case_path),
            timestamp: chrono::Utc::now().to_rfc3339(),
            run_type,
            solver_version: SOLVER_VERSION.to_string(),
            run_cases: histories.iter().map(RunCaseSummary::from_history).collect(),
        };
        store.save_run(&manifest, &records_from_histories(histories))?;
        info!(%run_id, run_cases = manifest.run_cases.len(), "run stored");
        println!("✓ Solve completed: {run_id}");
        manifest
    };

    println!("\n  {:>4} {:>8} {:>8} {:>8} {:>10} {:>10} {:>10}", "case", "Mach", "AoA", "Beta", "CL", "CD", "CS");
    for (i, c) in manifest.run_cases.iter().enumerate() {
        println!(
            "  {:>4} {:>8.4} {:>8.3} {:>8.3} {:>10.5} {:>10.5} {:>10.5}",
            i, c.mach, c.alpha_deg, c.beta_deg, c.cl, c.cd, c.cs
        );
        for g in &c.groups {
            print!("       {:<16} CL {:>9.5} CD {:>9.5}", g.name, g.cl, g.cd);
            match (g.ct, g.cp) {
                (Some(ct), Some(cp)) => println!(" CT {ct:>9.5} CP {cp:>9.5}"),
                _ => println!(),
            }
        }
    }
    println!("\n  Total: {:.3}s", start.elapsed().as_secs_f64());
    Ok(())
}

fn cmd_gradients(case_path: &Path, output: Option<&Path>) -> CliResult<()> {
    let mut opt = VspOptimizer::setup(case_path)?;
    let n = opt.number_of_optimization_functions();
    if n == 0 {
        return Err(CliError::Check(format!(
            "{} defines no Objective",
            case_path.display()
        )));
    }

    let start = Instant::now();
    {
        let _quiet = opt.suppress_stdout();
        opt.solve()?;
    }
    info!(functions = n, nodes = opt.number_of_nodes(), "gradients ready");
    println!("Forward + adjoint: {:.3}s", start.elapsed().as_secs_f64());

    let offset = opt.array_offset();
    for i in 0..n {
        let c = offset.to_external(i);
        let function = opt.optimization_function(c)?;
        let grad = opt.case_function_gradients(c)?;
        let norm = grad.iter().map(|g| g * g).sum::<f64>().sqrt();
        println!(
            "\n[{c}] {function} (run case {}): value {:.6e}, |dF/dX| {:.6e}",
            offset.to_external(opt.function_slot(c)?.case),
            opt.case_function_value(c)?,
            norm
        );
        for var in InputVariable::ALL {
            println!("    dF/d{:<10} {:>14.6e}", var.label(), opt.df_d_input_variable(c, None, var)?);
        }
    }

    if let Some(path) = output {
        let mut out = io::BufWriter::new(fs::File::create(path)?);
        write!(out, "node,x,y,z")?;
        for i in 0..n {
            let f = opt.optimization_function(offset.to_external(i))?;
            write!(out, ",{f}_{i}_dx,{f}_{i}_dy,{f}_{i}_dz")?;
        }
        writeln!(out)?;
        let grads = (0..n)
            .map(|i| opt.case_function_gradients(offset.to_external(i)))
            .collect::<Result<Vec<_>, _>>()?;
        for node in 0..opt.number_of_nodes() {
            let k = offset.to_external(node);
            write!(out, "{k},{},{},{}", opt.node_x(k)?, opt.node_y(k)?, opt.node_z(k)?)?;
            for g in &grads {
                write!(out, ",{},{},{}", g[3 * node], g[3 * node + 1], g[3 * node + 2])?;
            }
            writeln!(out)?;
        }
        out.flush()?;
        println!("\n✓ Node gradients written to {}", path.display());
    }
    Ok(())
}

fn cmd_runs(case_path: &Path) -> CliResult<()> {
    let store = RunStore::for_case(case_path)?;
    let runs = store.list_runs(&case_name(case_path))?;
    if runs.is_empty() {
        println!("No stored runs for {}", case_path.display());
        return Ok(());
    }
    for run in runs {
        let kind = match run.run_type {
            RunType::Steady => "steady".to_string(),
            RunType::Unsteady { steps, time_step, .. } => format!("unsteady {steps}×{time_step}s"),
        };
        println!(
            "  {}  {}  {}  {} run case(s)",
            &run.run_id[..12.min(run.run_id.len())],
            run.timestamp,
            kind,
            run.run_cases.len()
        );
    }
    Ok(())
}

fn cmd_group_roundtrip(group_path: &Path, output: Option<&Path>) -> CliResult<()> {
    let file = fs::File::open(group_path)?;
    let groups = read_groups(&mut BufReader::new(file))?;
    let mut text = Vec::new();
    write_groups(&mut text, &groups)?;
    let again = read_groups(&mut text.as_slice())?;
    if again != groups {
        return Err(CliError::Check(format!(
            "{}: groups changed on round trip",
            group_path.display()
        )));
    }
    if let Some(path) = output {
        fs::write(path, &text)?;
    }
    println!("✓ {} group(s) round-tripped", groups.len());
    for g in &groups {
        println!("  {:<16} {:?}, {} component(s)", g.name, g.motion_kind(), g.components().len());
    }
    Ok(())
}

fn cmd_aerostruct(
    adb: &Path,
    mesh: &Path,
    dynp: f64,
    loads_dir: Option<PathBuf>,
    ccx_dir: Option<&Path>,
    solve: bool,
    settings_path: Option<&Path>,
) -> CliResult<()> {
    let mut settings = match settings_path {
        Some(p) if p.exists() => AeroStructSettings::load_yaml(p)?,
        _ => AeroStructSettings::default(),
    };
    settings.set_dynamic_pressure(dynp);
    settings.set_current_struct_assy_index(0);

    let mut mgr = AeroStructManager::new(settings);
    mgr.set_adb_file(adb);
    if let Some(dir) = loads_dir {
        let cmd = mgr.loads_tool().cmd.clone();
        mgr.set_loads_tool(cmd, Some(dir));
    }
    mgr.update(&StaticCatalog::default().with_structure("structure", mesh));
    if !mgr.adb_file().found {
        println!("! Aerodynamic database not found: {}", adb.display());
    }
    if !mgr.fea_mesh_file().found {
        return Err(CliError::Check(format!("FEA mesh not found: {}", mesh.display())));
    }

    let stdout = io::stdout();
    let mut lock = stdout.lock();
    let report = mgr.transfer_loads(Some(&mut lock))?;
    if !report.succeeded() {
        println!("! Load transfer: {}", report.message.as_deref().unwrap_or("failed"));
    }

    if solve {
        if !mgr.find_ccx(ccx_dir) {
            println!("! ccx not found");
        }
        if mgr.fea_input_file().found {
            let report = mgr.compute_structure(Some(&mut lock))?;
            if !report.succeeded() {
                println!("! Structural solve: {}", report.message.as_deref().unwrap_or("failed"));
            }
        }
    }

    for (label, file) in [
        ("input", mgr.fea_input_file()),
        ("solution", mgr.fea_solution_file()),
    ] {
        match file.existing() {
            Some(p) => println!("✓ {label}: {}", p.display()),
            None => println!("  {label}: not produced"),
        }
    }

    if let Some(p) = settings_path {
        mgr.settings.save_yaml(p)?;
    }
    Ok(())
}
