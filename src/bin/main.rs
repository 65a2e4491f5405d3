use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use walkdir::WalkDir;

use jitdeploy::classify::Classifier;
use jitdeploy::consts::{REMOTE_EXCEPTION, RUNTIME_EXCEPTION};
use jitdeploy::exec::{Interpreter, RecordingRuntime, Value};
use jitdeploy::model::TypeRef;
use jitdeploy::naming::NameMapper;
use jitdeploy::synth::call_style;
use jitdeploy::{Config, GenerationRequest};

#[derive(Parser)]
#[command(name = "jitdeploy")]
#[command(about = "Deployment-time wrapper, factory and stub/tie generator")]
#[command(version)]
struct Cli {
    /// Raise the log level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Generator configuration (TOML)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate class files for a request, or every *.json request under a directory
    Generate {
        #[arg(value_name = "PATH")]
        input: PathBuf,

        /// Output directory for .class files
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Keep legacy wire names as aliases
        #[arg(long)]
        compat: bool,
    },

    /// Print the wire names of a request's remote interfaces
    Names {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Owner name used for collision checks (defaults to the interface's simple name)
        #[arg(long)]
        owner: Option<String>,
    },

    /// Print the failure classification of every exposed method
    Classify {
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Run a generated wrapper method against a recording container
    Trace {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[arg(long)]
        method: String,

        /// Failure thrown by the implementation method
        #[arg(long, value_enum, default_value_t = Failure::None)]
        fail: Failure,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Failure {
    Application,
    System,
    Protocol,
    None,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).parse_default_env().init();

    let config = match &cli.config {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };

    match &cli.command {
        Commands::Generate { input, output, compat } => {
            let config = if *compat { config.with_name_compat(true) } else { config };
            generate(input, output.as_deref(), &config)
        }
        Commands::Names { input, owner } => names(input, owner.as_deref(), &config),
        Commands::Classify { input } => classify(input, &config),
        Commands::Trace { input, method, fail } => trace(input, method, *fail, &config),
    }
}

fn read_request(path: &Path) -> Result<GenerationRequest> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    GenerationRequest::from_json(&text).with_context(|| format!("parsing {}", path.display()))
}

fn request_files(input: &Path) -> Vec<PathBuf> {
    if input.is_file() {
        return vec![input.to_path_buf()];
    }
    let mut files: Vec<PathBuf> = WalkDir::new(input)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && e.path().extension().is_some_and(|x| x == "json"))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

fn generate(input: &Path, output: Option<&Path>, config: &Config) -> Result<()> {
    let out_dir = output
        .map(Path::to_path_buf)
        .or_else(|| config.dump_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    let files = request_files(input);
    if files.is_empty() {
        bail!("no requests found under {}", input.display());
    }

    for file in files {
        let request = read_request(&file)?;
        let output = jitdeploy::generate(&request, config).with_context(|| format!("generating {}", file.display()))?;
        for warning in &output.warnings {
            eprintln!("warning: {warning}");
        }
        for unit in &output.units {
            let path = out_dir.join(format!("{}.class", unit.name.replace('.', "/")));
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, &unit.bytes).with_context(|| format!("writing {}", path.display()))?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

fn names(input: &Path, owner: Option<&str>, config: &Config) -> Result<()> {
    let request = read_request(input)?;
    let (hierarchy, _) = jitdeploy::request_hierarchy(&request);
    let compat = request.name_compat.unwrap_or(config.name_compat);
    let mapper = NameMapper::new(&hierarchy).with_compat(compat);
    for iface in &request.interfaces {
        let methods = iface.owned_methods();
        let simple = TypeRef::new(iface.name.clone()).simple_name().to_string();
        let names = mapper.map(&methods, Some(owner.unwrap_or(&simple)))?;
        println!("{}", iface.name);
        for (m, name) in methods.iter().zip(&names) {
            match &name.alias {
                Some(alias) => println!("  {} -> {} (alias {})", m.signature_key(), name, alias),
                None => println!("  {} -> {}", m.signature_key(), name),
            }
        }
    }
    Ok(())
}

fn classify(input: &Path, config: &Config) -> Result<()> {
    let request = read_request(input)?;
    let (hierarchy, _) = jitdeploy::request_hierarchy(&request);
    let classifier = Classifier::with_config(&hierarchy, config);
    for m in request.interfaces.iter().flat_map(|i| i.owned_methods()) {
        let (_, remote_style) = call_style(request.kind, &m.owner, &hierarchy);
        let failures = classifier.classify(&m.exceptions, remote_style);
        println!("{} {}", m, serde_json::to_string(&failures)?);
    }
    Ok(())
}

fn trace(input: &Path, method: &str, fail: Failure, config: &Config) -> Result<()> {
    let request = read_request(input)?;
    let synthesis = jitdeploy::synthesize(&request, config)?;
    let (hierarchy, _) = jitdeploy::request_hierarchy(&request);
    let wrapper_name = request.wrapper_unit_name();
    let unit = synthesis
        .module
        .units
        .iter()
        .find(|u| u.name == wrapper_name)
        .ok_or_else(|| anyhow!("no wrapper unit {wrapper_name}"))?;
    let decl = unit
        .method(method)
        .filter(|m| m.body.is_some())
        .ok_or_else(|| anyhow!("{wrapper_name} has no method {method}"))?;

    let failure = match fail {
        Failure::None => None,
        Failure::System => Some(RUNTIME_EXCEPTION.to_string()),
        Failure::Protocol => Some(REMOTE_EXCEPTION.to_string()),
        Failure::Application => {
            let owner = request
                .interfaces
                .iter()
                .flat_map(|i| i.owned_methods())
                .find(|m| m.name == method)
                .map(|m| m.owner)
                .unwrap_or_default();
            let (_, remote_style) = call_style(request.kind, &owner, &hierarchy);
            let failures = Classifier::with_config(&hierarchy, config).classify(&decl.throws, remote_style);
            let first = failures
                .application_checked
                .first()
                .ok_or_else(|| anyhow!("{method} declares no application failure"))?;
            Some(first.name.clone())
        }
    };

    let mut runtime = RecordingRuntime::new(hierarchy);
    if let Some(failure) = &failure {
        runtime = runtime.with_failure(method, failure);
    }
    let args = decl.params.iter().map(Value::zero).collect();
    let outcome = Interpreter::new(unit, &mut runtime).run(decl, args);
    for call in runtime.calls() {
        println!("{}.{}", call.owner, call.name);
    }
    match outcome {
        Ok(Value::Void) => println!("=> returned"),
        Ok(value) => println!("=> returned {value:?}"),
        Err(thrown) => println!("=> threw {}", thrown.class()),
    }
    Ok(())
}
