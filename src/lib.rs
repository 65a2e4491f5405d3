//! jitdeploy: deployment-time code generation for managed components
//!
//! Given a component and the interfaces it is exposed through, jitdeploy
//! synthesizes the loadable units bridging the component to each calling
//! convention: wrappers, the factory implementation, and RMI-IIOP stub and
//! tie pairs for remote views.
//!
//! ## Pipeline
//!
//! ```text
//! GenerationRequest ─► review ─► classify / name / dispatch ids ─► synth
//!                                                                    │
//!     LoadableUnit ◄─ verify ◄─ ModuleEmitter ◄─ structural check ◄──┘
//! ```
//!
//! - **model**: descriptors, type hierarchy and wrapper kinds
//! - **review**: structural rules rejecting a request before anything is built
//! - **classify**: declared failures to handler categories
//! - **naming**: collision-free wire names for remote operations
//! - **synth**: unit descriptions for every generated class
//! - **codegen**: the class file emitter
//! - **verify**: class file checks on emitted bytes
//! - **exec**: reference interpreter for unit descriptions

pub mod classify;
pub mod codegen;
pub mod config;
pub mod consts;
pub mod error;
pub mod exec;
pub mod ir;
pub mod model;
pub mod naming;
pub mod review;
pub mod synth;
pub mod verify;

pub use codegen::{ClassFileEmitter, ModuleEmitter};
pub use config::Config;
pub use error::{Error, Result};
pub use ir::LoadableUnit;
pub use model::{DispatchId, GenerationRequest, TypeHierarchy, WrapperKind};
pub use naming::WireName;
pub use synth::Synthesis;

/// Everything one request produced.
#[derive(Debug, Clone, Default)]
pub struct GenerationOutput {
    pub units: Vec<LoadableUnit>,
    /// (method signature key, wire name) for remote views.
    pub wire_names: Vec<(String, WireName)>,
    pub dispatch_ids: Vec<(String, DispatchId)>,
    pub warnings: Vec<String>,
}

impl GenerationOutput {
    pub fn unit(&self, name: &str) -> Option<&LoadableUnit> {
        self.units.iter().find(|u| u.name == name)
    }
}

/// Request hierarchy with every undescribed declared failure registered
/// as a checked exception. One warning per assumed type.
pub fn request_hierarchy(request: &GenerationRequest) -> (TypeHierarchy, Vec<String>) {
    let mut hierarchy = request.hierarchy();
    let mut warnings = Vec::new();
    let companion = request.factory.as_ref().and_then(|f| f.companion.as_ref());
    let declared = request
        .interfaces
        .iter()
        .chain(companion)
        .flat_map(|i| i.methods.iter())
        .chain(request.target.methods.iter())
        .flat_map(|m| m.exceptions.iter());
    for failure in declared {
        if hierarchy.assume_checked_failure(&failure.name) {
            let warning = format!(
                "{}: {} is not described; assuming it extends {}",
                request.component,
                failure.name,
                consts::EXCEPTION
            );
            log::warn!("{warning}");
            warnings.push(warning);
        }
    }
    (hierarchy, warnings)
}

/// Review the request and build its unit descriptions without emitting them.
pub fn synthesize(request: &GenerationRequest, config: &Config) -> Result<Synthesis> {
    config.validate()?;
    let (hierarchy, assumed) = request_hierarchy(request);

    log::debug!("phase validate: {}", request.component);
    review::review(request, &hierarchy).map_err(|e| e.into_error(&request.component))?;

    log::debug!("phase synth: {}", request.component);
    let mut synthesis = synth::Synthesizer::new(request, config, &hierarchy).run()?;
    synthesis.warnings.splice(0..0, assumed);

    for unit in &synthesis.module.units {
        ir::check_unit(unit, &hierarchy)?;
    }
    Ok(synthesis)
}

/// Generate with the class file emitter.
pub fn generate(request: &GenerationRequest, config: &Config) -> Result<GenerationOutput> {
    let mut emitter = ClassFileEmitter::new(config.class_file_major);
    generate_with(request, config, &mut emitter)
}

/// Generate with a substitute module emitter. With `verify_output` set the
/// emitted bytes are read back as class files.
pub fn generate_with(
    request: &GenerationRequest,
    config: &Config,
    emitter: &mut dyn ModuleEmitter,
) -> Result<GenerationOutput> {
    log::info!("generating {} ({})", request.component, request.kind);
    let synthesis = synthesize(request, config)?;

    log::debug!("phase emit: {} units", synthesis.module.units.len());
    let units = emitter.emit(&synthesis.module)?;

    if config.verify_output {
        log::debug!("phase verify: {} units", units.len());
        for unit in &units {
            verify::verify_bytes(&unit.bytes).map_err(|e| Error::structural(&unit.name, "<class>", e.to_string()))?;
        }
    }

    log::info!(
        "generated {} ({}): {} units, {} warnings",
        request.component,
        request.kind,
        units.len(),
        synthesis.warnings.len()
    );
    Ok(GenerationOutput {
        units,
        wire_names: synthesis.wire_names,
        dispatch_ids: synthesis.dispatch_ids,
        warnings: synthesis.warnings,
    })
}
