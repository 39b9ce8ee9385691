//! Command-line renderer for blocktpl templates.
//!
//! Usage:
//!   blocktpl render `<template>` [STEP]... [--config `<path>`]   - Render a template
//!   blocktpl blocks `<template>` [--config `<path>`]             - List its blocks
//!   blocktpl init `<template_dir>` [--force] [--config `<path>`] - Write a config file
//!
//! Steps run in order: `set:NAME=VALUE`, `global:NAME=VALUE`, `parse:PATH`.

mod steps;

use anyhow::{Context, Result};
use blocktpl_config::{Config, HandlerTarget};
use blocktpl_engine::{Environment, ROOT, Template, io};
use clap::{Arg, ArgAction, ArgMatches, Command};
use relative_path::RelativePathBuf;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use steps::Step;

fn cli() -> Command {
    let template_arg = Arg::new("template")
        .help("Path to the template, relative to the configured template_dir")
        .required(true)
        .value_parser(clap::value_parser!(PathBuf))
        .index(1);
    let config_arg = Arg::new("config")
        .long("config")
        .short('c')
        .global(true)
        .help("Config file (default: ~/.config/blocktpl/config.toml)")
        .value_parser(clap::value_parser!(PathBuf));

    Command::new("blocktpl")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Render block templates")
        .arg_required_else_help(true)
        .subcommand_required(true)
        .arg(config_arg)
        .subcommand(
            Command::new("render")
                .about("Apply steps to a template and print the result")
                .arg(template_arg.clone())
                .arg(
                    Arg::new("steps")
                        .help("set:NAME=VALUE, global:NAME=VALUE or parse:PATH, applied in order")
                        .num_args(1..)
                        .action(ArgAction::Append)
                        .value_parser(|s: &str| s.parse::<Step>())
                        .index(2),
                ),
        )
        .subcommand(
            Command::new("blocks")
                .about("List the blocks a template defines")
                .arg(template_arg),
        )
        .subcommand(
            Command::new("init")
                .about("Write a config file pointing at a template directory")
                .arg(
                    Arg::new("template_dir")
                        .help("Directory holding the templates")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .index(1),
                )
                .arg(
                    Arg::new("force")
                        .long("force")
                        .short('f')
                        .help("Overwrite an existing config file")
                        .action(ArgAction::SetTrue),
                ),
        )
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let matches = cli().get_matches();
    let explicit_config = matches.get_one::<PathBuf>("config");

    if let Some(("init", sub)) = matches.subcommand() {
        let written = handle_init(sub, explicit_config)?;
        println!("Wrote {}", written.display());
        return Ok(());
    }

    let config = load_config(explicit_config)?;
    match matches.subcommand() {
        Some(("render", sub)) => {
            let rendered = handle_render(sub, config.as_ref())?;
            println!("{rendered}");
        }
        Some(("blocks", sub)) => {
            for line in handle_blocks(sub, config.as_ref())? {
                println!("{line}");
            }
        }
        _ => unreachable!("clap requires a subcommand"),
    }
    Ok(())
}

fn load_config(explicit: Option<&PathBuf>) -> Result<Option<Config>> {
    let config = match explicit {
        Some(path) => {
            let config = Config::load_from_path(path)?;
            if config.is_none() {
                anyhow::bail!("config file not found: {}", path.display());
            }
            config
        }
        None => Config::load()?,
    };

    if let Some(config) = &config {
        log::debug!("template_dir: {}", config.template_dir.display());
        io::validate_template_dir(&config.template_dir)?;
    }
    Ok(config)
}

/// Write a config for `template_dir`, returning where it went.
fn handle_init(matches: &ArgMatches, explicit: Option<&PathBuf>) -> Result<PathBuf> {
    let template_dir = matches
        .get_one::<PathBuf>("template_dir")
        .cloned()
        .unwrap_or_default();
    let template_dir = std::path::absolute(&template_dir)
        .with_context(|| format!("cannot resolve {}", template_dir.display()))?;
    io::validate_template_dir(&template_dir)?;

    let config_path = explicit.cloned().unwrap_or_else(Config::config_path);
    if config_path.exists() && !matches.get_flag("force") {
        anyhow::bail!(
            "config file already exists: {} (use --force to overwrite)",
            config_path.display()
        );
    }

    let config = Config {
        template_dir,
        ..Default::default()
    };
    match explicit {
        Some(path) => config.save_to_path(path)?,
        None => config.save()?,
    }
    Ok(config_path)
}

fn handle_render(matches: &ArgMatches, config: Option<&Config>) -> Result<String> {
    let location = template_location(matches, config)?;
    let steps: Vec<Step> = matches
        .get_many::<Step>("steps")
        .map(|steps| steps.cloned().collect())
        .unwrap_or_default();

    let mut env = build_environment(config)?;
    let mut tpl = location.open()?;
    Ok(render(&mut tpl, &mut env, &steps))
}

fn handle_blocks(matches: &ArgMatches, config: Option<&Config>) -> Result<Vec<String>> {
    let tpl = template_location(matches, config)?.open()?;
    Ok(block_outline(&tpl))
}

fn template_location(matches: &ArgMatches, config: Option<&Config>) -> Result<TemplateLocation> {
    let path = matches
        .get_one::<PathBuf>("template")
        .cloned()
        .unwrap_or_default();
    TemplateLocation::new(&path, config)
}

/// A template file: a root directory and a path relative to it.
#[derive(Debug, Clone, PartialEq)]
struct TemplateLocation {
    root: PathBuf,
    path: RelativePathBuf,
}

impl TemplateLocation {
    /// Relative paths are taken against the configured `template_dir`. Without a
    /// config, or for an absolute path, the file's own directory is the root.
    fn new(path: &Path, config: Option<&Config>) -> Result<Self> {
        if let Some(config) = config
            && path.is_relative()
        {
            let relative = RelativePathBuf::from_path(path)
                .with_context(|| format!("not a usable template path: {}", path.display()))?;
            return Ok(Self {
                root: config.template_dir.clone(),
                path: relative,
            });
        }

        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .with_context(|| format!("not a template file: {}", path.display()))?;
        Ok(Self {
            root: path.parent().unwrap_or(Path::new("")).to_path_buf(),
            path: RelativePathBuf::from(file_name),
        })
    }

    fn open(&self) -> Result<Template> {
        let bytes = io::read_template(&self.path, &self.root)?;
        Template::open(&bytes).with_context(|| format!("failed to open {self}"))
    }
}

impl fmt::Display for TemplateLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.to_path(&self.root).display())
    }
}

/// Apply `steps` in order and finalize.
fn render(tpl: &mut Template, env: &mut Environment, steps: &[Step]) -> String {
    for step in steps {
        match step {
            Step::Assign { name, value } => tpl.assign(name.as_str(), value),
            Step::Global { name, value } => env.assign_global(name.as_str(), value),
            Step::Parse(path) => {
                if !tpl.has_block(path) {
                    log::warn!("template has no block {path}");
                }
                tpl.parse(env, path);
            }
        }
    }

    let pending = tpl.pending_assignments();
    if !pending.is_empty() {
        log::debug!("unconsumed assignments before output: {pending:?}");
    }
    tpl.out(env)
}

/// Block paths relative to the root, indented two spaces per level.
fn block_outline(tpl: &Template) -> Vec<String> {
    let prefix = format!("{ROOT}.");
    tpl.block_paths()
        .filter_map(|path| path.strip_prefix(&prefix))
        .map(|path| {
            let depth = path.matches('.').count();
            format!("{}{path}", "  ".repeat(depth))
        })
        .collect()
}

/// Globals from the config plus one handler per configured partial.
///
/// Partials render against their own copy of this environment, so a partial
/// may call any configured handler in turn. Globals set by `global:` steps stay
/// with the top-level template.
fn build_environment(config: Option<&Config>) -> Result<Environment> {
    let Some(config) = config else {
        return Ok(Environment::new());
    };

    let partials = Arc::new(OnceLock::new());
    let shared = configured_environment(config, &partials)?;
    partials.get_or_init(|| shared);
    configured_environment(config, &partials)
}

fn configured_environment(
    config: &Config,
    partials: &Arc<OnceLock<Environment>>,
) -> Result<Environment> {
    let mut env = Environment::new();
    for (name, value) in &config.globals {
        env.assign_global(name.as_str(), value);
    }
    for (name, target) in config.handler_targets() {
        let location = TemplateLocation::new(&target.template, Some(config))?;
        let partials = Arc::clone(partials);
        env.add_handler(name, move || match partials.get() {
            Some(env) => render_partial(&location, &target, env),
            None => String::new(),
        });
    }
    Ok(env)
}

/// Handler body: render another template, resolving the target block first.
///
/// Failures are logged and render as empty text.
fn render_partial(location: &TemplateLocation, target: &HandlerTarget, env: &Environment) -> String {
    let mut tpl = match location.open() {
        Ok(tpl) => tpl,
        Err(e) => {
            log::warn!("handler template {location}: {e:#}");
            return String::new();
        }
    };

    if let Some(block) = &target.block {
        tpl.parse(env, block);
    }
    tpl.out(env)
}
