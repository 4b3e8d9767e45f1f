use anyhow::{anyhow, bail, Context, Result};
use presetstore::{
    MemoryCatalog, PresetRecord, PresetStore, StoreConfig, SystemPresets, TomlFileMedium,
};
use presettext::{read, signature, DEFAULT_PRESET_NAME};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::paths::AppPaths;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn run(cli: Cli) -> Result<()> {
    // Text-only commands never touch the store.
    match &cli.command {
        Command::Decode { text, json } => return decode(text, *json),
        Command::Sign { text } => {
            println!("{}", signature::append(text));
            return Ok(());
        }
        Command::Verify { text } => return verify(text),
        _ => {}
    }

    let paths = AppPaths::discover()?;
    debug!(
        config = %paths.config_dir().display(),
        data = %paths.data_dir().display(),
        "resolved presetctl directories"
    );
    let store = open_store(&paths, &cli)?;

    match cli.command {
        Command::List { shader } => list(&store, shader.as_deref()),
        Command::Show { id, json } => {
            let record = store
                .find_preset_by_id(&id)
                .ok_or_else(|| anyhow!("preset '{id}' not found"))?;
            print_record(&record, json)
        }
        Command::Save {
            id,
            shader,
            name,
            params,
        } => save(&store, id, shader, name, params),
        Command::Remove { id } => {
            if store.remove(&id)? {
                println!("Removed preset {id}");
            } else {
                println!("No preset stored under {id}");
            }
            Ok(())
        }
        Command::Default {
            shader,
            catalog,
            json,
        } => {
            let catalog = MemoryCatalog::load(&catalog)
                .with_context(|| format!("failed to load shader catalog {}", catalog.display()))?;
            let record = store
                .default_preset_for(&catalog, &shader)
                .ok_or_else(|| anyhow!("shader '{shader}' is not in the catalog"))?;
            print_record(&record, json)
        }
        Command::Assign { system, id } => {
            if !store.exists_by_id(&id) {
                bail!("preset '{id}' not found");
            }
            SystemPresets::new(&store).set_preset_for_system(&system, &id)?;
            println!("Assigned preset {id} to {system}");
            Ok(())
        }
        Command::Unassign { system } => {
            SystemPresets::new(&store).reset_preset_for_system(&system)?;
            println!("Cleared preset for {system}");
            Ok(())
        }
        Command::System { system } => {
            let systems = SystemPresets::new(&store);
            match systems.find_preset_for_system(&system) {
                Some(record) => println!("{system}: {} ({})", record.id, record.name),
                None => println!(
                    "{system}: no preset assigned; default is {}",
                    systems.default_preset_id()
                ),
            }
            Ok(())
        }
        Command::Decode { .. } | Command::Sign { .. } | Command::Verify { .. } => Ok(()),
    }
}

fn open_store(paths: &AppPaths, cli: &Cli) -> Result<PresetStore<TomlFileMedium>> {
    let config = match &cli.config {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            StoreConfig::from_toml_str(&contents)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => {
            let path = paths.config_file();
            StoreConfig::load_or_default(&path)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
    };

    let store_file = paths.store_file();
    let medium = TomlFileMedium::open(&store_file)
        .with_context(|| format!("failed to open preset store {}", store_file.display()))?;
    Ok(PresetStore::with_options(medium, config.store))
}

fn list(store: &PresetStore<TomlFileMedium>, shader: Option<&str>) -> Result<()> {
    let mut records = match shader {
        Some(shader) => store.find_presets_by_shader(shader),
        None => store.presets_matching(|_| true),
    };
    if records.is_empty() {
        println!("No presets stored.");
        return Ok(());
    }

    records.sort_by(|a, b| a.id.cmp(&b.id));
    for record in records {
        println!(
            "{:<36} {:<20} {}",
            record.id, record.shader, record.name
        );
    }
    Ok(())
}

fn save(
    store: &PresetStore<TomlFileMedium>,
    id: String,
    shader: String,
    name: Option<String>,
    params: Vec<(String, f64)>,
) -> Result<()> {
    let existing = store.find_preset_by_id(&id);
    let name = name
        .or_else(|| existing.as_ref().map(|record| record.name.clone()))
        .unwrap_or_else(|| DEFAULT_PRESET_NAME.to_string());
    let mut record = PresetRecord::new(name, shader).with_id(id);
    if let Some(existing) = existing {
        record.parameters = existing.parameters;
    }
    record = record.with_parameters(params);

    let stored = store
        .save(&record)
        .with_context(|| format!("failed to save preset {}", record.id))?;
    println!("Saved preset {}", stored.id);
    Ok(())
}

fn decode(text: &str, json: bool) -> Result<()> {
    let record = read(text, None).context("failed to decode preset text")?;
    print_record(&record, json)
}

fn verify(text: &str) -> Result<()> {
    if signature::split(text).is_none() {
        bail!("text carries no signature");
    }
    if !signature::is_valid(text) {
        bail!("signature does not match");
    }
    println!("Signature valid");
    Ok(())
}

fn print_record(record: &PresetRecord, json: bool) -> Result<()> {
    if json {
        let rendered =
            serde_json::to_string_pretty(record).context("failed to serialise preset")?;
        println!("{rendered}");
        return Ok(());
    }

    println!("id:      {}", record.id);
    println!("name:    {}", record.name);
    println!("shader:  {}", record.shader);
    if let Some(created_at) = record.created_at {
        println!("created: {created_at}");
    }
    if record.parameters.is_empty() {
        println!("parameters: (none)");
    } else {
        println!("parameters:");
        for (key, value) in &record.parameters {
            println!("  {key} = {}", presettext::format_value(*value));
        }
    }
    Ok(())
}
