//! Narrated end-to-end demo for the streambed stream store.
//!
//! Loads configuration from (in precedence order): defaults, config file,
//! environment variables (`STREAMBED_*`), and CLI flags. Creates the wave
//! event type and stream, runs the full CRUD/behavior/view sequence against
//! the in-process store, prints results, and cleans up best-effort.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Duration, NaiveTime, Utc};
use clap::Parser;
use config::{Config, Environment, File};
use streambed::{
    next_wave, noop_event_listener, wave_data_integer_type, wave_data_target_type, wave_data_type,
    Behavior, BoundaryType, InterpolationMode, Stream, StoreError, StoreEvent, StoreEventListener,
    StreamStore, View, ViewProperty, WaveData, WaveDataInteger, WaveDataTarget,
};

// The identifiers used throughout the run.
const SAMPLE_TYPE_ID: &str = "WaveData_SampleType";
const SAMPLE_TARGET_TYPE_ID: &str = "WaveDataTarget_SampleType";
const SAMPLE_INTEGER_TYPE_ID: &str = "WaveData_IntegerType";
const SAMPLE_STREAM_ID: &str = "WaveData_SampleStream";
const SAMPLE_BEHAVIOR_ID: &str = "WaveData_SampleBehavior";
const SAMPLE_VIEW_ID: &str = "WaveData_SampleView";
const SAMPLE_INT_VIEW_ID: &str = "WaveData_SampleIntView";

// ---------- CLI ----------

/// Streambed wave-data walkthrough.
#[derive(Parser, Debug)]
#[command(name = "wavedemo", version, about)]
struct Cli {
    /// Path to config file (TOML). If omitted, wavedemo.toml is loaded when present.
    #[arg(long, env = "STREAMBED_CONFIG")]
    config: Option<PathBuf>,

    /// Do not load any config file; use defaults + env + CLI only.
    #[arg(long, default_value_t = false)]
    no_config: bool,

    /// Namespace all entities are created in.
    #[arg(long)]
    namespace: Option<String>,

    /// Base amplitude multiplier for generated waves.
    #[arg(long)]
    multiplier: Option<f64>,

    /// Repeat interval as a time of day (HH:MM:SS).
    #[arg(long)]
    interval: Option<String>,

    /// Echo structured store events while the demo runs.
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

// ---------- File/env config (all optional for partial config) ----------

/// Top-level demo config as read from file + env. Every field optional for layering.
#[derive(Debug, Default, serde::Deserialize)]
struct DemoFileConfig {
    namespace: Option<String>,
    multiplier: Option<f64>,
    /// Repeat interval as a time of day, e.g. "00:01:00".
    interval: Option<String>,
}

/// Effective demo options derived from config + env + CLI.
#[derive(Debug, Clone)]
struct DemoOptions {
    namespace: String,
    multiplier: f64,
    interval: NaiveTime,
}

fn parse_interval(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M:%S").map_err(|e| format!("invalid interval {:?}: {}", s, e))
}

/// Load merged options. CLI overrides file/env.
fn load_demo_config(cli: &Cli) -> Result<DemoOptions, String> {
    let mut builder = Config::builder();

    if !cli.no_config {
        if let Some(ref path) = cli.config {
            if !path.exists() {
                return Err(format!("config file not found: {}", path.display()));
            }
            builder = builder.add_source(File::from(path.as_path()).required(false));
        } else {
            let default_path = PathBuf::from("wavedemo.toml");
            if default_path.exists() {
                builder = builder.add_source(File::from(default_path.as_path()).required(false));
            }
        }
    }

    builder = builder.add_source(
        Environment::with_prefix("STREAMBED")
            .separator("__")
            .try_parsing(true)
            .ignore_empty(true),
    );

    let merged = builder.build().map_err(|e| e.to_string())?;
    let partial: DemoFileConfig = merged.try_deserialize().map_err(|e| e.to_string())?;

    let namespace = cli
        .namespace
        .clone()
        .or(partial.namespace)
        .unwrap_or_else(|| "demo".to_string());
    let multiplier = cli.multiplier.or(partial.multiplier).unwrap_or(2.0);
    let interval = match cli.interval.as_deref().or(partial.interval.as_deref()) {
        Some(s) => parse_interval(s)?,
        None => NaiveTime::from_hms_opt(0, 1, 0).expect("default interval"),
    };

    Ok(DemoOptions {
        namespace,
        multiplier,
        interval,
    })
}

// ---------- Event echo ----------

/// Forwards structured store events to stdout when --verbose is set.
#[derive(Debug)]
struct PrintingListener;

impl StoreEventListener for PrintingListener {
    fn on_event(&self, event: StoreEvent) {
        println!("  [event] {:?}", event);
    }
}

// ---------- Demo sequence ----------

/// Runs a fallible cleanup call, printing the error and continuing.
fn suppress_error<T>(result: Result<T, StoreError>) {
    if let Err(e) = result {
        println!("Encountered error: {}", e);
    }
}

fn banner(options: &DemoOptions) {
    println!("----------------------------------");
    println!(" streambed wave-data walkthrough");
    println!("----------------------------------");
    println!(
        "namespace {}, multiplier {}, interval {}",
        options.namespace, options.multiplier, options.interval
    );
    println!();
}

fn run_demo(store: &StreamStore, options: &DemoOptions) -> Result<(), StoreError> {
    let ns = options.namespace.as_str();
    let interval = options.interval;
    let multiplier = options.multiplier;

    println!("Creating the wave event type");
    let wave_type = store.get_or_create_type(ns, wave_data_type(SAMPLE_TYPE_ID))?;

    println!("Creating the wave stream");
    let mut stream = Stream::new(
        SAMPLE_STREAM_ID,
        "WaveStreamSample",
        "A stream to store the WaveData events",
        &wave_type.id,
    );
    store.create_or_update_stream(ns, stream.clone())?;

    let start = Utc::now();

    println!("Inserting data");
    // Insert a single event
    let event = next_wave(start, interval, multiplier, 0)?;
    store.insert_value(ns, SAMPLE_STREAM_ID, &event)?;

    // Insert a batch of events
    let mut waves = Vec::new();
    for i in (2..20).step_by(2) {
        let at = start + Duration::milliseconds(i64::from(i) * 200);
        waves.push(next_wave(at, interval, multiplier, i)?);
    }
    store.insert_values(ns, SAMPLE_STREAM_ID, &waves)?;

    // Get the last inserted event in the stream
    println!("Getting latest event");
    if let Some(wave) = store.get_last_value::<WaveData>(ns, SAMPLE_STREAM_ID)? {
        println!("{}", wave);
    }
    println!();

    // Get all the events
    let waves: Vec<WaveData> = store.get_window_values(ns, SAMPLE_STREAM_ID, 0, 40, None)?;
    println!("Getting all events");
    println!("Total events found: {}", waves.len());
    for wave in &waves {
        println!("{}", wave);
    }
    println!();

    println!("Updating events");
    // Update the first event
    let event = next_wave(start, interval, multiplier * 2.0, 0)?;
    store.update_value(ns, SAMPLE_STREAM_ID, &event)?;

    // Update the rest, adding events that have no prior index entry
    let mut updated = Vec::new();
    for i in (2..40).step_by(2) {
        let at = start + Duration::milliseconds(i64::from(i) * 200);
        updated.push(next_wave(at, interval, multiplier * 2.0, i)?);
    }
    store.update_values(ns, SAMPLE_STREAM_ID, &updated)?;

    let waves: Vec<WaveData> = store.get_window_values(ns, SAMPLE_STREAM_ID, 0, 40, None)?;
    println!("Getting updated events");
    println!("Total events found: {}", waves.len());
    for wave in &waves {
        println!("{}", wave);
    }
    println!();

    println!("Replacing events");
    // Replace one value
    let event = next_wave(start, interval, multiplier * 5.0, 0)?;
    store.replace_value(ns, SAMPLE_STREAM_ID, &event)?;

    // Replace multiple values
    let mut replaced = Vec::new();
    for i in (2..40).step_by(2) {
        let at = start + Duration::milliseconds(i64::from(i) * 200);
        replaced.push(next_wave(at, interval, multiplier * 5.0, i)?);
    }
    store.replace_values(ns, SAMPLE_STREAM_ID, &replaced)?;

    let waves: Vec<WaveData> = store.get_window_values(ns, SAMPLE_STREAM_ID, 0, 40, None)?;
    println!("Getting replaced events");
    println!("Total events found: {}", waves.len());
    for wave in &waves {
        println!("{}", wave);
    }
    println!();

    // ---------- Stream behavior ----------

    println!("Stream behaviors determine whether a ranged read interpolates or");
    println!("only returns stored events at the requested index location");
    println!();
    let ranged: Vec<WaveData> = store.get_range_values(
        ns,
        SAMPLE_STREAM_ID,
        1,
        0,
        3,
        false,
        BoundaryType::ExactOrCalculated,
        None,
    )?;
    println!("Default (continuous) behavior, requesting data starting at index 1;");
    println!("the store interpolates this value:");
    for wave in &ranged {
        println!("Order: {}: Radians: {}", wave.order, wave.radians);
    }

    // Attach a discrete behavior
    let behavior = store.get_or_create_behavior(
        ns,
        Behavior::new(SAMPLE_BEHAVIOR_ID, InterpolationMode::Discrete),
    )?;
    stream.behavior_id = Some(behavior.id.clone());
    store.create_or_update_stream(ns, stream.clone())?;

    let ranged: Vec<WaveData> = store.get_range_values(
        ns,
        SAMPLE_STREAM_ID,
        1,
        0,
        3,
        false,
        BoundaryType::ExactOrCalculated,
        None,
    )?;
    println!();
    println!("Discrete behavior, no interpolation; data starts at the next stored index:");
    for wave in &ranged {
        println!("Order: {}: Radians: {}", wave.order, wave.radians);
    }
    println!();

    // ---------- Views ----------

    // Additional types to define the view targets
    let target_type = store.get_or_create_type(ns, wave_data_target_type(SAMPLE_TARGET_TYPE_ID))?;
    let integer_type =
        store.get_or_create_type(ns, wave_data_integer_type(SAMPLE_INTEGER_TYPE_ID))?;

    // Same shape on both sides, so the mapping resolves automatically
    let automatic_view = store.get_or_create_view(
        ns,
        View::new(SAMPLE_VIEW_ID, "SampleView", SAMPLE_TYPE_ID, &target_type.id),
    )?;

    // Different shape and property types, so map the properties explicitly
    let manual_view = store.get_or_create_view(
        ns,
        View::with_properties(
            SAMPLE_INT_VIEW_ID,
            "SampleIntView",
            SAMPLE_TYPE_ID,
            &integer_type.id,
            vec![
                ViewProperty::new("Order", "OrderTarget"),
                ViewProperty::new("Sin", "SinInt"),
                ViewProperty::new("Cos", "CosInt"),
                ViewProperty::new("Tan", "TanInt"),
            ],
        ),
    )?;

    println!("Views");
    println!("Here is some of the data as it is stored:");
    let stored: Vec<WaveData> = store.get_range_values(
        ns,
        SAMPLE_STREAM_ID,
        1,
        0,
        3,
        false,
        BoundaryType::ExactOrCalculated,
        None,
    )?;
    for wave in &stored {
        println!("Sin: {}, Cos: {}, Tan: {}", wave.sin, wave.cos, wave.tan);
    }

    println!();
    println!("A view onto a type of the same shape maps the properties automatically:");
    let targets: Vec<WaveDataTarget> = store.get_range_values(
        ns,
        SAMPLE_STREAM_ID,
        1,
        0,
        3,
        false,
        BoundaryType::ExactOrCalculated,
        Some(&automatic_view.id),
    )?;
    for wave in &targets {
        println!(
            "SinTarget: {}, CosTarget: {}, TanTarget: {}",
            wave.sin_target, wave.cos_target, wave.tan_target
        );
    }

    println!();
    println!("Views can also convert between property types; these doubles were");
    println!("rounded to integers on read:");
    let integers: Vec<WaveDataInteger> = store.get_range_values(
        ns,
        SAMPLE_STREAM_ID,
        1,
        0,
        3,
        false,
        BoundaryType::ExactOrCalculated,
        Some(&manual_view.id),
    )?;
    for wave in &integers {
        println!(
            "SinInt: {}, CosInt: {}, TanInt: {}",
            wave.sin_int, wave.cos_int, wave.tan_int
        );
    }

    println!();
    println!("The resolved map of the automatic view:");
    let automatic_map = store.get_view_map(ns, SAMPLE_VIEW_ID)?;
    for prop in &automatic_map.properties {
        match &prop.target_id {
            Some(target) => println!("{} => {}", prop.source_id, target),
            None => println!("{} => Not mapped", prop.source_id),
        }
    }

    println!();
    println!("The explicit map lists every source property, even the unmapped ones:");
    let manual_map = store.get_view_map(ns, SAMPLE_INT_VIEW_ID)?;
    for prop in &manual_map.properties {
        match &prop.target_id {
            Some(target) => println!("{} => {}", prop.source_id, target),
            None => println!("{} => Not mapped", prop.source_id),
        }
    }

    // ---------- Delete events ----------

    println!();
    println!("Deleting values from the stream");
    // Remove a single value, then everything in the window
    store.remove_value(ns, SAMPLE_STREAM_ID, 0)?;
    let removed = store.remove_window_values(ns, SAMPLE_STREAM_ID, 0, 40)?;
    println!("Removed {} remaining events", removed);

    match store.get_last_value::<WaveData>(ns, SAMPLE_STREAM_ID)? {
        None => println!("All values deleted successfully!"),
        Some(wave) => println!("Unexpected event still present: {}", wave),
    }

    Ok(())
}

/// Best-effort removal of everything the run created, in dependency order.
fn cleanup(store: &StreamStore, namespace: &str) {
    println!();
    println!("Cleaning up");
    println!("Deleting the stream");
    suppress_error(store.delete_stream(namespace, SAMPLE_STREAM_ID));

    println!("Deleting the types");
    suppress_error(store.delete_type(namespace, SAMPLE_TYPE_ID));
    suppress_error(store.delete_type(namespace, SAMPLE_TARGET_TYPE_ID));
    suppress_error(store.delete_type(namespace, SAMPLE_INTEGER_TYPE_ID));

    println!("Deleting the behavior");
    suppress_error(store.delete_behavior(namespace, SAMPLE_BEHAVIOR_ID));

    println!("Deleting the views");
    suppress_error(store.delete_view(namespace, SAMPLE_VIEW_ID));
    suppress_error(store.delete_view(namespace, SAMPLE_INT_VIEW_ID));
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let options = load_demo_config(&cli).map_err(StoreError::ConfigError)?;

    let listener: Arc<dyn StoreEventListener> = if cli.verbose {
        Arc::new(PrintingListener)
    } else {
        noop_event_listener()
    };
    let store = StreamStore::with_listener(listener);

    banner(&options);
    let outcome = run_demo(&store, &options);
    if let Err(e) = &outcome {
        println!("Encountered error: {}", e);
        println!();
    }
    cleanup(&store, &options.namespace);

    println!("done");
    Ok(outcome?)
}
