//! Application entry point: live captions on the console.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Parse the translation mode and optional source index from the
//!    command line.
//! 3. Load [`TranslationConfig`] from the environment (missing provider
//!    credentials are fatal).
//! 4. Enumerate and print the audio source catalog, resolve the source.
//! 5. Create the [`tokio`] runtime (multi-thread, 2 workers).
//! 6. Arm Ctrl+C as the cancellation flag.
//! 7. Run the translation orchestrator with console sinks until the run
//!    ends.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use live_captions::{
    audio::{AudioDeviceCatalog, AudioDeviceDescriptor},
    config::{TranslationConfig, TranslationMode},
    orchestrator::{StatusSink, TranslationOrchestrator, TranslationSink},
    session::{ScriptedEngine, SpeechEngine},
};

const USAGE: &str = "Uso: live-captions [en-pt|pt-en] [índice-da-fonte]";

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct CliArgs {
    mode: TranslationMode,
    source_index: Option<usize>,
}

/// Order-free parse: one argument selects the mode, one selects the source.
fn parse_args(args: impl Iterator<Item = String>) -> Result<CliArgs, String> {
    let mut mode = TranslationMode::default();
    let mut source_index = None;

    for arg in args {
        if let Some(parsed) = parse_mode(&arg) {
            mode = parsed;
        } else if let Ok(index) = arg.parse::<usize>() {
            source_index = Some(index);
        } else {
            return Err(format!("Argumento desconhecido: {arg}"));
        }
    }

    Ok(CliArgs { mode, source_index })
}

fn parse_mode(arg: &str) -> Option<TranslationMode> {
    match arg {
        "en-pt" => Some(TranslationMode::EnglishToPortuguese),
        "pt-en" => Some(TranslationMode::PortugueseToEnglish),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("live captions starting up");

    // 2. Command line
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    };

    // 3. Configuration (provider credentials come from the environment)
    let config = match TranslationConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("invalid configuration: {e}");
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    // 4. Source catalog
    let devices = AudioDeviceCatalog::enumerate();
    println!("Fontes de áudio disponíveis:");
    for (index, device) in devices.iter().enumerate() {
        let marker = if device.is_default() { " (padrão)" } else { "" };
        println!("  [{index}] {}{marker}", device.label);
    }

    let descriptor = match args.source_index {
        Some(index) => match devices.get(index) {
            Some(device) => device.clone(),
            None => {
                eprintln!("Fonte inválida: {index}.");
                eprintln!("{USAGE}");
                std::process::exit(2);
            }
        },
        None => AudioDeviceDescriptor::default_input(),
    };
    log::info!(
        "mode: {} -> {}, source: '{}'",
        args.mode.recognition_language(),
        args.mode.target_language(),
        descriptor.source_label()
    );

    // 5. Tokio runtime (2 workers: capture bridge + provider stream)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to create tokio runtime");

    // 6. Orchestrator.  No provider transport is linked in this binary, so
    //    a streaming run opens and stays silent; embedders supply the
    //    SpeechEngine for their provider's SDK.
    log::warn!("no speech engine linked; recognition events will not be produced");
    let engine: Arc<dyn SpeechEngine> = Arc::new(ScriptedEngine::idle());
    let mut orchestrator = match TranslationOrchestrator::new(&config, engine) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            log::error!("could not prepare the translation session: {e}");
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    // 7. Ctrl+C requests a graceful stop
    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        rt.spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("Ctrl+C received; stopping");
                cancel.store(true, Ordering::Relaxed);
            }
        });
    }

    // 8. Console sinks
    let status: StatusSink = Arc::new(|line: &str| println!("{line}"));
    let translations: TranslationSink =
        Arc::new(|_rec_lang: &str, recognized: &str, _tgt_lang: &str, translated: &str| {
            println!("> {recognized}");
            println!("  {translated}");
        });

    // 9. Run until cancelled or terminally failed
    rt.block_on(orchestrator.run(args.mode, &descriptor, status, translations, cancel));

    log::info!(
        "run ended: {} caption block(s) accumulated",
        orchestrator.history().len()
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
