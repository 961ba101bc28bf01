//! Phantom application binary - composition root.
//!
//! 1. Load configuration from TOML
//! 2. Pick the response generator (provider command or offline echo)
//! 3. Wire speech capabilities into the voice adapter
//! 4. Start the orchestrator, its voice event pump and the event renderer
//! 5. Run the interactive prompt until `/quit` or end of input

mod cli;
mod command;
mod console;
mod generator;

use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

use phantom_chat::{ChatError, Orchestrator};
use phantom_core::config::PhantomConfig;
use phantom_core::events::DomainEvent;
use phantom_core::types::{Message, MessageRole};
use phantom_voice::{
    RecognitionEvent, SpeechCapability, SpeechRecognizer, SpeechSynthesizer, VoiceAdapter,
};

use cli::CliArgs;
use command::Command;
use console::{ConsoleRecognizer, ConsoleSynthesizer};

/// Print domain events the user should see: replies, failures, listening.
async fn render_events(mut rx: broadcast::Receiver<DomainEvent>) {
    loop {
        let event = rx.recv().await;
        if let Ok(ref event) = event {
            tracing::debug!(
                event = event.event_name(),
                session_id = ?event.session_id(),
                at = %event.timestamp(),
                "Domain event"
            );
        }
        match event {
            Ok(DomainEvent::MessageAppended { message, .. }) if message.role == MessageRole::Model => {
                println!("phantom> {}", message.content);
            }
            Ok(DomainEvent::GenerationStarted { .. }) => println!("(thinking...)"),
            Ok(DomainEvent::GenerationFailed { reason, .. }) => {
                println!("phantom> Sorry, I couldn't answer that ({reason}). Please try again.");
            }
            Ok(DomainEvent::TranscriptReceived { text, .. }) => println!("you (voice)> {text}"),
            Ok(DomainEvent::ListeningEnded { .. }) => println!("(stopped listening)"),
            Ok(DomainEvent::VoiceInputDropped { reason, .. }) => {
                println!("(voice input not sent: {reason})");
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Event renderer lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn build_capability(config: &PhantomConfig, no_voice: bool) -> SpeechCapability {
    if no_voice {
        return SpeechCapability::unavailable();
    }
    let recognizer: Arc<dyn SpeechRecognizer> = Arc::new(ConsoleRecognizer);
    let synthesizer: Arc<dyn SpeechSynthesizer> =
        Arc::new(ConsoleSynthesizer::new(&config.voice.language));
    SpeechCapability::new(Some(recognizer), Some(synthesizer))
}

fn print_sessions(orchestrator: &Orchestrator) {
    for (i, summary) in orchestrator.list_sessions().iter().enumerate() {
        let marker = if summary.is_active { "*" } else { " " };
        println!(
            "{marker} {:>2}. {} ({} messages, {})",
            i + 1,
            summary.title,
            summary.message_count,
            summary.created_at.format("%H:%M")
        );
    }
}

/// Report rejections that produce no event.
fn report(result: Result<Message, ChatError>) {
    match result {
        Ok(_) | Err(ChatError::EmptySubmission) | Err(ChatError::Generation(_)) => {}
        Err(ChatError::Busy) => println!("(still answering the previous question)"),
        Err(e) => println!("error: {e}"),
    }
}

/// Handle one prompt line. Returns `false` when the user asked to quit.
async fn dispatch(orchestrator: &Orchestrator, line: &str) -> bool {
    let voice = orchestrator.voice();
    match command::parse(line) {
        Command::Say(text) => report(orchestrator.submit_to_active(&text, None).await),
        Command::Image { source, text } => {
            report(orchestrator.submit_image(&source, &text).await)
        }
        Command::New => {
            let session = orchestrator.create_session();
            println!("(started {})", session.title);
        }
        Command::List => print_sessions(orchestrator),
        Command::Select(n) => match orchestrator.list_sessions().get(n - 1) {
            Some(summary) => match orchestrator.select_session(summary.id) {
                Ok(()) => println!("(switched to {})", summary.title),
                Err(e) => println!("error: {e}"),
            },
            None => println!("no session #{n}, see /list"),
        },
        Command::Delete => {
            let active = orchestrator.active_session_id();
            if let Err(e) = orchestrator.delete_session(active) {
                println!("error: {e}");
            }
        }
        Command::Voice => {
            if !voice.recognition_available() {
                println!("(voice input is not available)");
            } else {
                orchestrator.toggle_voice();
            }
        }
        Command::Heard(words) => {
            if !voice.is_listening() {
                println!("(not listening, use /voice first)");
            } else {
                voice.handle_recognition(RecognitionEvent::Result {
                    transcript: words,
                    is_final: true,
                });
                voice.handle_recognition(RecognitionEvent::End);
            }
        }
        Command::Speak(text) => {
            let text = if text.is_empty() {
                orchestrator
                    .active_session()
                    .and_then(|s| s.last_message().map(|m| m.content.clone()))
                    .unwrap_or_default()
            } else {
                text
            };
            orchestrator.speak(&text);
        }
        Command::Help => println!("{}", command::HELP),
        Command::Quit => return false,
        Command::Invalid(msg) => println!("{msg}"),
    }
    true
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let config = PhantomConfig::load_or_default(&config_file);

    // Tracing. Logs go to stderr so they stay out of the conversation.
    let log_level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting Phantom v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    // Generator and voice.
    let generator = generator::build_generator(&config.generator);
    let (voice, voice_events) =
        VoiceAdapter::new(build_capability(&config, args.no_voice), &config.voice);
    let voice = Arc::new(voice);

    // Orchestrator.
    let orchestrator = Arc::new(Orchestrator::new(&config, generator, Arc::clone(&voice)));
    tokio::spawn(render_events(orchestrator.subscribe()));
    tokio::spawn(Arc::clone(&orchestrator).run_voice_events(voice_events));

    if let Some(session) = orchestrator.active_session() {
        if let Some(welcome) = session.last_message() {
            println!("phantom> {}", welcome.content);
        }
    }
    println!("(type /help for commands)");

    // Prompt loop.
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if !dispatch(&orchestrator, &line).await {
            break;
        }
    }

    voice.cancel_speech();
    tracing::info!("Phantom stopped");
    Ok(())
}
