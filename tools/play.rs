/// Play: terminal playthrough of a story.
///
/// Usage: play [--story <path>] [--script <n,n,...>]
///
/// Without `--story` the bundled "Amari Bugs Out" is played. With
/// `--script`, choice prompts are answered from the list (1-based) and the
/// run is non-interactive.
///
/// Commands:
///   <enter> / n   next line
///   1..N          pick a choice
///   r             restart after an ending
///   s             show affinity scores
///   help          list commands
///   q             quit

use novella::core::audio::AudioCue;
use novella::core::controller::{Phase, PlaybackController, PlaybackError};
use novella::core::events::{PresentationEvent, Stimulus};
use novella::core::graph::StoryGraph;
use novella::stories;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "novella=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let mut story_path = None;
    let mut script = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_usage();
                return;
            }
            "--story" if i + 1 < args.len() => {
                i += 1;
                story_path = Some(args[i].clone());
            }
            "--script" if i + 1 < args.len() => {
                i += 1;
                match parse_script(&args[i]) {
                    Some(picks) => script = Some(picks),
                    None => {
                        eprintln!("Invalid script '{}': expected 1-based numbers like 1,3,2", args[i]);
                        std::process::exit(1);
                    }
                }
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let loaded = match story_path {
        Some(ref path) => StoryGraph::load_from_ron(Path::new(path)),
        None => stories::amari_bugs_out(),
    };
    let graph = match loaded {
        Ok(graph) => graph,
        Err(e) => {
            eprintln!("ERROR: Failed to load story: {}", e);
            std::process::exit(1);
        }
    };

    println!("=== {} ===", graph.title());
    println!("{} scenes, {} endings", graph.len(), graph.endings().count());

    let mut ctl = PlaybackController::new(&graph);
    let result = match script {
        Some(picks) => run_script(&mut ctl, picks),
        None => run_interactive(&mut ctl),
    };
    if let Err(e) = result {
        eprintln!("ERROR: {}", e);
        std::process::exit(1);
    }
}

fn print_usage() {
    println!("Usage: play [--story <path>] [--script <n,n,...>]");
    println!();
    println!("  --story <path>     play a story RON file instead of the bundled one");
    println!("  --script <list>    answer choice prompts from a 1-based list and exit");
    println!();
    println!("Log filtering follows RUST_LOG (default: novella=warn).");
}

fn print_help() {
    println!("Commands:");
    println!("  <enter> / n   next line");
    println!("  1..N          pick a choice");
    println!("  r             restart after an ending");
    println!("  s             show affinity scores");
    println!("  help          this list");
    println!("  q             quit");
}

fn parse_script(input: &str) -> Option<VecDeque<usize>> {
    input
        .split(',')
        .map(|part| part.trim().parse::<usize>().ok().filter(|&n| n > 0).map(|n| n - 1))
        .collect()
}

fn run_script(ctl: &mut PlaybackController<'_>, mut picks: VecDeque<usize>) -> Result<(), PlaybackError> {
    render(&ctl.start_playthrough()?);
    loop {
        let stimulus = match ctl.phase() {
            Phase::PlayingDialogue => Stimulus::Advance,
            Phase::AwaitingChoice => match picks.pop_front() {
                Some(index) => {
                    println!("> {}", index + 1);
                    Stimulus::SelectChoice(index)
                }
                None => {
                    println!("(script exhausted at a choice prompt)");
                    break;
                }
            },
            _ => break,
        };
        render(&ctl.dispatch(stimulus)?);
    }
    print_scores(ctl);
    Ok(())
}

fn run_interactive(ctl: &mut PlaybackController<'_>) -> Result<(), PlaybackError> {
    println!("Type 'help' for commands.\n");
    render(&ctl.start_playthrough()?);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{}> ", prompt_for(ctl.phase()));
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let cmd = line.trim().to_lowercase();

        let stimulus = match cmd.as_str() {
            "q" | "quit" | "exit" => {
                println!("Goodbye.");
                break;
            }
            "help" | "h" | "?" => {
                print_help();
                continue;
            }
            "s" | "scores" => {
                print_scores(ctl);
                continue;
            }
            "" | "n" | "next" => Stimulus::Advance,
            "r" | "restart" => Stimulus::Restart,
            other => match other.parse::<usize>() {
                Ok(n) if n > 0 => Stimulus::SelectChoice(n - 1),
                _ => {
                    println!("Unknown command: {}", other);
                    continue;
                }
            },
        };

        match ctl.dispatch(stimulus) {
            Ok(events) => render(&events),
            Err(e) if e.is_recoverable() => println!("({})", e),
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

fn prompt_for(phase: Phase) -> &'static str {
    match phase {
        Phase::AwaitingChoice => "choose",
        Phase::Ended => "restart",
        _ => "play",
    }
}

fn render(events: &[PresentationEvent]) {
    for event in events {
        match event {
            PresentationEvent::SceneEntered { scene, background, .. } => {
                println!("\n--- {} [{}] ---", scene, background);
            }
            PresentationEvent::LineShown { speaker: Some(name), text, .. } => {
                println!("{}: {}", name, text);
            }
            PresentationEvent::LineShown { speaker: None, text, .. } => {
                println!("  {}", text);
            }
            PresentationEvent::ChoicesPresented(labels) => {
                for (i, label) in labels.iter().enumerate() {
                    println!("  [{}] {}", i + 1, label);
                }
            }
            PresentationEvent::Ended => {
                println!("\n=== The End ===  (r to restart)");
            }
            PresentationEvent::Audio(cue) => match cue {
                AudioCue::Play(track) => println!("  ♪ {} music starts", track),
                AudioCue::Pause(track) => println!("  ♪ {} music fades", track),
                AudioCue::StopAll => println!("  ♪ silence"),
            },
        }
    }
}

fn print_scores(ctl: &PlaybackController<'_>) {
    let Some(counters) = ctl.counters() else {
        println!("No playthrough yet.");
        return;
    };
    println!("\nAffinity:");
    for (label, count) in counters.iter() {
        println!("  {:<10} {}", label, count);
    }
    if let Some(leader) = counters.leading() {
        println!("  leaning toward {}", leader);
    }
}
